use std::path::Path;
use std::sync::Arc;

use oxidis::config::{Config, StorageKind};
use oxidis::pubsub;
use oxidis::server;
use oxidis::storage::aof::AofBackend;
use oxidis::storage::memory::MemoryBackend;
use oxidis::storage::sleddb::SledBackend;
use oxidis::storage::Backend;
use oxidis::store;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let backend: Box<dyn Backend> = match config.storage {
        StorageKind::Memory => Box::new(MemoryBackend::new()),
        StorageKind::Aof => {
            let path = Path::new(&config.dir).join("oxidis.aof");
            info!("mounting append-only log at {}", path.display());
            match AofBackend::open(&path) {
                Ok(backend) => Box::new(backend),
                Err(e) => {
                    eprintln!("failed to open append-only log: {e}");
                    std::process::exit(1);
                }
            }
        }
        StorageKind::Sled => {
            let path = Path::new(&config.dir).join("oxidis-data");
            info!("mounting sled tree at {}", path.display());
            match SledBackend::open(&path) {
                Ok(backend) => Box::new(backend),
                Err(e) => {
                    eprintln!("failed to open sled tree: {e}");
                    std::process::exit(1);
                }
            }
        }
    };

    let store = store::shared(backend);
    let broker = pubsub::shared();
    let config = Arc::new(config);

    server::run_server(store, config, broker).await
}
