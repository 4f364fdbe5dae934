use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::command;
use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::pubsub::{PushSender, SharedBroker};
use crate::resp::{RespParser, RespValue};
use crate::store::SharedStore;

/// Bind, accept, and run one worker task per connection until ctrl-c.
pub async fn run_server(
    store: SharedStore,
    config: SharedConfig,
    broker: SharedBroker,
) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("oxidis listening on {addr}");

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                debug!("new connection from {peer_addr}");

                let store = store.clone();
                let config = config.clone();
                let broker = broker.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store, config, broker).await {
                        debug!("connection error from {peer_addr}: {e}");
                    }
                    debug!("connection closed: {peer_addr}");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    store: SharedStore,
    config: SharedConfig,
    broker: SharedBroker,
) -> std::io::Result<()> {
    let mut client = ClientState::new();
    if !config.requires_auth() {
        client.authenticated = true;
    }

    let result = serve(&mut stream, &store, &config, &mut client, &broker).await;

    // Whatever ended the worker, drop its subscriptions.
    broker.write().await.unsubscribe_all(client.id);
    result
}

/// The worker loop: read bytes, decode frames, dispatch, write replies.
/// Out-of-band pushes (subscription acks, published messages) arrive on the
/// client's queue and are interleaved whenever the socket is idle.
async fn serve(
    stream: &mut TcpStream,
    store: &SharedStore,
    config: &SharedConfig,
    client: &mut ClientState,
    broker: &SharedBroker,
) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);
    let (push_tx, mut push_rx) = mpsc::unbounded_channel();

    loop {
        // Drain every complete frame already buffered.
        loop {
            match RespParser::parse(&mut buf) {
                Ok(Some(frame)) => {
                    let reply =
                        process_frame(frame, store, config, client, broker, &push_tx).await;
                    if !matches!(reply, RespValue::Void) {
                        stream.write_all(&reply.serialize()).await?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // Report the decode failure; discard the buffer to
                    // resynchronize and keep the connection alive.
                    let reply = RespValue::error(format!("ERR Protocol error: {e}"));
                    stream.write_all(&reply.serialize()).await?;
                    buf.clear();
                }
            }
        }

        tokio::select! {
            result = stream.read_buf(&mut buf) => {
                match result {
                    Ok(0) => {
                        if !buf.is_empty() {
                            debug!("connection closed mid-frame ({} bytes discarded)", buf.len());
                        }
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }
            Some(push) = push_rx.recv() => {
                stream.write_all(&push.serialize()).await?;
            }
        }
    }
}

async fn process_frame(
    frame: RespValue,
    store: &SharedStore,
    config: &SharedConfig,
    client: &mut ClientState,
    broker: &SharedBroker,
    push_tx: &PushSender,
) -> RespValue {
    let items = match frame {
        RespValue::Array(items) if !items.is_empty() => items,
        _ => return RespValue::error("ERR invalid command format"),
    };

    let cmd_name = match items[0].as_bulk() {
        Some(name) => name.to_uppercase(),
        None => return RespValue::error("ERR invalid command name"),
    };
    let args = &items[1..];

    if !client.authenticated && cmd_name != "AUTH" {
        return RespValue::error("NOAUTH Authentication required.");
    }

    command::dispatch(&cmd_name, args, store, config, client, broker, push_tx).await
}
