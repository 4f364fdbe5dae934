use std::path::Path;
use std::sync::Arc;

use crate::error::{CommandError, ConfigError};

/// Server configuration, resolved once at startup. A directive file
/// (`oxidis.conf` style, one `key value` per line, `#` comments) can be
/// loaded with `--config`; individual CLI flags override it.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// When set, connections must AUTH before anything else.
    pub requirepass: Option<String>,
    pub storage: StorageKind,
    /// Directory for backend data files.
    pub dir: String,
}

/// Which persistence backend to mount behind the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Memory,
    Aof,
    Sled,
}

impl StorageKind {
    fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "memory" => Ok(StorageKind::Memory),
            "aof" => Ok(StorageKind::Aof),
            "sled" => Ok(StorageKind::Sled),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1".to_string(),
            port: 6379,
            requirepass: None,
            storage: StorageKind::default(),
            dir: ".".to_string(),
        }
    }
}

impl Config {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = args.get(i + 1);
            match (flag, value) {
                ("--config", Some(path)) => {
                    config.load_file(Path::new(path))?;
                    i += 1;
                }
                ("--bind", Some(v)) => {
                    config.bind = v.clone();
                    i += 1;
                }
                ("--port", Some(v)) => {
                    config.port = v
                        .parse()
                        .map_err(|_| ConfigError::InvalidDirective("port".to_string()))?;
                    i += 1;
                }
                ("--requirepass", Some(v)) => {
                    config.set_password(v)?;
                    i += 1;
                }
                ("--storage", Some(v)) => {
                    config.storage = StorageKind::from_name(v)?;
                    i += 1;
                }
                ("--dir", Some(v)) => {
                    config.dir = v.clone();
                    i += 1;
                }
                _ => {}
            }
            i += 1;
        }
        Ok(config)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => continue,
            };
            match key {
                "bind" => self.bind = value.to_string(),
                "port" => {
                    self.port = value
                        .parse()
                        .map_err(|_| ConfigError::InvalidDirective("port".to_string()))?;
                }
                "requirepass" => self.set_password(value)?,
                "storage" => self.storage = StorageKind::from_name(value)?,
                "dir" => self.dir = value.to_string(),
                _ => continue,
            }
        }
        Ok(())
    }

    /// Passwords must be 16-128 chars drawn from `[a-zA-Z0-9!&#$^<>-]`.
    fn set_password(&mut self, raw: &str) -> Result<(), ConfigError> {
        let valid_char =
            |c: char| c.is_ascii_alphanumeric() || "!&#$^<>-".contains(c);
        if !(16..=128).contains(&raw.len()) || !raw.chars().all(valid_char) {
            return Err(ConfigError::InvalidPassword);
        }
        self.requirepass = Some(raw.to_string());
        Ok(())
    }

    pub fn requires_auth(&self) -> bool {
        self.requirepass.is_some()
    }

    pub fn validate_password(&self, input: &str) -> Result<(), CommandError> {
        match &self.requirepass {
            None => Err(CommandError::NoPasswordSet),
            Some(expected) if expected == input => Ok(()),
            Some(_) => Err(CommandError::WrongPassword),
        }
    }
}

pub type SharedConfig = Arc<Config>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 6379);
        assert_eq!(config.storage, StorageKind::Memory);
        assert!(!config.requires_auth());
    }

    #[test]
    fn cli_flags_override_defaults() {
        let config = Config::from_args(&args(&[
            "--port", "7000", "--bind", "0.0.0.0", "--storage", "aof", "--dir", "/tmp/ox",
        ]))
        .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.storage, StorageKind::Aof);
        assert_eq!(config.dir, "/tmp/ox");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            Config::from_args(&args(&["--storage", "postgres"])),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn config_file_directives() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# oxidis test config").unwrap();
        writeln!(file, "port 7001").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "storage sled").unwrap();
        writeln!(file, "requirepass sixteen-chars-ok!").unwrap();
        writeln!(file, "unknown-directive whatever").unwrap();

        let mut config = Config::default();
        config.load_file(file.path()).unwrap();
        assert_eq!(config.port, 7001);
        assert_eq!(config.storage, StorageKind::Sled);
        assert_eq!(config.requirepass.as_deref(), Some("sixteen-chars-ok!"));
    }

    #[test]
    fn cli_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port 7001").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config =
            Config::from_args(&args(&["--config", &path, "--port", "7002"])).unwrap();
        assert_eq!(config.port, 7002);
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(matches!(
            Config::from_args(&args(&["--requirepass", "short"])),
            Err(ConfigError::InvalidPassword)
        ));
    }

    #[test]
    fn password_with_bad_characters_is_rejected() {
        assert!(matches!(
            Config::from_args(&args(&["--requirepass", "sixteen chars with spaces"])),
            Err(ConfigError::InvalidPassword)
        ));
    }

    #[test]
    fn validate_password_paths() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate_password("x"),
            Err(CommandError::NoPasswordSet)
        ));

        config.set_password("sixteen-chars-ok!").unwrap();
        assert!(config.validate_password("sixteen-chars-ok!").is_ok());
        assert!(matches!(
            config.validate_password("nope"),
            Err(CommandError::WrongPassword)
        ));
    }
}
