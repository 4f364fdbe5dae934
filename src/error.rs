use crate::storage::StorageError;

/// Errors produced while validating or executing a command. The dispatcher
/// turns these into wire Error replies with an `ERR ` prefix; they never
/// terminate the connection and never leave a partial mutation behind.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArgCount(&'static str),

    #[error("value stored at key is not a {0}")]
    WrongType(&'static str),

    #[error("invalid options sent to '{0}' command")]
    InvalidOptions(&'static str),

    #[error("key does not exist")]
    KeyDoesNotExist,

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("value is not an integer or out of range")]
    NotInteger,

    #[error("wrong password")]
    WrongPassword,

    #[error("no password is set")]
    NoPasswordSet,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CommandResult = Result<crate::resp::RespValue, CommandError>;

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid password supplied")]
    InvalidPassword,

    #[error("unknown storage backend '{0}'")]
    UnknownBackend(String),

    #[error("invalid value for '{0}'")]
    InvalidDirective(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
