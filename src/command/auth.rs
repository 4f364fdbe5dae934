use crate::command::required_arg;
use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::error::{CommandError, CommandResult};
use crate::resp::RespValue;

/// AUTH password — validates against the configured secret and marks the
/// connection authenticated.
pub fn cmd_auth(
    args: &[RespValue],
    config: &SharedConfig,
    client: &mut ClientState,
) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("auth"));
    }
    let password = required_arg(args, 0, "auth")?;

    config.validate_password(password)?;
    client.authenticated = true;
    Ok(RespValue::ok())
}
