use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// With a timeout configured the wait is bounded and the child is
/// killed on expiry; the caller sees the same error shape as a process
/// that could not be started. `what` names the tool for diagnostics.
pub(crate) async fn run_captured(
    mut cmd: Command,
    timeout: Option<Duration>,
    what: &str,
) -> std::result::Result<Output, String> {
    cmd.kill_on_drop(true);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result,
            Err(_) => return Err(format!("{what} timed out after {}s", limit.as_secs())),
        },
        None => cmd.output().await,
    };

    result.map_err(|e| format!("failed to run {what}: {e}"))
}
