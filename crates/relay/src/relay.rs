use tokio::process::Command;
use tracing::debug;

use crate::context::RunContext;
use crate::error::{RelayError, Result};
use crate::proc::run_captured;

/// Leading marker the daemon prints when it rejects a message at the
/// application level even though the process exits zero.
pub const FAILURE_SENTINEL: &str = "<<";

/// Hand `message` to the relay daemon and capture its stdout.
///
/// The message travels as a single literal argument; it is the
/// caller's responsibility that it contains nothing the argument
/// parser would split or mangle.
pub async fn relay(ctx: &RunContext, message: &str) -> Result<String> {
    let mut cmd = Command::new(&ctx.daemon);
    cmd.arg("decryptsend").arg(message).current_dir(&ctx.work_dir);
    debug!("relay command: {:?}", cmd.as_std());

    let output = run_captured(cmd, ctx.timeout, "relay daemon")
        .await
        .map_err(RelayError::RelayFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RelayError::RelayFailed(format!(
            "{} exited with {}: {}",
            ctx.daemon.display(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// True when the daemon's output carries the rejection marker.
pub fn is_rejected(output: &str) -> bool {
    output.starts_with(FAILURE_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_marker_detection() {
        assert!(is_rejected("<<rejected: fee too low"));
        assert!(is_rejected("<<"));
        assert!(!is_rejected("txid 3a9f"));
        assert!(!is_rejected(""));
        assert!(!is_rejected(" <<leading space does not count"));
    }
}
