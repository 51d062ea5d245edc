use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::context::RunContext;
use crate::error::{RelayError, Result};
use crate::proc::run_captured;

/// Run the steganography tool over `image`, recovering the embedded
/// message into the context's artifact path.
///
/// The tool is invoked as
/// `<runtime> -jar <jar> x -p <key> -e <artifact> <image>` and must
/// exit zero with the artifact populated. The captured stdout is
/// returned for the diagnostic surface only.
pub async fn extract(ctx: &RunContext, image: &Path) -> Result<String> {
    let mut cmd = Command::new(&ctx.runtime);
    cmd.arg("-jar")
        .arg(&ctx.extractor_jar)
        .arg("x")
        .arg("-p")
        .arg(&ctx.steg_key)
        .arg("-e")
        .arg(&ctx.artifact_path)
        .arg(image)
        .current_dir(&ctx.work_dir);
    debug!("extraction command: {:?}", cmd.as_std());

    let output = run_captured(cmd, ctx.timeout, "extraction tool")
        .await
        .map_err(RelayError::ExtractionFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RelayError::ExtractionFailed(format!(
            "{} exited with {}: {}",
            ctx.extractor_jar.display(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
