use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::{RelayError, Result};
use crate::extract::extract;
use crate::locate::{locate, ScanDepth, IMAGE_SUFFIXES};
use crate::notify::{compose_body, notify, Mailer, NotifyOutcome};
use crate::relay::{relay, FAILURE_SENTINEL};
use crate::sink::DiagnosticSink;

/// What one completed run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Raw stdout of the relay daemon — the operational record of the
    /// transaction, always surfaced to the operator.
    pub relay_output: String,
    pub notification: NotifyOutcome,
}

/// On-disk state owned by one run. Both files are removed exactly
/// once, whatever the run's outcome.
#[derive(Default)]
struct Artifacts {
    image: Option<PathBuf>,
    text: Option<PathBuf>,
}

impl Artifacts {
    fn cleanup(&mut self) {
        for path in self.text.take().into_iter().chain(self.image.take()) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Drive one run end to end: locate the carrier image, extract the
/// embedded message, hand it to the relay daemon, send the optional
/// confirmation, and clean up.
///
/// Fatal stage errors halt the sequence immediately; the extraction
/// artifact and the candidate image are removed on every exit path
/// regardless, including after a notification failure.
pub async fn run_pipeline(
    ctx: &RunContext,
    sink: &mut dyn DiagnosticSink,
    mailer: &dyn Mailer,
) -> Result<RunReport> {
    let mut artifacts = Artifacts::default();
    let result = run_stages(ctx, sink, mailer, &mut artifacts).await;
    artifacts.cleanup();
    result
}

async fn run_stages(
    ctx: &RunContext,
    sink: &mut dyn DiagnosticSink,
    mailer: &dyn Mailer,
    artifacts: &mut Artifacts,
) -> Result<RunReport> {
    info!("scanning {} for carrier images", ctx.work_dir.display());
    let image = locate(&ctx.work_dir, IMAGE_SUFFIXES, ScanDepth::Levels(0))?;
    artifacts.image = Some(image.clone());

    // Slated for removal before the tool runs, so a partial write from
    // a failed extraction is cleaned up too.
    artifacts.text = Some(ctx.artifact_path.clone());

    info!("extracting payload from {}", image.display());
    let tool_output = extract(ctx, &image).await?;
    sink.append(tool_output.trim());

    let message = std::fs::read_to_string(&ctx.artifact_path).map_err(|e| {
        RelayError::ExtractionFailed(format!(
            "cannot read extracted message {}: {}",
            ctx.artifact_path.display(),
            e
        ))
    })?;
    let message = message.trim();
    sink.append(message);

    info!("relaying message via {}", ctx.daemon.display());
    let relay_output = match relay(ctx, message).await {
        Ok(output) => output,
        Err(e) => {
            // A dead daemon still warrants the failure mail when one is
            // configured; the fatal error propagates either way.
            if let Some(mail) = &ctx.mail {
                let body = compose_body(mail, FAILURE_SENTINEL);
                if let Err(mail_err) = mailer.send(mail, &body) {
                    warn!("{mail_err}");
                }
            }
            return Err(e);
        }
    };
    sink.append(relay_output.trim());

    let notification = notify(ctx.mail.as_ref(), &relay_output, mailer);
    if notification == NotifyOutcome::Sent {
        sink.append("confirmation mail sent");
    }

    Ok(RunReport {
        relay_output,
        notification,
    })
}
