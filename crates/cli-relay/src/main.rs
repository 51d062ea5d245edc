use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use sonicrelay_relay::notify::SmtpMailer;
use sonicrelay_relay::sink::{DiagnosticSink, NoopSink, StderrSink};
use sonicrelay_relay::{default_config_path, load_settings, run_pipeline, RunContext};

#[derive(Parser, Debug)]
#[command(name = "sonicrelay")]
#[command(about = "Steganographic message relay pipeline", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the settings file (defaults to ~/.sonicrelay)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    info!("Loading settings from {}", config_path.display());
    let settings = load_settings(&config_path)?;
    let ctx = RunContext::resolve(&settings)?;

    info!("Working directory: {}", ctx.work_dir.display());
    info!("Relay daemon: {}", ctx.daemon.display());
    if ctx.mail.is_some() {
        info!("Confirmation mail enabled");
    }

    let mut sink: Box<dyn DiagnosticSink> = if ctx.debug {
        Box::new(StderrSink)
    } else {
        Box::new(NoopSink)
    };

    match run_pipeline(&ctx, sink.as_mut(), &SmtpMailer).await {
        Ok(report) => {
            // The daemon's raw output is the operational record of the
            // transaction; always hand it to the operator.
            eprint!("{}", report.relay_output);
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
