#![cfg(unix)]

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use sonicrelay_relay::notify::{Mailer, NotifyOutcome};
use sonicrelay_relay::sink::BufferSink;
use sonicrelay_relay::{load_settings, run_pipeline, MailSettings, RelayError, RunContext};

#[derive(Default)]
struct RecordingMailer {
    sent: RefCell<Vec<String>>,
}

impl RecordingMailer {
    fn bodies(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, _mail: &MailSettings, body: &str) -> sonicrelay_relay::Result<()> {
        self.sent.borrow_mut().push(body.to_string());
        Ok(())
    }
}

struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _mail: &MailSettings, _body: &str) -> sonicrelay_relay::Result<()> {
        Err(RelayError::NotificationFailed(
            "connection refused".to_string(),
        ))
    }
}

/// Write an executable shell stub into `dir`.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A working directory holding one carrier image, a stub extraction
/// runtime, and a settings file assembled per test.
struct Fixture {
    work_dir: TempDir,
    daemon: String,
    runtime: PathBuf,
    extra: Vec<String>,
}

impl Fixture {
    /// The stub runtime is invoked as
    /// `<stub> -jar <jar> x -p <key> -e <artifact> <image>`, so the
    /// artifact path arrives as `$7`.
    fn new(daemon: &str, message: &str) -> Self {
        let work_dir = TempDir::new().unwrap();
        fs::write(work_dir.path().join("photo.jpg"), "jpeg bytes").unwrap();
        let runtime = write_script(
            work_dir.path(),
            "fake-java",
            &format!("printf '{message}' > \"$7\"\necho 'extraction ok'"),
        );
        Self {
            work_dir,
            daemon: daemon.to_string(),
            runtime,
            extra: Vec::new(),
        }
    }

    fn with_daemon_script(mut self, name: &str, body: &str) -> Self {
        let path = write_script(self.work_dir.path(), name, body);
        self.daemon = path.display().to_string();
        self
    }

    fn with_runtime_script(mut self, name: &str, body: &str) -> Self {
        self.runtime = write_script(self.work_dir.path(), name, body);
        self
    }

    fn with_line(mut self, line: &str) -> Self {
        self.extra.push(line.to_string());
        self
    }

    fn with_mail(self, fail: &str, success: &str) -> Self {
        self.with_line("confirm_address = \"ops@example.net\"")
            .with_line("sender = \"relay@example.net\"")
            .with_line("server = \"smtp.example.net\"")
            .with_line("username = \"relay\"")
            .with_line("password = \"secret\"")
            .with_line(&format!("fail = \"{fail}\""))
            .with_line(&format!("success = \"{success}\""))
    }

    /// Write the settings file and resolve it the way the binary does.
    fn context(&self) -> RunContext {
        let mut lines = vec![
            format!("daemon = \"{}\"", self.daemon),
            format!("java = \"{}\"", self.runtime.display()),
            format!("sonicrelay = \"{}\"", self.work_dir.path().display()),
        ];
        lines.extend(self.extra.iter().cloned());

        let config_path = self.work_dir.path().join("settings.toml");
        fs::write(&config_path, lines.join("\n")).unwrap();
        let settings = load_settings(&config_path).unwrap();
        RunContext::resolve(&settings).unwrap()
    }

    fn image_path(&self) -> PathBuf {
        self.work_dir.path().join("photo.jpg")
    }
}

#[tokio::test]
async fn test_end_to_end_success_without_confirmation() {
    let fixture = Fixture::new("/bin/echo", "secret-msg");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let report = run_pipeline(&ctx, &mut sink, &mailer).await.unwrap();

    assert!(report.relay_output.contains("secret-msg"));
    assert_eq!(report.notification, NotifyOutcome::Skipped);
    assert!(mailer.bodies().is_empty(), "no mail without confirm_address");

    assert!(!fixture.image_path().exists(), "carrier image not cleaned up");
    assert!(!ctx.artifact_path.exists(), "text artifact not cleaned up");

    // Intermediate outputs land on the diagnostic surface.
    assert!(sink.entries.iter().any(|e| e == "secret-msg"));
}

#[tokio::test]
async fn test_rejected_relay_sends_failure_mail() {
    let fixture = Fixture::new("/bin/echo", "secret-msg")
        .with_daemon_script("rejecting-daemon", "printf '<<rejected'")
        .with_mail("NOTIFY-FAIL", "NOTIFY-OK");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let report = run_pipeline(&ctx, &mut sink, &mailer).await.unwrap();

    assert_eq!(report.relay_output, "<<rejected");
    assert_eq!(report.notification, NotifyOutcome::Sent);
    assert_eq!(mailer.bodies(), vec!["NOTIFY-FAIL\n".to_string()]);

    assert!(!fixture.image_path().exists());
    assert!(!ctx.artifact_path.exists());
}

#[tokio::test]
async fn test_successful_relay_sends_success_mail() {
    let fixture = Fixture::new("/bin/echo", "secret-msg").with_mail("NOTIFY-FAIL", "RELAYED");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let report = run_pipeline(&ctx, &mut sink, &mailer).await.unwrap();

    assert_eq!(report.notification, NotifyOutcome::Sent);
    assert_eq!(mailer.bodies(), vec!["RELAYED\n".to_string()]);
}

#[tokio::test]
async fn test_extraction_failure_still_cleans_up() {
    let fixture =
        Fixture::new("/bin/echo", "unused").with_runtime_script("broken-java", "exit 3");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let result = run_pipeline(&ctx, &mut sink, &mailer).await;
    assert!(matches!(result, Err(RelayError::ExtractionFailed(_))));

    assert!(mailer.bodies().is_empty(), "extraction failure sends no mail");
    assert!(!fixture.image_path().exists(), "carrier image not cleaned up");
    assert!(!ctx.artifact_path.exists());
}

#[tokio::test]
async fn test_relay_failure_sends_failure_mail_and_cleans_up() {
    let fixture = Fixture::new("/bin/echo", "secret-msg")
        .with_daemon_script("dead-daemon", "echo 'daemon down' >&2\nexit 1")
        .with_mail("NOTIFY-FAIL", "NOTIFY-OK");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let result = run_pipeline(&ctx, &mut sink, &mailer).await;
    match result {
        Err(RelayError::RelayFailed(msg)) => assert!(msg.contains("daemon down")),
        other => panic!("expected RelayFailed, got {:?}", other.map(|r| r.relay_output)),
    }

    assert_eq!(mailer.bodies(), vec!["NOTIFY-FAIL\n".to_string()]);
    assert!(!fixture.image_path().exists());
    assert!(!ctx.artifact_path.exists());
}

#[tokio::test]
async fn test_notification_failure_is_not_fatal() {
    let fixture = Fixture::new("/bin/echo", "secret-msg").with_mail("NOTIFY-FAIL", "NOTIFY-OK");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();

    let report = run_pipeline(&ctx, &mut sink, &FailingMailer).await.unwrap();

    match &report.notification {
        NotifyOutcome::Failed(msg) => assert!(msg.contains("connection refused")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!fixture.image_path().exists(), "cleanup must still run");
    assert!(!ctx.artifact_path.exists());
}

#[tokio::test]
async fn test_configured_timeout_bounds_the_relay_wait() {
    let fixture = Fixture::new("/bin/echo", "secret-msg")
        .with_daemon_script("hung-daemon", "sleep 5")
        .with_line("timeout = 1");
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let result = run_pipeline(&ctx, &mut sink, &mailer).await;
    match result {
        Err(RelayError::RelayFailed(msg)) => assert!(msg.contains("timed out")),
        other => panic!("expected RelayFailed, got {:?}", other.map(|r| r.relay_output)),
    }

    assert!(!fixture.image_path().exists());
    assert!(!ctx.artifact_path.exists());
}

#[tokio::test]
async fn test_empty_working_directory_has_no_candidate() {
    let fixture = Fixture::new("/bin/echo", "unused");
    fs::remove_file(fixture.image_path()).unwrap();
    let ctx = fixture.context();
    let mut sink = BufferSink::default();
    let mailer = RecordingMailer::default();

    let result = run_pipeline(&ctx, &mut sink, &mailer).await;
    assert!(matches!(result, Err(RelayError::NoCandidateFile { .. })));
    assert!(mailer.bodies().is_empty());
}
