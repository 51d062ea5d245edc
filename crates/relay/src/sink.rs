use std::io::Write;

/// Append-only surface for run diagnostics.
///
/// Presentation only: the pipeline behaves identically whichever sink
/// is installed.
pub trait DiagnosticSink {
    fn append(&mut self, text: &str);
}

/// Discards everything; the headless default.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn append(&mut self, _text: &str) {}
}

/// Writes each entry to standard error.
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn append(&mut self, text: &str) {
        let _ = writeln!(std::io::stderr(), "{text}");
    }
}

/// Collects entries in memory; used by tests to assert on the
/// diagnostic stream.
#[derive(Default)]
pub struct BufferSink {
    pub entries: Vec<String>,
}

impl DiagnosticSink for BufferSink {
    fn append(&mut self, text: &str) {
        self.entries.push(text.to_string());
    }
}
