//! In-memory capture of tracing output, for asserting on log lines.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer that collects formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Everything logged so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }

    /// Lines containing `needle`, in the order they were logged.
    pub fn lines_with(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buf: Arc::clone(&self.buf),
        }
    }
}

fn subscriber(capture: &LogCapture) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_target(true)
        .with_max_level(tracing::Level::DEBUG)
        .finish()
}

/// Route this thread's tracing output (debug and up) into a fresh buffer
/// until the returned guard is dropped.
///
/// The subscriber is thread-local, so use it from a current-thread runtime
/// (the `#[tokio::test]` default); tasks spawned there log into it too.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let guard = tracing::subscriber::set_default(subscriber(&capture));
    (capture, guard)
}

/// Capture output from every thread, including ones the test does not own
/// (such as the file watcher's).
///
/// Installs the global subscriber, so it can be used once per test binary
/// and not together with `init_tracing`.
pub fn capture_global_logs() -> LogCapture {
    let capture = LogCapture::default();
    tracing::subscriber::set_global_default(subscriber(&capture))
        .expect("global tracing subscriber already installed");
    capture
}
