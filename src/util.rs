use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- robust filesystem ops with backoff (Windows-friendly) --------

pub(crate) const TRIES: usize = 16;
pub(crate) const DELAY_MS: u64 = 50;

/// Return true for transient/retriable I/O errors often seen on Windows when
/// filter drivers (AV/backup), USB/NAS volumes, or sharing violations occur.
#[cfg(windows)]
fn is_retriable_io_error(e: &io::Error) -> bool {
    match e.raw_os_error() {
        //   5   = Access is denied (often AV/share)
        //   21  = Device not ready
        //   32  = Sharing violation
        //   33  = Lock violation
        //   1224= File with a user-mapped section open
        Some(5) | Some(21) | Some(32) | Some(33) | Some(1224) => true,
        _ => e.kind() == io::ErrorKind::Interrupted,
    }
}

/// Elsewhere the same raw codes are permanent errors (EIO, EISDIR, EPIPE, ...).
#[cfg(not(windows))]
fn is_retriable_io_error(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::Interrupted
}

fn with_backoff<T, F>(tries: usize, delay_ms: u64, mut op: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

/// Read a whole file with retries/backoff for transient errors.
pub fn read_with_backoff(path: &Path) -> io::Result<Vec<u8>> {
    with_backoff(TRIES, DELAY_MS, || fs::read(path))
}

/// Create `path`, write `bytes` and fsync, retrying transient failures.
pub fn write_synced_with_backoff(path: &Path, bytes: &[u8]) -> io::Result<()> {
    with_backoff(TRIES, DELAY_MS, || {
        let mut f = File::create(path)?;
        f.write_all(bytes)?;
        f.sync_all()
    })
}

/// Copy a file with retries/backoff for transient errors.
pub fn copy_with_backoff(src: &Path, dest: &Path) -> io::Result<()> {
    with_backoff(TRIES, DELAY_MS, || fs::copy(src, dest).map(|_| ()))
}

/// Rename a file with retries/backoff for transient errors.
/// On the same volume this replaces `dest` atomically.
pub fn rename_with_backoff(src: &Path, dest: &Path) -> io::Result<()> {
    with_backoff(TRIES, DELAY_MS, || fs::rename(src, dest))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path) -> io::Result<()> {
    with_backoff(TRIES, DELAY_MS, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn permanent_os_errors_are_not_retried() {
        // EIO, EISDIR, EPIPE, EDOM share numbers with Windows sharing/lock codes.
        for code in [5, 21, 32, 33] {
            assert!(!is_retriable_io_error(&io::Error::from_raw_os_error(code)), "code {code}");
        }
        assert!(is_retriable_io_error(&io::Error::from(io::ErrorKind::Interrupted)));
    }
}
