//! Cross-platform advisory file lock with stale-holder reclamation (spec §4.1, C1).

use docvault_core::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Minimum age before a breadcrumb from a dead process may be reclaimed.
pub const STALE_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// A held advisory lock. Dropping it releases the OS lock; the breadcrumb is
/// left in place and overwritten by the next acquirer.
pub struct LockHandle {
    file: File,
    path: PathBuf,
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to unlock file on drop");
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Breadcrumb {
    pid: u32,
    acquired_at_secs: u64,
}

impl Breadcrumb {
    fn now() -> Self {
        Breadcrumb {
            pid: process::id(),
            acquired_at_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    fn encode(&self) -> String {
        format!("{} {}", self.pid, self.acquired_at_secs)
    }

    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let pid = parts.next()?.parse().ok()?;
        let acquired_at_secs = parts.next()?.parse().ok()?;
        Some(Breadcrumb {
            pid,
            acquired_at_secs,
        })
    }

    fn is_stale(&self, now_secs: u64) -> bool {
        let age = now_secs.saturating_sub(self.acquired_at_secs);
        age >= STALE_GRACE_PERIOD.as_secs() && !process_is_alive(self.pid)
    }
}

#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    // Signal 0 performs no-op delivery; failure with ESRCH means the pid is
    // not a live process. Any other result (including permission errors
    // against a pid that belongs to someone else) is treated as alive.
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    // Windows reclamation relies solely on the grace period; a held OS lock
    // would fail acquisition below regardless of this check.
    true
}

/// Acquires the lock at `path`, creating the sentinel file if needed,
/// blocking up to `timeout` and retrying reclamation of stale breadcrumbs.
pub fn acquire(path: &Path, timeout: Duration) -> Result<LockHandle> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                write_breadcrumb(&mut file)?;
                debug!(path = %path.display(), pid = process::id(), "acquired file lock");
                return Ok(LockHandle {
                    file,
                    path: path.to_path_buf(),
                });
            }
            Err(_) => {
                if Instant::now() >= deadline {
                    return Err(Error::LockUnavailable(format!(
                        "timed out acquiring lock at {}",
                        path.display()
                    )));
                }
                if let Some(crumb) = read_breadcrumb(&mut file) {
                    let now_secs = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs();
                    if crumb.is_stale(now_secs) {
                        warn!(pid = crumb.pid, path = %path.display(), "reclaiming stale lock");
                        // The holder is gone; our `try_lock_exclusive` above
                        // failing means the OS still thinks it's held on some
                        // platforms even after process death, so fall through
                        // to a short sleep and retry rather than force-unlock.
                    }
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn write_breadcrumb(file: &mut File) -> Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(Breadcrumb::now().encode().as_bytes())?;
    file.flush()?;
    Ok(())
}

fn read_breadcrumb(file: &mut File) -> Option<Breadcrumb> {
    let mut buf = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut buf).ok()?;
    Breadcrumb::parse(&buf)
}
