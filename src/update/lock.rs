//! Per-user advisory file lock serializing self-update runs.
//!
//! The lock is a file created with `create_new`, carrying the owner pid so a
//! crashed updater's leftover can be detected and reclaimed. Waiters poll
//! with a short sleep until the caller's overall timeout expires.

use std::{
   fs::{self, File, OpenOptions},
   io::Write,
   path::{Path, PathBuf},
   time::{Duration, Instant, SystemTime},
};

use crate::{
   config,
   error::{Error, Result},
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Age after which a lock with unreadable owner metadata is considered
/// abandoned.
const ORPHAN_TTL: Duration = Duration::from_secs(600);

/// Held for the entire update critical section; released on drop.
pub struct UpdateLock {
   path: PathBuf,
}

impl UpdateLock {
   /// Acquires the per-user update lock, polling until `timeout` expires.
   pub fn acquire(timeout: Duration) -> Result<Self> {
      let path = lock_path()?;
      let start = Instant::now();
      loop {
         match OpenOptions::new().create_new(true).write(true).open(&path) {
            Ok(mut file) => {
               let _ = write_owner_metadata(&mut file);
               return Ok(Self { path });
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
               if is_stale(&path) {
                  let _ = fs::remove_file(&path);
                  continue;
               }
               if start.elapsed() >= timeout {
                  return Err(Error::UpdateInProgress { lock: path });
               }
               std::thread::sleep(POLL_INTERVAL);
            },
            Err(e) => {
               return Err(Error::Fs { op: "cannot create", path, source: e });
            },
         }
      }
   }

   /// One-shot acquisition used by the swap helper, which must not wait.
   pub fn try_acquire() -> Result<Self> {
      Self::acquire(Duration::ZERO)
   }
}

impl Drop for UpdateLock {
   fn drop(&mut self) {
      let _ = fs::remove_file(&self.path);
   }
}

/// The per-user lock path: the OS cache directory when available, `~/.axon`
/// as the fallback.
pub fn lock_path() -> Result<PathBuf> {
   if let Some(dirs) = directories::BaseDirs::new() {
      let dir = dirs.cache_dir().join("axon");
      if fs::create_dir_all(&dir).is_ok() {
         return Ok(dir.join("update.lock"));
      }
   }
   let dir = config::axon_dir()?;
   fs::create_dir_all(&dir)
      .map_err(|e| Error::Fs { op: "cannot create", path: dir.clone(), source: e })?;
   Ok(dir.join("update.lock"))
}

fn write_owner_metadata(file: &mut File) -> std::io::Result<()> {
   writeln!(file, "pid={}", std::process::id())?;
   file.sync_all()
}

fn is_stale(path: &Path) -> bool {
   if let Some(pid) = read_owner_pid(path) {
      return !pid_is_alive(pid);
   }
   // No readable owner: fall back to age.
   let age = fs::metadata(path)
      .and_then(|m| m.modified())
      .ok()
      .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
      .unwrap_or(Duration::ZERO);
   age > ORPHAN_TTL
}

fn read_owner_pid(path: &Path) -> Option<u32> {
   let content = fs::read_to_string(path).ok()?;
   content
      .lines()
      .find_map(|line| line.strip_prefix("pid="))
      .and_then(|rest| rest.trim().parse().ok())
}

#[cfg(unix)]
pub fn pid_is_alive(pid: u32) -> bool {
   let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
   rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(windows)]
pub fn pid_is_alive(pid: u32) -> bool {
   // Best-effort: tasklist reports the PID when the process still exists.
   std::process::Command::new("tasklist")
      .args(["/FI", &format!("PID eq {pid}")])
      .output()
      .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
      .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
pub fn pid_is_alive(_pid: u32) -> bool {
   false
}
