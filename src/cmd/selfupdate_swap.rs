//! `axon __selfupdate-swap`: internal Windows helper that swaps the running
//! binary after its parent process exits.
//!
//! Spawned detached by `axon update`: waits (bounded) for the parent PID to
//! disappear, performs the two-rename swap under the same update lock,
//! verifies the installed binary, and rolls back on failure.

use std::{fs, path::PathBuf, time::{Duration, Instant}};

use crate::{
   error::{Error, Result},
   output,
   update::{self, lock::UpdateLock},
};

const PARENT_POLL: Duration = Duration::from_millis(250);

pub struct SwapArgs {
   pub pid:      u32,
   pub current:  PathBuf,
   pub new_path: PathBuf,
   pub backup:   PathBuf,
   pub expected: String,
   pub timeout:  Duration,
}

pub fn execute(args: SwapArgs) -> Result<()> {
   if !cfg!(windows) {
      return Err(Error::Failed("__selfupdate-swap is only supported on windows".into()));
   }
   if args.pid == 0
      || args.current.as_os_str().is_empty()
      || args.new_path.as_os_str().is_empty()
      || args.backup.as_os_str().is_empty()
      || args.expected.is_empty()
   {
      return Err(Error::Failed("invalid arguments".into()));
   }

   let _lock = UpdateLock::try_acquire()?;

   let deadline = Instant::now() + args.timeout;
   while update::lock::pid_is_alive(args.pid) {
      if Instant::now() >= deadline {
         return Err(Error::Failed(format!("timed out waiting for parent pid {}", args.pid)));
      }
      std::thread::sleep(PARENT_POLL);
   }

   let _ = update::cleanup_backup(&args.backup);
   fs::rename(&args.current, &args.backup).map_err(|e| Error::Fs {
      op:     "cannot backup current binary",
      path:   args.current.clone(),
      source: e,
   })?;
   if let Err(e) = fs::rename(&args.new_path, &args.current) {
      let _ = fs::rename(&args.backup, &args.current);
      return Err(Error::Fs {
         op:     "cannot replace binary",
         path:   args.current.clone(),
         source: e,
      });
   }

   if let Err(e) = update::verify_binary_version(&args.current, &args.expected) {
      let failed = args
         .current
         .parent()
         .map(|dir| dir.join("axon.failed.exe"))
         .unwrap_or_else(|| PathBuf::from("axon.failed.exe"));
      let _ = fs::rename(&args.current, failed);
      let _ = fs::rename(&args.backup, &args.current);
      return Err(e);
   }

   if update::cleanup_backup(&args.backup).is_err() {
      output::warn("", &format!("cannot remove backup: {}", args.backup.display()));
   }
   output::ok("", "Update applied successfully.");
   Ok(())
}
