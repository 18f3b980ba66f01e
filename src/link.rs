//! Link engine: converts heterogeneous tool destinations into canonical
//! symlinks pointing at the hub, with timestamped backups for populated
//! directories. The unlink engine reverses the operation and refuses to touch
//! anything that is not a symlink.

use std::{fs, io, path::{Path, PathBuf}};

use chrono::Local;

use crate::{
   config::{self, Config, Target},
   error::{Error, Result},
};

const BACKUP_TS_FORMAT: &str = "%Y%m%d%H%M%S";

/// Outcome of linking one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
   /// Symlink created at a previously free destination.
   Linked { detail: String },
   /// Destination already points at the hub source.
   Already,
   /// A symlink to somewhere else was replaced.
   Relinked { detail: String },
   /// A populated real directory was moved aside, then linked.
   BackedUp { detail: String },
   /// The tool is not installed (destination parent missing); grouped by
   /// tool base name.
   NotInstalled { tool: String },
   Error { detail: String },
}

/// Outcome of unlinking one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlinkStatus {
   /// Symlink removed and the newest backup renamed back into place.
   Restored { detail: String },
   /// Symlink removed; no backup existed.
   Removed { detail: String },
   /// Destination does not exist.
   NothingToUnlink,
   /// Destination is real data, not a symlink; refused.
   NotSymlink { detail: String },
   NotInstalled { tool: String },
   Error { detail: String },
}

/// Applies the five-case linking logic for a single target.
pub fn link_target(cfg: &Config, target: &Target) -> LinkStatus {
   let dest = match target.expanded_destination() {
      Ok(dest) => dest,
      Err(e) => return LinkStatus::Error { detail: e.to_string() },
   };
   let hub_source = cfg.repo_path.join(&target.source);

   if let Err(e) = fs::create_dir_all(&hub_source) {
      return LinkStatus::Error { detail: format!("cannot create hub path: {e}") };
   }

   let meta = fs::symlink_metadata(&dest);

   // Case: destination does not exist at all.
   if matches!(&meta, Err(e) if e.kind() == io::ErrorKind::NotFound) {
      let parent_missing = dest.parent().map(|p| !p.exists()).unwrap_or(true);
      if parent_missing {
         return LinkStatus::NotInstalled { tool: target.tool_base_name().to_string() };
      }
      return match create_symlink(&hub_source, &dest) {
         Ok(()) => LinkStatus::Linked {
            detail: format!("{} → {}", dest.display(), hub_source.display()),
         },
         Err(e) => LinkStatus::Error { detail: e.to_string() },
      };
   }
   let meta = match meta {
      Ok(meta) => meta,
      Err(e) => return LinkStatus::Error { detail: format!("stat: {e}") },
   };

   // Symlink cases.
   if meta.file_type().is_symlink() {
      let current = match fs::read_link(&dest) {
         Ok(current) => current,
         Err(e) => return LinkStatus::Error { detail: format!("readlink: {e}") },
      };
      if current == hub_source {
         return LinkStatus::Already;
      }
      if let Err(e) = fs::remove_file(&dest) {
         return LinkStatus::Error { detail: format!("cannot remove old symlink: {e}") };
      }
      return match create_symlink(&hub_source, &dest) {
         Ok(()) => LinkStatus::Relinked { detail: format!("was → {}", current.display()) },
         Err(e) => LinkStatus::Error { detail: e.to_string() },
      };
   }

   // Real directory cases.
   if !meta.is_dir() {
      return LinkStatus::Error {
         detail: format!("{} is not a directory or symlink", dest.display()),
      };
   }

   let entries = match fs::read_dir(&dest) {
      Ok(entries) => entries.count(),
      Err(e) => return LinkStatus::Error { detail: format!("readdir: {e}") },
   };

   if entries == 0 {
      if let Err(e) = fs::remove_dir(&dest) {
         return LinkStatus::Error { detail: format!("cannot remove empty dir: {e}") };
      }
      return match create_symlink(&hub_source, &dest) {
         Ok(()) => LinkStatus::Linked {
            detail: format!("{} → {}", dest.display(), hub_source.display()),
         },
         Err(e) => LinkStatus::Error { detail: e.to_string() },
      };
   }

   // Populated directory: move aside, then link.
   let backup = match backup_path(&target.name) {
      Ok(backup) => backup,
      Err(e) => return LinkStatus::Error { detail: e.to_string() },
   };
   if let Err(e) = fs::rename(&dest, &backup) {
      return LinkStatus::Error { detail: format!("backup failed: {e}") };
   }
   match create_symlink(&hub_source, &dest) {
      Ok(()) => LinkStatus::BackedUp { detail: format!("backed up → {}", backup.display()) },
      Err(e) => LinkStatus::Error { detail: e.to_string() },
   }
}

/// Removes the symlink for a single target and restores its newest backup
/// when one exists. Real data is never deleted.
pub fn unlink_target(_cfg: &Config, target: &Target) -> UnlinkStatus {
   let dest = match target.expanded_destination() {
      Ok(dest) => dest,
      Err(e) => return UnlinkStatus::Error { detail: e.to_string() },
   };

   if dest.parent().map(|p| !p.exists()).unwrap_or(true) {
      return UnlinkStatus::NotInstalled { tool: target.tool_base_name().to_string() };
   }

   let meta = match fs::symlink_metadata(&dest) {
      Ok(meta) => meta,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return UnlinkStatus::NothingToUnlink,
      Err(e) => return UnlinkStatus::Error { detail: format!("stat: {e}") },
   };

   if !meta.file_type().is_symlink() {
      return UnlinkStatus::NotSymlink {
         detail: format!("{} is not a symlink", dest.display()),
      };
   }

   if let Err(e) = fs::remove_file(&dest) {
      return UnlinkStatus::Error { detail: format!("cannot remove symlink: {e}") };
   }

   let backup = match latest_backup(&target.name) {
      Ok(backup) => backup,
      Err(_) => None,
   };
   let Some(backup) = backup else {
      return UnlinkStatus::Removed { detail: "no backup found".to_string() };
   };

   match fs::rename(&backup, &dest) {
      Ok(()) => UnlinkStatus::Restored {
         detail: format!("{} → {}", backup.display(), dest.display()),
      },
      Err(e) => UnlinkStatus::Error {
         detail: format!("cannot restore backup {}: {e}", backup.display()),
      },
   }
}

/// Reserves a timestamped backup path for a target (the directory itself is
/// created by the rename that moves the destination aside).
fn backup_path(target_name: &str) -> Result<PathBuf> {
   let backups = config::axon_dir()?.join("backups");
   fs::create_dir_all(&backups)
      .map_err(|e| Error::Fs { op: "cannot create", path: backups.clone(), source: e })?;
   let ts = Local::now().format(BACKUP_TS_FORMAT);
   Ok(backups.join(format!("{target_name}_{ts}")))
}

/// Returns the most recent backup directory for a target, discovered by
/// prefix match and timestamp parse; newest means the maximum parsed
/// timestamp. Entries whose suffix does not parse are ignored.
pub fn latest_backup(target_name: &str) -> Result<Option<PathBuf>> {
   let backups = config::axon_dir()?.join("backups");
   let entries = match fs::read_dir(&backups) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(Error::Fs { op: "cannot read", path: backups, source: e }),
   };

   let prefix = format!("{target_name}_");
   let mut newest: Option<(chrono::NaiveDateTime, PathBuf)> = None;
   for entry in entries.flatten() {
      if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
         continue;
      }
      let name = entry.file_name();
      let Some(ts) = name.to_string_lossy().strip_prefix(&prefix).map(str::to_owned) else {
         continue;
      };
      let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(&ts, BACKUP_TS_FORMAT) else {
         continue;
      };
      if newest.as_ref().map(|(best, _)| parsed > *best).unwrap_or(true) {
         newest = Some((parsed, entry.path()));
      }
   }
   Ok(newest.map(|(_, path)| path))
}

#[cfg(unix)]
fn create_symlink(hub_source: &Path, dest: &Path) -> Result<()> {
   std::os::unix::fs::symlink(hub_source, dest).map_err(|e| Error::SymlinkDenied {
      dest:   dest.to_path_buf(),
      reason: e.to_string(),
   })
}

#[cfg(windows)]
fn create_symlink(hub_source: &Path, dest: &Path) -> Result<()> {
   std::os::windows::fs::symlink_dir(hub_source, dest).map_err(|e| Error::SymlinkDenied {
      dest:   dest.to_path_buf(),
      reason: format!(
         "{e} — Developer Mode or Administrator required; run 'axon doctor' for remediation"
      ),
   })
}
