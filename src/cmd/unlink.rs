//! `axon unlink`: remove symlinks and restore the most recent backup.

use crate::{
   config::Config,
   error::{Error, Result},
   link::{UnlinkStatus, unlink_target},
   output,
};

pub fn execute(name: Option<String>) -> Result<()> {
   let cfg = Config::load()?;
   let (targets, single) = super::link::select_targets(&cfg, name.as_deref())?;

   let mut results: Vec<(String, UnlinkStatus)> = Vec::new();
   let mut not_installed: Vec<String> = Vec::new();

   for target in &targets {
      match unlink_target(&cfg, target) {
         UnlinkStatus::NotInstalled { tool } => {
            if !not_installed.contains(&tool) {
               not_installed.push(tool);
            }
         },
         status => results.push((target.name.clone(), status)),
      }
   }

   if single {
      if let Some((name, status)) = results.first() {
         match status {
            UnlinkStatus::Restored { detail } => output::ok(name, &format!("restored: {detail}")),
            UnlinkStatus::Removed { detail } => {
               output::skip(name, &format!("symlink removed, {detail}"));
            },
            UnlinkStatus::NothingToUnlink => {
               output::miss(name, "destination does not exist, nothing to unlink");
            },
            UnlinkStatus::NotSymlink { detail } => {
               output::warn(name, &format!("{detail} — refusing to delete real data"));
            },
            UnlinkStatus::Error { detail } => {
               output::err(name, detail);
               return Err(Error::Failed("unlink failed".into()));
            },
            UnlinkStatus::NotInstalled { .. } => unreachable!("filtered above"),
         }
      }
      return Ok(());
   }

   output::section("Unlink");

   let of = |want: fn(&UnlinkStatus) -> bool| {
      results.iter().filter(move |(_, s)| want(s)).collect::<Vec<_>>()
   };
   let restored = of(|s| matches!(s, UnlinkStatus::Restored { .. }));
   let removed = of(|s| matches!(s, UnlinkStatus::Removed { .. }));
   let nothing = of(|s| matches!(s, UnlinkStatus::NothingToUnlink));
   let not_symlink = of(|s| matches!(s, UnlinkStatus::NotSymlink { .. }));
   let errors = of(|s| matches!(s, UnlinkStatus::Error { .. }));

   if !restored.is_empty() {
      output::bullet("Restored from backup:");
      for (name, status) in restored {
         if let UnlinkStatus::Restored { detail } = status {
            output::ok(name, detail);
         }
      }
   }
   if !removed.is_empty() {
      output::bullet("Symlink removed (no backup):");
      for (name, status) in removed {
         if let UnlinkStatus::Removed { detail } = status {
            output::skip(name, detail);
         }
      }
   }
   if !nothing.is_empty() {
      output::bullet("Nothing to unlink:");
      for (name, _) in nothing {
         output::miss(name, "destination does not exist");
      }
   }
   if !not_symlink.is_empty() {
      output::bullet("Skipped (not a symlink — real data protected):");
      for (name, status) in not_symlink {
         if let UnlinkStatus::NotSymlink { detail } = status {
            output::warn(name, detail);
         }
      }
   }
   if !not_installed.is_empty() {
      not_installed.sort();
      output::bullet("Not installed (skipped):");
      for tool in &not_installed {
         output::skip(tool, "");
      }
   }
   if !errors.is_empty() {
      output::bullet("Errors:");
      for (name, status) in &errors {
         if let UnlinkStatus::Error { detail } = status {
            output::err(name, detail);
         }
      }
      return Err(Error::Failed(format!("{} target(s) failed to unlink", errors.len())));
   }

   Ok(())
}
