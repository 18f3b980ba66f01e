//! `axon link`: create symlinks from tool destinations to the hub.

use crate::{
   config::{Config, Target},
   error::{Error, Result},
   git,
   link::{LinkStatus, link_target},
   output,
};

/// Resolves the targets a link/unlink invocation should process: all of them
/// (sorted by name) for no argument or `all`, a single named target
/// otherwise.
pub fn select_targets(cfg: &Config, name: Option<&str>) -> Result<(Vec<Target>, bool)> {
   match name {
      None | Some("all") => {
         let mut targets = cfg.targets.clone();
         targets.sort_by(|a, b| a.name.cmp(&b.name));
         Ok((targets, false))
      },
      Some(name) => {
         let target = cfg
            .targets
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| Error::TargetNotFound(name.to_string()))?;
         Ok((vec![target], true))
      },
   }
}

pub fn execute(name: Option<String>) -> Result<()> {
   git::ensure_available()?;
   let cfg = Config::load()?;
   let (targets, single) = select_targets(&cfg, name.as_deref())?;

   let mut results: Vec<(String, LinkStatus)> = Vec::new();
   let mut not_installed: Vec<String> = Vec::new();

   for target in &targets {
      match link_target(&cfg, target) {
         LinkStatus::NotInstalled { tool } => {
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
            LinkStatus::Linked { detail } => output::ok(name, detail),
            LinkStatus::Already => output::skip(name, "already linked"),
            LinkStatus::Relinked { detail } => output::info(name, &format!("re-linked ({detail})")),
            LinkStatus::BackedUp { detail } => output::ok(name, detail),
            LinkStatus::Error { detail } => {
               output::err(name, detail);
               return Err(Error::Failed("link failed".into()));
            },
            LinkStatus::NotInstalled { .. } => unreachable!("filtered above"),
         }
      }
      return Ok(());
   }

   output::section("Link");

   let of = |want: fn(&LinkStatus) -> bool| {
      results.iter().filter(move |(_, s)| want(s)).collect::<Vec<_>>()
   };
   let linked = of(|s| matches!(s, LinkStatus::Linked { .. }));
   let backed_up = of(|s| matches!(s, LinkStatus::BackedUp { .. }));
   let relinked = of(|s| matches!(s, LinkStatus::Relinked { .. }));
   let already = of(|s| matches!(s, LinkStatus::Already));
   let errors = of(|s| matches!(s, LinkStatus::Error { .. }));

   if !linked.is_empty() {
      output::bullet("Linked:");
      for (name, status) in linked {
         if let LinkStatus::Linked { detail } = status {
            output::ok(name, detail);
         }
      }
   }
   if !backed_up.is_empty() {
      output::bullet("Linked (original backed up):");
      for (name, status) in backed_up {
         if let LinkStatus::BackedUp { detail } = status {
            output::ok(name, detail);
         }
      }
   }
   if !relinked.is_empty() {
      output::bullet("Re-linked (wrong target corrected):");
      for (name, status) in relinked {
         if let LinkStatus::Relinked { detail } = status {
            output::info(name, detail);
         }
      }
   }
   if !already.is_empty() {
      output::bullet("Already linked:");
      for (name, _) in already {
         output::skip(name, "");
      }
   }
   if !not_installed.is_empty() {
      not_installed.sort();
      output::bullet("Not installed (skipped):");
      for tool in &not_installed {
         output::skip("", tool);
      }
   }
   if !errors.is_empty() {
      output::bullet("Errors:");
      for (name, status) in &errors {
         if let LinkStatus::Error { detail } = status {
            output::err(name, detail);
         }
      }
      return Err(Error::Failed(format!("{} target(s) failed to link", errors.len())));
   }

   Ok(())
}
