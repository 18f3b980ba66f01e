//! `axon remote set`: add or update the hub's origin remote.

use crate::{config::Config, error::Result, git, output};

pub fn execute_set(url: &str) -> Result<()> {
   git::ensure_available()?;
   let cfg = Config::load()?;
   let repo = cfg.repo_path.as_path();

   let existing = git::capture(repo, &["remote", "get-url", "origin"])
      .ok()
      .filter(|cap| cap.success)
      .map(|cap| cap.stdout.trim().to_string())
      .unwrap_or_default();

   if existing.is_empty() {
      git::run_in(repo, &["remote", "add", "origin", url])?;
      output::ok("", &format!("Remote origin added: {url}"));
   } else if existing == url {
      output::skip("", &format!("Remote origin already set to: {url}"));
   } else {
      git::run_in(repo, &["remote", "set-url", "origin", url])?;
      output::ok("", &format!("Remote origin updated: {existing} → {url}"));
   }

   // Best-effort: record origin/HEAD so later commands know the remote's
   // default branch.
   if let Ok(cap) = git::capture(repo, &["fetch", "--prune", "origin"])
      && !cap.success
   {
      output::warn(
         "",
         &format!(
            "git fetch origin failed; remote default branch may be unknown:\n{}",
            cap.combined().trim()
         ),
      );
   }
   if git::run_in(repo, &["remote", "set-head", "origin", "-a"]).is_err() {
      output::warn("", "could not set origin/HEAD automatically; remote default branch may be unknown");
   }

   output::info("", "Run 'axon sync' to push local content to the remote.");
   Ok(())
}
