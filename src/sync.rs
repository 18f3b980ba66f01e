//! Sync engine: a git-wrapping pipeline with layered exclude filtering,
//! embedded-repo stripping, initial-push detection, and read-only /
//! read-write modes.

use std::{fs, path::Path};

use crate::{
   config::{Config, SyncMode},
   error::{Error, Result},
   git, output,
};

/// Synchronizes the hub according to the configured sync mode. Both modes
/// first regenerate the per-repo runtime exclude file.
pub fn sync(cfg: &Config) -> Result<()> {
   write_git_excludes(cfg)?;
   output::ok("", &format!("Exclude filter applied ({} patterns)", cfg.excludes.len()));

   match cfg.sync_mode {
      SyncMode::ReadOnly => sync_read_only(cfg),
      SyncMode::ReadWrite => sync_read_write(cfg),
   }
}

/// Read-write pipeline: strip embedded repos → add → commit → push or
/// pull-rebase-push.
fn sync_read_write(cfg: &Config) -> Result<()> {
   let repo = cfg.repo_path.as_path();
   let has_remote = git::has_remote(repo);

   // Skills cloned from the internet often carry their own .git; embedded
   // repos silently break cross-machine sync, so they are stripped up front.
   let stripped = git::strip_nested_git_dirs(repo)?;
   if !stripped.is_empty() {
      output::warn(
         "",
         &format!(
            "stripped {} embedded .git dir(s) from skills (these were cloned repos):",
            stripped.len()
         ),
      );
      for path in &stripped {
         output::info("", &path.to_string_lossy());
      }
   }

   output::info("", "git add .");
   git::run_in(repo, &["add", "."])?;

   let hostname = hostname();
   let msg = format!("axon: sync from {hostname}");
   output::info("", &format!("git commit -m {msg:?}"));
   let commit = git::capture(repo, &["commit", "-m", &msg])?;
   if !commit.success {
      let text = commit.combined();
      if text.contains("nothing to commit") || text.contains("nothing added to commit") {
         output::skip("", "nothing to commit");
      } else {
         return Err(Error::Git { op: "commit".into(), detail: text.trim().to_string() });
      }
   }

   if !has_remote {
      output::ok(
         "",
         "Local commit done (no remote configured; run 'axon remote set <url>' to push).",
      );
      return Ok(());
   }

   let branch = git::default_branch(repo);

   if git::remote_is_empty(repo) {
      // First push: there is no upstream branch to pull from yet.
      output::info("", &format!("git push -u origin {branch}  (initial push to empty remote)"));
      git::run_in(repo, &["push", "-u", "origin", &branch])?;
      output::ok("", "Sync complete (initial push).");
      return Ok(());
   }

   output::info("", &format!("git pull --rebase origin {branch}"));
   if git::run_in(repo, &["pull", "--rebase", "origin", &branch]).is_err() {
      return Err(Error::MergeConflict { repo: repo.to_path_buf() });
   }

   output::info("", &format!("git push origin {branch}"));
   git::run_in(repo, &["push", "origin", &branch])?;

   output::ok("", "Sync complete (read-write).");
   Ok(())
}

/// Read-only pipeline: warn on local edits, then pull fast-forward only.
fn sync_read_only(cfg: &Config) -> Result<()> {
   let repo = cfg.repo_path.as_path();

   if git::is_dirty(repo)? {
      output::warn("", "You have local edits in the hub.");
      println!("   These will NOT be pushed (read-only mode) and may be overwritten on pull.");
      println!("   Stash or discard them if you don't need them.");
      println!();
   }

   let branch = git::default_branch(repo);
   output::info("", &format!("git pull --ff-only origin {branch}"));
   git::run_in(repo, &["pull", "--ff-only", "origin", &branch]).map_err(|_| Error::Git {
      op:     "pull".into(),
      detail: "fast-forward only enforced in read-only mode".into(),
   })?;

   output::ok("", "Sync complete (read-only).");
   Ok(())
}

/// Regenerates `.git/info/exclude`, the per-repo, non-committed exclude file,
/// from the configured patterns. Rewritten in full on every sync.
pub fn write_git_excludes(cfg: &Config) -> Result<()> {
   write_exclude_file(&cfg.repo_path, &cfg.excludes)
}

fn write_exclude_file(repo: &Path, patterns: &[String]) -> Result<()> {
   let exclude = repo.join(".git").join("info").join("exclude");
   if let Some(parent) = exclude.parent() {
      fs::create_dir_all(parent).map_err(|e| Error::Fs {
         op:     "cannot create",
         path:   parent.to_path_buf(),
         source: e,
      })?;
   }

   let mut content = String::from(
      "# Auto-generated by axon sync — do not edit manually.\n# Edit 'excludes:' in \
       ~/.axon/axon.yaml instead.\n\n",
   );
   for pattern in patterns {
      content.push_str(pattern);
      content.push('\n');
   }

   fs::write(&exclude, content)
      .map_err(|e| Error::Fs { op: "cannot write", path: exclude, source: e })
}

fn hostname() -> String {
   let name = gethostname::gethostname().to_string_lossy().into_owned();
   if name.is_empty() { "unknown".to_string() } else { name }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn exclude_file_regenerated_in_full() {
      let tmp = tempfile::tempdir().unwrap();
      let repo = tmp.path();
      fs::create_dir_all(repo.join(".git/info")).unwrap();
      fs::write(repo.join(".git/info/exclude"), "stale-user-edit\n").unwrap();

      write_exclude_file(repo, &["*.tmp".to_string(), ".DS_Store".to_string()]).unwrap();

      let content = fs::read_to_string(repo.join(".git/info/exclude")).unwrap();
      assert!(content.starts_with("# Auto-generated by axon sync"));
      assert!(content.ends_with("*.tmp\n.DS_Store\n"));
      assert!(!content.contains("stale-user-edit"));
   }
}
