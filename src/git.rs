//! Thin driver over the external `git` binary.
//!
//! Axon never embeds a git implementation: every repository operation shells
//! out to the host `git`, which also keeps authentication delegated to the
//! host's credential helpers.

use std::{
   fs,
   path::{Path, PathBuf},
   process::{Command, Stdio},
};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Captured output of one git invocation.
pub struct Capture {
   pub stdout:  String,
   pub stderr:  String,
   pub success: bool,
}

impl Capture {
   /// Stdout and stderr concatenated, for callers that pattern-match on
   /// whatever git printed.
   pub fn combined(&self) -> String {
      let mut out = self.stdout.clone();
      out.push_str(&self.stderr);
      out
   }
}

/// Returns a clear error when `git` is not on the PATH.
pub fn ensure_available() -> Result<()> {
   match Command::new("git")
      .arg("--version")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
   {
      Ok(_) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::GitMissing),
      Err(e) => Err(e.into()),
   }
}

/// Runs a git sub-command, streaming output to the user's terminal.
pub fn run(args: &[&str]) -> Result<()> {
   let status = Command::new("git").args(args).status().map_err(spawn_error)?;
   if !status.success() {
      return Err(Error::Git {
         op:     args.join(" "),
         detail: format!("exit status {}", status.code().unwrap_or(-1)),
      });
   }
   Ok(())
}

/// Runs a git sub-command inside `repo` (`git -C <repo> …`).
pub fn run_in(repo: &Path, args: &[&str]) -> Result<()> {
   let mut full: Vec<&str> = vec!["-C"];
   let repo_str = repo.to_string_lossy();
   full.push(&repo_str);
   full.extend_from_slice(args);
   run(&full)
}

/// Runs a git sub-command inside `repo` and captures its output instead of
/// streaming it. A non-zero exit is reported through `success`, not as an
/// error, so callers can inspect what git said.
pub fn capture(repo: &Path, args: &[&str]) -> Result<Capture> {
   let output = Command::new("git")
      .arg("-C")
      .arg(repo)
      .args(args)
      .output()
      .map_err(spawn_error)?;
   Ok(Capture {
      stdout:  String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr:  String::from_utf8_lossy(&output.stderr).into_owned(),
      success: output.status.success(),
   })
}

fn spawn_error(e: std::io::Error) -> Error {
   if e.kind() == std::io::ErrorKind::NotFound {
      Error::GitMissing
   } else {
      e.into()
   }
}

/// Reports whether the repo has uncommitted changes.
pub fn is_dirty(repo: &Path) -> Result<bool> {
   let cap = capture(repo, &["status", "--porcelain"])?;
   if !cap.success {
      return Err(Error::Git { op: "status".into(), detail: cap.stderr.trim().to_string() });
   }
   Ok(!cap.stdout.trim().is_empty())
}

/// Reports whether the repo has any remote configured.
pub fn has_remote(repo: &Path) -> bool {
   capture(repo, &["remote"])
      .map(|cap| cap.success && !cap.stdout.trim().is_empty())
      .unwrap_or(false)
}

/// Reports whether the remote has no refs at all, i.e. a brand-new repository
/// that has never received a push. An ls-remote failure (auth, network) is
/// treated as non-empty so the caller takes the safer pull-first path.
pub fn remote_is_empty(repo: &Path) -> bool {
   capture(repo, &["ls-remote", "--heads", "origin"])
      .map(|cap| cap.success && cap.stdout.trim().is_empty())
      .unwrap_or(false)
}

/// Resolves the branch the sync pipeline should use: `origin/HEAD` when the
/// remote advertises one, the local HEAD branch otherwise, `master` as the
/// last resort. Never creates a branch.
pub fn default_branch(repo: &Path) -> String {
   if let Ok(cap) = capture(repo, &["symbolic-ref", "refs/remotes/origin/HEAD"])
      && cap.success
      && let Some(name) = cap.stdout.trim().strip_prefix("refs/remotes/origin/")
      && !name.is_empty()
   {
      return name.to_string();
   }
   if let Ok(cap) = capture(repo, &["symbolic-ref", "--short", "HEAD"])
      && cap.success
   {
      let name = cap.stdout.trim();
      if !name.is_empty() {
         return name.to_string();
      }
   }
   "master".to_string()
}

/// Removes every `.git` directory nested inside the hub working tree, keeping
/// only the hub's own root `.git`. Skills cloned from the internet often carry
/// their own `.git`, which git would otherwise index as an embedded repo and
/// silently exclude from cross-machine sync.
///
/// Each stripped path is first de-indexed with a best-effort
/// `git rm --cached -q <path>` so a stale gitlink entry does not linger.
/// Returns the hub-relative paths whose `.git` was removed.
pub fn strip_nested_git_dirs(repo: &Path) -> Result<Vec<PathBuf>> {
   let root_git = repo.join(".git");
   let mut stripped = Vec::new();

   let mut walker = WalkDir::new(repo).into_iter();
   while let Some(entry) = walker.next() {
      let entry = entry.map_err(|e| Error::Fs {
         op:     "cannot walk",
         path:   repo.to_path_buf(),
         source: e.into(),
      })?;
      if !entry.file_type().is_dir() || entry.file_name() != ".git" {
         continue;
      }
      if entry.path() == root_git {
         walker.skip_current_dir();
         continue;
      }

      let owner = entry.path().parent().unwrap_or(repo);
      let rel = owner.strip_prefix(repo).unwrap_or(owner).to_path_buf();

      // The cached entry may not exist; spawn failures are also non-fatal.
      let _ = capture(repo, &["rm", "--cached", "-q", &rel.to_string_lossy()]);

      fs::remove_dir_all(entry.path()).map_err(|e| Error::Fs {
         op:     "cannot remove",
         path:   entry.path().to_path_buf(),
         source: e,
      })?;
      stripped.push(rel);
      walker.skip_current_dir();
   }

   Ok(stripped)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn nested_git_dirs_stripped_root_kept() {
      let tmp = tempfile::tempdir().unwrap();
      let hub = tmp.path();
      fs::create_dir_all(hub.join(".git/objects")).unwrap();
      fs::create_dir_all(hub.join("skills/cloned/.git/objects")).unwrap();
      fs::create_dir_all(hub.join("skills/clean")).unwrap();
      fs::write(hub.join("skills/cloned/SKILL.md"), "x").unwrap();

      let stripped = strip_nested_git_dirs(hub).unwrap();
      assert_eq!(stripped, vec![PathBuf::from("skills/cloned")]);
      assert!(hub.join(".git/objects").exists());
      assert!(!hub.join("skills/cloned/.git").exists());
      assert!(hub.join("skills/cloned/SKILL.md").exists());
   }

   #[test]
   fn strip_is_noop_without_nested_repos() {
      let tmp = tempfile::tempdir().unwrap();
      fs::create_dir_all(tmp.path().join(".git")).unwrap();
      fs::create_dir_all(tmp.path().join("skills/a")).unwrap();
      let stripped = strip_nested_git_dirs(tmp.path()).unwrap();
      assert!(stripped.is_empty());
   }
}
