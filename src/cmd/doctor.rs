//! `axon doctor`: pre-flight environment checks, with optional fixes.

use std::{fs, path::Path, process::Command};

use walkdir::WalkDir;

use crate::{
   config::{self, Config},
   error::{Error, Result},
   git,
   link::{LinkStatus, link_target},
   output,
};

pub fn execute(fix: bool) -> Result<()> {
   if fix {
      return execute_fix();
   }

   let mut all_ok = true;

   output::section("axon doctor");
   println!();

   println!("[ git ]");
   match Command::new("git").arg("--version").output() {
      Ok(out) if out.status.success() => {
         output::ok("", String::from_utf8_lossy(&out.stdout).trim());
      },
      _ => {
         output::err("", "git not found — please install Git: https://git-scm.com/downloads");
         all_ok = false;
      },
   }
   println!();

   println!("[ Hub directory ]");
   let axon_dir = config::axon_dir()?;
   let cfg_path = config::config_path()?;
   if cfg_path.exists() {
      output::ok("", &format!("~/.axon/ exists: {}", axon_dir.display()));
   } else {
      output::err("", "~/.axon/axon.yaml not found — run 'axon init' first");
      all_ok = false;
   }
   println!();

   println!("[ axon.yaml ]");
   let cfg = match Config::load() {
      Ok(cfg) => {
         output::ok("", &format!("valid YAML — {} target(s) defined", cfg.targets.len()));
         if cfg.repo_path.as_os_str().is_empty() {
            output::err("", "repo_path is empty");
            all_ok = false;
         }
         Some(cfg)
      },
      Err(e) => {
         output::err("", &format!("cannot parse axon.yaml: {e}"));
         all_ok = false;
         None
      },
   };
   println!();

   println!("[ Hub repo ]");
   match &cfg {
      Some(cfg) => {
         if cfg.repo_path.join(".git").exists() {
            output::ok("", &format!("Git repo ready: {}", cfg.repo_path.display()));
         } else {
            output::err(
               "",
               &format!("Hub repo not initialised at {} — run 'axon init'", cfg.repo_path.display()),
            );
            all_ok = false;
         }
      },
      None => output::warn("", "skipped (axon.yaml not loaded)"),
   }
   println!();

   println!("[ Symlinks ]");
   match &cfg {
      Some(cfg) => {
         if check_symlinks(cfg, &mut all_ok) {
            println!("  All configured symlinks are healthy.");
         }
      },
      None => output::warn("", "skipped (axon.yaml not loaded)"),
   }
   println!();

   println!("[ Unresolved conflicts ]");
   match &cfg {
      Some(cfg) => {
         let conflicts = find_conflict_files(&cfg.repo_path);
         if conflicts.is_empty() {
            output::ok("", "no unresolved conflict files found");
         } else {
            for c in &conflicts {
               output::warn("", c);
            }
            println!("\n  ⚠  {} unresolved conflict file(s) found in hub.", conflicts.len());
            println!("     Review and delete the .conflict-* files you no longer need,");
            println!("     then run 'axon sync' to commit the resolution.");
            all_ok = false;
         }
      },
      None => output::warn("", "skipped (axon.yaml not loaded)"),
   }
   println!();

   if cfg!(windows) {
      println!("[ Windows symlink permission ]");
      if check_symlink_permission().is_err() {
         output::err(
            "",
            "Symlink creation will fail in this terminal — Developer Mode or Administrator \
             required.\n   Run axon in an Administrator terminal.\n   WSL users are not affected \
             by this restriction.",
         );
         all_ok = false;
      } else {
         output::ok("", "symlink creation permitted");
      }
      println!();
   }

   println!("===================");
   if all_ok {
      println!("✓  All checks passed. Axon is ready to use.");
      Ok(())
   } else {
      eprintln!("✗  One or more checks failed. See details above.");
      Err(Error::Failed("doctor found issues".into()))
   }
}

/// `doctor --fix`: deletes leftover `.conflict-*` files and repairs broken
/// or missing symlinks for installed tools.
fn execute_fix() -> Result<()> {
   git::ensure_available()?;
   let cfg = Config::load()?;

   output::section("axon doctor --fix");

   println!("\n[ Unresolved conflicts ]");
   let conflicts = find_conflict_files(&cfg.repo_path);
   let mut failed = 0usize;
   if conflicts.is_empty() {
      output::ok("", "no conflict files found — nothing to fix");
   } else {
      for rel in &conflicts {
         let full = cfg.repo_path.join(rel);
         match fs::remove_file(&full) {
            Ok(()) => output::ok("", &format!("deleted {rel}")),
            Err(e) => {
               output::err("", &format!("cannot delete {rel}: {e}"));
               failed += 1;
            },
         }
      }
      if failed == 0 {
         println!(
            "\n  ✓  {} conflict file(s) removed. Run 'axon sync' to commit the cleanup.",
            conflicts.len()
         );
      }
   }

   println!("\n[ Symlink repair ]");
   let mut targets = cfg.targets.clone();
   targets.sort_by(|a, b| a.name.cmp(&b.name));
   let mut repaired = 0usize;
   for target in &targets {
      match link_target(&cfg, target) {
         LinkStatus::Already | LinkStatus::NotInstalled { .. } => {},
         LinkStatus::Linked { detail } | LinkStatus::BackedUp { detail } => {
            output::ok(&target.name, &detail);
            repaired += 1;
         },
         LinkStatus::Relinked { detail } => {
            output::info(&target.name, &detail);
            repaired += 1;
         },
         LinkStatus::Error { detail } => {
            output::err(&target.name, &detail);
            failed += 1;
         },
      }
   }
   if repaired == 0 {
      output::ok("", "all symlinks already healthy");
   }

   println!();
   if failed > 0 {
      return Err(Error::Failed(format!("{failed} issue(s) could not be fixed")));
   }
   Ok(())
}

fn check_symlinks(cfg: &Config, all_ok: &mut bool) -> bool {
   let mut targets = cfg.targets.clone();
   targets.sort_by(|a, b| a.name.cmp(&b.name));

   let mut healthy = true;
   for target in &targets {
      let dest = match target.expanded_destination() {
         Ok(dest) => dest,
         Err(e) => {
            output::err(&target.name, &format!("cannot expand path: {e}"));
            *all_ok = false;
            healthy = false;
            continue;
         },
      };
      // Tool not installed: status reports this verbosely, doctor stays quiet.
      if dest.parent().map(|p| !p.exists()).unwrap_or(true) {
         continue;
      }

      let meta = match fs::symlink_metadata(&dest) {
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            output::warn(&target.name, &format!("not linked yet (run 'axon link {}')", target.name));
            healthy = false;
            continue;
         },
         Err(e) => {
            output::err(&target.name, &format!("stat error: {e}"));
            *all_ok = false;
            healthy = false;
            continue;
         },
         Ok(meta) => meta,
      };
      if !meta.file_type().is_symlink() {
         output::warn(
            &target.name,
            &format!(
               "real directory present at {} (run 'axon link {}' to convert)",
               dest.display(),
               target.name
            ),
         );
         healthy = false;
         continue;
      }
      let expected = cfg.repo_path.join(&target.source);
      let actual = fs::read_link(&dest).unwrap_or_default();
      if actual != expected {
         output::err(
            &target.name,
            &format!(
               "wrong target:\n      got:  {}\n      want: {}",
               actual.display(),
               expected.display()
            ),
         );
         *all_ok = false;
         healthy = false;
         continue;
      }
      output::ok(&target.name, "OK");
   }
   healthy
}

/// Walks the hub and returns relative paths of every file whose name contains
/// `.conflict-`, leftovers from the import phase.
pub fn find_conflict_files(repo_path: &Path) -> Vec<String> {
   let mut found = Vec::new();
   for entry in WalkDir::new(repo_path).into_iter().flatten() {
      if entry.file_type().is_dir() {
         continue;
      }
      if entry.file_name().to_string_lossy().contains(".conflict-") {
         let rel = entry.path().strip_prefix(repo_path).unwrap_or(entry.path());
         found.push(rel.to_string_lossy().into_owned());
      }
   }
   found
}

/// Creates a throwaway symlink in the temp directory to probe whether the
/// current process may create symlinks at all.
fn check_symlink_permission() -> std::io::Result<()> {
   let tmp = std::env::temp_dir();
   let src = tmp.join("axon-doctor-src");
   let dst = tmp.join("axon-doctor-link");
   fs::write(&src, b"probe")?;
   let result = make_symlink(&src, &dst);
   let _ = fs::remove_file(&dst);
   let _ = fs::remove_file(&src);
   result
}

#[cfg(unix)]
fn make_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
   std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn make_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
   std::os::windows::fs::symlink_file(src, dst)
}
