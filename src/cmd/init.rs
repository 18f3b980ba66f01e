//! `axon init`: bootstrap the hub in one of three modes and import
//! pre-existing tool directories.

use std::{fs, path::Path};

use crate::{
   config::{self, Config, SyncMode, Target},
   error::{Error, Result},
   git,
   importer::{self, ConflictPair, ImportReport},
   output, util,
};

/// Default committed ignore file, written into the hub on first init.
const DEFAULT_GITIGNORE: &str = ".DS_Store\nThumbs.db\n*.tmp\n*.bak\n*~\n.idea/\n.vscode/\n";

/// Normalizes text line endings across platforms so syncing the hub between
/// Windows and Linux does not churn CRLF/LF.
const DEFAULT_GITATTRIBUTES: &str = "* text=auto eol=lf\n";

/// Runs init. Modes: no argument (local repo), a repo URL (clone or init +
/// add origin), `--upstream` (clone the configured upstream, read-only).
pub fn execute(repo_url: Option<String>, upstream: bool) -> Result<()> {
   git::ensure_available()?;

   let axon_dir = config::axon_dir()?;
   let cfg_path = config::config_path()?;

   fs::create_dir_all(&axon_dir)
      .map_err(|e| Error::Fs { op: "cannot create", path: axon_dir.clone(), source: e })?;
   output::ok("", &format!("Axon directory ready: {}", axon_dir.display()));

   if !cfg_path.exists() {
      let mut cfg = Config::default_config()?;
      if upstream {
         cfg.sync_mode = SyncMode::ReadOnly;
      }
      cfg.save()?;
      output::ok("", &format!("Config written: {}", cfg_path.display()));
   } else {
      output::skip("", &format!("Config already exists: {}", cfg_path.display()));
   }

   config::ensure_dotenv_template()?;

   let cfg = Config::load()?;
   let repo_path = cfg.repo_path.clone();

   // cloned_from_remote is set only when a non-empty remote was cloned; the
   // local import is skipped in that case so remote data is not overlaid.
   let cloned_from_remote = if upstream {
      let url = cfg
         .upstream
         .clone()
         .filter(|u| !u.is_empty())
         .ok_or_else(|| Error::ConfigInvalid("no upstream URL configured in axon.yaml".into()))?;
      println!("  Cloning upstream {url} → {}", repo_path.display());
      git::run(&["clone", &url, &repo_path.to_string_lossy()])
         .map_err(|e| Error::Git { op: "clone".into(), detail: e.to_string() })?;
      output::ok("", "Upstream cloned (read-only mode).");
      true
   } else if let Some(url) = repo_url {
      setup_hub_with_remote(&repo_path, &url)?
   } else {
      setup_hub_local(&repo_path)?;
      false
   };

   let gitignore = repo_path.join(".gitignore");
   if !gitignore.exists() {
      fs::write(&gitignore, DEFAULT_GITIGNORE)
         .map_err(|e| Error::Fs { op: "cannot write", path: gitignore.clone(), source: e })?;
      output::ok("", &format!(".gitignore written: {}", gitignore.display()));
   }

   let gitattributes = repo_path.join(".gitattributes");
   if !gitattributes.exists() {
      fs::write(&gitattributes, DEFAULT_GITATTRIBUTES).map_err(|e| Error::Fs {
         op:     "cannot write",
         path:   gitattributes.clone(),
         source: e,
      })?;
      output::ok("", &format!(".gitattributes written: {}", gitattributes.display()));
   }

   if !cloned_from_remote {
      import_existing_skills(&cfg)?;
   }

   println!("\n✓  axon init complete. Run 'axon status' to verify your environment.");
   Ok(())
}

fn setup_hub_local(repo_path: &Path) -> Result<()> {
   fs::create_dir_all(repo_path)
      .map_err(|e| Error::Fs { op: "cannot create", path: repo_path.to_path_buf(), source: e })?;
   if !repo_path.join(".git").exists() {
      git::run_in(repo_path, &["init"])?;
      output::ok("", &format!("Local Git repo initialised: {}", repo_path.display()));
   } else {
      output::skip("", &format!("Git repo already exists: {}", repo_path.display()));
   }
   Ok(())
}

/// Personal-remote mode: clone when the remote exists with content, otherwise
/// init locally and attach origin. Returns whether a non-empty clone seeded
/// the hub.
fn setup_hub_with_remote(repo_path: &Path, remote: &str) -> Result<bool> {
   if !repo_path.exists() {
      output::info("", &format!("Cloning {remote} → {}", repo_path.display()));
      if git::run(&["clone", remote, &repo_path.to_string_lossy()]).is_ok() {
         if util::dir_has_content(repo_path) {
            output::ok("", "Remote cloned (read-write mode).");
            return Ok(true);
         }
         output::info("", "Remote repo is empty; initialising locally.");
      }
   }
   setup_hub_local(repo_path)?;
   let _ = git::capture(repo_path, &["remote", "add", "origin", remote]);
   output::ok("", &format!("Remote origin set: {remote}"));

   // Best-effort: record origin/HEAD so later commands know the remote's
   // default branch.
   if let Ok(cap) = git::capture(repo_path, &["fetch", "--prune", "origin"])
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
   if git::run_in(repo_path, &["remote", "set-head", "origin", "-a"]).is_err() {
      output::warn("", "could not set origin/HEAD automatically; remote default branch may be unknown");
   }

   Ok(false)
}

/// Scans each target destination and copies real directories into the hub,
/// with exclude filtering and MD5 conflict resolution.
fn import_existing_skills(cfg: &Config) -> Result<()> {
   let mut targets = cfg.targets.clone();
   targets.sort_by(|a, b| a.name.cmp(&b.name));

   struct ImportedEntry {
      target: Target,
      report: ImportReport,
   }

   let mut imported: Vec<ImportedEntry> = Vec::new();
   let mut already_linked: Vec<String> = Vec::new();
   let mut not_found: Vec<String> = Vec::new();
   let mut not_installed: Vec<String> = Vec::new();
   let mut total_conflicts: Vec<ConflictPair> = Vec::new();

   for target in targets {
      let dest = target.expanded_destination()?;

      // Missing parent means the tool is not installed at all.
      if dest.parent().map(|p| !p.exists()).unwrap_or(true) {
         let base = target.tool_base_name().to_string();
         if !not_installed.contains(&base) {
            not_installed.push(base);
         }
         continue;
      }

      let meta = match fs::symlink_metadata(&dest) {
         Ok(meta) => meta,
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            not_found.push(target.name.clone());
            continue;
         },
         Err(e) => return Err(Error::Fs { op: "cannot stat", path: dest, source: e }),
      };
      if meta.file_type().is_symlink() {
         already_linked.push(target.name.clone());
         continue;
      }
      if !meta.is_dir() {
         not_found.push(target.name.clone());
         continue;
      }

      let hub_dest = cfg.repo_path.join(&target.source);
      let report = importer::import_dir(&dest, &hub_dest, &target.name, &cfg.excludes)?;
      total_conflicts.extend(report.conflicts.iter().cloned());
      imported.push(ImportedEntry { target, report });
   }

   println!("\n=== Import Existing Skills ===");

   if !imported.is_empty() {
      println!("\n● Imported:");
      for entry in &imported {
         let label = entry.target.source.trim_end_matches('s');
         let label = if label.is_empty() { "item" } else { label };
         let r = &entry.report;
         output::ok(
            &entry.target.name,
            &format!(
               "{} {label}(s) imported, {} skipped, {} conflict(s)  ({} file(s))",
               r.skills_imported,
               r.skills_skipped,
               r.skills_conflicts,
               r.imported + r.skipped
            ),
         );
      }
   }

   if !already_linked.is_empty() {
      println!("\n● Already linked (hub manages these):");
      for name in &already_linked {
         output::skip(name, "");
      }
   }

   if !not_found.is_empty() {
      println!("\n● Destination not found:");
      for name in &not_found {
         output::miss(name, "");
      }
   }

   if !not_installed.is_empty() {
      not_installed.sort();
      println!("\n● Not installed (skipped):");
      for name in &not_installed {
         output::skip("", name);
      }
   }

   if !total_conflicts.is_empty() {
      println!("\n⚠  {} conflict(s) detected during import.", total_conflicts.len());
      println!("   All versions have been preserved in {}.", cfg.repo_path.display());
      println!("   Please review and resolve the following files manually:");
      for c in &total_conflicts {
         println!("     - {}  ← conflicts with {}", c.conflict.display(), c.original.display());
      }
   }

   Ok(())
}
