//! `axon status`: validate every symlink and show the hub's git status.

use std::fs;

use crate::{
   config::Config,
   error::{Error, Result},
   git, output,
};

pub fn execute(fetch: bool) -> Result<()> {
   let cfg = Config::load()?;

   let mut targets = cfg.targets.clone();
   targets.sort_by(|a, b| a.name.cmp(&b.name));

   println!("=== Symlink Health ===");

   let mut linked: Vec<String> = Vec::new();
   let mut need_link: Vec<String> = Vec::new();
   let mut real_dir: Vec<String> = Vec::new();
   let mut broken: Vec<String> = Vec::new();
   let mut not_installed: Vec<String> = Vec::new();

   for target in &targets {
      let dest = match target.expanded_destination() {
         Ok(dest) => dest,
         Err(e) => {
            broken.push(format!("  ✗  [{}] cannot expand path: {e}", target.name));
            continue;
         },
      };

      if dest.parent().map(|p| !p.exists()).unwrap_or(true) {
         let base = target.tool_base_name().to_string();
         if !not_installed.contains(&base) {
            not_installed.push(base);
         }
         continue;
      }

      let expected = cfg.repo_path.join(&target.source);
      match fs::symlink_metadata(&dest) {
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            need_link.push(format!(
               "  -  [{0}] not linked  (run: axon link {0})",
               target.name
            ));
         },
         Err(e) => broken.push(format!("  ✗  [{}] stat error: {e}", target.name)),
         Ok(meta) if !meta.file_type().is_symlink() => {
            real_dir.push(format!(
               "  !  [{0}] real directory — run 'axon link {0}' to convert (original will be \
                backed up)",
               target.name
            ));
         },
         Ok(_) => match fs::read_link(&dest) {
            Err(e) => broken.push(format!("  ✗  [{}] cannot read symlink: {e}", target.name)),
            Ok(actual) if actual != expected => broken.push(format!(
               "  ✗  [{}] wrong target:\n      got:  {}\n      want: {}",
               target.name,
               actual.display(),
               expected.display()
            )),
            Ok(_) => linked.push(format!("  ✓  [{}]", target.name)),
         },
      }
   }

   let group = |title: &str, lines: &[String]| {
      if !lines.is_empty() {
         println!("\n● {title}");
         for line in lines {
            println!("{line}");
         }
      }
   };
   group("Linked (healthy symlinks):", &linked);
   group("Real directories (not yet converted to symlinks):", &real_dir);
   group("Installed but not linked:", &need_link);
   group("Errors:", &broken);
   if !not_installed.is_empty() {
      println!("\n● Not installed (skipped):");
      not_installed.sort();
      for name in &not_installed {
         output::skip("", name);
      }
   }

   println!(
      "\n  {} linked / {} real dir / {} not linked / {} not installed (tools) / {} error  \
       (total: {} targets)",
      linked.len(),
      real_dir.len(),
      need_link.len(),
      not_installed.len(),
      broken.len(),
      targets.len()
   );

   println!("\n=== Hub Git Status ===");
   let cap = git::capture(
      &cfg.repo_path,
      &["-c", "advice.statusHints=false", "status"],
   )?;
   if !cap.success {
      return Err(Error::Git { op: "status".into(), detail: cap.stderr.trim().to_string() });
   }
   print!("{}", cap.stdout);

   if fetch {
      probe_ahead_behind(&cfg)?;
   }
   Ok(())
}

/// Fetches origin and reports how far the local branch is ahead of / behind
/// `origin/HEAD`.
fn probe_ahead_behind(cfg: &Config) -> Result<()> {
   let repo = cfg.repo_path.as_path();
   println!("\n=== Remote Tracking ===");

   if !git::has_remote(repo) {
      output::skip("", "no remote configured");
      return Ok(());
   }

   let fetched = git::capture(repo, &["fetch", "--prune", "origin"])?;
   if !fetched.success {
      output::warn("", &format!("git fetch failed:\n{}", fetched.combined().trim()));
      return Ok(());
   }

   let cap = git::capture(
      repo,
      &["rev-list", "--left-right", "--count", "origin/HEAD...HEAD"],
   )?;
   if !cap.success {
      output::warn("", "cannot compare against origin/HEAD (run 'axon remote set <url>' first)");
      return Ok(());
   }
   let counts: Vec<&str> = cap.stdout.split_whitespace().collect();
   if counts.len() == 2 {
      output::ok("", &format!("ahead {} / behind {} of origin/HEAD", counts[1], counts[0]));
   }
   Ok(())
}
