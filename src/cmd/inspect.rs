//! `axon inspect`: show metadata and structure of a skill in the hub.
//!
//! The argument resolves exactly first (skill folder, then target name) and
//! falls back to case-insensitive substring matching over skill folders.

use std::{
   env, fs,
   path::{Path, PathBuf},
};

use crate::{
   config::Config,
   error::{Error, Result},
};

#[derive(Debug, Default)]
struct SkillMeta {
   name:          String,
   version:       String,
   description:   String,
   triggers:      Vec<String>,
   allowed_tools: Vec<String>,
   requires_bins: Vec<String>,
   requires_envs: Vec<String>,
}

pub fn execute(arg: &str) -> Result<()> {
   let cfg = Config::load()?;
   let dirs = resolve_skill_dirs(&cfg, arg)?;
   for (i, dir) in dirs.iter().enumerate() {
      if i > 0 {
         println!("{}", "─".repeat(50));
      }
      print_inspect(dir);
   }
   Ok(())
}

fn resolve_skill_dirs(cfg: &Config, arg: &str) -> Result<Vec<PathBuf>> {
   let roots = unique_source_roots(cfg);

   // Exact skill folder.
   for root in &roots {
      let candidate = root.join(arg);
      if candidate.is_dir() {
         return Ok(vec![candidate]);
      }
   }
   // Exact target name.
   for target in &cfg.targets {
      if target.name == arg {
         let dir = cfg.repo_path.join(&target.source);
         if dir.is_dir() {
            return Ok(vec![dir]);
         }
      }
   }

   // Fuzzy: substring match over skill folder names.
   let needle = arg.to_lowercase();
   let mut matches = Vec::new();
   for root in &roots {
      let Ok(entries) = fs::read_dir(root) else { continue };
      for entry in entries.flatten() {
         let name = entry.file_name().to_string_lossy().into_owned();
         if name == ".git" || !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
         }
         if name.to_lowercase().contains(&needle) {
            let full = entry.path();
            if !matches.contains(&full) {
               matches.push(full);
            }
         }
      }
   }
   if !matches.is_empty() {
      return Ok(matches);
   }

   Err(Error::Failed(format!(
      "skill or target {arg:?} not found in hub.\nTip: run 'axon status' to see available \
       targets."
   )))
}

/// Unique parent directories of all target sources, plus the sources
/// themselves (for target-level inspect).
fn unique_source_roots(cfg: &Config) -> Vec<PathBuf> {
   let mut roots = Vec::new();
   for target in &cfg.targets {
      let src = cfg.repo_path.join(&target.source);
      let parent = src.parent().map(Path::to_path_buf).unwrap_or_else(|| cfg.repo_path.clone());
      for candidate in [parent, src] {
         if !roots.contains(&candidate) {
            roots.push(candidate);
         }
      }
   }
   roots
}

fn print_inspect(skill_dir: &Path) {
   let (meta, has_meta) = parse_skill_meta(&skill_dir.join("SKILL.md"));
   let files = list_skill_files(skill_dir);
   let scripts = list_executables(&skill_dir.join("scripts"));

   let name = if meta.name.is_empty() {
      skill_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
   } else {
      meta.name.clone()
   };

   println!("📦 Skill: {name}");
   if !meta.version.is_empty() {
      println!("Version:  {}", meta.version);
   }
   if !meta.description.is_empty() {
      println!("Summary:  {}", meta.description.trim().replace('\n', " "));
   }
   if !has_meta {
      println!("  (no SKILL.md found)");
   }

   if !meta.triggers.is_empty() {
      println!("\nTriggers:");
      for t in &meta.triggers {
         println!("  - {t}");
      }
   }
   if !meta.allowed_tools.is_empty() {
      println!("\nAllowed Tools: {}", meta.allowed_tools.join(", "));
   }
   if !files.is_empty() {
      println!("\nFiles:");
      for f in &files {
         println!("  - {f}");
      }
   }
   if !scripts.is_empty() {
      println!("\nScripts:");
      for s in &scripts {
         println!("  - scripts/{s} (Executable)");
      }
   }
   if !meta.requires_bins.is_empty() || !meta.requires_envs.is_empty() {
      println!("\nDependencies (declared):");
      for bin in &meta.requires_bins {
         let status = if on_path(bin) { "✓ Found" } else { "✗ Not found" };
         println!("  bin: {bin:<20} {status}");
      }
      for var in &meta.requires_envs {
         let status = if env::var(var).map(|v| !v.is_empty()).unwrap_or(false) {
            "✓ Set"
         } else {
            "✗ Not set"
         };
         println!("  env: {var:<20} {status}");
      }
   }
   println!("\nPath: {}", skill_dir.display());
}

/// Parses the YAML frontmatter of a SKILL.md loosely: string fields, string
/// lists, and the nested `requires`/`metadata.*.requires` dependency blocks.
fn parse_skill_meta(path: &Path) -> (SkillMeta, bool) {
   let Ok(content) = fs::read_to_string(path) else {
      return (SkillMeta::default(), false);
   };
   let stripped = content.strip_prefix('\u{feff}').unwrap_or(&content);
   let Some(rest) = stripped.strip_prefix("---") else {
      return (SkillMeta::default(), false);
   };
   let Some(end) = rest.find("---") else {
      return (SkillMeta::default(), false);
   };
   let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(&rest[..end]) else {
      return (SkillMeta::default(), false);
   };

   let str_of = |v: Option<&serde_yaml::Value>| {
      v.and_then(|v| v.as_str()).map(str::to_string).unwrap_or_default()
   };
   let list_of = |v: Option<&serde_yaml::Value>| -> Vec<String> {
      v.and_then(|v| v.as_sequence())
         .map(|seq| {
            seq.iter()
               .filter_map(|item| match item {
                  serde_yaml::Value::String(s) => Some(s.clone()),
                  serde_yaml::Value::Mapping(m) => {
                     let pattern = str_of(m.get("pattern"));
                     let desc = str_of(m.get("description"));
                     match (pattern.is_empty(), desc.is_empty()) {
                        (false, false) => Some(format!("{pattern}: {desc}")),
                        (false, true) => Some(pattern),
                        (true, false) => Some(desc),
                        _ => None,
                     }
                  },
                  _ => None,
               })
               .collect()
         })
         .unwrap_or_default()
   };

   let mut meta = SkillMeta {
      name:          str_of(value.get("name")),
      version:       str_of(value.get("version")),
      description:   str_of(value.get("description")),
      triggers:      list_of(value.get("triggers")),
      allowed_tools: list_of(value.get("allowed-tools")),
      requires_bins: Vec::new(),
      requires_envs: Vec::new(),
   };

   let mut push_bins = |v: Option<&serde_yaml::Value>| {
      for bin in list_of(v) {
         if !bin.is_empty() && !meta.requires_bins.contains(&bin) {
            meta.requires_bins.push(bin);
         }
      }
   };
   push_bins(value.get("requires").and_then(|r| r.get("bins")));
   push_bins(
      value
         .get("metadata")
         .and_then(|m| m.get("requires"))
         .and_then(|r| r.get("bins")),
   );
   push_bins(
      value
         .get("metadata")
         .and_then(|m| m.get("openclaw"))
         .and_then(|o| o.get("requires"))
         .and_then(|r| r.get("bins")),
   );
   meta.requires_envs = list_of(value.get("requires").and_then(|r| r.get("envs")));

   (meta, true)
}

fn list_skill_files(dir: &Path) -> Vec<String> {
   let Ok(entries) = fs::read_dir(dir) else {
      return Vec::new();
   };
   let mut out: Vec<String> = entries
      .flatten()
      .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
      .map(|e| e.file_name().to_string_lossy().into_owned())
      .collect();
   out.sort();
   out
}

fn list_executables(dir: &Path) -> Vec<String> {
   let Ok(entries) = fs::read_dir(dir) else {
      return Vec::new();
   };
   let mut out: Vec<String> = entries
      .flatten()
      .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
      .filter(|e| is_executable(&e.path()))
      .map(|e| e.file_name().to_string_lossy().into_owned())
      .collect();
   out.sort();
   out
}

/// PATH lookup without executing anything.
fn on_path(bin: &str) -> bool {
   let Some(paths) = env::var_os("PATH") else {
      return false;
   };
   env::split_paths(&paths).any(|dir| {
      let candidate = dir.join(bin);
      candidate.is_file() || candidate.with_extension("exe").is_file()
   })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
   use std::os::unix::fs::PermissionsExt;
   fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
   path.extension().map(|ext| ext == "exe" || ext == "bat" || ext == "ps1").unwrap_or(false)
}
