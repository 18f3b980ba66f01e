//! Importer: copies pre-existing tool directories into the hub, applying
//! exclude filtering and MD5-based conflict resolution. Existing hub files are
//! never overwritten; a differing incoming copy is written to a conflict path
//! instead.

use std::{
   collections::BTreeSet,
   fs,
   path::{Path, PathBuf},
};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use md5::{Digest, Md5};

use crate::{
   error::{Error, Result},
   util::copy_file,
};

/// Records one conflict found during import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPair {
   /// Path of the file already in the hub.
   pub original: PathBuf,
   /// Path where the incoming differing version was stored.
   pub conflict: PathBuf,
   /// Source tool name.
   pub tool:     String,
}

/// Aggregate outcome of one [`import_dir`] run.
///
/// A "skill" here is a top-level subdirectory of the source (a category);
/// files at the source root count under the `.` key.
#[derive(Debug, Default)]
pub struct ImportReport {
   pub conflicts: Vec<ConflictPair>,
   /// Files actually copied (plain copies plus conflict copies).
   pub imported:  usize,
   /// Identical duplicates skipped.
   pub skipped:   usize,

   /// Skills with at least one newly copied file.
   pub skills_imported:  usize,
   /// Skills whose every file was an identical duplicate.
   pub skills_skipped:   usize,
   /// Skills with at least one conflict.
   pub skills_conflicts: usize,
}

/// Copies files from `src_dir` into `dst_dir`, applying excludes and MD5
/// conflict resolution. `tool` names the source target and is woven into
/// conflict filenames.
///
/// Any filesystem error aborts the walk; everything copied up to that point
/// stays on disk, and re-running is safe because conflict writes never
/// overwrite.
pub fn import_dir(
   src_dir: &Path,
   dst_dir: &Path,
   tool: &str,
   excludes: &[String],
) -> Result<ImportReport> {
   let matcher = build_exclude_set(excludes)?;
   let mut report = ImportReport::default();

   let mut skill_imported = BTreeSet::new();
   let mut skill_skipped = BTreeSet::new();
   let mut skill_conflict = BTreeSet::new();

   let mut walker = walkdir::WalkDir::new(src_dir).into_iter();
   while let Some(entry) = walker.next() {
      let entry = entry.map_err(|e| Error::Fs {
         op:     "cannot walk",
         path:   src_dir.to_path_buf(),
         source: e.into(),
      })?;
      if entry.path() == src_dir {
         continue;
      }
      let rel = entry
         .path()
         .strip_prefix(src_dir)
         .expect("walk entries stay under the source root")
         .to_path_buf();

      if matches_exclude(&matcher, &rel) {
         if entry.file_type().is_dir() {
            walker.skip_current_dir();
         }
         continue;
      }

      let dst = dst_dir.join(&rel);
      if entry.file_type().is_dir() {
         fs::create_dir_all(&dst)
            .map_err(|e| Error::Fs { op: "cannot create", path: dst, source: e })?;
         continue;
      }

      let skill_key = skill_key(&rel);

      if dst.exists() {
         // Destination already exists: compare fingerprints.
         let src_md5 = file_md5(entry.path())?;
         let dst_md5 = file_md5(&dst)?;
         if src_md5 == dst_md5 {
            report.skipped += 1;
            skill_skipped.insert(skill_key);
            continue;
         }
         // Different content: conflict-safe write.
         let conflict_dst = conflict_path(&dst, tool);
         copy_file(entry.path(), &conflict_dst)?;
         report.conflicts.push(ConflictPair {
            original: dst,
            conflict: conflict_dst,
            tool:     tool.to_string(),
         });
         report.imported += 1;
         skill_conflict.insert(skill_key);
         continue;
      }

      if let Some(parent) = dst.parent() {
         fs::create_dir_all(parent).map_err(|e| Error::Fs {
            op:     "cannot create",
            path:   parent.to_path_buf(),
            source: e,
         })?;
      }
      copy_file(entry.path(), &dst)?;
      report.imported += 1;
      skill_imported.insert(skill_key);
   }

   // A skill is "skipped" only when it produced neither new files nor
   // conflicts; the imported and conflict sets may overlap.
   report.skills_imported = skill_imported.len();
   report.skills_conflicts = skill_conflict.len();
   report.skills_skipped = skill_skipped
      .iter()
      .filter(|s| !skill_imported.contains(*s) && !skill_conflict.contains(*s))
      .count();

   Ok(report)
}

fn skill_key(rel: &Path) -> String {
   rel.components()
      .next()
      .map(|c| c.as_os_str().to_string_lossy().into_owned())
      .unwrap_or_else(|| ".".to_string())
}

/// Builds the conflict filename for an incoming file by inserting
/// `.conflict-<tool>` before the final extension:
///
/// `oracle.md` → `oracle.conflict-antigravity.md`
/// `a.prompt.md` → `a.prompt.conflict-antigravity.md`
pub fn conflict_path(original: &Path, tool: &str) -> PathBuf {
   let name = original.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
   // The extension starts at the final dot, wherever it sits; a dotfile like
   // `.hidden` is all extension and no stem.
   let new_name = match name.rfind('.') {
      Some(idx) => format!("{}.conflict-{}{}", &name[..idx], tool, &name[idx..]),
      None => format!("{name}.conflict-{tool}"),
   };
   original.with_file_name(new_name)
}

/// Compiles exclude patterns. Shell-style glob semantics: `*` does not cross
/// path separators and `**` carries no recursive meaning. A trailing `/`
/// marks a directory pattern and is trimmed before matching.
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
   let mut builder = GlobSetBuilder::new();
   for pattern in patterns {
      let trimmed = pattern.trim_end_matches('/');
      if trimmed.is_empty() {
         continue;
      }
      let glob = GlobBuilder::new(trimmed)
         .literal_separator(true)
         .build()
         .map_err(|e| Error::ConfigInvalid(format!("invalid exclude pattern {pattern:?}: {e}")))?;
      builder.add(glob);
   }
   builder
      .build()
      .map_err(|e| Error::ConfigInvalid(format!("invalid exclude patterns: {e}")))
}

/// A pattern excludes an entry when it matches the basename or the full
/// relative path.
pub fn matches_exclude(set: &GlobSet, rel: &Path) -> bool {
   if set.is_match(rel) {
      return true;
   }
   rel.file_name().map(|name| set.is_match(Path::new(name))).unwrap_or(false)
}

fn file_md5(path: &Path) -> Result<[u8; 16]> {
   let data = fs::read(path)
      .map_err(|e| Error::Fs { op: "cannot read", path: path.to_path_buf(), source: e })?;
   Ok(Md5::digest(&data).into())
}
