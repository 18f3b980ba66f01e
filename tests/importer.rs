mod support;

use std::fs;

use axon::importer::import_dir;
use support::write_file;

#[test]
fn basic_import_with_conflicts_and_excludes() {
   let tmp = tempfile::tempdir().unwrap();
   let windsurf = tmp.path().join("windsurf");
   let antigravity = tmp.path().join("antigravity");
   let hub = tmp.path().join("hub");
   for dir in [&windsurf, &antigravity, &hub] {
      fs::create_dir_all(dir).unwrap();
   }

   let excludes: Vec<String> =
      [".DS_Store", "Thumbs.db", "*.tmp", "*.bak", "*~"].iter().map(|s| s.to_string()).collect();

   write_file(&windsurf, "oracle_expert.md", "V5 Oracle 23ai syntax");
   write_file(&windsurf, "common.md", "shared content identical");
   write_file(&windsurf, "windsurf_tips.md", "windsurf only");
   write_file(&windsurf, ".DS_Store", "junk — must be excluded");

   write_file(&antigravity, "oracle_expert.md", "V1 Oracle basic");
   write_file(&antigravity, "common.md", "shared content identical");
   write_file(&antigravity, "ag_tips.md", "antigravity only");

   let r1 = import_dir(&windsurf, &hub, "windsurf", &excludes).unwrap();
   assert_eq!(r1.imported, 3, "oracle, common, tips; .DS_Store excluded");
   assert_eq!(r1.skipped, 0);
   assert!(r1.conflicts.is_empty());
   assert!(!hub.join(".DS_Store").exists());

   let r2 = import_dir(&antigravity, &hub, "antigravity", &excludes).unwrap();
   assert_eq!(r2.skipped, 1, "common.md is identical");
   assert_eq!(r2.conflicts.len(), 1, "oracle_expert.md differs");

   let conflict = hub.join("oracle_expert.conflict-antigravity.md");
   assert!(conflict.exists());
   assert_eq!(fs::read_to_string(&conflict).unwrap(), "V1 Oracle basic\n");

   // The original must never be overwritten.
   assert_eq!(
      fs::read_to_string(hub.join("oracle_expert.md")).unwrap(),
      "V5 Oracle 23ai syntax\n"
   );
   assert!(hub.join("ag_tips.md").exists());
}

#[test]
fn conflict_pair_records_both_paths() {
   let tmp = tempfile::tempdir().unwrap();
   let a = tmp.path().join("a");
   let b = tmp.path().join("b");
   let hub = tmp.path().join("hub");
   for dir in [&a, &b, &hub] {
      fs::create_dir_all(dir).unwrap();
   }
   write_file(&a, "oracle.md", "V5");
   write_file(&b, "oracle.md", "V1");

   import_dir(&a, &hub, "tool-a", &[]).unwrap();
   let report = import_dir(&b, &hub, "tool-b", &[]).unwrap();

   assert_eq!(report.skipped, 0);
   assert_eq!(report.conflicts.len(), 1);
   let pair = &report.conflicts[0];
   assert_eq!(pair.original, hub.join("oracle.md"));
   assert_eq!(pair.conflict, hub.join("oracle.conflict-tool-b.md"));
   assert_eq!(pair.tool, "tool-b");

   // The hub holds exactly the two versions.
   let mut names: Vec<String> = fs::read_dir(&hub)
      .unwrap()
      .flatten()
      .map(|e| e.file_name().to_string_lossy().into_owned())
      .collect();
   names.sort();
   assert_eq!(names, ["oracle.conflict-tool-b.md", "oracle.md"]);
   assert_eq!(fs::read_to_string(hub.join("oracle.md")).unwrap(), "V5\n");
   assert_eq!(fs::read_to_string(hub.join("oracle.conflict-tool-b.md")).unwrap(), "V1\n");
}

#[test]
fn import_is_idempotent() {
   let tmp = tempfile::tempdir().unwrap();
   let src = tmp.path().join("src");
   let hub = tmp.path().join("hub");
   fs::create_dir_all(&hub).unwrap();
   write_file(&src, "skill-a/SKILL.md", "alpha");
   write_file(&src, "skill-a/notes.md", "notes");
   write_file(&src, "skill-b/SKILL.md", "beta");

   let first = import_dir(&src, &hub, "tool", &[]).unwrap();
   assert_eq!(first.imported, 3);
   assert_eq!(first.skills_imported, 2);

   let second = import_dir(&src, &hub, "tool", &[]).unwrap();
   assert_eq!(second.imported, 0);
   assert_eq!(second.skipped, first.imported);
   assert!(second.conflicts.is_empty());
   assert_eq!(second.skills_skipped, 2);
   assert_eq!(second.skills_imported, 0);

   let count = walkdir::WalkDir::new(&hub)
      .into_iter()
      .flatten()
      .filter(|e| e.file_type().is_file())
      .count();
   assert_eq!(count, 3, "no extra files on re-import");
}

#[test]
fn directory_excludes_prune_subtrees() {
   let tmp = tempfile::tempdir().unwrap();
   let src = tmp.path().join("src");
   let hub = tmp.path().join("hub");
   fs::create_dir_all(&hub).unwrap();
   write_file(&src, "skill/SKILL.md", "keep");
   write_file(&src, "skill/__pycache__/mod.pyc", "junk");
   write_file(&src, "__pycache__/top.pyc", "junk");

   let excludes = vec!["__pycache__/".to_string()];
   let report = import_dir(&src, &hub, "tool", &excludes).unwrap();

   assert_eq!(report.imported, 1);
   assert!(hub.join("skill/SKILL.md").exists());
   assert!(!hub.join("skill/__pycache__").exists());
   assert!(!hub.join("__pycache__").exists());
}

#[test]
fn skill_counters_allow_overlap() {
   let tmp = tempfile::tempdir().unwrap();
   let src = tmp.path().join("src");
   let hub = tmp.path().join("hub");
   fs::create_dir_all(&hub).unwrap();

   // Pre-seed the hub so one file conflicts while its sibling is new.
   write_file(&hub, "mixed/seen.md", "old version");
   write_file(&src, "mixed/seen.md", "new version");
   write_file(&src, "mixed/fresh.md", "brand new");

   let report = import_dir(&src, &hub, "tool", &[]).unwrap();
   assert_eq!(report.skills_imported, 1);
   assert_eq!(report.skills_conflicts, 1);
   assert_eq!(report.skills_skipped, 0, "a skill that imported or conflicted is not skipped");
}
