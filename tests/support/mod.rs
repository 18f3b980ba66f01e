#![allow(dead_code)]

use std::{fs, path::{Path, PathBuf}, sync::OnceLock};

use axon::config::{Config, SyncMode, Target};

static TEST_HOME: OnceLock<PathBuf> = OnceLock::new();

/// Points HOME (and the cache dir) at a per-binary temp directory so tests
/// never touch the real `~/.axon`. Every test calls this before resolving any
/// axon path; the first caller performs the swap while the rest wait.
pub fn init_home() -> &'static Path {
   TEST_HOME
      .get_or_init(|| {
         let dir = tempfile::tempdir().expect("create test home").keep();
         // Safe in the test harness: set before any config path is touched.
         unsafe {
            std::env::set_var("HOME", &dir);
            std::env::set_var("XDG_CACHE_HOME", dir.join(".cache"));
         }
         dir
      })
      .as_path()
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
   let path = dir.join(name);
   if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).expect("create parent");
   }
   fs::write(&path, format!("{content}\n")).expect("write file");
}

/// Creates `skills/<id>/SKILL.md` with frontmatter under the hub.
pub fn write_skill(hub: &Path, id: &str, name: &str, description: &str) {
   let dir = hub.join("skills").join(id);
   fs::create_dir_all(&dir).expect("create skill dir");
   fs::write(
      dir.join("SKILL.md"),
      format!("---\nname: {name}\ndescription: {description}\n---\n# {name}\n"),
   )
   .expect("write SKILL.md");
}

/// A minimal config rooted at `hub` with the given targets.
pub fn test_config(hub: &Path, targets: Vec<Target>) -> Config {
   Config {
      repo_path: hub.to_path_buf(),
      sync_mode: SyncMode::ReadWrite,
      upstream: None,
      excludes: vec![],
      targets,
   }
}

pub fn target(name: &str, source: &str, destination: &Path) -> Target {
   Target {
      name:        name.to_string(),
      source:      source.to_string(),
      destination: destination.to_string_lossy().into_owned(),
      kind:        "directory".to_string(),
   }
}
