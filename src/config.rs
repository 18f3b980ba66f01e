//! Configuration management: `~/.axon/axon.yaml`, tilde expansion, and the
//! process-level dotenv fallback at `~/.axon/.env`.

use std::{
   collections::{BTreeMap, HashSet},
   env, fs,
   path::{Component, Path, PathBuf},
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sync behavior of the hub repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
   #[default]
   #[serde(rename = "read-write")]
   ReadWrite,
   #[serde(rename = "read-only")]
   ReadOnly,
}

/// A single tool entry in axon.yaml: one hub sub-directory mapped to one
/// tool-specific destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
   pub name:        String,
   pub source:      String,
   pub destination: String,
   #[serde(rename = "type")]
   pub kind:        String,
}

impl Target {
   /// Destination with a leading `~` expanded.
   pub fn expanded_destination(&self) -> Result<PathBuf> {
      expand_tilde(&self.destination)
   }

   /// Tool base name used to group "not installed" reports: the target name
   /// with the suffix after the last `-` stripped (`windsurf-skills` →
   /// `windsurf`).
   pub fn tool_base_name(&self) -> &str {
      match self.name.rfind('-') {
         Some(idx) => &self.name[..idx],
         None => &self.name,
      }
   }
}

/// In-memory representation of `~/.axon/axon.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
   pub repo_path: PathBuf,
   #[serde(default)]
   pub sync_mode: SyncMode,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub upstream:  Option<String>,
   #[serde(default, skip_serializing_if = "Vec::is_empty")]
   pub excludes:  Vec<String>,
   #[serde(default, skip_serializing_if = "Vec::is_empty")]
   pub targets:   Vec<Target>,
}

impl Config {
   /// Reads and parses axon.yaml, expanding `repo_path` and validating the
   /// target table.
   pub fn load() -> Result<Self> {
      let path = config_path()?;
      let data = match fs::read_to_string(&path) {
         Ok(data) => data,
         Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::ConfigMissing { path });
         },
         Err(e) => return Err(Error::Fs { op: "cannot read", path, source: e }),
      };
      let mut cfg: Config = serde_yaml::from_str(&data)
         .map_err(|e| Error::ConfigInvalid(format!("{}: {e}", path.display())))?;
      cfg.repo_path = expand_tilde(&cfg.repo_path.to_string_lossy())?;
      cfg.validate()?;
      Ok(cfg)
   }

   /// Serializes the config back to axon.yaml.
   pub fn save(&self) -> Result<()> {
      let path = config_path()?;
      let data = serde_yaml::to_string(self)?;
      fs::write(&path, data).map_err(|e| Error::Fs { op: "cannot write", path, source: e })
   }

   fn validate(&self) -> Result<()> {
      let mut seen = HashSet::new();
      for t in &self.targets {
         if !seen.insert(t.name.as_str()) {
            return Err(Error::ConfigInvalid(format!("duplicate target name {:?}", t.name)));
         }
         let src = Path::new(&t.source);
         if src.is_absolute()
            || t.source.is_empty()
            || src.components().any(|c| matches!(c, Component::ParentDir))
         {
            return Err(Error::ConfigInvalid(format!(
               "target {:?}: source {:?} must be a relative path inside the hub",
               t.name, t.source
            )));
         }
         if !t.expanded_destination()?.is_absolute() {
            return Err(Error::ConfigInvalid(format!(
               "target {:?}: destination {:?} must expand to an absolute path",
               t.name, t.destination
            )));
         }
      }
      Ok(())
   }

   /// Search roots for index building: the deduplicated `source` of every
   /// target in declaration order, or the default triple when no targets are
   /// configured.
   pub fn effective_search_roots(&self) -> Vec<String> {
      let mut seen = HashSet::new();
      let roots: Vec<String> = self
         .targets
         .iter()
         .filter(|t| seen.insert(t.source.clone()))
         .map(|t| t.source.clone())
         .collect();
      if roots.is_empty() {
         return vec!["skills".into(), "workflows".into(), "commands".into()];
      }
      roots
   }

   /// The default configuration written on first `axon init`.
   pub fn default_config() -> Result<Self> {
      let home = home_dir()?;
      let j = |parts: &[&str]| {
         let mut p = home.clone();
         for part in parts {
            p.push(part);
         }
         p.to_string_lossy().into_owned()
      };
      let t = |name: &str, source: &str, dest: &[&str]| Target {
         name:        name.into(),
         source:      source.into(),
         destination: j(dest),
         kind:        "directory".into(),
      };

      Ok(Config {
         repo_path: home.join(".axon").join("repo"),
         sync_mode: SyncMode::ReadWrite,
         upstream:  Some("https://github.com/kamusis/axon-hub.git".into()),
         excludes:  vec![
            ".DS_Store".into(),
            "Thumbs.db".into(),
            "*.tmp".into(),
            "*.bak".into(),
            "*~".into(),
            ".idea/".into(),
            ".vscode/".into(),
            "__pycache__/".into(),
            "*.log".into(),
         ],
         targets:   vec![
            t("windsurf-skills", "skills", &[".codeium", "windsurf", "skills"]),
            t("antigravity-skills", "skills", &[".gemini", "antigravity", "global_skills"]),
            t("openclaw-skills", "skills", &[".openclaw", "skills"]),
            t("cursor-skills", "skills", &[".cursor", "skills"]),
            t("opencode-skills", "skills", &[".opencode", "skills"]),
            t("neovate-skills", "skills", &[".neovate", "skills"]),
            t("claude-code-skills", "skills", &[".claude", "skills"]),
            t("codex-skills", "skills", &[".codex", "skills"]),
            t("gemini-skills", "skills", &[".gemini", "skills"]),
            t("pearai-skills", "skills", &[".pearai", "skills"]),
            t("windsurf-workflows", "workflows", &[".codeium", "windsurf", "global_workflows"]),
            t("antigravity-workflows", "workflows", &[".gemini", "antigravity", "global_workflows"]),
            t("codex-workflows", "workflows", &[".codex", "workflows"]),
            t("gemini-workflows", "workflows", &[".gemini", "workflows"]),
            t("openclaw-workflows", "workflows", &[".openclaw", "workflows"]),
            t("windsurf-commands", "commands", &[".codeium", "windsurf", "commands"]),
            t("openclaw-commands", "commands", &[".openclaw", "commands"]),
            t("codex-commands", "commands", &[".codex", "commands"]),
            t("gemini-commands", "commands", &[".gemini", "commands"]),
            t("claude-code-tools", "commands", &[".anthropic", "claude-code", "tools"]),
         ],
      })
   }
}

/// Resolves the user's home directory.
pub fn home_dir() -> Result<PathBuf> {
   if let Some(dirs) = BaseDirs::new() {
      return Ok(dirs.home_dir().to_path_buf());
   }
   env::var_os("HOME").map(PathBuf::from).ok_or(Error::NoHomeDir)
}

/// Returns the absolute path to `~/.axon/`.
pub fn axon_dir() -> Result<PathBuf> {
   Ok(home_dir()?.join(".axon"))
}

/// Returns the absolute path to `~/.axon/axon.yaml`.
pub fn config_path() -> Result<PathBuf> {
   Ok(axon_dir()?.join("axon.yaml"))
}

/// Expands a leading `~` to the user's home directory. No other expansion is
/// performed; shell variables and `~user` forms pass through untouched.
pub fn expand_tilde(p: &str) -> Result<PathBuf> {
   if !p.starts_with('~') {
      return Ok(PathBuf::from(p));
   }
   Ok(expand_tilde_with(p, &home_dir()?))
}

fn expand_tilde_with(p: &str, home: &Path) -> PathBuf {
   let rest = p[1..].trim_start_matches(['/', '\\']);
   if rest.is_empty() {
      return home.to_path_buf();
   }
   home.join(rest)
}

// ── Dotenv (~/.axon/.env) ───────────────────────────────────────────────────

/// Returns the absolute path to axon's dotenv file.
pub fn dotenv_path() -> Result<PathBuf> {
   Ok(axon_dir()?.join(".env"))
}

/// Reads `~/.axon/.env` into key/value pairs. A missing file yields an empty
/// map.
pub fn load_dotenv() -> Result<BTreeMap<String, String>> {
   let path = dotenv_path()?;
   let data = match fs::read_to_string(&path) {
      Ok(data) => data,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
      Err(e) => return Err(Error::Fs { op: "cannot read", path, source: e }),
   };
   Ok(parse_dotenv(&data))
}

/// Parses dotenv content: `KEY=VALUE` lines, `#` comments and blanks ignored,
/// key whitespace trimmed, value taken verbatim (no quote handling).
fn parse_dotenv(data: &str) -> BTreeMap<String, String> {
   let mut out = BTreeMap::new();
   for line in data.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
         continue;
      }
      let Some(idx) = line.find('=') else { continue };
      let key = line[..idx].trim();
      if key.is_empty() {
         continue;
      }
      out.insert(key.to_string(), line[idx + 1..].to_string());
   }
   out
}

/// Returns the effective value for `key`: the process environment wins, the
/// dotenv file is the fallback, and an unset key yields an empty string.
pub fn config_value(key: &str) -> Result<String> {
   if let Ok(v) = env::var(key)
      && !v.is_empty()
   {
      return Ok(v);
   }
   Ok(load_dotenv()?.get(key).cloned().unwrap_or_default())
}

/// Creates `~/.axon/.env` with the embeddings keys left empty, only when the
/// file does not already exist.
pub fn ensure_dotenv_template() -> Result<()> {
   let path = dotenv_path()?;
   if path.exists() {
      return Ok(());
   }
   let body = "AXON_EMBEDDINGS_PROVIDER=\nAXON_EMBEDDINGS_MODEL=\nAXON_EMBEDDINGS_API_KEY=\n";
   fs::write(&path, body)
      .map_err(|e| Error::Fs { op: "cannot write", path: path.clone(), source: e })?;
   #[cfg(unix)]
   {
      use std::os::unix::fs::PermissionsExt;
      let _ = fs::set_permissions(&path, fs::Permissions::from_mode(0o600));
   }
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn tilde_expansion_only_touches_leading_tilde() {
      let home = Path::new("/home/u");
      assert_eq!(expand_tilde_with("~", home), PathBuf::from("/home/u"));
      assert_eq!(expand_tilde_with("~/x/y", home), PathBuf::from("/home/u/x/y"));
      assert_eq!(expand_tilde("/abs/path").unwrap(), PathBuf::from("/abs/path"));
      assert_eq!(expand_tilde("rel/path").unwrap(), PathBuf::from("rel/path"));
   }

   #[test]
   fn dotenv_parsing_rules() {
      let parsed = parse_dotenv("# comment\n\nA=1\n  B = spaced\nnoequals\n=novalue\nC=a=b\n");
      assert_eq!(parsed.get("A").map(String::as_str), Some("1"));
      assert_eq!(parsed.get("B").map(String::as_str), Some(" spaced"));
      assert_eq!(parsed.get("C").map(String::as_str), Some("a=b"));
      assert!(!parsed.contains_key("noequals"));
      assert_eq!(parsed.len(), 3);
   }

   #[test]
   fn search_roots_dedupe_in_declaration_order() {
      let t = |name: &str, source: &str| Target {
         name:        name.into(),
         source:      source.into(),
         destination: "/tmp/x".into(),
         kind:        "directory".into(),
      };
      let cfg = Config {
         repo_path: PathBuf::from("/tmp/hub"),
         sync_mode: SyncMode::ReadWrite,
         upstream:  None,
         excludes:  vec![],
         targets:   vec![
            t("a-workflows", "workflows"),
            t("a-skills", "skills"),
            t("b-skills", "skills"),
         ],
      };
      assert_eq!(cfg.effective_search_roots(), vec!["workflows", "skills"]);

      let empty = Config { targets: vec![], ..cfg };
      assert_eq!(empty.effective_search_roots(), vec!["skills", "workflows", "commands"]);
   }

   #[test]
   fn duplicate_target_names_rejected() {
      let t = Target {
         name:        "dup".into(),
         source:      "skills".into(),
         destination: "/tmp/x".into(),
         kind:        "directory".into(),
      };
      let cfg = Config {
         repo_path: PathBuf::from("/tmp/hub"),
         sync_mode: SyncMode::ReadWrite,
         upstream:  None,
         excludes:  vec![],
         targets:   vec![t.clone(), t],
      };
      assert!(cfg.validate().is_err());
   }

   #[test]
   fn escaping_source_rejected() {
      let cfg = Config {
         repo_path: PathBuf::from("/tmp/hub"),
         sync_mode: SyncMode::ReadWrite,
         upstream:  None,
         excludes:  vec![],
         targets:   vec![Target {
            name:        "bad".into(),
            source:      "../outside".into(),
            destination: "/tmp/x".into(),
            kind:        "directory".into(),
         }],
      };
      assert!(cfg.validate().is_err());
   }

   #[test]
   fn tool_base_name_strips_last_segment() {
      let t = |name: &str| Target {
         name:        name.into(),
         source:      "skills".into(),
         destination: "/tmp/x".into(),
         kind:        "directory".into(),
      };
      assert_eq!(t("windsurf-skills").tool_base_name(), "windsurf");
      assert_eq!(t("claude-code-skills").tool_base_name(), "claude-code");
      assert_eq!(t("plain").tool_base_name(), "plain");
   }
}
