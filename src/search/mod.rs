//! Search over hub documents: discovery, keyword matching, and the semantic
//! index (store, builder, query engine) in the submodules.

pub mod builder;
pub mod index;
pub mod query;

use std::{
   collections::BTreeMap,
   fs, io,
   path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Minimal searchable metadata for one hub document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
   /// Stable identifier: the skill directory name, or `root:rel:path` for
   /// other roots.
   pub id:          String,
   /// POSIX-style relative directory path inside the hub.
   pub path:        String,
   pub name:        String,
   pub description: String,
   pub keywords:    String,
}

/// How a result matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
   Semantic,
   Keyword,
}

/// One matched document.
#[derive(Debug, Clone)]
pub struct SearchHit {
   pub doc:   Document,
   pub score: f64,
   pub kind:  MatchKind,
}

/// Scans the hub for searchable markdown documents.
///
/// Under the `skills` root only `SKILL.md` files are admitted; under every
/// other root any `.md` file is. Missing roots are skipped silently.
pub fn discover_documents(repo_root: &Path, roots: &[String]) -> Result<Vec<Document>> {
   let mut out = Vec::new();
   for root in roots {
      let dir = repo_root.join(root);
      match fs::metadata(&dir) {
         Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
         Err(e) => return Err(Error::Fs { op: "cannot stat", path: dir, source: e }),
         Ok(meta) if !meta.is_dir() => {
            return Err(Error::ConfigInvalid(format!(
               "{root} path is not a directory: {}",
               dir.display()
            )));
         },
         Ok(_) => {},
      }

      for entry in walkdir::WalkDir::new(&dir) {
         let entry = entry.map_err(|e| Error::Fs {
            op:     "cannot scan",
            path:   dir.clone(),
            source: e.into(),
         })?;
         if entry.file_type().is_dir() {
            continue;
         }
         let admitted = if root == "skills" {
            entry.file_name() == "SKILL.md"
         } else {
            entry
               .path()
               .extension()
               .map(|ext| ext.eq_ignore_ascii_case("md"))
               .unwrap_or(false)
         };
         if admitted {
            out.push(document_from_file(repo_root, entry.path(), root)?);
         }
      }
   }
   Ok(out)
}

fn document_from_file(repo_root: &Path, path: &Path, root: &str) -> Result<Document> {
   let (rel_dir, id) = if root == "skills" {
      let dir = path.parent().unwrap_or(repo_root);
      let rel = dir.strip_prefix(repo_root).unwrap_or(dir);
      let id = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
      (posix(rel), id)
   } else {
      let rel_file = path.strip_prefix(repo_root).unwrap_or(path);
      let rel_dir = rel_file.parent().map(posix).unwrap_or_default();
      let stem = posix(rel_file);
      let stem = match stem.rfind('.') {
         Some(idx) => stem[..idx].to_string(),
         None => stem,
      };
      (rel_dir, stem.replace('/', ":"))
   };

   let content = fs::read_to_string(path)
      .map_err(|e| Error::Fs { op: "cannot read", path: path.to_path_buf(), source: e })?;
   let (front, body) = split_frontmatter(&content);

   let mut name = front.get("name").map(|s| s.trim().to_string()).unwrap_or_default();
   let mut description =
      front.get("description").map(|s| s.trim().to_string()).unwrap_or_default();
   let keywords = front
      .get("keywords")
      .or_else(|| front.get("tags"))
      .map(|s| s.trim().to_string())
      .unwrap_or_default();

   if name.is_empty() {
      name = id.clone();
   }
   if description.is_empty() {
      description = infer_description(body);
   }

   Ok(Document { id, path: rel_dir, name, description, keywords })
}

fn posix(p: &Path) -> String {
   p.to_string_lossy().replace('\\', "/")
}

/// Splits YAML frontmatter (delimited by `---` lines) off a markdown
/// document. Returns string-valued keys lowercased; anything unparseable
/// degrades to an empty map with the full content as body.
pub fn split_frontmatter(content: &str) -> (BTreeMap<String, String>, &str) {
   let stripped = content.strip_prefix('\u{feff}').unwrap_or(content);
   let Some(rest) = stripped.strip_prefix("---") else {
      return (BTreeMap::new(), content);
   };
   let Some(end) = rest.find("---") else {
      return (BTreeMap::new(), content);
   };
   let front_text = &rest[..end];
   let body = rest[end + 3..].strip_prefix('\n').unwrap_or(&rest[end + 3..]);

   let Ok(raw) = serde_yaml::from_str::<serde_yaml::Value>(front_text) else {
      return (BTreeMap::new(), content);
   };
   let mut out = BTreeMap::new();
   if let serde_yaml::Value::Mapping(map) = raw {
      for (key, value) in map {
         if let (serde_yaml::Value::String(k), serde_yaml::Value::String(v)) = (key, value) {
            out.insert(k.to_lowercase(), v);
         }
      }
   }
   (out, body)
}

/// First non-empty, non-heading body line.
fn infer_description(body: &str) -> String {
   body
      .lines()
      .map(str::trim)
      .find(|line| !line.is_empty() && !line.starts_with('#'))
      .unwrap_or_default()
      .to_string()
}

/// Case-insensitive keyword search: every whitespace token of the query must
/// appear as a substring of the document's id, name, description or keywords
/// (AND semantics). Results are ordered by id and capped at `limit`.
pub fn keyword_search(docs: &[Document], query: &str, limit: usize) -> Vec<SearchHit> {
   let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
   if tokens.is_empty() {
      return Vec::new();
   }

   let mut out: Vec<SearchHit> = docs
      .iter()
      .filter(|doc| {
         let blob = format!("{}\n{}\n{}\n{}", doc.id, doc.name, doc.description, doc.keywords)
            .to_lowercase();
         tokens.iter().all(|tok| blob.contains(tok))
      })
      .map(|doc| SearchHit { doc: doc.clone(), score: 1.0, kind: MatchKind::Keyword })
      .collect();

   out.sort_by(|a, b| a.doc.id.cmp(&b.doc.id));
   if limit > 0 && out.len() > limit {
      out.truncate(limit);
   }
   out
}

/// Orders hits by score descending, ties broken by ascending id, stably.
pub fn sort_hits(hits: &mut [SearchHit]) {
   hits.sort_by(|a, b| {
      b.score
         .partial_cmp(&a.score)
         .unwrap_or(std::cmp::Ordering::Equal)
         .then_with(|| a.doc.id.cmp(&b.doc.id))
   });
}

#[cfg(test)]
mod tests {
   use super::*;

   fn doc(id: &str, desc: &str) -> Document {
      Document {
         id:          id.into(),
         path:        format!("skills/{id}"),
         name:        id.into(),
         description: desc.into(),
         keywords:    String::new(),
      }
   }

   #[test]
   fn keyword_search_requires_every_token() {
      let docs = vec![
         doc("db-tuner", "tunes database indexes"),
         doc("http-prober", "probes endpoints"),
      ];
      let hits = keyword_search(&docs, "database tunes", 5);
      assert_eq!(hits.len(), 1);
      assert_eq!(hits[0].doc.id, "db-tuner");
      assert!(keyword_search(&docs, "database probes", 5).is_empty());
      assert!(keyword_search(&docs, "   ", 5).is_empty());
   }

   #[test]
   fn keyword_results_sorted_by_id_and_capped() {
      let docs = vec![doc("c", "shared"), doc("a", "shared"), doc("b", "shared")];
      let hits = keyword_search(&docs, "shared", 2);
      let ids: Vec<&str> = hits.iter().map(|h| h.doc.id.as_str()).collect();
      assert_eq!(ids, ["a", "b"]);
   }

   #[test]
   fn frontmatter_split_and_fallbacks() {
      let content = "---\nname: Helper\ndescription: Does things\ntags: a, b\n---\nBody text\n";
      let (front, body) = split_frontmatter(content);
      assert_eq!(front.get("name").unwrap(), "Helper");
      assert_eq!(front.get("tags").unwrap(), "a, b");
      assert_eq!(body, "Body text\n");

      let (front, body) = split_frontmatter("no frontmatter here");
      assert!(front.is_empty());
      assert_eq!(body, "no frontmatter here");
   }

   #[test]
   fn description_inferred_from_first_body_line() {
      assert_eq!(infer_description("\n# Title\n\nThe real summary.\nMore."), "The real summary.");
      assert_eq!(infer_description("# only a heading\n"), "");
   }

   #[test]
   fn tie_scores_break_by_id() {
      let mut hits = vec![
         SearchHit { doc: doc("b", ""), score: 0.5, kind: MatchKind::Semantic },
         SearchHit { doc: doc("a", ""), score: 0.5, kind: MatchKind::Semantic },
         SearchHit { doc: doc("c", ""), score: 0.9, kind: MatchKind::Semantic },
      ];
      sort_hits(&mut hits);
      let ids: Vec<&str> = hits.iter().map(|h| h.doc.id.as_str()).collect();
      assert_eq!(ids, ["c", "a", "b"]);
   }
}
