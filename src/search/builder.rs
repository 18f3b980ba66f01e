//! Index builder: document discovery, canonical text hashing, incremental
//! reuse, and the atomic directory swap that publishes a finished index.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{Document, discover_documents, index};
use crate::{
   embed::Provider,
   error::{Error, Result},
};

/// Controls one index build.
pub struct BuildOptions {
   pub repo_path: PathBuf,
   pub out_dir:   PathBuf,
   pub roots:     Vec<String>,
   /// Ignore the existing index and re-embed everything.
   pub force:     bool,
   /// L2-normalize freshly computed vectors before writing.
   pub normalize: bool,
}

/// Builds a semantic index from the hub documents and publishes it at
/// `opts.out_dir`.
///
/// The build is incremental when an index already loads from `out_dir` and
/// `force` is off: a document whose canonical-text hash is unchanged reuses
/// its previous vector instead of calling the provider. The new index is
/// staged in a fresh temp directory sibling to `out_dir` and swapped into
/// place by rename, so readers never observe a partial write.
pub async fn build_index(prov: &dyn Provider, opts: &BuildOptions) -> Result<index::Index> {
   let mut docs = discover_documents(&opts.repo_path, &opts.roots)?;
   if docs.is_empty() {
      return Err(Error::IndexBuild(format!(
         "no documents found under {}",
         opts.repo_path.display()
      )));
   }
   // Deterministic output order regardless of walk order.
   docs.sort_by(|a, b| a.id.cmp(&b.id));

   let previous = if opts.force { None } else { index::Index::load(&opts.out_dir).ok() };

   let mut entries = Vec::with_capacity(docs.len());
   let mut vectors: Vec<f32> = Vec::new();
   let mut dim = 0usize;

   for doc in &docs {
      let text = canonical_text(doc);
      let hash = text_hash(&text);

      if let Some(prev) = &previous
         && let Some(i) = prev.skills.iter().position(|s| s.id == doc.id)
         && !prev.skills[i].text_hash.is_empty()
         && prev.skills[i].text_hash == hash
      {
         let v = prev.vector(i);
         if dim == 0 {
            dim = v.len();
         }
         if v.len() == dim {
            entries.push(prev.skills[i].clone());
            vectors.extend_from_slice(v);
            continue;
         }
      }

      let emb = prov.embed(&text).await?;
      if dim == 0 {
         dim = emb.len();
      }
      if emb.len() != dim {
         return Err(Error::DimChanged { got: emb.len(), want: dim });
      }
      let emb = if opts.normalize { index::normalize_l2(&emb) } else { emb };

      entries.push(index::SkillEntry {
         id:          doc.id.clone(),
         path:        doc.path.clone(),
         name:        doc.name.clone(),
         description: doc.description.clone(),
         text_hash:   hash,
         updated_at:  chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
      });
      vectors.extend_from_slice(&emb);
   }

   let manifest = index::Manifest {
      index_version: 1,
      created_at:    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
      hub_revision:  String::new(),
      model_id:      prov.model_id(),
      dim,
      normalize:     opts.normalize,
      vector_file:   index::DEFAULT_VECTOR_FILE.to_string(),
      skills_file:   index::DEFAULT_SKILLS_FILE.to_string(),
   };

   let parent = opts
      .out_dir
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
   std::fs::create_dir_all(&parent)
      .map_err(|e| Error::Fs { op: "cannot create", path: parent.clone(), source: e })?;
   let staging = tempfile::Builder::new()
      .prefix("search-index-")
      .tempdir_in(&parent)
      .map_err(|e| Error::Fs { op: "cannot create", path: parent, source: e })?;

   index::write(staging.path(), manifest.clone(), &entries, &vectors)?;
   atomic_swap(staging.path(), &opts.out_dir)?;

   Ok(index::Index { manifest, skills: entries, vectors })
}

/// Canonical text whose hash and embedding represent a document: the trimmed
/// name and description lines, plus a keywords line when present.
pub fn canonical_text(doc: &Document) -> String {
   let mut parts = vec![
      format!("name: {}", doc.name.trim()),
      format!("description: {}", doc.description.trim()),
   ];
   if !doc.keywords.trim().is_empty() {
      parts.push(format!("keywords: {}", doc.keywords.trim()));
   }
   parts.join("\n")
}

/// Hex SHA-256 of the canonical text.
pub fn text_hash(text: &str) -> String {
   hex::encode(Sha256::digest(text.as_bytes()))
}

/// Replaces `dest_dir` with `src_dir` by rename. The previous index (if any)
/// is parked at `dest_dir.bak` during the swap and restored when the final
/// rename fails, so readers always see a consistent index.
pub fn atomic_swap(src_dir: &Path, dest_dir: &Path) -> Result<()> {
   if let Some(parent) = dest_dir.parent() {
      std::fs::create_dir_all(parent).map_err(|e| Error::Fs {
         op:     "cannot create",
         path:   parent.to_path_buf(),
         source: e,
      })?;
   }

   let backup = index::temp_sibling(dest_dir, ".bak");
   let _ = std::fs::remove_dir_all(&backup);
   if dest_dir.exists() {
      std::fs::rename(dest_dir, &backup).map_err(|e| Error::Fs {
         op:     "cannot rename",
         path:   dest_dir.to_path_buf(),
         source: e,
      })?;
   }
   if let Err(e) = std::fs::rename(src_dir, dest_dir) {
      if backup.exists() {
         let _ = std::fs::rename(&backup, dest_dir);
      }
      return Err(Error::Fs { op: "cannot rename", path: src_dir.to_path_buf(), source: e });
   }
   let _ = std::fs::remove_dir_all(&backup);
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn canonical_text_omits_empty_keywords() {
      let doc = Document {
         id:          "a".into(),
         path:        "skills/a".into(),
         name:        " Helper ".into(),
         description: " Summary ".into(),
         keywords:    String::new(),
      };
      assert_eq!(canonical_text(&doc), "name: Helper\ndescription: Summary");

      let with_kw = Document { keywords: "db, sql".into(), ..doc };
      assert_eq!(
         canonical_text(&with_kw),
         "name: Helper\ndescription: Summary\nkeywords: db, sql"
      );
   }

   #[test]
   fn text_hash_is_hex_sha256() {
      let h = text_hash("name: a\ndescription: b");
      assert_eq!(h.len(), 64);
      assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
      assert_eq!(h, text_hash("name: a\ndescription: b"));
   }
}
