//! On-disk semantic index: a manifest JSON, a skills JSONL, and a packed
//! little-endian float32 vectors file, written and loaded as one unit.

use std::{
   fs,
   io::Write,
   path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "index_manifest.json";
pub const DEFAULT_VECTOR_FILE: &str = "vectors.f32";
pub const DEFAULT_SKILLS_FILE: &str = "skills.jsonl";

/// Describes a semantic index and how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
   pub index_version: u32,
   pub created_at:    String,
   pub hub_revision:  String,
   pub model_id:      String,
   pub dim:           usize,
   pub normalize:     bool,
   #[serde(default)]
   pub vector_file:   String,
   #[serde(default)]
   pub skills_file:   String,
}

/// One document row in the skills JSONL, matched 1:1 with a vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
   pub id:          String,
   pub path:        String,
   pub name:        String,
   pub description: String,
   #[serde(default)]
   pub text_hash:   String,
   #[serde(default)]
   pub updated_at:  String,
}

/// A loaded semantic index.
#[derive(Debug, Clone)]
pub struct Index {
   pub manifest: Manifest,
   pub skills:   Vec<SkillEntry>,
   pub vectors:  Vec<f32>,
}

impl Index {
   /// Reads an index from `dir`, validating the manifest, the record count,
   /// and the vectors-file byte length (`n × dim × 4`, a multiple of 4).
   pub fn load(dir: &Path) -> Result<Self> {
      let manifest_path = dir.join(MANIFEST_FILE);
      let raw = fs::read_to_string(&manifest_path).map_err(|e| Error::Fs {
         op:     "cannot read",
         path:   manifest_path.clone(),
         source: e,
      })?;
      let mut manifest: Manifest = serde_json::from_str(&raw).map_err(|e| {
         Error::IndexInvalid(format!("invalid manifest {}: {e}", manifest_path.display()))
      })?;
      if manifest.dim == 0 {
         return Err(Error::IndexInvalid(format!("invalid dim in manifest: {}", manifest.dim)));
      }
      if manifest.vector_file.is_empty() {
         manifest.vector_file = DEFAULT_VECTOR_FILE.to_string();
      }
      if manifest.skills_file.is_empty() {
         manifest.skills_file = DEFAULT_SKILLS_FILE.to_string();
      }

      let skills = load_skills(&dir.join(&manifest.skills_file))?;
      let vectors = load_vectors(&dir.join(&manifest.vector_file), skills.len(), manifest.dim)?;

      Ok(Index { manifest, skills, vectors })
   }

   /// The stored vector for document `i`.
   pub fn vector(&self, i: usize) -> &[f32] {
      let dim = self.manifest.dim;
      &self.vectors[i * dim..(i + 1) * dim]
   }
}

fn load_skills(path: &Path) -> Result<Vec<SkillEntry>> {
   let raw = fs::read_to_string(path)
      .map_err(|e| Error::Fs { op: "cannot read", path: path.to_path_buf(), source: e })?;
   let mut out = Vec::new();
   for line in raw.lines() {
      if line.is_empty() {
         continue;
      }
      let entry: SkillEntry = serde_json::from_str(line).map_err(|e| {
         Error::IndexInvalid(format!("invalid skills JSONL {}: {e}", path.display()))
      })?;
      out.push(entry);
   }
   Ok(out)
}

fn load_vectors(path: &Path, n_skills: usize, dim: usize) -> Result<Vec<f32>> {
   let bytes = fs::read(path)
      .map_err(|e| Error::Fs { op: "cannot read", path: path.to_path_buf(), source: e })?;

   if bytes.len() % 4 != 0 {
      return Err(Error::IndexInvalid(format!(
         "vector file size is not multiple of 4 bytes: {}",
         bytes.len()
      )));
   }
   let expected = n_skills * dim * 4;
   if bytes.len() != expected {
      return Err(Error::IndexInvalid(format!(
         "vector file size mismatch: got {} want {expected} (skills={n_skills} dim={dim})",
         bytes.len()
      )));
   }

   Ok(bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect())
}

/// Writes the index triple into `dir`, validating dim and length consistency
/// first.
pub fn write(
   dir: &Path,
   mut manifest: Manifest,
   skills: &[SkillEntry],
   vectors: &[f32],
) -> Result<()> {
   if manifest.dim == 0 {
      return Err(Error::IndexBuild(format!("invalid dim: {}", manifest.dim)));
   }
   if skills.is_empty() {
      return Err(Error::IndexBuild("no skills to write".into()));
   }
   if vectors.len() != skills.len() * manifest.dim {
      return Err(Error::IndexBuild(format!(
         "vector length mismatch: got {} want {}",
         vectors.len(),
         skills.len() * manifest.dim
      )));
   }
   if manifest.vector_file.is_empty() {
      manifest.vector_file = DEFAULT_VECTOR_FILE.to_string();
   }
   if manifest.skills_file.is_empty() {
      manifest.skills_file = DEFAULT_SKILLS_FILE.to_string();
   }
   if manifest.created_at.is_empty() {
      manifest.created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
   }

   fs::create_dir_all(dir)
      .map_err(|e| Error::Fs { op: "cannot create", path: dir.to_path_buf(), source: e })?;

   let manifest_path = dir.join(MANIFEST_FILE);
   let data = serde_json::to_string_pretty(&manifest)?;
   fs::write(&manifest_path, data)
      .map_err(|e| Error::Fs { op: "cannot write", path: manifest_path, source: e })?;

   let skills_path = dir.join(&manifest.skills_file);
   let mut buf = Vec::new();
   for entry in skills {
      serde_json::to_writer(&mut buf, entry)?;
      buf.push(b'\n');
   }
   fs::write(&skills_path, buf)
      .map_err(|e| Error::Fs { op: "cannot write", path: skills_path, source: e })?;

   let vectors_path = dir.join(&manifest.vector_file);
   let mut file = fs::File::create(&vectors_path)
      .map_err(|e| Error::Fs { op: "cannot create", path: vectors_path.clone(), source: e })?;
   let mut bytes = Vec::with_capacity(vectors.len() * 4);
   for v in vectors {
      bytes.extend_from_slice(&v.to_le_bytes());
   }
   file
      .write_all(&bytes)
      .map_err(|e| Error::Fs { op: "cannot write", path: vectors_path, source: e })?;

   Ok(())
}

/// Cosine similarity between two equal-length vectors; 0 when either norm is
/// zero. A length mismatch is an error.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64> {
   if a.len() != b.len() {
      return Err(Error::IndexInvalid("vector length mismatch".into()));
   }
   let mut dot = 0f64;
   let mut na = 0f64;
   let mut nb = 0f64;
   for (&x, &y) in a.iter().zip(b) {
      let (x, y) = (x as f64, y as f64);
      dot += x * y;
      na += x * x;
      nb += y * y;
   }
   let den = na.sqrt() * nb.sqrt();
   if den == 0.0 {
      return Ok(0.0);
   }
   Ok(dot / den)
}

/// Returns a copy normalized to unit L2 norm; a zero-norm input comes back
/// unchanged.
pub fn normalize_l2(v: &[f32]) -> Vec<f32> {
   let norm = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
   if norm == 0.0 {
      return v.to_vec();
   }
   let inv = (1.0 / norm) as f32;
   v.iter().map(|&x| x * inv).collect()
}

/// Temp sibling of `path` for staged writes.
pub fn temp_sibling(path: &Path, suffix: &str) -> PathBuf {
   let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
   path.with_file_name(format!("{name}{suffix}"))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn cosine_ranks_exact_match_first() {
      let a = [1.0f32, 0.0];
      let b = [0.0f32, 1.0];
      let c = [1.0f32, 1.0];
      let q = [1.0f32, 0.0];

      let sa = cosine(&q, &a).unwrap();
      let sb = cosine(&q, &b).unwrap();
      let sc = cosine(&q, &c).unwrap();

      assert!((sa - 1.0).abs() < 1e-9);
      assert!(sa > sc && sc > sb);
   }

   #[test]
   fn cosine_zero_norm_is_zero_not_error() {
      assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
      assert!(cosine(&[1.0], &[1.0, 2.0]).is_err());
   }

   #[test]
   fn normalize_returns_unit_copy_or_input() {
      let v = normalize_l2(&[3.0, 4.0]);
      assert!((v[0] - 0.6).abs() < 1e-6);
      assert!((v[1] - 0.8).abs() < 1e-6);
      assert_eq!(normalize_l2(&[0.0, 0.0]), vec![0.0, 0.0]);
   }
}
