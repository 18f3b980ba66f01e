//! Semantic query engine: index selection, the model-id gate, and the cosine
//! scan with score filtering.

use std::{path::PathBuf, time::Duration};

use super::{Document, MatchKind, SearchHit, index::Index, index, sort_hits};
use crate::{
   config::{self, Config},
   embed::{self, Provider},
   error::{Error, Result},
};

/// Wall-clock budget for embedding one query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default similarity threshold applied when the caller set neither `--k` nor
/// `--min-score`.
pub const DEFAULT_MIN_SCORE: f64 = 0.30;

/// Picks the semantic index to query: the user-built index under
/// `~/.axon/search` wins; a hub-shipped `<hub>/search` is the fallback. Any
/// load failure moves on to the next candidate.
pub fn select_index(cfg: &Config) -> Result<(Index, PathBuf)> {
   let user_dir = config::axon_dir()?.join("search");
   let hub_dir = cfg.repo_path.join("search");

   match Index::load(&user_dir) {
      Ok(idx) => return Ok((idx, user_dir)),
      Err(e) => tracing::debug!("user index unavailable: {e}"),
   }
   match Index::load(&hub_dir) {
      Ok(idx) => Ok((idx, hub_dir)),
      Err(e) => {
         tracing::debug!("hub index unavailable: {e}");
         Err(Error::IndexInvalid(format!(
            "no valid semantic index found (checked {} and {})",
            user_dir.display(),
            hub_dir.display()
         )))
      },
   }
}

/// Runs a semantic search end to end: index selection, model gate, query
/// embedding, cosine scan, threshold filter, ranking, truncation to `k`.
///
/// Every precondition failure is an error; the caller decides whether that is
/// fatal (`--semantic`) or a reason to fall back to keyword search.
pub async fn semantic_search(
   cfg: &Config,
   query: &str,
   min_score: f64,
   k: usize,
) -> Result<(Vec<SearchHit>, PathBuf)> {
   let (idx, idx_dir) = select_index(cfg)?;

   let emb_cfg = embed::EmbedConfig::load()?;
   let prov = embed::provider_from_config(&emb_cfg)?;
   if prov.model_id() != idx.manifest.model_id {
      return Err(Error::ModelMismatch {
         index:    idx.manifest.model_id.clone(),
         provider: prov.model_id(),
      });
   }

   let qv = tokio::time::timeout(QUERY_TIMEOUT, prov.embed(query))
      .await
      .map_err(|_| Error::Embeddings("query embedding timed out".into()))??;
   if qv.len() != idx.manifest.dim {
      return Err(Error::Embeddings(format!(
         "query embedding dim mismatch: got {} want {}",
         qv.len(),
         idx.manifest.dim
      )));
   }
   let qv = if idx.manifest.normalize { index::normalize_l2(&qv) } else { qv };

   let hits = rank_semantic(&idx, &qv, min_score, k)?;
   if hits.is_empty() {
      return Err(Error::NoSemanticResults(min_score));
   }
   Ok((hits, idx_dir))
}

/// Scores every stored vector against `qv`, applies the min-score filter,
/// sorts descending (ties by ascending id, stable) and truncates to `k`.
pub fn rank_semantic(idx: &Index, qv: &[f32], min_score: f64, k: usize) -> Result<Vec<SearchHit>> {
   let mut hits = Vec::with_capacity(idx.skills.len());
   for (i, entry) in idx.skills.iter().enumerate() {
      let score = index::cosine(qv, idx.vector(i))?;
      if min_score > 0.0 && score < min_score {
         continue;
      }
      hits.push(SearchHit {
         doc:   Document {
            id:          entry.id.clone(),
            path:        entry.path.clone(),
            name:        entry.name.clone(),
            description: entry.description.clone(),
            keywords:    String::new(),
         },
         score,
         kind:  MatchKind::Semantic,
      });
   }

   sort_hits(&mut hits);
   if k > 0 && hits.len() > k {
      hits.truncate(k);
   }
   Ok(hits)
}

/// Resolves the effective min-score: an explicit `--min-score` always wins;
/// an explicit `--k` disables default filtering; otherwise the default
/// threshold keeps irrelevant tail results out.
pub fn resolve_min_score(min_score_set: Option<f64>, k_set: bool) -> f64 {
   if let Some(v) = min_score_set {
      return v;
   }
   if k_set {
      return 0.0;
   }
   DEFAULT_MIN_SCORE
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::search::index::{Manifest, SkillEntry};

   fn test_index(entries: &[(&str, [f32; 2])]) -> Index {
      let skills = entries
         .iter()
         .map(|(id, _)| SkillEntry {
            id:          id.to_string(),
            path:        format!("skills/{id}"),
            name:        id.to_string(),
            description: String::new(),
            text_hash:   String::new(),
            updated_at:  String::new(),
         })
         .collect();
      let vectors = entries.iter().flat_map(|(_, v)| v.iter().copied()).collect();
      Index {
         manifest: Manifest {
            index_version: 1,
            created_at:    String::new(),
            hub_revision:  String::new(),
            model_id:      "dummy:test".into(),
            dim:           2,
            normalize:     true,
            vector_file:   "vectors.f32".into(),
            skills_file:   "skills.jsonl".into(),
         },
         skills,
         vectors,
      }
   }

   #[test]
   fn ranking_is_score_desc_then_id_asc() {
      let idx = test_index(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0]), ("c", [1.0, 1.0])]);
      let hits = rank_semantic(&idx, &[1.0, 0.0], 0.0, 0).unwrap();
      let ids: Vec<&str> = hits.iter().map(|h| h.doc.id.as_str()).collect();
      assert_eq!(ids, ["a", "c", "b"]);
      assert!((hits[0].score - 1.0).abs() < 1e-9);
      assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
   }

   #[test]
   fn min_score_filters_and_k_truncates() {
      let idx = test_index(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0]), ("c", [1.0, 1.0])]);
      let hits = rank_semantic(&idx, &[1.0, 0.0], 0.5, 0).unwrap();
      let ids: Vec<&str> = hits.iter().map(|h| h.doc.id.as_str()).collect();
      assert_eq!(ids, ["a", "c"]);

      let hits = rank_semantic(&idx, &[1.0, 0.0], 0.0, 1).unwrap();
      assert_eq!(hits.len(), 1);
      assert_eq!(hits[0].doc.id, "a");
   }

   #[test]
   fn min_score_resolution_precedence() {
      assert_eq!(resolve_min_score(Some(0.7), true), 0.7);
      assert_eq!(resolve_min_score(None, true), 0.0);
      assert_eq!(resolve_min_score(None, false), DEFAULT_MIN_SCORE);
   }
}
