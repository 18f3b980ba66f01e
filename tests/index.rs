mod support;

use std::fs;

use axon::{
   embed::dummy::DummyProvider,
   search::{
      builder::{self, BuildOptions, build_index},
      discover_documents,
      index::{Index, Manifest, SkillEntry, write},
   },
};
use support::write_skill;

fn manifest(dim: usize) -> Manifest {
   Manifest {
      index_version: 1,
      created_at:    "2026-01-01T00:00:00Z".into(),
      hub_revision:  String::new(),
      model_id:      "dummy:test".into(),
      dim,
      normalize:     true,
      vector_file:   "vectors.f32".into(),
      skills_file:   "skills.jsonl".into(),
   }
}

fn entry(id: &str) -> SkillEntry {
   SkillEntry {
      id:          id.into(),
      path:        format!("skills/{id}"),
      name:        id.into(),
      description: format!("{id} description"),
      text_hash:   String::new(),
      updated_at:  String::new(),
   }
}

#[test]
fn store_round_trip() {
   let tmp = tempfile::tempdir().unwrap();
   let dir = tmp.path();

   let skills = vec![entry("a"), entry("b")];
   let vectors = vec![1.0f32, 0.0, 0.0, 1.0];
   write(dir, manifest(2), &skills, &vectors).unwrap();

   let idx = Index::load(dir).unwrap();
   assert_eq!(idx.manifest.dim, 2);
   assert_eq!(idx.skills.len(), 2);
   assert_eq!(idx.vectors.len(), 4);
   assert_eq!(idx.vector(1), &[0.0, 1.0]);
}

#[test]
fn loader_rejects_size_mismatch() {
   let tmp = tempfile::tempdir().unwrap();
   let dir = tmp.path();
   write(dir, manifest(2), &[entry("a"), entry("b")], &[1.0, 0.0, 0.0, 1.0]).unwrap();

   // Truncate the vectors file to an inconsistent length.
   fs::write(dir.join("vectors.f32"), [0u8; 12]).unwrap();
   let err = Index::load(dir).unwrap_err().to_string();
   assert!(err.contains("size mismatch"), "got: {err}");

   // Not even a multiple of four bytes.
   fs::write(dir.join("vectors.f32"), [0u8; 15]).unwrap();
   let err = Index::load(dir).unwrap_err().to_string();
   assert!(err.contains("multiple of 4"), "got: {err}");
}

#[test]
fn loader_rejects_zero_dim_and_bad_jsonl() {
   let tmp = tempfile::tempdir().unwrap();
   let dir = tmp.path();
   write(dir, manifest(2), &[entry("a")], &[1.0, 0.0]).unwrap();

   let broken = manifest(2);
   let mut json = serde_json::to_value(&broken).unwrap();
   json["dim"] = serde_json::json!(0);
   fs::write(dir.join("index_manifest.json"), serde_json::to_string(&json).unwrap()).unwrap();
   assert!(Index::load(dir).is_err());

   fs::write(dir.join("index_manifest.json"), serde_json::to_string(&manifest(2)).unwrap())
      .unwrap();
   fs::write(dir.join("skills.jsonl"), "{not json}\n").unwrap();
   assert!(Index::load(dir).is_err());
}

#[tokio::test]
async fn builder_round_trip_with_text_hashes() {
   let tmp = tempfile::tempdir().unwrap();
   let hub = tmp.path().join("hub");
   write_skill(&hub, "alpha", "Alpha", "first skill");
   write_skill(&hub, "beta", "Beta", "second skill");
   fs::create_dir_all(hub.join("workflows")).unwrap();
   fs::write(hub.join("workflows/w1.md"), "---\nname: W1\n---\nA workflow.\n").unwrap();

   let prov = DummyProvider::new(8);
   let out = tmp.path().join("index");
   let opts = BuildOptions {
      repo_path: hub.clone(),
      out_dir:   out.clone(),
      roots:     vec!["skills".into(), "workflows".into()],
      force:     false,
      normalize: true,
   };
   let built = build_index(&prov, &opts).await.unwrap();
   assert_eq!(built.manifest.model_id, "dummy:test");
   assert_eq!(built.manifest.dim, 8);

   let idx = Index::load(&out).unwrap();
   assert_eq!(idx.skills.len(), 3);
   assert_eq!(idx.vectors.len(), 3 * 8);

   // Output is sorted by id and hashes match the canonical text.
   let ids: Vec<&str> = idx.skills.iter().map(|s| s.id.as_str()).collect();
   assert_eq!(ids, ["alpha", "beta", "workflows:w1"]);
   let docs = discover_documents(&hub, &["skills".into(), "workflows".into()]).unwrap();
   for skill in &idx.skills {
      let doc = docs.iter().find(|d| d.id == skill.id).unwrap();
      assert_eq!(skill.text_hash, builder::text_hash(&builder::canonical_text(doc)));
   }

   // Stored vectors are unit length (normalize=true).
   for i in 0..idx.skills.len() {
      let norm: f32 = idx.vector(i).iter().map(|x| x * x).sum::<f32>().sqrt();
      assert!((norm - 1.0).abs() < 1e-5, "vector {i} norm {norm}");
   }
}

#[tokio::test]
async fn incremental_reuse_keyed_by_text_hash() {
   let tmp = tempfile::tempdir().unwrap();
   let hub = tmp.path().join("hub");
   write_skill(&hub, "alpha", "Alpha", "first skill");
   write_skill(&hub, "beta", "Beta", "second skill");

   let out = tmp.path().join("index");
   let opts = BuildOptions {
      repo_path: hub.clone(),
      out_dir:   out.clone(),
      roots:     vec!["skills".into()],
      force:     false,
      normalize: true,
   };

   let first = DummyProvider::new(8);
   build_index(&first, &opts).await.unwrap();
   assert_eq!(first.calls(), 2);

   // Unchanged documents embed nothing on rebuild.
   let second = DummyProvider::new(8);
   build_index(&second, &opts).await.unwrap();
   assert_eq!(second.calls(), 0);

   // Editing one description re-embeds exactly that document.
   write_skill(&hub, "beta", "Beta", "second skill, revised");
   let third = DummyProvider::new(8);
   build_index(&third, &opts).await.unwrap();
   assert_eq!(third.calls(), 1);

   // Force re-embeds everything.
   let forced = DummyProvider::new(8);
   let force_opts = BuildOptions { force: true, ..opts };
   build_index(&forced, &force_opts).await.unwrap();
   assert_eq!(forced.calls(), 2);
}

#[test]
fn atomic_swap_replaces_and_cleans_up() {
   let tmp = tempfile::tempdir().unwrap();
   let src = tmp.path().join("staged");
   let dest = tmp.path().join("live");
   fs::create_dir_all(&src).unwrap();
   fs::create_dir_all(&dest).unwrap();
   fs::write(src.join("index_manifest.json"), "new").unwrap();
   fs::write(dest.join("index_manifest.json"), "old").unwrap();

   builder::atomic_swap(&src, &dest).unwrap();

   assert_eq!(fs::read_to_string(dest.join("index_manifest.json")).unwrap(), "new");
   assert!(!src.exists());
   assert!(!tmp.path().join("live.bak").exists(), "backup removed after swap");
}

#[tokio::test]
async fn empty_hub_fails_the_build() {
   let tmp = tempfile::tempdir().unwrap();
   let hub = tmp.path().join("hub");
   fs::create_dir_all(&hub).unwrap();
   let prov = DummyProvider::new(4);
   let opts = BuildOptions {
      repo_path: hub,
      out_dir:   tmp.path().join("index"),
      roots:     vec!["skills".into()],
      force:     false,
      normalize: true,
   };
   assert!(build_index(&prov, &opts).await.is_err());
}
