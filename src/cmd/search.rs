//! `axon search`: keyword or semantic search over hub documents, plus the
//! `--index` build mode.

use std::time::Duration;

use crate::{
   config::{self, Config},
   embed,
   error::{Error, Result},
   output,
   search::{self, MatchKind, SearchHit, builder, query},
};

/// Wall-clock budget for a full index build.
const BUILD_TIMEOUT: Duration = Duration::from_secs(600);

pub struct SearchArgs {
   pub query:     Vec<String>,
   pub index:     bool,
   pub keyword:   bool,
   pub semantic:  bool,
   pub k:         Option<usize>,
   pub min_score: Option<f64>,
   pub force:     bool,
   pub debug:     bool,
}

pub async fn execute(args: SearchArgs) -> Result<()> {
   let cfg = Config::load()?;

   if args.index {
      return build_index(&cfg, args.force).await;
   }

   if args.query.is_empty() {
      return Err(Error::Failed("usage: axon search <query>".into()));
   }
   let query_text = args.query.join(" ");
   let k = args.k.unwrap_or(5);
   let min_score = query::resolve_min_score(args.min_score, args.k.is_some());

   if args.keyword {
      return keyword_search(&cfg, &query_text, k);
   }

   if args.semantic {
      let (hits, dir) = query::semantic_search(&cfg, &query_text, min_score, k).await?;
      if args.debug {
         output::info("", &format!("semantic index used: {}", dir.display()));
      }
      print_results(&query_text, &hits);
      return Ok(());
   }

   // Default: best-effort semantic, keyword fallback on any failure.
   match query::semantic_search(&cfg, &query_text, min_score, k).await {
      Ok((hits, dir)) => {
         if args.debug {
            output::info("", &format!("semantic index used: {}", dir.display()));
         }
         print_results(&query_text, &hits);
         Ok(())
      },
      Err(e) => {
         if args.debug {
            output::info("", &format!("semantic search unavailable, falling back to keyword: {e}"));
         }
         keyword_search(&cfg, &query_text, k)
      },
   }
}

fn keyword_search(cfg: &Config, query_text: &str, k: usize) -> Result<()> {
   let docs = search::discover_documents(&cfg.repo_path, &cfg.effective_search_roots())?;
   let hits = search::keyword_search(&docs, query_text, k);
   print_results(query_text, &hits);
   Ok(())
}

/// Builds the user index and publishes it at `~/.axon/search`. Staging and
/// the atomic swap live inside the builder; unchanged documents reuse their
/// previous vectors.
async fn build_index(cfg: &Config, force: bool) -> Result<()> {
   let emb_cfg = embed::EmbedConfig::load()?;
   let prov = embed::provider_from_config(&emb_cfg)?;

   let user_dir = config::axon_dir()?.join("search");

   output::info("", &format!("building semantic index using {}", prov.model_id()));

   let opts = builder::BuildOptions {
      repo_path: cfg.repo_path.clone(),
      out_dir:   user_dir.clone(),
      roots:     cfg.effective_search_roots(),
      force,
      normalize: true,
   };
   tokio::time::timeout(BUILD_TIMEOUT, builder::build_index(prov.as_ref(), &opts))
      .await
      .map_err(|_| Error::IndexBuild("index build timed out".into()))??;

   output::ok("", &format!("semantic index written: {}", user_dir.display()));
   Ok(())
}

fn print_results(query_text: &str, hits: &[SearchHit]) {
   println!("\naxon search {query_text:?}\n");
   println!("Results ({} found):", hits.len());
   if hits.is_empty() {
      return;
   }

   // Group by top-level root, skills first.
   let mut order: Vec<String> = Vec::new();
   for hit in hits {
      let root = root_of(hit);
      if !order.contains(&root) {
         order.push(root);
      }
   }
   let priority = |root: &str| match root {
      "skills" => 0,
      "workflows" => 1,
      "commands" => 2,
      _ => 3,
   };
   order.sort_by(|a, b| priority(a).cmp(&priority(b)).then_with(|| a.cmp(b)));

   for root in &order {
      let items: Vec<&SearchHit> = hits.iter().filter(|h| root_of(h) == *root).collect();
      println!("\n{root} ({}):", items.len());
      for (i, hit) in items.iter().enumerate() {
         let mut display_id = hit.doc.id.clone();
         if root != "skills" {
            if let Some(rest) = display_id.strip_prefix(&format!("{root}:")) {
               display_id = rest.to_string();
            }
            display_id = display_id.replace(':', "/");
         }
         let score = match hit.kind {
            MatchKind::Semantic => format!("[{:.3}] ", hit.score),
            MatchKind::Keyword => String::new(),
         };
         println!("  {}. {score}{display_id}", i + 1);
         println!("  - {}", hit.doc.description.trim());
      }
   }
}

fn root_of(hit: &SearchHit) -> String {
   let path = &hit.doc.path;
   if path.is_empty() {
      return "(unknown)".to_string();
   }
   match path.find('/') {
      Some(i) => path[..i].to_string(),
      None => path.clone(),
   }
}
