use std::{io, path::PathBuf};

use thiserror::Error;

/// Main error type for the axon application.
///
/// Every engine either recovers locally (skip, default, no-op) or returns one
/// of these variants to the top-level dispatcher, which prints the error once
/// and exits non-zero.
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error without a more specific home.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// Filesystem operation failed at a known path.
   #[error("{op} {path}: {source}", path = .path.display())]
   Fs {
      op:     &'static str,
      path:   PathBuf,
      #[source]
      source: io::Error,
   },

   /// No configuration file exists yet.
   #[error("no configuration at {path}\nRun 'axon init' first.", path = .path.display())]
   ConfigMissing { path: PathBuf },

   /// Configuration exists but failed to parse or validate.
   #[error("invalid configuration: {0}")]
   ConfigInvalid(String),

   /// Home directory could not be determined.
   #[error("cannot determine home directory")]
   NoHomeDir,

   /// The external `git` binary is not on the PATH.
   #[error(
      "git is not installed or not on PATH\n  Axon requires git to manage the hub repository.\n  \
       Install git from https://git-scm.com and try again."
   )]
   GitMissing,

   /// A git sub-command exited non-zero.
   #[error("git {op} failed{detail}", detail = fmt_detail(.detail))]
   Git { op: String, detail: String },

   /// `git pull --rebase` failed in read-write sync.
   #[error(
      "git pull --rebase failed — this may be a merge conflict.\n   Please resolve conflicts \
       manually in {repo}, then run:\n     git rebase --continue\n   or abort with:\n     git \
       rebase --abort",
      repo = .repo.display()
   )]
   MergeConflict { repo: PathBuf },

   /// A configured target name did not resolve.
   #[error("target {0:?} not found in axon.yaml")]
   TargetNotFound(String),

   /// Symlink creation was denied by the platform.
   #[error("cannot create symlink {dest}: {reason}", dest = .dest.display())]
   SymlinkDenied { dest: PathBuf, reason: String },

   /// HTTP transport failure.
   #[error("request failed: {0}")]
   Request(#[from] reqwest::Error),

   /// HTTP request completed with a non-success status.
   #[error("{what} failed: HTTP {status}\n{body}")]
   Http { what: &'static str, status: u16, body: String },

   /// JSON serialization or deserialization error.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// YAML serialization or deserialization error.
   #[error("yaml error: {0}")]
   Yaml(#[from] serde_yaml::Error),

   /// Embeddings provider misconfiguration or response failure.
   #[error("embeddings error: {0}")]
   Embeddings(String),

   /// The provider returned a vector of unexpected length.
   #[error("embedding dim changed mid-run: got {got} want {want}")]
   DimChanged { got: usize, want: usize },

   /// Index construction could not proceed.
   #[error("index build failed: {0}")]
   IndexBuild(String),

   /// Semantic index failed structural validation on load.
   #[error("invalid semantic index: {0}")]
   IndexInvalid(String),

   /// The index was built with a different embeddings model.
   #[error("embeddings model mismatch: index={index} provider={provider}")]
   ModelMismatch { index: String, provider: String },

   /// No semantic results cleared the score threshold.
   #[error("no semantic results above min score {0:.3}")]
   NoSemanticResults(f64),

   /// Downloaded asset digest did not match the release manifest.
   #[error("checksum mismatch for {asset}\nexpected: {expected}\nactual:   {actual}")]
   ChecksumMismatch { asset: String, expected: String, actual: String },

   /// An archive entry failed path sanitization.
   #[error("unsafe archive entry path: {0:?}")]
   ArchiveUnsafe(String),

   /// The release archive did not contain the expected binary.
   #[error("binary {0} not found in archive")]
   BinaryNotFound(String),

   /// A freshly installed binary reported the wrong version.
   #[error("version verification failed: expected {expected}, got {got}")]
   VersionMismatch { expected: String, got: String },

   /// Another axon process holds the update lock.
   #[error("another update is in progress (lock: {lock})", lock = .lock.display())]
   UpdateInProgress { lock: PathBuf },

   /// Release discovery produced nothing usable.
   #[error("{0}")]
   Release(String),

   /// Batch failure whose per-item details were already printed.
   #[error("{0}")]
   Failed(String),
}

fn fmt_detail(detail: &str) -> String {
   if detail.is_empty() {
      String::new()
   } else {
      format!(": {detail}")
   }
}

/// Standard result type using [`enum@Error`] as the default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
