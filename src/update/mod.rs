//! Self-update engine: release discovery, platform-aware asset selection,
//! checksum-verified download, safe extraction, and an atomic binary swap
//! with rollback. A per-user advisory lock serializes concurrent updates.

pub mod archive;
pub mod github;
pub mod lock;

use std::{
   env, fs,
   io::Write,
   path::{Path, PathBuf},
   process::Command,
   time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};

use self::{
   github::{Asset, Release},
   lock::UpdateLock,
};
use crate::{
   error::{Error, Result},
   output, version,
};

pub const DEFAULT_REPO: &str = "kamusis/axon-cli";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Flags of one `axon update` invocation.
pub struct UpdateOptions {
   pub check:      bool,
   pub dry_run:    bool,
   pub repo:       String,
   pub prerelease: bool,
   pub force:      bool,
   pub timeout:    Duration,
   pub verbose:    bool,
}

impl Default for UpdateOptions {
   fn default() -> Self {
      Self {
         check:      false,
         dry_run:    false,
         repo:       DEFAULT_REPO.to_string(),
         prerelease: false,
         force:      false,
         timeout:    DEFAULT_TIMEOUT,
         verbose:    false,
      }
   }
}

/// Runs the update pipeline. All-or-nothing: any failure after the swap
/// begins rolls back to the previous binary.
pub async fn run(opts: &UpdateOptions) -> Result<()> {
   let _lock = UpdateLock::acquire(opts.timeout)?;

   let (owner, repo) = split_repo(&opts.repo)?;
   let client = reqwest::Client::new();

   let release = with_deadline(
      opts.timeout,
      github::fetch_release(&client, &owner, &repo, opts.prerelease),
   )
   .await?;

   let latest_tag = release.tag_name.trim().to_string();
   if latest_tag.is_empty() {
      return Err(Error::Release("invalid release: empty tag_name".into()));
   }
   let latest_version = normalize_release_version(&latest_tag);

   if !opts.force && version::VERSION == latest_version {
      output::ok("", &format!("Axon is up to date: {}", version::VERSION));
      return Ok(());
   }

   let asset = select_release_asset(&release, &latest_tag, release_os(), release_arch())?;

   if opts.check {
      output::info("", &format!("Update available: {} -> {latest_tag}", version::VERSION));
      output::info("", &format!("Asset: {}", asset.name));
      return Ok(());
   }
   if opts.dry_run {
      output::info("", &format!("Would update: {} -> {latest_tag}", version::VERSION));
      output::info("", &format!("Would download: {}", asset.browser_download_url));
      return Ok(());
   }

   output::info("", &format!("Updating: {} -> {latest_tag}", version::VERSION));

   let temp_base = choose_writable_temp_base()?;
   let temp_dir = tempfile::Builder::new()
      .prefix("axon-update-")
      .tempdir_in(&temp_base)
      .map_err(|e| Error::Fs { op: "cannot create", path: temp_base, source: e })?;

   let archive_path = temp_dir.path().join(&asset.name);
   with_deadline(
      opts.timeout,
      download_with_progress(&client, &asset.browser_download_url, &archive_path, opts.verbose),
   )
   .await?;

   match github::find_checksum_asset(&release) {
      Some(checksum_asset) => {
         let manifest = with_deadline(
            opts.timeout,
            github::fetch_text(&client, &checksum_asset.browser_download_url, "checksum download"),
         )
         .await?;
         let expected = github::parse_expected_sha256(&manifest, &asset.name)?;
         let actual = file_sha256_hex(&archive_path)?;
         if !expected.eq_ignore_ascii_case(&actual) {
            return Err(Error::ChecksumMismatch {
               asset: asset.name.clone(),
               expected,
               actual,
            });
         }
         output::ok("", "Checksum verified.");
      },
      None => {
         output::warn("", "checksums.txt not found in release; skipping checksum verification");
      },
   }

   let new_binary = temp_dir
      .path()
      .join(if cfg!(windows) { "axon.new.exe" } else { "axon.new" });
   archive::extract_binary(&archive_path, &new_binary)?;

   let current = env::current_exe()
      .map_err(|e| Error::Fs { op: "cannot locate", path: PathBuf::from("axon"), source: e })?;
   let current = current.canonicalize().unwrap_or(current);

   if cfg!(windows) {
      let staged = current
         .parent()
         .unwrap_or_else(|| Path::new("."))
         .join("axon.new.exe");
      crate::util::copy_file(&new_binary, &staged)?;
      let backup = sibling_with_suffix(&current, ".bak");
      spawn_swap_helper(&current, &staged, &backup, &latest_version, opts.timeout)?;
      output::ok("", "Update staged; it will complete after this process exits.");
      return Ok(());
   }

   let backup = sibling_with_suffix(&current, ".bak");
   install_with_rollback(&current, &new_binary, &backup, &latest_version)?;
   output::ok("", &format!("Updated to {latest_tag}"));
   Ok(())
}

async fn with_deadline<T>(
   timeout: Duration,
   fut: impl Future<Output = Result<T>>,
) -> Result<T> {
   tokio::time::timeout(timeout, fut)
      .await
      .map_err(|_| Error::Release(format!("network operation timed out after {timeout:?}")))?
}

/// Converts a release tag (`v0.1.9`) to the version embedded in binaries and
/// archive names (`0.1.9`).
pub fn normalize_release_version(tag: &str) -> String {
   let tag = tag.trim();
   tag.strip_prefix('v').filter(|rest| !rest.is_empty()).unwrap_or(tag).to_string()
}

pub fn split_repo(s: &str) -> Result<(String, String)> {
   let parts: Vec<&str> = s.trim().split('/').collect();
   if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
      return Err(Error::Release(format!("invalid --repo {s:?} (expected owner/name)")));
   }
   Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Release archives use Go toolchain platform names.
pub fn release_os() -> &'static str {
   match env::consts::OS {
      "macos" => "darwin",
      other => other,
   }
}

pub fn release_arch() -> &'static str {
   match env::consts::ARCH {
      "x86_64" => "amd64",
      "aarch64" => "arm64",
      other => other,
   }
}

/// Expected release archive filename for a version and platform.
pub fn expected_archive_name(version_tag: &str, os: &str, arch: &str) -> String {
   let version = normalize_release_version(version_tag);
   let ext = if os == "windows" { "zip" } else { "tar.gz" };
   format!("axon_{version}_{os}_{arch}.{ext}")
}

/// Picks the release asset for this platform by exact archive-name match.
pub fn select_release_asset<'a>(
   release: &'a Release,
   version_tag: &str,
   os: &str,
   arch: &str,
) -> Result<&'a Asset> {
   let expected = expected_archive_name(version_tag, os, arch);
   if let Some(asset) = release.assets.iter().find(|a| a.name == expected) {
      return Ok(asset);
   }
   let available: Vec<&str> = release.assets.iter().map(|a| a.name.as_str()).collect();
   Err(Error::Release(format!(
      "no suitable release asset found for {os}/{arch} (expected {expected:?}). Available: {}",
      available.join(", ")
   )))
}

/// Selects a temp base directory that is very likely writable, probing each
/// candidate with a throwaway file: the OS temp dir, the user cache dir, and
/// `~/.axon/tmp`.
pub fn choose_writable_temp_base() -> Result<PathBuf> {
   let mut candidates = vec![env::temp_dir()];
   if let Some(dirs) = directories::BaseDirs::new() {
      candidates.push(dirs.cache_dir().join("axon").join("tmp"));
      candidates.push(dirs.home_dir().join(".axon").join("tmp"));
   }

   for base in candidates {
      if fs::create_dir_all(&base).is_err() {
         continue;
      }
      let probe = base.join(".axon-probe-tmp");
      if fs::write(&probe, b"").is_err() {
         continue;
      }
      let _ = fs::remove_file(&probe);
      return Ok(base);
   }
   Err(Error::Release("no writable temp directory found".into()))
}

/// Streams `url` into `dest` with a throttled single-line progress indicator
/// (percentage when the length is known, bytes otherwise).
async fn download_with_progress(
   client: &reqwest::Client,
   url: &str,
   dest: &Path,
   verbose: bool,
) -> Result<()> {
   let response = client
      .get(url)
      .header(reqwest::header::USER_AGENT, "axon-cli")
      .send()
      .await?;
   let status = response.status();
   if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let mut snippet = body.trim().to_string();
      crate::util::clip(&mut snippet, 8192);
      return Err(Error::Http { what: "download", status: status.as_u16(), body: snippet });
   }

   let bar = match response.content_length() {
      Some(total) => {
         let bar = ProgressBar::new(total);
         bar.set_style(
            ProgressStyle::with_template(
               "Downloading... {bytes} / {total_bytes} ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
         );
         bar
      },
      None => {
         let bar = ProgressBar::new_spinner();
         bar.set_style(
            ProgressStyle::with_template("Downloading... {bytes}")
               .unwrap_or_else(|_| ProgressStyle::default_spinner()),
         );
         bar
      },
   };

   let mut out = fs::File::create(dest)
      .map_err(|e| Error::Fs { op: "cannot create", path: dest.to_path_buf(), source: e })?;
   let mut response = response;
   let mut downloaded = 0u64;
   while let Some(chunk) = response.chunk().await? {
      out.write_all(&chunk)
         .map_err(|e| Error::Fs { op: "cannot write", path: dest.to_path_buf(), source: e })?;
      downloaded += chunk.len() as u64;
      bar.set_position(downloaded);
   }
   bar.finish_and_clear();

   if verbose {
      output::info("", &format!("Downloaded {downloaded} bytes to {}", dest.display()));
   }
   Ok(())
}

/// Lowercase hex SHA-256 of a file.
pub fn file_sha256_hex(path: &Path) -> Result<String> {
   let data = fs::read(path)
      .map_err(|e| Error::Fs { op: "cannot read", path: path.to_path_buf(), source: e })?;
   Ok(hex::encode(Sha256::digest(&data)))
}

/// Replaces `current` with `new_path`, verifies the installed binary, and
/// rolls back on any failure. The previous binary survives as `.bak` only
/// for the duration of the swap.
pub fn install_with_rollback(
   current: &Path,
   new_path: &Path,
   backup: &Path,
   expected_version: &str,
) -> Result<()> {
   let _ = fs::remove_file(backup);
   fs::rename(current, backup).map_err(|e| Error::Fs {
      op:     "cannot create backup",
      path:   backup.to_path_buf(),
      source: e,
   })?;
   if let Err(e) = fs::rename(new_path, current) {
      let _ = fs::rename(backup, current);
      return Err(Error::Fs {
         op:     "cannot replace binary",
         path:   current.to_path_buf(),
         source: e,
      });
   }
   if let Err(e) = verify_binary_version(current, expected_version) {
      let _ = fs::rename(current, sibling_with_suffix(current, ".failed"));
      let _ = fs::rename(backup, current);
      return Err(e);
   }
   if cleanup_backup(backup).is_err() {
      output::warn("", &format!("cannot remove backup: {}", backup.display()));
   }
   Ok(())
}

/// Executes the binary with `-v` and compares its trimmed stdout to the
/// expected version.
pub fn verify_binary_version(path: &Path, expected: &str) -> Result<()> {
   let out = Command::new(path).arg("-v").output().map_err(|e| Error::Fs {
      op:     "cannot execute",
      path:   path.to_path_buf(),
      source: e,
   })?;
   let got = String::from_utf8_lossy(&out.stdout).trim().to_string();
   if !out.status.success() || got != expected {
      return Err(Error::VersionMismatch { expected: expected.to_string(), got });
   }
   Ok(())
}

fn try_remove_backup(backup: &Path) -> std::io::Result<()> {
   match fs::remove_file(backup) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e),
   }
}

/// Removes the `.bak` left over from a swap.
#[cfg(not(windows))]
pub fn cleanup_backup(backup: &Path) -> Result<()> {
   try_remove_backup(backup).map_err(|e| Error::Fs {
      op:     "cannot remove",
      path:   backup.to_path_buf(),
      source: e,
   })
}

/// Removes the `.bak` left over from a swap. Antivirus or indexers can hold
/// the file open briefly; deletion retries with backoff and, as a last
/// resort, is scheduled for the next reboot.
#[cfg(windows)]
pub fn cleanup_backup(backup: &Path) -> Result<()> {
   let mut last = None;
   for _ in 0..15 {
      match try_remove_backup(backup) {
         Ok(()) => return Ok(()),
         Err(e) => last = Some(e),
      }
      std::thread::sleep(Duration::from_millis(200));
   }
   schedule_delete_on_reboot(backup).map_err(|_| Error::Fs {
      op:     "cannot remove",
      path:   backup.to_path_buf(),
      source: last.unwrap_or_else(|| std::io::Error::other("delete failed")),
   })
}

#[cfg(windows)]
fn schedule_delete_on_reboot(path: &Path) -> std::io::Result<()> {
   use std::os::windows::ffi::OsStrExt;

   use windows_sys::Win32::Storage::FileSystem::{MOVEFILE_DELAY_UNTIL_REBOOT, MoveFileExW};

   let wide: Vec<u16> = path.as_os_str().encode_wide().chain(std::iter::once(0)).collect();
   let ok = unsafe { MoveFileExW(wide.as_ptr(), std::ptr::null(), MOVEFILE_DELAY_UNTIL_REBOOT) };
   if ok == 0 {
      return Err(std::io::Error::last_os_error());
   }
   Ok(())
}

/// `path` with `suffix` appended to its final component (`axon` → `axon.bak`).
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
   let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
   path.with_file_name(format!("{name}{suffix}"))
}

/// Spawns the detached helper that swaps a running Windows executable after
/// this process exits.
fn spawn_swap_helper(
   current: &Path,
   staged: &Path,
   backup: &Path,
   expected_version: &str,
   timeout: Duration,
) -> Result<()> {
   Command::new(current)
      .arg("__selfupdate-swap")
      .args(["--pid", &std::process::id().to_string()])
      .args(["--current", &current.to_string_lossy()])
      .args(["--new", &staged.to_string_lossy()])
      .args(["--backup", &backup.to_string_lossy()])
      .args(["--expected", expected_version])
      .args(["--timeout", &format!("{}s", timeout.as_secs())])
      .spawn()
      .map_err(|e| Error::Fs {
         op:     "cannot spawn helper",
         path:   current.to_path_buf(),
         source: e,
      })?;
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn archive_names_match_release_layout() {
      assert_eq!(
         expected_archive_name("v0.1.9", "linux", "amd64"),
         "axon_0.1.9_linux_amd64.tar.gz"
      );
      assert_eq!(
         expected_archive_name("v0.1.9", "windows", "amd64"),
         "axon_0.1.9_windows_amd64.zip"
      );
      assert_eq!(
         expected_archive_name("0.2.0", "darwin", "arm64"),
         "axon_0.2.0_darwin_arm64.tar.gz"
      );
   }

   #[test]
   fn version_normalization_strips_leading_v() {
      assert_eq!(normalize_release_version("v0.1.9"), "0.1.9");
      assert_eq!(normalize_release_version("0.1.9"), "0.1.9");
      assert_eq!(normalize_release_version(" v1.0 "), "1.0");
      assert_eq!(normalize_release_version("v"), "v");
   }

   #[test]
   fn repo_splitting_validates_shape() {
      assert_eq!(split_repo("owner/name").unwrap(), ("owner".into(), "name".into()));
      assert!(split_repo("bad").is_err());
      assert!(split_repo("a/b/c").is_err());
      assert!(split_repo("/name").is_err());
   }

   #[test]
   fn asset_selection_exact_match_or_listing() {
      let asset = |name: &str| Asset {
         name: name.into(),
         browser_download_url: format!("https://example.com/{name}"),
         size: 1,
      };
      let release = Release {
         tag_name:   "v0.1.9".into(),
         draft:      false,
         prerelease: false,
         assets:     vec![asset("axon_0.1.9_linux_amd64.tar.gz"), asset("checksums.txt")],
      };
      let picked = select_release_asset(&release, "v0.1.9", "linux", "amd64").unwrap();
      assert_eq!(picked.name, "axon_0.1.9_linux_amd64.tar.gz");

      let err = select_release_asset(&release, "v0.1.9", "linux", "arm64").unwrap_err();
      let msg = err.to_string();
      assert!(msg.contains("axon_0.1.9_linux_arm64.tar.gz"));
      assert!(msg.contains("checksums.txt"));
   }
}
