//! GitHub release discovery and checksum manifest handling.

use std::env;

use serde::Deserialize;

use crate::error::{Error, Result};

const USER_AGENT: &str = "axon-cli";
const MAX_ERROR_BODY: usize = 8192;

/// Subset of the GitHub Releases API used by `axon update`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
   pub tag_name:   String,
   #[serde(default)]
   pub draft:      bool,
   #[serde(default)]
   pub prerelease: bool,
   #[serde(default)]
   pub assets:     Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
   pub name: String,
   pub browser_download_url: String,
   #[serde(default)]
   pub size: u64,
}

/// Fetches release metadata: the latest release, or the newest non-draft from
/// the full listing when prereleases are allowed.
pub async fn fetch_release(
   client: &reqwest::Client,
   owner: &str,
   repo: &str,
   allow_prerelease: bool,
) -> Result<Release> {
   let url = if allow_prerelease {
      format!("https://api.github.com/repos/{owner}/{repo}/releases")
   } else {
      format!("https://api.github.com/repos/{owner}/{repo}/releases/latest")
   };

   let body = fetch_text(client, &url, "github api request").await?;

   if !allow_prerelease {
      return Ok(serde_json::from_str(&body)?);
   }
   let releases: Vec<Release> = serde_json::from_str(&body)?;
   releases
      .into_iter()
      .find(|r| !r.draft)
      .ok_or_else(|| Error::Release("no releases found".into()))
}

/// Streams a GET into a string, with the standard headers and non-2xx
/// handling (status plus a truncated body snippet).
pub async fn fetch_text(
   client: &reqwest::Client,
   url: &str,
   what: &'static str,
) -> Result<String> {
   let mut request = client.get(url).header(reqwest::header::USER_AGENT, USER_AGENT);
   if let Some(token) = github_token() {
      request = request.bearer_auth(token);
   }

   let response = request.send().await?;
   let status = response.status();
   let body = response.text().await.unwrap_or_default();
   if !status.is_success() {
      let mut snippet = body.trim().to_string();
      crate::util::clip(&mut snippet, MAX_ERROR_BODY);
      return Err(Error::Http { what, status: status.as_u16(), body: snippet });
   }
   Ok(body)
}

/// `AXON_GITHUB_TOKEN` preferred, `GITHUB_TOKEN` as the fallback.
pub fn github_token() -> Option<String> {
   env::var("AXON_GITHUB_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
      .or_else(|| env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
}

/// Locates the checksum manifest among release assets: `checksums.txt`
/// preferred, any checksum-like name as a fallback.
pub fn find_checksum_asset(release: &Release) -> Option<&Asset> {
   release
      .assets
      .iter()
      .find(|a| a.name == "checksums.txt")
      .or_else(|| release.assets.iter().find(|a| a.name.to_lowercase().contains("checksum")))
}

/// Parses a checksum manifest and returns the lowercase hex SHA-256 recorded
/// for `filename`.
///
/// Lines are whitespace-separated with the digest first and the filename
/// last; a leading `*` on the filename (binary-mode markers) is ignored.
pub fn parse_expected_sha256(manifest: &str, filename: &str) -> Result<String> {
   for line in manifest.lines() {
      let fields: Vec<&str> = line.split_whitespace().collect();
      if fields.len() < 2 {
         continue;
      }
      let digest = fields[0];
      let name = fields[fields.len() - 1].trim_start_matches('*');
      if name == filename {
         if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Release(format!("invalid checksum hex for {filename}")));
         }
         return Ok(digest.to_lowercase());
      }
   }
   Err(Error::Release(format!("checksum for {filename} not found")))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn checksum_manifest_lookup() {
      let manifest = format!(
         "{} axon_0.1.9_linux_amd64.tar.gz\n{} *axon_0.1.9_windows_amd64.zip\n",
         "a".repeat(64),
         "B".repeat(64)
      );
      assert_eq!(
         parse_expected_sha256(&manifest, "axon_0.1.9_linux_amd64.tar.gz").unwrap(),
         "a".repeat(64)
      );
      // Leading `*` stripped, digest lowercased.
      assert_eq!(
         parse_expected_sha256(&manifest, "axon_0.1.9_windows_amd64.zip").unwrap(),
         "b".repeat(64)
      );
      assert!(parse_expected_sha256(&manifest, "missing.tar.gz").is_err());
   }

   #[test]
   fn invalid_hex_rejected() {
      let manifest = "zzzz axon.tar.gz\n";
      assert!(parse_expected_sha256(manifest, "axon.tar.gz").is_err());
   }

   #[test]
   fn checksum_asset_preference() {
      let asset = |name: &str| Asset {
         name: name.into(),
         browser_download_url: String::new(),
         size: 0,
      };
      let release = Release {
         tag_name:   "v1".into(),
         draft:      false,
         prerelease: false,
         assets:     vec![asset("axon.tar.gz"), asset("SHA256-checksums"), asset("checksums.txt")],
      };
      assert_eq!(find_checksum_asset(&release).unwrap().name, "checksums.txt");
   }
}
