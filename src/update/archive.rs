//! Safe extraction of the axon binary from release archives.

use std::{
   fs::{File, OpenOptions},
   io,
   path::{Component, Path, PathBuf},
};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};

/// Name of the binary entry sought inside release archives.
pub fn wanted_binary_name() -> &'static str {
   if cfg!(windows) { "axon.exe" } else { "axon" }
}

/// Sanitizes one archive entry path: backslashes become slashes, a leading
/// `./` is stripped, and anything empty, absolute, or containing `..` is
/// rejected with `None`.
pub fn sanitize_entry_path(name: &str) -> Option<String> {
   let name = name.replace('\\', "/");
   let name = name.strip_prefix("./").unwrap_or(&name);
   if name.is_empty() || name.starts_with('/') {
      return None;
   }
   let path = Path::new(name);
   if path
      .components()
      .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
   {
      return None;
   }
   let clean: PathBuf = path.components().collect();
   let clean = clean.to_string_lossy().replace('\\', "/");
   if clean.is_empty() || clean == "." {
      return None;
   }
   Some(clean)
}

/// Extracts the axon binary from `archive_path` into `dest_path`, dispatching
/// on the archive extension. Entries other than the sought binary are
/// ignored.
pub fn extract_binary(archive_path: &Path, dest_path: &Path) -> Result<()> {
   let lower = archive_path.to_string_lossy().to_lowercase();
   if lower.ends_with(".tar.gz") {
      extract_from_tar_gz(archive_path, dest_path)
   } else if lower.ends_with(".zip") {
      extract_from_zip(archive_path, dest_path)
   } else {
      Err(Error::Release(format!(
         "unsupported archive format: {}",
         archive_path.display()
      )))
   }
}

fn extract_from_tar_gz(archive_path: &Path, dest_path: &Path) -> Result<()> {
   let file = open(archive_path)?;
   let mut archive = tar::Archive::new(GzDecoder::new(file));
   let want = wanted_binary_name();

   for entry in archive.entries().map_err(|e| archive_error(archive_path, e))? {
      let mut entry = entry.map_err(|e| archive_error(archive_path, e))?;
      let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
      let Some(name) = sanitize_entry_path(&raw) else {
         if names_binary(&raw, want) {
            return Err(Error::ArchiveUnsafe(raw));
         }
         continue;
      };
      if entry.header().entry_type().is_dir() {
         continue;
      }
      if names_binary(&name, want) {
         write_binary(dest_path, &mut entry)?;
         return Ok(());
      }
   }
   Err(Error::BinaryNotFound(want.to_string()))
}

fn extract_from_zip(archive_path: &Path, dest_path: &Path) -> Result<()> {
   let file = open(archive_path)?;
   let mut archive = zip::ZipArchive::new(file)
      .map_err(|e| Error::Release(format!("cannot open zip {}: {e}", archive_path.display())))?;
   let want = wanted_binary_name();

   for i in 0..archive.len() {
      let mut entry = archive
         .by_index(i)
         .map_err(|e| Error::Release(format!("cannot read zip entry: {e}")))?;
      let raw = entry.name().to_string();
      let Some(name) = sanitize_entry_path(&raw) else {
         if names_binary(&raw, want) {
            return Err(Error::ArchiveUnsafe(raw));
         }
         continue;
      };
      if entry.is_dir() {
         continue;
      }
      if names_binary(&name, want) {
         write_binary(dest_path, &mut entry)?;
         return Ok(());
      }
   }
   Err(Error::BinaryNotFound(want.to_string()))
}

/// Whether the final path segment (after slash normalization) is the sought
/// binary name.
fn names_binary(name: &str, want: &str) -> bool {
   name
      .replace('\\', "/")
      .rsplit('/')
      .next()
      .map(|base| base == want)
      .unwrap_or(false)
}

fn open(path: &Path) -> Result<File> {
   File::open(path)
      .map_err(|e| Error::Fs { op: "cannot open", path: path.to_path_buf(), source: e })
}

fn archive_error(path: &Path, e: io::Error) -> Error {
   Error::Fs { op: "cannot read archive", path: path.to_path_buf(), source: e }
}

fn write_binary(dest: &Path, reader: &mut dyn io::Read) -> Result<()> {
   let mut options = OpenOptions::new();
   options.create(true).truncate(true).write(true);
   #[cfg(unix)]
   {
      use std::os::unix::fs::OpenOptionsExt;
      options.mode(0o755);
   }
   let mut out = options
      .open(dest)
      .map_err(|e| Error::Fs { op: "cannot create", path: dest.to_path_buf(), source: e })?;
   io::copy(reader, &mut out)
      .map_err(|e| Error::Fs { op: "cannot write", path: dest.to_path_buf(), source: e })?;
   // An earlier failed install may have left a non-executable file behind.
   #[cfg(unix)]
   {
      use std::{fs, os::unix::fs::PermissionsExt};
      let _ = fs::set_permissions(dest, fs::Permissions::from_mode(0o755));
   }
   Ok(())
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn entry_path_sanitization_table() {
      assert_eq!(sanitize_entry_path("../x"), None);
      assert_eq!(sanitize_entry_path("dir/../x"), None);
      assert_eq!(sanitize_entry_path("/abs/x"), None);
      assert_eq!(sanitize_entry_path("dir\\x"), Some("dir/x".into()));
      assert_eq!(sanitize_entry_path("./x"), Some("x".into()));
      assert_eq!(sanitize_entry_path("x"), Some("x".into()));
      assert_eq!(sanitize_entry_path(""), None);
      assert_eq!(sanitize_entry_path("."), None);
   }
}
