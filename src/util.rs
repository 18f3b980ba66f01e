//! Utility functions for filesystem and formatting concerns.

use std::{fs, path::Path};

use crate::error::{Error, Result};

/// Formats a byte count as a human-readable size string.
pub fn format_size(bytes: u64) -> String {
   const KB: u64 = 1024;
   const MB: u64 = KB * 1024;
   const GB: u64 = MB * 1024;

   if bytes < KB {
      format!("{bytes} B")
   } else if bytes < MB {
      format!("{:.1} KB", bytes as f64 / KB as f64)
   } else if bytes < GB {
      format!("{:.1} MB", bytes as f64 / MB as f64)
   } else {
      format!("{:.1} GB", bytes as f64 / GB as f64)
   }
}

/// Truncates a string to at most `max` bytes, backing off to the previous
/// character boundary so multi-byte text never splits mid-character.
pub fn clip(s: &mut String, max: usize) {
   if s.len() <= max {
      return;
   }
   let mut end = max;
   while end > 0 && !s.is_char_boundary(end) {
      end -= 1;
   }
   s.truncate(end);
}

/// Copies a single file, overwriting the destination and preserving the
/// source's permission bits.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
   fs::copy(src, dst)
      .map(|_| ())
      .map_err(|e| Error::Fs { op: "cannot copy", path: dst.to_path_buf(), source: e })
}

/// Reports whether `dir` exists and contains at least one entry other than
/// repo bookkeeping (`.git`, `.gitignore`).
pub fn dir_has_content(dir: &Path) -> bool {
   let Ok(entries) = fs::read_dir(dir) else {
      return false;
   };
   for entry in entries.flatten() {
      let name = entry.file_name();
      if name != ".git" && name != ".gitignore" {
         return true;
      }
   }
   false
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn sizes_format_per_unit() {
      assert_eq!(format_size(512), "512 B");
      assert_eq!(format_size(2048), "2.0 KB");
      assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
   }

   #[test]
   fn bookkeeping_entries_do_not_count_as_content() {
      let tmp = tempfile::tempdir().unwrap();
      assert!(!dir_has_content(tmp.path()));
      fs::create_dir(tmp.path().join(".git")).unwrap();
      fs::write(tmp.path().join(".gitignore"), "x").unwrap();
      assert!(!dir_has_content(tmp.path()));
      fs::write(tmp.path().join("skill.md"), "x").unwrap();
      assert!(dir_has_content(tmp.path()));
   }
}
