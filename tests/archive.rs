use std::{fs, io::Write, path::Path};

use axon::update::{
   archive::{extract_binary, wanted_binary_name},
   file_sha256_hex,
   github::parse_expected_sha256,
};
use flate2::{Compression, write::GzEncoder};

fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
   let file = fs::File::create(path).unwrap();
   let encoder = GzEncoder::new(file, Compression::default());
   let mut builder = tar::Builder::new(encoder);
   for (name, data) in entries {
      let mut header = tar::Header::new_gnu();
      header.set_size(data.len() as u64);
      header.set_mode(0o755);
      header.set_cksum();
      builder.append_data(&mut header, name, *data).unwrap();
   }
   builder.into_inner().unwrap().finish().unwrap();
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
   let file = fs::File::create(path).unwrap();
   let mut zip = zip::ZipWriter::new(file);
   for (name, data) in entries {
      zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
      zip.write_all(data).unwrap();
   }
   zip.finish().unwrap();
}

#[test]
fn tar_gz_extraction_picks_only_the_binary() {
   let tmp = tempfile::tempdir().unwrap();
   let archive = tmp.path().join("axon_0.1.9_linux_amd64.tar.gz");
   let want = wanted_binary_name();
   write_tar_gz(
      &archive,
      &[
         ("README.md", b"docs".as_slice()),
         (&format!("dist/{want}"), b"#!binary payload".as_slice()),
      ],
   );

   let dest = tmp.path().join("axon.new");
   extract_binary(&archive, &dest).unwrap();
   assert_eq!(fs::read(&dest).unwrap(), b"#!binary payload");
   assert!(!tmp.path().join("README.md").exists(), "other entries are ignored");

   #[cfg(unix)]
   {
      use std::os::unix::fs::PermissionsExt;
      let mode = fs::metadata(&dest).unwrap().permissions().mode();
      assert_ne!(mode & 0o111, 0, "extracted binary is executable");
   }
}

#[test]
fn zip_extraction_picks_only_the_binary() {
   let tmp = tempfile::tempdir().unwrap();
   let archive = tmp.path().join("axon_0.1.9_windows_amd64.zip");
   let want = wanted_binary_name();
   write_zip(
      &archive,
      &[("LICENSE", b"text".as_slice()), (&format!("dist/{want}"), b"zip payload".as_slice())],
   );

   let dest = tmp.path().join("axon.new");
   extract_binary(&archive, &dest).unwrap();
   assert_eq!(fs::read(&dest).unwrap(), b"zip payload");
}

#[test]
fn missing_binary_is_an_error() {
   let tmp = tempfile::tempdir().unwrap();
   let archive = tmp.path().join("axon_0.1.9_linux_amd64.tar.gz");
   write_tar_gz(&archive, &[("README.md", b"docs".as_slice())]);

   let err = extract_binary(&archive, &tmp.path().join("axon.new")).unwrap_err();
   assert!(err.to_string().contains("not found in archive"), "got: {err}");
}

#[test]
fn traversal_entry_naming_the_binary_refuses_install() {
   let tmp = tempfile::tempdir().unwrap();
   let archive = tmp.path().join("axon_0.1.9_linux_amd64.tar.gz");
   let want = wanted_binary_name();
   write_tar_gz(
      &archive,
      &[
         (&format!("..\\{want}"), b"evil".as_slice()),
         (&format!("dist/{want}"), b"good".as_slice()),
      ],
   );

   let dest = tmp.path().join("axon.new");
   let err = extract_binary(&archive, &dest).unwrap_err();
   assert!(err.to_string().contains("unsafe archive entry"), "got: {err}");
   assert!(!dest.exists(), "nothing extracted from a hostile archive");
}

#[test]
fn unrelated_unsafe_entries_are_ignored() {
   let tmp = tempfile::tempdir().unwrap();
   let archive = tmp.path().join("axon_0.1.9_linux_amd64.tar.gz");
   let want = wanted_binary_name();
   write_tar_gz(
      &archive,
      &[
         ("..\\README.md", b"stray".as_slice()),
         (&format!("dist/{want}"), b"good".as_slice()),
      ],
   );

   let dest = tmp.path().join("axon.new");
   extract_binary(&archive, &dest).unwrap();
   assert_eq!(fs::read(&dest).unwrap(), b"good");
}

#[test]
fn checksum_verification_round_trip() {
   let tmp = tempfile::tempdir().unwrap();
   let asset = tmp.path().join("axon_0.1.9_linux_amd64.tar.gz");
   fs::write(&asset, b"archive bytes").unwrap();

   let digest = file_sha256_hex(&asset).unwrap();
   let manifest = format!(
      "{digest} axon_0.1.9_linux_amd64.tar.gz\n{} other.zip\n",
      "0".repeat(64)
   );

   let expected = parse_expected_sha256(&manifest, "axon_0.1.9_linux_amd64.tar.gz").unwrap();
   assert!(expected.eq_ignore_ascii_case(&digest));
   assert!(parse_expected_sha256(&manifest, "absent.tar.gz").is_err());
}
