//! Build-time version information.
//!
//! The release workflow injects `AXON_VERSION`, `AXON_COMMIT` and
//! `AXON_BUILD_DATE` at compile time; development builds report "dev".

/// Version string embedded in the binary and compared during self-update.
pub const VERSION: &str = match option_env!("AXON_VERSION") {
   Some(v) => v,
   None => "dev",
};

pub const COMMIT: &str = match option_env!("AXON_COMMIT") {
   Some(v) => v,
   None => "",
};

pub const BUILD_DATE: &str = match option_env!("AXON_BUILD_DATE") {
   Some(v) => v,
   None => "",
};

/// Returns a value, or "n/a" when the build did not embed it.
pub fn or_na(s: &str) -> &str {
   if s.is_empty() { "n/a" } else { s }
}
