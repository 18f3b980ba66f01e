//! `axon version`: full build information.

use crate::version;

pub fn execute() {
   println!("Version:      {}", version::VERSION);
   println!("Commit:       {}", version::or_na(version::COMMIT));
   println!("Build Date:   {}", version::or_na(version::BUILD_DATE));
   println!("Rust Version: {}", rustc_version_runtime::version());
   println!("OS/Arch:      {}/{}", std::env::consts::OS, std::env::consts::ARCH);
}
