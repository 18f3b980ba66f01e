//! `axon update`: update the binary to the latest release.

use std::time::Duration;

use crate::{error::Result, update};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
   check: bool,
   dry_run: bool,
   repo: String,
   prerelease: bool,
   force: bool,
   timeout: Duration,
   verbose: bool,
) -> Result<()> {
   let opts = update::UpdateOptions { check, dry_run, repo, prerelease, force, timeout, verbose };
   update::run(&opts).await
}
