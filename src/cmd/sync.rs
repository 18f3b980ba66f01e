//! `axon sync`: synchronize the hub with its remote.

use crate::{config::Config, error::Result, git, sync};

pub fn execute() -> Result<()> {
   git::ensure_available()?;
   let cfg = Config::load()?;
   sync::sync(&cfg)
}
