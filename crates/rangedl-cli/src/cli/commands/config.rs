//! `rangedl config` – show the effective configuration.

use anyhow::Result;
use rangedl_core::config::{self, RangedlConfig};

pub fn run_config(cfg: &RangedlConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
