//! `config` command.

use docsession_config::{Config, Paths};

/// Print the effective configuration.
pub fn show_config(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    println!("# {}", paths.config_file().display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
