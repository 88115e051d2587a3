//! `brewmaint generate-zap` - suggest a `zap` stanza for a cask

use crate::api::BrewApi;
use crate::cask;
use crate::config::Config;
use crate::error::Result;
use crate::zap::{NO_ZAP_STANZA, ZapScanner, ZapStanza};
use clap::Args;
use colored::Colorize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Args)]
pub struct GenerateZapArgs {
    /// Application name, or a cask token with --cask
    pub name: String,

    /// Look up NAME as a cask and search for its app bundle name
    #[arg(long)]
    pub cask: bool,
}

pub async fn generate_zap(api: &BrewApi, config: &Config, args: &GenerateZapArgs) -> Result<()> {
    let app_name = if args.cask {
        let cask = api.fetch_cask(&args.name).await?;
        cask::app_search_name(&cask.token, &cask.artifacts)
    } else {
        args.name.clone()
    };

    println!(
        "{} Searching for files matching {}",
        "==>".bold().green(),
        app_name.bold()
    );

    let scanner = ZapScanner::new(&config.home, Path::new("/"));
    println!("{}", generate(&scanner, &app_name));
    Ok(())
}

/// The stanza for `app_name`, or a note that none is needed
pub fn generate(scanner: &ZapScanner, app_name: &str) -> String {
    let scan = scanner.scan(app_name);
    debug!(
        "Matched {} home and {} system paths",
        scan.trash.len(),
        scan.delete.len()
    );

    let stanza = ZapStanza::from_scan(scan, scanner.home());
    if stanza.is_empty() {
        NO_ZAP_STANZA.to_string()
    } else {
        stanza.to_string()
    }
}
