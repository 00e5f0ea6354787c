//! List command - show the chains under a location.

use anyhow::Result;
use chainwarden_audit::{BlobChainStorage, ChainStorage, discover_chains};
use chainwarden_config::Config;
use colored::Colorize;

use crate::location::{self, Location};
use crate::theme::Theme;

/// List chains under `raw` with their declared lengths.
pub(crate) async fn list_chains(raw: &str, cfg: &Config) -> Result<()> {
    let opened = location::open(&Location::parse(raw, &cfg.backend)?, &cfg.backend)?;
    let roots = discover_chains(opened.backend.as_ref(), &opened.root).await?;

    if roots.is_empty() {
        println!("{}", Theme::info(&format!("No chains under {raw}")));
        return Ok(());
    }

    println!("\n{}", Theme::header("Audit Chains"));
    println!(
        "{:<24} {:>10} {:>8}  {}",
        "CHAIN".dimmed(),
        "ENTRIES".dimmed(),
        "HASH".dimmed(),
        "ROOT".dimmed()
    );
    println!("{}", Theme::separator());

    for root in roots {
        let storage = BlobChainStorage::new(std::sync::Arc::clone(&opened.backend), &root);
        match storage.load_manifest().await {
            Ok(manifest) => println!(
                "{:<24} {:>10} {:>8}  {}",
                manifest.chain_id.cyan(),
                manifest.declared_length,
                manifest.hash_algorithm.as_str(),
                Theme::dimmed(&storage.location())
            ),
            Err(e) => println!(
                "{}",
                Theme::warning(&format!("{}: {e}", storage.location()))
            ),
        }
    }

    println!();
    Ok(())
}
