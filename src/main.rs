//! Main application entry point (CLI binary).
//!
//! A diagnostic shim around the `recon_mission` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Fetching one page and printing the technologies the matcher confirms
//!
//! Missions (probes and analysis) are driven through the library API.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

use recon_mission::config::Opt;
use recon_mission::initialization::{init_client, init_crypto_provider, init_logger_with};
use recon_mission::mission::{HttpPageSource, PageSource};
use recon_mission::{detect, Config, ProbeTarget, TechSignature};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the current directory, then next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    init_crypto_provider();

    match fingerprint_url(&opt).await {
        Ok(technologies) => {
            if opt.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&technologies)
                        .context("Failed to serialize technologies")?
                );
            } else {
                print_table(&technologies);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("recon_mission error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn fingerprint_url(opt: &Opt) -> Result<Vec<TechSignature>> {
    let target = ProbeTarget::parse(&opt.url).context("Invalid target URL")?;
    let config = Config::from(opt);
    let client = init_client(&config).context("Failed to initialize HTTP client")?;

    let page = HttpPageSource::new(client).fetch(&target.url).await?;
    log::info!("Fetched {} (HTTP {})", page.final_url, page.status);

    Ok(detect(Some(&page.body), Some(&page.headers)))
}

fn print_table(technologies: &[TechSignature]) {
    if technologies.is_empty() {
        println!("{}", "No technologies confirmed".yellow());
        return;
    }

    println!(
        "{:<20} {:<10} {:<12} {}",
        "TECHNOLOGY".bold(),
        "CATEGORY".bold(),
        "VERSION".bold(),
        "EVIDENCE".bold()
    );
    for tech in technologies {
        println!(
            "{:<20} {:<10} {:<12} {}",
            tech.name.green(),
            tech.category.to_string(),
            tech.version.as_deref().unwrap_or("-"),
            tech.evidence.dimmed()
        );
    }
}
