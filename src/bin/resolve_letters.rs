// src/bin/resolve_letters.rs - Resolves approval-letter locations for every generic application
use anyhow::{Context, Result};
use clap::Parser;
use exclusivity_lib::sources::drugs_fda::{DrugsFdaClient, DrugsFdaConfig};
use exclusivity_lib::sources::output::write_json;
use exclusivity_lib::sources::records::load_generics;
use exclusivity_lib::utils::env::load_env;
use exclusivity_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use exclusivity_lib::utils::progress_bars::progress_config::bar_style;
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout, Duration};

/// Look up approval letters for generic applications through the drug-application API
#[derive(Parser, Debug)]
#[command(name = "resolve_letters", version)]
struct Args {
    /// Generic application product table (.csv or .json)
    #[arg(long)]
    generics: PathBuf,

    /// Output JSON file mapping application numbers to letter URLs
    #[arg(long, default_value = "letter_urls.json")]
    output: PathBuf,

    /// Maximum simultaneous API requests
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Per-application timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Pause after each request, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Save the first letter of each application as <application>.pdf here
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

struct Lookup {
    application_number: String,
    urls: Vec<String>,
    downloaded: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    env_logger::init();
    let args = Args::parse();
    let logger = StageLogger::new(PipelineStage::Retrieval);

    let generics = load_generics(&args.generics)?;

    // One lookup per application; the first product's approval year ranks the letters
    let mut applications: BTreeMap<String, Option<i32>> = BTreeMap::new();
    for generic in &generics {
        let year = generic.approval_date.and_then(|d| d.year());
        applications
            .entry(generic.application_number.clone())
            .and_modify(|known| {
                if known.is_none() {
                    *known = year;
                }
            })
            .or_insert(year);
    }
    logger.log_start(&format!(
        "{} distinct applications, {} concurrent requests",
        applications.len(),
        args.concurrency
    ));

    if let Some(dir) = &args.download_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create download directory {}", dir.display()))?;
    }

    let client = Arc::new(DrugsFdaClient::new(&DrugsFdaConfig::from_env())?);
    let semaphore = Arc::new(Semaphore::new(args.concurrency.max(1)));
    let pb = ProgressBar::new(applications.len() as u64);
    pb.set_style(bar_style(
        "  🌐 [{elapsed_precise}] {bar:30.cyan/red} {pos}/{len} applications {msg}",
    ));

    let request_timeout = Duration::from_secs(args.timeout_secs);
    let delay = Duration::from_millis(args.delay_ms);

    let tasks = applications.into_iter().map(|(application_number, year)| {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let pb = pb.clone();
        let download_dir = args.download_dir.clone();
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();

            let lookup = client.resolve_letters(&application_number, year);
            let urls = match timeout(request_timeout, lookup).await {
                Ok(Ok(urls)) => urls,
                Ok(Err(e)) => {
                    warn!("Lookup failed for {}: {:#}", application_number, e);
                    Vec::new()
                }
                Err(_) => {
                    warn!("⏰ Lookup timed out for {}", application_number);
                    Vec::new()
                }
            };

            let mut downloaded = false;
            if let (Some(dir), Some(url)) = (&download_dir, urls.first()) {
                let destination = dir.join(format!("{}.pdf", application_number));
                match timeout(request_timeout, client.download(url, &destination)).await {
                    Ok(Ok(bytes)) => {
                        downloaded = true;
                        debug!("Saved {} ({} bytes)", destination.display(), bytes);
                    }
                    Ok(Err(e)) => warn!("Download failed for {}: {:#}", application_number, e),
                    Err(_) => warn!("⏰ Download timed out for {}", application_number),
                }
            }

            if !delay.is_zero() {
                sleep(delay).await;
            }
            pb.inc(1);
            Lookup {
                application_number,
                urls,
                downloaded,
            }
        })
    });

    let mut letters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut downloads = 0usize;
    for result in join_all(tasks).await {
        match result {
            Ok(lookup) => {
                if lookup.downloaded {
                    downloads += 1;
                }
                letters.insert(lookup.application_number, lookup.urls);
            }
            Err(e) => logger.log_error(&format!("Lookup task panicked: {}", e)),
        }
    }
    pb.finish_with_message("done");

    let found = letters.values().filter(|urls| !urls.is_empty()).count();
    logger.log_stage_result(letters.len(), found, "Applications with an approval letter");
    if args.download_dir.is_some() {
        info!("📄 Downloaded {} letters in {:.2?}", downloads, logger.get_elapsed());
    }

    write_json(&args.output, &letters)?;
    info!("💾 Wrote letter locations to {}", args.output.display());
    Ok(())
}
