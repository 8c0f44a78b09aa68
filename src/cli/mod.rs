//! Command-line interface.

mod progress;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use console::style;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::dataset::CsvDataset;
use crate::harvest::{HarvestEvent, Harvester};
use crate::shutdown::Shutdown;

#[derive(Parser)]
#[command(name = "rekhta-harvest")]
#[command(about = "Harvest a poet's ghazals from Rekhta into a CSV dataset")]
#[command(version)]
pub struct Cli {
    /// Poet name, e.g. "Jaun Eliya" (prompted for if omitted)
    poet: Option<String>,

    /// Catalog section to harvest
    #[arg(long)]
    content_type: Option<String>,

    /// Locale (lang query parameter): hi, ur or en
    #[arg(long)]
    lang: Option<String>,

    /// Directory for the dataset file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Config file (otherwise discovered as rekhta-harvest.{toml,yaml,json})
    #[arg(short, long, env = "REKHTA_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Stop discovery after this many links
    #[arg(long)]
    max_links: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

impl Cli {
    /// Layer command-line flags over the loaded config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(ref content_type) = self.content_type {
            config.site.content_type = content_type.clone();
        }
        if let Some(ref lang) = self.lang {
            config.site.locale = lang.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output.dir = Some(dir.to_string_lossy().into_owned());
        }
        if let Some(max_links) = self.max_links {
            config.discovery.max_links = max_links;
        }
        if self.no_headless {
            config.browser.headless = false;
        }
        config
    }
}

fn prompt_poet() -> io::Result<String> {
    print!("Enter Poet Name (e.g. 'Jaun Eliya'): ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.apply(
        Config::load(cli.config.as_deref())
            .await
            .context("Failed to load configuration")?,
    );
    config.validate()?;
    if let Some(ref path) = config.source_path {
        tracing::info!("Using config {}", path.display());
    }

    let poet = match cli.poet {
        Some(ref poet) => poet.clone(),
        None => prompt_poet().context("Failed to read poet name")?,
    };
    if poet.trim().is_empty() {
        return Ok(());
    }

    let (trigger, shutdown) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            trigger.trigger();
        }
    });

    let (event_tx, event_rx) = mpsc::channel::<HarvestEvent>(100);
    let renderer = tokio::spawn(progress::render_events(event_rx));

    let harvester = Harvester::from_config(&config, shutdown)?.with_events(event_tx);
    let mut dataset = CsvDataset::new(config.output_dir());
    let result = harvester.run(&poet, &mut dataset).await;

    // Closes the event channel so the renderer can finish.
    drop(harvester);
    if let Err(e) = renderer.await {
        warn!("Progress renderer failed: {}", e);
    }

    let summary = result?;
    if summary.total_links == 0 {
        println!("{} No links found for {}", style("!").yellow(), poet.trim());
        return Ok(());
    }

    progress::print_summary(&summary, dataset.path());
    Ok(())
}
