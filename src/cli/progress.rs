//! Terminal progress for a harvest run.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::harvest::HarvestEvent;
use crate::models::HarvestSummary;

/// Drain harvest events into a spinner, then a progress bar.
pub async fn render_events(mut rx: mpsc::Receiver<HarvestEvent>) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            HarvestEvent::DiscoveryStarted { author, catalog_url } => {
                spinner.enable_steady_tick(std::time::Duration::from_millis(120));
                spinner.set_message(format!("Discovering ghazals for {} ({})", author, catalog_url));
            }
            HarvestEvent::DiscoveryFinished {
                links,
                cycles,
                reason,
            } => {
                spinner.finish_and_clear();
                println!(
                    "{} Found {} links in {} scroll cycles ({})",
                    style("✓").green(),
                    links,
                    cycles,
                    reason
                );
                if links > 0 {
                    let pb = ProgressBar::new(links as u64);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_bar())
                            .progress_chars("█▓░"),
                    );
                    bar = Some(pb);
                }
            }
            HarvestEvent::ItemStarted { url, .. } => {
                if let Some(ref pb) = bar {
                    pb.set_message(url);
                }
            }
            HarvestEvent::ItemSaved { .. } => {
                if let Some(ref pb) = bar {
                    pb.inc(1);
                }
            }
            HarvestEvent::ItemSkipped { url, reason, .. } => {
                if let Some(ref pb) = bar {
                    pb.println(format!("  {} {} ({})", style("→").dim(), url, reason));
                    pb.inc(1);
                }
            }
            HarvestEvent::Finished(_) => break,
        }
    }

    spinner.finish_and_clear();
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
}

/// Print the end-of-run summary.
pub fn print_summary(summary: &HarvestSummary, output: Option<&std::path::Path>) {
    println!("\n{}", style("Harvest Summary").bold());
    println!("  Total links:  {}", summary.total_links);
    println!("  Saved:        {}", style(summary.successes).green());
    if summary.skipped_empty > 0 {
        println!("  No verses:    {}", style(summary.skipped_empty).yellow());
    }
    if summary.skipped_unavailable > 0 {
        println!("  Unavailable:  {}", style(summary.skipped_unavailable).red());
    }
    if let Some(path) = output {
        println!("  Dataset:      {}", path.display());
    }
    if summary.interrupted {
        println!("{} Interrupted before all links were processed", style("!").yellow());
    }
}
