//! End-to-end harvest against scripted browser and HTTP fakes, writing a
//! real CSV file.

use rekhta_harvest::config::{Config, DiscoveryConfig, SiteConfig};
use rekhta_harvest::discovery::LinkDiscoveryEngine;
use rekhta_harvest::extract::VerseExtractor;
use rekhta_harvest::http_client::{RetryPolicy, RetryingClient};
use rekhta_harvest::pacing::NoDelay;
use rekhta_harvest::testing::{verse_page, ScriptedLauncher, ScriptedSurface, ScriptedTransport};
use rekhta_harvest::{CsvDataset, Harvester, MemoryDataset};

const FIRST: &str =
    "https://www.rekhta.org/ghazals/ab-jo-ik-hasrat-e-javaani-hai-jaun-eliya-ghazals?lang=hi";
const SECOND: &str =
    "https://www.rekhta.org/ghazals/umr-guzregi-imtihan-mein-kya-jaun-eliya-ghazals?lang=hi";

const LINES: [&str; 3] = [
    "अब जो इक हसरत-ए-जवानी है",
    "उम्र-ए-रफ़्ता की ये निशानी है",
    "ख़ून-ए-दिल में तो ऊँगली डुबो",
];

/// Catalog that lazily reveals the second link, with media controls and a
/// duplicate mixed in.
fn catalog() -> ScriptedSurface {
    let first_page = r#"<html><body>
        <a href="/ghazals/ab-jo-ik-hasrat-e-javaani-hai-jaun-eliya-ghazals">Ab jo ik hasrat</a>
        <a class="rico-audio" href="/ghazals/ab-jo-ik-hasrat-e-javaani-hai-jaun-eliya-ghazals">Listen</a>
        <a href="/poets/jaun-eliya/profile">Profile</a>
        </body></html>"#
        .to_string();
    let second_page = format!(
        r#"<html><body>
        <a href="{first}">Ab jo ik hasrat</a>
        <a href="/ghazals/umr-guzregi-imtihan-mein-kya-jaun-eliya-ghazals">Umr guzregi</a>
        <a class="favorite" href="/ghazals/umr-guzregi-imtihan-mein-kya-jaun-eliya-ghazals">Fav</a>
        </body></html>"#,
        first = FIRST
    );
    ScriptedSurface::new(vec![1200, 2400, 3600, 3600, 3600, 3600], vec![first_page, second_page])
}

fn transport() -> ScriptedTransport {
    ScriptedTransport::new()
        .status(FIRST, 503)
        .ok(FIRST, &verse_page(&LINES))
        .ok(SECOND, &verse_page(&["Read the full ghazal on Rekhta"]))
}

fn harvester(
    launcher: ScriptedLauncher,
    transport: ScriptedTransport,
) -> Harvester<ScriptedLauncher, ScriptedTransport, NoDelay> {
    let config = Config::default();
    let engine = LinkDiscoveryEngine::new(
        launcher,
        SiteConfig::default(),
        DiscoveryConfig {
            initial_settle_ms: 0,
            settle_ms: 0,
            ..DiscoveryConfig::default()
        },
    )
    .unwrap();
    let client = RetryingClient::new(transport, RetryPolicy::from_config(&config.http).without_delay());
    let extractor = VerseExtractor::from_config(client, &config).unwrap();
    Harvester::new(engine, extractor, NoDelay)
}

#[tokio::test]
async fn harvest_jaun_eliya_into_memory() {
    let launcher = ScriptedLauncher::new(catalog());
    let h = harvester(launcher.clone(), transport());

    let mut dataset = MemoryDataset::new();
    let summary = h.run("Jaun Eliya", &mut dataset).await.unwrap();

    assert_eq!(summary.total_links, 2);
    assert_eq!(summary.successes, 1);
    assert_eq!(summary.skipped(), 1);

    assert_eq!(dataset.records.len(), 1);
    let record = &dataset.records[0];
    assert_eq!(record.author, "jaun-eliya");
    assert_eq!(record.body, LINES.join("\n"));
    assert_eq!(record.source, FIRST);

    let log = launcher.log();
    assert_eq!(
        log.navigated,
        vec!["https://www.rekhta.org/poets/jaun-eliya/ghazals?lang=hi".to_string()]
    );
    assert!(log.closed);
    assert_eq!(h.extractor().client().transport().calls(FIRST), 2);
    assert_eq!(h.extractor().client().transport().calls(SECOND), 1);
}

#[tokio::test]
async fn harvest_writes_csv_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let h = harvester(ScriptedLauncher::new(catalog()), transport());

    let mut dataset = CsvDataset::new(dir.path());
    let summary = h.run("  JAUN  eliya", &mut dataset).await.unwrap();
    assert_eq!(summary.successes, 1);

    let path = dir.path().join("jaun-eliya_dataset.csv");
    assert_eq!(dataset.path(), Some(path.as_path()));

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["Poet", "Ghazal", "URL"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "jaun-eliya");
    assert_eq!(&rows[0][1], LINES.join("\n"));
    assert_eq!(&rows[0][2], FIRST);
}

#[tokio::test]
async fn browser_failure_produces_no_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let h = harvester(ScriptedLauncher::failing("chrome missing"), ScriptedTransport::new());

    let mut dataset = CsvDataset::new(dir.path());
    let summary = h.run("Jaun Eliya", &mut dataset).await.unwrap();

    assert_eq!(summary.total_links, 0);
    assert!(dataset.path().is_none());
    assert!(!dir.path().join("jaun-eliya_dataset.csv").exists());
}
