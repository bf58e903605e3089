//! One-off probe: `probe page.html` runs the extractor over a saved page,
//! `probe` with no argument does a single live fetch with the configured
//! strategy and prints the JSON payload.

use raised_tracker::{
    api::fetch_and_extract, extract, fetch, logging, respond::Responder, PageContent,
    TrackerConfig,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init();

    match run(std::env::args().nth(1)).await {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("probe failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(file: Option<String>) -> anyhow::Result<String> {
    let cfg = TrackerConfig::load()?;

    if let Some(path) = file {
        let html = std::fs::read_to_string(&path)?;
        let found = extract(&PageContent::from_html(html), &cfg.policy())?;
        return Ok(format!("{path}: {} via {}", found.value, found.method));
    }

    let fetcher = fetch::from_config(&cfg)?;
    let found = fetch_and_extract(fetcher.as_ref(), &cfg.policy()).await?;
    let responder = Responder::new(cfg.goal, cfg.campaign_url.clone(), cfg.cache_control());
    let reply = responder.resolve(Ok(found));
    match reply {
        raised_tracker::Reply::Fresh { payload, .. } => Ok(serde_json::to_string_pretty(&payload)?),
        other => anyhow::bail!("unexpected reply status {}", other.status()),
    }
}
