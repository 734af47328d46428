//! Kakuyaku - Japanese part-of-speech highlighter
//!
//! Opens a page in an in-process tab, selects text, and activates the
//! highlight menu entry against it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use kakuyaku::analysis::AnalysisClient;
use kakuyaku::background::Background;
use kakuyaku::config::Config;
use kakuyaku::dom::Document;
use kakuyaku::host::TabHost;
use kakuyaku::page::read_document;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SAMPLE_PAGE: &[&str] = &["今日は京都へ行きます。", "京都の寺はとても美しい。"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page to open, one paragraph per line (built-in sample if omitted)
    #[arg(short, long)]
    page: Option<PathBuf>,

    /// Text to select before activating the menu entry
    #[arg(short, long)]
    select: String,

    /// Do not run the agent script in the page
    #[arg(long)]
    no_agent: bool,

    /// Drop the live selection before the highlight runs
    #[arg(long)]
    deselect: bool,

    /// Analysis service base URL (overrides config)
    #[arg(long)]
    api: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(api) = args.api.clone() {
        config.analysis_url = api;
    }
    config.validate()?;

    // Setup logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🈁 Kakuyaku v{} starting...", env!("CARGO_PKG_VERSION"));

    let (url, document) = match &args.page {
        Some(path) => {
            let document = read_document(path)
                .with_context(|| format!("reading page {}", path.display()))?;
            (format!("file://{}", path.display()), document)
        }
        None => ("about:sample".to_string(), Document::from_paragraphs(SAMPLE_PAGE.iter().copied())),
    };

    let (host, mut events) = TabHost::new();
    let host = Arc::new(host);
    debug!("Registered menu entry: {:?}", host.menu());

    let analyzer = Arc::new(AnalysisClient::from_config(&config));
    info!("🔤 Analysis service at {}", analyzer.endpoint());
    let background = Background::new(&config, host.clone(), analyzer);

    let tab = host.open(&url, document);
    if !args.no_agent {
        host.load_agent(tab).await?;
    }

    if !host.select(tab, &args.select).await? {
        bail!("\"{}\" does not occur in a single text node of the page", args.select);
    }
    if !host.click_menu(tab).await? {
        bail!("menu entry unavailable: nothing selected");
    }
    if args.deselect {
        host.clear_selection(tab)?;
    }

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        if let Some(activation) = background.dispatch(event) {
            outcome = Some(activation.await?);
            break;
        }
    }
    let Some(outcome) = outcome else {
        bail!("host event stream closed before the activation ran");
    };

    let snapshot = host.snapshot(tab).await?;
    info!("✅ {:?}: {} spans on {}", outcome, snapshot.spans, snapshot.url);
    for notice in &snapshot.notices {
        warn!("🔔 {}", notice);
    }
    println!("{}", snapshot.html);

    host.close(tab);
    Ok(())
}
