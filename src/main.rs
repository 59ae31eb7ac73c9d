//! Command-line driver for link arbitration on a page fixture.
//!
//! # Usage
//!
//! ```bash
//! # Register the fixture's vendors, scan once and print every decision
//! link-arbiter --page page.json scan
//!
//! # Scan, then simulate an activation of link 2
//! link-arbiter --page page.json click --link 2
//!
//! # Context-menu activation
//! link-arbiter --page page.json click --link 2 --action open-context-menu
//! ```
//!
//! # Environment Variables
//!
//! See [`link_arbiter::config`]. With `CLASSIFIER_URL` unset every vendor
//! answers from the merchant list declared in the fixture.

use link_arbiter::config::{self, Config};
use link_arbiter::domain::activation::{ActionClass, LinkActivation};
use link_arbiter::domain::entities::{LinkId, ReplacementLookup};
use link_arbiter::domain::ports::{ClassificationBackend, Page};
use link_arbiter::infrastructure::classifier::{
    HttpClassificationBackend, StaticClassificationBackend,
};
use link_arbiter::infrastructure::page::{InMemoryPage, PageFixture, VendorFixture};
use link_arbiter::prelude::{
    Arbitration, DomainResolutionCache, LinkRewriterOptions, ResolverOptions, RewriterCoordinator,
};
use link_arbiter::utils::waypoint::WaypointUrlBuilder;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Multi-vendor link rewriting arbiter.
#[derive(Parser)]
#[command(name = "link-arbiter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON page fixture (url, priority, vendors, links)
    #[arg(short, long)]
    page: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the page and print each vendor's decisions
    Scan,
    /// Scan the page, then arbitrate one link activation
    Click {
        /// Link id (position in the fixture's link list)
        #[arg(short, long)]
        link: u64,

        /// Action class of the activation
        #[arg(short, long, default_value = "navigate-outbound")]
        action: ActionClass,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = config::load_from_env().context("Invalid configuration")?;
    init_tracing(&config);
    config.print_summary();

    let raw = std::fs::read_to_string(&cli.page)
        .with_context(|| format!("Failed to read page fixture {}", cli.page.display()))?;
    let fixture = PageFixture::from_json(&raw)
        .with_context(|| format!("Invalid page fixture {}", cli.page.display()))?;

    let page = Arc::new(InMemoryPage::from_fixture(&fixture));
    let coordinator = build_coordinator(&config, &fixture, Arc::clone(&page))?;

    scan(&coordinator).await;

    match cli.command {
        Commands::Scan => print_decisions(&coordinator, &page),
        Commands::Click { link, action } => {
            click(&coordinator, &page, LinkId::new(link), action, config.restore_delay()).await
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Registers one rewriter per fixture vendor.
fn build_coordinator(
    config: &Config,
    fixture: &PageFixture,
    page: Arc<InMemoryPage>,
) -> Result<RewriterCoordinator> {
    let declaration = fixture
        .priority
        .clone()
        .or_else(|| config.link_priority.clone())
        .unwrap_or_default();

    let mut coordinator = RewriterCoordinator::from_declaration(page, &declaration);

    for vendor in &fixture.vendors {
        let cache = resolution_cache(config, fixture, vendor)?;
        let options = LinkRewriterOptions {
            link_selector: vendor.selector.clone(),
            restore_delay: config.restore_delay(),
            ..LinkRewriterOptions::default()
        };
        coordinator.register_rewriter(vendor.name.clone(), cache, options)?;
    }

    Ok(coordinator)
}

fn resolution_cache(
    config: &Config,
    fixture: &PageFixture,
    vendor: &VendorFixture,
) -> Result<DomainResolutionCache> {
    let backend: Arc<dyn ClassificationBackend> = match &config.classifier_url {
        Some(url) => Arc::new(HttpClassificationBackend::new(url, config.request_timeout())?),
        None => Arc::new(StaticClassificationBackend::new(&vendor.merchants)),
    };

    let waypoint = WaypointUrlBuilder::new(&config.waypoint_url, config.account_id.clone())
        .context("Invalid WAYPOINT_URL")?
        .with_page_url(fixture.url.clone());

    let options = ResolverOptions {
        account_id: config.account_id.clone(),
        page_url: fixture.url.clone(),
        excluded_domains: config.excluded_domains.clone(),
        retry_failed_domains: config.retry_failed_domains,
    };

    let vendor_name = vendor.name.clone();
    Ok(
        DomainResolutionCache::new(backend, waypoint, options).with_response_callback(
            move |response| {
                if !response.extra.is_empty() {
                    tracing::debug!(vendor = %vendor_name, extra = ?response.extra, "Backend extras");
                }
            },
        ),
    )
}

/// Runs one content-change fan-out and waits for every asynchronous phase.
async fn scan(coordinator: &RewriterCoordinator) {
    for scan in coordinator.on_content_changed() {
        let outcome = match scan.result {
            Ok(handle) => handle.settled().await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            println!(
                "{} {}: {}",
                "✗".red(),
                scan.vendor.bright_white().bold(),
                e.to_string().red()
            );
        }
    }
}

fn print_decisions(coordinator: &RewriterCoordinator, page: &InMemoryPage) {
    for rewriter in coordinator.rewriters() {
        println!();
        println!(
            "{} {}",
            rewriter.name().bright_blue().bold(),
            format!("({})", rewriter.link_selector()).bright_black()
        );

        let mut watched = 0;
        for index in 0..page.len() as u64 {
            let link = LinkId::new(index);
            let href = page.href(link).unwrap_or_default();

            let decision = match rewriter.get_replacement_url(link) {
                ReplacementLookup::NotWatched => continue,
                ReplacementLookup::Pending => "pending".yellow(),
                ReplacementLookup::Unchanged => "unchanged".bright_black(),
                ReplacementLookup::Replace(url) => url.green(),
            };

            watched += 1;
            println!("  {:>4}  {}", index.to_string().cyan(), href);
            println!("        → {}", decision);
        }

        if watched == 0 {
            println!("  {}", "No watched links".yellow());
        }
    }
    println!();
}

async fn click(
    coordinator: &RewriterCoordinator,
    page: &InMemoryPage,
    link: LinkId,
    action: ActionClass,
    restore_delay: Duration,
) {
    let original = page.href(link);

    match coordinator.on_link_activation(&LinkActivation::new(link, action)) {
        Arbitration::Ignored => {
            println!("{} {} is not arbitrated", "•".bright_black(), action.to_string().cyan());
        }
        Arbitration::NotReplaced => {
            println!("{} No vendor replaced {}", "•".yellow(), link.to_string().cyan());
        }
        Arbitration::Replaced { vendor } => {
            println!(
                "{} {} replaced by {}",
                "✓".green(),
                link.to_string().cyan(),
                vendor.green().bold()
            );
            println!("  Navigates to: {}", page.href(link).unwrap_or_default().bright_white());

            tokio::time::sleep(restore_delay + Duration::from_millis(10)).await;

            let restored = page.href(link) == original;
            println!(
                "  Restored:     {}",
                if restored { "yes".green() } else { "no".red() }
            );
        }
    }
}
