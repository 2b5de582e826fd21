use anyhow::Context;
use clap::{Parser, Subcommand};
use feed_notifier::monitor::DEFAULT_RECENT_LIMIT;
use feed_notifier::{
    format_recent, AddSourceOutcome, Deliver, FeedMonitor, HttpDelivery, LogDelivery, Notifier,
    Recipient, RssFeedSource, Settings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Watches RSS/Atom feeds and notifies subscribers about new posts
#[derive(Parser, Debug)]
#[command(name = "feed-notifier", version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll feeds on the configured interval until interrupted
    Run,
    /// Check all feeds once and notify recipients of new posts
    Check,
    /// List monitored feeds
    Feeds,
    /// Start monitoring a feed
    Add { url: String },
    /// Stop monitoring a feed
    Remove { url: String },
    /// Show the latest posts across all feeds
    List {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Subscribe a recipient to notifications
    Register { recipient: String },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn build_monitor(settings: &Settings) -> anyhow::Result<FeedMonitor> {
    let source = RssFeedSource::new(settings.fetch_config())
        .context("Failed to create HTTP client for feeds")?;

    let transport: Arc<dyn Deliver> = match &settings.delivery_endpoint {
        Some(endpoint) => Arc::new(
            HttpDelivery::new(endpoint.clone(), Duration::from_secs(settings.fetch_timeout))
                .context("Failed to create HTTP client for delivery")?,
        ),
        None => {
            info!("No delivery endpoint configured, notifications go to the log");
            Arc::new(LogDelivery)
        }
    };

    Ok(FeedMonitor::load(
        settings.state_store(),
        Arc::new(source),
        Notifier::new(transport),
        settings.monitor_options(),
    )
    .await)
}

async fn run_scheduler(monitor: Arc<FeedMonitor>, settings: &Settings) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = settings.scheduler().spawn(Arc::clone(&monitor), shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(true);
    handle.await.context("Scheduler task panicked")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    cli.settings.validate()?;
    info!("Starting Feed Notifier (state file: {})", cli.settings.data_file.display());

    let monitor = Arc::new(build_monitor(&cli.settings).await?);

    match cli.command {
        Command::Run => run_scheduler(monitor, &cli.settings).await?,

        Command::Check => {
            let report = monitor.check_now().await;
            for message in &report.messages {
                println!("{}\n", message);
            }
            if report.new_item_count() == 0 {
                println!("No new posts found.");
            } else {
                println!("Found {} new post(s)!", report.new_item_count());
            }
            if !report.failed_sources.is_empty() {
                println!("Could not fetch: {}", report.failed_sources.join(", "));
            }
        }

        Command::Feeds => {
            let feeds = monitor.list_sources().await;
            if feeds.is_empty() {
                println!("No RSS feeds are being monitored.");
            } else {
                println!("Monitored RSS Feeds:\n");
                for (i, feed) in feeds.iter().enumerate() {
                    println!("{}. {}", i + 1, feed);
                }
            }
        }

        Command::Add { url } => match monitor.add_source(&url).await {
            Ok(AddSourceOutcome::Added { existing_items }) => {
                println!("Successfully added feed!");
                println!("Found {} existing posts.", existing_items);
                println!("You'll be notified of new posts from now on.");
            }
            Ok(AddSourceOutcome::AlreadyExists) => {
                println!("This feed is already being monitored.");
            }
            Err(e) => {
                error!("Failed to add feed {}: {}", url, e);
                anyhow::bail!("Could not fetch the RSS feed. Please check the URL and try again.");
            }
        },

        Command::Remove { url } => {
            if monitor.remove_source(&url).await {
                println!("Removed feed: {}", url);
            } else {
                println!("This feed is not being monitored.");
            }
        }

        Command::List { limit } => {
            if monitor.list_sources().await.is_empty() {
                println!("No RSS feeds are being monitored.");
            } else {
                let recent = monitor.list_recent(limit).await;
                if recent.is_empty() {
                    println!("No posts found in any feed.");
                } else {
                    println!("{}", format_recent(&recent));
                }
            }
        }

        Command::Register { recipient } => {
            if monitor.register_recipient(Recipient::new(recipient.clone())).await {
                println!("Registered {}.", recipient);
            } else {
                println!("{} is already registered.", recipient);
            }
            println!(
                "Currently monitoring {} feed(s)",
                monitor.list_sources().await.len()
            );
        }
    }

    Ok(())
}
