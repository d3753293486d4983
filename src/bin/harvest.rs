//! harvest CLI: dispatch a batch of fetches and print what came back in time.

use clap::{Parser, Subcommand};
use harvest::config::Config;
use harvest::dispatch::Dispatcher;
use harvest::error::Error;
use harvest::fetch::{FetchFn, HttpFetcher};
use harvest::model::{ResultSet, WorkItem};
use harvest::shutdown::Shutdown;
use harvest::telemetry::init_telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Bounded fan-out/fan-in dispatch under a deadline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a batch of ids from an HTTP endpoint
    Fetch {
        /// Item ids to fetch
        #[arg(required = true)]
        ids: Vec<String>,
        /// Stop collecting after this many milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,
        /// Override the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Dispatch synthetic workers with staggered latencies
    Simulate {
        /// Number of workers
        #[arg(long, default_value_t = 6)]
        items: usize,
        /// Stop collecting after this many milliseconds
        #[arg(long, default_value_t = 250)]
        deadline_ms: u64,
        /// Worker i takes (i + 1) times this many milliseconds
        #[arg(long, default_value_t = 75)]
        latency_step_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_telemetry(&config)?;

    match cli.command {
        Command::Fetch {
            ids,
            deadline_ms,
            base_url,
        } => {
            let base_url = base_url.unwrap_or_else(|| config.fetch_base_url.clone());
            let fetcher = HttpFetcher::new(base_url, config.fetch_timeout)?;
            let items: Vec<WorkItem> = ids.into_iter().map(WorkItem::from).collect();

            run_dispatch(
                Arc::new(Dispatcher::new(Arc::new(fetcher))),
                items,
                deadline_ms.map(Duration::from_millis),
            )
            .await
        }
        Command::Simulate {
            items,
            deadline_ms,
            latency_step_ms,
        } => {
            // Worker i sleeps (i + 1) * step, so a deadline between two
            // multiples splits the batch deterministically.
            let fetcher = FetchFn::new(move |item: WorkItem| async move {
                let rank: u64 = item.as_str().parse().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis((rank + 1) * latency_step_ms)).await;
                Ok::<_, Error>(serde_json::json!({ "id": item.as_str() }))
            });
            let items: Vec<WorkItem> = (0..items).map(|i| WorkItem::from(i.to_string())).collect();

            run_dispatch(
                Arc::new(Dispatcher::new(Arc::new(fetcher))),
                items,
                Some(Duration::from_millis(deadline_ms)),
            )
            .await
        }
    }
}

/// Run one dispatch to completion, or drain workers early on Ctrl-C.
async fn run_dispatch(
    dispatcher: Arc<Dispatcher>,
    items: Vec<WorkItem>,
    deadline: Option<Duration>,
) -> anyhow::Result<()> {
    tokio::select! {
        set = dispatcher.dispatch(items, deadline) => {
            print_results(&set);
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, draining workers");
            dispatcher.abort();

            let mut shutdown = Shutdown::new();
            let drained = Arc::clone(&dispatcher);
            shutdown.register("workers", async move {
                while drained.in_flight() > 0 {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            });
            shutdown.run(Duration::from_secs(1)).await?;
            Ok(())
        }
    }
}

fn print_results(set: &ResultSet) {
    if set.is_empty() {
        println!("No results arrived in time.");
    } else {
        println!("{:<10}  {:<10}  {:<8}  PAYLOAD", "ITEM", "ELAPSED", "AT");
        println!("{}", "-".repeat(72));

        for result in set.results() {
            let payload = if result.is_degraded() {
                "-".to_string()
            } else {
                result.payload.to_string()
            };
            let payload: String = payload.chars().take(40).collect();
            println!(
                "{:<10}  {:<10}  {:<8}  {}",
                result.item.as_str(),
                format!("{}ms", result.duration_ms),
                result.fetched_at.format("%H:%M:%S").to_string(),
                payload
            );
        }
    }

    println!(
        "\n{} of {} item(s) in {}ms ({:.1}% success rate){}",
        set.len(),
        set.submitted(),
        set.elapsed_ms(),
        set.success_rate(),
        if set.is_complete() {
            ""
        } else {
            ", deadline elapsed"
        }
    );
}
