use clap::Parser;
use hotel_bookings::config::{RuntimeConfig, SimulationConfig};
use hotel_bookings::domain::ports::ProcessStoreBox;
use hotel_bookings::infrastructure::in_memory::InMemoryProcessStore;
#[cfg(feature = "storage-rocksdb")]
use hotel_bookings::infrastructure::rocksdb::RocksDBProcessStore;
use hotel_bookings::infrastructure::simulated_hotel::SimulatedHotel;
use hotel_bookings::interfaces::csv::report_writer::ReportWriter;
use hotel_bookings::interfaces::demo::{self, DemoOptions};
use hotel_bookings::runtime::Runtime;
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Books a batch of hotel rooms, waits, then checks every guest in.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of bookings to run concurrently
    #[arg(long, default_value_t = 10)]
    count: usize,

    /// Seconds to wait after the bookings are confirmed before checking everyone in
    #[arg(long, default_value_t = 15)]
    check_in_after: u64,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// One in this many hotel API calls fails (0 disables failures)
    #[arg(long, default_value_t = 3)]
    failure_one_in: u32,

    /// Simulated latency of a reservation, in milliseconds
    #[arg(long, default_value_t = 1000)]
    reserve_latency_ms: u64,

    /// Simulated latency of a payment, in milliseconds
    #[arg(long, default_value_t = 5000)]
    payment_latency_ms: u64,

    /// Overall deadline for each hotel API call in seconds, retries included
    #[arg(long, default_value_t = 60)]
    activity_timeout: u64,
}

impl Cli {
    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            activity_timeout: Duration::from_secs(self.activity_timeout),
            ..RuntimeConfig::default()
        }
    }

    fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            reserve_latency: Duration::from_millis(self.reserve_latency_ms),
            payment_latency: Duration::from_millis(self.payment_latency_ms),
            failure_one_in: self.failure_one_in,
        }
    }

    fn demo_options(&self) -> DemoOptions {
        DemoOptions {
            count: self.count,
            check_in_after: Duration::from_secs(self.check_in_after),
        }
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<ProcessStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBProcessStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryProcessStore::new()))
        }
        None => Ok(Box::new(InMemoryProcessStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = open_store(cli.db_path.clone())?;
    let runtime = Runtime::builder()
        .store(store)
        .activities(Arc::new(SimulatedHotel::from_config(&cli.simulation_config())))
        .config(cli.runtime_config())
        .build();

    // Resume anything a previous run left unfinished
    runtime.recover().await.into_diagnostic()?;

    let report = demo::run(&runtime, &cli.demo_options())
        .await
        .into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    info!("Everyone checked-in - have a lovely stay");
    Ok(())
}
