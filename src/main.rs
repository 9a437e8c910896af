use clap::Parser;
use tracing_subscriber::EnvFilter;

use resq_teleop_runtime::config::DEFAULT_BUS_PORT;
use resq_teleop_runtime::runtime::{self, RunConfig};

/// Teleop control runtime for the competition robot
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Serial port for the actuator bus controller
    #[arg(long, default_value = DEFAULT_BUS_PORT)]
    port: String,

    /// Run the control loop without hardware attached
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let cfg = RunConfig {
        port: args.port,
        dry_run: args.dry_run,
    };

    if let Err(e) = runtime::run(cfg).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
