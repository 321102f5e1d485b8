use anyhow::{Context, Result};
use clap::Parser;
use playmacro::{AmcpConnection, RunContext, RunController};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "playmacro",
    about = "Replay macro scripts against a broadcast playout server",
    version
)]
struct Args {
    /// Playout server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Playout server port
    #[arg(long, default_value_t = 5250)]
    port: u16,

    /// Display name substituted for #NAME# in script lines
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let sink = AmcpConnection::connect(&args.host, args.port)
        .await
        .context("Failed to connect to playout server")?;
    let mut controller = RunController::new(Arc::new(sink));

    let display_name = args
        .name
        .unwrap_or_else(|| playmacro::directive::DEFAULT_DISPLAY_NAME.to_string());

    // One command per input line: `q` quits, `stop` cancels the active run,
    // anything else is taken as a script path and becomes the new run.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "q" => break,
            "stop" => controller.stop_active().await,
            path => {
                controller
                    .start_run(Path::new(path), RunContext::new(&display_name))
                    .await
            }
        }
    }

    // Cancel and join any active run before the process exits.
    controller.stop_active().await;
    Ok(())
}
