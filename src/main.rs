mod auth;
mod capabilities;
mod config;
mod controller;
mod errors;
mod events;
mod models;
mod orchestrator;
mod providers;
mod session;
mod util;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::{
    capabilities::POSE_CATALOG,
    controller::{TryOnController, help_message},
    errors::Result,
    events::{BroadcastSender, broadcast_json, parse_command},
    providers::GeminiClient,
    util::{format_local, now_local},
};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;
    let client = GeminiClient::from_config(&config.gemini)?;
    let model = client.model().to_string();

    let (broadcaster, bus_rx) = events::message_bus();
    let printer = tokio::spawn(print_events(bus_rx));

    let mut controller = TryOnController::new(&config, client, broadcaster.clone()).await?;

    broadcast_system_ready(&broadcaster, &model, config.gemini.api_key.is_some());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    // After input closes, a run already in flight is still allowed to settle.
    while input_open || controller.has_run_in_flight() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if controller.has_run_in_flight() {
                    warn!(target: "controller", "abandoning the in-flight generation run");
                }
                info!(target: "controller", "received shutdown signal");
                break;
            }
            _ = controller.complete_run(), if controller.has_run_in_flight() => {}
            line = lines.next_line(), if input_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => match parse_command(&line) {
                        Ok(command) => controller.handle(command).await,
                        Err(err) => {
                            warn!(target: "controller", error = %err, "unreadable command");
                            broadcast_json(
                                &broadcaster,
                                "app.error",
                                json!({ "kind": err.kind(), "message": err.to_string() }),
                            );
                        }
                    },
                    Ok(None) => {
                        info!(target: "controller", "input closed");
                        input_open = false;
                    }
                    Err(err) => {
                        error!(target: "controller", error = ?err, "failed to read input");
                        input_open = false;
                    }
                }
            }
        }
    }

    // Dropping every sender lets the printer drain what is queued and exit.
    drop(controller);
    drop(broadcaster);
    if let Err(err) = printer.await {
        error!(target: "controller", error = ?err, "event printer stopped abnormally");
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_timer(LocalTimer)
        .init();

    info!("tracing initialized");
}

/// Writes each bus message to stdout as one line.
async fn print_events(mut receiver: tokio::sync::broadcast::Receiver<String>) {
    use tokio::sync::broadcast::error::RecvError;

    let mut stdout = tokio::io::stdout();
    loop {
        match receiver.recv().await {
            Ok(message) => {
                let line = format!("{message}\n");
                if stdout.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(target: "controller", skipped, "event printer lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn broadcast_system_ready(broadcaster: &BroadcastSender, model: &str, has_api_key: bool) {
    broadcast_json(
        broadcaster,
        "system.ready",
        json!({
            "message": "Try-on studio is ready",
            "model": model,
            "api_key_configured": has_api_key,
            "poses": POSE_CATALOG.iter().map(|pose| pose.title).collect::<Vec<_>>(),
            "help": help_message(),
        }),
    );
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = now_local();
        write!(w, "{}", format_local(&now, "%Y-%m-%d %H:%M:%S%:z"))
    }
}
