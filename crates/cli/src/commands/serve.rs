//! `learnflow serve`: dispatch triggers read from stdin.
//!
//! Each line is one JSON trigger, e.g.
//! `{"type":"session_start","sid":"s1","token":"t"}`. Lines that do not parse
//! as a known trigger are ignored. Runs execute concurrently; at end of input
//! the command waits for runs still in flight.

use std::time::Duration;

use futures::future::join_all;
use learnflow_config::AppConfig;
use learnflow_core::Trigger;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::Runtime;

pub async fn run(config: AppConfig, log_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(&config, log_only)?;
    let dispatcher = runtime.dispatcher;
    let store = dispatcher.pipeline().store().clone();

    info!(
        service = %config.service_tag,
        graph = %config.endpoints.graph_url,
        log_only,
        "learnflow serving triggers from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(
        config.heartbeat.interval_secs.max(1),
    ));
    let mut in_flight = Vec::new();
    let mut handled: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Trigger>(line) {
                    Ok(trigger) => {
                        debug!(?trigger, "Trigger received");
                        handled += 1;
                        in_flight.push(dispatcher.spawn(trigger));
                    }
                    Err(e) => debug!(error = %e, "Ignoring unrecognised trigger"),
                }
                in_flight.retain(|handle| !handle.is_finished());
            }
            _ = heartbeat.tick(), if config.heartbeat.enabled => {
                info!(
                    service = %config.service_tag,
                    sessions = store.len().await,
                    handled,
                    in_flight = in_flight.len(),
                    "heartbeat"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    for result in join_all(in_flight).await {
        if let Err(e) = result {
            warn!(error = %e, "Trigger task failed");
        }
    }
    info!(handled, "learnflow stopped");
    Ok(())
}
