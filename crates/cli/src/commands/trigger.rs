//! `learnflow trigger`: run one session start and print the resulting list.

use learnflow_config::AppConfig;
use learnflow_core::{PipelineEvent, SessionId};
use learnflow_pipeline::RunOutcome;

use super::Runtime;

pub async fn run(
    config: AppConfig,
    session: String,
    token: Option<String>,
    side: bool,
    log_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(&config, log_only)?;
    let mut events = runtime.event_bus.subscribe();
    let session_id = SessionId(session);
    let token = token.unwrap_or_else(|| config.actions.default_token.clone());

    if side {
        runtime
            .dispatcher
            .pipeline()
            .store()
            .set_activity(&session_id, true)
            .await;
    }

    let outcome = runtime
        .dispatcher
        .on_session_trigger(&session_id, &token)
        .await;

    while let Ok(event) = events.try_recv() {
        match event.as_ref() {
            PipelineEvent::StageCompleted {
                stage,
                result_count,
                ..
            } => eprintln!("  {stage:<16} {result_count}"),
            PipelineEvent::StageFailed {
                stage,
                error_message,
                ..
            } => eprintln!("  {stage:<16} failed: {error_message}"),
            PipelineEvent::PublishFailed { error_message, .. } => {
                eprintln!("  publish failed: {error_message}")
            }
            _ => {}
        }
    }

    match outcome {
        Some(RunOutcome::Published(items)) => {
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }
        Some(RunOutcome::Discarded { stage }) => {
            Err(format!("Run superseded at stage {stage}").into())
        }
        Some(RunOutcome::Aborted { stage, error }) => {
            Err(format!("Run aborted at stage {stage}: {error}").into())
        }
        None => Err(format!("Session {session_id} could not be resolved").into()),
    }
}
