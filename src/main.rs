//! Activity engine driver.
//!
//! - Reads one JSON request per line on stdin
//! - Writes one JSON reply per line on stdout
//! - Logs to stderr
//!
//! Important env variables:
//!   ACTIVITY_CONFIG_PATH : path to TOML config (source path + variant table)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, instrument};

use activity_engine::config::{load_engine_config_from_env, EngineConfig};
use activity_engine::protocol::{ClientMessage, ServerMessage};
use activity_engine::reducer::ActivityAction;
use activity_engine::seeds::{demo_activity, demo_num_variants};
use activity_engine::source::{load_activity_source, ActivitySource};
use activity_engine::telemetry;
use activity_engine::ActivitySession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let mut config = load_engine_config_from_env().unwrap_or_default();
  let source = default_source(&mut config)?;

  let mut session = ActivitySession::new(&config);
  session.initialize(source.clone(), None)?;
  info!(target: "activity_engine", session = %session.session_id, root = %source.id(), "Engine ready");

  let mut lines = BufReader::new(stdin()).lines();
  let mut out = stdout();
  while let Some(line) = lines.next_line().await? {
    if line.trim().is_empty() {
      continue;
    }
    let reply = match serde_json::from_str::<ClientMessage>(&line) {
      Ok(incoming) => {
        debug!(target: "activity_engine", "Received: {:?}", &incoming);
        handle_client_message(incoming, &mut session, &source)
      }
      Err(e) => ServerMessage::Error { message: format!("Invalid JSON: {}", e), kind: activity_engine::ErrorKind::Io },
    };

    let text = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "kind": "io", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = write_line(&mut out, &text).await {
      error!(target: "activity_engine", error = %e, "Write error");
      break;
    }
  }
  info!(target: "activity_engine", session = %session.session_id, "Input closed");
  Ok(())
}

/// The configured source, or the built-in demo with its variant table merged
/// under any configured counts.
fn default_source(config: &mut EngineConfig) -> activity_engine::Result<ActivitySource> {
  match &config.source_path {
    Some(path) => load_activity_source(path),
    None => {
      let mut table = demo_num_variants();
      table.extend(std::mem::take(&mut config.num_activity_variants));
      config.num_activity_variants = table;
      Ok(demo_activity())
    }
  }
}

async fn write_line(out: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
  out.write_all(text.as_bytes()).await?;
  out.write_all(b"\n").await?;
  out.flush().await
}

#[instrument(level = "info", skip(session, default_source), fields(session = %session.session_id))]
fn handle_client_message(
  msg: ClientMessage,
  session: &mut ActivitySession,
  default_source: &ActivitySource,
) -> ServerMessage {
  let result = match msg {
    ClientMessage::Ping => return ServerMessage::Pong,

    ClientMessage::Initialize { source, variant_index } => session
      .initialize(source.unwrap_or_else(|| default_source.clone()), variant_index)
      .map(|events| ServerMessage::Events { events }),

    ClientMessage::Set { state } => session.restore(&state).and_then(|_| session.save()).map(|state| ServerMessage::State { state }),

    ClientMessage::GenerateNewActivityAttempt { id } => session
      .apply(ActivityAction::GenerateNewActivityAttempt { id })
      .map(|events| ServerMessage::Events { events }),

    ClientMessage::GenerateSingleDocSubActivityAttempt { doc_id } => session
      .apply(ActivityAction::GenerateSingleDocSubActivityAttempt { doc_id })
      .map(|events| ServerMessage::Events { events }),

    ClientMessage::UpdateSingleState { id, doenet_state, credit_achieved } => session
      .apply(ActivityAction::UpdateSingleState { id, doenet_state, credit_achieved })
      .map(|events| ServerMessage::Events { events }),

    ClientMessage::SetNumVariants { num_activity_variants } => {
      session.set_num_variants(num_activity_variants);
      Ok(ServerMessage::Events { events: Vec::new() })
    }

    ClientMessage::GetState => session.save().map(|state| ServerMessage::State { state }),

    ClientMessage::GetItemCredit => session.item_credit().map(|items| ServerMessage::ItemCredit { items }),
  };

  result.unwrap_or_else(|e| {
    error!(target: "activity_engine", error = %e, kind = ?e.kind(), "Action failed");
    ServerMessage::from(e)
  })
}
