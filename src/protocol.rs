//! Line protocol between a host (viewer/renderer) and the engine driver.
//! Every request is one JSON object per line; every reply is one JSON object per line.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorKind};
use crate::reducer::EngineEvent;
use crate::report::ItemCredit;
use crate::serialize::ActivityStateNoSource;
use crate::source::ActivitySource;
use crate::state::NumVariantsTable;

/// Messages the host can send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    /// Start over with a new source, or the configured one when omitted.
    Initialize {
        #[serde(default)]
        source: Option<ActivitySource>,
        #[serde(default, rename = "variantIndex")]
        variant_index: Option<u64>,
    },
    /// Resume from a blob previously returned in a `state` reply.
    Set {
        state: ActivityStateNoSource,
    },
    GenerateNewActivityAttempt {
        #[serde(default)]
        id: Option<String>,
    },
    GenerateSingleDocSubActivityAttempt {
        #[serde(rename = "docId")]
        doc_id: String,
    },
    UpdateSingleState {
        id: String,
        #[serde(default, rename = "doenetState")]
        doenet_state: serde_json::Value,
        #[serde(rename = "creditAchieved")]
        credit_achieved: f64,
    },
    SetNumVariants {
        #[serde(rename = "numActivityVariants")]
        num_activity_variants: NumVariantsTable,
    },
    GetState,
    GetItemCredit,
}

/// Messages the engine sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    State {
        state: ActivityStateNoSource,
    },
    ItemCredit {
        items: Vec<ItemCredit>,
    },
    Events {
        events: Vec<EngineEvent>,
    },
    Error {
        message: String,
        kind: ErrorKind,
    },
}

impl From<EngineError> for ServerMessage {
    fn from(e: EngineError) -> Self {
        ServerMessage::Error { kind: e.kind(), message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_update_single_state() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"update_single_state","id":"doc1","doenetState":{"x":1},"creditAchieved":0.5}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::UpdateSingleState { id, credit_achieved, .. } => {
                assert_eq!(id, "doc1");
                assert_eq!(credit_achieved, 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn whole_tree_attempt_has_optional_id() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"generate_new_activity_attempt"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GenerateNewActivityAttempt { id: None }));
    }

    #[test]
    fn errors_carry_their_kind() {
        let reply = ServerMessage::from(EngineError::InvalidCredit(2.0));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "configuration");
    }
}
