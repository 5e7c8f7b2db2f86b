use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::{
    auth::View,
    errors::Result,
    models::{GarmentSlot, GenerationMode, GenerationOutcome, TryOnKind},
};

pub type BroadcastSender = broadcast::Sender<String>;

/// One line of input from the front-end, e.g. `{"action":"set_mode","mode":"multi_pose"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionCommand {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Open { view: View },
    DeleteUser { username: String },
    ListUsers,
    SetMode { mode: GenerationMode },
    SetKind { kind: TryOnKind },
    Upload { slot: GarmentSlot, path: PathBuf },
    Clear { slot: GarmentSlot },
    SetInput { field: InputField, value: String },
    Generate,
    Download { index: usize },
    DownloadAll,
    Status,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    ModelDescription,
    Background,
    OutfitColor,
    AspectRatio,
}

pub fn parse_command(line: &str) -> Result<SessionCommand> {
    Ok(serde_json::from_str(line.trim())?)
}

pub fn message_bus() -> (BroadcastSender, broadcast::Receiver<String>) {
    broadcast::channel(256)
}

pub fn encode_message(event: &str, payload: Value) -> String {
    json!({
        "event": event,
        "payload": payload,
    })
    .to_string()
}

pub fn broadcast_json(sender: &BroadcastSender, event: &str, payload: Value) {
    let message = encode_message(event, payload);
    let _ = sender.send(message);
}

/// Event view of an outcome. Image bytes stay out of the event stream; use a
/// download to get them.
pub fn outcome_summary(index: usize, outcome: &GenerationOutcome) -> Value {
    match outcome {
        GenerationOutcome::Success { title, image_url } => {
            let (media_type, payload_len) = image_url
                .strip_prefix("data:")
                .and_then(|rest| rest.split_once(";base64,"))
                .map(|(media_type, payload)| (media_type, payload.len()))
                .unwrap_or(("application/octet-stream", 0));

            json!({
                "index": index,
                "title": title,
                "status": "success",
                "media_type": media_type,
                "approx_bytes": payload_len / 4 * 3,
            })
        }
        GenerationOutcome::Failure { title, reason } => json!({
            "index": index,
            "title": title,
            "status": "failed",
            "reason": reason,
        }),
    }
}
