//! Line-delimited JSON spoken with the bridge process over stdin/stdout.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::events::BridgeEvent;

/// Lines written by the bridge process on stdout, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BridgeLine {
    /// Start outcome.  Sent once, right after launch.
    #[serde(rename = "started")]
    Started { outcome: String },
    #[serde(rename = "log")]
    Log { message: String },
    #[serde(rename = "publicURL")]
    PublicUrl { url: String },
    #[serde(rename = "stopped")]
    Stopped,
}

impl BridgeLine {
    /// Parse one line of bridge output.  Anything that isn't a recognised
    /// JSON event is passed through as a log line; blank lines are dropped.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<BridgeLine>(line) {
            Ok(parsed) => Some(parsed),
            Err(_) => Some(BridgeLine::Log {
                message: line.to_string(),
            }),
        }
    }

    /// The hub event for this line.  `Started` is consumed by the launcher
    /// and has no topic.
    pub fn into_event(self) -> Option<BridgeEvent> {
        match self {
            BridgeLine::Started { .. } => None,
            BridgeLine::Log { message } => Some(BridgeEvent::Log(message)),
            BridgeLine::PublicUrl { url } => Some(BridgeEvent::PublicUrl(url)),
            BridgeLine::Stopped => Some(BridgeEvent::Stopped),
        }
    }
}

/// Messages written to the bridge's stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum BridgeCommand {
    Stop,
}

impl BridgeCommand {
    /// Newline-terminated JSON, ready to write.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Older bridges report their start outcome as free text and signal failure
/// by including the word `Error`.  Map that onto a typed result, keeping
/// the text verbatim either way.
pub fn classify_outcome(outcome: &str) -> Result<String, BridgeError> {
    if outcome.contains("Error") {
        Err(BridgeError::StartFailed(outcome.to_string()))
    } else {
        Ok(outcome.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_events() {
        assert_eq!(
            BridgeLine::parse(r#"{"event":"started","outcome":"Bridge started on :8080"}"#),
            Some(BridgeLine::Started {
                outcome: "Bridge started on :8080".into()
            })
        );
        assert_eq!(
            BridgeLine::parse(r#"{"event":"log","message":"tunnel up"}"#),
            Some(BridgeLine::Log {
                message: "tunnel up".into()
            })
        );
        assert_eq!(
            BridgeLine::parse("{\"event\":\"publicURL\",\"url\":\"https://x.ngrok.app\"}\r\n"),
            Some(BridgeLine::PublicUrl {
                url: "https://x.ngrok.app".into()
            })
        );
        assert_eq!(
            BridgeLine::parse(r#"{"event":"stopped"}"#),
            Some(BridgeLine::Stopped)
        );
    }

    #[test]
    fn test_plain_text_becomes_log() {
        assert_eq!(
            BridgeLine::parse("panic: listener closed"),
            Some(BridgeLine::Log {
                message: "panic: listener closed".into()
            })
        );
        assert_eq!(
            BridgeLine::parse(r#"{"event":"heartbeat"}"#),
            Some(BridgeLine::Log {
                message: r#"{"event":"heartbeat"}"#.into()
            })
        );
        assert_eq!(BridgeLine::parse("   "), None);
    }

    #[test]
    fn test_into_event() {
        assert_eq!(
            BridgeLine::Started {
                outcome: "ok".into()
            }
            .into_event(),
            None
        );
        assert_eq!(
            BridgeLine::PublicUrl { url: "u".into() }.into_event(),
            Some(BridgeEvent::PublicUrl("u".into()))
        );
    }

    #[test]
    fn test_stop_command_wire_form() {
        assert_eq!(BridgeCommand::Stop.encode().unwrap(), "{\"command\":\"stop\"}\n");
    }

    #[test]
    fn test_classify_outcome() {
        assert_eq!(
            classify_outcome("Bridge started successfully"),
            Ok("Bridge started successfully".to_string())
        );
        assert_eq!(
            classify_outcome("Error: ngrok auth failed"),
            Err(BridgeError::StartFailed("Error: ngrok auth failed".into()))
        );
        // Case-sensitive, like the bridge's own convention.
        assert!(classify_outcome("no error here").is_ok());
    }
}
