//! Wire types of the ask surface: persisted answers and the incremental
//! events pushed over the answer stream.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelatedQuestion {
    pub question: String,
    pub id: String,
}

/// Final answer payload, returned by `GET /answer` and carried by the
/// terminal `answer` stream event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnswerPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub question: String,
    #[serde(default, deserialize_with = "crate::null_as_default")]
    pub answer: String,
    #[serde(default)]
    pub related: Option<Vec<RelatedQuestion>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Preparing,
    Running,
    Complete,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// One event of the answer stream, encoded as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AnswerEvent {
    Text(String),
    Status(AnswerStatus),
    Tool(ToolInvocation),
    Answer(AnswerPayload),
}

impl AnswerEvent {
    pub const KINDS: [&'static str; 4] = ["text", "status", "tool", "answer"];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_event_decodes() {
        let event: AnswerEvent =
            serde_json::from_str(r#"{"type": "text", "value": "The licence"}"#).unwrap();
        assert_eq!(event, AnswerEvent::Text("The licence".into()));
        assert!(!event.is_terminal());
    }

    #[test]
    fn unknown_status_maps_to_other() {
        let event: AnswerEvent =
            serde_json::from_str(r#"{"type": "status", "value": "queued"}"#).unwrap();
        assert_eq!(event, AnswerEvent::Status(AnswerStatus::Other));
    }

    #[test]
    fn tool_event_keeps_arguments() {
        let event: AnswerEvent = serde_json::from_str(
            r#"{"type": "tool", "value": {"name": "search_datasets", "arguments": {"query": "hmo"}}}"#,
        )
        .unwrap();
        match event {
            AnswerEvent::Tool(tool) => {
                assert_eq!(tool.name, "search_datasets");
                assert_eq!(tool.arguments["query"], "hmo");
            }
            other => panic!("expected tool event, got {other:?}"),
        }
    }

    #[test]
    fn answer_event_with_error_has_no_id() {
        let event: AnswerEvent =
            serde_json::from_str(r#"{"type": "answer", "value": {"error": "quota exceeded"}}"#)
                .unwrap();
        match event {
            AnswerEvent::Answer(payload) => {
                assert_eq!(payload.error.as_deref(), Some("quota exceeded"));
                assert!(payload.id.is_none());
                assert!(payload.answer.is_empty());
            }
            other => panic!("expected answer event, got {other:?}"),
        }
    }

    #[test]
    fn answer_payload_reads_related_questions() {
        let payload: AnswerPayload = serde_json::from_value(serde_json::json!({
            "id": "abc123",
            "question": "hmo license 51630",
            "answer": "Licence **51630** is active.",
            "related": [{"question": "who holds it?", "id": "def456"}]
        }))
        .unwrap();
        assert_eq!(payload.id.as_deref(), Some("abc123"));
        assert_eq!(payload.related.unwrap()[0].id, "def456");
    }
}
