//! Recorded conversations replayed through the pipeline stage.
//!
//! ```json
//! {
//!   "turns": [
//!     { "input": "hi", "expressions": "greeting(hello)", "actions": ["greet"] },
//!     {
//!       "input": "Paris",
//!       "actions": "confirm_city",
//!       "context": { "properties.user": { "type": "expressions", "value": "property(name(Ada))" } }
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error};
use turnkit_core::data::keys;
use turnkit_core::{
    Context, ConversationMemory, ConversationStep, DataItem, LifecycleTask, Property,
    PropertyEntry,
};
use turnkit_property::OneOrMany;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    pub turns: Vec<Turn>,
}

impl Transcript {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read transcript {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Data recorded on one turn before the stage runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub expressions: Option<String>,
    #[serde(default)]
    pub actions: Option<OneOrMany>,
    #[serde(default)]
    pub context: BTreeMap<String, Context>,
}

impl Turn {
    fn store_into(self, step: &mut ConversationStep) {
        if let Some(input) = self.input {
            step.store_data(DataItem::text(keys::INPUT_INITIAL, input));
        }
        for (subkey, context) in self.context {
            step.store_data(DataItem::context(&subkey, context));
        }
        if let Some(expressions) = self.expressions {
            step.store_data(DataItem::text(keys::EXPRESSIONS_PARSED, expressions));
        }
        if let Some(actions) = self.actions {
            step.store_data(DataItem::actions(actions.into_vec()));
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReport {
    pub turn: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extracted: Vec<PropertyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReport {
    pub conversation_id: Uuid,
    pub turns: Vec<TurnReport>,
    pub properties: Vec<Property>,
}

/// Replay every turn of `transcript` through `task`.
///
/// A failing turn is reported and the conversation continues with whatever
/// the stage managed to write before failing.
pub fn replay<T>(task: &T, transcript: Transcript, lookback: usize) -> ConversationReport
where
    T: LifecycleTask + ?Sized,
{
    let mut memory = transcript.conversation_id.map_or_else(
        || ConversationMemory::new(lookback),
        |id| ConversationMemory::with_id(id, lookback),
    );
    let mut turns = Vec::with_capacity(transcript.turns.len());

    for (index, turn) in transcript.turns.into_iter().enumerate() {
        let step = if index == 0 {
            memory.current_step_mut()
        } else {
            memory.start_step()
        };
        turn.store_into(step);

        let error = match task.execute(&mut memory) {
            Ok(()) => None,
            Err(e) => {
                error!(
                    "Turn {} of conversation {} failed: {e}",
                    index + 1,
                    memory.conversation_id()
                );
                Some(e.to_string())
            }
        };
        let extracted = memory
            .extracted_properties()
            .map(<[PropertyEntry]>::to_vec)
            .unwrap_or_default();
        debug!("Turn {} extracted {} entries", index + 1, extracted.len());

        turns.push(TurnReport {
            turn: index + 1,
            extracted,
            error,
        });
    }

    ConversationReport {
        conversation_id: memory.conversation_id(),
        turns,
        properties: memory.conversation_properties().iter().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnkit_core::Scope;
    use turnkit_property::{PropertyExtractionStage, PropertySetterConfig};

    fn stage() -> PropertyExtractionStage {
        let config = PropertySetterConfig::from_value(json!({
            "setOnActions": [
                {"actions": "greet", "setProperties": [{"name": "lang", "value": "en"}]},
                {"actions": "confirm_city", "setProperties": [
                    {"name": "city", "path": "memory.current.input", "scope": "longTerm"}
                ]},
                {"actions": "broken", "setProperties": [{"name": "x", "path": "context.nope"}]}
            ]
        }))
        .unwrap_or_else(|e| panic!("config should parse: {e}"));
        PropertyExtractionStage::from_config(&config)
            .unwrap_or_else(|e| panic!("stage should build: {e}"))
    }

    fn transcript(value: serde_json::Value) -> Transcript {
        serde_json::from_value(value).unwrap_or_else(|e| panic!("transcript should parse: {e}"))
    }

    #[test]
    fn replays_turns_in_order() {
        let report = replay(
            &stage(),
            transcript(json!({
                "turns": [
                    {"input": "hi", "expressions": "greeting(hello)", "actions": "greet"},
                    {"input": "where?", "actions": ["CATCH_ANY_INPUT_AS_PROPERTY"]},
                    {
                        "input": "Paris",
                        "actions": "confirm_city",
                        "context": {"properties.user": {"type": "expressions", "value": "property(name(Ada))"}}
                    }
                ]
            })),
            10,
        );

        assert_eq!(report.turns.len(), 3);
        assert!(report.turns[0].extracted.is_empty());
        assert_eq!(
            report.turns[2].extracted,
            vec![
                PropertyEntry::new(vec!["name".to_string()], json!("Ada")),
                PropertyEntry::new(vec!["user_input".to_string()], json!("Paris")),
            ]
        );
        assert_eq!(
            report.properties,
            vec![
                Property::new("city", json!("Paris"), Scope::LongTerm),
                Property::new("lang", json!("en"), Scope::Conversation),
            ]
        );
    }

    #[test]
    fn failing_turn_is_reported_and_replay_continues() {
        let report = replay(
            &stage(),
            transcript(json!({
                "conversationId": "0190a0a0-0000-7000-8000-000000000000",
                "turns": [{"actions": "broken"}, {"actions": "greet"}]
            })),
            1,
        );

        assert_eq!(
            report.conversation_id.to_string(),
            "0190a0a0-0000-7000-8000-000000000000"
        );
        assert!(
            report.turns[0]
                .error
                .as_deref()
                .is_some_and(|e| e.contains("context.nope"))
        );
        assert!(report.turns[1].error.is_none());
        assert_eq!(report.properties.len(), 1);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn reads_transcript_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("conversation.json");
        std::fs::write(&path, r#"{"turns": [{"input": "hello"}]}"#).expect("Failed to write");

        let transcript = Transcript::from_path(&path).expect("Failed to read transcript");
        assert_eq!(transcript.turns.len(), 1);
        assert_eq!(transcript.turns[0].input.as_deref(), Some("hello"));
        assert!(Transcript::from_path(&dir.path().join("missing.json")).is_err());
    }
}
