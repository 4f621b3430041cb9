use serde_json::{Map, Value};

use super::{ConversationMemory, ConversationStep};
use crate::MemoryItemConverter;
use crate::data::keys;

/// Default memory-to-template conversion.
///
/// Produces `conversationId`, `context` (current step context values by
/// subkey), `properties` (conversation properties by name) and `memory`
/// with `current`, `last` and `past` step renderings. A step is rendered as
/// a map from key namespace (the part before `:`) to the latest value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMemoryConverter;

impl TemplateMemoryConverter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn render_step(step: &ConversationStep) -> Value {
        let mut rendered = Map::new();
        for item in step.items() {
            if item.namespace() == keys::CONTEXT {
                continue;
            }
            rendered.insert(item.namespace().to_string(), item.result.to_json());
        }
        Value::Object(rendered)
    }

    fn render_context(step: &ConversationStep) -> Value {
        let mut context = Map::new();
        for item in step.all_data(keys::CONTEXT) {
            if let (Some(subkey), Some(value)) = (item.subkey(), item.result.as_context()) {
                context.insert(subkey.to_string(), value.value.clone());
            }
        }
        Value::Object(context)
    }
}

impl MemoryItemConverter for TemplateMemoryConverter {
    fn convert(&self, memory: &ConversationMemory) -> Map<String, Value> {
        let current = memory.current_step();
        let previous = memory.previous_steps();

        let properties: Map<String, Value> = memory
            .conversation_properties()
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();

        let last = previous
            .get(0)
            .map_or_else(|| Value::Object(Map::new()), Self::render_step);
        let past: Vec<Value> = previous.iter().rev().map(Self::render_step).collect();

        let mut steps = Map::new();
        steps.insert("current".to_string(), Self::render_step(current));
        steps.insert("last".to_string(), last);
        steps.insert("past".to_string(), Value::Array(past));

        let mut root = Map::new();
        root.insert(
            "conversationId".to_string(),
            Value::String(memory.conversation_id().to_string()),
        );
        root.insert("context".to_string(), Self::render_context(current));
        root.insert("properties".to_string(), Value::Object(properties));
        root.insert("memory".to_string(), Value::Object(steps));
        root
    }
}
