//! Property extraction stage.
//!
//! Per turn, the stage aggregates expressions from `context:properties*`
//! entries and the parsed turn expressions, hands them to the
//! [`PropertyDisposer`], applies the instructions configured for the turn's
//! actions, honours a catch-all-input trigger from the previous turn and
//! stores the resulting entries under `properties:extracted`.

use serde_json::Value;
use tracing::{debug, warn};
use turnkit_core::data::keys;
use turnkit_core::{
    ContextType, ConversationMemory, DataItem, DataValue, Expression, ExpressionParser,
    LifecycleError, LifecycleTask, MemoryItemConverter, Property, PropertyDisposer, PropertyEntry,
    TemplateMemoryConverter,
};
use turnkit_expressions::TextExpressionParser;

use crate::disposer::ExpressionPropertyDisposer;
use crate::error::PropertyError;
use crate::instructions::{
    ActionInstructionMap, CompiledInstruction, ConfigError, PropertySetterConfig,
};

pub const TASK_ID: &str = "turnkit.property";

/// Action which, when fired on a turn, captures the next turn's raw input.
pub const CATCH_ANY_INPUT_AS_PROPERTY_ACTION: &str = "CATCH_ANY_INPUT_AS_PROPERTY";

/// Meaning attached to a captured raw input.
pub const USER_INPUT_MEANING: &str = "user_input";

/// Context subkeys with this prefix feed the expression aggregation.
const PROPERTIES_CONTEXT_PREFIX: &str = "properties";

/// Pipeline stage that extracts properties from the current turn.
pub struct PropertyExtractionStage<
    P = TextExpressionParser,
    D = ExpressionPropertyDisposer,
    C = TemplateMemoryConverter,
> where
    P: ExpressionParser,
    D: PropertyDisposer,
    C: MemoryItemConverter,
{
    parser: P,
    disposer: D,
    converter: C,
    instructions: ActionInstructionMap,
}

impl PropertyExtractionStage {
    /// Stage with the default parser, disposer and template converter.
    #[must_use]
    pub const fn with_defaults(instructions: ActionInstructionMap) -> Self {
        Self::new(
            TextExpressionParser::new(),
            ExpressionPropertyDisposer::new(),
            TemplateMemoryConverter::new(),
            instructions,
        )
    }

    /// Build the default stage from a configuration. The stage is not
    /// created if the configuration is invalid.
    pub fn from_config(config: &PropertySetterConfig) -> Result<Self, ConfigError> {
        let mut builder = ActionInstructionMap::builder();
        builder.configure(config)?;
        Ok(Self::with_defaults(builder.build()))
    }
}

impl<P, D, C> PropertyExtractionStage<P, D, C>
where
    P: ExpressionParser,
    D: PropertyDisposer,
    C: MemoryItemConverter,
{
    #[must_use]
    pub const fn new(parser: P, disposer: D, converter: C, instructions: ActionInstructionMap) -> Self {
        Self {
            parser,
            disposer,
            converter,
            instructions,
        }
    }

    #[must_use]
    pub const fn instructions(&self) -> &ActionInstructionMap {
        &self.instructions
    }

    /// Run extraction on the current step of `memory`.
    ///
    /// Conversation properties written before a failing instruction are kept.
    pub fn extract(&self, memory: &mut ConversationMemory) -> Result<(), PropertyError> {
        let current = memory.current_step();
        let expressions_text = current.latest_text(keys::EXPRESSIONS_PARSED);
        let contexts = current.all_data(keys::CONTEXT);
        let actions = current.latest_actions(keys::ACTIONS).map(<[String]>::to_vec);

        if expressions_text.is_none() && contexts.is_empty() && actions.is_none() {
            debug!("No expressions, context or actions on current step");
            return Ok(());
        }

        let mut aggregated = Vec::new();
        for item in &contexts {
            let (Some(subkey), Some(context)) =
                (item.key.strip_prefix(keys::CONTEXT_PREFIX), item.result.as_context())
            else {
                continue;
            };
            if subkey.starts_with(PROPERTIES_CONTEXT_PREFIX)
                && context.context_type == ContextType::Expressions
            {
                aggregated.extend(self.parse(&item.key, &context.value_text())?);
            }
        }
        if let Some(text) = expressions_text {
            aggregated.extend(self.parse(keys::EXPRESSIONS_PARSED, text)?);
        }

        let mut properties = self.disposer.extract_properties(&aggregated);
        debug!(
            "Disposer extracted {} entries from {} expressions",
            properties.len(),
            aggregated.len()
        );

        if let Some(actions) = actions.filter(|actions| !actions.is_empty()) {
            self.apply_instructions(memory, &actions)?;
        }

        if let Some(entry) = Self::catch_all_input(memory) {
            properties.push(entry);
        }

        if !properties.is_empty() {
            memory.current_step_mut().store_data(
                DataItem::new(keys::PROPERTIES_EXTRACTED, DataValue::Properties(properties))
                    .public(),
            );
        }

        Ok(())
    }

    fn parse(&self, key: &str, text: &str) -> Result<Vec<Expression>, PropertyError> {
        self.parser
            .parse_expressions(text)
            .map_err(|source| PropertyError::ExpressionParsing {
                key: key.to_string(),
                source,
            })
    }

    fn apply_instructions(
        &self,
        memory: &mut ConversationMemory,
        actions: &[String],
    ) -> Result<(), PropertyError> {
        let template = Value::Object(self.converter.convert(memory));

        for action in actions {
            let Some(instructions) = self.instructions.get(action) else {
                continue;
            };
            for (position, compiled) in instructions.iter().enumerate() {
                let property = Self::resolve(action, position, compiled, &template)?;
                debug!(
                    "Action {action} sets {} property {}",
                    property.scope, property.name
                );
                memory.conversation_properties_mut().put(property);
            }
        }

        Ok(())
    }

    fn resolve(
        action: &str,
        position: usize,
        compiled: &CompiledInstruction,
        template: &Value,
    ) -> Result<Property, PropertyError> {
        let instruction = compiled.instruction();
        let name = instruction
            .name
            .as_deref()
            .ok_or_else(|| PropertyError::MissingName {
                action: action.to_string(),
                position,
            })?;

        let value = match compiled.path() {
            Some(path) => path.evaluate(template).cloned().map_err(|source| {
                PropertyError::PathEvaluation {
                    action: action.to_string(),
                    name: name.to_string(),
                    source,
                }
            })?,
            None => instruction.value.clone().unwrap_or(Value::Null),
        };

        Ok(Property::new(name, value, instruction.scope))
    }

    /// Entry for the current raw input if the previous turn asked for it.
    fn catch_all_input(memory: &ConversationMemory) -> Option<PropertyEntry> {
        let previous = memory.previous_steps().get(0)?;
        let actions = previous.latest_actions(keys::ACTIONS)?;
        if !actions
            .iter()
            .any(|action| action == CATCH_ANY_INPUT_AS_PROPERTY_ACTION)
        {
            return None;
        }

        match memory.current_step().latest_text(keys::INPUT_INITIAL) {
            Some("") => None,
            Some(input) => Some(PropertyEntry::new(
                vec![USER_INPUT_MEANING.to_string()],
                Value::String(input.to_string()),
            )),
            None => {
                warn!("Previous turn requested input capture but no initial input is present");
                None
            }
        }
    }
}

impl<P, D, C> LifecycleTask for PropertyExtractionStage<P, D, C>
where
    P: ExpressionParser,
    D: PropertyDisposer,
    C: MemoryItemConverter,
{
    fn id(&self) -> &str {
        TASK_ID
    }

    fn execute(&self, memory: &mut ConversationMemory) -> Result<(), LifecycleError> {
        self.extract(memory)
            .map_err(|e| LifecycleError::task(TASK_ID, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnkit_core::{Context, PropertyInstruction, Scope};

    fn stage_with(action: &str, instructions: Vec<PropertyInstruction>) -> PropertyExtractionStage {
        let mut builder = ActionInstructionMap::builder();
        builder
            .register(action, instructions)
            .unwrap_or_else(|e| panic!("instructions should register: {e}"));
        PropertyExtractionStage::with_defaults(builder.build())
    }

    #[test]
    fn no_input_means_no_writes() {
        let stage = PropertyExtractionStage::with_defaults(ActionInstructionMap::default());
        let mut memory = ConversationMemory::default();
        memory
            .current_step_mut()
            .store_data(DataItem::text(keys::INPUT_INITIAL, "hello"));

        assert!(stage.extract(&mut memory).is_ok());
        assert_eq!(memory.current_step().items().len(), 1);
        assert!(memory.conversation_properties().is_empty());
    }

    #[test]
    fn context_entries_precede_turn_expressions() {
        let stage = PropertyExtractionStage::with_defaults(ActionInstructionMap::default());
        let mut memory = ConversationMemory::default();
        let step = memory.current_step_mut();
        step.store_data(DataItem::text(keys::EXPRESSIONS_PARSED, "property(city(Paris))"));
        step.store_data(DataItem::context(
            "properties.user",
            Context::expressions("property(name(Ada))"),
        ));
        step.store_data(DataItem::context(
            "other",
            Context::expressions("property(ignored(yes))"),
        ));

        assert!(stage.extract(&mut memory).is_ok());
        let extracted = memory.extracted_properties().unwrap_or_default();
        assert_eq!(
            extracted,
            [
                PropertyEntry::new(vec!["name".to_string()], json!("Ada")),
                PropertyEntry::new(vec!["city".to_string()], json!("Paris")),
            ]
        );
        let item = memory.current_step().latest_data(keys::PROPERTIES_EXTRACTED);
        assert!(item.is_some_and(|item| item.public));
    }

    #[test]
    fn non_expression_context_is_skipped() {
        let stage = PropertyExtractionStage::with_defaults(ActionInstructionMap::default());
        let mut memory = ConversationMemory::default();
        memory.current_step_mut().store_data(DataItem::context(
            "properties.raw",
            Context::new(ContextType::String, json!("property(a(b))")),
        ));

        assert!(stage.extract(&mut memory).is_ok());
        assert!(memory.extracted_properties().is_none());
    }

    #[test]
    fn path_takes_precedence_over_literal() {
        let mut instruction = PropertyInstruction::literal("city", json!("literal"));
        instruction.from_object_path = Some("memory.current.input".to_string());
        let stage = stage_with("ask", vec![instruction]);

        let mut memory = ConversationMemory::default();
        let step = memory.current_step_mut();
        step.store_data(DataItem::text(keys::INPUT_INITIAL, "Paris"));
        step.store_data(DataItem::actions(["ask"]));

        assert!(stage.extract(&mut memory).is_ok());
        assert_eq!(
            memory.conversation_properties().get("city").map(|p| &p.value),
            Some(&json!("Paris"))
        );
    }

    #[test]
    fn missing_name_fails_after_earlier_writes() {
        let stage = stage_with(
            "greet",
            vec![
                PropertyInstruction::literal("lang", json!("en")),
                PropertyInstruction {
                    value: Some(json!(1)),
                    ..PropertyInstruction::default()
                },
                PropertyInstruction::literal("after", json!(true)),
            ],
        );
        let mut memory = ConversationMemory::default();
        memory
            .current_step_mut()
            .store_data(DataItem::actions(["greet"]));

        let err = stage.extract(&mut memory).err();
        assert!(matches!(
            err,
            Some(PropertyError::MissingName { position: 1, .. })
        ));
        assert!(memory.conversation_properties().get("lang").is_some());
        assert!(memory.conversation_properties().get("after").is_none());
    }

    #[test]
    fn lifecycle_error_wraps_cause() {
        let stage = stage_with(
            "greet",
            vec![PropertyInstruction::from_path("x", "context.missing")],
        );
        let mut memory = ConversationMemory::default();
        memory
            .current_step_mut()
            .store_data(DataItem::actions(["greet"]));

        let err = stage.execute(&mut memory).err();
        assert_eq!(err.as_ref().map(LifecycleError::task_id), Some(TASK_ID));
        let source = err
            .as_ref()
            .and_then(|e| std::error::Error::source(e))
            .map(ToString::to_string);
        assert!(source.is_some_and(|s| s.contains("\"x\"")));
    }

    #[test]
    fn instruction_without_value_sets_null() {
        let stage = stage_with(
            "reset",
            vec![PropertyInstruction {
                name: Some("city".to_string()),
                scope: Scope::LongTerm,
                ..PropertyInstruction::default()
            }],
        );
        let mut memory = ConversationMemory::default();
        memory
            .current_step_mut()
            .store_data(DataItem::actions(["reset"]));

        assert!(stage.extract(&mut memory).is_ok());
        assert_eq!(
            memory.conversation_properties().get("city"),
            Some(&Property::new("city", Value::Null, Scope::LongTerm))
        );
    }
}
