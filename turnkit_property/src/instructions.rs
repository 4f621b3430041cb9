//! Action to property-instruction registry and its configuration schema.
//!
//! Configuration document:
//!
//! ```json
//! {
//!   "setOnActions": [
//!     {
//!       "actions": "greet",
//!       "setProperties": [
//!         { "name": "lang", "value": "en" },
//!         { "name": "city", "path": "context.user.city", "scope": "longTerm" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The registry is built once through [`ActionInstructionMapBuilder`] and is
//! read-only afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use turnkit_core::{PropertyInstruction, Scope};

use crate::path::{PathError, PathExpression};

/// Errors raised while loading the property configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed property configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown property scope {value:?} for action {action:?}")]
    UnknownScope { action: String, value: String },

    #[error("invalid path for property {name:?} on action {action:?}: {source}")]
    InvalidPath {
        action: String,
        name: String,
        #[source]
        source: PathError,
    },
}

/// Top-level schema of the property stage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySetterConfig {
    #[serde(default)]
    pub set_on_actions: Vec<SetOnActions>,
}

impl PropertySetterConfig {
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOnActions {
    pub actions: OneOrMany,
    #[serde(default)]
    pub set_properties: Vec<PropertyInstructionDef>,
}

/// A single action name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(action) => vec![action],
            Self::Many(actions) => actions,
        }
    }
}

/// Raw `setProperties` entry; unrecognized keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyInstructionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A property instruction with its path compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInstruction {
    instruction: PropertyInstruction,
    path: Option<PathExpression>,
}

impl CompiledInstruction {
    fn compile(action: &str, instruction: PropertyInstruction) -> Result<Self, ConfigError> {
        let path = instruction
            .path()
            .map(PathExpression::parse)
            .transpose()
            .map_err(|source| ConfigError::InvalidPath {
                action: action.to_string(),
                name: instruction.name.clone().unwrap_or_default(),
                source,
            })?;
        Ok(Self { instruction, path })
    }

    #[must_use]
    pub const fn instruction(&self) -> &PropertyInstruction {
        &self.instruction
    }

    /// Compiled source path; takes precedence over the literal value.
    #[must_use]
    pub const fn path(&self) -> Option<&PathExpression> {
        self.path.as_ref()
    }
}

/// Read-only mapping from action name to its ordered instructions.
#[derive(Debug, Clone, Default)]
pub struct ActionInstructionMap {
    instructions: HashMap<String, Vec<CompiledInstruction>>,
}

impl ActionInstructionMap {
    #[must_use]
    pub fn builder() -> ActionInstructionMapBuilder {
        ActionInstructionMapBuilder::new()
    }

    /// Instructions registered for `action`, in registration order.
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&[CompiledInstruction]> {
        self.instructions.get(action).map(Vec::as_slice)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.instructions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Mutable phase of an [`ActionInstructionMap`].
///
/// Registering an action that already exists appends to its list.
#[derive(Debug, Default)]
pub struct ActionInstructionMapBuilder {
    instructions: HashMap<String, Vec<CompiledInstruction>>,
}

impl ActionInstructionMapBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a raw configuration document.
    pub fn configure_value(&mut self, value: Value) -> Result<&mut Self, ConfigError> {
        let config = PropertySetterConfig::from_value(value)?;
        self.configure(&config)
    }

    /// Apply a parsed configuration. Nothing is registered if any entry is
    /// invalid.
    pub fn configure(&mut self, config: &PropertySetterConfig) -> Result<&mut Self, ConfigError> {
        let mut pending = Vec::new();
        for entry in &config.set_on_actions {
            for action in entry.actions.clone().into_vec() {
                let compiled = entry
                    .set_properties
                    .iter()
                    .map(|def| Self::convert(&action, def))
                    .collect::<Result<Vec<_>, _>>()?;
                pending.push((action, compiled));
            }
        }

        for (action, compiled) in pending {
            self.append(action, compiled);
        }
        Ok(self)
    }

    /// Register instructions for a single action.
    pub fn register<I>(&mut self, action: &str, instructions: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = PropertyInstruction>,
    {
        let compiled = instructions
            .into_iter()
            .map(|instruction| CompiledInstruction::compile(action, instruction))
            .collect::<Result<Vec<_>, _>>()?;
        self.append(action.to_string(), compiled);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> ActionInstructionMap {
        info!(
            "Built action instruction map with {} actions",
            self.instructions.len()
        );
        ActionInstructionMap {
            instructions: self.instructions,
        }
    }

    fn append(&mut self, action: String, compiled: Vec<CompiledInstruction>) {
        debug!(
            "Registering {} property instructions for action: {action}",
            compiled.len()
        );
        self.instructions.entry(action).or_default().extend(compiled);
    }

    fn convert(
        action: &str,
        def: &PropertyInstructionDef,
    ) -> Result<CompiledInstruction, ConfigError> {
        let scope = match def.scope.as_deref() {
            None => Scope::default(),
            Some(value) => value
                .parse::<Scope>()
                .map_err(|_| ConfigError::UnknownScope {
                    action: action.to_string(),
                    value: value.to_string(),
                })?,
        };

        let instruction = PropertyInstruction {
            name: def.name.clone(),
            value: def.value.clone(),
            from_object_path: def.path.clone(),
            scope,
        };
        CompiledInstruction::compile(action, instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(value: Value) -> Result<ActionInstructionMap, ConfigError> {
        let mut builder = ActionInstructionMap::builder();
        builder.configure_value(value)?;
        Ok(builder.build())
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn bare_string_action_is_normalized() {
        let map = build(json!({
            "setOnActions": [
                {"actions": "greet", "setProperties": [{"name": "lang", "value": "en"}]}
            ]
        }))
        .expect("Failed to build map");

        let instructions = map.get("greet").expect("greet should be registered");
        assert_eq!(instructions.len(), 1);
        assert_eq!(
            instructions[0].instruction(),
            &PropertyInstruction::literal("lang", json!("en"))
        );
        assert!(instructions[0].path().is_none());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn action_list_shares_instructions() {
        let map = build(json!({
            "setOnActions": [{
                "actions": ["greet", "welcome"],
                "setProperties": [{"name": "city", "path": "context.city", "scope": "longTerm"}]
            }]
        }))
        .expect("Failed to build map");

        for action in ["greet", "welcome"] {
            let instructions = map.get(action).expect("action should be registered");
            assert_eq!(instructions[0].instruction().scope, Scope::LongTerm);
            assert_eq!(
                instructions[0].path().map(PathExpression::as_str),
                Some("context.city")
            );
        }
        assert_eq!(map.len(), 2);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn repeated_action_appends() {
        let mut builder = ActionInstructionMap::builder();
        builder
            .configure_value(json!({
                "setOnActions": [
                    {"actions": "greet", "setProperties": [{"name": "a", "value": 1}]},
                    {"actions": "greet", "setProperties": [{"name": "b", "value": 2}]}
                ]
            }))
            .expect("Failed to configure");
        builder
            .configure_value(json!({
                "setOnActions": [{"actions": "greet", "setProperties": [{"name": "c", "value": 3}]}]
            }))
            .expect("Failed to reconfigure");
        let map = builder.build();

        let names: Vec<Option<&str>> = map
            .get("greet")
            .expect("greet should be registered")
            .iter()
            .map(|c| c.instruction().name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("a"), Some("b"), Some("c")]);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn unknown_keys_ignored_and_scope_defaults() {
        let map = build(json!({
            "setOnActions": [{
                "actions": "greet",
                "comment": "ignored",
                "setProperties": [{"name": "lang", "value": "en", "color": "blue"}]
            }]
        }))
        .expect("Failed to build map");

        let instruction = map.get("greet").expect("greet should be registered")[0].instruction();
        assert_eq!(instruction.scope, Scope::Conversation);
    }

    #[test]
    fn unknown_scope_is_rejected_by_name() {
        let err = build(json!({
            "setOnActions": [{
                "actions": "greet",
                "setProperties": [{"name": "lang", "value": "en", "scope": "forever"}]
            }]
        }))
        .err();

        assert!(matches!(
            &err,
            Some(ConfigError::UnknownScope { value, .. }) if value == "forever"
        ));
        assert!(err.is_some_and(|e| e.to_string().contains("forever")));
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        assert!(matches!(
            build(json!({"setOnActions": [{"actions": 5}]})),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            build(json!({"setOnActions": [{"actions": "a", "setProperties": {"name": "x"}}]})),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn invalid_path_is_rejected_at_load() {
        assert!(matches!(
            build(json!({
                "setOnActions": [{"actions": "a", "setProperties": [{"name": "x", "path": "a..b"}]}]
            })),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn failed_configure_registers_nothing() {
        let mut builder = ActionInstructionMap::builder();
        let result = builder.configure_value(json!({
            "setOnActions": [
                {"actions": "ok", "setProperties": [{"name": "a", "value": 1}]},
                {"actions": "bad", "setProperties": [{"name": "b", "scope": "nope"}]}
            ]
        }));
        assert!(result.is_err());

        builder
            .register("manual", [PropertyInstruction::literal("m", json!(true))])
            .expect("Failed to register");
        let map = builder.build();
        assert!(map.get("ok").is_none());
        assert_eq!(map.actions().collect::<Vec<_>>(), vec!["manual"]);
    }

    #[test]
    fn missing_name_is_accepted_at_load() {
        let map = build(json!({
            "setOnActions": [{"actions": "a", "setProperties": [{"value": 1}]}]
        }));
        assert!(map.is_ok_and(|m| m.get("a").is_some_and(|i| i[0].instruction().name.is_none())));
    }

    #[test]
    fn empty_document_builds_empty_map() {
        assert!(build(json!({})).is_ok_and(|m| m.is_empty()));
    }
}
