//! Per-conversation memory: an append-only stack of steps plus
//! conversation-scoped properties.

mod template;

use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::data::{DataItem, keys};
use crate::property::{Property, PropertyEntry, Scope};

pub use template::TemplateMemoryConverter;

/// Default number of previous steps visible to look-back rules.
pub const DEFAULT_LOOKBACK: usize = 10;

/// Keyed data recorded during one conversational turn.
#[derive(Debug, Clone)]
pub struct ConversationStep {
    items: Vec<DataItem>,
}

impl ConversationStep {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Most recently stored item with exactly this key.
    #[must_use]
    pub fn latest_data(&self, key: &str) -> Option<&DataItem> {
        self.items.iter().rev().find(|item| item.key == key)
    }

    /// Every item whose key starts with `prefix`, in storage order.
    #[must_use]
    pub fn all_data(&self, prefix: &str) -> Vec<&DataItem> {
        self.items
            .iter()
            .filter(|item| item.key.starts_with(prefix))
            .collect()
    }

    pub fn store_data(&mut self, item: DataItem) {
        debug!("Storing data item: {}", item.key);
        self.items.push(item);
    }

    /// Text payload of the latest item with this key.
    #[must_use]
    pub fn latest_text(&self, key: &str) -> Option<&str> {
        self.latest_data(key).and_then(|item| item.result.as_text())
    }

    /// Action list of the latest item with this key.
    #[must_use]
    pub fn latest_actions(&self, key: &str) -> Option<&[String]> {
        self.latest_data(key)
            .and_then(|item| item.result.as_actions())
    }

    #[must_use]
    pub fn items(&self) -> &[DataItem] {
        &self.items
    }
}

impl Default for ConversationStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the steps preceding the current one.
///
/// Index 0 is the immediately prior turn.
#[derive(Debug, Clone, Copy)]
pub struct PreviousSteps<'a> {
    steps: &'a [ConversationStep],
}

impl<'a> PreviousSteps<'a> {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn get(self, index: usize) -> Option<&'a ConversationStep> {
        let steps = self.steps;
        let last = steps.len().checked_sub(1)?;
        last.checked_sub(index).and_then(|i| steps.get(i))
    }

    /// Steps from the immediately prior one backwards.
    pub fn iter(self) -> impl DoubleEndedIterator<Item = &'a ConversationStep> {
        self.steps.iter().rev()
    }
}

/// Conversation-scoped property store; last write wins per name.
#[derive(Debug, Clone, Default)]
pub struct ConversationProperties {
    properties: BTreeMap<String, Property>,
}

impl ConversationProperties {
    /// Insert or overwrite a property, returning the replaced one.
    pub fn put(&mut self, property: Property) -> Option<Property> {
        self.properties.insert(property.name.clone(), property)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    pub fn clear(&mut self) {
        self.properties.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Properties declared with the given scope.
    pub fn by_scope(&self, scope: Scope) -> impl Iterator<Item = &Property> {
        self.properties.values().filter(move |p| p.scope == scope)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Memory of one conversation.
///
/// Steps are append-only; the last one is the current, writable step and
/// all earlier ones are exposed read-only through [`PreviousSteps`].
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    conversation_id: Uuid,
    steps: Vec<ConversationStep>,
    lookback: usize,
    properties: ConversationProperties,
}

impl ConversationMemory {
    /// Create a memory whose first step is already open.
    #[must_use]
    pub fn new(lookback: usize) -> Self {
        Self::with_id(Uuid::now_v7(), lookback)
    }

    /// Create a memory for a known conversation id. A `lookback` below 1 is
    /// raised to 1.
    #[must_use]
    pub fn with_id(conversation_id: Uuid, lookback: usize) -> Self {
        Self {
            conversation_id,
            steps: vec![ConversationStep::new()],
            lookback: lookback.max(1),
            properties: ConversationProperties::default(),
        }
    }

    #[must_use]
    pub const fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    #[must_use]
    pub const fn lookback(&self) -> usize {
        self.lookback
    }

    /// Close the current step and open a new one.
    pub fn start_step(&mut self) -> &mut ConversationStep {
        self.steps.push(ConversationStep::new());
        debug!(
            "Conversation {} started step {}",
            self.conversation_id,
            self.steps.len()
        );
        self.current_step_mut()
    }

    #[must_use]
    pub fn current_step(&self) -> &ConversationStep {
        // `steps` always holds at least the step opened by the constructor.
        &self.steps[self.steps.len() - 1]
    }

    pub fn current_step_mut(&mut self) -> &mut ConversationStep {
        let last = self.steps.len() - 1;
        &mut self.steps[last]
    }

    #[must_use]
    pub fn previous_steps(&self) -> PreviousSteps<'_> {
        let current = self.steps.len() - 1;
        let start = current.saturating_sub(self.lookback);
        PreviousSteps {
            steps: &self.steps[start..current],
        }
    }

    /// Number of steps recorded, including the current one.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub const fn conversation_properties(&self) -> &ConversationProperties {
        &self.properties
    }

    pub const fn conversation_properties_mut(&mut self) -> &mut ConversationProperties {
        &mut self.properties
    }

    /// Entries extracted on the current step, if any were written.
    #[must_use]
    pub fn extracted_properties(&self) -> Option<&[PropertyEntry]> {
        self.current_step()
            .latest_data(keys::PROPERTIES_EXTRACTED)
            .and_then(|item| item.result.as_properties())
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}
