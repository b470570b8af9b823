//! Sequence items: one located-template action each

use super::error::ConfigError;
use super::types::ActionKind;
use crate::template_matching::Template;
use image::DynamicImage;
use std::ops::Index;

pub const DEFAULT_CLICK_OFFSET: (f32, f32) = (0.5, 0.5);

/// One automation step.
///
/// All defaults are applied here at construction; every setter re-checks
/// the invariants so an `Item` is always valid once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    template: Template,
    action: ActionKind,
    delay_ms: u64,
    interrupt_on_fail: bool,
    enabled: bool,
    click_offset: (f32, f32),
    alias: Option<String>,
}

impl Item {
    /// Single click at the template center, no delay, enabled, no interrupt
    pub fn new(template: Template) -> Self {
        Self {
            template,
            action: ActionKind::default(),
            delay_ms: 0,
            interrupt_on_fail: false,
            enabled: true,
            click_offset: DEFAULT_CLICK_OFFSET,
            alias: None,
        }
    }

    /// Build from encoded image bytes (PNG, JPEG, ...)
    pub fn from_image_bytes(bytes: Vec<u8>) -> Result<Self, ConfigError> {
        let template =
            Template::from_bytes(bytes).map_err(|source| ConfigError::TemplateDecode { source })?;
        Ok(Self::new(template))
    }

    /// Build from pixels already in memory, e.g. a crop of a screenshot
    pub fn from_image(image: &DynamicImage) -> Result<Self, ConfigError> {
        let template =
            Template::from_image(image).map_err(|source| ConfigError::TemplateEncode { source })?;
        Ok(Self::new(template))
    }

    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = action;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_interrupt_on_fail(mut self, interrupt: bool) -> Self {
        self.interrupt_on_fail = interrupt;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_click_offset(mut self, x: f32, y: f32) -> Result<Self, ConfigError> {
        self.set_click_offset(x, y)?;
        Ok(self)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn interrupt_on_fail(&self) -> bool {
        self.interrupt_on_fail
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn click_offset(&self) -> (f32, f32) {
        self.click_offset
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Alias if set, otherwise a positional name
    pub fn display_name(&self, index: usize) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => format!("item-{}", index),
        }
    }

    pub fn set_template(&mut self, template: Template) {
        self.template = template;
    }

    pub fn set_action(&mut self, action: ActionKind) {
        self.action = action;
    }

    pub fn set_delay_ms(&mut self, delay_ms: u64) {
        self.delay_ms = delay_ms;
    }

    /// Signed variant for values coming from untyped sources
    pub fn set_delay_ms_signed(&mut self, delay: i64) -> Result<(), ConfigError> {
        let delay_ms = u64::try_from(delay).map_err(|_| ConfigError::NegativeDelay { delay })?;
        self.delay_ms = delay_ms;
        Ok(())
    }

    pub fn set_interrupt_on_fail(&mut self, interrupt: bool) {
        self.interrupt_on_fail = interrupt;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_alias(&mut self, alias: Option<String>) {
        self.alias = alias;
    }

    pub fn set_click_offset(&mut self, x: f32, y: f32) -> Result<(), ConfigError> {
        let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(x) || !in_range(y) {
            return Err(ConfigError::OffsetOutOfRange { x, y });
        }
        self.click_offset = (x, y);
        Ok(())
    }
}

/// Ordered list of items as produced by the editor.
///
/// The runner takes its own copy at start, so edits here never reach an
/// active run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    items: Vec<Item>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Insert at `index`, clamped to the end
    pub fn insert(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub fn remove(&mut self, index: usize) -> Option<Item> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Move the item at `from` so it ends up at position `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Item> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

impl From<Vec<Item>> for Sequence {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl FromIterator<Item> for Sequence {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Sequence {
    type Output = Item;

    fn index(&self, index: usize) -> &Item {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
