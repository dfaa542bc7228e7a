//! Element tree handed to the host for display
//!
//! Blocks never touch a real document. They build a serializable tree of
//! elements the frontend mirrors into its own DOM, and address nodes by id
//! when the frontend reports events or mutations back.

use embed_core::FrameTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Node identifier
pub type NodeId = Uuid;

/// Event handler identifier the host routes back to the block
pub type EventHandler = String;

/// One element of a rendered view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique node id
    pub id: NodeId,
    /// Tag name
    pub tag: String,
    /// CSS classes, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Attributes, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Event name to handler id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub handlers: BTreeMap<String, EventHandler>,
    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with a fresh id
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
            classes: Vec::new(),
            attributes: Vec::new(),
            text: None,
            handlers: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a `div`
    pub fn div() -> Self {
        Self::new("div")
    }

    /// Instantiate a frame template
    pub fn from_frame(frame: &FrameTemplate) -> Self {
        let mut element = Self::new(frame.tag());
        for (name, value) in frame.attributes() {
            if name == "class" {
                element.classes.extend(value.split_whitespace().map(str::to_string));
            } else {
                element.attributes.push((name.clone(), value.clone()));
            }
        }
        element
    }

    /// Add classes; empty names are skipped
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for class in classes {
            self.add_class(class.as_ref());
        }
        self
    }

    /// Add a class
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Set an attribute
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Register a handler for an event
    pub fn on(mut self, event: &str, handler: impl Into<EventHandler>) -> Self {
        self.handlers.insert(event.to_string(), handler.into());
        self
    }

    /// Append a child
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Add a class if not already present
    pub fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Remove a class; returns whether it was present
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        self.classes.len() != before
    }

    /// Whether the element has a class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or replace an attribute
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Depth-first search, including this element
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    /// Mutable depth-first search, including this element
    pub fn find_mut(&mut self, predicate: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(predicate))
    }

    /// First element carrying a class
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.find(&|e: &Element| e.has_class(class))
    }

    /// First element with a tag name
    pub fn find_by_tag(&self, tag: &str) -> Option<&Element> {
        self.find(&|e: &Element| e.tag == tag)
    }
}
