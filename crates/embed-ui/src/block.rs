//! Embed block
//!
//! [`EmbedTool`] is built once per tool configuration and hands out
//! [`EmbedBlock`]s, one per block in the document. A block owns its record,
//! its view, and its render pipeline; nothing is shared between blocks except
//! the immutable registry.

use crate::host::{BlockApi, Notification};
use crate::mutations::MutationSource;
use crate::quiescence::QuiescenceDetector;
use crate::render::{RenderPipeline, RenderState, View, PASTE_HANDLER, SUBMIT_HANDLER};
use embed_core::{
    builtin_catalog, match_service, match_url, resolve, EmbedRecord, MatchResult, PatternMap,
    Registry, ToolConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Message shown when a link is not recognised
pub const UNSUPPORTED_LINK_MESSAGE: &str = "Unsupported link";

/// Errors from block data assignment
#[derive(Debug, Error)]
pub enum BlockError {
    /// Data is not an object
    #[error("Embed data must be an object, got {0}")]
    InvalidData(&'static str),

    /// Data is an object but does not fit the record shape
    #[error("Malformed embed data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for block operations
pub type Result<T> = std::result::Result<T, BlockError>;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Paste the host intercepted because it matched one of our patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteEvent {
    /// Key of the pattern that matched
    pub key: String,
    /// Pasted text
    pub data: String,
}

/// Event reported from the link input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handler")]
pub enum InputEvent {
    /// Text pasted into the input
    #[serde(rename = "embed:paste")]
    Paste {
        /// Clipboard text
        text: String,
    },
    /// Key pressed in the input
    #[serde(rename = "embed:submit")]
    KeyDown {
        /// Key name, as reported by the frontend
        key: String,
        /// Input contents at the time of the key press
        text: String,
    },
}

impl InputEvent {
    /// Handler id this event is routed by
    pub fn handler(&self) -> &'static str {
        match self {
            InputEvent::Paste { .. } => PASTE_HANDLER,
            InputEvent::KeyDown { .. } => SUBMIT_HANDLER,
        }
    }
}

/// Embed tool, resolved for one configuration
#[derive(Debug, Clone)]
pub struct EmbedTool {
    registry: Arc<Registry>,
    patterns: PatternMap,
    detector: QuiescenceDetector,
}

impl EmbedTool {
    /// Resolve the registry for a configuration
    pub fn new(config: &ToolConfig) -> Self {
        let (registry, patterns) = resolve(builtin_catalog(), config);
        tracing::info!("Embed tool ready with {} services", registry.len());
        Self {
            registry: Arc::new(registry),
            patterns,
            detector: QuiescenceDetector::new(config.ready_delay()),
        }
    }

    /// Resolved services
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Patterns the host should intercept pastes for
    pub fn paste_config(&self) -> &PatternMap {
        &self.patterns
    }

    /// Whether blocks can be shown read-only
    pub fn read_only_supported() -> bool {
        true
    }

    /// Create a block, optionally from saved data
    pub fn create_block(
        &self,
        data: Option<Value>,
        api: Arc<dyn BlockApi>,
        mutations: Arc<dyn MutationSource>,
        read_only: bool,
    ) -> Result<EmbedBlock> {
        let pipeline = RenderPipeline::new(&api.styles(), self.detector, mutations, read_only);
        let mut block = EmbedBlock {
            api,
            registry: Arc::clone(&self.registry),
            data: EmbedRecord::new(),
            view: None,
            pipeline,
        };
        if let Some(data) = data {
            block.update(data)?;
        }
        Ok(block)
    }
}

/// One embed block
pub struct EmbedBlock {
    api: Arc<dyn BlockApi>,
    registry: Arc<Registry>,
    data: EmbedRecord,
    view: Option<View>,
    pipeline: RenderPipeline,
}

impl std::fmt::Debug for EmbedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedBlock")
            .field("data", &self.data)
            .field("state", &self.state())
            .finish()
    }
}

impl EmbedBlock {
    /// Render the block
    ///
    /// The returned view stays current across later updates; a second call
    /// detaches the first view.
    pub fn render(&mut self) -> View {
        let view = self.pipeline.render(&self.data, &self.registry);
        self.view = Some(view.clone());
        view
    }

    /// Merge host-supplied data into the record
    ///
    /// Fails without touching the record when `data` is not an object or
    /// does not fit the record shape.
    pub fn update(&mut self, data: Value) -> Result<()> {
        if !data.is_object() {
            return Err(BlockError::InvalidData(json_kind(&data)));
        }
        let record: EmbedRecord = serde_json::from_value(data)?;
        self.update_record(record);
        Ok(())
    }

    /// Merge a record and re-render if a view exists
    pub fn update_record(&mut self, record: EmbedRecord) {
        self.data.merge(record);
        if let Some(view) = &self.view {
            self.pipeline.rerender(view, &self.data, &self.registry);
        }
    }

    /// Current record, with on-screen caption text read back
    pub fn current(&mut self) -> EmbedRecord {
        if let Some(view) = &self.view {
            let caption_class = self.pipeline.classes().caption.as_str();
            let shown =
                view.with_root(|root| root.find_by_class(caption_class).and_then(|e| e.text.clone()));
            if shown.is_some() {
                self.data.caption = shown;
            }
        }
        self.data.clone()
    }

    /// Record for persistence
    pub fn save(&mut self) -> EmbedRecord {
        self.current()
    }

    /// Handle a paste the host intercepted by pattern
    ///
    /// Ignored in read-only mode.
    pub fn on_paste(&mut self, event: PasteEvent) -> bool {
        if self.pipeline.is_read_only() {
            return false;
        }
        let found = match_service(&event.key, &event.data, &self.registry);
        self.apply_match(found)
    }

    /// Handle an event from the link input
    ///
    /// Returns whether a link was recognised. Key presses other than Enter
    /// are ignored, as is everything in read-only mode.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if self.pipeline.is_read_only() {
            return false;
        }
        let text = match event {
            InputEvent::Paste { text } => text,
            InputEvent::KeyDown { key, text } if key == "Enter" => text,
            InputEvent::KeyDown { .. } => return false,
        };
        let found = match_url(text.trim(), &self.registry);
        self.apply_match(found)
    }

    /// Visible state, if rendered
    pub fn state(&self) -> Option<RenderState> {
        self.view.as_ref().map(View::state)
    }

    /// Whether the block is shown read-only
    pub fn is_read_only(&self) -> bool {
        self.pipeline.is_read_only()
    }

    fn apply_match(&mut self, found: Option<MatchResult>) -> bool {
        match found {
            Some(result) => {
                tracing::debug!("Embedding {} from {}", result.service, result.source);
                self.update_record(result.into());
                true
            }
            None => {
                if let Some(view) = &self.view {
                    if !self.pipeline.show_error(view) {
                        tracing::debug!("Embed shown, skipping input error decoration");
                    }
                }
                self.api.notify(Notification::error(UNSUPPORTED_LINK_MESSAGE));
                false
            }
        }
    }
}
