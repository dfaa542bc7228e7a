//! Embed tool
//!
//! Link embedding for a block-based editor. Re-exports the core matcher
//! and registry along with the editor block.

#![warn(missing_docs)]

pub use embed_core;
pub use embed_ui;

pub use embed_core::{EmbedRecord, ServiceConfig, ToolConfig};
pub use embed_ui::{
    BlockApi, EmbedBlock, EmbedTool, InputEvent, MutationHub, MutationSource, PasteEvent,
    RenderState, View,
};
