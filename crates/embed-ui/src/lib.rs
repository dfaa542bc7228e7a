//! Editor block for embedded content
//!
//! Wraps the matcher and registry from `embed-core` in an editor block:
//! a serializable element tree for the host to display, the
//! empty → loading → ready state machine, and ready detection by mutation
//! quiescence.
//!
//! The host supplies two things: a [`BlockApi`] for class names and
//! notifications, and a [`MutationSource`] reporting changes it observes
//! under rendered views.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod dom;
pub mod host;
pub mod mutations;
pub mod quiescence;
pub mod render;

pub use block::{BlockError, EmbedBlock, EmbedTool, InputEvent, PasteEvent, UNSUPPORTED_LINK_MESSAGE};
pub use dom::{Element, NodeId};
pub use host::{BlockApi, BlockStyles, Notification, NotificationStyle};
pub use mutations::{MutationBatch, MutationHub, MutationKind, MutationRecord, MutationSource};
pub use quiescence::QuiescenceDetector;
pub use render::{RenderPipeline, RenderState, View};
