//! Render pipeline
//!
//! Builds the element tree for each block state and drives the
//! loading → ready transition.
//!
//! ```text
//! Empty ──match──▶ Loading ──quiescence──▶ Ready
//!   │                 ▲
//!   └──no match──▶ Error
//! ```
//!
//! Every render rebuilds the whole tree. Replacing a view aborts the ready
//! watch of the tree it replaces, and a watch that still fires for an older
//! tree is ignored.

use crate::dom::{Element, NodeId};
use crate::host::BlockStyles;
use crate::mutations::MutationSource;
use crate::quiescence::QuiescenceDetector;
use embed_core::{EmbedRecord, Registry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handler id for pastes into the link input
pub const PASTE_HANDLER: &str = "embed:paste";

/// Handler id for key presses in the link input; Enter submits
pub const SUBMIT_HANDLER: &str = "embed:submit";

/// Placeholder shown in the empty link input
pub const INPUT_PLACEHOLDER: &str = "Paste a link to embed";

/// Visible state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
    /// No service yet; link input shown
    Empty,
    /// Frame inserted, still settling
    Loading,
    /// Frame settled
    Ready,
    /// Last link was not recognised; link input shown with an error
    Error,
}

/// CSS classes used by the embed block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedClasses {
    /// Editor block class
    pub base: String,
    /// Editor input class
    pub input: String,
    /// Block container
    pub container: String,
    /// Container while loading
    pub container_loading: String,
    /// Preloader shown behind the frame
    pub preloader: String,
    /// Source URL inside the preloader
    pub url: String,
    /// The embedded frame
    pub content: String,
    /// Caption element
    pub caption: String,
    /// Wrapper of the link input
    pub input_holder: String,
    /// Wrapper after an unrecognised link
    pub input_holder_error: String,
    /// The link input itself
    pub input_field: String,
}

impl EmbedClasses {
    /// Combine the editor's classes with the tool's own
    pub fn new(styles: &BlockStyles) -> Self {
        Self {
            base: styles.block.clone(),
            input: styles.input.clone(),
            container: "embed-tool".to_string(),
            container_loading: "embed-tool--loading".to_string(),
            preloader: "embed-tool__preloader".to_string(),
            url: "embed-tool__url".to_string(),
            content: "embed-tool__content".to_string(),
            caption: "embed-tool__caption".to_string(),
            input_holder: "embed-tool__input-holder".to_string(),
            input_holder_error: "embed-tool__input-holder--error".to_string(),
            input_field: "embed-tool__input".to_string(),
        }
    }
}

#[derive(Debug)]
struct Rendered {
    root: Element,
    state: RenderState,
    generation: u64,
}

/// A block's mounted view
///
/// Cloning yields another handle to the same slot. Re-rendering swaps the
/// tree inside the slot, so a handle always shows the current tree; element
/// snapshots taken earlier do not.
#[derive(Debug, Clone)]
pub struct View {
    inner: Arc<RwLock<Rendered>>,
}

impl View {
    fn new(root: Element, state: RenderState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Rendered { root, state, generation: 0 })),
        }
    }

    /// Snapshot of the current tree
    pub fn root(&self) -> Element {
        self.inner.read().root.clone()
    }

    /// Id of the current root node
    pub fn root_id(&self) -> NodeId {
        self.inner.read().root.id
    }

    /// Current state
    pub fn state(&self) -> RenderState {
        self.inner.read().state
    }

    /// Number of times the tree has been replaced
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Inspect the current tree without cloning it
    pub fn with_root<R>(&self, f: impl FnOnce(&Element) -> R) -> R {
        f(&self.inner.read().root)
    }

    #[cfg(test)]
    pub(crate) fn edit_root(&self, f: impl FnOnce(&mut Element)) {
        f(&mut self.inner.write().root)
    }

    fn replace(&self, root: Element, state: RenderState) -> u64 {
        let mut inner = self.inner.write();
        inner.root = root;
        inner.state = state;
        inner.generation += 1;
        inner.generation
    }

    fn finish_loading(&self, generation: u64, loading_class: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation || inner.state != RenderState::Loading {
            tracing::debug!("Ignoring ready signal for replaced view");
            return false;
        }
        inner.root.remove_class(loading_class);
        inner.state = RenderState::Ready;
        true
    }

    fn mark_error(&self, classes: &EmbedClasses) -> bool {
        let mut inner = self.inner.write();
        if !matches!(inner.state, RenderState::Empty | RenderState::Error) {
            return false;
        }
        let holder_class = classes.input_holder.as_str();
        match inner.root.find_mut(&|e: &Element| e.has_class(holder_class)) {
            Some(holder) => holder.add_class(&classes.input_holder_error),
            None => return false,
        }
        inner.state = RenderState::Error;
        true
    }
}

/// Produces views for embed records
pub struct RenderPipeline {
    classes: EmbedClasses,
    detector: QuiescenceDetector,
    mutations: Arc<dyn MutationSource>,
    read_only: bool,
    pending: Option<JoinHandle<()>>,
}

impl RenderPipeline {
    /// Create a pipeline
    pub fn new(
        styles: &BlockStyles,
        detector: QuiescenceDetector,
        mutations: Arc<dyn MutationSource>,
        read_only: bool,
    ) -> Self {
        Self {
            classes: EmbedClasses::new(styles),
            detector,
            mutations,
            read_only,
            pending: None,
        }
    }

    /// Class names in use
    pub fn classes(&self) -> &EmbedClasses {
        &self.classes
    }

    /// Whether inputs are rendered without handlers
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Render a record into a new view
    pub fn render(&mut self, record: &EmbedRecord, registry: &Registry) -> View {
        let (root, state) = self.build(record, registry);
        let view = View::new(root, state);
        self.track_ready(&view, 0);
        view
    }

    /// Rebuild a record into an existing view, replacing its tree
    pub fn rerender(&mut self, view: &View, record: &EmbedRecord, registry: &Registry) {
        let (root, state) = self.build(record, registry);
        let generation = view.replace(root, state);
        self.track_ready(view, generation);
    }

    /// Decorate the link input after an unrecognised link
    ///
    /// Returns false when the view is not showing the link input.
    pub fn show_error(&self, view: &View) -> bool {
        view.mark_error(&self.classes)
    }

    fn build(&self, record: &EmbedRecord, registry: &Registry) -> (Element, RenderState) {
        if record.has_service() {
            (self.build_embed(record, registry), RenderState::Loading)
        } else {
            (self.build_input(), RenderState::Empty)
        }
    }

    fn build_input(&self) -> Element {
        let mut input = Element::div()
            .with_classes([&self.classes.input, &self.classes.input_field])
            .with_attribute("data-placeholder", INPUT_PLACEHOLDER);

        if self.read_only {
            input.set_attribute("contenteditable", "false");
        } else {
            input = input
                .with_attribute("contenteditable", "true")
                .on("paste", PASTE_HANDLER)
                .on("keydown", SUBMIT_HANDLER);
        }

        Element::div()
            .with_classes([&self.classes.base, &self.classes.container])
            .with_child(Element::div().with_class(&self.classes.input_holder).with_child(input))
    }

    fn build_embed(&self, record: &EmbedRecord, registry: &Registry) -> Element {
        let service = record.service.as_deref().unwrap_or_default();
        let embed = record.embed.as_deref().unwrap_or_default();
        let source = record.source.as_deref().unwrap_or_default();

        let frame = match registry.get(service) {
            Some(definition) => Element::from_frame(&definition.html.with_src(embed)),
            None => {
                tracing::warn!("Service {} is not registered, using a bare frame", service);
                Element::new("iframe").with_attribute("src", embed)
            }
        };

        let preloader = Element::div()
            .with_class(&self.classes.preloader)
            .with_child(Element::div().with_class(&self.classes.url).with_text(source));

        Element::div()
            .with_classes([
                &self.classes.base,
                &self.classes.container,
                &self.classes.container_loading,
            ])
            .with_child(preloader)
            .with_child(frame.with_class(&self.classes.content))
    }

    fn track_ready(&mut self, view: &View, generation: u64) {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        if view.state() != RenderState::Loading {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime; embed will stay in loading state");
                return;
            }
        };

        let ready = self.detector.watch(self.mutations.as_ref(), view.root_id());
        let view = view.clone();
        let loading_class = self.classes.container_loading.clone();
        self.pending = Some(runtime.spawn(async move {
            ready.await;
            if view.finish_loading(generation, &loading_class) {
                tracing::debug!("Embed ready");
            }
        }));
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
