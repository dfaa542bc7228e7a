//! Core logic for the embed tool
//!
//! This crate recognises pasted links to external content providers and
//! turns them into embeddable frame addresses. It owns the built-in service
//! catalog, the resolution of user configuration into a registry, URL
//! matching, and the saved record shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dimension;
pub mod matcher;
pub mod record;
pub mod registry;
pub mod services;
pub mod template;

pub use config::{ServiceConfig, ServiceSetting, ToolConfig, DEFAULT_READY_DELAY_MS};
pub use dimension::Dimension;
pub use matcher::{match_service, match_url, unwrap_iframe, MatchResult};
pub use record::EmbedRecord;
pub use registry::{resolve, PatternMap, Registry};
pub use services::{builtin_catalog, IdExtractor, ServiceCatalog, ServiceDefinition};
pub use template::FrameTemplate;
