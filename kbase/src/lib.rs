//! # kbase
//!
//! Persistence layer for a personal knowledge base: profile data, projects,
//! goals, career records, business notes and a daily journal, stored as a
//! tree of JSON and markdown documents.
//!
//! ## Features
//!
//! - **Document stores**: a local directory, or a remote versioned content
//!   API with compare-and-swap writes
//! - **Typed records**: one struct per record type, with sparse patches
//! - **Partial updates**: add, patch, remove and move records in collection
//!   documents through read-modify-write
//! - **Journal**: frontmatter entries, recency listing, keyword search and
//!   story extraction
//! - **Tools**: named JSON operations for an assistant to call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kbase::records::{RecordKind, Skill, SkillLevel};
//! use kbase::{LocalBackend, PartialUpdateEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> kbase::Result<()> {
//! let store = Arc::new(LocalBackend::new("/home/me/knowledge-base"));
//! let engine = PartialUpdateEngine::new(store);
//!
//! let path = RecordKind::Skill.document_path()?;
//! engine
//!     .add_keyed(&path, "caching", Skill::new("backend", SkillLevel::Adept))
//!     .await?;
//! # Ok(())
//! # }
//! ```

/// Shared helpers
pub mod common;

/// Document codecs
pub mod codec;

/// Configuration loading
pub mod config;

/// Read-modify-write over collection documents
pub mod engine;

/// Error types
pub mod error;

/// Daily journal
pub mod journal;

/// Typed record schema
pub mod records;

/// Query to topic routing
pub mod routing;

/// Document store backends
pub mod store;

/// Named tool operations
pub mod tools;

pub use codec::{FrontmatterDocument, MetaValue, Metadata};
pub use config::{BackendKind, KbConfig};
pub use engine::PartialUpdateEngine;
pub use error::{KbError, Result};
pub use journal::{JournalEntry, JournalIndex, SearchHit, SearchQuery, StoryCandidate};
pub use routing::{Topic, TopicRouter};
pub use store::{
    DocumentPath, DocumentStore, HttpContentApi, LocalBackend, Precondition, RemoteVersionedBackend,
    RetryPolicy, Revision,
};
pub use tools::{ToolContext, ToolRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
