//! Schema Compatibility Engine
//!
//! Decides whether a new version of a JSON Schema contract set is backward
//! compatible with the previous one, and which semantic-version bump the
//! release needs.
//!
//! ## Pipeline
//!
//! ```text
//! Corpus::load_dir / Corpus::load_git      (old, new)
//!         │
//!         ▼
//! compatibility::compare  ──►  Vec<ChangeRecord>
//!         │
//!         ▼
//! classify::classify      ──►  Classification { breaking, non_breaking, documentation, has_breaking }
//!         │
//!         ├──► report::render_summary / render_report / render_comment
//!         └──► version::check_bump
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_compat::{classify, compare, Corpus};
//! use serde_json::json;
//!
//! let old = Corpus::from_documents([("user.json", json!({"properties": {"a": {}, "b": {}}}))]);
//! let new = Corpus::from_documents([("user.json", json!({"properties": {"a": {}}}))]);
//!
//! let result = classify(&compare(&old, &new));
//! assert!(result.has_breaking);
//! ```

pub mod change;
pub mod classify;
pub mod compatibility;
pub mod config;
pub mod corpus;
pub mod error;
pub mod policy;
pub mod report;
pub mod version;

pub use change::{ChangeKind, ChangeRecord, Severity};
pub use classify::{classify, Classification};
pub use compatibility::{compare, CompatibilityChecker};
pub use config::{CompatConfig, OutputFormat};
pub use corpus::{Corpus, LoadWarning, SchemaDocument};
pub use error::{CompatError, Result};
pub use policy::{ContentPolicy, PolicyReport, PolicyViolation};
pub use version::{check_bump, BumpLevel, ContractVersion};
