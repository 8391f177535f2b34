//! SpoilerFree Core Library
//!
//! This crate holds everything the SpoilerFree extension does that does not
//! need browser bindings: page classification, the options bag and its
//! migration, the spoiler-free policy, and the reconciliation engine that
//! drives a page's DOM to match them.
//!
//! # Architecture
//!
//! The engine talks to the page through the [`dom::Dom`] and [`engine::Host`]
//! traits. The `sf-wasm` crate implements them over `web_sys`; tests use the
//! in-memory DOM in [`dom::memory`] (also exposed by the `test-support`
//! feature).
//!
//! # Modules
//!
//! - `duration`: Human-readable durations ("2m", "01h02m03s")
//! - `url`: Allocation-free URL slicing
//! - `platform`: Supported platforms and URL classification
//! - `channel`: Channel identity and its persisted form
//! - `selectors`: Per-platform selector tables
//! - `options`: Typed options bag over the storage map
//! - `migration`: Storage schema migration
//! - `policy`: Spoiler-free state evaluation
//! - `message`: Messages exchanged between extension contexts
//! - `dom`: DOM abstraction and visibility containers
//! - `engine`: Per-tab reconciliation engine
//! - `types`: Shared type definitions

pub mod channel;
pub mod dom;
pub mod duration;
pub mod engine;
pub mod message;
pub mod migration;
pub mod options;
pub mod platform;
pub mod policy;
pub mod selectors;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use channel::{Channel, StoredChannel};
pub use engine::{Engine, EngineConfig, Host};
pub use message::{Message, SendError, TabInfo};
pub use options::{OptionKey, OptionMap, Options, OptionsError};
pub use platform::{classify_url, parse_channel_input, parse_qualified_name, PageInfo, Platform, PLATFORMS};
pub use types::{Concern, PageType, SfmMode, SfmState};
