//! # hostmacro-resolver
//!
//! Batched macro resolution for monitoring configuration text.
//!
//! Callers hand over whole batches (texts grouped by host, triggers, items or
//! graphs) and get the same shape back with every resolvable macro replaced.
//! All lookups go through a [`MacroStore`]; each provider answers a batch from
//! one round trip, so the number of storage calls does not grow with the
//! number of texts.
//!
//! ## Quick Start
//!
//! ```rust
//! use hostmacro_resolver::memory::MemoryStore;
//! use hostmacro_resolver::{Item, MacroResolver};
//!
//! let store = MemoryStore::from_json(r#"{
//!     "hosts": [{"host_id": 1, "host": "srv-a", "name": "Server A"}],
//!     "host_macros": [{"host_id": 1, "macro": "{$IF}", "value": "eth0"}]
//! }"#).unwrap();
//!
//! let items = vec![Item {
//!     item_id: 1,
//!     host_id: 1,
//!     key: "net.if.in[{$IF},{HOST.HOST}]".to_string(),
//!     ..Item::default()
//! }];
//! let items = MacroResolver::new(&store).resolve_item_keys(items).unwrap();
//! assert_eq!(items[0].key_expanded, "net.if.in[eth0,srv-a]");
//! ```
//!
//! ## User Macro Precedence
//!
//! For a host, `{$NAME:"ctx"}` resolves to the first of:
//!
//! 1. an exact context definition on the host, then on its templates level by level
//! 2. a matching regex context definition, in the same order
//! 3. the context-less definition, in the same order
//! 4. the same three steps over global macros
//!
//! Anything left over stays as written.
//!
//! ## Module Overview
//!
//! - [`config`] - The resolution config table and resolver settings
//! - [`store`] - Storage rows and the [`MacroStore`] trait
//! - [`memory`] - An in-memory store for fixtures and tests
//! - [`templates`] - Template inheritance graph
//! - [`usermacro`] - User macro inheritance
//! - [`providers`] - Host, interface, history and regsub values
//! - [`resolver`] - The facade and generic text resolution
//! - [`triggers`] - Trigger names, descriptions, URLs and expressions
//! - [`items`] - Item keys, item names and function parameters
//! - [`graphs`] - Graph names with macro functions

pub mod config;
pub mod error;
pub mod graphs;
pub mod items;
pub mod memory;
pub mod providers;
pub mod resolver;
pub mod store;
pub mod templates;
pub mod triggers;
pub mod usermacro;

// Re-export commonly used types
pub use config::{ResolutionConfig, ResolverSettings};
pub use error::{ResolveError, SettingsError, StoreError};
pub use graphs::{Graph, GraphItem};
pub use items::{FunctionParameter, Item};
pub use memory::MemoryStore;
pub use resolver::MacroResolver;
pub use store::MacroStore;
pub use triggers::{resolve_trigger_expression_references, ExpressionOptions, Trigger, TriggerOptions};
pub use usermacro::{resolve_user_macros, ResolvedUserMacros, UserMacroRequest};
