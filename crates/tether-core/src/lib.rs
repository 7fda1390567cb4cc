// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tether-core
//!
//! Composable resolve/load hook chains for module loading pipelines.
//!
//! A host runtime owns two operations: *resolve* (map a specifier to an
//! absolute module URL) and *load* (map a URL to source and a format
//! tag). This crate lets
//! independently-authored extensions intercept both: extensions form an
//! ordered chain where each hook either fully handles a request or defers
//! to the next, bottoming out in the host's own behavior.
//!
//! ```rust,ignore
//! use tether_core::{HookEngine, ExtensionRegistry, ResolveContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = ExtensionRegistry::new();
//!     tether_http::register(&mut registry);
//!
//!     // Reads TETHER_CONFIG or ./tether.config.json on first use.
//!     let engine = HookEngine::from_env(registry);
//!     let resolved = engine
//!         .resolve("./app.mjs", ResolveContext::default(), &host_resolve)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! The configuration file lists extensions in invocation order:
//!
//! ```json
//! { "extensions": [ { "name": "http" } ] }
//! ```
//!
//! A missing or unreadable configuration degrades to an empty chain (every
//! request reaches the host default); a present-but-malformed one is an
//! error the host should treat as fatal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;

// Re-exports
pub use chain::{terminal_fn, Hook, HookChain, Next, Terminal};
pub use config::{process_config, ExtensionFactory, ExtensionRegistry, LoaderConfig};
pub use engine::{
    ConfigSource, EngineStatus, FileSource, HookEngine, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE,
};
pub use error::{LoaderError, Result};
pub use hooks::{
    Extension, LoadContext, LoadOutcome, LoadTerminal, ModuleFormat, ModuleSource, NextLoad,
    NextResolve, Resolution, ResolveContext, ResolveTerminal,
};

/// Version of the tether hook engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
