// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tether-http
//!
//! Network module extension for the tether hook engine: resolves HTTP(S)
//! specifiers (and relative specifiers with network-addressed parents) and
//! loads module source by fetching it.
//!
//! ```rust,ignore
//! let mut registry = tether_core::ExtensionRegistry::new();
//! tether_http::register(&mut registry);
//! let engine = tether_core::HookEngine::from_env(registry);
//! ```
//!
//! When the host process is started with `--experimental-network-imports`
//! its own network-import support is active and this extension steps aside
//! entirely, delegating every request unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod load;
pub mod resolve;

use std::sync::LazyLock;

use serde::Deserialize;
use serde_json::Value;
use tether_core::{Extension, ExtensionRegistry};

// Re-exports
pub use error::HttpLoaderError;
pub use load::{module_format_for, HttpLoad};
pub use resolve::HttpResolve;

/// Name this extension registers under.
pub const EXTENSION_NAME: &str = "http";

/// Process argument that activates the host's native network imports.
pub const NETWORK_IMPORT_FLAG: &str = "--experimental-network-imports";

static NATIVE_NETWORK_IMPORTS: LazyLock<bool> =
    LazyLock::new(|| std::env::args().any(|arg| arg == NETWORK_IMPORT_FLAG));

/// Whether the host's native network-import support is active.
///
/// Inspected once, at first use; when true the extension must not
/// intercept anything or requests would be handled twice.
pub fn native_network_imports() -> bool {
    *NATIVE_NETWORK_IMPORTS
}

pub(crate) fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

pub(crate) fn is_relative(s: &str) -> bool {
    s.starts_with("./") || s.starts_with("../")
}

/// The extension with both hooks, honoring the process-level flag.
pub fn extension() -> Extension {
    extension_with(native_network_imports())
}

/// The extension with an explicit passthrough setting.
pub fn extension_with(passthrough: bool) -> Extension {
    Extension::new()
        .with_resolve(HttpResolve::new(passthrough))
        .with_load(HttpLoad::new(passthrough))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HttpOptions {
    /// Overrides the process-level flag when set.
    passthrough: Option<bool>,
}

/// Register this extension's factory under [`EXTENSION_NAME`].
pub fn register(registry: &mut ExtensionRegistry) {
    registry.register(EXTENSION_NAME, |options: &Value| {
        let options: HttpOptions = match options {
            Value::Null => HttpOptions::default(),
            other => serde_json::from_value(other.clone())?,
        };
        Ok(extension_with(
            options.passthrough.unwrap_or_else(native_network_imports),
        ))
    });
}
