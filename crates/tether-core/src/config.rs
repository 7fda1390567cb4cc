// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration validation and chain building
//!
//! A raw configuration is a JSON document:
//!
//! ```json
//! {
//!   "extensions": [
//!     { "name": "http", "options": {} }
//!   ]
//! }
//! ```
//!
//! Each entry names a factory in the [`ExtensionRegistry`]; the validated
//! sequence is kept verbatim and both hook chains are composed once, in
//! configured order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::chain::HookChain;
use crate::error::{LoaderError, Result};
use crate::hooks::{
    Extension, LoadChain, LoadContext, LoadOutcome, LoadTerminal, Resolution, ResolveChain,
    ResolveContext, ResolveTerminal,
};

/// Builds an [`Extension`] from a configuration entry's options.
pub trait ExtensionFactory: Send + Sync {
    /// Construct the extension. Refusing bad options is a configuration
    /// defect and fails validation.
    fn build(&self, options: &Value) -> anyhow::Result<Extension>;
}

impl<F> ExtensionFactory for F
where
    F: Fn(&Value) -> anyhow::Result<Extension> + Send + Sync,
{
    fn build(&self, options: &Value) -> anyhow::Result<Extension> {
        self(options)
    }
}

/// Named extension factories available to a configuration.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    factories: HashMap<String, Arc<dyn ExtensionFactory>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: impl ExtensionFactory + 'static) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExtensionFactory>> {
        self.factories.get(name)
    }

    /// Registered names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A validated configuration with its composed chains.
///
/// Chains are built once at construction and reused for every dispatch.
pub struct LoaderConfig {
    extensions: Vec<Extension>,
    resolve_chain: ResolveChain,
    load_chain: LoadChain,
}

impl LoaderConfig {
    /// Compose a configuration from an ordered extension sequence.
    pub fn new(extensions: Vec<Extension>) -> Self {
        let resolve_chain = HookChain::new(
            extensions
                .iter()
                .filter_map(|ext| ext.resolve_hook().cloned())
                .collect(),
        );
        let load_chain = HookChain::new(
            extensions
                .iter()
                .filter_map(|ext| ext.load_hook().cloned())
                .collect(),
        );
        Self {
            extensions,
            resolve_chain,
            load_chain,
        }
    }

    /// A configuration with no extensions: every dispatch reaches the
    /// host terminal directly.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The validated extension sequence, in configured order.
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// The composed resolve chain.
    pub fn resolve_chain(&self) -> &ResolveChain {
        &self.resolve_chain
    }

    /// The composed load chain.
    pub fn load_chain(&self) -> &LoadChain {
        &self.load_chain
    }

    /// Dispatch one resolve request through the chain.
    pub async fn resolve(
        &self,
        specifier: impl Into<String>,
        context: ResolveContext,
        host: &ResolveTerminal,
    ) -> Result<Resolution> {
        self.resolve_chain.dispatch(specifier, context, host).await
    }

    /// Dispatch one load request through the chain.
    pub async fn load(
        &self,
        url: impl Into<String>,
        context: LoadContext,
        host: &LoadTerminal,
    ) -> Result<LoadOutcome> {
        self.load_chain.dispatch(url, context, host).await
    }
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("extensions", &self.extensions.len())
            .field("resolve_hooks", &self.resolve_chain.len())
            .field("load_hooks", &self.load_chain.len())
            .finish()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate a raw configuration and compose its chains.
///
/// `origin` identifies the configuration source in diagnostics. Every
/// violation is reported as its own [`LoaderError`] variant; the caller
/// decides whether a defect is fatal to the process.
pub fn process_config(
    raw: &Value,
    origin: &str,
    registry: &ExtensionRegistry,
) -> Result<LoaderConfig> {
    let Some(root) = raw.as_object() else {
        return Err(LoaderError::ConfigNotObject {
            origin: origin.to_string(),
        });
    };

    let Some(entries) = root.get("extensions").and_then(Value::as_array) else {
        return Err(LoaderError::ExtensionListMissing {
            origin: origin.to_string(),
        });
    };

    let mut extensions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        // Arrays are rejected separately from other non-objects: a bare
        // list where an entry object belongs is a common authoring mistake.
        if entry.is_array() {
            return Err(LoaderError::ExtensionIsArray {
                origin: origin.to_string(),
                index,
            });
        }
        let Some(fields) = entry.as_object() else {
            return Err(LoaderError::ExtensionNotObject {
                origin: origin.to_string(),
                index,
                found: json_type_name(entry),
            });
        };

        let Some(name) = fields.get("name").and_then(Value::as_str) else {
            return Err(LoaderError::ExtensionUnnamed {
                origin: origin.to_string(),
                index,
            });
        };

        let Some(factory) = registry.get(name) else {
            return Err(LoaderError::UnknownExtension {
                origin: origin.to_string(),
                index,
                name: name.to_string(),
            });
        };

        let options = fields.get("options").unwrap_or(&Value::Null);
        let extension =
            factory
                .build(options)
                .map_err(|err| LoaderError::ExtensionBuild {
                    origin: origin.to_string(),
                    index,
                    name: name.to_string(),
                    reason: err.to_string(),
                })?;
        extensions.push(extension);
    }

    Ok(LoaderConfig::new(extensions))
}
