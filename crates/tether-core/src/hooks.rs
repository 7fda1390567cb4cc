// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Hook data model: contexts, results, formats, and extensions

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::chain::{Hook, HookChain, Next, Terminal};

/// Module format tags understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// Host built-in module
    Builtin,
    /// CommonJS module
    CommonJs,
    /// JSON document
    Json,
    /// ECMAScript module
    Module,
    /// WebAssembly module
    Wasm,
}

impl ModuleFormat {
    /// The format's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Builtin => "builtin",
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Json => "json",
            ModuleFormat::Module => "module",
            ModuleFormat::Wasm => "wasm",
        }
    }
}

impl std::fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source payload for a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// Decoded text source
    Text(String),
    /// Raw bytes (required for wasm, valid for every format)
    Bytes(Bytes),
}

impl ModuleSource {
    /// The payload as raw bytes regardless of representation.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ModuleSource::Text(s) => s.as_bytes(),
            ModuleSource::Bytes(b) => b,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<String> for ModuleSource {
    fn from(s: String) -> Self {
        ModuleSource::Text(s)
    }
}

impl From<&str> for ModuleSource {
    fn from(s: &str) -> Self {
        ModuleSource::Text(s.to_string())
    }
}

impl From<Bytes> for ModuleSource {
    fn from(b: Bytes) -> Self {
        ModuleSource::Bytes(b)
    }
}

impl From<Vec<u8>> for ModuleSource {
    fn from(b: Vec<u8>) -> Self {
        ModuleSource::Bytes(Bytes::from(b))
    }
}

/// Metadata accompanying a resolve request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// Active export conditions
    pub conditions: Vec<String>,
    /// Import attributes from the import site
    pub import_attributes: BTreeMap<String, String>,
    /// The requesting module's URL, absent for an entry module
    pub parent_url: Option<String>,
}

impl ResolveContext {
    /// Context for a module imported by `parent_url`.
    pub fn with_parent(parent_url: impl Into<String>) -> Self {
        Self {
            parent_url: Some(parent_url.into()),
            ..Self::default()
        }
    }
}

/// Outcome of a resolve chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The absolute module URL the specifier resolved to
    pub url: String,
    /// Optional format hint for the load chain
    pub format: Option<ModuleFormat>,
    /// Set by a hook that fully handled the request
    pub short_circuit: bool,
}

impl Resolution {
    /// A terminating resolution: the hook fully handled the request.
    pub fn short_circuit(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            short_circuit: true,
        }
    }

    /// Attach a format hint.
    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Metadata accompanying a load request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
    /// Active export conditions
    pub conditions: Vec<String>,
    /// Import attributes from the import site
    pub import_attributes: BTreeMap<String, String>,
    /// Format hint inherited from resolution
    pub format: Option<ModuleFormat>,
}

/// Outcome of a load chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Format of the loaded module
    pub format: ModuleFormat,
    /// Source payload; absent for formats the host materializes itself
    pub source: Option<ModuleSource>,
    /// Set by a hook that fully handled the request
    pub short_circuit: bool,
}

impl LoadOutcome {
    /// A terminating outcome carrying a source payload.
    pub fn short_circuit(format: ModuleFormat, source: impl Into<ModuleSource>) -> Self {
        Self {
            format,
            source: Some(source.into()),
            short_circuit: true,
        }
    }

    /// A terminating outcome with no payload (builtin, commonjs).
    pub fn without_source(format: ModuleFormat) -> Self {
        Self {
            format,
            source: None,
            short_circuit: true,
        }
    }
}

/// A resolve-chain hook object.
pub type DynResolveHook = dyn Hook<ResolveContext, Resolution>;
/// A load-chain hook object.
pub type DynLoadHook = dyn Hook<LoadContext, LoadOutcome>;
/// The composed resolve chain.
pub type ResolveChain = HookChain<ResolveContext, Resolution>;
/// The composed load chain.
pub type LoadChain = HookChain<LoadContext, LoadOutcome>;
/// Delegation capability inside a resolve hook.
pub type NextResolve<'a> = Next<'a, ResolveContext, Resolution>;
/// Delegation capability inside a load hook.
pub type NextLoad<'a> = Next<'a, LoadContext, LoadOutcome>;
/// Host-supplied terminal for resolve dispatch.
pub type ResolveTerminal = dyn Terminal<ResolveContext, Resolution>;
/// Host-supplied terminal for load dispatch.
pub type LoadTerminal = dyn Terminal<LoadContext, LoadOutcome>;

/// One configured chain participant, contributing zero or more hooks.
///
/// Capabilities are explicit options; an extension with neither hook is
/// legal and inert. Extension order within a configuration is significant
/// and preserved.
#[derive(Clone, Default)]
pub struct Extension {
    resolve: Option<Arc<DynResolveHook>>,
    load: Option<Arc<DynLoadHook>>,
}

impl Extension {
    /// An extension contributing no hooks yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute a resolve hook.
    pub fn with_resolve(mut self, hook: impl Hook<ResolveContext, Resolution> + 'static) -> Self {
        self.resolve = Some(Arc::new(hook));
        self
    }

    /// Contribute a load hook.
    pub fn with_load(mut self, hook: impl Hook<LoadContext, LoadOutcome> + 'static) -> Self {
        self.load = Some(Arc::new(hook));
        self
    }

    /// The resolve hook, if contributed.
    pub fn resolve_hook(&self) -> Option<&Arc<DynResolveHook>> {
        self.resolve.as_ref()
    }

    /// The load hook, if contributed.
    pub fn load_hook(&self) -> Option<&Arc<DynLoadHook>> {
        self.load.as_ref()
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("resolve", &self.resolve.is_some())
            .field("load", &self.load.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(ModuleFormat::Module.as_str(), "module");
        assert_eq!(ModuleFormat::Wasm.to_string(), "wasm");
    }

    #[test]
    fn source_conversions() {
        let text = ModuleSource::from("export {}");
        assert_eq!(text.as_bytes(), b"export {}");
        let bytes = ModuleSource::from(vec![0u8, 97, 115, 109]);
        assert_eq!(bytes.len(), 4);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn short_circuit_constructors_set_the_flag() {
        let r = Resolution::short_circuit("https://example.com/a.mjs")
            .with_format(ModuleFormat::Module);
        assert!(r.short_circuit);
        assert_eq!(r.format, Some(ModuleFormat::Module));

        let l = LoadOutcome::short_circuit(ModuleFormat::Json, "{}");
        assert!(l.short_circuit);
        assert_eq!(l.source, Some(ModuleSource::Text("{}".into())));

        let bare = LoadOutcome::without_source(ModuleFormat::Builtin);
        assert!(bare.short_circuit);
        assert!(bare.source.is_none());
    }

    #[test]
    fn entry_context_has_no_parent() {
        assert_eq!(ResolveContext::default().parent_url, None);
        let ctx = ResolveContext::with_parent("https://example.com/a.mjs");
        assert_eq!(ctx.parent_url.as_deref(), Some("https://example.com/a.mjs"));
    }
}
