// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lazy configuration loading and the host-facing entry points
//!
//! A [`HookEngine`] loads its configuration on first use, builds the hook
//! chains once, and caches them for the life of the process. Loading the
//! configuration may itself travel through the host's module pipeline, so
//! while the load is in flight every resolve/load request bypasses the
//! chains and goes straight to the host terminal; otherwise the engine
//! would recurse into its own bootstrap.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::chain::Terminal;
use crate::config::{process_config, ExtensionRegistry, LoaderConfig};
use crate::error::{LoaderError, Result};
use crate::hooks::{
    LoadContext, LoadOutcome, LoadTerminal, Resolution, ResolveContext, ResolveTerminal,
};

/// Environment variable naming the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TETHER_CONFIG";

/// Conventional configuration file name in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tether.config.json";

/// Where a raw configuration comes from.
///
/// The engine fetches through this seam so hosts can route the fetch
/// through their own module pipeline; the engine's reentrancy guard makes
/// that safe.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Identifier used in diagnostics (a path, URL, or label).
    fn describe(&self) -> String;

    /// Obtain the raw configuration document.
    ///
    /// Failures here are availability problems, not shape defects: the
    /// engine degrades to an empty configuration instead of failing.
    async fn fetch(&self) -> anyhow::Result<Value>;
}

/// Reads the configuration from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// A source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional source: `TETHER_CONFIG` if set (absolute, or
    /// joined to the working directory), else `tether.config.json` in the
    /// working directory.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = match std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
            Some(configured) if configured.is_absolute() => configured,
            Some(configured) => cwd.join(configured),
            None => cwd.join(DEFAULT_CONFIG_FILE),
        };
        Self { path }
    }

    /// The file path this source reads.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> anyhow::Result<Value> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Observable lifecycle of an engine's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// No load attempted yet
    Uninitialized,
    /// A load is in flight; requests bypass the chains
    Loading,
    /// Configuration loaded and chains built
    Ready,
    /// Configuration was unavailable; running with the empty configuration
    ReadyFallback,
}

enum EngineState {
    Uninitialized,
    Loading,
    Ready(Arc<LoaderConfig>),
    ReadyFallback(Arc<LoaderConfig>),
}

/// The host-facing hook engine.
///
/// Owns the configuration lifecycle and dispatches resolve/load requests
/// through the composed chains. One engine serves a whole process; the
/// configuration is loaded at most once and never reloaded.
pub struct HookEngine {
    state: RwLock<EngineState>,
    init: tokio::sync::Mutex<()>,
    source: Arc<dyn ConfigSource>,
    registry: ExtensionRegistry,
}

impl HookEngine {
    /// An engine loading from `source` with factories from `registry`.
    pub fn new(source: impl ConfigSource + 'static, registry: ExtensionRegistry) -> Self {
        Self::with_source(Arc::new(source), registry)
    }

    /// As [`HookEngine::new`], for an already-shared source.
    pub fn with_source(source: Arc<dyn ConfigSource>, registry: ExtensionRegistry) -> Self {
        Self {
            state: RwLock::new(EngineState::Uninitialized),
            init: tokio::sync::Mutex::new(()),
            source,
            registry,
        }
    }

    /// An engine wired to the conventional file location.
    pub fn from_env(registry: ExtensionRegistry) -> Self {
        Self::new(FileSource::from_env(), registry)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EngineStatus {
        match &*self.state.read() {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Loading => EngineStatus::Loading,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::ReadyFallback(_) => EngineStatus::ReadyFallback,
        }
    }

    fn is_loading(&self) -> bool {
        matches!(&*self.state.read(), EngineState::Loading)
    }

    fn cached(&self) -> Option<Arc<LoaderConfig>> {
        match &*self.state.read() {
            EngineState::Ready(config) | EngineState::ReadyFallback(config) => {
                Some(Arc::clone(config))
            }
            _ => None,
        }
    }

    /// The active configuration, loading it on first use.
    ///
    /// A source that cannot produce a document at all (missing file,
    /// unreadable, unparseable) degrades to the empty configuration with a
    /// warning. A document with a malformed shape is returned as an error;
    /// hosts conventionally treat that as fatal
    /// ([`LoaderError::is_config_shape`]).
    pub async fn config(&self) -> Result<Arc<LoaderConfig>> {
        if let Some(config) = self.cached() {
            return Ok(config);
        }

        let _guard = self.init.lock().await;
        if let Some(config) = self.cached() {
            return Ok(config);
        }

        // The Loading state must be visible before the fetch suspends, so
        // requests triggered by the fetch itself observe it and bypass.
        *self.state.write() = EngineState::Loading;

        match self.load_from_source().await {
            Ok(config) => {
                let config = Arc::new(config);
                debug!(
                    extensions = config.extensions().len(),
                    "loader configuration ready"
                );
                *self.state.write() = EngineState::Ready(Arc::clone(&config));
                Ok(config)
            }
            Err(err) if err.is_config_shape() => {
                *self.state.write() = EngineState::Uninitialized;
                Err(err)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "continuing without loader configuration; requests delegate to host defaults"
                );
                let config = Arc::new(LoaderConfig::empty());
                *self.state.write() = EngineState::ReadyFallback(Arc::clone(&config));
                Ok(config)
            }
        }
    }

    async fn load_from_source(&self) -> Result<LoaderConfig> {
        let origin = self.source.describe();
        let raw = self
            .source
            .fetch()
            .await
            .map_err(|err| LoaderError::ConfigUnavailable {
                origin: origin.clone(),
                reason: err.to_string(),
            })?;
        process_config(&raw, &origin, &self.registry)
    }

    /// Replace the configuration from a pending computation.
    ///
    /// The value is validated like any other configuration and, on
    /// success, replaces the cache for subsequent calls. This coexists
    /// with lazy auto-loading: whichever path settles last wins, and no
    /// ordering is guaranteed between the two under concurrent use.
    pub async fn set_config<F>(&self, pending: F) -> Result<Arc<LoaderConfig>>
    where
        F: Future<Output = anyhow::Result<Value>> + Send,
    {
        let raw = pending
            .await
            .map_err(|err| LoaderError::ConfigUnavailable {
                origin: "supplied configuration".to_string(),
                reason: err.to_string(),
            })?;
        let config = Arc::new(process_config(
            &raw,
            "supplied configuration",
            &self.registry,
        )?);
        *self.state.write() = EngineState::Ready(Arc::clone(&config));
        Ok(config)
    }

    /// Resolve a specifier through the configured chain.
    ///
    /// `host` is the runtime's own resolution, used as the chain terminal.
    /// While the configuration itself is still loading it is called
    /// directly and the chain is bypassed.
    pub async fn resolve(
        &self,
        specifier: &str,
        context: ResolveContext,
        host: &ResolveTerminal,
    ) -> Result<Resolution> {
        if self.is_loading() {
            return host.call(specifier.to_string(), context).await;
        }
        let config = self.config().await?;
        config.resolve(specifier, context, host).await
    }

    /// Load a module URL through the configured chain.
    ///
    /// Same bypass rule as [`HookEngine::resolve`] while the configuration
    /// is loading.
    pub async fn load(
        &self,
        url: &str,
        context: LoadContext,
        host: &LoadTerminal,
    ) -> Result<LoadOutcome> {
        if self.is_loading() {
            return host.call(url.to_string(), context).await;
        }
        let config = self.config().await?;
        config.load(url, context, host).await
    }
}

impl std::fmt::Debug for HookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEngine")
            .field("status", &self.status())
            .field("source", &self.source.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{terminal_fn, Hook, Next};
    use crate::hooks::Extension;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    struct Hijack;

    #[async_trait]
    impl Hook<ResolveContext, Resolution> for Hijack {
        async fn call(
            &self,
            specifier: String,
            _context: ResolveContext,
            _next: Next<'_, ResolveContext, Resolution>,
        ) -> Result<Resolution> {
            Ok(Resolution::short_circuit(format!("hijacked:{specifier}")))
        }
    }

    fn hijack_registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register("hijack", |_options: &Value| {
            Ok(Extension::new().with_resolve(Hijack))
        });
        registry
    }

    fn hijack_config() -> Value {
        json!({ "extensions": [{ "name": "hijack" }] })
    }

    fn host_resolve() -> impl Terminal<ResolveContext, Resolution> {
        terminal_fn(|specifier: String, _context: ResolveContext| async move {
            Ok(Resolution {
                url: format!("host:{specifier}"),
                format: None,
                short_circuit: false,
            })
        })
    }

    struct CountingSource {
        raw: Value,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn new(raw: Value) -> Arc<Self> {
            Arc::new(Self {
                raw,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ConfigSource for CountingSource {
        fn describe(&self) -> String {
            "counting.config.json".to_string()
        }

        async fn fetch(&self) -> anyhow::Result<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            // Yield once so concurrent first uses really overlap.
            tokio::task::yield_now().await;
            Ok(self.raw.clone())
        }
    }

    #[tokio::test]
    async fn missing_file_degrades_to_host_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let engine = HookEngine::new(
            FileSource::new(dir.path().join("absent.config.json")),
            hijack_registry(),
        );

        let host = host_resolve();
        let resolved = engine
            .resolve("./a.mjs", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(resolved.url, "host:./a.mjs");
        assert_eq!(engine.status(), EngineStatus::ReadyFallback);
    }

    #[tokio::test]
    async fn unparseable_file_degrades_to_host_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "not json at all {").unwrap();
        let engine = HookEngine::new(FileSource::new(&path), hijack_registry());

        let host = host_resolve();
        let resolved = engine
            .resolve("./a.mjs", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(resolved.url, "host:./a.mjs");
        assert_eq!(engine.status(), EngineStatus::ReadyFallback);
    }

    #[tokio::test]
    async fn malformed_shape_is_surfaced_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, r#"{ "extensions": 42 }"#).unwrap();
        let engine = HookEngine::new(FileSource::new(&path), hijack_registry());

        let host = host_resolve();
        let err = engine
            .resolve("./a.mjs", ResolveContext::default(), &host)
            .await
            .unwrap_err();
        assert!(err.is_config_shape());
        assert_eq!(engine.status(), EngineStatus::Uninitialized);
    }

    #[tokio::test]
    async fn configured_extension_intercepts_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, hijack_config().to_string()).unwrap();
        let engine = HookEngine::new(FileSource::new(&path), hijack_registry());

        let host = host_resolve();
        let resolved = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(resolved.url, "hijacked:lodash");
        assert_eq!(engine.status(), EngineStatus::Ready);
    }

    #[tokio::test]
    async fn repeated_calls_are_idempotent_and_fetch_once() {
        let source = CountingSource::new(hijack_config());
        let engine = HookEngine::with_source(source.clone(), hijack_registry());

        let host = host_resolve();
        let first = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        let second = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_use_loads_once() {
        let source = CountingSource::new(hijack_config());
        let engine = HookEngine::with_source(source.clone(), hijack_registry());

        let host = host_resolve();
        let (a, b) = tokio::join!(
            engine.resolve("a", ResolveContext::default(), &host),
            engine.resolve("b", ResolveContext::default(), &host),
        );
        assert_eq!(a.unwrap().url, "hijacked:a");
        assert_eq!(b.unwrap().url, "hijacked:b");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    // A source whose fetch re-enters the engine, the way importing a
    // configuration module through the host pipeline would.
    struct ReentrantSource {
        engine: OnceLock<Arc<HookEngine>>,
        inner: Mutex<Option<Resolution>>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ConfigSource for ReentrantSource {
        fn describe(&self) -> String {
            "reentrant.config.json".to_string()
        }

        async fn fetch(&self) -> anyhow::Result<Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let engine = Arc::clone(self.engine.get().expect("engine installed"));
            let host = terminal_fn(|specifier: String, _context: ResolveContext| async move {
                Ok(Resolution {
                    url: format!("host:{specifier}"),
                    format: None,
                    short_circuit: false,
                })
            });
            let resolved = engine
                .resolve("./nested.mjs", ResolveContext::default(), &host)
                .await?;
            *self.inner.lock() = Some(resolved);
            Ok(hijack_config())
        }
    }

    #[tokio::test]
    async fn requests_during_config_load_bypass_the_chain() {
        let source = Arc::new(ReentrantSource {
            engine: OnceLock::new(),
            inner: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        });
        let engine = Arc::new(HookEngine::with_source(
            source.clone(),
            hijack_registry(),
        ));
        source.engine.set(Arc::clone(&engine)).ok().unwrap();

        let host = host_resolve();
        let outer = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();

        // The nested request saw exactly the host default, not the chain,
        // and did not trigger a second fetch.
        let inner = source.inner.lock().clone().unwrap();
        assert_eq!(inner.url, "host:./nested.mjs");
        assert!(!inner.short_circuit);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        // The outer request ran through the freshly configured chain.
        assert_eq!(outer.url, "hijacked:lodash");
        assert_eq!(engine.status(), EngineStatus::Ready);
    }

    #[tokio::test]
    async fn set_config_replaces_the_cached_configuration() {
        let source = CountingSource::new(json!({ "extensions": [] }));
        let engine = HookEngine::with_source(source.clone(), hijack_registry());

        let host = host_resolve();
        let before = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(before.url, "host:lodash");

        engine
            .set_config(async { Ok(hijack_config()) })
            .await
            .unwrap();

        let after = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(after.url, "hijacked:lodash");
        assert_eq!(engine.status(), EngineStatus::Ready);
    }

    #[tokio::test]
    async fn failed_set_config_leaves_the_cache_alone() {
        let source = CountingSource::new(hijack_config());
        let engine = HookEngine::with_source(source, hijack_registry());

        let host = host_resolve();
        engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();

        let err = engine
            .set_config(async { Err(anyhow::anyhow!("upstream refused")) })
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::ConfigUnavailable { .. }));

        let still = engine
            .resolve("lodash", ResolveContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(still.url, "hijacked:lodash");
    }

    #[tokio::test]
    async fn malformed_set_config_is_a_shape_error() {
        let source = CountingSource::new(json!({ "extensions": [] }));
        let engine = HookEngine::with_source(source, hijack_registry());

        let err = engine
            .set_config(async { Ok(json!({ "extensions": [["http"]] })) })
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::ExtensionIsArray { index: 0, .. }));
    }

    #[test]
    fn file_source_env_resolution() {
        // Relative env values resolve against the working directory.
        let source = FileSource::new("relative/tether.config.json");
        assert_eq!(
            source.path(),
            std::path::Path::new("relative/tether.config.json")
        );
        assert!(source.describe().contains("tether.config.json"));
    }
}
