// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Load hook fetching module source over HTTP(S)

use async_trait::async_trait;
use tether_core::hooks::NextLoad;
use tether_core::{Hook, LoadContext, LoadOutcome, ModuleFormat, Result};
use tracing::debug;

use crate::error::HttpLoaderError;
use crate::is_http_url;

/// Module format inferred from a URL's trailing extension.
///
/// Hosts accept custom source only for `json`, `module` and `wasm`, so
/// everything without a better match is treated as a module.
pub fn module_format_for(url: &str) -> ModuleFormat {
    if url.ends_with(".json") {
        ModuleFormat::Json
    } else if url.ends_with(".mjs") {
        ModuleFormat::Module
    } else if url.ends_with(".wasm") {
        ModuleFormat::Wasm
    } else {
        ModuleFormat::Module
    }
}

/// Fetches HTTP(S) module URLs and terminates the load chain with the raw
/// response body.
///
/// The body stays an undecoded byte buffer: wasm requires binary source
/// and a single representation keeps the contract uniform. One fetch per
/// call; nothing is cached here.
pub struct HttpLoad {
    passthrough: bool,
    client: reqwest::Client,
}

impl HttpLoad {
    /// A load hook with its own connection plumbing.
    pub fn new(passthrough: bool) -> Self {
        Self::with_client(passthrough, reqwest::Client::new())
    }

    /// A load hook reusing an existing client.
    pub fn with_client(passthrough: bool, client: reqwest::Client) -> Self {
        Self {
            passthrough,
            client,
        }
    }
}

impl std::fmt::Debug for HttpLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLoad")
            .field("passthrough", &self.passthrough)
            .finish()
    }
}

#[async_trait]
impl Hook<LoadContext, LoadOutcome> for HttpLoad {
    async fn call(
        &self,
        url: String,
        context: LoadContext,
        next: NextLoad<'_>,
    ) -> Result<LoadOutcome> {
        if self.passthrough || !is_http_url(&url) {
            return next.call(url, context).await;
        }

        debug!(%url, "fetching module source");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| HttpLoaderError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpLoaderError::Status {
                url,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| HttpLoaderError::Request {
                url: url.clone(),
                source,
            })?;
        Ok(LoadOutcome::short_circuit(module_format_for(&url), body))
    }
}
