// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resolve hook for HTTP(S) module specifiers

use async_trait::async_trait;
use tether_core::hooks::NextResolve;
use tether_core::{Hook, Resolution, ResolveContext, Result};
use url::Url;

use crate::{is_http_url, is_relative};

/// Resolves HTTP(S) specifiers and relative specifiers whose parent is
/// network-addressed.
///
/// Everything else delegates to the rest of the chain, with one twist: a
/// bare module name (or absolute local path) following a network-addressed
/// parent delegates with the parent cleared, so local resolution treats it
/// as an entry-level specifier. Local module-name resolution is undefined
/// relative to a network URL.
#[derive(Debug, Clone)]
pub struct HttpResolve {
    passthrough: bool,
}

impl HttpResolve {
    /// A resolve hook; `passthrough` disables all interception (for hosts
    /// whose native network-import support is active).
    pub fn new(passthrough: bool) -> Self {
        Self { passthrough }
    }
}

#[async_trait]
impl Hook<ResolveContext, Resolution> for HttpResolve {
    async fn call(
        &self,
        specifier: String,
        mut context: ResolveContext,
        next: NextResolve<'_>,
    ) -> Result<Resolution> {
        if self.passthrough {
            return next.call(specifier, context).await;
        }

        if is_http_url(&specifier) {
            return Ok(Resolution::short_circuit(specifier));
        }

        // A non-network parent means this request is none of our business;
        // keep the parent in the context so local resolution proceeds as
        // if this extension were absent.
        let Some(parent) = context.parent_url.clone().filter(|p| is_http_url(p)) else {
            return next.call(specifier, context).await;
        };

        if is_relative(&specifier) {
            let resolved = Url::parse(&parent)
                .and_then(|base| base.join(&specifier))
                .map_err(|err| {
                    anyhow::anyhow!("cannot resolve {specifier} against {parent}: {err}")
                })?;
            return Ok(Resolution::short_circuit(resolved.as_str()));
        }

        // Bare name or absolute local path: resolve as an entry-level
        // specifier, never relative to a network URL.
        context.parent_url = None;
        next.call(specifier, context).await
    }
}
