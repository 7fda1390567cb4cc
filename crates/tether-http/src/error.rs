// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the HTTP extension

use tether_core::LoaderError;
use thiserror::Error;

/// Errors raised while fetching module source over HTTP(S)
#[derive(Debug, Error)]
pub enum HttpLoaderError {
    /// The server answered with a non-success status
    #[error("request to download source code from {url} failed with HTTP status {status} {status_text}")]
    Status {
        /// The module URL that was fetched
        url: String,
        /// HTTP status code
        status: u16,
        /// HTTP status text
        status_text: String,
    },

    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Request {
        /// The module URL that was fetched
        url: String,
        /// Transport-level cause
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpLoaderError> for LoaderError {
    fn from(err: HttpLoaderError) -> Self {
        LoaderError::Hook(anyhow::Error::new(err))
    }
}
