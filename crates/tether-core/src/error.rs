// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the hook engine

use thiserror::Error;

/// Result type for hook engine operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors that can occur while building or dispatching hook chains
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Configuration root is not an object
    #[error("{origin}: did not provide a configuration object")]
    ConfigNotObject {
        /// Where the configuration came from
        origin: String,
    },

    /// Configuration has no "extensions" array
    #[error("{origin}: configuration does not include an \"extensions\" array")]
    ExtensionListMissing {
        /// Where the configuration came from
        origin: String,
    },

    /// Extension entry is not an object
    #[error("{origin}: invalid extension at index {index} - expected object but received {found}")]
    ExtensionNotObject {
        /// Where the configuration came from
        origin: String,
        /// Position of the offending entry
        index: usize,
        /// JSON type that was found instead
        found: &'static str,
    },

    /// Extension entry is an array
    #[error("{origin}: invalid extension at index {index} - expected plain object but received array")]
    ExtensionIsArray {
        /// Where the configuration came from
        origin: String,
        /// Position of the offending entry
        index: usize,
    },

    /// Extension entry has no "name" string
    #[error("{origin}: extension at index {index} is missing a \"name\" string")]
    ExtensionUnnamed {
        /// Where the configuration came from
        origin: String,
        /// Position of the offending entry
        index: usize,
    },

    /// Extension entry names an extension that is not registered
    #[error("{origin}: unknown extension \"{name}\" at index {index}")]
    UnknownExtension {
        /// Where the configuration came from
        origin: String,
        /// Position of the offending entry
        index: usize,
        /// The unrecognized extension name
        name: String,
    },

    /// A registered factory rejected the entry's options
    #[error("{origin}: extension \"{name}\" at index {index} could not be built: {reason}")]
    ExtensionBuild {
        /// Where the configuration came from
        origin: String,
        /// Position of the offending entry
        index: usize,
        /// The extension name
        name: String,
        /// Why the factory refused
        reason: String,
    },

    /// The configuration source could not be read at all
    #[error("could not read loader configuration at {origin}: {reason}")]
    ConfigUnavailable {
        /// Where the configuration was expected
        origin: String,
        /// Why it could not be obtained
        reason: String,
    },

    /// An error raised by a hook implementation
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

impl LoaderError {
    /// Whether this is a configuration-shape defect.
    ///
    /// Shape defects mean a configuration object was obtained but is
    /// malformed; hosts conventionally treat these as fatal and exit
    /// non-zero. Availability errors (`ConfigUnavailable`) are recoverable
    /// and degrade to an empty configuration instead.
    pub fn is_config_shape(&self) -> bool {
        matches!(
            self,
            LoaderError::ConfigNotObject { .. }
                | LoaderError::ExtensionListMissing { .. }
                | LoaderError::ExtensionNotObject { .. }
                | LoaderError::ExtensionIsArray { .. }
                | LoaderError::ExtensionUnnamed { .. }
                | LoaderError::UnknownExtension { .. }
                | LoaderError::ExtensionBuild { .. }
        )
    }
}
