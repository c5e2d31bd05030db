// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for stack trace symbolication.

use std::path::PathBuf;

use loom_crash_symbolicate::SymbolicateError;
use thiserror::Error;

/// Errors returned by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("error opening file: {0}")]
	NotFound(#[source] std::io::Error),

	#[error("status code not OK")]
	BadStatus { status: u16 },

	#[error("error getting source file: {0}")]
	Transport(String),

	#[error("artifact is {size} bytes, exceeds limit of {max} bytes")]
	TooLarge { size: u64, max: u64 },
}

impl FetchError {
	/// True for a missing file on disk or a 404 response.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound(_) | Self::BadStatus { status: 404 })
	}
}

/// Why a single frame could not be symbolicated.
///
/// The rendered message is stored in the frame's `error` field, so each
/// variant keeps a stable `<stage>: <location>: <cause>` shape.
#[derive(Debug, Error)]
pub enum FrameError {
	#[error("error fetching file: {location}: {source}")]
	Fetch { location: String, source: FetchError },

	#[error("file does not contain source map url: {0}")]
	NoSourceMapUrl(String),

	#[error("error resolving source map url: {location}: {source}")]
	Locate {
		location: String,
		source: SymbolicateError,
	},

	#[error("error decoding source map: {location}: {source}")]
	Decode {
		location: String,
		source: SymbolicateError,
	},

	#[error("error resolving position: {location}: {source}")]
	Resolve {
		location: String,
		source: SymbolicateError,
	},
}

/// Errors that fail a whole enhancement call.
#[derive(Debug, Error)]
pub enum EnhanceError {
	#[error("stack trace input cannot be nil")]
	NilStackTrace,

	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[from] reqwest::Error),
}

/// Errors from the object storage tier.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("object storage error: {0}")]
	Backend(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Validation error: {0}")]
	Validation(String),
}

/// Result type for enhancement calls.
pub type Result<T> = std::result::Result<T, EnhanceError>;
