// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for symbolication operations.

use thiserror::Error;

/// Errors that can occur while locating, decoding or querying a source map.
#[derive(Debug, Error)]
pub enum SymbolicateError {
	#[error("invalid source map JSON: {0}")]
	InvalidSourceMapJson(#[from] serde_json::Error),

	#[error("invalid source map version: expected 3, got {0}")]
	InvalidSourceMapVersion(u32),

	#[error("invalid VLQ character: {0:?}")]
	InvalidVlqChar(char),

	#[error("truncated VLQ value in segment {0:?}")]
	TruncatedVlq(String),

	#[error("VLQ value overflows in segment {0:?}")]
	VlqOverflow(String),

	#[error("invalid segment {segment:?} on generated line {line}: {fields} fields")]
	InvalidSegmentLength {
		segment: String,
		line: u32,
		fields: usize,
	},

	#[error("out-of-range {field} in segment {segment:?} on generated line {line}")]
	ValueOutOfRange {
		field: &'static str,
		segment: String,
		line: u32,
	},

	#[error("invalid source index: {0}")]
	InvalidSourceIndex(u32),

	#[error("no mapping found for line {line}, column {column}")]
	NoMappingFound { line: u32, column: u32 },

	#[error("invalid source map url {url:?}: {message}")]
	InvalidSourceMapUrl { url: String, message: String },

	#[error("invalid inline source map: {0}")]
	InvalidInlineSourceMap(String),
}

pub type Result<T> = std::result::Result<T, SymbolicateError>;
