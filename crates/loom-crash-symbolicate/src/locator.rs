// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Locating the source map that belongs to a generated file.
//!
//! Generated files reference their map with a trailing directive:
//!
//! ```text
//! //# sourceMappingURL=app.min.js.map
//! ```
//!
//! The value is either an absolute URL, a `data:` URL carrying the map inline,
//! or a reference relative to the generated file. Relative references resolve
//! against a URL base for remote files and against the parent directory for
//! files on disk.

use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use url::Url;

use crate::error::{Result, SymbolicateError};

const LINE_DIRECTIVES: [&str; 2] = ["//# sourceMappingURL=", "//@ sourceMappingURL="];
const BLOCK_DIRECTIVES: [&str; 2] = ["/*# sourceMappingURL=", "/*@ sourceMappingURL="];

/// Inline maps are not always padded.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Where to load a source map from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMapLocation {
	/// A URL or filesystem path to fetch.
	External(String),
	/// Map bytes embedded in the generated file.
	Inline(Vec<u8>),
}

/// Find the `sourceMappingURL` directive, searching from the end of the file.
pub fn find_source_mapping_url(source: &str) -> Option<&str> {
	source.lines().rev().find_map(directive_value)
}

/// The directive must be the line's trailing comment. Text after a block
/// comment's `*/` and quotes inside the value both mean the match sits in a
/// string literal, not a comment.
fn directive_value(line: &str) -> Option<&str> {
	let line = line.trim_end();

	for prefix in LINE_DIRECTIVES {
		if let Some(idx) = line.rfind(prefix) {
			return directive_url(&line[idx + prefix.len()..]);
		}
	}

	for prefix in BLOCK_DIRECTIVES {
		if let Some(idx) = line.rfind(prefix) {
			let (value, trailing) = line[idx + prefix.len()..].split_once("*/")?;
			if !trailing.trim().is_empty() {
				return None;
			}
			return directive_url(value);
		}
	}

	None
}

fn directive_url(value: &str) -> Option<&str> {
	let value = value.trim();
	let valid = !value.is_empty()
		&& !value
			.chars()
			.any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '`'));
	valid.then_some(value)
}

/// Resolve a directive value to a concrete source map location.
pub fn resolve_source_map_location(
	source_location: &str,
	source_map_url: &str,
) -> Result<SourceMapLocation> {
	if let Some(data) = source_map_url.strip_prefix("data:") {
		return decode_data_url(data).map(SourceMapLocation::Inline);
	}

	if parse_absolute_url(source_map_url).is_some() {
		return Ok(SourceMapLocation::External(source_map_url.to_string()));
	}

	if let Some(base) = parse_absolute_url(source_location) {
		let joined = base
			.join(source_map_url)
			.map_err(|e| SymbolicateError::InvalidSourceMapUrl {
				url: source_map_url.to_string(),
				message: e.to_string(),
			})?;
		return Ok(SourceMapLocation::External(joined.to_string()));
	}

	let dir = Path::new(source_location)
		.parent()
		.unwrap_or_else(|| Path::new(""));
	Ok(SourceMapLocation::External(
		dir.join(source_map_url).to_string_lossy().into_owned(),
	))
}

/// Qualify a source name from a map against the map's own location.
///
/// Sources of a remotely fetched map are resolved to absolute URLs. Sources of
/// maps on disk, and sources that are already absolute, are returned as-is.
pub fn resolve_source_name(source_map_location: &str, source: &str) -> String {
	if parse_absolute_url(source).is_some() {
		return source.to_string();
	}

	parse_absolute_url(source_map_location)
		.filter(|base| matches!(base.scheme(), "http" | "https"))
		.and_then(|base| base.join(source).ok())
		.map(|url| url.to_string())
		.unwrap_or_else(|| source.to_string())
}

/// True if the location carries a URL scheme.
pub fn is_url(location: &str) -> bool {
	parse_absolute_url(location).is_some()
}

/// Single-letter schemes are Windows drive letters, not URLs.
fn parse_absolute_url(value: &str) -> Option<Url> {
	Url::parse(value).ok().filter(|url| url.scheme().len() > 1)
}

fn decode_data_url(data: &str) -> Result<Vec<u8>> {
	let (meta, payload) = data.split_once(',').ok_or_else(|| {
		SymbolicateError::InvalidInlineSourceMap("missing ',' in data URL".to_string())
	})?;

	if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
		return LENIENT_BASE64
			.decode(payload.trim())
			.map_err(|e| SymbolicateError::InvalidInlineSourceMap(e.to_string()));
	}

	urlencoding::decode(payload)
		.map(|decoded| decoded.into_owned().into_bytes())
		.map_err(|e| SymbolicateError::InvalidInlineSourceMap(e.to_string()))
}
