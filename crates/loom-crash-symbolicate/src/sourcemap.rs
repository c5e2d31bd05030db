// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map parsing and position lookup.
//!
//! Implements the Source Map v3 specification for JavaScript/TypeScript
//! stack trace symbolication.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Result, SymbolicateError};
use crate::vlq::{decode_vlq_mappings, DecodedMappings};

/// Anti-XSSI prefix some servers prepend to JSON responses.
const XSSI_PREFIX: &[u8] = b")]}'";

/// Raw source map JSON structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
	version: u32,
	#[serde(default)]
	file: Option<String>,
	#[serde(default)]
	source_root: Option<String>,
	#[serde(default)]
	sources: Vec<Option<String>>,
	#[serde(default)]
	sources_content: Option<Vec<Option<String>>>,
	#[serde(default)]
	names: Vec<String>,
	mappings: String,
}

/// Parsed source map ready for lookups. Immutable once decoded.
#[derive(Debug, Clone)]
pub struct ParsedSourceMap {
	/// Source map version (always 3).
	pub version: u32,
	/// Generated file name.
	pub file: Option<String>,
	/// Root path prepended to source filenames.
	pub source_root: Option<String>,
	/// List of original source file paths, index-addressed by segments.
	pub sources: Vec<String>,
	/// Optional embedded source content, aligned with `sources`.
	pub sources_content: Vec<Option<String>>,
	/// List of original identifiers (function/variable names).
	pub names: Vec<String>,
	mappings: DecodedMappings,
}

/// Original position information from a source map lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
	/// Original source file path, with the source root applied.
	pub source: String,
	/// Index of the source in the map's `sources`.
	pub source_index: u32,
	/// Line in the original source (1-indexed).
	pub line: u32,
	/// Column in the original source (0-indexed).
	pub column: u32,
	/// Name of the enclosing mapped identifier, if the segment carries one.
	pub name: Option<String>,
}

impl ParsedSourceMap {
	/// Parse a source map from JSON bytes.
	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		let raw: RawSourceMap = serde_json::from_slice(strip_xssi_prefix(data))?;

		if raw.version != 3 {
			return Err(SymbolicateError::InvalidSourceMapVersion(raw.version));
		}

		let mappings = decode_vlq_mappings(&raw.mappings)?;

		Ok(Self {
			version: raw.version,
			file: raw.file,
			source_root: raw.source_root,
			sources: raw
				.sources
				.into_iter()
				.map(Option::unwrap_or_default)
				.collect(),
			sources_content: raw.sources_content.unwrap_or_default(),
			names: raw.names,
			mappings,
		})
	}

	/// Lookup the original position for a generated line and column.
	///
	/// Lines are 1-indexed (as displayed in stack traces), columns are 0-indexed.
	pub fn lookup(&self, line: u32, column: u32) -> Result<OriginalPosition> {
		let not_found = || SymbolicateError::NoMappingFound { line, column };

		if line == 0 {
			return Err(not_found());
		}

		let segment = self.mappings.find(line - 1, column).ok_or_else(not_found)?;
		let original = segment.original.ok_or_else(not_found)?;

		let source = self
			.sources
			.get(original.source_index as usize)
			.ok_or(SymbolicateError::InvalidSourceIndex(original.source_index))?;

		let name = segment
			.name_index
			.and_then(|idx| self.names.get(idx as usize).cloned());

		Ok(OriginalPosition {
			source: self.resolve_source_path(source),
			source_index: original.source_index,
			line: original.line + 1,
			column: original.column,
			name,
		})
	}

	/// Embedded content of a source, if the map carries `sourcesContent`.
	pub fn source_content(&self, source_index: u32) -> Option<&str> {
		self.sources_content
			.get(source_index as usize)
			.and_then(|c| c.as_deref())
	}

	/// Resolve a source path with the source root if present.
	fn resolve_source_path(&self, source: &str) -> String {
		match &self.source_root {
			Some(root) if !root.is_empty() => {
				let root = root.trim_end_matches('/');
				format!("{}/{}", root, source)
			}
			_ => source.to_string(),
		}
	}

	/// Check if this source map has embedded source content.
	pub fn has_sources_content(&self) -> bool {
		self.sources_content.iter().any(|c| c.is_some())
	}

	/// Get the number of mappings in this source map.
	pub fn mapping_count(&self) -> usize {
		self.mappings.len()
	}
}

impl FromStr for ParsedSourceMap {
	type Err = SymbolicateError;

	fn from_str(data: &str) -> Result<Self> {
		Self::from_bytes(data.as_bytes())
	}
}

fn strip_xssi_prefix(data: &[u8]) -> &[u8] {
	if !data.starts_with(XSSI_PREFIX) {
		return data;
	}
	match data.iter().position(|&b| b == b'\n') {
		Some(newline) => &data[newline + 1..],
		None => &data[XSSI_PREFIX.len()..],
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	// bundle.min.js: function greet(n){throw new Error('boom')}greet('World');
	const SAMPLE_MAP: &str = r#"{
		"version": 3,
		"file": "bundle.min.js",
		"sources": ["app.ts"],
		"sourcesContent": ["function greet(name) {\n  throw new Error('boom');\n}\n\ngreet('World');\n"],
		"names": ["greet"],
		"mappings": "AAAA,SAASA,SACP,wBAGFA,c"
	}"#;

	fn sample() -> ParsedSourceMap {
		SAMPLE_MAP.parse().unwrap()
	}

	#[test]
	fn test_parse_source_map() {
		let sm = sample();

		assert_eq!(sm.version, 3);
		assert_eq!(sm.file, Some("bundle.min.js".to_string()));
		assert_eq!(sm.sources, vec!["app.ts"]);
		assert_eq!(sm.names, vec!["greet"]);
		assert_eq!(sm.mapping_count(), 5);
		assert!(sm.has_sources_content());
	}

	#[test]
	fn test_lookup_throw_statement() {
		let pos = sample().lookup(1, 20).unwrap();

		assert_eq!(pos.source, "app.ts");
		assert_eq!(pos.line, 2);
		assert_eq!(pos.column, 2);
		assert_eq!(pos.name, None);
	}

	#[test]
	fn test_lookup_named_segments() {
		let sm = sample();

		let declaration = sm.lookup(1, 12).unwrap();
		assert_eq!((declaration.line, declaration.column), (1, 9));
		assert_eq!(declaration.name.as_deref(), Some("greet"));

		let call = sm.lookup(1, 45).unwrap();
		assert_eq!((call.line, call.column), (5, 0));
		assert_eq!(call.name.as_deref(), Some("greet"));
	}

	#[test]
	fn test_lookup_exact_column() {
		let pos = sample().lookup(1, 18).unwrap();
		assert_eq!((pos.line, pos.column), (2, 2));
	}

	#[test]
	fn test_lookup_unmapped_region() {
		let result = sample().lookup(1, 56);
		assert!(matches!(
			result,
			Err(SymbolicateError::NoMappingFound {
				line: 1,
				column: 56
			})
		));
	}

	#[test]
	fn test_lookup_line_zero() {
		assert!(matches!(
			sample().lookup(0, 0),
			Err(SymbolicateError::NoMappingFound { .. })
		));
	}

	#[test]
	fn test_source_content() {
		let sm = sample();
		let content = sm.source_content(0).unwrap();
		assert!(content.starts_with("function greet(name)"));
		assert!(sm.source_content(1).is_none());
	}

	#[test]
	fn test_invalid_version() {
		let json = r#"{"version": 2, "sources": [], "names": [], "mappings": ""}"#;
		let result = json.parse::<ParsedSourceMap>();
		assert!(matches!(
			result,
			Err(SymbolicateError::InvalidSourceMapVersion(2))
		));
	}

	#[test]
	fn test_malformed_json() {
		let result = ParsedSourceMap::from_bytes(b"{\"version\": 3,");
		assert!(matches!(
			result,
			Err(SymbolicateError::InvalidSourceMapJson(_))
		));
	}

	#[test]
	fn test_malformed_mappings() {
		let json = r#"{"version": 3, "sources": ["a.js"], "names": [], "mappings": "A!"}"#;
		assert!(matches!(
			json.parse::<ParsedSourceMap>(),
			Err(SymbolicateError::InvalidVlqChar('!'))
		));
	}

	#[test]
	fn test_invalid_source_index() {
		let json = r#"{"version": 3, "sources": [], "names": [], "mappings": "AAAA"}"#;
		let sm: ParsedSourceMap = json.parse().unwrap();
		assert!(matches!(
			sm.lookup(1, 0),
			Err(SymbolicateError::InvalidSourceIndex(0))
		));
	}

	#[test]
	fn test_source_root_resolution() {
		let json = r#"{
			"version": 3,
			"sourceRoot": "src/",
			"sources": ["index.ts"],
			"names": [],
			"mappings": "AAAA"
		}"#;
		let sm: ParsedSourceMap = json.parse().unwrap();

		let pos = sm.lookup(1, 0).unwrap();
		assert_eq!(pos.source, "src/index.ts");
	}

	#[test]
	fn test_xssi_prefix_is_stripped() {
		let data = format!(")]}}'\n{}", SAMPLE_MAP);
		let sm = ParsedSourceMap::from_bytes(data.as_bytes()).unwrap();
		assert_eq!(sm.sources, vec!["app.ts"]);
	}

	#[test]
	fn test_null_sources_and_missing_names() {
		let json = r#"{"version": 3, "sources": [null, "b.js"], "mappings": "AAAA,CCAA"}"#;
		let sm: ParsedSourceMap = json.parse().unwrap();

		assert_eq!(sm.sources, vec!["", "b.js"]);
		assert!(sm.names.is_empty());
		assert_eq!(sm.lookup(1, 1).unwrap().source, "b.js");
	}

	proptest! {
		#[test]
		fn lookup_is_idempotent(line in 0u32..4, column in 0u32..80) {
			let sm = sample();
			let first = sm.lookup(line, column).ok();
			let second = sm.lookup(line, column).ok();
			prop_assert_eq!(first, second);
		}
	}
}
