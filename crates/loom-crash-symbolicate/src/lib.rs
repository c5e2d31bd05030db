// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map symbolication engine for Loom crash analytics.
//!
//! This crate provides functionality for:
//! - Locating the source map referenced by a generated JavaScript file
//! - Parsing JavaScript/TypeScript source maps (v3)
//! - Decoding minified stack trace positions to original source positions
//! - Extracting source context for display
//!
//! Everything here is pure: fetching artifacts is the caller's concern.
//!
//! # Example
//!
//! ```
//! use loom_crash_symbolicate::{extract_context, ParsedSourceMap};
//!
//! let source_map_json = r#"{
//!     "version": 3,
//!     "sources": ["src/app.ts"],
//!     "sourcesContent": ["const a = 1;\nthrow new Error('boom');\n"],
//!     "names": [],
//!     "mappings": "AAAA;AACA"
//! }"#;
//!
//! let source_map: ParsedSourceMap = source_map_json.parse().unwrap();
//! let position = source_map.lookup(2, 0).unwrap();
//! assert_eq!(position.source, "src/app.ts");
//! assert_eq!(position.line, 2);
//!
//! let content = source_map.source_content(position.source_index).unwrap();
//! let context = extract_context(content, position.line as usize, 5);
//! assert_eq!(context.line_content, "throw new Error('boom');\n");
//! ```

pub mod context;
pub mod error;
pub mod locator;
pub mod sourcemap;
pub mod vlq;

// Re-export main types
pub use context::{extract_context, SourceContext, DEFAULT_CONTEXT_LINES};
pub use error::{Result, SymbolicateError};
pub use locator::{
	find_source_mapping_url, is_url, resolve_source_map_location, resolve_source_name,
	SourceMapLocation,
};
pub use sourcemap::{OriginalPosition, ParsedSourceMap};
pub use vlq::{
	decode_vlq_mappings, decode_vlq_segment, DecodedMappings, OriginalLocation, Segment,
};
