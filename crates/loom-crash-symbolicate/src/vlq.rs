// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! VLQ (Variable-Length Quantity) decoder for source map mappings.
//!
//! Source maps use Base64 VLQ encoding for compact storage of line/column mappings.
//! This module provides decoding functionality following the source map v3 spec.

use crate::error::{Result, SymbolicateError};

/// Continuation flag of a Base64 VLQ digit.
const CONTINUATION_BIT: u8 = 0b10_0000;
/// Payload bits of a Base64 VLQ digit.
const VALUE_MASK: u8 = 0b01_1111;
const VLQ_BASE_SHIFT: u32 = 5;
/// Seven digits carry 35 bits, enough for any 32-bit signed value.
const MAX_SHIFT: u32 = 35;

/// Decode a Base64 character to its 6-bit value.
fn decode_char(ch: u8) -> Result<u8> {
	match ch {
		b'A'..=b'Z' => Ok(ch - b'A'),
		b'a'..=b'z' => Ok(ch - b'a' + 26),
		b'0'..=b'9' => Ok(ch - b'0' + 52),
		b'+' => Ok(62),
		b'/' => Ok(63),
		_ => Err(SymbolicateError::InvalidVlqChar(ch as char)),
	}
}

/// Decode a VLQ-encoded segment into a vector of signed integers.
///
/// Each segment represents one or more values:
/// - Minimum 1 value: generated column offset
/// - Optional 3 more values: source index, original line, original column
/// - Optional 5th value: name index
pub fn decode_vlq_segment(segment: &str) -> Result<Vec<i64>> {
	let mut values = Vec::with_capacity(5);
	let mut value = 0i64;
	let mut shift = 0u32;
	let mut pending = false;

	for ch in segment.bytes() {
		if shift >= MAX_SHIFT {
			return Err(SymbolicateError::VlqOverflow(segment.to_string()));
		}

		let digit = decode_char(ch)?;
		value += i64::from(digit & VALUE_MASK) << shift;
		shift += VLQ_BASE_SHIFT;
		pending = digit & CONTINUATION_BIT != 0;

		if !pending {
			// Lowest bit is the sign.
			let negated = value & 1 != 0;
			value >>= 1;
			values.push(if negated { -value } else { value });
			value = 0;
			shift = 0;
		}
	}

	if pending {
		return Err(SymbolicateError::TruncatedVlq(segment.to_string()));
	}

	Ok(values)
}

/// Position in an original source that a segment maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalLocation {
	/// Index into the sources array.
	pub source_index: u32,
	/// Line in the original file (0-indexed).
	pub line: u32,
	/// Column in the original file (0-indexed).
	pub column: u32,
}

/// A single decoded mapping segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
	/// Line in the generated file (0-indexed).
	pub generated_line: u32,
	/// Column in the generated file (0-indexed).
	pub generated_column: u32,
	/// `None` for generated code with no original counterpart.
	pub original: Option<OriginalLocation>,
	/// Optional index into the names array.
	pub name_index: Option<u32>,
}

/// Decoded mappings, ordered by generated line and then generated column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMappings {
	segments: Vec<Segment>,
}

impl DecodedMappings {
	/// Find the closest segment at or before the given generated position.
	///
	/// This is the greatest line not after `line`, and within it the greatest
	/// column not after `column`. A position before the first column of its
	/// line falls back to the last segment of an earlier line.
	pub fn find(&self, line: u32, column: u32) -> Option<&Segment> {
		let idx = self
			.segments
			.partition_point(|s| (s.generated_line, s.generated_column) <= (line, column));

		idx.checked_sub(1).map(|i| &self.segments[i])
	}

	/// All segments on one generated line.
	pub fn line(&self, line: u32) -> &[Segment] {
		let start = self.segments.partition_point(|s| s.generated_line < line);
		let end = self.segments.partition_point(|s| s.generated_line <= line);
		&self.segments[start..end]
	}

	pub fn iter(&self) -> impl Iterator<Item = &Segment> {
		self.segments.iter()
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}
}

fn to_u32(value: i64, field: &'static str, segment: &str, line: u32) -> Result<u32> {
	u32::try_from(value).map_err(|_| SymbolicateError::ValueOutOfRange {
		field,
		segment: segment.to_string(),
		line,
	})
}

/// Decode VLQ-encoded source map mappings string into structured form.
///
/// The mappings string format:
/// - Lines are separated by semicolons (;)
/// - Segments within a line are separated by commas (,)
/// - Each segment contains 1, 4, or 5 VLQ-encoded values
///
/// The generated column is relative to the previous segment on the same line.
/// Source index, original line, original column and name index are relative to
/// the previous segment that carried them, across the whole map.
pub fn decode_vlq_mappings(mappings: &str) -> Result<DecodedMappings> {
	let mut segments: Vec<Segment> = Vec::new();

	let mut source_index = 0i64;
	let mut original_line = 0i64;
	let mut original_column = 0i64;
	let mut name_index = 0i64;

	for (line_no, line) in mappings.split(';').enumerate() {
		let generated_line = line_no as u32;
		let line_start = segments.len();
		let mut generated_column = 0i64;

		for segment in line.split(',') {
			if segment.is_empty() {
				continue;
			}

			let values = decode_vlq_segment(segment)?;
			if !matches!(values.len(), 1 | 4 | 5) {
				return Err(SymbolicateError::InvalidSegmentLength {
					segment: segment.to_string(),
					line: generated_line,
					fields: values.len(),
				});
			}

			generated_column += values[0];

			let original = if values.len() >= 4 {
				source_index += values[1];
				original_line += values[2];
				original_column += values[3];

				Some(OriginalLocation {
					source_index: to_u32(source_index, "source index", segment, generated_line)?,
					line: to_u32(original_line, "original line", segment, generated_line)?,
					column: to_u32(original_column, "original column", segment, generated_line)?,
				})
			} else {
				None
			};

			let name = if values.len() == 5 {
				name_index += values[4];
				Some(to_u32(name_index, "name index", segment, generated_line)?)
			} else {
				None
			};

			segments.push(Segment {
				generated_line,
				generated_column: to_u32(
					generated_column,
					"generated column",
					segment,
					generated_line,
				)?,
				original,
				name_index: name,
			});
		}

		// Some generators emit columns out of order; lookups need them sorted.
		let line_segments = &mut segments[line_start..];
		if line_segments
			.windows(2)
			.any(|w| w[0].generated_column > w[1].generated_column)
		{
			line_segments.sort_by_key(|s| s.generated_column);
		}
	}

	Ok(DecodedMappings { segments })
}
