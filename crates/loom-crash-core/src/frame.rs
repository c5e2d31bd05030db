// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame types exchanged with the symbolication pipeline.

use serde::{Deserialize, Serialize};

/// A single minified stack frame as observed by the client.
///
/// `line_number` is 1-indexed, `column_number` is 0-indexed (source map
/// convention).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrameInput {
	/// Filesystem path or fully-qualified URL of the generated file.
	pub file_name: String,
	pub line_number: u32,
	pub column_number: u32,
}

impl StackFrameInput {
	pub fn new(file_name: impl Into<String>, line_number: u32, column_number: u32) -> Self {
		Self {
			file_name: file_name.into(),
			line_number,
			column_number,
		}
	}
}

/// A stack frame after symbolication.
///
/// Either the location fields hold the original position, or `error` is set
/// and the location fields hold the input position unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedFrame {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub file_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub line_number: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub column_number: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub function_name: Option<String>,
	/// The original source line, including its line terminator.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub line_content: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lines_before: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lines_after: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl EnhancedFrame {
	/// Pass an input frame through unchanged, recording why it could not be
	/// symbolicated.
	pub fn failed(input: &StackFrameInput, error: impl Into<String>) -> Self {
		Self {
			file_name: Some(input.file_name.clone()),
			line_number: Some(input.line_number),
			column_number: Some(input.column_number),
			error: Some(error.into()),
			..Self::default()
		}
	}

	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}
}
