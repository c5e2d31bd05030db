// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source context extraction for display next to a resolved frame.

/// Default number of lines shown before and after the resolved line.
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// The resolved line plus surrounding lines, each block keeping the original
/// line terminators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
	pub line_content: String,
	pub lines_before: String,
	pub lines_after: String,
}

impl SourceContext {
	/// True when the requested line was outside the source.
	pub fn is_empty(&self) -> bool {
		self.line_content.is_empty() && self.lines_before.is_empty() && self.lines_after.is_empty()
	}
}

/// Extract source context lines around a given line number.
///
/// `line` is 1-indexed. Out-of-range lines yield an empty context.
pub fn extract_context(source_content: &str, line: usize, context_lines: usize) -> SourceContext {
	let lines: Vec<&str> = source_content.split_inclusive('\n').collect();

	if line == 0 || line > lines.len() {
		return SourceContext::default();
	}

	let line_idx = line - 1;
	let pre_start = line_idx.saturating_sub(context_lines);
	let post_end = (line_idx + 1 + context_lines).min(lines.len());

	SourceContext {
		line_content: lines[line_idx].to_string(),
		lines_before: lines[pre_start..line_idx].concat(),
		lines_after: lines[line_idx + 1..post_end].concat(),
	}
}
