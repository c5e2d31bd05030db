// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace enhancement.
//!
//! [`StackTraceEnhancer`] maps each minified frame back to its original
//! position: fetch the generated file, locate its source map, fetch and decode
//! the map, resolve the position and attach source context. Every frame is
//! handled independently; a failing frame carries an `error` and never aborts
//! the trace.

use std::sync::Arc;

use bytes::Bytes;
use loom_crash_core::{ArtifactKey, EnhancedFrame, ProjectId, StackFrameInput};
use loom_crash_symbolicate::{
	extract_context, find_source_mapping_url, resolve_source_map_location, resolve_source_name,
	ParsedSourceMap, SourceMapLocation,
};
use tracing::{debug, info, instrument, warn};

use crate::cache::ArtifactCache;
use crate::config::SymbolicationConfig;
use crate::error::{EnhanceError, FetchError, FrameError, Result};
use crate::fetch::{select_fetcher, Fetcher};
use crate::storage::ArtifactStore;

/// Artifact release a trace belongs to, used to key object storage.
#[derive(Debug, Clone, Copy)]
struct Release<'a> {
	project_id: ProjectId,
	version: Option<&'a str>,
}

impl Release<'_> {
	fn key(&self, location: &str) -> ArtifactKey {
		ArtifactKey::new(self.project_id, self.version, location)
	}
}

/// Resolves minified stack frames to original source positions.
///
/// The enhancer owns its cache, so reusing one instance across calls avoids
/// refetching artifacts already seen.
pub struct StackTraceEnhancer {
	fetcher: Arc<dyn Fetcher>,
	storage: Option<Arc<dyn ArtifactStore>>,
	cache: Arc<ArtifactCache>,
	context_lines: usize,
}

impl StackTraceEnhancer {
	pub fn new(fetcher: Arc<dyn Fetcher>, config: &SymbolicationConfig) -> Self {
		Self {
			fetcher,
			storage: None,
			cache: Arc::new(ArtifactCache::from_config(config)),
			context_lines: config.context_lines,
		}
	}

	/// Read artifacts through, and write fetched artifacts back to, an object
	/// store.
	pub fn with_storage(mut self, storage: Arc<dyn ArtifactStore>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// Share a cache with other enhancers.
	pub fn with_cache(mut self, cache: Arc<ArtifactCache>) -> Self {
		self.cache = cache;
		self
	}

	pub fn cache(&self) -> &Arc<ArtifactCache> {
		&self.cache
	}

	/// Enhance a stack trace. The output has one frame per input frame, in
	/// input order.
	#[instrument(
		skip(self, frames),
		fields(
			fetcher = self.fetcher.name(),
			frame_count = frames.map(|f| f.len()).unwrap_or(0)
		)
	)]
	pub async fn enhance(
		&self,
		frames: Option<&[StackFrameInput]>,
		project_id: ProjectId,
		version: Option<&str>,
	) -> Result<Vec<EnhancedFrame>> {
		let frames = frames.ok_or(EnhanceError::NilStackTrace)?;
		let release = Release {
			project_id,
			version,
		};

		let mut enhanced = Vec::with_capacity(frames.len());
		for frame in frames {
			match self.enhance_frame(frame, release).await {
				Ok(result) => {
					info!(
						file_name = %frame.file_name,
						line = frame.line_number,
						column = frame.column_number,
						original_file = result.file_name.as_deref().unwrap_or_default(),
						original_line = result.line_number.unwrap_or_default(),
						"Symbolicated frame"
					);
					enhanced.push(result);
				}
				Err(e) => {
					warn!(
						error = %e,
						file_name = %frame.file_name,
						line = frame.line_number,
						column = frame.column_number,
						"Failed to symbolicate frame"
					);
					enhanced.push(EnhancedFrame::failed(frame, e.to_string()));
				}
			}
		}

		Ok(enhanced)
	}

	async fn enhance_frame(
		&self,
		frame: &StackFrameInput,
		release: Release<'_>,
	) -> std::result::Result<EnhancedFrame, FrameError> {
		let location = frame.file_name.as_str();

		let source = self
			.load_source(location, release)
			.await
			.map_err(|source| FrameError::Fetch {
				location: location.to_string(),
				source,
			})?;

		let text = String::from_utf8_lossy(&source);
		let source_map_url = find_source_mapping_url(&text)
			.ok_or_else(|| FrameError::NoSourceMapUrl(location.to_string()))?;

		let map_location = resolve_source_map_location(location, source_map_url).map_err(
			|source| FrameError::Locate {
				location: location.to_string(),
				source,
			},
		)?;

		let (source_map, map_base) = self
			.load_source_map(location, map_location, release)
			.await?;

		let position = source_map
			.lookup(frame.line_number, frame.column_number)
			.map_err(|source| FrameError::Resolve {
				location: location.to_string(),
				source,
			})?;

		let mut enhanced = EnhancedFrame {
			file_name: Some(resolve_source_name(&map_base, &position.source)),
			line_number: Some(position.line),
			column_number: Some(position.column),
			function_name: Some(position.name.unwrap_or_default()),
			..EnhancedFrame::default()
		};

		if let Some(content) = source_map.source_content(position.source_index) {
			let context = extract_context(content, position.line as usize, self.context_lines);
			if !context.is_empty() {
				enhanced.line_content = Some(context.line_content);
				enhanced.lines_before = Some(context.lines_before);
				enhanced.lines_after = Some(context.lines_after);
			}
		}

		Ok(enhanced)
	}

	async fn load_source(
		&self,
		location: &str,
		release: Release<'_>,
	) -> std::result::Result<Bytes, FetchError> {
		if let Some(data) = self.cache.get_source(location).await {
			debug!(location, "Source cache hit");
			return Ok(data);
		}

		let data = self.load_artifact(location, release).await?;
		self.cache.insert_source(location, data.clone()).await;
		Ok(data)
	}

	/// Returns the decoded map and the location its source names are relative
	/// to.
	async fn load_source_map(
		&self,
		source_location: &str,
		map_location: SourceMapLocation,
		release: Release<'_>,
	) -> std::result::Result<(Arc<ParsedSourceMap>, String), FrameError> {
		match map_location {
			SourceMapLocation::Inline(data) => {
				let cache_key = format!("{source_location}#sourceMappingURL");
				if let Some(source_map) = self.cache.get_source_map(&cache_key).await {
					debug!(location = source_location, "Inline source map cache hit");
					return Ok((source_map, source_location.to_string()));
				}

				let source_map = decode(source_location, &data)?;
				self.cache
					.insert_source_map(&cache_key, source_map.clone())
					.await;
				Ok((source_map, source_location.to_string()))
			}
			SourceMapLocation::External(url) => {
				if let Some(source_map) = self.cache.get_source_map(&url).await {
					debug!(location = %url, "Source map cache hit");
					return Ok((source_map, url));
				}

				let data = self
					.load_artifact(&url, release)
					.await
					.map_err(|source| FrameError::Fetch {
						location: url.clone(),
						source,
					})?;

				let source_map = decode(&url, &data)?;
				self.cache.insert_source_map(&url, source_map.clone()).await;
				Ok((source_map, url))
			}
		}
	}

	/// Object store first, then the fetcher. Fetched bytes are written back
	/// to the store.
	async fn load_artifact(
		&self,
		location: &str,
		release: Release<'_>,
	) -> std::result::Result<Bytes, FetchError> {
		let key = release.key(location);

		if let Some(storage) = &self.storage {
			match storage.get(&key).await {
				Ok(Some(data)) => {
					debug!(key = %key, "Artifact found in object storage");
					return Ok(data);
				}
				Ok(None) => debug!(key = %key, "Artifact not in object storage"),
				Err(e) => warn!(error = %e, key = %key, "Object storage lookup failed"),
			}
		}

		let data = self.fetcher.fetch(location).await?;

		if let Some(storage) = &self.storage {
			if let Err(e) = storage.put(&key, data.clone()).await {
				warn!(error = %e, key = %key, "Failed to store artifact");
			}
		}

		Ok(data)
	}
}

fn decode(location: &str, data: &[u8]) -> std::result::Result<Arc<ParsedSourceMap>, FrameError> {
	let source_map =
		ParsedSourceMap::from_bytes(data).map_err(|source| FrameError::Decode {
			location: location.to_string(),
			source,
		})?;

	debug!(
		location,
		mappings = source_map.mapping_count(),
		sources_content = source_map.has_sources_content(),
		"Decoded source map"
	);
	Ok(Arc::new(source_map))
}

/// Enhance a stack trace with default configuration.
///
/// The fetch strategy is chosen from the first frame's location: URLs are
/// downloaded, anything else is read from disk.
#[instrument(skip(frames, storage), fields(frame_count = frames.map(|f| f.len()).unwrap_or(0)))]
pub async fn enhance_stack_trace(
	frames: Option<&[StackFrameInput]>,
	project_id: ProjectId,
	version: Option<&str>,
	storage: Option<Arc<dyn ArtifactStore>>,
) -> Result<Vec<EnhancedFrame>> {
	let frames = frames.ok_or(EnhanceError::NilStackTrace)?;
	if frames.is_empty() {
		return Ok(Vec::new());
	}

	let config = SymbolicationConfig::default();
	let mut enhancer = StackTraceEnhancer::new(select_fetcher(frames, &config)?, &config);
	if let Some(storage) = storage {
		enhancer = enhancer.with_storage(storage);
	}

	enhancer.enhance(Some(frames), project_id, version).await
}
