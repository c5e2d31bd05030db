// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Symbolication configuration.
//!
//! Configuration is layered from built-in defaults, an optional TOML file
//! (`[symbolication]` table) and `LOOM_SERVER_SYMBOLICATION_*` environment
//! variables, in increasing order of precedence.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_CONTEXT_LINES: usize = loom_crash_symbolicate::DEFAULT_CONTEXT_LINES;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Upper bound on the context window.
pub const MAX_CONTEXT_LINES: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SymbolicationConfigLayer {
	pub context_lines: Option<usize>,
	pub request_timeout_secs: Option<u64>,
	pub max_artifact_bytes: Option<u64>,
	pub cache_capacity: Option<usize>,
	pub cache_ttl_secs: Option<u64>,
}

impl SymbolicationConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: Self) {
		if other.context_lines.is_some() {
			self.context_lines = other.context_lines;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.max_artifact_bytes.is_some() {
			self.max_artifact_bytes = other.max_artifact_bytes;
		}
		if other.cache_capacity.is_some() {
			self.cache_capacity = other.cache_capacity;
		}
		if other.cache_ttl_secs.is_some() {
			self.cache_ttl_secs = other.cache_ttl_secs;
		}
	}

	pub fn finalize(self) -> SymbolicationConfig {
		SymbolicationConfig {
			context_lines: self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
			request_timeout_secs: self
				.request_timeout_secs
				.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			max_artifact_bytes: self
				.max_artifact_bytes
				.unwrap_or(DEFAULT_MAX_ARTIFACT_BYTES),
			cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
			cache_ttl_secs: self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolicationConfig {
	/// Lines of source shown before and after the resolved line.
	pub context_lines: usize,
	pub request_timeout_secs: u64,
	/// Largest source or source map that will be fetched.
	pub max_artifact_bytes: u64,
	/// Entries kept per artifact kind in the in-process cache. 0 disables it.
	pub cache_capacity: usize,
	pub cache_ttl_secs: u64,
}

impl Default for SymbolicationConfig {
	fn default() -> Self {
		SymbolicationConfigLayer::default().finalize()
	}
}

impl SymbolicationConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cache_ttl_secs)
	}
}

/// Shape of the TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
	#[serde(default)]
	symbolication: Option<SymbolicationConfigLayer>,
}

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<SymbolicationConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<SymbolicationConfigLayer, ConfigError> {
		Ok(SymbolicationConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<SymbolicationConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(SymbolicationConfigLayer::default());
		}

		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		Ok(file.symbolication.unwrap_or_default())
	}
}

/// Environment variable source.
///
/// Convention: LOOM_SERVER_SYMBOLICATION_<FIELD>
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an arbitrary variable lookup.
	pub fn load_from<F>(lookup: F) -> Result<SymbolicationConfigLayer, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

		Ok(SymbolicationConfigLayer {
			context_lines: parse_var(
				"LOOM_SERVER_SYMBOLICATION_CONTEXT_LINES",
				var("LOOM_SERVER_SYMBOLICATION_CONTEXT_LINES"),
			)?,
			request_timeout_secs: parse_var(
				"LOOM_SERVER_SYMBOLICATION_REQUEST_TIMEOUT_SECS",
				var("LOOM_SERVER_SYMBOLICATION_REQUEST_TIMEOUT_SECS"),
			)?,
			max_artifact_bytes: parse_var(
				"LOOM_SERVER_SYMBOLICATION_MAX_ARTIFACT_BYTES",
				var("LOOM_SERVER_SYMBOLICATION_MAX_ARTIFACT_BYTES"),
			)?,
			cache_capacity: parse_var(
				"LOOM_SERVER_SYMBOLICATION_CACHE_CAPACITY",
				var("LOOM_SERVER_SYMBOLICATION_CACHE_CAPACITY"),
			)?,
			cache_ttl_secs: parse_var(
				"LOOM_SERVER_SYMBOLICATION_CACHE_TTL_SECS",
				var("LOOM_SERVER_SYMBOLICATION_CACHE_TTL_SECS"),
			)?,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<SymbolicationConfigLayer, ConfigError> {
		Self::load_from(|name| std::env::var(name).ok())
	}
}

fn parse_var<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
	match value {
		Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("invalid numeric value '{v}'"),
		}),
		None => Ok(None),
	}
}

/// Load configuration from defaults and environment.
pub fn load_config() -> Result<SymbolicationConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

/// Load configuration with a TOML config file between defaults and environment.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<SymbolicationConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<SymbolicationConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = SymbolicationConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: SymbolicationConfigLayer) -> Result<SymbolicationConfig, ConfigError> {
	let config = layer.finalize();
	validate_config(&config)?;

	info!(
		context_lines = config.context_lines,
		request_timeout_secs = config.request_timeout_secs,
		max_artifact_bytes = config.max_artifact_bytes,
		cache_capacity = config.cache_capacity,
		cache_ttl_secs = config.cache_ttl_secs,
		"Symbolication configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &SymbolicationConfig) -> Result<(), ConfigError> {
	if config.context_lines > MAX_CONTEXT_LINES {
		return Err(ConfigError::Validation(format!(
			"context_lines must be at most {MAX_CONTEXT_LINES}, got {}",
			config.context_lines
		)));
	}
	if config.request_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"request_timeout_secs must be greater than 0".to_string(),
		));
	}

	Ok(())
}
