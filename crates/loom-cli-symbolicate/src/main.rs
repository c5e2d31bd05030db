// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use loom_crash_core::{ProjectId, StackFrameInput};
use loom_server_symbolicate::{
	load_config, load_config_with_file, select_fetcher, InMemoryArtifactStore, StackTraceEnhancer,
	SymbolicationConfig,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve minified JavaScript stack frames to original source positions
#[derive(Parser, Debug)]
#[command(name = "loom-symbolicate")]
struct Args {
	/// JSON array of stack frames (reads stdin when omitted or "-")
	input: Option<PathBuf>,

	/// Project the artifacts belong to
	#[arg(long, env = "LOOM_PROJECT_ID", default_value_t = 1)]
	project_id: i64,

	/// Release version the artifacts belong to
	#[arg(long, env = "LOOM_RELEASE_VERSION")]
	version: Option<String>,

	/// TOML config file with a [symbolication] table
	#[arg(long, env = "LOOM_SERVER_CONFIG")]
	config: Option<PathBuf>,

	/// Lines of source context around each resolved line
	#[arg(long, value_parser = clap::value_parser!(u64).range(..=50))]
	context_lines: Option<u64>,

	/// Pretty-print the output
	#[arg(long)]
	pretty: bool,

	/// Emit logs as JSON
	#[arg(long)]
	json_logs: bool,
}

impl Args {
	fn load_config(&self) -> Result<SymbolicationConfig> {
		let mut config = match &self.config {
			Some(path) => load_config_with_file(path)
				.with_context(|| format!("loading config from {}", path.display()))?,
			None => load_config().context("loading config from environment")?,
		};

		if let Some(lines) = self.context_lines {
			config.context_lines = lines as usize;
		}

		Ok(config)
	}
}

fn init_logging(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);

	if json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init();
	}
}

fn read_input(input: Option<&Path>) -> Result<String> {
	match input {
		Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
			.with_context(|| format!("reading stack trace from {}", path.display())),
		_ => {
			let mut buf = String::new();
			std::io::stdin()
				.read_to_string(&mut buf)
				.context("reading stack trace from stdin")?;
			Ok(buf)
		}
	}
}

/// `null` parses to `None`, which the enhancer rejects as a nil trace.
fn parse_frames(input: &str) -> Result<Option<Vec<StackFrameInput>>> {
	serde_json::from_str(input).context("parsing stack trace JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_logging(args.json_logs);

	let config = args.load_config()?;
	let frames = parse_frames(&read_input(args.input.as_deref())?)?;
	debug!(
		frame_count = frames.as_ref().map(Vec::len).unwrap_or(0),
		"Parsed stack trace"
	);

	let fetcher = select_fetcher(frames.as_deref().unwrap_or_default(), &config)
		.context("building HTTP client")?;
	info!(fetcher = fetcher.name(), "Selected fetch strategy");

	let enhancer = StackTraceEnhancer::new(fetcher, &config)
		.with_storage(Arc::new(InMemoryArtifactStore::new()));
	let enhanced = enhancer
		.enhance(
			frames.as_deref(),
			ProjectId(args.project_id),
			args.version.as_deref(),
		)
		.await?;

	let output = if args.pretty {
		serde_json::to_string_pretty(&enhanced)?
	} else {
		serde_json::to_string(&enhanced)?
	};
	println!("{output}");

	Ok(())
}
