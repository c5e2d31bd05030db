// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side stack trace symbolication for Loom.
//!
//! This crate turns minified JavaScript stack frames into original source
//! positions, including:
//!
//! - Disk and network fetch strategies for generated files and source maps
//! - An in-process artifact cache and an object storage tier
//! - Layered configuration (defaults, TOML, environment)
//! - The [`StackTraceEnhancer`] orchestrator

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod symbolicate;

pub use cache::ArtifactCache;
pub use config::{load_config, load_config_with_file, SymbolicationConfig, SymbolicationConfigLayer};
pub use error::{ConfigError, EnhanceError, FetchError, FrameError, Result, StorageError};
pub use fetch::{select_fetcher, DiskFetcher, Fetcher, NetworkFetcher};
pub use storage::{ArtifactStore, InMemoryArtifactStore};
pub use symbolicate::{enhance_stack_trace, StackTraceEnhancer};
