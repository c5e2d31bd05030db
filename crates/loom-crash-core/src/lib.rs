// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom stack trace symbolication.
//!
//! This crate provides the shared data model used by the symbolication engine
//! (`loom-crash-symbolicate`), the server-side enhancer
//! (`loom-server-symbolicate`) and the CLI:
//!
//! - [`StackFrameInput`]: a minified location as captured by a client SDK
//! - [`EnhancedFrame`]: the resolved (or failed) counterpart of an input frame
//! - [`ArtifactKey`]: the object-storage key for a fetched source or source map

pub mod artifact;
pub mod frame;

pub use artifact::{ArtifactKey, UNVERSIONED};
pub use frame::{EnhancedFrame, StackFrameInput};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Project ID (for multi-tenant artifact isolation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ProjectId {
	type Err = ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(s.trim().parse()?))
	}
}

impl From<i64> for ProjectId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}
