// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage keys for fetched symbolication artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProjectId;

/// Version segment used when the client did not report a release.
pub const UNVERSIONED: &str = "unversioned";

/// Key of a minified source or source map in object storage.
///
/// Renders as `<project_id>/<version>/<location>`. The location keeps enough
/// of the original to tell URLs, absolute paths and relative paths apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
	pub project_id: ProjectId,
	pub version: String,
	/// Normalized location of the artifact.
	pub location: String,
}

impl ArtifactKey {
	pub fn new(project_id: ProjectId, version: Option<&str>, location: &str) -> Self {
		let version = version
			.filter(|v| !v.is_empty())
			.unwrap_or(UNVERSIONED)
			.to_string();

		Self {
			project_id,
			version,
			location: normalize_location(location),
		}
	}
}

impl fmt::Display for ArtifactKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.project_id, self.version, self.location)
	}
}

/// URLs become `<scheme>/<host>/<path>`. Filesystem paths become
/// `disk/abs/<path>` or `disk/rel/<path>`, with any leading `./` dropped from
/// relative paths.
fn normalize_location(location: &str) -> String {
	if let Some((scheme, rest)) = location.split_once("://") {
		if is_scheme(scheme) {
			return format!("{}/{}", scheme.to_ascii_lowercase(), rest);
		}
	}

	match location.strip_prefix('/') {
		Some(path) => format!("disk/abs/{path}"),
		None => {
			let mut path = location;
			while let Some(rest) = path.strip_prefix("./") {
				path = rest;
			}
			format!("disk/rel/{path}")
		}
	}
}

/// RFC 3986 scheme syntax. Single letters are drive letters.
fn is_scheme(candidate: &str) -> bool {
	let mut chars = candidate.chars();
	candidate.len() > 1
		&& chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
