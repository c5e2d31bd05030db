// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retrieval of minified sources and source maps.
//!
//! Two strategies are provided: [`DiskFetcher`] for artifacts on the local
//! filesystem and [`NetworkFetcher`] for artifacts served over HTTP(S). Each
//! fetch is a single attempt; there is no retry.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use loom_crash_core::StackFrameInput;
use loom_crash_symbolicate::is_url;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::config::SymbolicationConfig;
use crate::error::FetchError;

/// Retrieves the raw bytes at a location.
#[async_trait]
pub trait Fetcher: Send + Sync {
	/// Short name for logging.
	fn name(&self) -> &'static str;

	async fn fetch(&self, location: &str) -> Result<Bytes, FetchError>;
}

/// Reads artifacts from the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskFetcher {
	max_bytes: u64,
}

impl DiskFetcher {
	pub fn new(max_bytes: u64) -> Self {
		Self { max_bytes }
	}

	pub fn from_config(config: &SymbolicationConfig) -> Self {
		Self::new(config.max_artifact_bytes)
	}
}

impl Default for DiskFetcher {
	fn default() -> Self {
		Self::from_config(&SymbolicationConfig::default())
	}
}

#[async_trait]
impl Fetcher for DiskFetcher {
	fn name(&self) -> &'static str {
		"disk"
	}

	#[instrument(skip(self))]
	async fn fetch(&self, location: &str) -> Result<Bytes, FetchError> {
		let metadata = tokio::fs::metadata(location)
			.await
			.map_err(FetchError::NotFound)?;
		if metadata.len() > self.max_bytes {
			return Err(FetchError::TooLarge {
				size: metadata.len(),
				max: self.max_bytes,
			});
		}

		let data = tokio::fs::read(location)
			.await
			.map_err(FetchError::NotFound)?;
		debug!(bytes = data.len(), "Read artifact from disk");
		Ok(Bytes::from(data))
	}
}

/// Downloads artifacts with a single HTTP GET.
#[derive(Debug, Clone)]
pub struct NetworkFetcher {
	client: Client,
	max_bytes: u64,
}

impl NetworkFetcher {
	pub fn new(client: Client, max_bytes: u64) -> Self {
		Self { client, max_bytes }
	}

	/// Build a fetcher with the shared Loom HTTP client and the configured
	/// request timeout.
	pub fn from_config(config: &SymbolicationConfig) -> reqwest::Result<Self> {
		let client = loom_common_http::new_client_with_timeout(config.request_timeout())?;
		Ok(Self::new(client, config.max_artifact_bytes))
	}

	fn parse_location(location: &str) -> Result<Url, FetchError> {
		let unsupported = |scheme: &str| {
			FetchError::Transport(format!(
				"Get \"{location}\": unsupported protocol scheme \"{scheme}\""
			))
		};

		match Url::parse(location) {
			Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
			Ok(url) => Err(unsupported(url.scheme())),
			Err(_) => Err(unsupported("")),
		}
	}
}

#[async_trait]
impl Fetcher for NetworkFetcher {
	fn name(&self) -> &'static str {
		"network"
	}

	#[instrument(skip(self))]
	async fn fetch(&self, location: &str) -> Result<Bytes, FetchError> {
		let url = Self::parse_location(location)?;

		let mut response = self
			.client
			.get(url)
			.send()
			.await
			.map_err(|e| FetchError::Transport(format!("Get \"{location}\": {e}")))?;

		let status = response.status();
		if !status.is_success() {
			debug!(status = status.as_u16(), "Artifact request failed");
			return Err(FetchError::BadStatus {
				status: status.as_u16(),
			});
		}

		if let Some(size) = response.content_length() {
			if size > self.max_bytes {
				return Err(FetchError::TooLarge {
					size,
					max: self.max_bytes,
				});
			}
		}

		// Chunked responses carry no length, so the limit is enforced while reading.
		let mut body = BytesMut::new();
		while let Some(chunk) = response
			.chunk()
			.await
			.map_err(|e| FetchError::Transport(format!("Get \"{location}\": {e}")))?
		{
			let size = (body.len() + chunk.len()) as u64;
			if size > self.max_bytes {
				return Err(FetchError::TooLarge {
					size,
					max: self.max_bytes,
				});
			}
			body.extend_from_slice(&chunk);
		}

		debug!(bytes = body.len(), "Downloaded artifact");
		Ok(body.freeze())
	}
}

/// Pick the fetch strategy for a trace from the shape of its first location.
///
/// A location with a URL scheme selects [`NetworkFetcher`], anything else
/// [`DiskFetcher`].
pub fn select_fetcher(
	frames: &[StackFrameInput],
	config: &SymbolicationConfig,
) -> reqwest::Result<Arc<dyn Fetcher>> {
	let remote = frames
		.first()
		.is_some_and(|frame| is_url(&frame.file_name));

	if remote {
		Ok(Arc::new(NetworkFetcher::from_config(config)?))
	} else {
		Ok(Arc::new(DiskFetcher::from_config(config)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn network_fetcher() -> NetworkFetcher {
		NetworkFetcher::from_config(&SymbolicationConfig::default()).unwrap()
	}

	#[tokio::test]
	async fn disk_fetcher_reads_file() {
		let dir = tempdir().unwrap();
		let file = dir.path().join("app.min.js");
		std::fs::write(&file, "var a=1;").unwrap();

		let data = DiskFetcher::default()
			.fetch(file.to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(&data[..], b"var a=1;");
	}

	#[tokio::test]
	async fn disk_fetcher_missing_file() {
		let dir = tempdir().unwrap();
		let file = dir.path().join("missing.js");

		let err = DiskFetcher::default()
			.fetch(file.to_str().unwrap())
			.await
			.unwrap_err();
		assert!(err.is_not_found());
		assert!(err.to_string().starts_with("error opening file: "));
	}

	#[tokio::test]
	async fn disk_fetcher_enforces_size_limit() {
		let dir = tempdir().unwrap();
		let file = dir.path().join("big.js");
		std::fs::write(&file, "0123456789").unwrap();

		let err = DiskFetcher::new(4)
			.fetch(file.to_str().unwrap())
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::TooLarge { size: 10, max: 4 }));
	}

	#[tokio::test]
	async fn network_fetcher_downloads_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/static/app.min.js"))
			.respond_with(ResponseTemplate::new(200).set_body_string("var a=1;"))
			.expect(1)
			.mount(&server)
			.await;

		let data = network_fetcher()
			.fetch(&format!("{}/static/app.min.js", server.uri()))
			.await
			.unwrap();
		assert_eq!(&data[..], b"var a=1;");
	}

	#[tokio::test]
	async fn network_fetcher_bad_status() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/broken.js"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let fetcher = network_fetcher();

		let err = fetcher
			.fetch(&format!("{}/broken.js", server.uri()))
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::BadStatus { status: 500 }));
		assert_eq!(err.to_string(), "status code not OK");

		// Unmatched paths are 404s.
		let err = fetcher
			.fetch(&format!("{}/missing.js", server.uri()))
			.await
			.unwrap_err();
		assert!(err.is_not_found());
	}

	#[tokio::test]
	async fn network_fetcher_enforces_size_limit() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/big.js"))
			.respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
			.mount(&server)
			.await;

		let fetcher = NetworkFetcher::new(Client::new(), 4);
		let err = fetcher
			.fetch(&format!("{}/big.js", server.uri()))
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::TooLarge { size: 10, .. }));
	}

	#[tokio::test]
	async fn network_fetcher_limits_chunked_bodies() {
		use tokio::io::{AsyncReadExt, AsyncWriteExt};
		use tokio::net::TcpListener;

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut request = [0u8; 1024];
			let _ = socket.read(&mut request).await;
			let response = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
				6\r\n012345\r\n6\r\n678901\r\n6\r\nabcdef\r\n0\r\n\r\n";
			let _ = socket.write_all(response.as_bytes()).await;
		});

		let err = NetworkFetcher::new(Client::new(), 10)
			.fetch(&format!("http://{addr}/bundle.js"))
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::TooLarge { size: 12, max: 10 }));
	}

	#[tokio::test]
	async fn network_fetcher_rejects_paths() {
		let err = network_fetcher()
			.fetch("/file/local/domain.js")
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			r#"error getting source file: Get "/file/local/domain.js": unsupported protocol scheme """#
		);
	}

	#[tokio::test]
	async fn network_fetcher_rejects_other_schemes() {
		let err = network_fetcher()
			.fetch("ftp://example.com/app.js")
			.await
			.unwrap_err();
		assert!(err
			.to_string()
			.contains(r#"unsupported protocol scheme "ftp""#));
	}

	#[tokio::test]
	async fn network_fetcher_connection_refused() {
		// Port 9 (discard) is not listening on loopback in test environments.
		let err = network_fetcher()
			.fetch("http://127.0.0.1:9/app.js")
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::Transport(_)));
		assert!(err
			.to_string()
			.starts_with(r#"error getting source file: Get "http://127.0.0.1:9/app.js": "#));
	}

	#[test]
	fn select_fetcher_by_location_shape() {
		let config = SymbolicationConfig::default();

		let remote = [StackFrameInput::new("https://cdn.example.com/app.js", 1, 0)];
		assert_eq!(select_fetcher(&remote, &config).unwrap().name(), "network");

		let local = [StackFrameInput::new("./test-files/app.js", 1, 0)];
		assert_eq!(select_fetcher(&local, &config).unwrap().name(), "disk");

		assert_eq!(select_fetcher(&[], &config).unwrap().name(), "disk");
	}
}
