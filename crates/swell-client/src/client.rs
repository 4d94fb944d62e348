//! Outbound request plumbing.
//!
//! Each call opens a fresh TCP connection and drives a single http1
//! request over it. The monitored service is polled at most once per
//! loop iteration, so connection reuse buys nothing here.

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tracing::debug;

use swell_core::{AutoscalerConfig, ServiceStatus};

use crate::error::ClientError;

/// Client for the monitored service's status/replicas endpoints.
///
/// Holds only the parsed endpoint location and the request timeout;
/// no connection state survives between calls.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    /// `host:port` to connect to.
    address: String,
    /// Path prefix from the configured base URL, without trailing slash.
    base_path: String,
    /// Timeout applied to the whole request (connect through body read).
    timeout: Duration,
}

impl ServiceClient {
    /// Build a client from a validated config.
    ///
    /// Fails only if the base URL cannot be parsed into an authority;
    /// `AutoscalerConfig::validate` is expected to have run first.
    pub fn new(config: &AutoscalerConfig) -> Result<Self, ClientError> {
        let uri: http::Uri = config
            .base_url
            .parse()
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url.clone()))?;

        let authority = uri
            .authority()
            .ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;

        let address = match authority.port_u16() {
            Some(_) => authority.to_string(),
            None => format!("{}:80", authority.host()),
        };

        let base_path = uri.path().trim_end_matches('/').to_string();

        Ok(Self {
            address,
            base_path,
            timeout: config.request_timeout(),
        })
    }

    /// Read the current status of the monitored service.
    ///
    /// One `GET {base_url}/status`. Any transport failure, non-2xx status,
    /// or undeserializable body is returned as an error; the caller owns
    /// the retry policy.
    pub async fn fetch_status(&self) -> Result<ServiceStatus, ClientError> {
        let body = self.send(Method::GET, "/status", None).await?;
        let status: ServiceStatus = serde_json::from_slice(&body)?;
        Ok(status)
    }

    /// Set the monitored service's replica count.
    ///
    /// One `PUT {base_url}/replicas` with `{"replicas": count}`. The
    /// response body is not inspected beyond the status code. The caller
    /// guarantees `count >= 1`.
    pub async fn set_replicas(&self, count: u32) -> Result<(), ClientError> {
        let payload = serde_json::json!({ "replicas": count }).to_string();
        self.send(Method::PUT, "/replicas", Some(Bytes::from(payload)))
            .await?;
        Ok(())
    }

    /// Issue one request and return the response body on a 2xx status.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Bytes, ClientError> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.send_inner(method, path, body)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(address = %self.address, path, ?timeout, "request timed out");
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    async fn send_inner(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Bytes, ClientError> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|source| ClientError::Connect {
                address: self.address.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(ClientError::Handshake)?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let uri = format!("{}{}", self.base_path, path);
        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(&uri)
            .header(http::header::HOST, &self.address)
            .header(http::header::USER_AGENT, "swell-client/0.1")
            .header(http::header::ACCEPT, "application/json");

        if body.is_some() {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
        }

        let req = builder.body(Full::new(body.unwrap_or_default()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(ClientError::Request)?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), %uri, %method, "non-2xx from monitored service");
            return Err(ClientError::Status(resp.status()));
        }

        let collected = resp.into_body().collect().await.map_err(ClientError::Body)?;
        Ok(collected.to_bytes())
    }
}
