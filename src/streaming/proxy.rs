//! Range-aware streaming reverse proxy
//!
//! Clients never see the origin token: the `q` parameter carries only the
//! relative origin path and query, and the token is injected here from the
//! addon configuration. Any token the client smuggles into `q` is dropped.
//!
//! The upstream response (and with it the pooled connection) is owned by the
//! body stream handed to axum. It is released when the body is fully drained,
//! when the client disconnects and axum drops the body, or immediately when
//! the upstream answers with an error status.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode, header};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::{ProxyError, ProxyResult};
use crate::utils::url::{TOKEN_PARAM, UrlUtils};

/// Largest chunk written to the client in one read
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Inbound headers passed upstream; everything else is dropped
pub const FORWARDED_REQUEST_HEADERS: [header::HeaderName; 2] = [header::RANGE, header::ACCEPT];

/// Upstream headers passed back to the client
pub const FORWARDED_RESPONSE_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Head,
}

impl ProxyMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

/// What the transport hands back: status, headers and the still-open body
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, ProxyResult<Bytes>>,
}

/// Outbound side of the proxy
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn send(
        &self,
        method: ProxyMethod,
        url: &str,
        headers: HeaderMap,
    ) -> ProxyResult<UpstreamResponse>;
}

/// reqwest-backed transport using the streaming pool
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProxyTransport for HttpTransport {
    async fn send(
        &self,
        method: ProxyMethod,
        url: &str,
        headers: HeaderMap,
    ) -> ProxyResult<UpstreamResponse> {
        let request = match method {
            ProxyMethod::Get => self.client.get(url),
            ProxyMethod::Head => self.client.head(url),
        };
        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(ProxyError::from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProxyError::from_reqwest))
            .boxed();

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Build the origin URL for a `q` value.
///
/// `q` is coerced to start with `/`. Repeated query keys collapse to their
/// last value (keeping first-seen order) and every token key, in any casing,
/// is replaced by `token`.
pub fn target_url(streaming_base: &str, q: &str, token: &str) -> ProxyResult<String> {
    let q = q.trim();
    if q.is_empty() {
        return Err(ProxyError::MissingQuery);
    }
    let relative = if q.starts_with('/') {
        q.to_string()
    } else {
        format!("/{q}")
    };
    let (path, query) = UrlUtils::split_path_query(&relative);

    let mut pairs = flatten_query(query);
    pairs.push((TOKEN_PARAM.to_string(), token.to_string()));

    let url = format!("{}{}", streaming_base.trim_end_matches('/'), path);
    Ok(UrlUtils::with_query(&url, &pairs))
}

/// Decode a query string into single-valued pairs, last value winning,
/// with any token parameter removed
pub fn flatten_query(query: &str) -> Vec<(String, String)> {
    let mut flattened: Vec<(String, String)> = Vec::new();
    for (key, value) in UrlUtils::parse_query(query) {
        if UrlUtils::is_token_param(&key) {
            continue;
        }
        match flattened.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => flattened.push((key, value)),
        }
    }
    flattened
}

/// Copy only `names` from `source`
fn pick_headers(source: &HeaderMap, names: &[header::HeaderName]) -> HeaderMap {
    let mut picked = HeaderMap::new();
    for name in names {
        if let Some(value) = source.get(name) {
            picked.insert(name.clone(), value.clone());
        }
    }
    picked
}

pub fn forwarded_request_headers(inbound: &HeaderMap) -> HeaderMap {
    pick_headers(inbound, &FORWARDED_REQUEST_HEADERS)
}

pub fn forwarded_response_headers(upstream: &HeaderMap) -> HeaderMap {
    pick_headers(upstream, &FORWARDED_RESPONSE_HEADERS)
}

/// Re-slice upstream chunks so no single write exceeds [`CHUNK_SIZE`]
pub fn bounded_chunks(
    body: BoxStream<'static, ProxyResult<Bytes>>,
) -> BoxStream<'static, ProxyResult<Bytes>> {
    body.flat_map(|item| {
        let pieces: Vec<ProxyResult<Bytes>> = match item {
            Ok(mut bytes) => {
                let mut pieces = Vec::with_capacity(bytes.len() / CHUNK_SIZE + 1);
                while bytes.len() > CHUNK_SIZE {
                    pieces.push(Ok(bytes.split_to(CHUNK_SIZE)));
                }
                if !bytes.is_empty() {
                    pieces.push(Ok(bytes));
                }
                pieces
            }
            Err(e) => {
                warn!("Upstream stream interrupted: {}", e);
                vec![Err(e)]
            }
        };
        stream::iter(pieces)
    })
    .boxed()
}

/// The proxy entrypoint bound to `GET|HEAD …/proxy?q=`
#[derive(Clone)]
pub struct StreamProxy {
    transport: Arc<dyn ProxyTransport>,
}

impl StreamProxy {
    pub fn new(transport: Arc<dyn ProxyTransport>) -> Self {
        Self { transport }
    }

    pub async fn handle(
        &self,
        method: ProxyMethod,
        q: Option<&str>,
        inbound: &HeaderMap,
        streaming_base: &str,
        token: &str,
    ) -> ProxyResult<Response<Body>> {
        let q = q.ok_or(ProxyError::MissingQuery)?;
        let url = target_url(streaming_base, q, token)?;
        let log_url = UrlUtils::obfuscate_token(&url);
        debug!("Proxy {} {}", method.as_str(), log_url);

        let upstream = self
            .transport
            .send(method, &url, forwarded_request_headers(inbound))
            .await
            .inspect_err(|e| error!("Proxy request to {} failed: {}", log_url, e))?;

        let status = upstream.status;
        if status.as_u16() >= 400 {
            warn!("Upstream answered {} for {}", status, log_url);
            // Releases the upstream connection before the error is reported
            drop(upstream);
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let headers = forwarded_response_headers(&upstream.headers);
        let body = match method {
            ProxyMethod::Head => {
                drop(upstream.body);
                Body::empty()
            }
            ProxyMethod::Get => Body::from_stream(bounded_chunks(upstream.body)),
        };

        let mut response = Response::builder()
            .status(status)
            .body(body)
            .map_err(|e| ProxyError::Response(e.to_string()))?;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
