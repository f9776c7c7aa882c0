//! `GET|HEAD /{installation_id}/{cfg}/proxy?q=…`

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Method, Response},
};
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::streaming::ProxyMethod;
use crate::web::AppState;
use crate::web::extractors::Installation;

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub q: Option<String>,
}

pub async fn proxy_stream(
    State(state): State<AppState>,
    installation: Installation,
    method: Method,
    Query(params): Query<ProxyParams>,
    headers: HeaderMap,
) -> AppResult<Response<Body>> {
    let method = if method == Method::HEAD {
        ProxyMethod::Head
    } else {
        ProxyMethod::Get
    };
    let config = &installation.config;

    state
        .proxy
        .handle(
            method,
            params.q.as_deref(),
            &headers,
            config.streaming_base(),
            &config.access_token,
        )
        .await
        .map_err(AppError::from)
}
