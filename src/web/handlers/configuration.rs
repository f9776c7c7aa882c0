//! Configuration-page helpers: connection test and section discovery

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{LibraryDirectory, PlexMediaType};
use crate::utils::url::UrlUtils;
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct ServerParams {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SectionsResponse {
    pub sections: Vec<LibraryDirectory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn test_connection(
    State(state): State<AppState>,
    Query(params): Query<ServerParams>,
) -> Json<ConnectionStatus> {
    let success = state.origin.check_connection(&params.url, &params.token).await;
    debug!(
        "Connection test against {}: {}",
        UrlUtils::extract_host(&params.url).unwrap_or_default(),
        success
    );
    Json(ConnectionStatus { success })
}

/// Movie and show sections of a server; failures are reported in the body
pub async fn sections(
    State(state): State<AppState>,
    Query(params): Query<ServerParams>,
) -> Json<SectionsResponse> {
    match state.origin.list_sections(&params.url, &params.token).await {
        Ok(all) => Json(SectionsResponse {
            sections: all
                .into_iter()
                .filter(|s| matches!(s.section_type, PlexMediaType::Movie | PlexMediaType::Show))
                .collect(),
            error: None,
        }),
        Err(e) => {
            warn!("Failed to list sections: {}", e);
            Json(SectionsResponse {
                sections: Vec::new(),
                error: Some(e.to_string()),
            })
        }
    }
}
