//! Shared fixtures: a throwaway origin server and a gateway wired to it
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_test::TestServer;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};

use plexio::config::Config;
use plexio::resources::AppResources;
use plexio::web::WebServer;

pub const TOKEN: &str = "secret-token";
pub const INSTALLATION: &str = "inst-1";
pub const MEDIA_LEN: usize = 200_000;

pub fn media_bytes() -> Vec<u8> {
    (0..MEDIA_LEN).map(|i| (i % 251) as u8).collect()
}

/// Requests the origin saw, as `METHOD path?query` plus the Range header
#[derive(Default)]
pub struct OriginLog {
    pub requests: Mutex<Vec<String>>,
    pub ranges: Mutex<Vec<String>>,
}

impl OriginLog {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn ranges(&self) -> Vec<String> {
        self.ranges.lock().unwrap().clone()
    }

    fn record(&self, path: &str, params: &HashMap<String, String>) {
        let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        self.requests
            .lock()
            .unwrap()
            .push(format!("{path}?{}", pairs.join("&")));
    }
}

type Params = Query<HashMap<String, String>>;

fn authorized(params: &HashMap<String, String>) -> Result<(), StatusCode> {
    match params.get("X-Plex-Token").map(String::as_str) {
        Some(TOKEN) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn container(metadata: Vec<Value>) -> Json<Value> {
    Json(json!({
        "MediaContainer": {
            "size": metadata.len(),
            "totalSize": metadata.len(),
            "Metadata": metadata,
        }
    }))
}

fn movie_listing() -> Value {
    json!({
        "ratingKey": 100,
        "key": "/library/metadata/100",
        "guid": "plex://movie/heat",
        "type": "movie",
        "title": "Heat",
        "year": 1995,
        "thumb": "/library/metadata/100/thumb/1",
        "Guid": [{"id": "imdb://tt0113277"}, {"id": "tmdb://949"}],
    })
}

fn movie_full() -> Value {
    json!({
        "ratingKey": "100",
        "key": "/library/metadata/100",
        "guid": "plex://movie/heat",
        "type": "movie",
        "title": "Heat",
        "year": 1995,
        "librarySectionTitle": "Movies",
        "Media": [{
            "videoResolution": "1080",
            "width": 1920,
            "height": 1080,
            "Part": [{
                "key": "/library/parts/100/file.mkv",
                "file": "/movies/Heat (1995).mkv",
                "size": MEDIA_LEN,
                "Stream": [
                    {"id": 1, "streamType": 2, "languageTag": "en"},
                    {"id": 2, "streamType": 3, "languageTag": "en", "displayTitle": "English", "key": "/library/streams/2"},
                ],
            }],
        }],
    })
}

fn show_full() -> Value {
    json!({
        "ratingKey": "200",
        "key": "/library/metadata/200/children",
        "guid": "plex://show/wire",
        "type": "show",
        "title": "The Wire",
        "addedAt": 1_700_000_000,
        "Guid": [{"id": "imdb://tt0306414"}],
    })
}

fn episodes() -> Vec<Value> {
    vec![
        json!({
            "ratingKey": "201",
            "guid": "plex://episode/wire-1-1",
            "type": "episode",
            "title": "The Target",
            "parentIndex": 1,
            "index": 1,
            "originallyAvailableAt": "2002-06-02",
        }),
        json!({
            "ratingKey": "202",
            "guid": "plex://episode/wire-1-2",
            "type": "episode",
            "title": "The Detail",
            "parentIndex": 1,
            "index": 2,
        }),
    ]
}

fn episode_full() -> Value {
    json!({
        "ratingKey": "201",
        "key": "/library/metadata/201",
        "guid": "plex://episode/wire-1-1",
        "type": "episode",
        "title": "The Target",
        "grandparentTitle": "The Wire",
        "librarySectionTitle": "TV Shows",
        "Media": [{
            "videoResolution": "720",
            "width": 1280,
            "Part": [{"key": "/library/parts/201/file.mkv", "file": "/tv/S01E01.mkv"}],
        }],
    })
}

async fn sections(State(log): State<Arc<OriginLog>>, Query(params): Params) -> Response {
    log.record("/library/sections", &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    Json(json!({
        "MediaContainer": {
            "size": 3,
            "Directory": [
                {"key": "1", "title": "Movies", "type": "movie"},
                {"key": "2", "title": "TV Shows", "type": "show"},
                {"key": "3", "title": "Music", "type": "artist"},
            ],
        }
    }))
    .into_response()
}

async fn section_all(
    State(log): State<Arc<OriginLog>>,
    Path(section): Path<String>,
    Query(params): Params,
) -> Response {
    log.record(&format!("/library/sections/{section}/all"), &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    match section.as_str() {
        "1" => container(vec![movie_listing()]).into_response(),
        _ => container(vec![]).into_response(),
    }
}

async fn library_all(State(log): State<Arc<OriginLog>>, Query(params): Params) -> Response {
    log.record("/library/all", &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    let items = match params.get("guid").map(String::as_str) {
        Some("plex://movie/heat") => vec![movie_listing()],
        Some("plex://show/wire") => vec![show_full()],
        Some("plex://episode/wire-1-1") => vec![episodes()[0].clone()],
        _ => vec![],
    };
    container(items).into_response()
}

async fn metadata(
    State(log): State<Arc<OriginLog>>,
    Path(key): Path<String>,
    Query(params): Params,
) -> Response {
    log.record(&format!("/library/metadata/{key}"), &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    let item = match key.as_str() {
        "100" => vec![movie_full()],
        "200" => vec![show_full()],
        "201" => vec![episode_full()],
        _ => vec![],
    };
    container(item).into_response()
}

async fn all_leaves(
    State(log): State<Arc<OriginLog>>,
    Path(key): Path<String>,
    Query(params): Params,
) -> Response {
    log.record(&format!("/library/metadata/{key}/allLeaves"), &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    container(episodes()).into_response()
}

/// Matching service: knows one movie and one show
async fn matches(State(log): State<Arc<OriginLog>>, Query(params): Params) -> Response {
    log.record("/library/metadata/matches", &params);
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    let guid = match params.get("title").map(String::as_str) {
        Some("imdb-tt0113277") => "plex://movie/heat",
        Some("imdb-tt0306414") => "plex://show/wire",
        _ => return container(vec![]).into_response(),
    };
    container(vec![json!({"guid": guid, "title": "match"})]).into_response()
}

/// Media bytes with single-range support
async fn part(
    State(log): State<Arc<OriginLog>>,
    Path(rest): Path<String>,
    Query(params): Params,
    headers: HeaderMap,
) -> Response {
    log.record(&format!("/library/parts/{rest}"), &params);
    if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        log.ranges.lock().unwrap().push(range.to_string());
    }
    if let Err(status) = authorized(&params) {
        return status.into_response();
    }
    if rest != "100/file.mkv" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let bytes = media_bytes();
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(start, end)| Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)));

    let mut response = match range {
        Some((start, end)) => {
            let slice = bytes[start..=end].to_vec();
            let mut response = (StatusCode::PARTIAL_CONTENT, slice).into_response();
            response.headers_mut().insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!("bytes {start}-{end}/{MEDIA_LEN}")).unwrap(),
            );
            response
        }
        None => (StatusCode::OK, bytes).into_response(),
    };
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/x-matroska"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert("x-origin-secret", HeaderValue::from_static("internal"));
    headers.insert(header::SET_COOKIE, HeaderValue::from_static("session=1"));
    response
}

/// Bind the fake origin on an ephemeral port and return its base URL
pub async fn spawn_origin() -> (String, Arc<OriginLog>) {
    let log = Arc::new(OriginLog::default());
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/library/sections", get(sections))
        .route("/library/sections/{section}/all", get(section_all))
        .route("/library/all", get(library_all))
        .route("/library/metadata/matches", get(matches))
        .route("/library/metadata/{key}", get(metadata))
        .route("/library/metadata/{key}/allLeaves", get(all_leaves))
        .route("/library/parts/{*rest}", get(part))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), log)
}

/// URL-safe configuration blob pointing both bases at `origin`
pub fn encoded_config(origin: &str) -> String {
    let config = json!({
        "accessToken": TOKEN,
        "discoveryUrl": origin,
        "streamingUrl": origin,
        "serverName": "Home",
        "sections": [
            {"key": "1", "title": "Movies", "type": "movie"},
            {"key": "2", "title": "TV Shows", "type": "show"},
        ],
    });
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(&config).unwrap())
}

pub struct Gateway {
    pub server: TestServer,
    pub resources: AppResources,
    pub origin: String,
    pub log: Arc<OriginLog>,
    pub cfg: String,
}

impl Gateway {
    /// `/{installation}/{cfg}` prefix of addon routes
    pub fn prefix(&self) -> String {
        format!("/{INSTALLATION}/{}", self.cfg)
    }
}

/// Gateway with real origin client pools and a memory cache, matching
/// service on the fake origin too
pub async fn spawn_gateway() -> Gateway {
    let (origin, log) = spawn_origin().await;
    let mut config = Config::default();
    config.plex.matching_url = origin.clone();

    let resources = AppResources::startup(&config).await.unwrap();
    let server = TestServer::new(WebServer::create_router(resources.app_state())).unwrap();
    let cfg = encoded_config(&origin);

    Gateway {
        server,
        resources,
        origin,
        log,
        cfg,
    }
}
