//! Addon protocol routes against a fake origin

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde_json::Value;

use common::{INSTALLATION, TOKEN, spawn_gateway};

fn forwarded_host() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-host"),
        HeaderValue::from_static("plexio.example.com"),
    )
}

fn count(log: &[String], prefix: &str) -> usize {
    log.iter().filter(|r| r.starts_with(prefix)).count()
}

#[tokio::test]
async fn test_health_endpoint() {
    let gateway = spawn_gateway().await;
    let response = gateway.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_manifest_without_configuration() {
    let gateway = spawn_gateway().await;
    let body: Value = gateway.server.get("/manifest.json").await.json();

    assert_eq!(body["id"], "com.stremio.plexio");
    assert_eq!(body["name"], "Plexio");
    assert_eq!(body["behaviorHints"]["configurationRequired"], true);
    assert_eq!(body["catalogs"].as_array().unwrap().len(), 0);
    assert_eq!(body["contactEmail"], "support@plexio.stream");
}

#[tokio::test]
async fn test_manifest_for_installation() {
    let gateway = spawn_gateway().await;
    let body: Value = gateway
        .server
        .get(&format!("{}/manifest.json", gateway.prefix()))
        .await
        .json();

    assert_eq!(body["name"], "Plexio (Home)");
    assert_eq!(body["behaviorHints"]["configurationRequired"], false);
    assert!(
        body["description"]
            .as_str()
            .unwrap()
            .ends_with(&format!("Your installation ID: {INSTALLATION}"))
    );

    let catalogs = body["catalogs"].as_array().unwrap();
    assert_eq!(catalogs.len(), 2);
    assert_eq!(catalogs[0]["type"], "movie");
    assert_eq!(catalogs[0]["name"], "Movies | Home");
    assert_eq!(catalogs[1]["type"], "series");
}

#[tokio::test]
async fn test_undecodable_configuration_is_rejected() {
    let gateway = spawn_gateway().await;
    let response = gateway
        .server
        .get(&format!("/{INSTALLATION}/not-base64!/manifest.json"))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("configuration"));
}

#[tokio::test]
async fn test_movie_streams_resolved_and_cached() {
    let gateway = spawn_gateway().await;
    let path = format!("{}/stream/movie/tt0113277.json", gateway.prefix());

    let body: Value = gateway.server.get(&path).await.json();
    let streams = body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(
        streams[0]["url"],
        format!(
            "{}/library/parts/100/file.mkv?X-Plex-Token={TOKEN}",
            gateway.origin
        )
    );
    assert_eq!(streams[0]["name"], "Home Movies\n1080p");
    assert_eq!(streams[0]["behaviorHints"]["bingeGroup"], "Direct Play 1080");
    assert_eq!(streams[0]["subtitles"][0]["lang"], "English");

    // Second request is served from the id cache
    let again: Value = gateway.server.get(&path).await.json();
    assert_eq!(again["streams"], body["streams"]);
    assert_eq!(count(&gateway.log.requests(), "/library/metadata/matches"), 1);
}

#[tokio::test]
async fn test_episode_streams_resolved_through_series() {
    let gateway = spawn_gateway().await;
    let body: Value = gateway
        .server
        .get(&format!(
            "{}/stream/series/tt0306414:1:1.json",
            gateway.prefix()
        ))
        .await
        .json();

    let streams = body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert!(
        streams[0]["url"]
            .as_str()
            .unwrap()
            .contains("/library/parts/201/file.mkv")
    );
    assert_eq!(streams[0]["description"], "The Wire\nThe Target");
    assert_eq!(
        count(&gateway.log.requests(), "/library/metadata/200/allLeaves"),
        1
    );
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_give_empty_streams() {
    let gateway = spawn_gateway().await;
    for id in ["tt9999999", "tt0306414:x:1", "plexio:plex://movie/nothing"] {
        let body: Value = gateway
            .server
            .get(&format!(
                "{}/stream/movie/{}.json",
                gateway.prefix(),
                urlencoding::encode(id)
            ))
            .await
            .json();
        assert_eq!(body["streams"].as_array().unwrap().len(), 0, "{id}");
    }
}

#[tokio::test]
async fn test_plexio_id_skips_resolution() {
    let gateway = spawn_gateway().await;
    let body: Value = gateway
        .server
        .get(&format!(
            "{}/stream/movie/plexio%3Aplex%3A%2F%2Fmovie%2Fheat.json",
            gateway.prefix()
        ))
        .await
        .json();

    assert_eq!(body["streams"].as_array().unwrap().len(), 1);
    assert_eq!(count(&gateway.log.requests(), "/library/metadata/matches"), 0);
}

#[tokio::test]
async fn test_public_request_gets_proxied_urls() {
    let gateway = spawn_gateway().await;
    let (name, value) = forwarded_host();
    let body: Value = gateway
        .server
        .get(&format!("{}/stream/movie/tt0113277.json", gateway.prefix()))
        .add_header(name, value)
        .await
        .json();

    let stream = &body["streams"][0];
    let url = stream["url"].as_str().unwrap();
    assert_eq!(
        url,
        format!(
            "https://plexio.example.com{}/proxy?q=%2Flibrary%2Fparts%2F100%2Ffile.mkv",
            gateway.prefix()
        )
    );
    assert!(!url.contains(TOKEN));

    let subtitle = stream["subtitles"][0]["url"].as_str().unwrap();
    assert!(subtitle.starts_with("https://plexio.example.com/"));
    assert!(!subtitle.contains(TOKEN));
}

#[tokio::test]
async fn test_series_meta_lists_episodes() {
    let gateway = spawn_gateway().await;
    let response = gateway
        .server
        .get(&format!(
            "{}/meta/series/plexio%3Aplex%3A%2F%2Fshow%2Fwire.json",
            gateway.prefix()
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let meta = &body["meta"];
    assert_eq!(meta["id"], "plexio:plex://show/wire");
    assert_eq!(meta["name"], "The Wire");
    assert_eq!(meta["type"], "series");

    let videos = meta["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0]["id"], "plexio:plex://episode/wire-1-1");
    assert_eq!(videos[0]["released"], "2002-06-02T00:00:00.000Z");
    assert_eq!(videos[1]["episode"], 2);
    assert_eq!(videos[1]["season"], 1);
}

#[tokio::test]
async fn test_meta_requires_plexio_id() {
    let gateway = spawn_gateway().await;
    let response = gateway
        .server
        .get(&format!("{}/meta/movie/tt0113277.json", gateway.prefix()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let missing = gateway
        .server
        .get(&format!(
            "{}/meta/movie/plexio%3Aplex%3A%2F%2Fmovie%2Fnothing.json",
            gateway.prefix()
        ))
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_passes_extras_to_origin() {
    let gateway = spawn_gateway().await;
    let body: Value = gateway
        .server
        .get(&format!(
            "{}/catalog/movie/1/search=heat&skip=0.json",
            gateway.prefix()
        ))
        .await
        .json();

    let metas = body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["id"], "tt0113277");
    assert_eq!(metas[0]["releaseInfo"], "1995");
    assert!(
        metas[0]["poster"]
            .as_str()
            .unwrap()
            .ends_with("/library/metadata/100/thumb/1?X-Plex-Token=secret-token")
    );

    let requests = gateway.log.requests();
    let listing = requests
        .iter()
        .find(|r| r.starts_with("/library/sections/1/all"))
        .unwrap();
    assert!(listing.contains("title=heat"));
    assert!(listing.contains("sort=title"));
    assert!(listing.contains("X-Plex-Container-Start=0"));
}

#[tokio::test]
async fn test_plain_catalog_uses_default_sort() {
    let gateway = spawn_gateway().await;
    let response = gateway
        .server
        .get(&format!("{}/catalog/movie/1.json", gateway.prefix()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let requests = gateway.log.requests();
    let listing = requests
        .iter()
        .find(|r| r.starts_with("/library/sections/1/all"))
        .unwrap();
    assert!(listing.contains("sort=title"));
    assert!(!listing.contains("&title="));
}

#[tokio::test]
async fn test_configuration_helpers() {
    let gateway = spawn_gateway().await;

    let ok: Value = gateway
        .server
        .get("/api/v1/test-connection")
        .add_query_param("url", &gateway.origin)
        .add_query_param("token", TOKEN)
        .await
        .json();
    assert_eq!(ok["success"], true);

    let sections: Value = gateway
        .server
        .get("/api/v1/sections")
        .add_query_param("url", &gateway.origin)
        .add_query_param("token", TOKEN)
        .await
        .json();
    let listed = sections["sections"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(sections.get("error").is_none());

    let denied: Value = gateway
        .server
        .get("/api/v1/sections")
        .add_query_param("url", &gateway.origin)
        .add_query_param("token", "wrong")
        .await
        .json();
    assert_eq!(denied["sections"].as_array().unwrap().len(), 0);
    assert!(denied["error"].as_str().is_some());

    gateway.resources.shutdown().await;
}
