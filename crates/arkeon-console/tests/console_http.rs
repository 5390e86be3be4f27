use arkeon_api_models::{DownloadStatus, SourceKind, SourceStatus};
use arkeon_config::{ConfigLoader, ConfigOverrides};
use arkeon_console::{Console, ControlChange, EntityKey, SourceForm, StatusFilter};
use arkeon_telemetry::{Metrics, RefreshOutcome};
use httpmock::prelude::*;
use serde_json::json;

const TRACE: &str = "trace-http-console";

fn connect(server: &MockServer) -> Console {
    let base = format!("{}/api", server.base_url());
    let lookup = move |key: &str| (key == "ARKEON_API_URL").then(|| base.clone());
    let config = ConfigLoader::from_lookup(lookup)
        .load(&ConfigOverrides::default())
        .expect("config");
    Console::connect(&config, TRACE, Metrics::new().expect("metrics")).expect("console")
}

fn mock_reads(server: &MockServer, sources: serde_json::Value) {
    server.mock(|when, then| {
        when.method(GET).path("/api/sources").header("x-request-id", TRACE);
        then.status(200).json_body(sources);
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/tracks/artists");
        then.status(200).json_body(json!(["Boards of Canada", "", "Aphex Twin"]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/tracks/years");
        then.status(200).json_body(json!(["1998", "2013"]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/tracks/stats");
        then.status(200)
            .json_body(json!({"completed": 3, "pending": 1, "failed": 1, "ignored": 0}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/config/cookies");
        then.status(200).json_body(json!({"status": "success", "exists": false}));
    });
}

#[tokio::test]
async fn refresh_cycle_populates_snapshot_over_http() {
    let server = MockServer::start_async().await;
    mock_reads(&server, json!([]));
    let tracks = server.mock(|when, then| {
        when.method(GET)
            .path("/api/tracks")
            .query_param("page", "1")
            .query_param("page_size", "50")
            .query_param("status", "failed");
        then.status(200).json_body(json!({
            "items": [{
                "id": 12,
                "youtube_id": "abc",
                "title": "Roygbiv",
                "source_id": null,
                "source_name": null,
                "source_type": null,
                "file_path": null,
                "download_status": "failed",
                "created_at": "2024-03-02T08:00:00",
                "downloaded_at": null,
                "published_at": "1998-04-20",
                "artist": "Boards of Canada"
            }],
            "total": 1,
            "page": 1,
            "pages": 1
        }));
    });

    let console = connect(&server);
    console.set_control(ControlChange::Status(StatusFilter::Only(DownloadStatus::Failed)));
    let report = console.refresh_now().await;
    assert_eq!(report.outcome, RefreshOutcome::Applied);
    tracks.assert();

    let snapshot = console.snapshot();
    assert_eq!(snapshot.artists, vec!["Aphex Twin", "Boards of Canada"]);
    assert_eq!(snapshot.years, vec!["2013", "1998"]);
    assert_eq!(snapshot.dashboard().total_tracks, 5);
    assert_eq!(
        snapshot.track(12).and_then(|t| t.artist.as_deref()),
        Some("Boards of Canada")
    );
}

#[tokio::test]
async fn add_source_then_refresh_over_http() {
    let server = MockServer::start_async().await;
    mock_reads(
        &server,
        json!([{
            "id": 1,
            "url": "https://music.example/artist/1",
            "name": "New artist",
            "type": "artist",
            "status": "active",
            "created_at": "2024-03-02T08:00:00"
        }]),
    );
    server.mock(|when, then| {
        when.method(GET).path("/api/tracks");
        then.status(200)
            .json_body(json!({"items": [], "total": 0, "page": 1, "pages": 0}));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/api/sources")
            .header("x-request-id", TRACE)
            .json_body(json!({
                "url": "https://music.example/artist/1",
                "name": "New artist",
                "type": "artist"
            }));
        then.status(200).json_body(json!({
            "id": 1,
            "url": "https://music.example/artist/1",
            "name": "New artist",
            "type": "artist",
            "status": "active",
            "created_at": "2024-03-02T08:00:00"
        }));
    });

    let mut console = connect(&server);
    let mut form = SourceForm::new("https://music.example/artist/1", "", SourceKind::Artist);
    console
        .mutations()
        .add_source(&mut form)
        .await
        .expect("source created");
    create.assert();
    assert!(console.snapshot().is_busy(EntityKey::SourceForm));

    let reports = console.drain_pending().await;
    assert_eq!(reports.len(), 1);
    let snapshot = console.snapshot();
    assert_eq!(snapshot.sources.len(), 1);
    assert_eq!(
        snapshot.source(1).map(|s| s.status),
        Some(SourceStatus::Active)
    );
    assert!(!snapshot.is_busy(EntityKey::SourceForm));
    assert_eq!(snapshot.dashboard().active_sources, 1);
}

#[tokio::test]
async fn failing_read_discards_the_cycle() {
    let server = MockServer::start_async().await;
    mock_reads(&server, json!([]));
    server.mock(|when, then| {
        when.method(GET).path("/api/tracks");
        then.status(500).json_body(json!({"detail": "database locked"}));
    });

    let console = connect(&server);
    let report = console.refresh_now().await;
    assert_eq!(report.outcome, RefreshOutcome::Failed);
    assert!(!console.snapshot().is_loaded());
    assert_eq!(console.metrics().snapshot().refresh_failed, 1);
}
