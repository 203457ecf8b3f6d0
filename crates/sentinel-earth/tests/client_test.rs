//! EarthEngineClient against a local stand-in for the REST API

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use sentinel_core::models::{Coordinate, DateRange, ImageQuery, LayerType, Polygon};
use sentinel_core::ports::EarthEngine;
use sentinel_core::SentinelError;
use sentinel_earth::{EarthEngineClient, EarthEngineSettings, StaticToken};
use serde_json::{json, Value};

type Responder = dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync;

#[derive(Clone)]
struct FakeEngine {
    respond: Arc<Responder>,
    seen: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn handle(
    State(engine): State<FakeEngine>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    engine
        .seen
        .lock()
        .unwrap()
        .push((uri.path().to_string(), auth, body.clone()));
    let (status, reply) = (engine.respond)(uri.path(), &body);
    (status, Json(reply))
}

/// Name of the function at the root of a compute request, or `dictionary`
fn root_kind(body: &Value) -> String {
    let expression = &body["expression"];
    let root = &expression["values"][expression["result"].as_str().unwrap_or_default()];
    if root.get("dictionaryValue").is_some() {
        return "dictionary".to_string();
    }
    root["functionInvocationValue"]["functionName"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

async fn start(
    respond: impl Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
) -> (EarthEngineClient, FakeEngine) {
    let engine = FakeEngine {
        respond: Arc::new(respond),
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new().fallback(handle).with_state(engine.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut settings = EarthEngineSettings::new("demo");
    settings.base_url = format!("http://{}/v1", addr);
    settings.concurrency = 2;
    let token = Arc::new(StaticToken("test-token".into()));
    let client = EarthEngineClient::new(settings, token).unwrap();
    (client, engine)
}

fn area() -> Polygon {
    Polygon::new(vec![
        Coordinate::new(-1.46, -48.50),
        Coordinate::new(-1.46, -48.46),
        Coordinate::new(-1.42, -48.46),
        Coordinate::new(-1.42, -48.50),
    ])
    .unwrap()
}

fn query(layer: LayerType) -> ImageQuery {
    ImageQuery {
        polygon: area(),
        dates: DateRange::parse("2024-01-01", "2024-03-31").unwrap(),
        layer,
        cloud_percentage: 30.0,
        specific_date: None,
    }
}

#[tokio::test]
async fn test_list_images_sends_bearer_token_and_parses_columns() {
    let (client, engine) = start(|_, _| {
        (
            StatusCode::OK,
            json!({"result": {
                "times": [1_709_251_200_000_i64, 1_706_745_600_000_i64],
                "clouds": [18.25, 4.5],
                "total": 2
            }}),
        )
    })
    .await;

    let listing = client.list_images(&query(LayerType::Ndvi)).await.unwrap();
    assert_eq!(listing.total_found, 2);
    assert_eq!(listing.images[0].date, "2024-03-01");
    assert_eq!(listing.images[0].satellite, "Sentinel-2");
    assert_eq!(listing.best().unwrap().date, "2024-02-01");

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/v1/projects/demo/value:compute");
    assert_eq!(seen[0].1.as_deref(), Some("Bearer test-token"));
    assert_eq!(root_kind(&seen[0].2), "dictionary");
}

#[tokio::test]
async fn test_dem_cannot_be_listed() {
    let (client, engine) = start(|_, _| (StatusCode::OK, json!({"result": null}))).await;

    let err = client.list_images(&query(LayerType::Dem)).await.unwrap_err();
    assert!(matches!(err, SentinelError::InvalidInput { .. }));
    assert!(engine.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_layer_tile_without_imagery_is_reported() {
    let (client, engine) = start(|_, _| (StatusCode::OK, json!({"result": {"count": 0}}))).await;

    let err = client.layer_tile(&query(LayerType::Ndvi)).await.unwrap_err();
    match err {
        SentinelError::NoImagery { layer, hint } => {
            assert_eq!(layer, "NDVI");
            assert!(hint.contains("2024-01-01"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // no map is registered when the scene lookup finds nothing
    assert_eq!(engine.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_layer_tile_registers_map_with_scene_date() {
    let (client, engine) = start(|path, _| {
        if path.ends_with("/maps") {
            (StatusCode::OK, json!({"name": "projects/demo/maps/abc123"}))
        } else {
            (StatusCode::OK, json!({"result": {"count": 4, "time": 1_708_300_800_000_i64}}))
        }
    })
    .await;

    let tile = client.layer_tile(&query(LayerType::Ndwi)).await.unwrap();
    assert_eq!(tile.date, "2024-02-19");
    assert_eq!(tile.layer_type, LayerType::Ndwi);
    assert!(tile.tile_url.ends_with("/v1/projects/demo/maps/abc123/tiles/{z}/{x}/{y}"));

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].0, "/v1/projects/demo/maps");
    let map_body = &seen[1].2;
    assert_eq!(
        map_body["expression"]["values"][map_body["expression"]["result"].as_str().unwrap()]
            ["functionInvocationValue"]["functionName"],
        "Image.visualize"
    );
}

#[tokio::test]
async fn test_sar_backscatter_counts_then_reduces() {
    let (client, _engine) = start(|_, body| match root_kind(body).as_str() {
        "Collection.size" => (StatusCode::OK, json!({"result": 6})),
        _ => (
            StatusCode::OK,
            json!({"result": {"VV_mean": -19.4, "VV_min": -27.0, "VV_max": -8.1, "VV_stdDev": 3.2}}),
        ),
    })
    .await;

    let dates = DateRange::parse("2024-01-01", "2024-02-01").unwrap();
    let sar = client.sar_backscatter(&area(), &dates).await.unwrap();
    assert_eq!(sar.images_used, 6);
    assert_eq!(sar.polarization, "VV");
    assert_eq!(sar.mean_backscatter, -19.4);
    assert!(sar.flood_indicator());
}

#[tokio::test]
async fn test_sar_backscatter_without_pixels_is_missing_statistic() {
    let (client, _engine) = start(|_, body| match root_kind(body).as_str() {
        "Collection.size" => (StatusCode::OK, json!({"result": 2})),
        _ => (StatusCode::OK, json!({"result": {"VV_mean": null}})),
    })
    .await;

    let dates = DateRange::parse("2024-01-01", "2024-02-01").unwrap();
    let err = client.sar_backscatter(&area(), &dates).await.unwrap_err();
    assert!(matches!(err, SentinelError::MissingStatistic { .. }));
}

#[tokio::test]
async fn test_water_bodies_converts_to_hectares() {
    let (client, _engine) = start(|_, body| match root_kind(body).as_str() {
        "Collection.size" => (StatusCode::OK, json!({"result": 1})),
        _ => (
            StatusCode::OK,
            json!({"result": {
                "area": 2_000_000.0,
                "water": {"NDWI": 500_000.0},
                "stats": {"NDWI_mean": 0.12, "NDWI_min": -0.4, "NDWI_max": 0.7}
            }}),
        ),
    })
    .await;

    let dates = DateRange::parse("2024-01-01", "2024-02-01").unwrap();
    let water = client.water_bodies(&area(), &dates).await.unwrap();
    assert_eq!(water.total_area_ha, 200.0);
    assert_eq!(water.water_area_ha, 50.0);
    assert_eq!(water.water_percentage(), 25.0);
    assert_eq!(water.ndwi_max, Some(0.7));
}

#[tokio::test]
async fn test_rejected_credentials_map_to_auth_error() {
    let (client, _engine) = start(|_, _| {
        (
            StatusCode::FORBIDDEN,
            json!({"error": {"code": 403, "message": "Caller does not have permission", "status": "PERMISSION_DENIED"}}),
        )
    })
    .await;

    match client.ping().await.unwrap_err() {
        SentinelError::Auth { reason } => {
            assert!(reason.contains("Caller does not have permission"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_upstream_failure_carries_message() {
    let (client, _engine) = start(|_, _| {
        (
            StatusCode::BAD_REQUEST,
            json!({"error": {"code": 400, "message": "Collection.first: Empty collection."}}),
        )
    })
    .await;

    let err = client.elevation(&area()).await.unwrap_err();
    match err {
        SentinelError::EarthEngine { reason } => {
            assert_eq!(reason, "HTTP 400: Collection.first: Empty collection.")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
