use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use metra_common::{Metric, MetricKind};
use serde::Deserialize;
use serde_json::json;

fn ok_status() -> Response {
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

/// Applies one validated metric to the store and mirrors it to the
/// write-through backend.
fn apply(state: &AppState, metric: &Metric) {
    match metric.kind {
        MetricKind::Gauge => {
            if let Some(value) = metric.value {
                state.store.update_gauge(&metric.id, value);
                state.write_through_gauge(&metric.id, value);
            }
        }
        MetricKind::Counter => {
            if let Some(delta) = metric.delta {
                state.store.update_counter(&metric.id, delta);
                state.write_through_counter(&metric.id, delta);
            }
        }
    }
}

/// `POST /update` — single metric, JSON body.
pub async fn update_metric(State(state): State<AppState>, body: Bytes) -> Response {
    let metric: Metric = match serde_json::from_slice(&body) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::debug!(error = %e, "rejected unparseable metric");
            return bad_request(format!("invalid metric JSON: {e}"));
        }
    };
    if let Err(e) = metric.validate() {
        return bad_request(e.to_string());
    }

    apply(&state, &metric);
    state.dump_if_sync();
    ok_status()
}

/// `POST /updates` — whole batch, JSON array body.
///
/// Metrics are applied independently in order: invalid entries are
/// collected and reported as one 400 while the valid ones stay applied.
pub async fn update_batch(State(state): State<AppState>, body: Bytes) -> Response {
    let metrics: Vec<Metric> = match serde_json::from_slice(&body) {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::debug!(error = %e, "rejected unparseable batch");
            return bad_request(format!("invalid batch JSON: {e}"));
        }
    };

    let mut errors = Vec::new();
    for metric in &metrics {
        match metric.validate() {
            Ok(()) => apply(&state, metric),
            Err(e) => errors.push(e.to_string()),
        }
    }
    state.dump_if_sync();

    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"errors": errors}))).into_response();
    }
    ok_status()
}

#[derive(Deserialize)]
pub struct MetricQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// `POST /value` — read-back of one metric as full JSON.
pub async fn read_metric(State(state): State<AppState>, body: Bytes) -> Response {
    let query: MetricQuery = match serde_json::from_slice(&body) {
        Ok(query) => query,
        Err(e) => return bad_request(format!("invalid query JSON: {e}")),
    };

    let metric = match query.kind {
        MetricKind::Gauge => state
            .store
            .get_gauge(&query.id)
            .map(|value| Metric::gauge(query.id.clone(), value)),
        MetricKind::Counter => state
            .store
            .get_counter(&query.id)
            .map(|delta| Metric::counter(query.id.clone(), delta)),
    };

    match metric {
        Some(metric) => Json(metric).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `POST /update/{kind}/{name}/{value}` — legacy text protocol write.
pub async fn update_by_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Response {
    match kind.parse::<MetricKind>() {
        Ok(MetricKind::Gauge) => match value.parse::<f64>() {
            Ok(value) => {
                apply(&state, &Metric::gauge(name, value));
                state.dump_if_sync();
                StatusCode::OK.into_response()
            }
            Err(_) => bad_request("invalid metric value".to_string()),
        },
        Ok(MetricKind::Counter) => match value.parse::<i64>() {
            Ok(delta) => {
                apply(&state, &Metric::counter(name, delta));
                state.dump_if_sync();
                StatusCode::OK.into_response()
            }
            Err(_) => bad_request("invalid metric value".to_string()),
        },
        Err(_) => bad_request("invalid metric type (expect counter|gauge)".to_string()),
    }
}

/// `GET /value/{kind}/{name}` — legacy text protocol read-back.
pub async fn value_by_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let formatted = match kind.parse::<MetricKind>() {
        Ok(MetricKind::Gauge) => state.store.get_gauge(&name).map(|v| v.to_string()),
        Ok(MetricKind::Counter) => state.store.get_counter(&name).map(|v| v.to_string()),
        Err(_) => return bad_request("invalid metric type (expect counter|gauge)".to_string()),
    };

    match formatted {
        Some(value) => (StatusCode::OK, value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /ping` — durable backend health; trivially healthy without one.
pub async fn ping(State(state): State<AppState>) -> Response {
    match &state.backend {
        Some(backend) => match backend.ping() {
            Ok(()) => ok_status(),
            Err(e) => {
                tracing::error!(error = %e, "backend ping failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        None => ok_status(),
    }
}

/// `GET /` — liveness page.
pub async fn index() -> Response {
    Html("OK").into_response()
}
