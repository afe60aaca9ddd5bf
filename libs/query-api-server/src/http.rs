use axum::extract::State;
use axum::response::IntoResponse;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  REST: GET /
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let records = state.reader.snapshot().await;
    axum::Json(records).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use event_api::{DollarsByZip, Record, StargazerEvent};
    use event_store::EventStore;

    async fn get_root(app: axum::Router) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn empty_store_returns_empty_array() {
        let store: EventStore<Record> = EventStore::new();
        let (status, content_type, body) = get_root(crate::router(store.reader())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn returns_records_in_arrival_order() {
        let store = EventStore::new();
        store
            .append(Record::Stargazer(StargazerEvent {
                login: "octocat".into(),
                r#type: "WatchEvent".into(),
            }))
            .await;
        store
            .append(Record::Stargazer(StargazerEvent {
                login: "hubot".into(),
                r#type: "ForkEvent".into(),
            }))
            .await;

        let (status, _, body) = get_root(crate::router(store.reader())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([
                {"LOGIN": "octocat", "TYPE": "WatchEvent"},
                {"LOGIN": "hubot", "TYPE": "ForkEvent"},
            ])
        );
    }

    #[tokio::test]
    async fn renders_dollars_by_zip_fields() {
        let store = EventStore::new();
        store
            .append(Record::DollarsByZip(DollarsByZip {
                zipcode: "10001".into(),
                total_dollars: 42.25,
            }))
            .await;

        let (_, _, body) = get_root(crate::router(store.reader())).await;
        assert_eq!(body, serde_json::json!([{"ZIPCODE": "10001", "TOTAL_DOLLARS": 42.25}]));
    }

    #[tokio::test]
    async fn later_appends_show_up_in_next_query() {
        let store = EventStore::new();
        let app = crate::router(store.reader());

        let (_, _, before) = get_root(app.clone()).await;
        store
            .append(Record::Stargazer(StargazerEvent {
                login: "octocat".into(),
                r#type: "WatchEvent".into(),
            }))
            .await;
        let (_, _, after) = get_root(app).await;

        assert_eq!(before, serde_json::json!([]));
        assert_eq!(after.as_array().map(Vec::len), Some(1));
    }
}
