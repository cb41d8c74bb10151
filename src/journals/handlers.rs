use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{debug, instrument};

use super::{
    dto::{CreateJournalRequest, JournalListResponse, MessageResponse, UpdateJournalRequest},
    repo_types::JournalEntry,
    services,
};
use crate::{auth::Principal, error::ApiError, state::AppState};

const ENTRY_NOT_FOUND: &str = "Journal entry not found";

pub fn journal_routes() -> Router<AppState> {
    Router::new()
        .route("/journals", post(create_entry))
        .route("/journals/user/:user_id", get(list_entries))
        .route(
            "/journals/:entry_id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

#[instrument(skip(state, principal, payload), fields(user_id = %principal.user_id))]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreateJournalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JournalEntry>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let fields = payload.validate()?;
    let entry = services::create_entry(&state, &principal.user_id, fields)
        .await
        .map_err(|e| ApiError::from_store(e, ENTRY_NOT_FOUND))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// The path segment is kept for client compatibility; the listing is always
/// the caller's own entries.
#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(path_user_id): Path<String>,
) -> Result<Json<JournalListResponse>, ApiError> {
    if path_user_id != principal.user_id {
        debug!(path_user_id = %path_user_id, "ignoring foreign userId in path");
    }
    let journals = services::list_entries(&state, &principal.user_id).await?;
    Ok(Json(JournalListResponse {
        message: "Journal entries fetched successfully",
        journals,
    }))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<String>,
) -> Result<Json<JournalEntry>, ApiError> {
    let entry = services::get_entry(&state, &principal.user_id, &entry_id)
        .await
        .map_err(|e| ApiError::from_store(e, ENTRY_NOT_FOUND))?;
    Ok(Json(entry))
}

#[instrument(skip(state, principal, payload), fields(user_id = %principal.user_id))]
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<String>,
    payload: Result<Json<UpdateJournalRequest>, JsonRejection>,
) -> Result<Json<JournalEntry>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;
    let changes = payload.validate()?;
    let entry = services::update_entry(&state, &principal.user_id, &entry_id, &changes)
        .await
        .map_err(|e| ApiError::from_store(e, ENTRY_NOT_FOUND))?;
    Ok(Json(entry))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    services::delete_entry(&state, &principal.user_id, &entry_id)
        .await
        .map_err(|e| ApiError::from_store(e, ENTRY_NOT_FOUND))?;
    Ok(Json(MessageResponse {
        message: "Journal entry deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Routes with a fixed principal in place of token verification.
    fn app(state: AppState, user_id: &str) -> Router {
        journal_routes()
            .layer(Extension(Principal {
                user_id: user_id.to_string(),
                email: format!("{user_id}@x.com"),
            }))
            .with_state(state)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn body() -> Value {
        json!({
            "date": "2024-01-01",
            "opponent": "Bob",
            "tournamentName": "Open",
            "location": "NY",
            "courtSurface": "Hard",
            "strengths": ["Serve"],
            "weaknesses": ["Volley"],
            "lessonsLearned": "Stay calm"
        })
    }

    #[tokio::test]
    async fn create_get_round_trip() {
        let state = AppState::fake();
        let (status, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["userId"], "u1");
        assert_eq!(created["opponent"], "Bob");
        let id = created["entryId"].as_str().unwrap();

        let (status, fetched) =
            send(app(state, "u1"), "GET", &format!("/journals/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn client_cannot_choose_owner_or_id() {
        let state = AppState::fake();
        let mut b = body();
        b["userId"] = json!("u2");
        b["entryId"] = json!("fixed");
        let (_, first) = send(app(state.clone(), "u1"), "POST", "/journals", Some(b.clone())).await;
        let (_, second) = send(app(state, "u1"), "POST", "/journals", Some(b)).await;
        assert_eq!(first["userId"], "u1");
        assert_ne!(first["entryId"], "fixed");
        assert_ne!(first["entryId"], second["entryId"]);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let state = AppState::fake();
        let (status, resp) =
            send(app(state, "u1"), "POST", "/journals", Some(json!({ "date": "2024-01-01" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["message"]
            .as_str()
            .unwrap()
            .starts_with("Missing required fields:"));
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let state = AppState::fake();
        let req = Request::builder()
            .method("POST")
            .uri("/journals")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app(state, "u1").oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_ignores_path_user() {
        let state = AppState::fake();
        send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        send(app(state.clone(), "u2"), "POST", "/journals", Some(body())).await;

        let (status, resp) = send(app(state, "u2"), "GET", "/journals/user/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["message"], "Journal entries fetched successfully");
        let journals = resp["journals"].as_array().unwrap();
        assert_eq!(journals.len(), 1);
        assert_eq!(journals[0]["userId"], "u2");
    }

    #[tokio::test]
    async fn other_users_get_404() {
        let state = AppState::fake();
        let (_, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());

        for (method, payload) in [
            ("GET", None),
            ("PUT", Some(json!({ "opponent": "Mallory" }))),
            ("DELETE", None),
        ] {
            let (status, resp) = send(app(state.clone(), "u2"), method, &uri, payload).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(resp["message"], "Journal entry not found");
        }

        let (_, still) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(still["opponent"], "Bob");
    }

    #[tokio::test]
    async fn update_changes_listed_fields_only() {
        let state = AppState::fake();
        let (_, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());

        let (status, updated) = send(
            app(state.clone(), "u1"),
            "PUT",
            &uri,
            Some(json!({ "opponent": "Alice", "result": "Win" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["opponent"], "Alice");
        assert_eq!(updated["result"], "Win");
        assert_eq!(updated["location"], "NY");
        assert_eq!(updated["entryId"], created["entryId"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (_, fetched) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn update_rejects_identity_changes() {
        let state = AppState::fake();
        let (_, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());

        for payload in [
            json!({ "userId": "u2" }),
            json!({ "entryId": "other" }),
            json!({ "favourite": true }),
            json!({}),
        ] {
            let (status, _) = send(app(state.clone(), "u1"), "PUT", &uri, Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (_, fetched) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn padded_text_round_trips_unchanged() {
        let state = AppState::fake();
        let mut b = body();
        b["opponent"] = json!(" Bob ");
        b["lessonsLearned"] = json!("  1. Stay calm\n");
        let (status, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(b)).await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());
        let (_, fetched) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(fetched["opponent"], " Bob ");
        assert_eq!(fetched["lessonsLearned"], "  1. Stay calm\n");
    }

    #[tokio::test]
    async fn null_clears_result_and_score() {
        let state = AppState::fake();
        let mut b = body();
        b["result"] = json!("Win");
        b["score"] = json!("6-4");
        let (_, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(b)).await;
        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());

        let (status, updated) = send(
            app(state.clone(), "u1"),
            "PUT",
            &uri,
            Some(json!({ "score": null, "result": null, "opponent": "Al" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["opponent"], "Al");
        assert!(updated.get("score").is_none());
        assert!(updated.get("result").is_none());

        let (_, fetched) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn unparseable_dates_are_rejected_and_listing_is_chronological() {
        let state = AppState::fake();
        let mut b = body();
        b["date"] = json!("yesterday");
        let (status, _) = send(app(state.clone(), "u1"), "POST", "/journals", Some(b)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for day in ["2024-09-01", "2024-10-01", "2023-12-31T22:00:00Z"] {
            let mut b = body();
            b["date"] = json!(day);
            let (status, _) = send(app(state.clone(), "u1"), "POST", "/journals", Some(b)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, resp) = send(app(state, "u1"), "GET", "/journals/user/u1", None).await;
        let days: Vec<_> = resp["journals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["date"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(days, vec!["2024-10-01", "2024-09-01", "2023-12-31"]);
    }

    #[tokio::test]
    async fn update_of_missing_entry_is_404() {
        let state = AppState::fake();
        let (status, _) = send(
            app(state, "u1"),
            "PUT",
            "/journals/nope",
            Some(json!({ "opponent": "Alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_twice_is_404() {
        let state = AppState::fake();
        let (_, created) = send(app(state.clone(), "u1"), "POST", "/journals", Some(body())).await;
        let uri = format!("/journals/{}", created["entryId"].as_str().unwrap());

        let (status, resp) = send(app(state.clone(), "u1"), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["message"], "Journal entry deleted successfully");

        let (status, _) = send(app(state.clone(), "u1"), "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(app(state, "u1"), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
