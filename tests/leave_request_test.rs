#[macro_use]
mod common;

use actix_web::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use timeclock::model::role::Role;

fn holiday() -> Value {
    json!({
        "start_date": "2026-08-10",
        "end_date": "2026-08-14",
        "leave_type": "holiday",
        "reason": "Summer"
    })
}

#[actix_web::test]
async fn create_and_list_own_requests() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, token) = common::sign_up(&app, "mario").await;

    let (status, body) = common::post(&app, "/api/leave-requests", Some(&token), holiday()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["leave_request"]["status"], "pending");
    assert_eq!(body["leave_request"]["user_id"], mario_id);
    assert!(body["leave_request"]["approver_id"].is_null());

    let (status, body) = common::get(&app, "/api/leave-requests/my-requests", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_requests"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn invalid_requests_are_rejected() {
    let state = common::state().await;
    let app = init_app!(state);
    let (_, token) = common::sign_up(&app, "mario").await;

    let mut bad_type = holiday();
    bad_type["leave_type"] = json!("vacation");
    let (status, body) = common::post(&app, "/api/leave-requests", Some(&token), bad_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid leave type. Allowed: holiday, permission, sick_leave"
    );

    let mut backwards = holiday();
    backwards["start_date"] = json!("2026-08-20");
    let (status, body) = common::post(&app, "/api/leave-requests", Some(&token), backwards).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "start_date cannot be after end_date");

    let (status, _) = common::post(
        &app,
        "/api/leave-requests",
        Some(&token),
        json!({ "leave_type": "holiday" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn decisions_happen_once_and_only_by_managers() {
    let state = common::state().await;
    let app = init_app!(state);
    let (_, mario) = common::sign_up(&app, "mario").await;
    let (boss_id, boss) = common::sign_up(&app, "boss").await;
    common::promote(&state, "boss", Role::Manager).await;

    let (_, body) = common::post(&app, "/api/leave-requests", Some(&mario), holiday()).await;
    let id = body["leave_request"]["id"].as_i64().unwrap();

    let (status, _) = common::get(&app, "/api/leave-requests/pending", Some(&mario)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::get(&app, "/api/leave-requests/pending", Some(&boss)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_requests"][0]["id"], id);

    let (status, _) = common::post(
        &app,
        &format!("/api/leave-requests/{id}/approve"),
        Some(&mario),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::post(
        &app,
        &format!("/api/leave-requests/{id}/approve"),
        Some(&boss),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_request"]["status"], "approved");
    assert_eq!(body["leave_request"]["approver_id"], boss_id);
    assert!(body["leave_request"]["approved_at"].is_string());

    let (status, _) = common::post(
        &app,
        &format!("/api/leave-requests/{id}/reject"),
        Some(&boss),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = common::get(&app, "/api/leave-requests/pending", Some(&boss)).await;
    assert_eq!(body["leave_requests"], json!([]));

    let (status, body) = common::get(
        &app,
        "/api/leave-requests/all?status=approved",
        Some(&boss),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_requests"].as_array().map(Vec::len), Some(1));

    let (status, _) = common::get(&app, "/api/leave-requests/all?status=maybe", Some(&boss)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn only_owner_edits_pending_requests() {
    let state = common::state().await;
    let app = init_app!(state);
    let (_, mario) = common::sign_up(&app, "mario").await;
    let (_, luigi) = common::sign_up(&app, "luigi").await;
    let (_, boss) = common::sign_up(&app, "boss").await;
    common::promote(&state, "boss", Role::Admin).await;

    let (_, body) = common::post(&app, "/api/leave-requests", Some(&mario), holiday()).await;
    let id = body["leave_request"]["id"].as_i64().unwrap();
    let uri = format!("/api/leave-requests/{id}");

    let (status, _) = common::put(&app, &uri, Some(&luigi), json!({ "reason": "mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::put(
        &app,
        &uri,
        Some(&mario),
        json!({ "end_date": "2026-08-12", "leave_type": "permission" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_request"]["end_date"], "2026-08-12");
    assert_eq!(body["leave_request"]["leave_type"], "permission");
    assert_eq!(body["leave_request"]["reason"], "Summer");

    let (status, _) = common::put(&app, &uri, Some(&mario), json!({ "end_date": "2026-08-01" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::post(&app, &format!("{uri}/reject"), Some(&boss), json!({})).await;

    let (status, body) = common::put(&app, &uri, Some(&mario), json!({ "reason": "again" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot edit a request that was already processed");

    let (status, _) = common::put(&app, "/api/leave-requests/999", Some(&mario), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn explicit_null_clears_optional_fields() {
    let state = common::state().await;
    let app = init_app!(state);
    let (_, mario) = common::sign_up(&app, "mario").await;

    let mut leave = holiday();
    leave["attachment_path"] = json!("a.pdf");
    let (_, body) = common::post(&app, "/api/leave-requests", Some(&mario), leave).await;
    let uri = format!("/api/leave-requests/{}", body["leave_request"]["id"]);

    // omitted fields stay as they are
    let (status, body) = common::put(&app, &uri, Some(&mario), json!({ "leave_type": "permission" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave_request"]["reason"], "Summer");
    assert_eq!(body["leave_request"]["attachment_path"], "a.pdf");

    let (status, body) = common::put(
        &app,
        &uri,
        Some(&mario),
        json!({ "reason": null, "attachment_path": null }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["leave_request"]["reason"].is_null());
    assert!(body["leave_request"]["attachment_path"].is_null());
    assert_eq!(body["leave_request"]["leave_type"], "permission");

    let (_, body) = common::put(&app, &uri, Some(&mario), json!({ "reason": "Back again" })).await;
    assert_eq!(body["leave_request"]["reason"], "Back again");
    assert!(body["leave_request"]["attachment_path"].is_null());
}
