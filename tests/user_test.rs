#[macro_use]
mod common;

use actix_web::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use timeclock::model::role::Role;

#[actix_web::test]
async fn profile_and_own_record() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, mario) = common::sign_up(&app, "mario").await;
    let (luigi_id, _) = common::sign_up(&app, "luigi").await;

    let (status, body) = common::get(&app, "/api/users/profile", Some(&mario)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], mario_id);
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = common::get(&app, &format!("/api/users/{mario_id}"), Some(&mario)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::get(&app, &format!("/api/users/{luigi_id}"), Some(&mario)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::get(&app, "/api/users", Some(&mario)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn managers_read_but_do_not_edit_others() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, _) = common::sign_up(&app, "mario").await;
    let (_, boss) = common::sign_up(&app, "boss").await;
    common::promote(&state, "boss", Role::Manager).await;

    let (status, body) = common::get(&app, &format!("/api/users/{mario_id}"), Some(&boss)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "mario");

    let (status, _) = common::put(
        &app,
        &format!("/api/users/{mario_id}"),
        Some(&boss),
        json!({ "first_name": "Luigi" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::get(&app, "/api/users/999", Some(&boss)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn self_update_cannot_touch_role() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, mario) = common::sign_up(&app, "mario").await;

    let (status, body) = common::put(
        &app,
        &format!("/api/users/{mario_id}"),
        Some(&mario),
        json!({ "first_name": "Super", "role": "admin", "is_active": false, "password": "newpw" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "Super");
    assert_eq!(body["user"]["role"], "employee");
    assert_eq!(body["user"]["is_active"], true);

    common::login(&app, "mario", "newpw").await;
}

#[actix_web::test]
async fn admin_changes_role_and_email_rules_hold() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, mario) = common::sign_up(&app, "mario").await;
    let (luigi_id, _) = common::sign_up(&app, "luigi").await;
    let (_, boss) = common::sign_up(&app, "boss").await;
    common::promote(&state, "boss", Role::Admin).await;

    let (status, body) = common::put(
        &app,
        &format!("/api/users/{mario_id}"),
        Some(&boss),
        json!({ "role": "manager" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "manager");

    // the stored role applies to the token issued before the change
    let (status, _) = common::get(&app, &format!("/api/users/{luigi_id}"), Some(&mario)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::put(
        &app,
        &format!("/api/users/{mario_id}"),
        Some(&boss),
        json!({ "role": "overlord" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = common::put(
        &app,
        &format!("/api/users/{mario_id}"),
        Some(&boss),
        json!({ "email": "luigi@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already in use");

    let (status, body) = common::get(&app, "/api/users", Some(&boss)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().map(Vec::len), Some(3));
}

#[actix_web::test]
async fn admin_deletes_others_but_not_self() {
    let state = common::state().await;
    let app = init_app!(state);
    let (mario_id, mario) = common::sign_up(&app, "mario").await;
    let (boss_id, boss) = common::sign_up(&app, "boss").await;
    common::promote(&state, "boss", Role::Admin).await;

    common::post(&app, "/api/attendance/punch-in", Some(&mario), json!({})).await;

    let (status, _) = common::delete(&app, &format!("/api/users/{boss_id}"), Some(&mario)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::delete(&app, &format!("/api/users/{boss_id}"), Some(&boss)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You cannot delete your own account");

    let (status, _) = common::delete(&app, &format!("/api/users/{mario_id}"), Some(&boss)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::delete(&app, &format!("/api/users/{mario_id}"), Some(&boss)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // deleted account's token is dead and the username is free again
    let (status, _) = common::get(&app, "/api/users/profile", Some(&mario)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::register(&app, "mario", "pw123").await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = common::get(&app, "/api/attendance/all", Some(&boss)).await;
    assert_eq!(body["attendances"], json!([]));
}
