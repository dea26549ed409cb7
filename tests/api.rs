use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, Error, test, web};
use serde_json::{Value, json};

use dynqr::config::Settings;
use dynqr::models::User;
use dynqr::routes::init_routes;
use dynqr::state::AppState;
use dynqr::store::MemoryStore;
use dynqr::utils::jwt::create_token;

const SECRET: &str = "test-secret";

fn settings() -> Settings {
    Settings::from_lookup(|key| match key {
        "JWT_SECRET" => Some(SECRET.to_string()),
        "PUBLIC_URL" => Some("https://qr.example.com".to_string()),
        _ => None,
    })
    .unwrap()
}

fn state() -> web::Data<AppState> {
    web::Data::new(AppState::new(Arc::new(MemoryStore::default()), settings()))
}

fn bearer(user_id: &str) -> (header::HeaderName, String) {
    let user = User {
        id: user_id.to_string(),
        email: None,
        name: None,
    };
    let token = create_token(&user, SECRET, chrono::Duration::hours(1)).unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

/// Status of a response, including rejections raised by middleware.
async fn status_of<S, R>(app: &S, req: R) -> StatusCode
where
    S: Service<R, Response = ServiceResponse, Error = Error>,
{
    match test::try_call_service(app, req).await {
        Ok(res) => res.status(),
        Err(e) => e.as_response_error().status_code(),
    }
}

#[actix_web::test]
async fn scan_redirects_then_goes_away_when_deactivated() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({ "title": "Menu", "destination_url": "https://example.com" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(res).await;
    let id = created["id"].as_str().unwrap().to_string();
    let short_code = created["short_code"].as_str().unwrap().to_string();
    assert_eq!(
        created["scan_url"],
        format!("https://qr.example.com/api/qr/{short_code}")
    );
    assert_eq!(created["foreground_color"], "#000000");

    let req = test::TestRequest::get()
        .uri(&format!("/api/qr/{short_code}"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "https://example.com"
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/qrcodes/{id}"))
        .insert_header(bearer("alice"))
        .set_json(json!({ "is_active": false }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["scan_count"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/qr/{short_code}"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::GONE);

    let req = test::TestRequest::get()
        .uri(&format!("/api/qrcodes/{id}"))
        .insert_header(bearer("alice"))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["scan_count"], 1);
}

#[actix_web::test]
async fn unknown_short_code_is_not_found() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::get().uri("/api/qr/ZZZZZZZZZ").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "QR code not found");
}

#[actix_web::test]
async fn owner_routes_need_a_valid_token() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let missing = test::TestRequest::get().uri("/api/qrcodes");
    assert_eq!(status_of(&app, missing.to_request()).await, StatusCode::UNAUTHORIZED);

    let forged = test::TestRequest::get()
        .uri("/api/qrcodes")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"));
    assert_eq!(status_of(&app, forged.to_request()).await, StatusCode::UNAUTHORIZED);

    let health = test::TestRequest::get().uri("/api/health/check");
    assert_eq!(status_of(&app, health.to_request()).await, StatusCode::OK);
}

#[actix_web::test]
async fn invalid_requests_are_rejected_with_details() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({
            "title": "Menu",
            "destination_url": "https://example.com",
            "foreground_color": "black",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert!(body["details"]["foreground_color"].is_array());

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({
            "title": "Menu",
            "destination_url": "https://example.com",
            "group_id": "nosuchgrp",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn codes_are_private_to_their_owner() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({ "title": "Menu", "destination_url": "https://example.com" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/qrcodes/{id}"))
        .insert_header(bearer("bob"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/qrcodes/{id}"))
        .insert_header(bearer("bob"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/qrcodes")
        .insert_header(bearer("bob"))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn deleting_a_group_keeps_its_codes() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/groups")
        .insert_header(bearer("alice"))
        .set_json(json!({ "name": "Campaign", "base_url": "https://ex.com" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let group: Value = test::read_body_json(res).await;
    let group_id = group["id"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for path in ["a", "b"] {
        let req = test::TestRequest::post()
            .uri("/api/qrcodes")
            .insert_header(bearer("alice"))
            .set_json(json!({
                "title": format!("Variant {path}"),
                "destination_url": format!("https://ex.com/{path}"),
                "group_id": group_id,
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["group_id"], group_id.as_str());
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/groups/{group_id}/qrcodes"))
        .insert_header(bearer("alice"))
        .to_request();
    let members: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(members.as_array().unwrap().len(), 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/groups/{group_id}"))
        .insert_header(bearer("alice"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::NO_CONTENT);

    for id in ids {
        let req = test::TestRequest::get()
            .uri(&format!("/api/qrcodes/{id}"))
            .insert_header(bearer("alice"))
            .to_request();
        let code: Value = test::call_and_read_body_json(&app, req).await;
        assert!(code["group_id"].is_null());
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/groups/{group_id}"))
        .insert_header(bearer("alice"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn images_encode_the_scan_url() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({
            "title": "Menu",
            "destination_url": "https://example.com",
            "foreground_color": "#112233",
            "size": 300,
        }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/qrcodes/{id}/image"))
        .insert_header(bearer("alice"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/svg+xml");
    let svg = test::read_body(res).await;
    assert!(String::from_utf8_lossy(&svg).contains("#112233"));

    let req = test::TestRequest::get()
        .uri(&format!("/api/qrcodes/{id}/image?format=png"))
        .insert_header(bearer("alice"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");

    let req = test::TestRequest::post()
        .uri("/api/static-qr")
        .insert_header(bearer("alice"))
        .set_json(json!({ "url": "https://example.com/flyer", "format": "png" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let png = test::read_body(res).await;
    assert_eq!(&png[..4], b"\x89PNG");
}

#[actix_web::test]
async fn stats_summarize_owned_codes() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let mut short_codes = Vec::new();
    for title in ["One", "Two"] {
        let req = test::TestRequest::post()
            .uri("/api/qrcodes")
            .insert_header(bearer("alice"))
            .set_json(json!({ "title": title, "destination_url": "https://example.com" }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        short_codes.push(created["short_code"].as_str().unwrap().to_string());
    }
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/qr/{}", short_codes[0]))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header(bearer("alice"))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["total_codes"], 2);
    assert_eq!(summary["active_codes"], 2);
    assert_eq!(summary["total_scans"], 3);
    assert_eq!(summary["average_scans"], 2);
}

#[actix_web::test]
async fn owner_scoped_scan_url_only_resolves_for_its_owner() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .set_json(json!({ "title": "Menu", "destination_url": "https://example.com" }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let short_code = created["short_code"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/qr/alice/{short_code}"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(header::LOCATION).unwrap(), "https://example.com");

    let req = test::TestRequest::get()
        .uri(&format!("/api/qr/bob/{short_code}"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn listing_pages_with_limit_and_after() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    for i in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/qrcodes")
            .insert_header(bearer("alice"))
            .set_json(json!({ "title": format!("Code {i}"), "destination_url": "https://example.com" }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/qrcodes")
        .insert_header(bearer("alice"))
        .to_request();
    let full: Value = test::call_and_read_body_json(&app, req).await;
    let expected: Vec<String> = full
        .as_array()
        .unwrap()
        .iter()
        .map(|code| code["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(expected.len(), 5);

    let mut seen = Vec::new();
    let mut uri = "/api/qrcodes?limit=2".to_string();
    loop {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer("alice"))
            .to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<String> = page
            .as_array()
            .unwrap()
            .iter()
            .map(|code| code["id"].as_str().unwrap().to_string())
            .collect();
        assert!(ids.len() <= 2);
        let Some(last) = ids.last() else {
            break;
        };
        uri = format!("/api/qrcodes?limit=2&after={last}");
        seen.extend(ids);
    }
    assert_eq!(seen, expected);

    let req = test::TestRequest::get()
        .uri("/api/qrcodes?limit=0")
        .insert_header(bearer("alice"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/qrcodes?after=missing")
        .insert_header(bearer("alice"));
    assert_eq!(status_of(&app, req.to_request()).await, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn group_members_describe_their_variation() {
    let app = test::init_service(App::new().app_data(state()).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/groups")
        .insert_header(bearer("alice"))
        .set_json(json!({ "name": "Campaign", "base_url": "https://ex.com" }))
        .to_request();
    let group: Value = test::call_and_read_body_json(&app, req).await;
    let group_id = group["id"].as_str().unwrap();

    for url in ["https://ex.com/spring", "https://ex.com?utm=flyer", "https://other.org"] {
        let req = test::TestRequest::post()
            .uri("/api/qrcodes")
            .insert_header(bearer("alice"))
            .set_json(json!({ "title": "Variant", "destination_url": url, "group_id": group_id }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/groups/{group_id}/qrcodes"))
        .insert_header(bearer("alice"))
        .to_request();
    let members: Value = test::call_and_read_body_json(&app, req).await;
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 3);

    let info_for = |url: &str| {
        members
            .iter()
            .find(|member| member["destination_url"] == url)
            .map(|member| member["url_info"].clone())
            .unwrap()
    };
    assert_eq!(info_for("https://ex.com/spring"), json!({ "type": "path", "variation": "/spring" }));
    assert_eq!(
        info_for("https://ex.com?utm=flyer"),
        json!({ "type": "params", "path": "/", "params": "utm=flyer" })
    );
    assert_eq!(info_for("https://other.org")["type"], "different");
    assert!(members[0]["scan_url"].is_string());
}
