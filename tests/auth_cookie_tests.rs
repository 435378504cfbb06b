// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and CSRF cookie attribute tests.
//!
//! These tests verify the attributes of the cookies issued by the token and
//! logout endpoints for localhost and production-style frontends.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;

mod common;

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

fn cookie_value(cookie: &str) -> &str {
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value)
        .unwrap()
}

#[tokio::test]
async fn test_token_endpoint_sets_csrf_cookie() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let csrf_cookie = find_cookie(&set_cookies, "oomph_csrf");
    assert!(csrf_cookie.contains("Path=/"));
    assert!(csrf_cookie.contains("SameSite=Strict"));
    // Scripts must be able to read it.
    assert!(!csrf_cookie.contains("HttpOnly"));
    assert!(!csrf_cookie.contains("Secure"));

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["csrf"].as_str().unwrap(), cookie_value(&csrf_cookie));
}

#[tokio::test]
async fn test_logout_clears_session_and_rotates_csrf() {
    let (app, state) = common::create_test_app_with_frontend_url("http://localhost:5173");
    let csrf = common::csrf_token(&state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header(
                    header::COOKIE,
                    format!("oomph_session=test; oomph_csrf={}", csrf),
                )
                .header("x-csrf-token", csrf.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    let session_cookie = find_cookie(&set_cookies, "oomph_session");
    let csrf_cookie = find_cookie(&set_cookies, "oomph_csrf");

    assert!(session_cookie.contains("Path=/"));
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("SameSite=Strict"));
    assert!(session_cookie.contains("Max-Age=0"));
    assert!(!session_cookie.contains("Secure"));
    assert_eq!(cookie_value(&session_cookie), "");

    assert_ne!(cookie_value(&csrf_cookie), csrf);
}

#[tokio::test]
async fn test_logout_requires_csrf() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header(header::COOKIE, "oomph_session=test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cookies_secure_for_https_frontend() {
    let (app, state) = common::create_test_app_with_frontend_url("https://vitals.example.com");
    let csrf = common::csrf_token(&state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header(header::COOKIE, format!("oomph_csrf={}", csrf))
                .header("x-csrf-token", csrf.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies = set_cookie_headers(&response);
    assert!(find_cookie(&set_cookies, "oomph_session").contains("Secure"));
    assert!(find_cookie(&set_cookies, "oomph_csrf").contains("Secure"));
}
