//! Test helpers module
//!
//! Builds an in-memory application and drives it through the router without
//! opening a socket.

#![allow(dead_code)]

pub mod database_helper;

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use fixed_asset::config::Settings;
use fixed_asset::{create_router, AppState};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Settings tuned for fast tests: cheap bcrypt, no rate limit
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    settings.auth.bcrypt_cost = 4;
    settings.rate_limit.enabled = false;
    settings.features.insurance = true;
    settings.features.trading = true;
    settings
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

/// A registered user and the token to act as them
pub struct Actor {
    pub token: String,
    pub user_id: i64,
    pub patient_id: Option<i64>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let state = AppState::in_memory(settings);
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.request_from(None, method, uri, token, body).await
    }

    /// Same as `request`, as if the connection came from `peer`
    pub async fn request_from(
        &self,
        peer: Option<SocketAddr>,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let mut request = builder.body(body).unwrap();
        if let Some(peer) = peer {
            request.extensions_mut().insert(ConnectInfo(peer));
        }
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn register(&self, email: &str, role: &str) -> Actor {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "name": email.split('@').next().unwrap_or("user"),
                    "role": role,
                    "wallet_address": null
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        Actor {
            token: body["token"].as_str().unwrap().to_string(),
            user_id: body["user"]["id"].as_i64().unwrap(),
            patient_id: body["patient_id"].as_i64(),
        }
    }

    pub async fn patient(&self, email: &str) -> Actor {
        self.register(email, "PATIENT").await
    }

    pub async fn bank(&self, email: &str) -> Actor {
        self.register(email, "BANK").await
    }

    /// Hospital user already assigned as staff of a fresh hospital
    pub async fn hospital_staff(&self, email: &str, bank: &Actor) -> (Actor, i64) {
        let actor = self.register(email, "HOSPITAL").await;
        let (status, hospital) = self
            .post(
                "/api/hospitals",
                Some(&bank.token),
                json!({
                    "name": "St. Mary",
                    "registration_number": format!("HSP-{}", actor.user_id),
                    "address": null,
                    "phone": null,
                    "email": null
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create hospital failed: {hospital}");
        let hospital_id = hospital["id"].as_i64().unwrap();

        let (status, body) = self
            .post(
                &format!("/api/hospitals/{}/staff", hospital_id),
                Some(&bank.token),
                json!({ "user_id": actor.user_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add staff failed: {body}");
        (actor, hospital_id)
    }

    /// Deposit, verify and mint an asset for the patient; returns the asset token id
    pub async fn minted_asset(&self, patient: &Actor, bank: &Actor, tokens: &str) -> i64 {
        let pid = patient.patient_id.expect("actor is not a patient");
        let (status, deposit) = self
            .post(
                &format!("/api/patients/{}/deposits", pid),
                Some(&patient.token),
                json!({
                    "patient_id": pid,
                    "asset_type": "gold",
                    "quantity": "1",
                    "unit": "oz",
                    "estimated_value": "1000"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "deposit failed: {deposit}");

        let (status, verification) = self
            .post(
                &format!("/api/bank/deposits/{}/verify", deposit["id"]),
                Some(&bank.token),
                json!({ "verified_value": "1000", "tokens_to_mint": tokens }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verify failed: {verification}");

        let (status, token) = self
            .post(
                &format!("/api/bank/minting-requests/{}/approve", verification["id"]),
                Some(&bank.token),
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "mint failed: {token}");
        token["id"].as_i64().expect("minted token id")
    }
}

/// Decimal fields are serialized as strings
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}
