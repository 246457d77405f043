//! End-to-end API tests over the in-memory backend

mod helpers;

use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use helpers::*;
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn test_banner_and_health() {
    let app = TestApp::new();

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "fixed-asset");

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["backend"], "memory");
    assert_eq!(body["chain"]["backend"], "simulated");
}

#[tokio::test]
async fn test_register_login_and_logout() {
    let app = TestApp::new();
    let patient = app.patient("amina@example.com").await;
    assert!(patient.patient_id.is_some());

    let (status, body) = app
        .post("/api/auth/register", None, json!({
            "email": "AMINA@example.com",
            "password": TEST_PASSWORD,
            "name": "Amina",
            "role": "PATIENT"
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
    assert!(body["timestamp"].is_i64());

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "amina@example.com", "password": "wrong-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication error: Invalid email or password");

    let (status, login) = app
        .post("/api/auth/login", None, json!({ "email": "amina@example.com", "password": TEST_PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["message"], "Login successful");
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "PATIENT");
    assert_eq!(me["patient_id"].as_i64(), patient.patient_id);
    assert!(me["user"].get("password_hash").is_none());

    let (_, valid) = app.get("/api/auth/validate", Some(&token)).await;
    assert_eq!(valid["valid"], true);

    let (status, body) = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions_revoked"], 2);

    let (_, valid) = app.get("/api/auth/validate", Some(&token)).await;
    assert_eq!(valid["valid"], false);
    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/patients/1/tokens/balance", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_deposit_verification_and_minting() {
    let app = TestApp::new();
    let patient = app.patient("kofi@example.com").await;
    let bank = app.bank("teller@bank.example").await;
    let pid = patient.patient_id.unwrap();

    let (status, body) = app
        .post(&format!("/api/patients/{pid}/deposits"), Some(&patient.token), json!({
            "patient_id": pid + 1,
            "asset_type": "GOLD",
            "quantity": "2",
            "estimated_value": "1000"
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid input: Patient ID in path and request body do not match");

    let (status, deposit) = app
        .post(&format!("/api/patients/{pid}/deposits"), Some(&patient.token), json!({
            "patient_id": pid,
            "asset_type": "gold",
            "quantity": "2",
            "unit": "oz",
            "estimated_value": "1000",
            "description": "  two   bars "
        }))
        .await;
    assert_eq!(status, StatusCode::OK, "{deposit}");
    assert_eq!(deposit["status"], "PENDING");
    let deposit_id = deposit["id"].as_i64().unwrap();

    let (status, _) = app
        .post(&format!("/api/bank/deposits/{deposit_id}/verify"), Some(&patient.token), json!({
            "verified_value": "900",
            "tokens_to_mint": "20"
        }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, verification) = app
        .post(&format!("/api/bank/deposits/{deposit_id}/verify"), Some(&bank.token), json!({
            "verified_value": "900",
            "tokens_to_mint": "20",
            "verification_notes": "assayed"
        }))
        .await;
    assert_eq!(status, StatusCode::OK, "{verification}");
    let verification_id = verification["id"].as_i64().unwrap();

    let (_, requests) = app.get("/api/bank/minting-requests?status=pending", Some(&bank.token)).await;
    assert_eq!(requests.as_array().unwrap().len(), 1);

    let (status, token) = app
        .post(&format!("/api/bank/minting-requests/{verification_id}/approve"), Some(&bank.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{token}");
    assert_eq!(decimal(&token["token_amount"]), Decimal::from(20));
    assert_eq!(token["status"], "ACTIVE");

    let (status, _) = app
        .post(&format!("/api/bank/minting-requests/{verification_id}/approve"), Some(&bank.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, deposit) = app
        .get(&format!("/api/patients/{pid}/deposits/{deposit_id}"), Some(&patient.token))
        .await;
    assert_eq!(deposit["status"], "MINTED");
    assert_eq!(deposit["asset_description"], "two bars");

    let (_, balance) = app.get(&format!("/api/patients/{pid}/tokens/balance"), Some(&patient.token)).await;
    assert_eq!(decimal(&balance["asset_token_balance"]), Decimal::from(20));

    let (_, total) = app
        .get(&format!("/api/patients/{pid}/tokens/total-minted/at"), Some(&patient.token))
        .await;
    assert_eq!(decimal(&total["total_minted"]), Decimal::from(20));

    let (_, minted) = app.get(&format!("/api/patients/{pid}/deposits/status/minted"), Some(&patient.token)).await;
    assert_eq!(minted.as_array().unwrap().len(), 1);

    let (status, _) = app.get(&format!("/api/patients/{pid}/deposits/status/lost"), Some(&patient.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, ledger) = app.get("/api/bank/ledger", Some(&bank.token)).await;
    assert_eq!(ledger.as_array().unwrap().len(), 1);

    let (_, stats) = app.get("/api/bank/dashboard", Some(&bank.token)).await;
    assert_eq!(decimal(&stats["tokens_issued"]), Decimal::from(20));
    assert_eq!(stats["active_mint_requests"], 0);
}

#[tokio::test]
async fn test_patient_isolation() {
    let app = TestApp::new();
    let alice = app.patient("alice@example.com").await;
    let bob = app.patient("bob@example.com").await;
    let alice_id = alice.patient_id.unwrap();
    let bob_id = bob.patient_id.unwrap();

    let (status, body) = app.get(&format!("/api/patients/{bob_id}"), Some(&alice.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PERMISSION_DENIED");

    let (status, deposit) = app
        .post(&format!("/api/patients/{bob_id}/deposits"), Some(&bob.token), json!({
            "asset_type": "CASH",
            "quantity": "1",
            "estimated_value": "50"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let deposit_id = deposit["id"].as_i64().unwrap();

    // Bob's deposit looked up under Alice's path is missing, not forbidden
    let (status, _) = app
        .get(&format!("/api/patients/{alice_id}/deposits/{deposit_id}"), Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/patients", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&format!("/api/patients/{alice_id}/tokens/asset/update"), Some(&alice.token), json!({ "amount": "10" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_transfer_between_patients() {
    let app = TestApp::new();
    let bank = app.bank("ops@bank.example").await;
    let alice = app.patient("alice@example.com").await;
    let bob = app.patient("bob@example.com").await;
    let alice_id = alice.patient_id.unwrap();
    let bob_id = bob.patient_id.unwrap();

    let (status, balance) = app
        .post(&format!("/api/patients/{alice_id}/tokens/asset/update"), Some(&bank.token), json!({ "amount": "30" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&balance["asset_token_balance"]), Decimal::from(30));

    // Only the owner may move tokens out
    let (status, _) = app
        .post(&format!("/api/patients/{alice_id}/tokens/transfer"), Some(&bank.token), json!({
            "to_patient_id": bob_id,
            "amount": "5"
        }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/api/patients/{alice_id}/tokens/transfer"), Some(&alice.token), json!({
            "to_patient_id": bob_id,
            "amount": "45"
        }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INSUFFICIENT_BALANCE");

    let (status, body) = app
        .post(&format!("/api/patients/{alice_id}/tokens/transfer"), Some(&alice.token), json!({
            "to_patient_id": bob_id,
            "amount": "12.5"
        }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["sender"]["amount"]), Decimal::new(-125, 1));
    assert_eq!(decimal(&body["receiver"]["amount"]), Decimal::new(125, 1));

    let (_, balance) = app.get(&format!("/api/patients/{bob_id}/tokens/balance"), Some(&bob.token)).await;
    assert_eq!(decimal(&balance["asset_token_balance"]), Decimal::new(125, 1));

    let (_, history) = app.get(&format!("/api/patients/{alice_id}/tokens/transactions/at"), Some(&alice.token)).await;
    let types: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["transaction_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["TRANSFER", "MINT"]);
}

#[tokio::test]
async fn test_benefit_redemption_lifecycle() {
    let app = TestApp::new();
    let bank = app.bank("ops@bank.example").await;
    let patient = app.patient("lena@example.com").await;
    let (staff, _hospital_id) = app.hospital_staff("desk@hospital.example", &bank).await;
    let pid = patient.patient_id.unwrap();

    let (status, outcome) = app
        .post(&format!("/api/patients/{pid}/benefits/redeem"), Some(&patient.token), json!({
            "patient_id": pid,
            "service_type": "CHECKUP"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "REJECTED");
    assert_eq!(outcome["message"], "Insufficient health tokens. Available: 0 HT, Required: 10 HT");
    assert!(outcome["redemption_id"].is_null());

    app.post(&format!("/api/patients/{pid}/tokens/health/update"), Some(&bank.token), json!({ "amount": "60" }))
        .await;

    let (_, eligible) = app
        .get(&format!("/api/patients/{pid}/benefits/eligible-services"), Some(&patient.token))
        .await;
    assert_eq!(eligible.as_array().unwrap().len(), 5);

    let (status, outcome) = app
        .post(&format!("/api/patients/{pid}/benefits/redeem"), Some(&patient.token), json!({
            "service_type": "checkup"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "PENDING");
    let redemption_id = outcome["redemption_id"].as_str().unwrap().to_string();
    assert!(redemption_id.starts_with("RED-"));

    let base = format!("/api/patients/{pid}/benefits/redemption/{redemption_id}");

    let (status, _) = app.post(&format!("{base}/approve"), Some(&bank.token), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&format!("{base}/complete"), Some(&staff.token), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, approved) = app.post(&format!("{base}/approve"), Some(&staff.token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{approved}");
    assert_eq!(approved["status"], "APPROVED");

    let (_, balance) = app.get(&format!("/api/patients/{pid}/tokens/balance"), Some(&patient.token)).await;
    assert_eq!(decimal(&balance["health_token_balance"]), Decimal::from(50));

    let (status, completed) = app.post(&format!("{base}/complete"), Some(&staff.token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{completed}");
    assert_eq!(completed["status"], "COMPLETED");
    assert!(completed["transaction_hash"].as_str().unwrap().starts_with("0x"));

    let (_, total) = app
        .get(&format!("/api/patients/{pid}/benefits/total-redeemed"), Some(&patient.token))
        .await;
    assert_eq!(decimal(&total["total_redeemed"]), Decimal::from(10));

    let (_, summary) = app.get(&format!("/api/patients/{pid}/dashboard/summary"), Some(&patient.token)).await;
    assert_eq!(summary["completed_redemptions"], 1);
}

#[tokio::test]
async fn test_hospital_scope() {
    let app = TestApp::new();
    let bank = app.bank("ops@bank.example").await;
    let (staff, hospital_id) = app.hospital_staff("desk@hospital.example", &bank).await;
    let (other, other_id) = app.hospital_staff("desk@other.example", &bank).await;

    let (status, me) = app.get("/api/hospitals/me", Some(&staff.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"].as_i64(), Some(hospital_id));

    let (status, _) = app.get(&format!("/api/hospitals/{other_id}/dashboard"), Some(&staff.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = app.get(&format!("/api/hospitals/{other_id}/dashboard"), Some(&other.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["pending_approvals"], 0);

    let patient = app.patient("trader@example.com").await;
    let asset_id = app.minted_asset(&patient, &bank, "10").await;

    let (status, body) = app
        .post(&format!("/api/hospitals/{hospital_id}/trades"), Some(&staff.token), json!({
            "asset_id": asset_id,
            "quantity": "79228162514264337593543950335",
            "price_per_unit": "2"
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, trade) = app
        .post(&format!("/api/hospitals/{hospital_id}/trades"), Some(&staff.token), json!({
            "asset_id": asset_id,
            "quantity": "4",
            "price_per_unit": "2.5"
        }))
        .await;
    assert_eq!(status, StatusCode::OK, "{trade}");
    assert_eq!(decimal(&trade["total_value"]), Decimal::from(10));
    let trade_id = trade["id"].as_i64().unwrap();

    let (status, _) = app
        .put(&format!("/api/hospitals/{hospital_id}/trades/{trade_id}/status"), Some(&staff.token), json!({
            "status": "DISTRIBUTED"
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, trade) = app
        .put(&format!("/api/hospitals/{hospital_id}/trades/{trade_id}/status"), Some(&staff.token), json!({
            "status": "COMPLETED"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trade["status"], "COMPLETED");

    let (_, stats) = app.get(&format!("/api/hospitals/{hospital_id}/dashboard"), Some(&staff.token)).await;
    assert_eq!(decimal(&stats["total_trade_value"]), Decimal::from(10));
}

#[tokio::test]
async fn test_delete_patient_refuses_traded_assets() {
    let app = TestApp::new();
    let bank = app.bank("ops@bank.example").await;
    let (staff, hospital_id) = app.hospital_staff("desk@hospital.example", &bank).await;
    let traded = app.patient("traded@example.com").await;
    let idle = app.patient("idle@example.com").await;
    let traded_pid = traded.patient_id.unwrap();
    let idle_pid = idle.patient_id.unwrap();

    let asset_id = app.minted_asset(&traded, &bank, "10").await;
    app.minted_asset(&idle, &bank, "10").await;
    let (status, _) = app
        .post(&format!("/api/hospitals/{hospital_id}/trades"), Some(&staff.token), json!({
            "asset_id": asset_id,
            "quantity": "1",
            "price_per_unit": "50"
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/patients/{idle_pid}"), Some(&idle.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/patients/{traded_pid}"), Some(&bank.token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
    let (status, _) = app.get(&format!("/api/patients/{traded_pid}"), Some(&bank.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/patients/{idle_pid}"), Some(&bank.token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/patients/{idle_pid}"), Some(&bank.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/patients/{idle_pid}"), Some(&bank.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_rejects_bursts() {
    let mut settings = test_settings();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 2;
    let app = TestApp::with_settings(settings);

    assert_eq!(app.get("/", None).await.0, StatusCode::OK);
    assert_eq!(app.get("/", None).await.0, StatusCode::OK);
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_rotating_bearer_tokens_share_the_peer_bucket() {
    let mut settings = test_settings();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 2;
    let app = TestApp::with_settings(settings);
    let attacker: SocketAddr = "198.51.100.9:50000".parse().unwrap();
    let neighbour: SocketAddr = "198.51.100.10:50000".parse().unwrap();

    let mut statuses = Vec::new();
    for i in 0..20 {
        let token = format!("junk-{i}");
        let (status, _) = app
            .request_from(
                Some(attacker),
                Method::POST,
                "/api/auth/login",
                Some(&token),
                Some(json!({ "email": "victim@example.com", "password": "guess" })),
            )
            .await;
        statuses.push(status);
    }
    let limited = statuses.iter().filter(|s| **s == StatusCode::TOO_MANY_REQUESTS).count();
    assert_eq!(limited, 18);
    assert_eq!(app.state.rate_limiter.as_ref().unwrap().tracked_clients(), 1);

    // Another address still has its own quota
    let (status, _) = app.request_from(Some(neighbour), Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_signed_tokens_are_limited_per_user() {
    let app = TestApp::new();
    let patient = app.patient("quota@example.com").await;

    let mut settings = test_settings();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 1;
    let limited = TestApp::with_settings(settings);
    let peer: SocketAddr = "198.51.100.20:50000".parse().unwrap();

    // Token from another instance with the same secret: valid signature, same subject
    assert_eq!(
        limited.request_from(Some(peer), Method::GET, "/", Some(&patient.token), None).await.0,
        StatusCode::OK
    );
    assert_eq!(
        limited.request_from(None, Method::GET, "/", Some(&patient.token), None).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(limited.request_from(Some(peer), Method::GET, "/", None, None).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_uses_error_format() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/auth/login", None, json!({ "email": "x@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");
}
