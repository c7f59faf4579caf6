mod support;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::StreamExt;
use serde_json::{json, Value};

use service::notify::mock::MemoryMailer;
use support::*;

fn visitor(name: &str, purpose: &str, resident_id: &str) -> Value {
    json!({
        "name": name, "phoneNumber": "9876543210", "purpose": purpose,
        "vehicleNumber": "ka01ab1234", "residentId": resident_id
    })
}

/// Watchman and resident "Asha" (flat 101) in society s1.
async fn gate_and_resident(t: &TestApp) -> (String, String) {
    let gate = signed_in(t, watchman_form("gate@example.com", "s1")).await;
    let asha = signed_in(t, resident_form("asha@example.com", "Asha Rao", "s1", "101")).await;
    (gate, asha)
}

#[tokio::test]
async fn watchman_logs_visitor_and_resident_approves() {
    let t = build_app();
    let (gate, asha) = gate_and_resident(&t).await;

    let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor("Ravi", "Delivery", "101"), Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["residentName"], "Asha Rao");
    assert_eq!(created["vehicleNumber"], "KA01AB1234");
    assert_eq!(created["societyId"], "s1");
    let id = created["id"].as_str().unwrap().to_string();

    let notice = t.mailer.sent().into_iter().find(|m| m.to == "asha@example.com" && m.subject.contains("Ravi"));
    assert!(notice.is_some());

    let resp = send(&t.app, get_request("/api/visitors?status=pending", Some(&asha))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let uri = format!("/api/visitors/{id}/status");
    let resp = send(&t.app, json_request("PUT", &uri, &json!({ "status": "approved" }), Some(&asha))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "approved");

    let resp = send(&t.app, json_request("PUT", &uri, &json!({ "status": "rejected" }), Some(&asha))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&t.app, get_request("/api/visitors/stats", Some(&gate))).await;
    let stats = body_json(resp).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["approved"], 1);
}

#[tokio::test]
async fn residents_cannot_log_visitors() {
    let t = build_app();
    let (_, asha) = gate_and_resident(&t).await;
    let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor("Ravi", "Delivery", "101"), Some(&asha))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_phone_is_validation_error() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let mut v = visitor("Ravi", "Delivery", "101");
    v["phoneNumber"] = json!("98-76");
    let resp = send(&t.app, json_request("POST", "/api/visitors", &v, Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_society_sees_nothing() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let other = signed_in(&t, watchman_form("other@example.com", "s2")).await;

    let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor("Ravi", "Delivery", "101"), Some(&gate))).await;
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();

    let resp = send(&t.app, get_request(&format!("/api/visitors/{id}"), Some(&other))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&t.app, get_request("/api/visitors", Some(&other))).await;
    assert_eq!(body_json(resp).await["total"], 0);
}

#[tokio::test]
async fn offline_batch_reports_each_entry() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let mut bad = visitor("Meena", "Guest", "101");
    bad["phoneNumber"] = json!("");
    let batch = json!([
        visitor("Ravi", "Delivery", "101"),
        bad,
        visitor("Kiran", "Plumber", "101"),
    ]);

    let resp = send(&t.app, json_request("POST", "/api/visitors/sync", &batch, Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcomes = body_json(resp).await;
    let outcomes = outcomes.as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0]["error"].is_null());
    assert!(outcomes[1]["error"].is_string());
    assert!(outcomes[2]["error"].is_null());
    assert_eq!(outcomes[1]["index"], 1);
}

#[tokio::test]
async fn suggestions_directory_and_export() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    for (name, purpose) in [("Ravi", "Delivery"), ("Kiran", "Delivery"), ("Meena", "Doctor")] {
        let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor(name, purpose, "101"), Some(&gate))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&t.app, get_request("/api/visitors/purposes?prefix=d", Some(&gate))).await;
    assert_eq!(body_json(resp).await, json!(["delivery", "doctor"]));

    let resp = send(&t.app, get_request("/api/residents?prefix=as", Some(&gate))).await;
    let dir = body_json(resp).await;
    assert_eq!(dir[0]["residentId"], "101");

    let resp = send(&t.app, get_request("/api/visitors/export.csv", Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
    assert!(ct.starts_with("text/csv"));
    let csv = body_text(resp).await;
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("KA01AB1234"));
}

#[tokio::test]
async fn heatmap_covers_last_seven_days() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let resp = send(&t.app, get_request("/api/visitors/heatmap?today=2026-10-17", Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let map = body_json(resp).await;
    assert_eq!(map["days"].as_array().unwrap().len(), 7);
    assert_eq!(map["days"][6], "2026-10-17");
    assert_eq!(map["counts"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn delete_visitor_data_requires_a_target() {
    let t = build_app();
    let resp = send(&t.app, json_request("POST", "/api/delete-visitor-data", &json!({}), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({ "error": "societyId or userId is required" }));

    let resp = send(&t.app, json_request("POST", "/api/delete-visitor-data", &json!({ "societyId": "  " }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_visitor_data_by_society_and_user() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    for name in ["Ravi", "Kiran"] {
        send(&t.app, json_request("POST", "/api/visitors", &visitor(name, "Delivery", "101"), Some(&gate))).await;
    }

    let resp = send(&t.app, json_request("POST", "/api/delete-visitor-data", &json!({ "userId": "not-a-uuid" }), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["deleted"], 0);

    let resp = send(&t.app, json_request("POST", "/api/delete-visitor-data", &json!({ "societyId": "s1" }), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({ "message": "Visitor data deleted successfully", "deleted": 2 })
    );

    let resp = send(&t.app, get_request("/api/visitors", Some(&gate))).await;
    assert_eq!(body_json(resp).await["total"], 0);
}

#[tokio::test]
async fn visitor_notification_endpoint() {
    let t = build_app();

    let resp = send(&t.app, json_request("POST", "/api/send-visitor-notification", &json!({ "visitor": { "name": "Ravi" } }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({ "error": "Missing visitor or residentEmail" }));

    let resp = send(&t.app, json_request("POST", "/api/send-visitor-notification", &json!({ "visitor": null, "residentEmail": "asha@example.com" }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json!({
        "visitor": { "name": "Ravi", "phoneNumber": "9876543210", "purpose": "Delivery" },
        "residentEmail": "asha@example.com"
    });
    let resp = send(&t.app, json_request("POST", "/api/send-visitor-notification", &body, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "message": "Email sent successfully" }));
    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "New Visitor Approval Request from Ravi");
    assert!(sent[0].text.contains("Vehicle Number: N/A"));
}

#[tokio::test]
async fn visitor_notification_reports_mailer_failure() {
    let t = build_app_with(MemoryMailer::failing("provider down"));
    let body = json!({ "visitor": { "name": "Ravi" }, "residentEmail": "asha@example.com" });
    let resp = send(&t.app, json_request("POST", "/api/send-visitor-notification", &body, None)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err = body_json(resp).await;
    assert_eq!(err["error"], "Failed to send email");
    assert!(err["details"].as_str().unwrap().contains("provider down"));
}

fn raw_post(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn feed_streams_only_visitors_in_scope() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let other_gate = signed_in(&t, watchman_form("gate2@example.com", "s2")).await;

    let resp = send(&t.app, get_request("/api/visitors/feed", Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));
    let mut frames = resp.into_body().into_data_stream();

    let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor("Outsider", "Delivery", "101"), Some(&other_gate))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor("Ravi", "Delivery", "101"), Some(&gate))).await;
    let created = body_json(resp).await;

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("feed frame within timeout")
        .expect("feed still open")
        .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.contains("event: created"), "{text}");
    assert!(!text.contains("Outsider"), "{text}");
    let data = text.lines().find_map(|l| l.strip_prefix("data: ")).unwrap();
    let record: Value = serde_json::from_str(data).unwrap();
    assert_eq!(record["id"], created["id"]);
    assert_eq!(record["name"], "Ravi");
    assert_eq!(record["societyId"], "s1");
}

#[tokio::test]
async fn feed_requires_a_session() {
    let t = build_app();
    let resp = send(&t.app, get_request("/api/visitors/feed", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn heatmap_rejects_out_of_range_date() {
    let t = build_app();
    let (gate, _) = gate_and_resident(&t).await;
    let resp = send(&t.app, get_request("/api/visitors/heatmap?today=-262143-01-01", Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn malformed_delete_visitor_data_body_is_json_error() {
    let t = build_app();
    let resp = send(&t.app, raw_post("/api/delete-visitor-data", "{not json")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({ "error": "Failed to delete visitor data" }));
}

#[tokio::test]
async fn malformed_notification_body_is_json_error() {
    let t = build_app();
    let resp = send(&t.app, raw_post("/api/send-visitor-notification", "{not json")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err = body_json(resp).await;
    assert_eq!(err["error"], "Failed to send email");
    assert!(err["details"].is_string());
    assert!(t.mailer.sent().is_empty());
}

#[tokio::test]
async fn bad_extractor_input_on_protected_routes_is_json_error() {
    let t = build_app();
    let (gate, asha) = gate_and_resident(&t).await;

    let resp = send(&t.app, get_request("/api/visitors/not-a-uuid", Some(&gate))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Invalid Request");

    let resp = send(&t.app, get_request("/api/visitors?status=maybe", Some(&asha))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Invalid Request");

    let mut req = raw_post("/api/visitors", "{not json");
    req.headers_mut().insert(header::AUTHORIZATION, format!("Bearer {gate}").parse().unwrap());
    let resp = send(&t.app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err = body_json(resp).await;
    assert_eq!(err["error"], "Invalid Request");
    assert!(err["details"].is_string());
}
