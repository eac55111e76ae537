use std::sync::Arc;

use chrono::NaiveTime;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::models::DayOfWeek;
use booking_cell::services::conflict::ConflictService;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseRows, TestConfig};

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

async fn conflict_service_with_slots(
    mock_server: &MockServer,
    professional_id: Uuid,
    rows: serde_json::Value,
) -> ConflictService {
    Mock::given(method("GET"))
        .and(path("/rest/v1/slots"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("day_of_week", "eq.MONDAY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;

    let config = TestConfig::with_url(&mock_server.uri());
    ConflictService::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn detects_overlap_with_existing_slot() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    let rows = json!([MockSupabaseRows::slot_row(
        Uuid::new_v4(),
        professional_id,
        "MONDAY",
        "09:00:00",
        "09:30:00",
        false,
    )]);
    let service = conflict_service_with_slots(&mock_server, professional_id, rows).await;

    let conflict = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(9, 0), time(9, 30), "token")
        .await
        .unwrap();

    assert!(conflict);
}

#[tokio::test]
async fn touching_endpoints_count_as_conflict() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    let rows = json!([MockSupabaseRows::slot_row(
        Uuid::new_v4(),
        professional_id,
        "MONDAY",
        "09:00:00",
        "09:30:00",
        false,
    )]);
    let service = conflict_service_with_slots(&mock_server, professional_id, rows).await;

    // Candidate starting exactly at an existing end is containment, not
    // merely adjacency.
    let conflict = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(9, 30), time(10, 0), "token")
        .await
        .unwrap();

    assert!(conflict);
}

#[tokio::test]
async fn candidate_containing_existing_slot_conflicts() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    let rows = json!([MockSupabaseRows::slot_row(
        Uuid::new_v4(),
        professional_id,
        "MONDAY",
        "09:00:00",
        "09:30:00",
        false,
    )]);
    let service = conflict_service_with_slots(&mock_server, professional_id, rows).await;

    let conflict = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(8, 0), time(11, 0), "token")
        .await
        .unwrap();

    assert!(conflict);
}

#[tokio::test]
async fn disjoint_range_does_not_conflict() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    let rows = json!([MockSupabaseRows::slot_row(
        Uuid::new_v4(),
        professional_id,
        "MONDAY",
        "09:00:00",
        "09:30:00",
        false,
    )]);
    let service = conflict_service_with_slots(&mock_server, professional_id, rows).await;

    let conflict = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(11, 0), time(12, 0), "token")
        .await
        .unwrap();

    assert!(!conflict);
}

#[tokio::test]
async fn repeated_checks_return_the_same_result() {
    let mock_server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    let service = conflict_service_with_slots(&mock_server, professional_id, json!([])).await;

    let first = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(9, 0), time(10, 0), "token")
        .await
        .unwrap();
    let second = service
        .has_conflict(professional_id, DayOfWeek::Monday, time(9, 0), time(10, 0), "token")
        .await
        .unwrap();

    assert_eq!(first, second);
}
