//! Client behaviour against a mocked scheduler API

use chrono::{TimeZone, Utc};
use serde_json::json;
use tourney_domain::TournamentId;
use tourney_sdk::{SchedulerClient, SdkError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SchedulerClient {
    SchedulerClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn tournament() -> TournamentId {
    TournamentId::parse("spring-open").unwrap()
}

fn confirmation() -> serde_json::Value {
    json!({
        "message": "Tournament processing scheduled",
        "tournamentId": "spring-open",
        "jobId": "01890a5d-ac96-774b-bcce-b302099a8057",
        "dueAt": "2099-06-01T12:00:00Z",
        "replacedJobId": null
    })
}

#[tokio::test]
async fn test_schedule_posts_transport_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tournament"))
        .and(body_partial_json(json!({
            "tournamentId": "spring-open",
            "processingData": { "round": 1 }
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(confirmation()))
        .expect(1)
        .mount(&server)
        .await;

    let deadline = Utc.with_ymd_and_hms(2099, 6, 1, 12, 0, 0).unwrap();
    let result = client(&server)
        .schedule_processing(&tournament(), deadline, Some(json!({ "round": 1 })))
        .await
        .unwrap();

    assert_eq!(result.tournament_id, tournament());
    assert_eq!(result.due_at, deadline);
    assert!(result.replaced_job_id.is_none());
}

#[tokio::test]
async fn test_reschedule_uses_put() {
    let server = MockServer::start().await;
    let mut body = confirmation();
    body["message"] = json!("Tournament processing rescheduled");
    body["replacedJobId"] = json!("01890a5d-ac96-774b-bcce-b302099a8058");

    Mock::given(method("PUT"))
        .and(path("/api/tournament"))
        .respond_with(ResponseTemplate::new(202).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .reschedule_processing(&tournament(), Utc::now(), None)
        .await
        .unwrap();

    assert!(result.replaced_job_id.is_some());
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let cases = [
        (400, "VALIDATION_ERROR"),
        (409, "SCHEDULING_CONFLICT"),
        (503, "STORE_UNAVAILABLE"),
        (500, "INTERNAL_ERROR"),
    ];

    for (status, code) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tournament"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "error": code, "message": "nope" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .schedule_processing(&tournament(), Utc::now(), None)
            .await
            .unwrap_err();

        match (status, &err) {
            (400, SdkError::Validation { message }) => assert_eq!(message, "nope"),
            (409, SdkError::Conflict { .. }) => {}
            (503, SdkError::Unavailable { .. }) => assert!(err.is_retryable()),
            (500, SdkError::Unexpected { status_code, .. }) => assert_eq!(*status_code, 500),
            _ => panic!("status {} mapped to {:?}", status, err),
        }
    }
}

#[tokio::test]
async fn test_non_2xx_without_json_body_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let err = client(&server)
        .schedule_processing(&tournament(), Utc::now(), None)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(418));
}

#[tokio::test]
async fn test_failed_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "STORE_UNAVAILABLE",
            "message": "queue store unavailable"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .schedule_processing(&tournament(), Utc::now(), None)
        .await;

    assert!(result.is_err());
    server.verify().await;
}

#[tokio::test]
async fn test_pending_job_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tournament/spring-open/job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "key": "tournament-spring-open",
            "state": "delayed",
            "attempts": 0,
            "maxAttempts": 3,
            "dueAt": "2099-06-01T12:00:00Z",
            "lastError": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tournament/autumn-cup/job"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "NOT_FOUND",
            "message": "No pending job for tournament autumn-cup"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let job = client.pending_job(&tournament()).await.unwrap().unwrap();
    assert_eq!(job.state, "delayed");
    assert_eq!(job.attempts, 0);

    let missing = TournamentId::parse("autumn-cup").unwrap();
    assert!(client.pending_job(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = SchedulerClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let err = client
        .schedule_processing(&tournament(), Utc::now(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::Network { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_pending_job_encodes_reserved_characters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tournament/cup%2F2024%3Ffinal/job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "01890a5d-ac96-774b-bcce-b302099a8057",
            "state": "active",
            "attempts": 1,
            "dueAt": "2099-06-01T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = TournamentId::parse("cup/2024?final").unwrap();
    let job = client(&server).pending_job(&id).await.unwrap().unwrap();
    assert_eq!(job.state, "active");
}
