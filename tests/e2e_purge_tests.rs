//! End-to-end tests for the expired record purge job
//!
//! Tests the job admin routes and batch-limited deletion.

mod common;

use common::{TestClient, TestServer, PURGE_JOB_ID};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_purge_job_is_listed() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_jobs().await;
    assert_eq!(response.status(), StatusCode::OK);

    let jobs: Vec<Value> = response.json().await.unwrap();
    let job = jobs
        .iter()
        .find(|j| j["id"] == PURGE_JOB_ID)
        .expect("purge job not listed");
    assert_eq!(job["schedule"]["schedule_type"], "daily");
    assert_eq!(job["schedule"]["at"], "03:00");
    assert!(job["next_run_at"].is_string());
}

#[tokio::test]
async fn test_get_unknown_job() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_job("no_such_job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_unknown_job() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.trigger_job("no_such_job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["triggered"], false);
}

#[tokio::test]
async fn test_purge_deletes_one_batch_per_run() {
    let server = TestServer::spawn().await.with_records("old-", 700, 45);
    let client = TestClient::new(server.base_url.clone());

    let run = client.trigger_job_and_wait(PURGE_JOB_ID).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["triggered_by"], "manual");
    assert_eq!(server.records.count_records().unwrap(), 200);

    let run = client.trigger_job_and_wait(PURGE_JOB_ID).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(server.records.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_purge_keeps_records_within_retention() {
    let server = TestServer::spawn()
        .await
        .with_records("old-", 10, 31)
        .with_records("new-", 25, 5);
    let client = TestClient::new(server.base_url.clone());

    let run = client.trigger_job_and_wait(PURGE_JOB_ID).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(server.records.count_records().unwrap(), 25);
}

#[tokio::test]
async fn test_purge_with_nothing_expired() {
    let server = TestServer::spawn().await.with_records("new-", 3, 1);
    let client = TestClient::new(server.base_url.clone());

    let run = client.trigger_job_and_wait(PURGE_JOB_ID).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(server.records.count_records().unwrap(), 3);
}
