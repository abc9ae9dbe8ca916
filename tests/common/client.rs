//! HTTP client for end-to-end tests
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    pub async fn notify(&self, link: &str, title: &str, body: Option<&str>) -> Response {
        let mut payload = json!({ "link": link, "title": title });
        if let Some(body) = body {
            payload["body"] = json!(body);
        }
        self.notify_json(payload).await
    }

    pub async fn notify_json(&self, payload: Value) -> Response {
        self.client
            .post(format!("{}/v1/notify", self.base_url))
            .json(&payload)
            .send()
            .await
            .expect("Notify request failed")
    }

    pub async fn notify_raw(&self, body: &'static str) -> Response {
        self.client
            .post(format!("{}/v1/notify", self.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Notify request failed")
    }

    pub async fn get_notify(&self) -> Response {
        self.client
            .get(format!("{}/v1/notify", self.base_url))
            .send()
            .await
            .expect("Notify request failed")
    }

    pub async fn list_jobs(&self) -> Response {
        self.client
            .get(format!("{}/v1/admin/jobs", self.base_url))
            .send()
            .await
            .expect("List jobs request failed")
    }

    pub async fn get_job(&self, job_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/admin/jobs/{}", self.base_url, job_id))
            .send()
            .await
            .expect("Get job request failed")
    }

    pub async fn trigger_job(&self, job_id: &str) -> Response {
        self.client
            .post(format!("{}/v1/admin/jobs/{}/trigger", self.base_url, job_id))
            .send()
            .await
            .expect("Trigger job request failed")
    }

    /// Triggers a job and waits until a run started after the trigger has
    /// finished. Returns that run's JSON.
    pub async fn trigger_job_and_wait(&self, job_id: &str) -> Value {
        let previous_start = self.last_run(job_id).await.map(|r| r["started_at"].clone());

        let response = self.trigger_job(job_id).await;
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        let start = std::time::Instant::now();
        loop {
            if start.elapsed() > Duration::from_millis(JOB_WAIT_TIMEOUT_MS) {
                panic!("Job {} did not finish in time", job_id);
            }
            let info: Value = self.get_job(job_id).await.json().await.unwrap();
            let finished = !info["is_running"].as_bool().unwrap_or(true);
            let last_start = info["last_run"].get("started_at").cloned();
            if finished && last_start.is_some() && last_start != previous_start {
                return info["last_run"].clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn last_run(&self, job_id: &str) -> Option<Value> {
        let info: Value = self.get_job(job_id).await.json().await.ok()?;
        let last_run = info.get("last_run")?;
        (!last_run.is_null()).then(|| last_run.clone())
    }
}
