//! Operator API tests

use std::net::SocketAddr;
use std::sync::Arc;

use bioconsole::app::options::ServerOptions;
use bioconsole::app::state::AppState;
use bioconsole::server::serve::serve;
use bioconsole::setpoint::state::PendingClearPolicy;
use http::StatusCode;
use plant_api::ExecuteResponse;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::common::{sample_plan, snapshot, step, FakePlant, Reply};

struct Harness {
    base: String,
    http: reqwest::Client,
    plant: Arc<FakePlant>,
    state: Arc<AppState>,
    _shutdown: oneshot::Sender<()>,
}

impl Harness {
    async fn start(policy: PendingClearPolicy) -> Self {
        let plant = Arc::new(FakePlant::new());
        let state = Arc::new(AppState::new(plant.clone(), policy));
        let options = ServerOptions {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let (addr, _handle): (SocketAddr, _) = serve(&options, state.clone(), async move {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            plant,
            state,
            _shutdown: shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.http.get(self.url(path)).send().await.unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.http.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        (response.status(), response.json().await.unwrap())
    }

    async fn poll(&self) {
        self.state
            .feed
            .poll(self.plant.as_ref(), &self.state.events)
            .await;
    }
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::start(PendingClearPolicy::default()).await;

    let (status, body) = harness.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "bioconsole");
}

#[tokio::test]
async fn test_edit_and_submit_setpoint() {
    let harness = Harness::start(PendingClearPolicy::ClearOnPollConfirm).await;
    harness
        .plant
        .set_status(Reply::Ok(snapshot(&[("DO", 40.0, 50.0)])));
    harness.poll().await;

    let (status, view) = harness
        .send(
            reqwest::Method::PUT,
            "/parameters/DO/pending",
            Some(json!({"value": "52"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["displayed"], "52");
    assert_eq!(view["confirmed"], 50.0);
    assert_eq!(view["state"]["state"], "shadowed");

    let (status, body) = harness
        .send(reqwest::Method::POST, "/parameters/DO/submit", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["written"], true);
    assert_eq!(body["requested"], 52.0);

    harness
        .plant
        .set_status(Reply::Ok(snapshot(&[("DO", 41.0, 52.0)])));
    harness.poll().await;

    let (_, table) = harness.get("/parameters").await;
    let row = &table["parameters"][0];
    assert_eq!(row["name"], "DO");
    assert_eq!(row["displayed"], 52.0);
    assert_eq!(row["state"]["state"], "confirmed");
    assert_eq!(table["status"]["DO"]["SP"], 52.0);
}

#[tokio::test]
async fn test_invalid_submit_is_bad_request() {
    let harness = Harness::start(PendingClearPolicy::default()).await;

    harness
        .send(
            reqwest::Method::PUT,
            "/parameters/pH/pending",
            Some(json!({"value": "seven"})),
        )
        .await;
    let (status, body) = harness
        .send(reqwest::Method::POST, "/parameters/pH/submit", None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("seven"));
    assert_eq!(harness.plant.call_count("write"), 0);

    let (_, events) = harness.get("/events").await;
    assert_eq!(events[0]["type"], "error");
    assert_eq!(events[0]["message"], r#"Invalid setpoint for pH: "seven""#);
}

#[tokio::test]
async fn test_revert_pending() {
    let harness = Harness::start(PendingClearPolicy::default()).await;
    harness
        .send(
            reqwest::Method::PUT,
            "/parameters/Temp/pending",
            Some(json!({"value": "38"})),
        )
        .await;

    let (_, first) = harness
        .send(reqwest::Method::DELETE, "/parameters/Temp/pending", None)
        .await;
    let (_, second) = harness
        .send(reqwest::Method::DELETE, "/parameters/Temp/pending", None)
        .await;

    assert_eq!(first["reverted"], true);
    assert_eq!(second["reverted"], false);
}

#[tokio::test]
async fn test_plan_lifecycle() {
    let harness = Harness::start(PendingClearPolicy::default()).await;
    harness.plant.set_execute(Reply::Ok(ExecuteResponse {
        message: Some("Plan executed".to_string()),
        log: vec![step(1, json!("Set Agit=400"))],
    }));

    let (status, plan) = harness
        .send(
            reqwest::Method::POST,
            "/plan",
            Some(json!({"prompt": "Raise agitation"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&plan, sample_plan().document());

    let (_, slot) = harness.get("/plan").await;
    assert_eq!(slot["phase"], "draft");

    let (status, report) = harness
        .send(reqwest::Method::POST, "/plan/execute", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["steps"][0]["details"], "Set Agit=400");

    let (_, slot) = harness.get("/plan").await;
    assert_eq!(slot["phase"], "idle");
    assert!(slot["plan"].is_null());

    let (status, _) = harness
        .send(reqwest::Method::POST, "/plan/execute", None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, events) = harness.get("/events?since=1").await;
    let messages: Vec<_> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        messages,
        vec!["Step 1: Set Agit=400", "Plan executed successfully."]
    );
}

#[tokio::test]
async fn test_discard_plan() {
    let harness = Harness::start(PendingClearPolicy::default()).await;
    harness
        .send(
            reqwest::Method::POST,
            "/plan",
            Some(json!({"prompt": "Raise agitation"})),
        )
        .await;

    let (_, first) = harness.send(reqwest::Method::DELETE, "/plan", None).await;
    let (status, second) = harness.send(reqwest::Method::DELETE, "/plan", None).await;

    assert_eq!(first["discarded"], true);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["discarded"], false);
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let harness = Harness::start(PendingClearPolicy::default()).await;
    harness.plant.set_plan(Reply::Reject(
        StatusCode::SERVICE_UNAVAILABLE,
        Some(json!("Planner offline")),
    ));

    let (status, body) = harness
        .send(
            reqwest::Method::POST,
            "/plan",
            Some(json!({"prompt": "Anything"})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Planner offline");
}

#[tokio::test]
async fn test_control_loops_placeholder_on_failure() {
    let harness = Harness::start(PendingClearPolicy::default()).await;
    *harness.plant.control_loops.lock().unwrap() = Reply::NetworkDown;

    let (status, body) = harness.get("/control_loops").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Error fetching data.");
    assert_eq!(body["active_loops"], json!([]));
    assert!(harness.state.events.is_empty());
}
