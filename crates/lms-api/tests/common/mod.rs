use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use lms_api::{
    config::{Environment, RecoveryConfig},
    middleware::{apply_security_headers, request_id_middleware},
    recovery::generator::{GenerationError, QuestionGenerator},
    router,
    state::ApiState,
};
use lms_db::{
    DocumentStore, MemoryStore,
    models::{AnswerValue, LEARNING_OBJECTIVES, ObjectiveProfile, QuizQuestion},
};
use lms_streak::ManualClock;
use serde::Deserialize;
use serde_json::json;
use tower::ServiceExt;

/// Monday morning, the default start of every test
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap()
}

/// Generator that always answers with option 1
#[derive(Debug, Default)]
pub struct FixedGenerator;

#[async_trait]
impl QuestionGenerator for FixedGenerator {
    async fn generate_recovery_questions(
        &self,
        profile: &ObjectiveProfile,
        _missed_days: u32,
        question_count: u32,
    ) -> Result<Vec<QuizQuestion>, GenerationError> {
        Ok((1..=question_count)
            .map(|i| QuizQuestion {
                id: format!("q{i}"),
                question: format!("{} question {i}", profile.title),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer: AnswerValue::Index(1),
                explanation: "Option b is correct".into(),
                difficulty: "easy".into(),
            })
            .collect())
    }
}

/// Everything a test needs to drive the API and inspect its effects
pub struct TestApp {
    pub client: TestClient,
    pub state: ApiState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

/// Test state builder backed by the in-memory store and a manual clock
pub struct TestStateBuilder {
    environment: Environment,
    recovery: RecoveryConfig,
    objectives: Vec<(String, String)>,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            recovery: RecoveryConfig::default(),
            objectives: Vec::new(),
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Seed a learning objective owned by `user_id`
    pub fn objective(mut self, objective_id: &str, user_id: &str) -> Self {
        self.objectives
            .push((objective_id.to_string(), user_id.to_string()));
        self
    }

    pub async fn build(self) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start()));

        for (objective_id, user_id) in &self.objectives {
            store
                .create(
                    LEARNING_OBJECTIVES,
                    objective_id,
                    json!({
                        "userId": user_id,
                        "title": "Lifetimes",
                        "description": "Borrow checker basics",
                        "topics": ["borrowing", "lifetimes"],
                    }),
                )
                .await
                .expect("Failed to seed objective");
        }

        let state = ApiState::new(
            store.clone(),
            Arc::new(FixedGenerator),
            clock.clone(),
            self.recovery,
            self.environment.clone(),
        );

        let app = router::router()
            .with_state(state.clone())
            .layer(axum::middleware::from_fn(request_id_middleware));
        let app = apply_security_headers(app, self.environment);

        TestApp {
            client: TestClient::new(app),
            state,
            store,
            clock,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with no body
    pub async fn post(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
