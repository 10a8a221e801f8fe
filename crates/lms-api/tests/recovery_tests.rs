use crate::common::{TestApp, TestStateBuilder, start};
use axum::http::StatusCode;
use chrono::Duration;
use lms_db::repositories::streak::{get_streak, save_streak};
use lms_streak::Streak;
use serde_json::{Value, json};

async fn seed_broken_streak(app: &TestApp, days_ago: i64, current: u32) {
    let mut streak = Streak::new("user-1", start() - Duration::days(days_ago));
    streak.current_streak = current;
    streak.longest_streak = current;
    save_streak(app.store.as_ref(), &streak).await.unwrap();
}

async fn generate(app: &TestApp, missed_days: u32) -> Value {
    let response = app
        .client
        .post_json(
            "/recovery/assessments",
            &json!({"userId": "user-1", "objectiveId": "obj-1", "missedDays": missed_days}),
        )
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn all_answers(count: usize, answer: Value) -> Value {
    let answers: Vec<Value> = (1..=count)
        .map(|i| json!({"questionId": format!("q{i}"), "answer": answer}))
        .collect();
    json!({ "answers": answers })
}

#[tokio::test]
async fn test_full_recovery_flow() {
    let app = TestStateBuilder::new().objective("obj-1", "user-1").build().await;
    seed_broken_streak(&app, 4, 5).await;

    let options: Value = app
        .client
        .get("/recovery/user-1/objectives/obj-1/options")
        .await
        .json();
    assert_eq!(options["missedDays"], 3);
    assert_eq!(options["recoverableDays"], 3);
    assert_eq!(options["questionCount"], 30);
    assert_eq!(options["canAttempt"], true);

    let assessment = generate(&app, 3).await;
    assert_eq!(assessment["status"], "pending");
    assert_eq!(assessment["missedDays"], 3);
    assert_eq!(assessment["questionCount"], 30);
    let questions = assessment["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 30);
    assert!(questions[0].get("correctAnswer").is_none());
    assert!(questions[0].get("explanation").is_none());

    let id = assessment["id"].as_str().unwrap();
    let mut body = all_answers(30, json!(1));
    body["timeSpent"] = json!(600);
    let response = app
        .client
        .post_json(&format!("/recovery/assessments/{id}/validate"), &body)
        .await;
    response.assert_status(StatusCode::OK);
    let result: Value = response.json();
    assert_eq!(result["passed"], true);
    assert_eq!(result["score"], 100.0);
    assert_eq!(result["correctAnswers"], 30);
    assert_eq!(result["recoveredDays"], 3);
    assert_eq!(result["newStreak"], 3);
    assert_eq!(result["averageTimePerQuestion"], 20.0);
    assert_eq!(result["suspiciousPattern"], false);
    assert_eq!(result["feedback"][0]["explanation"], "Option b is correct");

    let streak: Value = app.client.get("/streaks/user-1").await.json();
    assert_eq!(streak["currentStreak"], 3);
    assert_eq!(streak["longestStreak"], 5);
    assert_eq!(streak["missedDays"], 0);
    assert_eq!(streak["recoveryHistory"].as_array().unwrap().len(), 1);

    let stored: Value = app
        .client
        .get(&format!("/recovery/assessments/{id}"))
        .await
        .json();
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["passed"], true);

    app.client
        .post_json(&format!("/recovery/assessments/{id}/validate"), &body)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_recovery_keeps_streak() {
    let app = TestStateBuilder::new().objective("obj-1", "user-1").build().await;
    seed_broken_streak(&app, 3, 4).await;

    let assessment = generate(&app, 2).await;
    let id = assessment["id"].as_str().unwrap();

    let result: Value = app
        .client
        .post_json(
            &format!("/recovery/assessments/{id}/validate"),
            &all_answers(20, json!(0)),
        )
        .await
        .json();
    assert_eq!(result["passed"], false);
    assert_eq!(result["recoveredDays"], 0);
    assert_eq!(result["newStreak"], 0);
    assert!(result.get("averageTimePerQuestion").unwrap().is_null());

    let stored = get_streak(app.store.as_ref(), "user-1").await.unwrap().unwrap();
    assert_eq!(stored.longest_streak, 4);
    assert!(stored.recovery_history.is_empty());
}

#[tokio::test]
async fn test_cooldown_blocks_second_attempt() {
    let app = TestStateBuilder::new().objective("obj-1", "user-1").build().await;
    generate(&app, 2).await;

    let response = app
        .client
        .post_json(
            "/recovery/assessments",
            &json!({"userId": "user-1", "objectiveId": "obj-1", "missedDays": 2}),
        )
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["remaining"], "1 hour");
    assert!(body["cooldownEndsAt"].is_string());
    assert_eq!(
        body["error"],
        "Recovery is on cooldown. Please wait 1 hour before trying again."
    );

    let options: Value = app
        .client
        .get("/recovery/user-1/objectives/obj-1/options")
        .await
        .json();
    assert_eq!(options["canAttempt"], false);

    app.clock.advance(Duration::hours(2));
    generate(&app, 2).await;
}

#[tokio::test]
async fn test_generation_rejections() {
    let app = TestStateBuilder::new()
        .objective("obj-1", "user-1")
        .objective("obj-2", "user-2")
        .build()
        .await;

    let cases = [
        (json!({"userId": "user-1", "objectiveId": "missing", "missedDays": 2}), StatusCode::NOT_FOUND),
        (json!({"userId": "user-1", "objectiveId": "obj-2", "missedDays": 2}), StatusCode::FORBIDDEN),
        (json!({"userId": "user-1", "objectiveId": "obj-1", "missedDays": 0}), StatusCode::BAD_REQUEST),
        (json!({"userId": "", "objectiveId": "obj-1", "missedDays": 2}), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        app.client
            .post_json("/recovery/assessments", &body)
            .await
            .assert_status(expected);
    }

    app.client
        .get("/recovery/assessments/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.client
        .post_json("/recovery/assessments/does-not-exist/validate", &all_answers(1, json!(1)))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_assessment_cannot_be_validated() {
    let app = TestStateBuilder::new().objective("obj-1", "user-1").build().await;
    let assessment = generate(&app, 1).await;
    let id = assessment["id"].as_str().unwrap();

    app.clock.advance(Duration::hours(25));
    let expired = app
        .state
        .recovery
        .expire_stale_assessments(app.state.recovery_config.assessment_expiry())
        .await
        .unwrap();
    assert_eq!(expired, 1);

    app.client
        .post_json(&format!("/recovery/assessments/{id}/validate"), &all_answers(10, json!(1)))
        .await
        .assert_status(StatusCode::GONE);
}
