mod support;

use std::time::Duration;

async fn submit(client: &reqwest::Client, base_url: &str, user: &str, key: (&str, &str)) {
    let payload = serde_json::json!({
        "userId": user,
        "difficulty": key.0,
        "topic": key.1,
        "timestamp": 0,
    });
    let res = client
        .post(format!("{base_url}/match"))
        .json(&payload)
        .send()
        .await
        .expect("match request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert!(body["message"].as_str().unwrap_or_default().contains(user));
}

// Poll until the entry reaches a terminal 200, or give up.
async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    user: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let res = client
            .get(format!("{base_url}/check-match"))
            .query(&[("userId", user)])
            .send()
            .await
            .expect("check request should succeed");
        if res.status() == reqwest::StatusCode::OK {
            return res.json().await.expect("json body");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("user {user} never reached a matched state");
}

#[tokio::test]
async fn test_two_compatible_requests_match_via_polling() {
    let base_url = support::ensure_server(&[]);
    let client = reqwest::Client::new();
    let user_a = format!("poll-a-{}", uuid::Uuid::new_v4());
    let user_b = format!("poll-b-{}", uuid::Uuid::new_v4());

    submit(&client, base_url, &user_a, ("easy", "math")).await;

    // Before a partner arrives the entry settles as pending (202). The
    // submission is asynchronous, so allow the consumer a moment to catch up.
    let mut saw_pending = false;
    for _ in 0..100 {
        let res = client
            .get(format!("{base_url}/check-match"))
            .query(&[("userId", user_a.as_str())])
            .send()
            .await
            .expect("check request should succeed");
        if res.status() == reqwest::StatusCode::ACCEPTED {
            let body: serde_json::Value = res.json().await.expect("json body");
            assert_eq!(body["status"], "PENDING");
            saw_pending = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(saw_pending, "request never became visible as pending");

    // The wildcard difficulty is compatible with the waiting easy-math request.
    submit(&client, base_url, &user_b, ("any", "math")).await;

    let entry_a = poll_until_terminal(&client, base_url, &user_a).await;
    let entry_b = poll_until_terminal(&client, base_url, &user_b).await;

    assert_eq!(entry_a["status"], "MATCHED");
    assert_eq!(entry_b["status"], "MATCHED");
    assert_eq!(entry_a["matchedWithUserId"], serde_json::json!(user_b));
    assert_eq!(entry_b["matchedWithUserId"], serde_json::json!(user_a));
    assert_eq!(entry_a["matchedTopic"], "easy-math");
    assert_eq!(entry_a["matchedRoom"], entry_b["matchedRoom"]);
    assert!(!entry_a["matchedRoom"].as_str().unwrap_or_default().is_empty());

    // A terminal poll consumes the entry; the next poll finds nothing.
    let res = client
        .get(format!("{base_url}/check-match"))
        .query(&[("userId", user_a.as_str())])
        .send()
        .await
        .expect("check request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_check_match_for_unknown_user_returns_not_found() {
    let base_url = support::ensure_server(&[]);
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/check-match"))
        .query(&[("userId", "nobody-here")])
        .send()
        .await
        .expect("check request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["status"], "NONE");
}

#[tokio::test]
async fn test_unknown_enum_values_are_rejected_before_the_bus() {
    let base_url = support::ensure_server(&[]);
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "userId": "validation-user",
        "difficulty": "extreme",
        "topic": "math",
        "timestamp": 0,
    });

    let res = client
        .post(format!("{base_url}/match"))
        .json(&payload)
        .send()
        .await
        .expect("request should complete");

    assert_eq!(res.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cancel_then_poll_reports_cancellation() {
    let base_url = support::ensure_server(&[]);
    let client = reqwest::Client::new();
    let user = format!("poll-cancel-{}", uuid::Uuid::new_v4());

    submit(&client, base_url, &user, ("hard", "graph")).await;

    let payload = serde_json::json!({
        "userId": user,
        "difficulty": "hard",
        "topic": "graph",
        "timestamp": 0,
    });
    let res = client
        .post(format!("{base_url}/cancel-match"))
        .json(&payload)
        .send()
        .await
        .expect("cancel request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    // The cancellation is asynchronous; poll until the terminal state lands.
    let entry = poll_until_terminal(&client, base_url, &user).await;
    assert_eq!(entry["status"], "CANCELLED");
}
