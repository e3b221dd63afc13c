use crate::helpers::{spawn_app, FakeCompletionClient, VALID_REPLY};
use reqwest::header::{
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
};

#[tokio::test]
async fn preflight_requests_are_answered_without_processing() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let response = app
        .api_client
        .request(
            reqwest::Method::OPTIONS,
            &format!("{}/process-meeting", &app.address),
        )
        .header(ORIGIN, "http://localhost:5173")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_METHODS));
    assert_eq!(app.completion_calls(), 0);
}

#[tokio::test]
async fn cross_origin_responses_allow_any_origin() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let response = app
        .api_client
        .post(&format!("{}/process-meeting", &app.address))
        .header(ORIGIN, "http://localhost:5173")
        .json(&serde_json::json!({ "text": "Some notes" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn error_responses_carry_cors_headers() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let response = app
        .api_client
        .post(&format!("{}/process-meeting", &app.address))
        .header(ORIGIN, "http://localhost:5173")
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(400, response.status().as_u16());
    assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn options_requests_without_preflight_headers_succeed_with_no_body() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let test_cases = vec![
        ("/process-meeting", None, "a known path"),
        ("/process-meeting", Some("http://localhost:5173"), "an origin only"),
        ("/", None, "the service info path"),
        ("/unknown", None, "an unknown path"),
    ];

    for (path, origin, description) in test_cases {
        let mut request = app
            .api_client
            .request(reqwest::Method::OPTIONS, &format!("{}{}", &app.address, path));
        if let Some(origin) = origin {
            request = request.header(ORIGIN, origin);
        }

        let response = request.send().await.expect("Failed to execute request");

        assert_eq!(
            200,
            response.status().as_u16(),
            "The API did not succeed for an OPTIONS request with {}.",
            description
        );
        assert_eq!(response.text().await.unwrap(), "");
    }

    assert_eq!(app.completion_calls(), 0);
}
