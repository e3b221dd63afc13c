use crate::helpers::{
    spawn_app, spawn_app_with_settings, text_file_part, FakeCompletionClient, VALID_REPLY,
};
use meeting_notes_service::ports::completion_client::CompletionClientError;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

#[tokio::test]
async fn process_meeting_returns_a_200_for_an_uploaded_text_file() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;
    let form = Form::new().part("file", text_file_part("Alice will send the report by Friday."));

    let response = app.post_multipart(form).await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    assert_eq!(body["actionItems"][0]["owner"], "Alice");
    assert_eq!(body["actionItems"][0]["due"], "Friday");

    assert_eq!(app.completion_calls(), 1);
    assert!(app.prompts()[0].contains("Alice will send the report by Friday."));
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_accepts_inline_text_in_any_body_format() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let multipart_response = app
        .post_multipart(Form::new().text("text", "We agreed to ship on Monday."))
        .await;
    let json_response = app
        .post_json(&json!({ "text": "We agreed to ship on Monday." }))
        .await;
    let form_response = app
        .api_client
        .post(&format!("{}/process-meeting", &app.address))
        .form(&[("text", "We agreed to ship on Monday.")])
        .send()
        .await
        .expect("Failed to execute request.");

    for response in [multipart_response, json_response, form_response] {
        assert_eq!(200, response.status().as_u16());
    }
    assert_eq!(app.completion_calls(), 3);
    assert!(app
        .prompts()
        .iter()
        .all(|prompt| prompt.contains("We agreed to ship on Monday.")));
}

#[tokio::test]
async fn process_meeting_prefers_the_uploaded_file_over_inline_text() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;
    let form = Form::new()
        .text("text", "Inline notes")
        .part("file", text_file_part("Uploaded notes"));

    let response = app.post_multipart(form).await;

    assert_eq!(200, response.status().as_u16());
    assert!(app.prompts()[0].contains("Uploaded notes"));
    assert!(!app.prompts()[0].contains("Inline notes"));
}

#[tokio::test]
async fn process_meeting_returns_a_400_when_no_input_is_provided() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;

    let test_cases = vec![
        (
            app.post_multipart(Form::new().text("text", "   ")).await,
            "blank inline text",
        ),
        (
            app.post_multipart(Form::new().part("file", text_file_part("")))
                .await,
            "empty file",
        ),
        (app.post_json(&json!({})).await, "JSON body without text"),
        (
            app.api_client
                .post(&format!("{}/process-meeting", &app.address))
                .send()
                .await
                .expect("Failed to execute request."),
            "no body",
        ),
    ];

    for (response, description) in test_cases {
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );

        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "No input provided." }));
    }

    assert_eq!(app.completion_calls(), 0);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_returns_a_415_for_a_non_text_file() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;
    let png = Part::bytes(vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a])
        .file_name("notes.png")
        .mime_str("image/png")
        .unwrap();

    let response = app.post_multipart(Form::new().part("file", png)).await;

    assert_eq!(415, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("image/png"));

    assert_eq!(app.completion_calls(), 0);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_returns_a_400_when_two_files_are_uploaded() {
    let app = spawn_app(FakeCompletionClient::replying(VALID_REPLY)).await;
    let form = Form::new()
        .part("file", text_file_part("First notes"))
        .part("file", text_file_part("Second notes"));

    let response = app.post_multipart(form).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(app.completion_calls(), 0);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_returns_a_413_when_the_upload_is_too_large() {
    let app = spawn_app_with_settings(FakeCompletionClient::replying(VALID_REPLY), |settings| {
        settings.application.max_upload_bytes = 16;
    })
    .await;
    let form = Form::new().part("file", text_file_part(&"notes ".repeat(100)));

    let response = app.post_multipart(form).await;

    assert_eq!(413, response.status().as_u16());
    assert_eq!(app.completion_calls(), 0);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_strips_code_fences_from_the_reply() {
    let fenced_reply = format!("```json\n{}\n```", VALID_REPLY);
    let app = spawn_app(FakeCompletionClient::replying(&fenced_reply)).await;

    let response = app
        .post_json(&json!({ "text": "Alice will send the report by Friday." }))
        .await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["summary"], "Alice will send the report.");
}

#[tokio::test]
async fn process_meeting_returns_a_500_with_the_raw_reply_when_it_is_not_json() {
    let app = spawn_app(FakeCompletionClient::replying("Sure! Here is the summary.")).await;
    let form = Form::new().part("file", text_file_part("Alice will send the report by Friday."));

    let response = app.post_multipart(form).await;

    assert_eq!(500, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON");
    assert_eq!(body["raw"], "Sure! Here is the summary.");
    assert!(!body["parseError"].as_str().unwrap().is_empty());

    // Deleted on failure too
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_returns_a_500_without_calling_the_api_when_no_key_is_configured() {
    let app = spawn_app(FakeCompletionClient::unconfigured()).await;
    let form = Form::new().part("file", text_file_part("Alice will send the report by Friday."));

    let response = app.post_multipart(form).await;

    assert_eq!(500, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "API key is not configured" }));

    assert_eq!(app.completion_calls(), 0);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_maps_completion_errors_to_status_codes() {
    let test_cases: Vec<(fn() -> CompletionClientError, u16)> = vec![
        (
            || CompletionClientError::InvalidCredential("API_KEY_INVALID: API key not valid".into()),
            401,
        ),
        (
            || CompletionClientError::QuotaExceeded("RESOURCE_EXHAUSTED: Quota exceeded".into()),
            429,
        ),
        (
            || CompletionClientError::Unclassified("INTERNAL: backend error".into()),
            500,
        ),
        (|| CompletionClientError::EmptyReply, 500),
    ];

    for (error, expected_status) in test_cases {
        let app = spawn_app(FakeCompletionClient::failing(error)).await;

        let response = app.post_json(&json!({ "text": "Some notes" })).await;

        assert_eq!(expected_status, response.status().as_u16());

        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
        assert!(body.get("raw").is_none());
    }
}

#[tokio::test]
async fn process_meeting_returns_a_500_and_deletes_the_upload_when_processing_panics() {
    let app = spawn_app(FakeCompletionClient::panicking()).await;
    let form = Form::new().part("file", text_file_part("Alice will send the report by Friday."));

    let response = app.post_multipart(form).await;

    assert_eq!(500, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(app.completion_calls(), 1);
    assert_eq!(app.uploaded_files_left(), 0);
}

#[tokio::test]
async fn process_meeting_returns_the_model_reply_untouched() {
    let reply = json!({
        "summary": "s",
        "decisions": ["d"],
        "actionItems": [{"task": "t", "owner": null, "due": "Friday", "priority": "high"}]
    });
    let app = spawn_app(FakeCompletionClient::replying(&reply.to_string())).await;

    let response = app.post_json(&json!({ "text": "Some notes" })).await;

    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, reply);
}
