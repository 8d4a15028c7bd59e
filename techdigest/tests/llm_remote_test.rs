use techdigest::llm::remote::RemoteProvider;
use techdigest::llm::{CompletionProvider, LlmRequest};

#[tokio::test]
async fn test_remote_provider_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Keywords: cloud\nTranslations: cloud: облако"
                    },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 10,
                    "completion_tokens": 5,
                    "total_tokens": 15
                }
            }"#,
        )
        .create_async()
        .await;

    let provider = RemoteProvider::new(server.url(), "fake-api-key", "gpt-4o-mini");

    let request = LlmRequest {
        prompt: "Test prompt".to_string(),
        max_tokens: Some(100),
        temperature: Some(0.7),
        timeout_seconds: Some(10),
    };

    let response = provider.complete(request).await.expect("complete");
    assert_eq!(
        response.content,
        "Keywords: cloud\nTranslations: cloud: облако"
    );
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);
    assert_eq!(response.model, "gpt-4o-mini");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_error_handling() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
        .create_async()
        .await;

    let provider = RemoteProvider::new(server.url(), "fake-api-key", "gpt-4o-mini");

    let request = LlmRequest::with_prompt("Test".to_string());
    let result = provider.complete(request).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("429"));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_remote_provider_missing_choices() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model": "gpt-4o-mini", "choices": []}"#)
        .create_async()
        .await;

    let provider = RemoteProvider::new(server.url(), "fake-api-key", "gpt-4o-mini");

    let result = provider
        .complete(LlmRequest::with_prompt("Test".to_string()))
        .await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("no choices"));
}

#[tokio::test]
async fn test_remote_provider_timeout() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let provider = RemoteProvider::new(server.url(), "fake-api-key", "gpt-4o-mini");

    let request = LlmRequest {
        prompt: "Test".to_string(),
        max_tokens: None,
        temperature: None,
        timeout_seconds: Some(1),
    };

    let result = provider.complete(request).await;

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("timed out"));
}
