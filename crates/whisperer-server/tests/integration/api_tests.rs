use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use whisperer_core::AppError;
use whisperer_core::error::BAD_INPUT_MESSAGE;

use crate::integration::common::{
    TEST_API_KEY, send, setup_empty_search_app, setup_failing_app, setup_inference_failing_app,
    setup_test_app, whisper_request,
};

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let (status, body) = send(
        &app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "healthy");
}

#[tokio::test]
async fn unauthenticated_request_returns_401() {
    let app = setup_test_app();

    let request = Request::post("/v1/whisper")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"query":"bitcoin"}"#))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "unauthorized");
    assert!(app.inference.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app();

    let request = Request::get("/v1/speech/abc/0")
        .header("authorization", "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whisper_returns_summaries_and_speech_links() {
    let app = setup_test_app();

    let (status, body) = send(&app.router, whisper_request("bitcoin")).await;

    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    let key = json["key"].as_str().unwrap();
    assert_eq!(key.len(), 64);

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["index"], 0);
    assert_eq!(results[0]["title"], "Bitcoin Holds Steady");
    assert_eq!(results[0]["published"], "Oct 18, 2022 at 8:47 a.m. UTC");
    assert_eq!(results[0]["published_at"], "2022-10-18T08:47:00Z");
    assert_eq!(results[0]["summary"], "Bitcoin is flat.");
    assert_eq!(results[0]["speech_url"], format!("/v1/speech/{key}/0"));

    assert_eq!(
        app.resolver.calls.lock().unwrap().as_slice(),
        [("bitcoin".to_string(), 3)]
    );
}

#[tokio::test]
async fn speech_is_served_from_cache() {
    let app = setup_test_app();

    let (_, body) = send(&app.router, whisper_request("bitcoin")).await;
    let speech_url = json(&body)["results"][0]["speech_url"]
        .as_str()
        .unwrap()
        .to_string();

    let request = Request::get(&speech_url)
        .header("authorization", format!("Bearer {TEST_API_KEY}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/wav");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), b"RIFF-clip-0");
}

#[tokio::test]
async fn unknown_speech_returns_404() {
    let app = setup_test_app();

    let (_, body) = send(&app.router, whisper_request("bitcoin")).await;
    let key = json(&body)["key"].as_str().unwrap().to_string();

    for path in [format!("/v1/speech/{key}/1"), "/v1/speech/unknown/0".to_string()] {
        let request = Request::get(&path)
            .header("authorization", format!("Bearer {TEST_API_KEY}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(json(&body)["error"], "not_found");
    }
}

#[tokio::test]
async fn repeated_query_does_not_rerun_pipeline() {
    let app = setup_test_app();

    let (first_status, first) = send(&app.router, whisper_request("bitcoin")).await;
    let (second_status, second) = send(&app.router, whisper_request("  bitcoin ")).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(json(&first), json(&second));
    // One summarization job plus one speech job.
    assert_eq!(app.inference.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_query_returns_400() {
    let app = setup_test_app();

    let (status, body) = send(&app.router, whisper_request("   ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "bad_input");
    assert!(app.resolver.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bad_article_url_returns_corrective_message() {
    let app = setup_failing_app(AppError::Fetch {
        status: 404,
        url: "https://www.coindesk.com/nope".into(),
    });

    let (status, body) = send(
        &app.router,
        whisper_request("https://www.coindesk.com/nope"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = json(&body);
    assert_eq!(json["error"], "bad_input");
    assert_eq!(json["message"], BAD_INPUT_MESSAGE);
}

#[tokio::test]
async fn missing_resolved_article_is_not_blamed_on_user() {
    let app = setup_failing_app(AppError::Fetch {
        status: 404,
        url: "https://www.coindesk.com/markets/a".into(),
    });

    let (status, body) = send(&app.router, whisper_request("bitcoin")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = json(&body);
    assert_eq!(json["error"], "internal_error");
    assert_ne!(json["message"], BAD_INPUT_MESSAGE);
}

#[tokio::test]
async fn rejected_inference_key_returns_502() {
    let app = setup_inference_failing_app(AppError::JobApi {
        status: 401,
        url: "https://app.modzy.com/api/jobs".into(),
    });

    let (status, body) = send(
        &app.router,
        whisper_request("https://www.coindesk.com/markets/a"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let json = json(&body);
    assert_eq!(json["error"], "inference_api");
    assert_ne!(json["message"], BAD_INPUT_MESSAGE);
}

#[tokio::test]
async fn empty_search_returns_404() {
    let app = setup_empty_search_app();

    let (status, body) = send(&app.router, whisper_request("zzzzqqq")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let json = json(&body);
    assert_eq!(json["error"], "no_results");
    assert_eq!(
        json["message"],
        "No result is found based on the keyword 'zzzzqqq'"
    );
}

#[tokio::test]
async fn failures_are_not_cached() {
    let app = setup_failing_app(AppError::NetworkError("connection reset".into()));

    let (first, _) = send(&app.router, whisper_request("https://www.coindesk.com/a")).await;
    let (second, _) = send(&app.router, whisper_request("https://www.coindesk.com/a")).await;

    assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);
    // The mock fetcher only fails once; the second run reaches inference.
    assert_eq!(second, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.inference.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let app = setup_test_app();

    let (status, body) = send(
        &app.router,
        Request::get("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json = json(&body);
    assert!(json["paths"]["/v1/whisper"].is_object());
    assert!(json["paths"]["/v1/speech/{key}/{index}"].is_object());
}
