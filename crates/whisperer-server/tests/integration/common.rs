use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

use whisperer_core::testutil::{
    MockFetcher, MockInference, MockParser, MockResolver, audio_outputs, text_outputs,
};
use whisperer_core::{AppError, Article, ContentFetcher, WhisperService};
use whisperer_server::routes;
use whisperer_server::state::AppState;

pub const TEST_API_KEY: &str = "test-secret-key";

pub type MockService = WhisperService<MockFetcher, MockResolver, MockParser, MockInference>;

pub struct TestApp {
    pub router: Router,
    pub inference: MockInference,
    pub resolver: MockResolver,
}

/// App whose pipeline turns one article into one summary and one clip.
pub fn setup_test_app() -> TestApp {
    let inference = MockInference::with_responses(vec![
        Ok(text_outputs(&["Bitcoin is flat."])),
        Ok(audio_outputs(vec![b"RIFF-clip-0".to_vec()])),
    ]);
    let resolver = MockResolver::new(vec!["https://www.coindesk.com/markets/a"]);
    let service = WhisperService::new(
        ContentFetcher::new(MockFetcher::new("<html>article</html>"), resolver.clone()),
        MockParser::new(vec![Article::new(
            "Bitcoin Holds Steady",
            "Oct 18, 2022 at 8:47 a.m. UTC",
            "Long body.",
        )]),
        inference.clone(),
    );
    build(service, inference, resolver)
}

/// App whose pipeline fails with `error` on the first fetch.
pub fn setup_failing_app(error: AppError) -> TestApp {
    let inference = MockInference::with_responses(Vec::new());
    let resolver = MockResolver::new(vec!["https://www.coindesk.com/markets/a"]);
    let service = WhisperService::new(
        ContentFetcher::new(MockFetcher::with_error(error), resolver.clone()),
        MockParser::new(Vec::new()),
        inference.clone(),
    );
    build(service, inference, resolver)
}

/// App whose content stage succeeds and whose first inference job fails with `error`.
pub fn setup_inference_failing_app(error: AppError) -> TestApp {
    let inference = MockInference::with_responses(vec![Err(error)]);
    let resolver = MockResolver::new(vec!["https://www.coindesk.com/markets/a"]);
    let service = WhisperService::new(
        ContentFetcher::new(MockFetcher::new("<html>article</html>"), resolver.clone()),
        MockParser::new(vec![Article::new("Bitcoin Holds Steady", "", "Long body.")]),
        inference.clone(),
    );
    build(service, inference, resolver)
}

/// App whose keyword search finds nothing.
pub fn setup_empty_search_app() -> TestApp {
    let inference = MockInference::with_responses(Vec::new());
    let resolver = MockResolver::empty();
    let service = WhisperService::new(
        ContentFetcher::new(MockFetcher::new("<html></html>"), resolver.clone()),
        MockParser::new(Vec::new()),
        inference.clone(),
    );
    build(service, inference, resolver)
}

fn build(service: MockService, inference: MockInference, resolver: MockResolver) -> TestApp {
    let state = Arc::new(AppState::new(service, TEST_API_KEY));
    TestApp {
        router: routes::router(state),
        inference,
        resolver,
    }
}

pub fn whisper_request(query: &str) -> Request<Body> {
    Request::post("/v1/whisper")
        .header("authorization", format!("Bearer {TEST_API_KEY}"))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&serde_json::json!({ "query": query })).unwrap(),
        ))
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (axum::http::StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}
