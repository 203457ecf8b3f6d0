//! Hosted generator adapters against local stand-in servers

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use sentinel_core::models::ChatTurn;
use sentinel_core::SentinelError;
use sentinel_llm::{
    GeminiGenerator, GenerationRequest, Generator, OpenAiGenerator, ResilientGenerator, RetryPolicy,
};
use serde_json::{json, Value};

#[derive(Clone)]
struct Upstream {
    /// Requests answered with 429 before succeeding
    throttled: u32,
    calls: Arc<AtomicU32>,
    reply: Value,
}

async fn handle(
    State(upstream): State<Upstream>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let call = upstream.calls.fetch_add(1, Ordering::SeqCst);
    if call < upstream.throttled {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}})),
        );
    }
    let authorized =
        headers.contains_key("x-goog-api-key") || headers.contains_key("authorization");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "missing key"})));
    }
    let mut reply = upstream.reply.clone();
    reply["echo"] = json!({"path": uri.path(), "body": body});
    (StatusCode::OK, Json(reply))
}

async fn serve(throttled: u32, reply: Value) -> (String, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .fallback(handle)
        .with_state(Upstream {
            throttled,
            calls: calls.clone(),
            reply,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), calls)
}

fn gemini_reply(text: &str) -> Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn test_gemini_generates_text() {
    let (base, calls) = serve(0, gemini_reply("Égua, tá quente hoje!")).await;
    let gemini = GeminiGenerator::new("key", "gemini-2.0-flash-exp", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base);

    let request = GenerationRequest::new("e o calor?")
        .with_system_instruction("Você é SACY")
        .with_history(&[ChatTurn::user("oi"), ChatTurn::model("olá")]);
    let reply = gemini.generate(&request).await.unwrap();

    assert_eq!(reply, "Égua, tá quente hoje!");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(gemini.model_name(), "gemini-2.0-flash-exp");
}

#[tokio::test]
async fn test_gemini_rate_limit_is_reported() {
    let (base, _calls) = serve(1, gemini_reply("nunca")).await;
    let gemini = GeminiGenerator::new("key", "gemini-2.0-flash-exp", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base);

    let err = gemini.generate(&GenerationRequest::new("oi")).await.unwrap_err();
    assert!(matches!(err, SentinelError::RateLimited { provider } if provider == "gemini"));
}

#[tokio::test]
async fn test_resilient_gemini_retries_through_rate_limits() {
    let (base, calls) = serve(2, gemini_reply("finalmente")).await;
    let gemini = GeminiGenerator::new("key", "gemini-2.0-flash-exp", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base);
    let resilient = ResilientGenerator::new(
        Arc::new(gemini),
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(5),
        },
        Duration::ZERO,
    );

    let reply = resilient.generate(&GenerationRequest::new("oi")).await.unwrap();
    assert_eq!(reply, "finalmente");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_openai_generates_text() {
    let (base, _calls) = serve(
        0,
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "Resumo Executivo"}}]}),
    )
    .await;
    let openai = OpenAiGenerator::new("sk-test", "gpt-4o-mini", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base);

    let request = GenerationRequest::new("relatório").with_system_instruction("Você é um analista");
    let reply = openai.generate(&request).await.unwrap();
    assert_eq!(reply, "Resumo Executivo");
}

#[tokio::test]
async fn test_openai_without_choices_is_unavailable() {
    let (base, _calls) = serve(0, json!({"choices": []})).await;
    let openai = OpenAiGenerator::new("sk-test", "gpt-4o-mini", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base);

    let err = openai.generate(&GenerationRequest::new("oi")).await.unwrap_err();
    assert!(matches!(err, SentinelError::GeneratorUnavailable { .. }));
}
