//! Model generator against a local HTTP endpoint

use pps_merge::MergeEngine;
use pps_pipeline::{
    GenerationError, Generator, ModelConfig, ModelGenerator, Pipeline,
};
use pps_schema::GateStatus;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const REPLY: &str = "Here is the result.\n```yaml\nprompt_result:\n  meta:\n    prompt_id: APP/01_mvp-cutter\n    run_id: RUN-BASE\n  gate_result:\n    gate_id: GATE_1_MVP_BOUNDED\n    status: pass\n  appendices_updates: {}\n  state_updates: {}\n```\n";

struct Captured {
    head: String,
    body: Value,
}

/// Serve one request with `status` and `body`, handing back what was sent
async fn serve_once(status: &'static str, body: Value) -> (SocketAddr, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head, body_start) = loop {
            let n = stream.read(&mut chunk).await.expect("read");
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(at) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&buf[..at]).to_lowercase(), at + 4);
            }
        };
        let length: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map_or(0, |v| v.trim().parse().expect("length"));
        while buf.len() < body_start + length {
            let n = stream.read(&mut chunk).await.expect("read body");
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let request: Value = serde_json::from_slice(&buf[body_start..body_start + length])
            .expect("json body");

        let payload = body.to_string();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
            payload.len()
        );
        stream.write_all(response.as_bytes()).await.expect("write");
        stream.shutdown().await.ok();

        Captured {
            head,
            body: request,
        }
    });

    (addr, handle)
}

fn generator(addr: SocketAddr) -> ModelGenerator {
    ModelGenerator::new(
        ModelConfig::new("test-key")
            .with_model("test-model")
            .with_max_tokens(512)
            .with_temperature(0.0)
            .with_endpoint(format!("http://{addr}/v1/messages")),
    )
}

#[tokio::test]
async fn reply_text_becomes_the_result() {
    let (addr, server) = serve_once(
        "200 OK",
        json!({"content": [{"type": "text", "text": REPLY}]}),
    )
    .await;
    let envelope = pps_test_utils::step_envelope("APP/01_mvp-cutter", "RUN-BASE");

    let result = generator(addr)
        .generate(&envelope, "Cut the MVP.\n{envelope}")
        .await
        .unwrap();
    let captured = server.await.unwrap();

    assert_eq!(result.meta.unwrap().prompt_id, "APP/01_mvp-cutter");
    assert_eq!(result.gate_result.unwrap().status, GateStatus::Pass);

    assert!(captured.head.starts_with("post /v1/messages"));
    assert!(captured.head.contains("x-api-key: test-key"));
    assert!(captured.head.contains("anthropic-version: 2023-06-01"));
    assert_eq!(captured.body["model"], "test-model");
    assert_eq!(captured.body["max_tokens"], 512);
    assert_eq!(captured.body["messages"][0]["role"], "user");
    let prompt = captured.body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Cut the MVP.\n"));
    assert!(prompt.contains("run_id: RUN-BASE"));
}

#[tokio::test]
async fn http_error_is_a_backend_failure() {
    let (addr, server) = serve_once(
        "401 Unauthorized",
        json!({"error": {"type": "authentication_error"}}),
    )
    .await;
    let envelope = pps_test_utils::step_envelope("APP/01_mvp-cutter", "RUN-BASE");

    let err = generator(addr).generate(&envelope, "{envelope}").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, GenerationError::Backend { ref prompt_id, .. } if prompt_id == "APP/01_mvp-cutter"));
}

#[tokio::test]
async fn reply_without_text_is_rejected() {
    let (addr, server) = serve_once("200 OK", json!({"content": []})).await;
    let envelope = pps_test_utils::step_envelope("APP/01_mvp-cutter", "RUN-BASE");

    let err = generator(addr).generate(&envelope, "{envelope}").await.unwrap_err();
    server.await.unwrap();

    assert!(err.to_string().contains("no text content"));
}

#[tokio::test]
async fn pipeline_step_merges_the_model_reply() {
    let (addr, server) = serve_once(
        "200 OK",
        json!({"content": [{"type": "text", "text": REPLY}]}),
    )
    .await;
    let base = pps_test_utils::step_envelope("APP/01_mvp-cutter", "RUN-BASE");

    let pipeline = Pipeline::new(MergeEngine::default(), Arc::new(generator(addr)))
        .with_steps(["APP/01_mvp-cutter"]);
    let report = pipeline.run(&base).await;
    server.await.unwrap();

    assert!(report.is_success(), "{:?}", report.failure);
    assert_eq!(report.state.applied_index.len(), 1);
    let summary = report.steps[0].summary.as_ref().unwrap();
    assert_eq!(summary.gates_passed, vec!["GATE_1_MVP_BOUNDED"]);
}
