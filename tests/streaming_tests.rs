//! Integration tests for streaming generation at the model level.
//!
//! Drives [`GenerativeModel::generate_content_stream`] through a scripted
//! transport: cumulative snapshots, final aggregation, merge-by-index,
//! malformed bodies, and cooperative cancellation.

mod common;

use common::*;
use futures_util::StreamExt;
use genai_stream::{
    CancellationToken, Client, Framing, GenaiError, GenerativeModel, RequestOptions,
};
use std::time::Duration;

fn model(transport: std::sync::Arc<MockTransport>) -> GenerativeModel {
    Client::with_transport(transport).generative_model("gemini-2.0-flash")
}

#[tokio::test]
async fn test_stream_yields_cumulative_snapshots() {
    let transport = MockTransport::new();
    transport.push(Behavior::StreamBody {
        body: sse_body(&[text_chunk("Once"), text_chunk(" upon"), text_chunk(" a time")]),
        framing: Framing::Sse,
    });

    let mut stream = model(transport)
        .generate_content_stream("Tell me a story")
        .await
        .unwrap();

    let mut partials = Vec::new();
    while let Some(snapshot) = stream.next().await {
        partials.push(snapshot.unwrap().text().unwrap());
    }
    assert_eq!(partials, ["Once", "Once upon", "Once upon a time"]);
}

#[tokio::test]
async fn test_aggregate_without_consuming_partials() {
    let transport = MockTransport::new();
    transport.push(Behavior::StreamBody {
        body: sse_body(&[text_chunk("Hel"), text_chunk("lo")]),
        framing: Framing::Sse,
    });

    let stream = model(transport)
        .generate_content_stream("hi")
        .await
        .unwrap();
    let sealed = stream.aggregate().await.unwrap();
    assert_eq!(sealed.text().unwrap(), "Hello");
}

#[tokio::test]
async fn test_aggregate_after_partial_consumption_sees_everything() {
    let transport = MockTransport::new();
    transport.push(Behavior::StreamBody {
        body: sse_body(&[text_chunk("a"), text_chunk("b"), text_chunk("c")]),
        framing: Framing::Sse,
    });

    let mut stream = model(transport)
        .generate_content_stream("abc")
        .await
        .unwrap();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.text().unwrap(), "a");

    let sealed = stream.aggregate().await.unwrap();
    assert_eq!(sealed.text().unwrap(), "abc");
}

#[tokio::test]
async fn test_multiple_candidates_merge_by_index() {
    let transport = MockTransport::new();
    // Candidate 1 appears before candidate 0; deltas for each interleave.
    transport.push(Behavior::StreamBody {
        body: sse_body(&[
            indexed_text_chunk(1, "second "),
            indexed_text_chunk(0, "first "),
            indexed_text_chunk(1, "answer"),
            indexed_text_chunk(0, "answer"),
        ]),
        framing: Framing::Sse,
    });

    let sealed = model(transport)
        .generate_content_stream("two answers")
        .await
        .unwrap()
        .aggregate()
        .await
        .unwrap();

    // Sealed candidates come back sorted by index.
    assert_eq!(sealed.candidates.len(), 2);
    assert_eq!(sealed.candidates[0].index, 0);
    assert_eq!(sealed.candidates[0].content.text().unwrap(), "first answer");
    assert_eq!(sealed.candidates[1].index, 1);
    assert_eq!(sealed.candidates[1].content.text().unwrap(), "second answer");
}

#[tokio::test]
async fn test_chunks_split_mid_utf8_reassemble() {
    let transport = MockTransport::new();
    let (behavior, feeder) = sse_stream();
    transport.push(behavior);

    let event = sse_event(&text_chunk("héllo 世界"));
    // Split inside the é (a two-byte sequence) somewhere past "data: {".
    let cut = event
        .iter()
        .position(|&b| b >= 0x80)
        .expect("multi-byte text present")
        + 1;
    feeder.send_bytes(event.slice(..cut));
    feeder.send_bytes(event.slice(cut..));
    feeder.close();

    let sealed = model(transport)
        .generate_content_stream("unicode")
        .await
        .unwrap()
        .aggregate()
        .await
        .unwrap();
    assert_eq!(sealed.text().unwrap(), "héllo 世界");
}

#[tokio::test]
async fn test_truncated_body_surfaces_parse_error() {
    // JSON-stream framing: an object cut off mid-way, then EOF.
    let transport = MockTransport::new();
    transport.push(Behavior::StreamBody {
        body: bytes::Bytes::from_static(b"[{\"candidates\": [{\"ind"),
        framing: Framing::JsonStream,
    });

    let result = model(transport)
        .generate_content_stream("truncate me")
        .await
        .unwrap()
        .aggregate()
        .await;

    match result {
        Err(GenaiError::Parse { unconsumed, .. }) => {
            assert!(unconsumed.contains("candidates"));
        }
        other => panic!("expected a framing error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_ends_stream_and_aborts_aggregate() {
    let transport = MockTransport::new();
    let (behavior, feeder) = sse_stream();
    transport.push(behavior);

    let token = CancellationToken::new();
    let mut stream = model(transport)
        .generate_content_stream_with_options(
            "never finishes",
            RequestOptions::default().with_cancellation(token.clone()),
        )
        .await
        .unwrap();

    feeder.send_chunk(&text_chunk("partial"));
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.text().unwrap(), "partial");

    token.cancel();
    // The snapshot sequence ends without an error value.
    assert!(stream.next().await.is_none());

    let result = stream.aggregate().await;
    assert!(matches!(
        result,
        Err(GenaiError::Aborted {
            user_entry_committed: false
        })
    ));
    drop(feeder);
}

#[tokio::test]
async fn test_blocked_first_chunk_surfaces_through_text() {
    let transport = MockTransport::new();
    transport.push(Behavior::StreamBody {
        body: sse_body(&[blocked_response()]),
        framing: Framing::Sse,
    });

    let sealed = model(transport)
        .generate_content_stream("disallowed")
        .await
        .unwrap()
        .aggregate()
        .await
        .unwrap();

    assert!(sealed.is_blocked());
    assert!(matches!(
        sealed.text(),
        Err(GenaiError::Blocked { reason: Some(_) })
    ));
}

#[tokio::test]
async fn test_refused_stream_fails_to_open() {
    let transport = MockTransport::new();
    transport.push(Behavior::StreamRefused(GenaiError::Api {
        status_code: 429,
        message: "quota".to_string(),
        request_id: None,
    }));

    let result = model(transport).generate_content_stream("hi").await;
    match result {
        Err(error @ GenaiError::Api { .. }) => assert!(error.is_retryable()),
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_content_resolves_complete_response() {
    let transport = MockTransport::new();
    transport.push(Behavior::Unary {
        response: Ok(full_response("complete")),
        gate: None,
    });

    let response = model(transport.clone()).generate_content("hi").await.unwrap();
    assert_eq!(response.text().unwrap(), "complete");

    let requests = transport.requests();
    assert_eq!(requests[0].model, "gemini-2.0-flash");
}

#[tokio::test(start_paused = true)]
async fn test_generate_content_timeout_maps_to_timeout_error() {
    let transport = MockTransport::new();
    // Gate never opens; the call can only end by deadline.
    let (_held_gate, gate_rx) = tokio::sync::oneshot::channel::<()>();
    transport.push(Behavior::Unary {
        response: Ok(full_response("too late")),
        gate: Some(gate_rx),
    });

    let result = model(transport)
        .generate_content_with_options(
            "hi",
            RequestOptions::default().with_timeout(Duration::from_secs(5)),
        )
        .await;

    assert!(matches!(result, Err(GenaiError::Timeout(_))));
}
