//! Replay engine message sequences from `test-vectors/exchange.json`.
//!
//! Each case lists the messages an engine sends, in wire form, and the
//! response the accumulator must fold them into. Header pairs are written as
//! strings for readability and converted to byte arrays before decoding.

use mcp_bridge_core::{Exchange, HeaderPair, SendMessage};
use serde_json::Value;

/// Rewrite `headers: [["a","b"]]` into the byte-array form `HeaderPair` decodes from.
fn with_byte_headers(mut message: Value) -> Value {
    if let Some(headers) = message.get_mut("headers").and_then(Value::as_array_mut) {
        for pair in headers.iter_mut() {
            let converted: Vec<Value> = pair
                .as_array()
                .unwrap()
                .iter()
                .map(|s| Value::from(s.as_str().unwrap().as_bytes().to_vec()))
                .collect();
            *pair = Value::Array(converted);
        }
    }
    message
}

fn expected_headers(value: &Value) -> Vec<HeaderPair> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let arr = pair.as_array().unwrap();
            (
                arr[0].as_str().unwrap().as_bytes().to_vec(),
                arr[1].as_str().unwrap().as_bytes().to_vec(),
            )
        })
        .collect()
}

#[test]
fn exchange_test_vectors() {
    let raw = include_str!("../../test-vectors/exchange.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut exchange = Exchange::new(&b"request"[..]);

        for message in case["messages"].as_array().unwrap() {
            let message: SendMessage = serde_json::from_value(with_byte_headers(message.clone()))
                .unwrap_or_else(|e| panic!("{name}: cannot decode message: {e}"));
            exchange.send(message);
        }

        let expected = &case["expected"];
        let resp = exchange.into_response();
        assert_eq!(resp.status as u64, expected["status"].as_u64().unwrap(), "{name}: status");
        assert_eq!(resp.headers, expected_headers(&expected["headers"]), "{name}: headers");
        assert_eq!(
            resp.body,
            expected["body"].as_str().unwrap().as_bytes(),
            "{name}: body"
        );
    }
}

#[test]
fn receive_is_unaffected_by_sends() {
    let mut exchange = Exchange::new(&b"payload"[..]);
    let before = exchange.receive();
    exchange.send(SendMessage::body(&b"reply"[..]));
    let after = exchange.receive();
    assert_eq!(before, after);
    assert_eq!(after.body().as_ref(), b"payload");
}
