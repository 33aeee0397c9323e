use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use streamfold::stream::format_sse_frame;
use streamfold::{IterEventSource, RawEvent, SseEventSource, StreamSession};

fn text_capture(deltas: usize) -> Vec<(String, String)> {
    let mut events = vec![
        (
            "message_start".to_string(),
            json!({"type": "message_start", "message": {
                "id": "msg_bench", "type": "message", "role": "assistant",
                "content": [], "usage": {"input_tokens": 512, "output_tokens": 1}
            }})
            .to_string(),
        ),
        (
            "content_block_start".to_string(),
            json!({"type": "content_block_start", "index": 0,
                   "content_block": {"type": "text", "text": ""}})
            .to_string(),
        ),
    ];
    for i in 0..deltas {
        events.push((
            "content_block_delta".to_string(),
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "text_delta", "text": format!("token {i} ")}})
            .to_string(),
        ));
    }
    events.push((
        "content_block_stop".to_string(),
        json!({"type": "content_block_stop", "index": 0}).to_string(),
    ));
    events
}

fn tool_capture(fragments: usize) -> Vec<(String, String)> {
    let mut events = vec![(
        "content_block_start".to_string(),
        json!({"type": "content_block_start", "index": 0,
               "content_block": {"type": "tool_use", "id": "toolu_bench",
                                 "name": "write_file", "input": {}}})
        .to_string(),
    )];
    events.push((
        "content_block_delta".to_string(),
        json!({"type": "content_block_delta", "index": 0,
               "delta": {"type": "input_json_delta", "partial_json": "{\"content\":\""}})
        .to_string(),
    ));
    for _ in 0..fragments {
        events.push((
            "content_block_delta".to_string(),
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "input_json_delta", "partial_json": "lorem ipsum dolor "}})
            .to_string(),
        ));
    }
    events.push((
        "content_block_delta".to_string(),
        json!({"type": "content_block_delta", "index": 0,
               "delta": {"type": "input_json_delta", "partial_json": "\"}"}})
        .to_string(),
    ));
    events.push((
        "content_block_stop".to_string(),
        json!({"type": "content_block_stop", "index": 0}).to_string(),
    ));
    events
}

fn finish(events: &mut Vec<(String, String)>) {
    events.push((
        "message_delta".to_string(),
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"},
               "usage": {"output_tokens": 300}})
        .to_string(),
    ));
    events.push((
        "message_stop".to_string(),
        json!({"type": "message_stop"}).to_string(),
    ));
}

fn to_sse(events: &[(String, String)]) -> Vec<u8> {
    events
        .iter()
        .map(|(name, json)| format_sse_frame(name, json))
        .collect::<String>()
        .into_bytes()
}

fn to_raw(events: &[(String, String)]) -> Vec<RawEvent> {
    events
        .iter()
        .map(|(name, json)| RawEvent::new(name.clone(), json.clone()))
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut text = text_capture(300);
    finish(&mut text);
    let text_sse = to_sse(&text);
    let text_raw = to_raw(&text);

    c.bench_function("decode_text_300_deltas_sse", |b| {
        b.iter(|| {
            let session = StreamSession::new(SseEventSource::new(Cursor::new(&text_sse[..])));
            black_box(session.filter_map(Result::ok).count())
        });
    });

    c.bench_function("decode_text_300_deltas_events", |b| {
        b.iter(|| {
            let source = IterEventSource::from_events(text_raw.clone());
            black_box(StreamSession::new(source).filter_map(Result::ok).count())
        });
    });

    let mut tool = tool_capture(2_000);
    finish(&mut tool);
    let tool_sse = to_sse(&tool);

    c.bench_function("decode_tool_call_2000_fragments_sse", |b| {
        b.iter(|| {
            let session = StreamSession::new(SseEventSource::new(Cursor::new(&tool_sse[..])));
            black_box(session.filter_map(Result::ok).count())
        });
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
