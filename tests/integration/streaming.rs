// =====
// TESTS: 4
// =====
//
// Backend loop and body reader running concurrently over an in-memory pipe.

use async_trait::async_trait;
use convo_kit::error::{GenerationError, StreamError};
use convo_kit::model::{ChatMessage, ToolCall, group_messages};
use convo_kit::reveal::{Pacing, RevealScheduler};
use convo_kit::stream::{
    CommitOutcome, CommitStore, CommittedMessage, FrameWriter, Generation, LanguageModel,
    MAX_FRAME_BYTES, StreamCoordinator, StreamOutcome, StreamRequest, StreamedItem, ToolOutput,
    ToolRunner, generate_and_stream, read_streaming_body,
};
use futures::{FutureExt, StreamExt};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

struct FragmentModel {
    fragments: Vec<&'static str>,
}

#[async_trait(?Send)]
impl LanguageModel<String> for FragmentModel {
    async fn generate(&self, _inputs: &[CommittedMessage<String>]) -> Result<Generation, GenerationError> {
        let messages: Vec<ChatMessage> = self.fragments.iter().map(|f| ChatMessage::assistant(*f)).collect();
        Ok(Generation {
            output: futures::stream::iter(messages)
                .then(|m| async move {
                    tokio::task::yield_now().await;
                    m
                })
                .boxed_local(),
            completion: async { Ok(0.0) }.boxed_local(),
        })
    }
}

struct NoopTools;

#[async_trait(?Send)]
impl ToolRunner<String> for NoopTools {
    async fn run_tool(
        &self,
        _messages: &[CommittedMessage<String>],
        call: &ToolCall,
    ) -> Result<ToolOutput, GenerationError> {
        Err(GenerationError::Tool { name: call.function.name.clone(), message: "unused".to_owned() })
    }
}

#[derive(Default)]
struct Store {
    committed: RefCell<Vec<ChatMessage>>,
}

#[async_trait(?Send)]
impl CommitStore<String> for Store {
    async fn commit(
        &self,
        _committed: &[CommittedMessage<String>],
        new_messages: &[CommittedMessage<String>],
        _added_cost: f64,
    ) -> CommitOutcome {
        self.committed.borrow_mut().extend(new_messages.iter().map(|m| m.msg.clone()));
        CommitOutcome::Committed
    }
}

#[tokio::test]
async fn reader_sees_fragments_while_they_are_generated() {
    // tiny pipe so writer and reader interleave
    let (writer, reader) = tokio::io::duplex(32);
    let model = FragmentModel { fragments: vec!["Stream", "ing ", "works", " fine."] };
    let store = Store::default();
    let coordinator = StreamCoordinator::new();
    let request = StreamRequest {
        conversation_id: "c1",
        header: "{\"conversation\":\"c1\"}",
        committed: vec![CommittedMessage::new(ChatMessage::user_text("go"), "u".to_owned())],
        message_data: "a".to_owned(),
        type_after_tools: &[],
    };

    let produce = generate_and_stream(writer, request, &model, &NoopTools, &store, &coordinator);
    let consume = async {
        let mut body = read_streaming_body::<_, String>(reader).await.unwrap();
        assert_eq!(body.header(), "{\"conversation\":\"c1\"}");
        let mut items = Vec::new();
        while let Some(item) = body.next_item().await.unwrap() {
            items.push(item);
        }
        items
    };
    let (outcome, items) = tokio::join!(produce, consume);

    assert_eq!(outcome, StreamOutcome::Done { generations: 1 });
    assert_eq!(items.last(), Some(&StreamedItem::Done));

    let messages: Vec<ChatMessage> = items
        .iter()
        .filter_map(|item| match item {
            StreamedItem::Msg { msg, .. } => Some(msg.clone()),
            _ => None,
        })
        .collect();
    let turns = group_messages(&messages);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].message, ChatMessage::assistant("Streaming works fine."));
    assert_eq!(store.committed.borrow().len(), 4);

    let tagged: Vec<(&str, bool)> = items
        .iter()
        .filter_map(|item| match item {
            StreamedItem::Msg { message_data, committed, .. } => Some((message_data.as_str(), *committed)),
            _ => None,
        })
        .collect();
    assert_eq!(tagged, vec![("u", true), ("a", false), ("a", false), ("a", false), ("a", false)]);
}

#[tokio::test]
async fn half_written_links_are_never_revealed() {
    let (writer, reader) = tokio::io::duplex(64);
    let model = FragmentModel { fragments: vec!["Read [the", " docs](https://exa", "mple.com) now."] };
    let store = Store::default();
    let coordinator = StreamCoordinator::new();
    let request = StreamRequest {
        conversation_id: "c2",
        header: "",
        committed: vec![CommittedMessage::new(ChatMessage::user_text("go"), String::new())],
        message_data: String::new(),
        type_after_tools: &[],
    };

    let produce = generate_and_stream(writer, request, &model, &NoopTools, &store, &coordinator);
    let consume = async {
        let mut body = read_streaming_body::<_, String>(reader).await.unwrap();
        let t0 = Instant::now();
        let mut reveal = RevealScheduler::new(Pacing::adaptive(Default::default()), t0);
        let mut text = String::new();
        let mut now = t0;
        let mut seen = Vec::new();
        while let Some(item) = body.next_item().await.unwrap() {
            if let StreamedItem::Msg { msg: ChatMessage::Assistant { content }, .. } = item {
                text.push_str(&content);
                now += Duration::from_millis(200);
                reveal.update(&text, true, now);
                for _ in 0..5 {
                    now += Duration::from_millis(16);
                    reveal.tick(now);
                    seen.push(reveal.visible_text().to_owned());
                }
            }
        }
        reveal.update(&text, false, now);
        reveal.fast_forward();
        seen.push(reveal.visible_text().to_owned());
        seen
    };
    let (_, seen) = tokio::join!(produce, consume);

    for shown in &seen {
        // a half-written link is never shown raw
        assert!(!shown.contains("](https://exa") || shown.contains("mple.com)"), "{shown}");
    }
    assert_eq!(seen.last().map(String::as_str), Some("Read [the docs](https://example.com) now."));
}

#[tokio::test]
async fn body_cut_mid_frame_is_truncated() {
    let mut raw = Vec::new();
    {
        let mut frames = FrameWriter::new(&mut raw);
        frames.write_header("h").await.unwrap();
        frames.write_item::<()>(&StreamedItem::Done).await.unwrap();
    }
    let cut = raw.len() - 2;
    raw.truncate(cut);

    let mut body = read_streaming_body::<_, serde_json::Value>(raw.as_slice()).await.unwrap();
    let err = body.next_item().await.unwrap_err();
    assert!(matches!(err, StreamError::Truncated { .. }), "{err}");
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let mut raw = Vec::new();
    let too_big = u32::try_from(MAX_FRAME_BYTES + 1).unwrap();
    raw.write_all(&too_big.to_be_bytes()).await.unwrap();
    raw.write_all(b"junk").await.unwrap();

    let Err(err) = read_streaming_body::<_, serde_json::Value>(raw.as_slice()).await else {
        panic!("oversized header frame accepted");
    };
    assert!(matches!(err, StreamError::FrameTooLarge { len, max } if len == MAX_FRAME_BYTES + 1 && max == MAX_FRAME_BYTES));
}
