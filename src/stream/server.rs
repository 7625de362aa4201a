// convo_kit — Sticky-scroll and streaming reveal engines for chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Backend half of a streamed response: runs the model until the assistant
//! has nothing more to say, executing tool calls in between, and writes every
//! message to the body as it appears.

use super::frame::{FrameWriter, StreamedItem};
use crate::error::GenerationError;
use crate::model::{ChatMessage, ContentPart, ToolCall, ToolResponse, TypingState, typing_state};
use async_trait::async_trait;
use futures::StreamExt;
use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWrite;

/// Upper bound on model calls per response.
pub const MAX_GENERATIONS: usize = 5;
/// Substituted when a generation yields no messages at all.
pub const EMPTY_GENERATION_TEXT: &str = "Did not write anything";
pub const MODEL_ERROR_TEXT: &str = "AI is not responding";
pub const CANCELLED_TEXT: &str = "Cancelled";
pub const TOOL_ERROR_TEXT: &str = "Tool call failed";
pub const BUSY_TEXT: &str = "A response is already being generated";

/// A message with its storage identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedMessage<D> {
    pub key: String,
    pub msg: ChatMessage,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message_data: D,
}

impl<D> CommittedMessage<D> {
    /// Fresh message with a random key, stamped now.
    pub fn new(msg: ChatMessage, message_data: D) -> Self {
        Self { key: uuid::Uuid::new_v4().to_string(), msg, timestamp: now_millis(), message_data }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as i64)
}

/// One model call: the messages it yields, and its final cost once done.
pub struct Generation {
    pub output: LocalBoxStream<'static, ChatMessage>,
    pub completion: LocalBoxFuture<'static, Result<f64, GenerationError>>,
}

#[async_trait(?Send)]
pub trait LanguageModel<D> {
    async fn generate(&self, inputs: &[CommittedMessage<D>]) -> Result<Generation, GenerationError>;
}

pub struct ToolOutput {
    pub result: serde_json::Value,
    pub additional_parts: Vec<ContentPart>,
    pub cost: f64,
}

#[async_trait(?Send)]
pub trait ToolRunner<D> {
    async fn run_tool(
        &self,
        messages: &[CommittedMessage<D>],
        call: &ToolCall,
    ) -> Result<ToolOutput, GenerationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Cancelled,
}

#[async_trait(?Send)]
pub trait CommitStore<D> {
    async fn commit(
        &self,
        committed: &[CommittedMessage<D>],
        new_messages: &[CommittedMessage<D>],
        added_cost: f64,
    ) -> CommitOutcome;
}

/// How a response ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Done { generations: usize },
    ModelFailed,
    ToolFailed(GenerationError),
    Cancelled,
    Busy,
}

/// Per-process bookkeeping shared by every response: which conversations
/// have a generation in flight, and the gate that serializes commits.
#[derive(Default)]
pub struct StreamCoordinator {
    active: RefCell<HashSet<String>>,
    commit_gate: tokio::sync::Mutex<()>,
}

/// Held while a conversation is generating; releases on drop.
pub struct GenerationGuard<'a> {
    coordinator: &'a StreamCoordinator,
    conversation: String,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.active.borrow_mut().remove(&self.conversation);
    }
}

impl StreamCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, conversation: &str) -> Option<GenerationGuard<'_>> {
        if !self.active.borrow_mut().insert(conversation.to_owned()) {
            return None;
        }
        Some(GenerationGuard { coordinator: self, conversation: conversation.to_owned() })
    }

    pub fn is_active(&self, conversation: &str) -> bool {
        self.active.borrow().contains(conversation)
    }
}

/// Inputs describing one response.
pub struct StreamRequest<'a, D> {
    pub conversation_id: &'a str,
    /// Opaque first frame.
    pub header: &'a str,
    /// Messages already in storage, oldest first.
    pub committed: Vec<CommittedMessage<D>>,
    /// Attached to every message produced by this response.
    pub message_data: D,
    /// Tools whose results the assistant should comment on.
    pub type_after_tools: &'a [&'a str],
}

/// Frame sink that survives a disconnected peer: once a write fails the rest
/// are skipped, but generation and commits carry on.
struct ItemSink<W> {
    frames: FrameWriter<W>,
    broken: bool,
}

impl<W: AsyncWrite + Unpin> ItemSink<W> {
    async fn header(&mut self, header: &str) {
        if self.broken {
            return;
        }
        if let Err(err) = self.frames.write_header(header).await {
            self.disconnect(&err);
        }
    }

    async fn send<D: Serialize>(&mut self, item: &StreamedItem<D>) {
        if self.broken {
            return;
        }
        if let Err(err) = self.frames.write_item(item).await {
            self.disconnect(&err);
        }
    }

    async fn message<D: Serialize + Clone>(&mut self, entry: &CommittedMessage<D>, committed: bool) {
        self.send(&StreamedItem::Msg {
            key: entry.key.clone(),
            msg: entry.msg.clone(),
            timestamp: entry.timestamp,
            committed,
            message_data: entry.message_data.clone(),
        })
        .await;
    }

    async fn error(&mut self, text: &str) {
        self.send::<()>(&StreamedItem::Error { error: text.to_owned() }).await;
        self.close().await;
    }

    async fn done(&mut self) {
        self.send::<()>(&StreamedItem::Done).await;
        self.close().await;
    }

    async fn close(&mut self) {
        if !self.broken {
            let _ = self.frames.shutdown().await;
        }
    }

    fn disconnect(&mut self, err: &crate::error::StreamError) {
        tracing::warn!(%err, "stream peer went away; continuing without output");
        self.broken = true;
    }
}

/// Stream a full assistant response into `writer`.
///
/// Writes the header, replays the committed history, then alternates model
/// generations and tool executions while the assistant is expected to type,
/// committing after every generation. Ends with a `done` frame, or an
/// `error` frame when the model fails, a tool fails, or a commit is
/// cancelled.
pub async fn generate_and_stream<W, D, M, T, C>(
    writer: W,
    request: StreamRequest<'_, D>,
    model: &M,
    tools: &T,
    store: &C,
    coordinator: &StreamCoordinator,
) -> StreamOutcome
where
    W: AsyncWrite + Unpin,
    D: Serialize + Clone,
    M: LanguageModel<D> + ?Sized,
    T: ToolRunner<D> + ?Sized,
    C: CommitStore<D> + ?Sized,
{
    let StreamRequest { conversation_id, header, committed, message_data, type_after_tools } =
        request;
    let mut sink = ItemSink { frames: FrameWriter::new(writer), broken: false };
    sink.header(header).await;

    let Some(_guard) = coordinator.try_begin(conversation_id) else {
        tracing::warn!(conversation_id, "generation already running");
        sink.error(BUSY_TEXT).await;
        return StreamOutcome::Busy;
    };

    let mut committed = committed;
    for entry in &committed {
        sink.message(entry, true).await;
    }

    let mut generations = 0;
    loop {
        let history: Vec<ChatMessage> = committed.iter().map(|c| c.msg.clone()).collect();
        if typing_state(&history, type_after_tools) != TypingState::Typing {
            break;
        }
        if generations == MAX_GENERATIONS {
            tracing::info!(conversation_id, generations, "generation limit reached");
            break;
        }
        generations += 1;

        let Generation { mut output, completion } = match model.generate(&committed).await {
            Ok(generation) => generation,
            Err(err) => {
                tracing::warn!(%err, "model call failed");
                sink.error(MODEL_ERROR_TEXT).await;
                return StreamOutcome::ModelFailed;
            }
        };

        let mut new_messages: Vec<CommittedMessage<D>> = Vec::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        while let Some(msg) = output.next().await {
            if let ChatMessage::ToolCall { tool_call } = &msg {
                calls.push(tool_call.clone());
            }
            let entry = CommittedMessage::new(msg, message_data.clone());
            sink.message(&entry, false).await;
            new_messages.push(entry);
        }
        if new_messages.is_empty() {
            let entry =
                CommittedMessage::new(ChatMessage::assistant(EMPTY_GENERATION_TEXT), message_data.clone());
            sink.message(&entry, false).await;
            new_messages.push(entry);
        }

        let mut cost = match completion.await {
            Ok(cost) => cost,
            Err(err) => {
                tracing::warn!(%err, "model generation failed");
                sink.error(MODEL_ERROR_TEXT).await;
                return StreamOutcome::ModelFailed;
            }
        };

        for call in &calls {
            let context: Vec<CommittedMessage<D>> =
                committed.iter().chain(new_messages.iter()).cloned().collect();
            let output = match tools.run_tool(&context, call).await {
                Ok(output) => output,
                Err(err) => {
                    tracing::warn!(%err, tool = %call.function.name, "tool call failed");
                    sink.error(TOOL_ERROR_TEXT).await;
                    return StreamOutcome::ToolFailed(err);
                }
            };
            cost += output.cost;
            let response = ChatMessage::ToolResponse(ToolResponse {
                name: call.function.name.clone(),
                content: output.result,
                additional_parts: output.additional_parts,
                tool_call_id: call.tool_call_id.clone(),
            });
            let entry = CommittedMessage::new(response, message_data.clone());
            sink.message(&entry, false).await;
            new_messages.push(entry);
        }

        let outcome = {
            let _gate = coordinator.commit_gate.lock().await;
            store.commit(&committed, &new_messages, cost).await
        };
        if outcome == CommitOutcome::Cancelled {
            tracing::info!(conversation_id, "commit cancelled");
            sink.error(CANCELLED_TEXT).await;
            return StreamOutcome::Cancelled;
        }
        committed.extend(new_messages);
    }

    tracing::info!(conversation_id, generations, "response complete");
    sink.done().await;
    StreamOutcome::Done { generations }
}

struct NoTools;

#[async_trait(?Send)]
impl<D> ToolRunner<D> for NoTools {
    async fn run_tool(
        &self,
        _messages: &[CommittedMessage<D>],
        call: &ToolCall,
    ) -> Result<ToolOutput, GenerationError> {
        Err(GenerationError::Tool {
            name: call.function.name.clone(),
            message: "no tools are available".to_owned(),
        })
    }
}

/// [`generate_and_stream`] for models without tools. Any tool call the model
/// emits ends the response with an error frame.
pub async fn generate_and_stream_without_tools<W, D, M, C>(
    writer: W,
    request: StreamRequest<'_, D>,
    model: &M,
    store: &C,
    coordinator: &StreamCoordinator,
) -> StreamOutcome
where
    W: AsyncWrite + Unpin,
    D: Serialize + Clone,
    M: LanguageModel<D> + ?Sized,
    C: CommitStore<D> + ?Sized,
{
    let request = StreamRequest { type_after_tools: &[], ..request };
    generate_and_stream(writer, request, model, &NoTools, store, coordinator).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::client::read_streaming_body;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct ScriptedModel {
        rounds: RefCell<VecDeque<Result<Vec<ChatMessage>, ()>>>,
        calls: Cell<usize>,
    }

    impl ScriptedModel {
        fn new(rounds: Vec<Result<Vec<ChatMessage>, ()>>) -> Self {
            Self { rounds: RefCell::new(rounds.into()), calls: Cell::new(0) }
        }

        fn repeating(round: Vec<ChatMessage>, times: usize) -> Self {
            Self::new((0..times).map(|_| Ok(round.clone())).collect())
        }
    }

    #[async_trait(?Send)]
    impl LanguageModel<u32> for ScriptedModel {
        async fn generate(&self, _inputs: &[CommittedMessage<u32>]) -> Result<Generation, GenerationError> {
            self.calls.set(self.calls.get() + 1);
            let round = self.rounds.borrow_mut().pop_front().unwrap_or(Ok(Vec::new()));
            match round {
                Ok(messages) => Ok(Generation {
                    output: futures::stream::iter(messages).boxed_local(),
                    completion: async { Ok(0.5) }.boxed_local(),
                }),
                Err(()) => Ok(Generation {
                    output: futures::stream::empty().boxed_local(),
                    completion: async { Err(GenerationError::Model("boom".to_owned())) }.boxed_local(),
                }),
            }
        }
    }

    struct EchoTool;

    #[async_trait(?Send)]
    impl ToolRunner<u32> for EchoTool {
        async fn run_tool(
            &self,
            _messages: &[CommittedMessage<u32>],
            call: &ToolCall,
        ) -> Result<ToolOutput, GenerationError> {
            Ok(ToolOutput {
                result: serde_json::json!({ "echo": call.function.name }),
                additional_parts: Vec::new(),
                cost: 0.25,
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        commits: RefCell<Vec<(usize, Vec<ChatMessage>, f64)>>,
        cancel: bool,
    }

    #[async_trait(?Send)]
    impl CommitStore<u32> for MemoryStore {
        async fn commit(
            &self,
            committed: &[CommittedMessage<u32>],
            new_messages: &[CommittedMessage<u32>],
            added_cost: f64,
        ) -> CommitOutcome {
            self.commits.borrow_mut().push((
                committed.len(),
                new_messages.iter().map(|m| m.msg.clone()).collect(),
                added_cost,
            ));
            if self.cancel { CommitOutcome::Cancelled } else { CommitOutcome::Committed }
        }
    }

    fn history(messages: Vec<ChatMessage>) -> Vec<CommittedMessage<u32>> {
        messages.into_iter().map(|m| CommittedMessage::new(m, 1)).collect()
    }

    fn request<'a>(committed: Vec<CommittedMessage<u32>>, after: &'a [&'a str]) -> StreamRequest<'a, u32> {
        StreamRequest {
            conversation_id: "conv",
            header: "hdr",
            committed,
            message_data: 7,
            type_after_tools: after,
        }
    }

    async fn decode(buf: &[u8]) -> (String, Vec<StreamedItem<u32>>) {
        let mut body = read_streaming_body::<_, u32>(buf).await.unwrap();
        let mut items = Vec::new();
        while let Some(item) = body.next_item().await.unwrap() {
            items.push(item);
        }
        (body.header().to_owned(), items)
    }

    fn summarize(items: &[StreamedItem<u32>]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                StreamedItem::Msg { msg, committed, .. } => {
                    let tag = if *committed { "c" } else { "n" };
                    match msg {
                        ChatMessage::Assistant { content } => format!("{tag}:assistant:{content}"),
                        ChatMessage::User { .. } => format!("{tag}:user"),
                        ChatMessage::ToolCall { tool_call } => {
                            format!("{tag}:call:{}", tool_call.function.name)
                        }
                        ChatMessage::ToolResponse(r) => format!("{tag}:response:{}", r.name),
                        ChatMessage::System { .. } => format!("{tag}:system"),
                    }
                }
                StreamedItem::Done => "done".to_owned(),
                StreamedItem::Error { error } => format!("error:{error}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn streams_history_then_reply_then_done() {
        let model = ScriptedModel::new(vec![Ok(vec![
            ChatMessage::assistant("Hel"),
            ChatMessage::assistant("lo"),
        ])]);
        let store = MemoryStore::default();
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &store,
            &StreamCoordinator::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Done { generations: 1 });
        let (header, items) = decode(&buf).await;
        assert_eq!(header, "hdr");
        assert_eq!(summarize(&items), vec!["c:user", "n:assistant:Hel", "n:assistant:lo", "done"]);
        let commits = store.commits.borrow();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].0, 1);
        assert_eq!(commits[0].1.len(), 2);
        assert!((commits[0].2 - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn new_messages_carry_request_data_and_fresh_keys() {
        let model = ScriptedModel::new(vec![Ok(vec![ChatMessage::assistant("a"), ChatMessage::assistant("b")])]);
        let mut buf = Vec::new();
        generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &MemoryStore::default(),
            &StreamCoordinator::new(),
        )
        .await;
        let (_, items) = decode(&buf).await;
        let fresh: Vec<(&String, u32)> = items
            .iter()
            .filter_map(|item| match item {
                StreamedItem::Msg { key, committed: false, message_data, .. } => Some((key, *message_data)),
                _ => None,
            })
            .collect();
        assert_eq!(fresh.len(), 2);
        assert_ne!(fresh[0].0, fresh[1].0);
        assert!(fresh.iter().all(|(_, data)| *data == 7));
    }

    #[tokio::test]
    async fn empty_generation_gets_placeholder() {
        let model = ScriptedModel::new(vec![Ok(Vec::new())]);
        let mut buf = Vec::new();
        generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &MemoryStore::default(),
            &StreamCoordinator::new(),
        )
        .await;
        let (_, items) = decode(&buf).await;
        assert_eq!(summarize(&items), vec!["c:user", "n:assistant:Did not write anything", "done"]);
    }

    #[tokio::test]
    async fn model_failure_emits_error_without_commit() {
        let model = ScriptedModel::new(vec![Err(())]);
        let store = MemoryStore::default();
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &store,
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::ModelFailed);
        let (_, items) = decode(&buf).await;
        assert_eq!(items.last(), Some(&StreamedItem::Error { error: "AI is not responding".to_owned() }));
        assert!(store.commits.borrow().is_empty());
    }

    #[tokio::test]
    async fn tool_round_then_commentary() {
        let model = ScriptedModel::new(vec![
            Ok(vec![ChatMessage::ToolCall { tool_call: ToolCall::new("t1", "search") }]),
            Ok(vec![ChatMessage::assistant("found it")]),
        ]);
        let store = MemoryStore::default();
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("find")]), &["search"]),
            &model,
            &EchoTool,
            &store,
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Done { generations: 2 });
        let (_, items) = decode(&buf).await;
        assert_eq!(
            summarize(&items),
            vec!["c:user", "n:call:search", "n:response:search", "n:assistant:found it", "done"]
        );
        let commits = store.commits.borrow();
        assert_eq!(commits.len(), 2);
        // tool cost is added to the generation cost
        assert!((commits[0].2 - 0.75).abs() < f64::EPSILON);
        assert_eq!(commits[1].0, 3);
    }

    #[tokio::test]
    async fn generations_are_capped() {
        let call = ChatMessage::ToolCall { tool_call: ToolCall::new("t", "search") };
        let model = ScriptedModel::repeating(vec![call], 10);
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("loop")]), &["search"]),
            &model,
            &EchoTool,
            &MemoryStore::default(),
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Done { generations: MAX_GENERATIONS });
        assert_eq!(model.calls.get(), MAX_GENERATIONS);
    }

    #[tokio::test]
    async fn cancelled_commit_ends_with_error() {
        let model = ScriptedModel::new(vec![Ok(vec![ChatMessage::assistant("x")])]);
        let store = MemoryStore { cancel: true, ..MemoryStore::default() };
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &store,
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Cancelled);
        let (_, items) = decode(&buf).await;
        assert_eq!(items.last(), Some(&StreamedItem::Error { error: "Cancelled".to_owned() }));
    }

    #[tokio::test]
    async fn idle_conversation_only_replays_history() {
        let model = ScriptedModel::new(Vec::new());
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi"), ChatMessage::assistant("hello")]), &[]),
            &model,
            &EchoTool,
            &MemoryStore::default(),
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Done { generations: 0 });
        assert_eq!(model.calls.get(), 0);
    }

    #[tokio::test]
    async fn second_generation_for_same_conversation_is_refused() {
        let coordinator = StreamCoordinator::new();
        let _held = coordinator.try_begin("conv").unwrap();
        let model = ScriptedModel::new(vec![Ok(vec![ChatMessage::assistant("x")])]);
        let mut buf = Vec::new();
        let outcome = generate_and_stream(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &MemoryStore::default(),
            &coordinator,
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Busy);
        assert_eq!(model.calls.get(), 0);
        let (_, items) = decode(&buf).await;
        assert_eq!(summarize(&items), vec![format!("error:{BUSY_TEXT}")]);
    }

    #[tokio::test]
    async fn guard_releases_conversation() {
        let coordinator = StreamCoordinator::new();
        {
            let _guard = coordinator.try_begin("a").unwrap();
            assert!(coordinator.is_active("a"));
            assert!(coordinator.try_begin("a").is_none());
            assert!(coordinator.try_begin("b").is_some());
        }
        assert!(!coordinator.is_active("a"));
    }

    #[tokio::test]
    async fn toolless_variant_rejects_tool_calls() {
        let model = ScriptedModel::new(vec![Ok(vec![ChatMessage::ToolCall {
            tool_call: ToolCall::new("t", "search"),
        }])]);
        let store = MemoryStore::default();
        let mut buf = Vec::new();
        let outcome = generate_and_stream_without_tools(
            &mut buf,
            request(history(vec![ChatMessage::user_text("hi")]), &["search"]),
            &model,
            &store,
            &StreamCoordinator::new(),
        )
        .await;
        assert!(matches!(outcome, StreamOutcome::ToolFailed(GenerationError::Tool { .. })));
        assert!(store.commits.borrow().is_empty());
    }

    #[tokio::test]
    async fn disconnected_peer_still_commits() {
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);
        let model = ScriptedModel::new(vec![Ok(vec![ChatMessage::assistant("still saved")])]);
        let store = MemoryStore::default();
        let outcome = generate_and_stream(
            writer,
            request(history(vec![ChatMessage::user_text("hi")]), &[]),
            &model,
            &EchoTool,
            &store,
            &StreamCoordinator::new(),
        )
        .await;
        assert_eq!(outcome, StreamOutcome::Done { generations: 1 });
        assert_eq!(store.commits.borrow().len(), 1);
    }
}
