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

//! Scripted conversation backend for the demo. Responses go through the real
//! streaming codec over an in-memory pipe, so the UI sees exactly what a
//! network client would.

use crate::error::{GenerationError, StreamError};
use crate::model::{
    ArgumentValue, ChatMessage, ContentPart, ParamType, ToolCall, ToolDefinition, validate_tool_call,
};
use crate::stream::{
    CommitOutcome, CommitStore, CommittedMessage, Generation, LanguageModel, StreamCoordinator,
    StreamRequest, StreamedItem, ToolOutput, ToolRunner, generate_and_stream, read_streaming_body,
};
use async_trait::async_trait;
use futures::{FutureExt as _, StreamExt as _};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const CONVERSATION_ID: &str = "demo";
const HEADER: &str = "convo-kit demo";
const PIPE_CAPACITY: usize = 64 * 1024;
const SEARCH_TOOL: &str = "search";
/// Never declared; calls to it get the fallback answer.
const LOOKUP_TOOL: &str = "lookup";
const TYPE_AFTER_TOOLS: &[&str] = &[SEARCH_TOOL, LOOKUP_TOOL];
pub const REJECTED_CALL_TEXT: &str = "That tool call could not be understood";

/// Messages from background response tasks to the UI loop.
#[derive(Debug)]
pub enum FeedEvent {
    Item(StreamedItem<()>),
    /// The body could not be read.
    Failed(String),
    /// The user stopped reading this response.
    Cancelled,
    /// The body ended.
    Closed,
}

const REPLIES: &[&str] = &[
    "Sure. A **sticky** transcript stays pinned to the newest line while text \
streams in, and lets go the moment you scroll up.\n\n\
- Wheel up or press `PageUp` to read history\n\
- Press `End` to jump back and re-pin\n\
- Drag with the mouse to select; the view holds still while you do\n\n\
Replies are revealed at a steady pace even when the network delivers them in bursts.",
    "Here is a longer answer so the body overflows.\n\n\
## Reveal pacing\n\n\
The adaptive pacer measures how fast chunks arrive and spreads each chunk \
over the expected gap until the next one. The fixed pacer reveals on a \
timer, speeding up when it falls behind.\n\n\
## Scrolling\n\n\
Growth while pinned is followed with a spring animation. Content that \
shrinks re-pins you if the bottom comes back into reach.\n\n\
```rust\nlet mut view = ChatView::new(&config, mode, pointer, false, now);\n```\n\n\
Links like [the ratatui docs](https://docs.rs/ratatui) only appear once complete.",
    "Short one this time.",
];

/// Streams canned markdown in small chunks, and calls `search` (or the
/// undeclared `lookup`) when the user asks for it.
pub struct ScriptedModel {
    chunk_chars: usize,
    chunk_delay: Duration,
    turn: Cell<usize>,
}

impl ScriptedModel {
    pub fn new(chunk_chars: usize, chunk_delay: Duration) -> Self {
        Self { chunk_chars: chunk_chars.max(1), chunk_delay, turn: Cell::new(0) }
    }

    fn reply(&self, inputs: &[CommittedMessage<()>]) -> String {
        if let Some(ChatMessage::ToolResponse(response)) = inputs.last().map(|m| &m.msg) {
            return format!(
                "The `{}` tool returned:\n\n> {}\n\nThat should cover it.",
                response.name, response.content
            );
        }
        let turn = self.turn.get();
        self.turn.set(turn + 1);
        REPLIES[turn % REPLIES.len()].to_owned()
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(self.chunk_chars).map(|c| c.iter().collect()).collect()
    }
}

fn user_text(msg: &ChatMessage) -> Option<&str> {
    let ChatMessage::User { content } = msg else {
        return None;
    };
    content.iter().find_map(|part| match part {
        ContentPart::Text { content } => Some(content.as_str()),
        _ => None,
    })
}

#[async_trait(?Send)]
impl LanguageModel<()> for ScriptedModel {
    async fn generate(&self, inputs: &[CommittedMessage<()>]) -> Result<Generation, GenerationError> {
        let last = inputs.last().map(|m| &m.msg);
        let tool = last.and_then(user_text).and_then(|text| {
            let lower = text.to_lowercase();
            [LOOKUP_TOOL, SEARCH_TOOL].into_iter().find(|tool| lower.contains(tool)).map(|tool| (tool, text))
        });
        if let Some((tool, text)) = tool {
            let call = ToolCall::new(uuid::Uuid::new_v4().to_string(), tool)
                .arg("query", ArgumentValue::String(text.to_owned()));
            let delay = self.chunk_delay;
            return Ok(Generation {
                output: futures::stream::once(async move {
                    tokio::time::sleep(delay).await;
                    ChatMessage::ToolCall { tool_call: call }
                })
                .boxed_local(),
                completion: async { Ok(0.001) }.boxed_local(),
            });
        }

        let reply = self.reply(inputs);
        #[allow(clippy::cast_precision_loss)]
        let cost = reply.len() as f64 * 1e-6;
        let delay = self.chunk_delay;
        let output = futures::stream::iter(self.chunks(&reply))
            .then(move |chunk| async move {
                tokio::time::sleep(delay).await;
                ChatMessage::assistant(chunk)
            })
            .boxed_local();
        Ok(Generation { output, completion: async move { Ok(cost) }.boxed_local() })
    }
}

/// Answers `search` with canned hits.
pub struct DemoTools {
    latency: Duration,
    definitions: Vec<ToolDefinition>,
}

impl DemoTools {
    pub fn new(latency: Duration) -> Self {
        let search = ToolDefinition::new(SEARCH_TOOL, "Search the kit's documentation")
            .param("query", ParamType::String, "What to look for");
        Self { latency, definitions: vec![search] }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }
}

#[async_trait(?Send)]
impl ToolRunner<()> for DemoTools {
    async fn run_tool(
        &self,
        _messages: &[CommittedMessage<()>],
        call: &ToolCall,
    ) -> Result<ToolOutput, GenerationError> {
        let Some(call) = validate_tool_call(call, &self.definitions) else {
            tracing::info!(tool = %call.function.name, "tool call rejected");
            return Ok(ToolOutput {
                result: serde_json::json!(REJECTED_CALL_TEXT),
                additional_parts: Vec::new(),
                cost: 0.0,
            });
        };
        let query = call.function.arguments.get("query").map(ToString::to_string).unwrap_or_default();
        tokio::time::sleep(self.latency).await;
        Ok(ToolOutput {
            result: serde_json::json!(format!(
                "3 results for \"{query}\": sticky scroll, reveal pacing, link repair"
            )),
            additional_parts: Vec::new(),
            cost: 0.0,
        })
    }
}

/// In-memory transcript of committed messages.
#[derive(Default)]
pub struct SessionStore {
    messages: RefCell<Vec<CommittedMessage<()>>>,
    cost: Cell<f64>,
}

impl SessionStore {
    pub fn push(&self, message: CommittedMessage<()>) {
        self.messages.borrow_mut().push(message);
    }

    pub fn snapshot(&self) -> Vec<CommittedMessage<()>> {
        self.messages.borrow().clone()
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.get()
    }
}

#[async_trait(?Send)]
impl CommitStore<()> for SessionStore {
    async fn commit(
        &self,
        _committed: &[CommittedMessage<()>],
        new_messages: &[CommittedMessage<()>],
        added_cost: f64,
    ) -> CommitOutcome {
        self.messages.borrow_mut().extend(new_messages.iter().cloned());
        self.cost.set(self.cost.get() + added_cost);
        tracing::debug!(count = new_messages.len(), added_cost, "messages committed");
        CommitOutcome::Committed
    }
}

/// The demo's whole backend.
pub struct DemoBackend {
    pub model: ScriptedModel,
    pub tools: DemoTools,
    pub store: SessionStore,
    pub coordinator: StreamCoordinator,
}

impl DemoBackend {
    pub fn new(chunk_delay: Duration) -> Self {
        Self {
            model: ScriptedModel::new(6, chunk_delay),
            tools: DemoTools::new(chunk_delay * 10),
            store: SessionStore::default(),
            coordinator: StreamCoordinator::new(),
        }
    }
}

/// Start a response on the local task set. Items are forwarded to `tx` until
/// the body ends or `cancel` fires; the backend keeps generating and
/// committing either way.
pub fn start_response(
    backend: &Rc<DemoBackend>,
    tx: mpsc::UnboundedSender<FeedEvent>,
    cancel: CancellationToken,
) {
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

    let producer = Rc::clone(backend);
    tokio::task::spawn_local(async move {
        let request = StreamRequest {
            conversation_id: CONVERSATION_ID,
            header: HEADER,
            committed: producer.store.snapshot(),
            message_data: (),
            type_after_tools: TYPE_AFTER_TOOLS,
        };
        let outcome = generate_and_stream(
            writer,
            request,
            &producer.model,
            &producer.tools,
            &producer.store,
            &producer.coordinator,
        )
        .await;
        tracing::info!(?outcome, "response finished");
    });

    tokio::task::spawn_local(async move {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = tx.send(FeedEvent::Cancelled);
            }
            result = forward_items(reader, &tx) => {
                let event = match result {
                    Ok(()) => FeedEvent::Closed,
                    Err(err) => {
                        tracing::warn!(%err, "response body unreadable");
                        FeedEvent::Failed(err.to_string())
                    }
                };
                let _ = tx.send(event);
            }
        }
    });
}

async fn forward_items<R>(reader: R, tx: &mpsc::UnboundedSender<FeedEvent>) -> Result<(), StreamError>
where
    R: AsyncRead + Unpin,
{
    let mut body = read_streaming_body::<_, ()>(reader).await?;
    tracing::debug!(header = body.header(), "response started");
    while let Some(item) = body.next_item().await? {
        if tx.send(FeedEvent::Item(item)).is_err() {
            break;
        }
    }
    Ok(())
}
