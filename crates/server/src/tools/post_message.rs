//! post_message tool implementation.
//!
//! Posts a control message to the worker and reports what it broadcast to clients
//! while handling it.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    Receiver,
    error::{RecvError, TryRecvError},
};
use uninav_client::{ControlMessage, Worker, WorkerEvent};
use uninav_core::Error;

use crate::error::ToolError;

/// Input parameters for post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// Control message, e.g. `{"type": "PREFETCH_TILES", "bbox": [75.56, 26.83, 75.58, 26.85], "zooms": [15, 16]}`,
    /// `{"type": "CLEAR_TILE_CACHE"}` or `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Output structure for post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageOutput {
    /// The message as the worker understood it.
    pub message: ControlMessage,
    /// Events broadcast to clients, in order.
    pub events: Vec<WorkerEvent>,
    /// Events that overflowed the broadcast buffer before they could be collected.
    pub dropped: u64,
}

/// Events seen by one client while a message is handled.
#[derive(Default)]
struct Collected {
    events: Vec<WorkerEvent>,
    dropped: u64,
}

impl Collected {
    fn record(&mut self, received: Result<WorkerEvent, RecvError>) {
        match received {
            Ok(event) => self.events.push(event),
            Err(RecvError::Lagged(n)) => self.dropped += n,
            Err(RecvError::Closed) => {}
        }
    }

    /// Take whatever is still buffered once handling has finished.
    fn drain(&mut self, client: &mut Receiver<WorkerEvent>) {
        loop {
            match client.try_recv() {
                Ok(event) => self.events.push(event),
                Err(TryRecvError::Lagged(n)) => self.dropped += n,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Handle `message` while reading the broadcast alongside it.
///
/// A prefetch can emit more events than the channel holds, so the client
/// must keep up while the job runs rather than read afterwards.
async fn dispatch_and_collect(worker: &Worker, message: ControlMessage) -> Result<Collected, Error> {
    let mut client = worker.subscribe();
    let mut collected = Collected::default();
    let mut open = true;

    let handling = worker.handle_message(message);
    tokio::pin!(handling);

    let result = loop {
        tokio::select! {
            biased;
            received = client.recv(), if open => {
                open = !matches!(received, Err(RecvError::Closed));
                collected.record(received);
            }
            result = &mut handling => break result,
        }
    };
    result?;

    collected.drain(&mut client);
    Ok(collected)
}

/// Implementation of the post_message tool.
pub async fn post_message_impl(worker: &Worker, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let message: ControlMessage =
        serde_json::from_value(params.message).map_err(|e| ToolError::InvalidMessage(e.to_string()))?;

    let Collected { events, dropped } = dispatch_and_collect(worker, message.clone()).await?;

    if dropped > 0 {
        tracing::warn!(dropped, collected = events.len(), "event buffer overflowed during post_message");
    }

    let output = PostMessageOutput { message, events, dropped };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize events: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
