//! Multi-turn chat sessions with submission-ordered history commits.
//!
//! A [`ChatSession`] lets callers pipeline turns: a new `send_message` /
//! `send_message_stream` may be issued while an earlier turn's stream is
//! still in flight. Each turn is spawned immediately, so issuing never
//! blocks, but the point at which a turn commits its user and model entries
//! to history is serialized through a single-slot chain: every turn holds
//! the completion signal of the turn submitted before it and waits for that
//! signal before touching history. History order is therefore always
//! submission order, never network-completion order.
//!
//! A failed turn still fires its completion signal, so one failure never
//! deadlocks the turns queued behind it; the failed turn's handle rejects
//! with the specific error and (aborts excepted) contributes nothing to
//! history.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::client::GenerativeModel;
use crate::content::{Content, Role};
use crate::errors::GenaiError;
use crate::request::IntoContents;
use crate::response::GenerateContentResponse;
use crate::streaming::StreamedResponse;
use crate::transport::{RequestOptions, with_controls};

/// A multi-turn conversation owning its history exclusively.
///
/// # Example
///
/// ```ignore
/// let chat = model.start_chat();
/// let first = chat.send_message("Hi, I'm planning a trip to Kyoto.");
/// let second = chat.send_message("What should I pack?");
/// // Both turns are in flight; history will still read in this order.
/// println!("{}", first.response().await?.text()?);
/// println!("{}", second.response().await?.text()?);
/// ```
pub struct ChatSession {
    model: GenerativeModel,
    history: Arc<Mutex<Vec<Content>>>,
    /// Completion signal of the most recently submitted turn — the
    /// single-slot continuation chain that serializes history commits.
    pending: Mutex<Option<oneshot::Receiver<()>>>,
}

/// Handle for one non-streamed turn. Resolves independently of any other
/// turn issued on the same session.
pub struct ChatTurn {
    result: oneshot::Receiver<Result<GenerateContentResponse, GenaiError>>,
}

impl ChatTurn {
    /// Waits for this turn's sealed response.
    pub async fn response(self) -> Result<GenerateContentResponse, GenaiError> {
        self.result
            .await
            .map_err(|_| GenaiError::Internal("chat turn task dropped its result".to_string()))?
    }
}

/// Handle for one streamed turn: cumulative partial snapshots plus the
/// final sealed response.
pub struct ChatStreamTurn {
    snapshots: mpsc::UnboundedReceiver<GenerateContentResponse>,
    result: oneshot::Receiver<Result<GenerateContentResponse, GenaiError>>,
}

impl ChatStreamTurn {
    /// Next cumulative snapshot, or `None` once the turn's stream has
    /// ended (normally or not). Errors surface through [`response`].
    ///
    /// [`response`]: ChatStreamTurn::response
    pub async fn next(&mut self) -> Option<GenerateContentResponse> {
        self.snapshots.recv().await
    }

    /// Waits for this turn's sealed response, whether or not the snapshot
    /// sequence was consumed.
    pub async fn response(self) -> Result<GenerateContentResponse, GenaiError> {
        self.result
            .await
            .map_err(|_| GenaiError::Internal("chat turn task dropped its result".to_string()))?
    }
}

impl ChatSession {
    pub(crate) fn new(model: GenerativeModel, history: Vec<Content>) -> Self {
        Self {
            model,
            history: Arc::new(Mutex::new(history)),
            pending: Mutex::new(None),
        }
    }

    /// The committed conversation history, in turn-submission order.
    ///
    /// Reflects only fully committed entries at the time of the call: an
    /// in-flight turn contributes nothing until its commit point, and an
    /// aborted turn contributes at most its user entry.
    #[must_use]
    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .expect("chat history lock poisoned")
            .clone()
    }

    /// Sends a non-streamed turn. Returns immediately with a handle for
    /// this turn's response. The request is issued once every earlier turn
    /// has committed (its reply belongs in this request's contents), so
    /// history always reads in submission order.
    pub fn send_message(&self, input: impl IntoContents) -> ChatTurn {
        self.send_message_with_options(input, RequestOptions::default())
    }

    /// [`send_message`](Self::send_message) with per-turn cancellation and
    /// timeout controls.
    pub fn send_message_with_options(
        &self,
        input: impl IntoContents,
        options: RequestOptions,
    ) -> ChatTurn {
        let user_contents = normalize_user_contents(input.into_contents());
        let (result_tx, result_rx) = oneshot::channel();
        let preceding = self.chain_slot();
        let model = self.model.clone();
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            // A dropped predecessor (failed turn included) still releases
            // the chain; only the ordering matters.
            if let Some(signal) = preceding.receiver {
                let _ = signal.await;
            }
            let outcome = run_unary_turn(&model, &history, user_contents, &options).await;
            let _ = result_tx.send(outcome);
            drop(preceding.release);
        });

        ChatTurn { result: result_rx }
    }

    /// Sends a streamed turn. Returns immediately with a handle exposing
    /// partial snapshots and the final response.
    pub fn send_message_stream(&self, input: impl IntoContents) -> ChatStreamTurn {
        self.send_message_stream_with_options(input, RequestOptions::default())
    }

    /// [`send_message_stream`](Self::send_message_stream) with per-turn
    /// cancellation and timeout controls.
    pub fn send_message_stream_with_options(
        &self,
        input: impl IntoContents,
        options: RequestOptions,
    ) -> ChatStreamTurn {
        let user_contents = normalize_user_contents(input.into_contents());
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = oneshot::channel();
        let preceding = self.chain_slot();
        let model = self.model.clone();
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            if let Some(signal) = preceding.receiver {
                let _ = signal.await;
            }
            let outcome =
                run_stream_turn(&model, &history, user_contents, &options, &snapshot_tx).await;
            let _ = result_tx.send(outcome);
            drop(preceding.release);
        });

        ChatStreamTurn {
            snapshots: snapshot_rx,
            result: result_rx,
        }
    }

    /// Atomically captures the previous turn's completion signal and
    /// installs this turn's own.
    fn chain_slot(&self) -> ChainSlot {
        let (release, next_receiver) = oneshot::channel();
        let receiver = self
            .pending
            .lock()
            .expect("chat pending-chain lock poisoned")
            .replace(next_receiver);
        ChainSlot { receiver, release }
    }
}

struct ChainSlot {
    /// Completion signal of the preceding turn, `None` for the first turn
    receiver: Option<oneshot::Receiver<()>>,
    /// Dropping this releases the next turn in the chain
    release: oneshot::Sender<()>,
}

/// Sent turns become user entries regardless of what role the shorthand
/// carried; a missing role defaults to user.
fn normalize_user_contents(mut contents: Vec<Content>) -> Vec<Content> {
    for content in &mut contents {
        if content.role.is_none() {
            content.role = Some(Role::User);
        }
    }
    contents
}

fn model_entry(response: &GenerateContentResponse) -> Content {
    let parts = response
        .candidates
        .first()
        .map(|candidate| candidate.content.parts.clone())
        .unwrap_or_default();
    Content {
        role: Some(Role::Model),
        parts,
    }
}

fn snapshot_history(history: &Mutex<Vec<Content>>) -> Vec<Content> {
    history.lock().expect("chat history lock poisoned").clone()
}

fn append_history(history: &Mutex<Vec<Content>>, entries: Vec<Content>) -> usize {
    let mut guard = history.lock().expect("chat history lock poisoned");
    let mark = guard.len();
    guard.extend(entries);
    mark
}

fn truncate_history(history: &Mutex<Vec<Content>>, mark: usize) {
    history
        .lock()
        .expect("chat history lock poisoned")
        .truncate(mark);
}

/// One non-streamed turn, run inside the serialized section of the chain.
///
/// Both entries commit together after a valid response; a blocked or failed
/// turn commits nothing.
async fn run_unary_turn(
    model: &GenerativeModel,
    history: &Mutex<Vec<Content>>,
    user_contents: Vec<Content>,
    options: &RequestOptions,
) -> Result<GenerateContentResponse, GenaiError> {
    let mut contents = snapshot_history(history);
    contents.extend(user_contents.clone());
    let request = model.build_request(contents);

    let response = with_controls(options, model.transport().generate(request, options)).await?;

    if response.candidates.is_empty() {
        if response.is_blocked() {
            return Err(GenaiError::Blocked {
                reason: response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|feedback| feedback.block_reason),
            });
        }
        warn!("turn produced no candidates; history not updated");
        return Ok(response);
    }

    let mut entries = user_contents;
    entries.push(model_entry(&response));
    append_history(history, entries);
    debug!("committed non-streamed turn to history");
    Ok(response)
}

/// One streamed turn, run inside the serialized section of the chain.
///
/// The user entry commits once the response stream opens; the model entry
/// commits when the aggregate seals with candidates. An abort after the
/// user entry committed leaves it in place (a half-committed turn, flagged
/// in the error); every other failure rolls the user entry back before the
/// chain advances.
async fn run_stream_turn(
    model: &GenerativeModel,
    history: &Mutex<Vec<Content>>,
    user_contents: Vec<Content>,
    options: &RequestOptions,
    snapshots: &mpsc::UnboundedSender<GenerateContentResponse>,
) -> Result<GenerateContentResponse, GenaiError> {
    let mut contents = snapshot_history(history);
    contents.extend(user_contents.clone());
    let request = model.build_request(contents);

    let source = with_controls(
        options,
        model.transport().stream_generate(request, options),
    )
    .await?;

    let mark = append_history(history, user_contents);
    let mut streamed = StreamedResponse::new(source, options.cancellation.clone());

    let drive = async {
        while let Some(partial) = streamed.next().await {
            match partial {
                Ok(snapshot) => {
                    // A caller that dropped the snapshot receiver still
                    // gets the fold driven to completion.
                    let _ = snapshots.send(snapshot);
                }
                Err(error) => return Err(error),
            }
        }
        streamed.aggregate().await
    };

    let sealed = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, drive).await {
            Ok(result) => result,
            Err(_) => {
                // Deadline elapsed mid-stream: same half-committed shape as
                // an abort — the user entry stays, no model entry ever.
                warn!("streamed turn timed out mid-stream; user entry left in history");
                return Err(GenaiError::Timeout(limit));
            }
        },
        None => drive.await,
    };

    match sealed {
        Ok(response) => {
            if response.candidates.is_empty() {
                truncate_history(history, mark);
                if response.is_blocked() {
                    return Err(GenaiError::Blocked {
                        reason: response
                            .prompt_feedback
                            .as_ref()
                            .and_then(|feedback| feedback.block_reason),
                    });
                }
                warn!("streamed turn produced no candidates; history not updated");
                return Ok(response);
            }
            append_history(history, vec![model_entry(&response)]);
            debug!("committed streamed turn to history");
            Ok(response)
        }
        Err(GenaiError::Aborted { .. }) => Err(GenaiError::Aborted {
            user_entry_committed: true,
        }),
        Err(error) => {
            truncate_history(history, mark);
            Err(error)
        }
    }
}
