//! Chat session: owns the transcript and decides when a question or an
//! upload may go out.
//!
//! All mutation happens on the thread that calls [`ChatSession::handle`].
//! Network calls, file reads and reveal timers run as spawned tasks and
//! report back as [`SessionEvent`]s through the channel returned by
//! [`ChatSession::new`].

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::client::{ChatClient, ChatDispatcher, Document, QueryResponse, UploadResponse};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::draft::Draft;
use crate::error::Result;
use crate::reveal::{RevealController, RevealStep};
use crate::state::{Message, MessageId, WireMessage};

#[derive(Debug)]
pub enum SessionEvent {
    QueryFinished {
        placeholder: MessageId,
        result: Result<QueryResponse>,
    },
    UploadFinished {
        filename: String,
        result: Result<UploadResponse>,
    },
    Reveal(RevealStep),
}

pub struct ChatSession {
    conversation: Conversation,
    pub draft: Draft,
    sending: bool,
    uploads_in_flight: usize,
    /// Placeholder answering the question currently out.
    pending: Option<MessageId>,
    send_history: bool,
    dispatcher: ChatDispatcher,
    reveal: RevealController,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ChatSession {
    pub fn new(
        dispatcher: ChatDispatcher,
        config: &Config,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            conversation: Conversation::new(),
            draft: Draft::default(),
            sending: false,
            uploads_in_flight: 0,
            pending: None,
            send_history: config.send_history,
            dispatcher,
            reveal: RevealController::new(config.reveal_chunk, config.reveal_tick()),
            events,
        };
        (session, rx)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.client().base_url()
    }

    pub fn client(&self) -> &ChatClient {
        self.dispatcher.client()
    }

    /// Send the draft as a question. Returns the placeholder id, or `None`
    /// when the draft is blank or an exchange is already in flight.
    pub fn submit(&mut self) -> Option<MessageId> {
        if self.sending || self.draft.is_blank() {
            return None;
        }

        let text = self.draft.take();
        self.conversation.append(Message::user(text.clone()));
        let messages = if self.send_history {
            self.conversation.history()
        } else {
            vec![WireMessage::user(text)]
        };

        let placeholder = Message::placeholder();
        let id = placeholder.id;
        self.conversation.append(placeholder);
        self.sending = true;
        self.pending = Some(id);

        tracing::info!(%id, turns = messages.len(), "submitting question");
        let request = self.dispatcher.dispatch(messages);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = request.await;
            let _ = events.send(SessionEvent::QueryFinished {
                placeholder: id,
                result,
            });
        });

        Some(id)
    }

    /// Upload the file at `path`. Never refused; the service is the judge
    /// of what it accepts.
    pub fn upload(&mut self, path: PathBuf) {
        self.uploads_in_flight += 1;
        let client = self.dispatcher.client().clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let result = match Document::read(&path).await {
                Ok(document) => {
                    if !document.has_suggested_extension() {
                        tracing::warn!(%filename, "uploading file with an unlisted extension");
                    }
                    client.upload_document(document).await
                }
                Err(err) => Err(err),
            };
            let _ = events.send(SessionEvent::UploadFinished { filename, result });
        });
    }

    /// Drop the transcript. Anything still in flight for it is ignored when
    /// it lands; uploads still post their outcome.
    pub fn clear(&mut self) {
        self.reveal.cancel_all();
        self.conversation.clear();
        self.pending = None;
        self.sending = false;
    }

    /// Apply a finished background step. Returns whether the transcript
    /// changed.
    pub fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::QueryFinished { placeholder, result } => {
                self.on_query_finished(placeholder, result)
            }
            SessionEvent::UploadFinished { filename, result } => {
                self.on_upload_finished(filename, result)
            }
            SessionEvent::Reveal(step) => self.on_reveal(step),
        }
    }

    fn on_query_finished(&mut self, placeholder: MessageId, result: Result<QueryResponse>) -> bool {
        if self.pending != Some(placeholder) || !self.conversation.contains(placeholder) {
            tracing::debug!(%placeholder, "response for a discarded exchange ignored");
            return false;
        }

        match result {
            Ok(reply) => {
                tracing::info!(
                    %placeholder,
                    chars = reply.answer.chars().count(),
                    sources = reply.sources.len(),
                    "answer received"
                );
                if let Err(err) = self
                    .conversation
                    .replace(placeholder, Message::typing(reply.sources))
                {
                    tracing::error!(%err, "failed to resolve placeholder");
                    self.finish_exchange();
                    return false;
                }
                let events = self.events.clone();
                self.reveal.start(placeholder, reply.answer, move |step| {
                    events.send(SessionEvent::Reveal(step)).is_ok()
                });
            }
            Err(err) => {
                tracing::warn!(%placeholder, %err, "question failed");
                let notice = Message::error(format!("Could not get an answer: {err}"));
                if let Err(err) = self.conversation.replace(placeholder, notice) {
                    tracing::error!(%err, "failed to resolve placeholder");
                }
                self.finish_exchange();
            }
        }
        true
    }

    fn on_reveal(&mut self, step: RevealStep) -> bool {
        if !self.reveal.accept(&step) {
            return false;
        }
        let changed = self.conversation.update(step.id, &step.patch);
        if step.done && self.pending == Some(step.id) {
            self.finish_exchange();
        }
        changed
    }

    fn on_upload_finished(&mut self, filename: String, result: Result<UploadResponse>) -> bool {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
        let message = match result {
            Ok(upload) => {
                tracing::info!(%filename, fragments = upload.document_count, "document processed");
                Message::notice(format!(
                    "Processed file: {filename}\n{} text fragments extracted.",
                    upload.document_count
                ))
            }
            Err(err) => {
                tracing::warn!(%filename, %err, "upload failed");
                Message::error(format!("Error processing file {filename}: {err}"))
            }
        };
        self.conversation.append(message);
        true
    }

    fn finish_exchange(&mut self) {
        self.pending = None;
        self.sending = false;
    }
}
