//! Incremental reveal of an already received answer.
//!
//! The whole answer is known up front; a timer task hands it to the
//! transcript a few characters per tick so it reads as if it were being
//! typed. Each run is keyed by the target [`MessageId`] and stamped with a
//! ticket, so a restarted reveal can never interleave with the one it
//! replaced.

use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::{MessageId, MessagePatch};

pub const DEFAULT_CHUNK: usize = 3;
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// One update emitted by a reveal task.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealStep {
    pub id: MessageId,
    pub ticket: u64,
    pub patch: MessagePatch,
    /// Set on the terminal step, which clears `is_typing`.
    pub done: bool,
}

/// Successive prefixes of `text`, each `chunk` characters longer than the
/// last. Never splits a character.
pub fn prefixes(text: &str, chunk: usize) -> Prefixes<'_> {
    Prefixes {
        text,
        end: 0,
        chunk: chunk.max(1),
    }
}

pub struct Prefixes<'a> {
    text: &'a str,
    end: usize,
    chunk: usize,
}

impl<'a> Iterator for Prefixes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.end >= self.text.len() {
            return None;
        }
        self.end = self.text[self.end..]
            .char_indices()
            .nth(self.chunk)
            .map(|(i, _)| self.end + i)
            .unwrap_or(self.text.len());
        Some(&self.text[..self.end])
    }
}

struct ActiveReveal {
    ticket: u64,
    handle: JoinHandle<()>,
}

pub struct RevealController {
    chunk: usize,
    tick: Duration,
    next_ticket: u64,
    active: HashMap<MessageId, ActiveReveal>,
}

impl RevealController {
    pub fn new(chunk: usize, tick: Duration) -> Self {
        Self {
            chunk: chunk.max(1),
            tick,
            next_ticket: 0,
            active: HashMap::new(),
        }
    }

    /// Start revealing `answer` into message `id`. A reveal already running
    /// for the same id is cancelled first.
    ///
    /// `emit` delivers each step to the owner of the transcript and returns
    /// false once the owner is gone, which stops the task.
    pub fn start<F>(&mut self, id: MessageId, answer: String, emit: F) -> u64
    where
        F: Fn(RevealStep) -> bool + Send + 'static,
    {
        if self.cancel(id) {
            tracing::debug!(%id, "restarting reveal, previous run cancelled");
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let chunk = self.chunk;
        let tick = self.tick;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; updates start one period in.
            interval.tick().await;

            for prefix in prefixes(&answer, chunk) {
                interval.tick().await;
                let step = RevealStep {
                    id,
                    ticket,
                    patch: MessagePatch::reveal(prefix.to_string()),
                    done: false,
                };
                if !emit(step) {
                    return;
                }
            }

            interval.tick().await;
            let _ = emit(RevealStep {
                id,
                ticket,
                patch: MessagePatch::finished(),
                done: true,
            });
        });

        self.active.insert(id, ActiveReveal { ticket, handle });
        ticket
    }

    /// Stop the reveal running for `id`. Returns whether one was running.
    pub fn cancel(&mut self, id: MessageId) -> bool {
        match self.active.remove(&id) {
            Some(reveal) => {
                reveal.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, reveal) in self.active.drain() {
            reveal.handle.abort();
        }
    }

    /// Whether `step` belongs to the live run for its message. Accepting the
    /// terminal step retires the run.
    pub fn accept(&mut self, step: &RevealStep) -> bool {
        let current = self
            .active
            .get(&step.id)
            .is_some_and(|reveal| reveal.ticket == step.ticket);
        if current && step.done {
            self.active.remove(&step.id);
        }
        current
    }

    pub fn is_active(&self, id: MessageId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for RevealController {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK, DEFAULT_TICK)
    }
}

impl Drop for RevealController {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
