//! Remote keyboard input.
//!
//! The TV accepts one IME command at a time. Input is queued and sent in
//! batches: consecutive text becomes one `insertText`, consecutive deletes
//! one `deleteCharacters`. The next batch goes out when the previous one is
//! answered, successfully or not.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::command::{Command, ResponseListener, Subscription, raw_payload};
use crate::protocol::TextInputStatus;
use crate::session::Session;

use super::WebOsTv;

// ============================================================================
// Endpoints
// ============================================================================

const REGISTER_KEYBOARD: &str = "ssap://com.webos.service.ime/registerRemoteKeyboard";
const INSERT_TEXT: &str = "ssap://com.webos.service.ime/insertText";
const DELETE_CHARACTERS: &str = "ssap://com.webos.service.ime/deleteCharacters";
const SEND_ENTER: &str = "ssap://com.webos.service.ime/sendEnterKey";

// ============================================================================
// KeyInput
// ============================================================================

/// One queued keyboard action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Text to insert at the cursor.
    Text(String),
    /// The enter key.
    Enter,
    /// One backspace.
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputState {
    Idle,
    Sending,
}

struct Queue {
    state: InputState,
    pending: VecDeque<KeyInput>,
    /// Sequence number of the batch in flight; stale answers are ignored.
    batch: u64,
}

/// Removes the next batch from the front of `pending`.
fn take_batch(pending: &mut VecDeque<KeyInput>) -> Option<(&'static str, Value)> {
    match pending.front()? {
        KeyInput::Enter => {
            pending.pop_front();
            Some((SEND_ENTER, json!({})))
        }
        KeyInput::Delete => {
            let mut count = 0;
            while pending.front() == Some(&KeyInput::Delete) {
                pending.pop_front();
                count += 1;
            }
            Some((DELETE_CHARACTERS, json!({ "count": count })))
        }
        KeyInput::Text(_) => {
            let mut text = String::new();
            while let Some(KeyInput::Text(chunk)) = pending.front() {
                text.push_str(chunk);
                pending.pop_front();
            }
            Some((INSERT_TEXT, json!({ "text": text, "replace": 0 })))
        }
    }
}

// ============================================================================
// KeyboardInput
// ============================================================================

/// Serialized keyboard input queue for one session.
pub struct KeyboardInput {
    session: Session,
    this: Weak<KeyboardInput>,
    queue: Mutex<Queue>,
}

impl std::fmt::Debug for KeyboardInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        f.debug_struct("KeyboardInput")
            .field("state", &queue.state)
            .field("queued", &queue.pending.len())
            .finish_non_exhaustive()
    }
}

impl KeyboardInput {
    /// Creates an idle queue sending through `session`.
    #[must_use]
    pub fn new(session: Session) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            session,
            this: this.clone(),
            queue: Mutex::new(Queue {
                state: InputState::Idle,
                pending: VecDeque::new(),
                batch: 0,
            }),
        })
    }

    /// Queues text for insertion. Empty text is ignored.
    pub fn send_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.enqueue(KeyInput::Text(text.to_string()));
    }

    /// Queues the enter key.
    pub fn send_enter(&self) {
        self.enqueue(KeyInput::Enter);
    }

    /// Queues one backspace.
    ///
    /// If input is still waiting to be sent, the most recent queued item is
    /// dropped instead.
    pub fn send_delete(&self) {
        {
            let mut queue = self.queue.lock();
            if let Some(dropped) = queue.pending.pop_back() {
                trace!(?dropped, "Delete cancelled queued input");
                return;
            }
        }
        self.enqueue(KeyInput::Delete);
    }

    /// Drops queued input and returns to idle.
    ///
    /// Called when the connection goes down, since the answer to a batch in
    /// flight will never arrive.
    pub fn reset(&self) {
        let mut queue = self.queue.lock();
        queue.pending.clear();
        queue.state = InputState::Idle;
        queue.batch += 1;
    }

    /// Returns the number of queued, unsent items.
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Returns `true` while a batch awaits its answer.
    #[inline]
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.queue.lock().state == InputState::Sending
    }

    fn enqueue(&self, input: KeyInput) {
        self.queue.lock().pending.push_back(input);
        self.send_next();
    }

    /// Sends the next batch if idle. The session is called outside the lock.
    fn send_next(&self) {
        let (uri, payload, batch) = {
            let mut queue = self.queue.lock();
            if queue.state == InputState::Sending {
                return;
            }
            let Some((uri, payload)) = take_batch(&mut queue.pending) else {
                return;
            };
            queue.state = InputState::Sending;
            queue.batch += 1;
            (uri, payload, queue.batch)
        };

        debug!(target_uri = uri, "Sending keyboard batch");
        let this = self.this.clone();
        let on_answer: ResponseListener<Value> = Arc::new(move |_| {
            if let Some(keyboard) = this.upgrade() {
                keyboard.on_answer(batch);
            }
        });
        self.session
            .send_command(Arc::new(Command::new(uri, Some(payload), raw_payload(), on_answer)));
    }

    fn on_answer(&self, batch: u64) {
        {
            let mut queue = self.queue.lock();
            if queue.batch != batch || queue.state != InputState::Sending {
                trace!(batch, "Ignoring answer to stale keyboard batch");
                return;
            }
            queue.state = InputState::Idle;
        }
        self.send_next();
    }
}

// ============================================================================
// TextInputControl
// ============================================================================

/// On-screen keyboard integration.
pub trait TextInputControl {
    /// Receives keyboard focus and widget changes.
    fn subscribe_text_input_status(
        &self,
        listener: ResponseListener<TextInputStatus>,
    ) -> Arc<Subscription<TextInputStatus>>;

    /// Types `text` into the focused widget.
    fn send_text(&self, text: &str);

    /// Presses enter.
    fn send_enter(&self);

    /// Presses backspace.
    fn send_delete(&self);
}

impl TextInputControl for WebOsTv {
    fn subscribe_text_input_status(
        &self,
        listener: ResponseListener<TextInputStatus>,
    ) -> Arc<Subscription<TextInputStatus>> {
        self.subscribe(
            REGISTER_KEYBOARD,
            None,
            Box::new(|payload| Ok(TextInputStatus::from_payload(payload))),
            listener,
        )
    }

    fn send_text(&self, text: &str) {
        self.keyboard().send_text(text);
    }

    fn send_enter(&self) {
        self.keyboard().send_enter();
    }

    fn send_delete(&self) {
        self.keyboard().send_delete();
    }
}

// ============================================================================
// Tests
// ============================================================================
