//! Request lifecycle: validate, append, send, render the reply or the
//! fallback, and restore the input. Strictly single-flight.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use async_trait::async_trait;

use crate::config::WidgetConfig;
use crate::error::TransportError;
use crate::protocol::{ChatReply, ChatRequest};
use crate::session::SessionIdentityManager;
use crate::transcript::{Message, Sender, Transcript};

/// Carries one request to the chat endpoint
#[async_trait(?Send)]
pub trait ChatTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

/// Receives every state change the page has to reflect
pub trait PipelineView {
    fn message_appended(&self, message: &Message);
    fn typing_changed(&self, typing: bool);
    fn input_enabled_changed(&self, enabled: bool);
    fn focus_input(&self);

    /// The accepted text has been taken; the input field can be emptied
    fn clear_input(&self) {}

    fn suggestions_hidden(&self) {}

    fn session_adopted(&self, session_id: &str) {
        log::debug!("Session adopted: {}", session_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    /// Accepted; user message appended, request being built
    Sending,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    InFlight,
}

/// What happened to one `send_user_message` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The bot's reply was appended
    Delivered,
    /// The request failed and the fallback message was appended
    FellBack(TransportError),
    /// Nothing happened
    Rejected(RejectReason),
}

pub struct MessagePipeline {
    transport: Box<dyn ChatTransport>,
    session: Rc<SessionIdentityManager>,
    view: Rc<dyn PipelineView>,
    transcript: RefCell<Transcript>,
    state: Cell<RequestState>,
    typing: Cell<bool>,
    input_enabled: Cell<bool>,
    suggestions_visible: Cell<bool>,
    suggestions: Vec<String>,
    fallback_message: String,
}

impl MessagePipeline {
    /// Build the pipeline and post the configured welcome message.
    pub fn new(
        transport: Box<dyn ChatTransport>,
        session: Rc<SessionIdentityManager>,
        view: Rc<dyn PipelineView>,
        config: &WidgetConfig,
    ) -> Self {
        let pipeline = Self {
            transport,
            session,
            view,
            transcript: RefCell::new(Transcript::new()),
            state: Cell::new(RequestState::Idle),
            typing: Cell::new(false),
            input_enabled: Cell::new(true),
            suggestions_visible: Cell::new(!config.suggestions.is_empty()),
            suggestions: config.suggestions.clone(),
            fallback_message: config.fallback_message.clone(),
        };

        if !config.welcome_message.is_empty() {
            pipeline.append(Sender::Bot, &config.welcome_message);
        }

        pipeline
    }

    pub fn state(&self) -> RequestState {
        self.state.get()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.get() != RequestState::Idle
    }

    pub fn is_typing(&self) -> bool {
        self.typing.get()
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled.get()
    }

    pub fn transcript(&self) -> Ref<'_, Transcript> {
        self.transcript.borrow()
    }

    pub fn session(&self) -> &SessionIdentityManager {
        &self.session
    }

    /// Quick replies still on offer, empty once the first message was sent
    pub fn suggestions(&self) -> &[String] {
        if self.suggestions_visible.get() {
            &self.suggestions
        } else {
            &[]
        }
    }

    /// Send user text to the endpoint and render the outcome.
    ///
    /// Blank text and calls made while a request is outstanding are dropped
    /// without touching the transcript.
    pub async fn send_user_message(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            log::debug!("Ignoring empty message");
            return SendOutcome::Rejected(RejectReason::Empty);
        }
        if self.is_in_flight() {
            log::debug!("Ignoring message while a request is in flight");
            return SendOutcome::Rejected(RejectReason::InFlight);
        }

        self.state.set(RequestState::Sending);
        self.hide_suggestions();
        self.append(Sender::User, message);
        self.view.clear_input();
        self.set_input_enabled(false);
        self.show_typing();

        let request = ChatRequest {
            message: message.to_string(),
            session_id: self.session.get_or_create_session_id(),
        };

        self.state.set(RequestState::AwaitingResponse);
        let result = self.transport.send(&request).await;

        self.hide_typing();
        let outcome = match result {
            Ok(reply) => {
                self.append(Sender::Bot, &reply.response);
                if let Some(id) = reply.session_id.as_deref() {
                    if self.session.adopt_server_session_id(id) {
                        self.view.session_adopted(id);
                    }
                }
                SendOutcome::Delivered
            }
            Err(e) => {
                log::error!("Chat error: {}", e);
                self.append(Sender::Bot, &self.fallback_message);
                SendOutcome::FellBack(e)
            }
        };

        self.set_input_enabled(true);
        self.view.focus_input();
        self.state.set(RequestState::Idle);
        outcome
    }

    fn append(&self, sender: Sender, text: &str) {
        let message = Message::new(sender, text);
        self.view.message_appended(&message);
        self.transcript.borrow_mut().push(message);
    }

    fn show_typing(&self) {
        if self.typing.replace(true) {
            return;
        }
        self.view.typing_changed(true);
    }

    fn hide_typing(&self) {
        if self.typing.replace(false) {
            self.view.typing_changed(false);
        }
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.input_enabled.set(enabled);
        self.view.input_enabled_changed(enabled);
    }

    fn hide_suggestions(&self) {
        if self.suggestions_visible.replace(false) {
            self.view.suggestions_hidden();
        }
    }
}
