#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

use embedchat_core::{
    ChatReply, ChatRequest, ChatTransport, MemoryStore, Message, MessagePipeline, PipelineView,
    Sender, SessionIdentityManager, TransportError, WidgetConfig,
};

/// Everything the pipeline told the page, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Appended(Sender, String),
    Typing(bool),
    InputEnabled(bool),
    Focus,
    ClearInput,
    SuggestionsHidden,
    SessionAdopted(String),
}

#[derive(Default)]
pub struct RecordingView {
    events: RefCell<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: ViewEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl PipelineView for RecordingView {
    fn message_appended(&self, message: &Message) {
        self.record(ViewEvent::Appended(
            message.sender(),
            message.rendered_text().to_string(),
        ));
    }

    fn typing_changed(&self, typing: bool) {
        self.record(ViewEvent::Typing(typing));
    }

    fn input_enabled_changed(&self, enabled: bool) {
        self.record(ViewEvent::InputEnabled(enabled));
    }

    fn focus_input(&self) {
        self.record(ViewEvent::Focus);
    }

    fn clear_input(&self) {
        self.record(ViewEvent::ClearInput);
    }

    fn suggestions_hidden(&self) {
        self.record(ViewEvent::SuggestionsHidden);
    }

    fn session_adopted(&self, session_id: &str) {
        self.record(ViewEvent::SessionAdopted(session_id.to_string()));
    }
}

/// Replays queued results and records every request it receives
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Rc<RefCell<VecDeque<Result<ChatReply, TransportError>>>>,
    requests: Rc<RefCell<Vec<ChatRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, response: &str, session_id: Option<&str>) -> Self {
        self.replies.borrow_mut().push_back(Ok(ChatReply {
            response: response.to_string(),
            session_id: session_id.map(str::to_string),
        }));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".to_string())))
    }
}

/// Holds the request open until the test releases it
#[derive(Clone)]
pub struct GatedTransport {
    gate: Rc<RefCell<Option<oneshot::Receiver<Result<ChatReply, TransportError>>>>>,
    requests: Rc<RefCell<Vec<ChatRequest>>>,
}

impl GatedTransport {
    pub fn new() -> (Self, oneshot::Sender<Result<ChatReply, TransportError>>) {
        let (tx, rx) = oneshot::channel();
        let transport = Self {
            gate: Rc::new(RefCell::new(Some(rx))),
            requests: Rc::new(RefCell::new(Vec::new())),
        };
        (transport, tx)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ChatTransport for GatedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let gate = self.gate.borrow_mut().take();
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string()))),
            None => Err(TransportError::Network("gate already used".to_string())),
        }
    }
}

pub fn quiet_config() -> WidgetConfig {
    WidgetConfig {
        welcome_message: String::new(),
        ..WidgetConfig::default()
    }
}

pub fn session_on(durable: &MemoryStore, ephemeral: &MemoryStore) -> Rc<SessionIdentityManager> {
    Rc::new(SessionIdentityManager::new(
        Box::new(durable.clone()),
        Box::new(ephemeral.clone()),
        &WidgetConfig::default(),
    ))
}

/// Pipeline with no welcome message over fresh in-memory storage
pub fn build_pipeline<T>(transport: T) -> (MessagePipeline, Rc<RecordingView>, MemoryStore)
where
    T: ChatTransport + 'static,
{
    let durable = MemoryStore::new();
    let session = session_on(&durable, &MemoryStore::new());
    let view = Rc::new(RecordingView::default());
    let pipeline = MessagePipeline::new(
        Box::new(transport),
        session,
        view.clone(),
        &quiet_config(),
    );
    (pipeline, view, durable)
}

pub fn bot_reply(response: &str) -> Result<ChatReply, TransportError> {
    Ok(ChatReply {
        response: response.to_string(),
        session_id: None,
    })
}
