use std::cell::RefCell;
use std::rc::Rc;

use embedchat_core::{
    AutoTrigger, MessagePipeline, PipelineView, Sender, SessionIdentityManager, WidgetConfig,
    WidgetState,
};
use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Window};

mod dom;
mod storage;
mod transport;
mod view;

use storage::BrowserStore;
use transport::FetchTransport;
use view::{DomView, WidgetElements};

/// Delay before focusing the input after opening, matching the open transition
const FOCUS_DELAY_MS: u32 = 400;

/// Initialize the WASM module
/// This sets up panic hooks and logging
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    wasm_logger::init(wasm_logger::Config::default());

    log::info!("embedchat WASM initialized");
}

/// Render raw text as the widget would show it. `sender` is `"user"` or `"bot"`.
#[wasm_bindgen]
pub fn render_message(sender: &str, raw_text: &str) -> Result<String, JsValue> {
    let sender = Sender::from_str(sender)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown sender: {}", sender)))?;
    Ok(embedchat_core::render_message(sender, raw_text))
}

/// The chat widget mounted on the page.
///
/// The host page constructs one and keeps the handle; nothing is registered
/// globally.
#[wasm_bindgen]
pub struct ChatWidget {
    inner: Rc<WidgetInner>,
}

struct WidgetInner {
    config: WidgetConfig,
    document: Document,
    session: Rc<SessionIdentityManager>,
    pipeline: MessagePipeline,
    elements: WidgetElements,
    view: Rc<DomView>,
    state: RefCell<WidgetState>,
}

#[wasm_bindgen]
impl ChatWidget {
    /// Build the widget from an optional JSON configuration string
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ChatWidget, JsValue> {
        let config = WidgetConfig::from_json(config_json.as_deref().unwrap_or(""))
            .map_err(|e| JsValue::from_str(&format!("Invalid widget config: {}", e)))?;
        log::info!("Mounting chat widget for {}", config.chat_url());

        let document = document()?;
        let elements = WidgetElements::build(&document, &config)?;
        let view = Rc::new(DomView::new(document.clone(), &elements, &config));

        let session = Rc::new(SessionIdentityManager::new(
            Box::new(BrowserStore::local()),
            Box::new(BrowserStore::session()),
            &config,
        ));
        let transport = FetchTransport::new(config.chat_url());
        let pipeline =
            MessagePipeline::new(Box::new(transport), session.clone(), view.clone(), &config);

        let inner = Rc::new(WidgetInner {
            config,
            document,
            session,
            pipeline,
            elements,
            view,
            state: RefCell::new(WidgetState::new()),
        });

        let picker = Rc::clone(&inner);
        inner
            .view
            .show_suggestions(inner.pipeline.suggestions(), move |text| submit(&picker, text))?;

        wire_events(&inner)?;
        inner.apply_state();

        if let Some(delay) = AutoTrigger::pending_delay(&inner.session, &inner.config) {
            let trigger = Rc::clone(&inner);
            Timeout::new(delay, move || trigger.auto_trigger()).forget();
        }

        Ok(ChatWidget { inner })
    }

    pub fn open(&self) {
        self.inner.open();
    }

    pub fn close(&self) {
        self.inner.state.borrow_mut().close();
        self.inner.apply_state();
    }

    #[wasm_bindgen(js_name = toggleMinimize)]
    pub fn toggle_minimize(&self) {
        self.inner.state.borrow_mut().toggle_minimize();
        self.inner.apply_state();
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open()
    }

    #[wasm_bindgen(js_name = isMinimized)]
    pub fn is_minimized(&self) -> bool {
        self.inner.state.borrow().is_minimized()
    }

    /// Send text as if the user had typed it
    pub fn submit(&self, text: String) {
        submit(&self.inner, text);
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> String {
        self.inner.session.get_or_create_session_id()
    }

    /// Call `callback(sessionId)` whenever the server continues the
    /// conversation under a new identifier
    #[wasm_bindgen(js_name = onSessionAdopted)]
    pub fn on_session_adopted(&self, callback: js_sys::Function) {
        self.inner.view.set_session_callback(callback);
    }

    /// Make every element matching `selector` open the widget
    #[wasm_bindgen(js_name = bindLaunchers)]
    pub fn bind_launchers(&self, selector: &str) -> Result<u32, JsValue> {
        let launchers = dom::query_all(&self.inner.document, selector)?;
        for launcher in &launchers {
            let inner = Rc::clone(&self.inner);
            dom::add_event_listener(launcher, "click", move |event| {
                event.prevent_default();
                event.stop_propagation();
                inner.open();
            })?;
        }
        log::debug!("Bound {} launcher(s) for {}", launchers.len(), selector);
        Ok(launchers.len() as u32)
    }
}

impl WidgetInner {
    fn open(&self) {
        self.state.borrow_mut().open();
        self.apply_state();
        self.focus_later();
    }

    fn auto_trigger(&self) {
        let fired = AutoTrigger::fire(&self.session, &mut self.state.borrow_mut());
        if fired {
            log::info!("Auto-opening chat widget");
            self.apply_state();
            self.focus_later();
        }
    }

    fn focus_later(&self) {
        let view = Rc::clone(&self.view);
        Timeout::new(FOCUS_DELAY_MS, move || view.focus_input()).forget();
    }

    fn apply_state(&self) {
        let state = *self.state.borrow();
        let window = &self.elements.window;
        if state.is_open() {
            dom::show_element(window, "flex");
        } else {
            dom::hide_element(window);
        }
        dom::set_class(window, "open", state.is_open());
        dom::set_class(window, "minimized", state.is_minimized());
    }
}

fn submit(inner: &Rc<WidgetInner>, text: String) {
    let inner = Rc::clone(inner);
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = inner.pipeline.send_user_message(&text).await;
        log::debug!("Send outcome: {:?}", outcome);
    });
}

fn submit_from_input(inner: &Rc<WidgetInner>) {
    let text = inner.elements.input.value();
    submit(inner, text);
}

fn wire_events(inner: &Rc<WidgetInner>) -> Result<(), JsValue> {
    let elements = &inner.elements;

    let handle = Rc::clone(inner);
    dom::add_event_listener(&elements.close_button, "click", move |event| {
        event.stop_propagation();
        handle.state.borrow_mut().close();
        handle.apply_state();
    })?;

    let handle = Rc::clone(inner);
    dom::add_event_listener(&elements.minimize_button, "click", move |event| {
        event.stop_propagation();
        handle.state.borrow_mut().toggle_minimize();
        handle.apply_state();
    })?;

    let handle = Rc::clone(inner);
    dom::add_click_listener(&elements.header, move || {
        let restored = handle.state.borrow_mut().header_activated();
        if restored {
            handle.apply_state();
        }
    })?;

    let handle = Rc::clone(inner);
    dom::add_click_listener(&elements.send_button, move || submit_from_input(&handle))?;

    // Enter sends, Shift+Enter inserts a newline
    let handle = Rc::clone(inner);
    dom::add_event_listener(&elements.input, "keydown", move |event| {
        if let Some(key_event) = event.dyn_ref::<web_sys::KeyboardEvent>() {
            if key_event.key() == "Enter" && !key_event.shift_key() {
                event.prevent_default();
                submit_from_input(&handle);
            }
        }
    })?;

    let handle = Rc::clone(inner);
    dom::add_event_listener(&elements.input, "input", move |_event| {
        handle.view.resize_input(handle.config.input_max_height_px);
    })?;

    // Phone links are inert spans; navigate on activation
    dom::add_event_listener(&elements.messages, "click", |event| {
        if let Some(tel) = view::phone_target(&event) {
            navigate(&tel);
        }
    })?;
    dom::add_event_listener(&elements.messages, "keydown", |event| {
        let is_enter = event
            .dyn_ref::<web_sys::KeyboardEvent>()
            .map_or(false, |e| e.key() == "Enter");
        if is_enter {
            if let Some(tel) = view::phone_target(&event) {
                navigate(&tel);
            }
        }
    })?;

    Ok(())
}

fn navigate(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            log::error!("Failed to navigate to {}: {:?}", url, e);
        }
    }
}

/// Get the window object
fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))
}

/// Get the document object
fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document object"))
}
