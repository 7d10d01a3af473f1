use std::cell::RefCell;
use std::rc::Rc;

use embedchat_core::{escape_html, Message, PipelineView, Sender, WidgetConfig};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, HtmlTextAreaElement};

use crate::dom;

/// Handles to the widget's elements, captured once when it is built
pub struct WidgetElements {
    pub window: HtmlElement,
    pub header: Element,
    pub close_button: Element,
    pub minimize_button: Element,
    pub messages: Element,
    pub input: HtmlTextAreaElement,
    pub send_button: HtmlButtonElement,
}

impl WidgetElements {
    /// Build the widget markup and append it to `<body>`
    pub fn build(document: &Document, config: &WidgetConfig) -> Result<Self, JsValue> {
        let root = dom::create_element_with_class(document, "div", "embedchat")?;

        let html = format!(
            r#"
            <div class="embedchat-window">
                <div class="embedchat-header">
                    <div class="embedchat-header-title">
                        <div class="embedchat-logo">{avatar}<div class="embedchat-status"></div></div>
                        <div class="embedchat-header-text">
                            <h3>{title}</h3>
                            <p>{subtitle}</p>
                        </div>
                    </div>
                    <div class="embedchat-controls">
                        <button class="embedchat-btn embedchat-minimize" title="Minimize">−</button>
                        <button class="embedchat-btn embedchat-close" title="Close">✕</button>
                    </div>
                </div>
                <div class="embedchat-messages"></div>
                <div class="embedchat-input-area">
                    <textarea class="embedchat-input" placeholder="Type your message..." rows="1"></textarea>
                    <button class="embedchat-send">→</button>
                </div>
            </div>
            "#,
            avatar = escape_html(&config.bot_avatar()),
            title = escape_html(&config.title),
            subtitle = escape_html(&config.subtitle),
        );
        root.set_inner_html(&html);

        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("No body element"))?;
        body.append_child(&root)?;

        Ok(Self {
            window: dom::find_in(&root, ".embedchat-window")?,
            header: dom::find_in(&root, ".embedchat-header")?,
            close_button: dom::find_in(&root, ".embedchat-close")?,
            minimize_button: dom::find_in(&root, ".embedchat-minimize")?,
            messages: dom::find_in(&root, ".embedchat-messages")?,
            input: dom::find_in(&root, ".embedchat-input")?,
            send_button: dom::find_in(&root, ".embedchat-send")?,
        })
    }
}

/// Reflects pipeline changes into the widget's DOM
pub struct DomView {
    document: Document,
    messages: Element,
    input: HtmlTextAreaElement,
    send_button: HtmlButtonElement,
    bot_avatar: String,
    typing: RefCell<Option<Element>>,
    suggestions: RefCell<Option<Element>>,
    on_session_adopted: RefCell<Option<js_sys::Function>>,
}

impl DomView {
    pub fn new(document: Document, elements: &WidgetElements, config: &WidgetConfig) -> Self {
        Self {
            document,
            messages: elements.messages.clone(),
            input: elements.input.clone(),
            send_button: elements.send_button.clone(),
            bot_avatar: escape_html(&config.bot_avatar()),
            typing: RefCell::new(None),
            suggestions: RefCell::new(None),
            on_session_adopted: RefCell::new(None),
        }
    }

    /// Register a page callback invoked with each newly adopted session id
    pub fn set_session_callback(&self, callback: js_sys::Function) {
        *self.on_session_adopted.borrow_mut() = Some(callback);
    }

    /// Render the quick-reply pills. `on_pick` receives the chosen text.
    pub fn show_suggestions<F>(&self, suggestions: &[String], on_pick: F) -> Result<(), JsValue>
    where
        F: Fn(String) + 'static,
    {
        if suggestions.is_empty() {
            return Ok(());
        }

        let container = dom::create_element_with_class(&self.document, "div", "embedchat-suggestions")?;
        let on_pick = Rc::new(on_pick);

        for suggestion in suggestions {
            let pill = dom::create_element_with_class(&self.document, "button", "embedchat-suggestion-pill")?;
            pill.set_text_content(Some(suggestion.as_str()));

            let text = suggestion.clone();
            let on_pick = Rc::clone(&on_pick);
            dom::add_click_listener(&pill, move || on_pick(text.clone()))?;

            container.append_child(&pill)?;
        }

        self.messages.append_child(&container)?;
        dom::scroll_to_bottom(&self.messages);
        *self.suggestions.borrow_mut() = Some(container);
        Ok(())
    }

    pub fn resize_input(&self, max_height_px: u32) {
        let style = self.input.style();
        let _ = style.set_property("height", "auto");
        let height = self.input.scroll_height().max(0).min(max_height_px as i32);
        let _ = style.set_property("height", &format!("{}px", height));
    }

    fn avatar_for(&self, sender: Sender) -> &str {
        match sender {
            Sender::User => "U",
            Sender::Bot => &self.bot_avatar,
        }
    }

    fn append_message(&self, message: &Message) -> Result<(), JsValue> {
        let sender = message.sender();
        let msg_div = dom::create_element_with_class(
            &self.document,
            "div",
            &format!("embedchat-message {}", sender),
        )?;

        // rendered_text is already escaped
        let html = format!(
            r#"<div class="embedchat-message-avatar">{}</div><div><div class="embedchat-message-content">{}</div><div class="embedchat-message-time">{}</div></div>"#,
            self.avatar_for(sender),
            message.rendered_text(),
            escape_html(message.timestamp())
        );
        msg_div.set_inner_html(&html);

        self.messages.append_child(&msg_div)?;
        dom::scroll_to_bottom(&self.messages);
        Ok(())
    }

    fn show_typing(&self) -> Result<(), JsValue> {
        if self.typing.borrow().is_some() {
            return Ok(());
        }

        let typing_div = dom::create_element_with_class(&self.document, "div", "embedchat-message bot")?;
        typing_div.set_inner_html(&format!(
            r#"<div class="embedchat-message-avatar">{}</div><div class="embedchat-typing"><span></span><span></span><span></span></div>"#,
            self.bot_avatar
        ));

        self.messages.append_child(&typing_div)?;
        dom::scroll_to_bottom(&self.messages);
        *self.typing.borrow_mut() = Some(typing_div);
        Ok(())
    }

    fn hide_typing(&self) {
        if let Some(element) = self.typing.borrow_mut().take() {
            element.remove();
        }
    }
}

impl PipelineView for DomView {
    fn message_appended(&self, message: &Message) {
        if let Err(e) = self.append_message(message) {
            log::error!("Failed to render message: {:?}", e);
        }
    }

    fn typing_changed(&self, typing: bool) {
        if typing {
            if let Err(e) = self.show_typing() {
                log::error!("Failed to show typing indicator: {:?}", e);
            }
        } else {
            self.hide_typing();
        }
    }

    fn input_enabled_changed(&self, enabled: bool) {
        self.input.set_disabled(!enabled);
        self.send_button.set_disabled(!enabled);
    }

    fn focus_input(&self) {
        let _ = self.input.focus();
    }

    fn clear_input(&self) {
        self.input.set_value("");
        let _ = self.input.style().set_property("height", "auto");
    }

    fn suggestions_hidden(&self) {
        if let Some(element) = self.suggestions.borrow_mut().take() {
            element.remove();
        }
    }

    fn session_adopted(&self, session_id: &str) {
        log::info!("Session continued as {}", session_id);
        if let Some(callback) = self.on_session_adopted.borrow().as_ref() {
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(session_id)) {
                log::warn!("Session callback failed: {:?}", e);
            }
        }
    }
}

/// The `tel:` target of a phone link under the event target, if any
pub fn phone_target(event: &web_sys::Event) -> Option<String> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let link = target.closest(".phone-link").ok().flatten()?;
    link.get_attribute("data-tel")
        .filter(|tel| tel.starts_with("tel:"))
}
