//! Browser binding.
//!
//! Wires the client core to `web_sys::WebSocket` callbacks and the live DOM.
//! Built for `wasm32` only; the JavaScript glue calls [`start_live_patch`]
//! once per page load.

use std::rc::Rc;

use js_sys::{Function, Reflect};
use lp_protocol::{ClientOptions, ClosePolicy, PageLocation, Scheme};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Event, MessageEvent, WebSocket, Window};

use crate::{ClientError, Highlighter, LivePatchClient, Page};

/// The page the script was loaded into.
pub struct BrowserPage {
    window: Window,
    document: Document,
}

impl BrowserPage {
    /// Bind to the global window and document.
    ///
    /// # Errors
    ///
    /// Returns an error outside a browsing context.
    pub fn from_window() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        Ok(Self { window, document })
    }
}

impl Page for BrowserPage {
    fn location(&self) -> PageLocation {
        let location = self.window.location();
        let protocol = location.protocol().unwrap_or_default();
        PageLocation::new(
            Scheme::from_protocol(&protocol),
            location.host().unwrap_or_default(),
            location.pathname().unwrap_or_default(),
        )
    }

    fn reload(&self) {
        if let Err(err) = self.window.location().reload() {
            tracing::error!(?err, "Cannot reload page");
        }
    }

    fn replace_content(&self, selector: &str, html: &str) -> Result<(), ClientError> {
        match self.document.query_selector(selector) {
            Ok(Some(anchor)) => {
                anchor.set_inner_html(html);
                Ok(())
            }
            Ok(None) => Err(ClientError::MissingAnchor(selector.to_owned())),
            Err(err) => Err(ClientError::Dom(format!("{err:?}"))),
        }
    }

    fn dispatch_load(&self) {
        let dispatched = Event::new("load").and_then(|event| self.document.dispatch_event(&event));
        if let Err(err) = dispatched {
            tracing::warn!(?err, "Cannot dispatch load event");
        }
    }
}

/// Re-runs highlight.js when the page has it.
///
/// Looks `window.hljs` up on every call, so a library loaded after the
/// client started is still picked up.
pub struct HljsHighlighter {
    window: Window,
}

impl HljsHighlighter {
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Highlighter for HljsHighlighter {
    fn rehighlight(&self) {
        let Ok(hljs) = Reflect::get(&self.window, &JsValue::from_str("hljs")) else {
            return;
        };
        if !hljs.is_object() {
            return;
        }
        let Ok(init) = Reflect::get(&hljs, &JsValue::from_str("initHighlighting")) else {
            return;
        };
        let Some(init) = init.dyn_ref::<Function>() else {
            return;
        };
        // initHighlighting only runs once unless its flag is reset.
        if let Err(err) = Reflect::set(init, &JsValue::from_str("called"), &JsValue::FALSE) {
            tracing::debug!(?err, "Cannot reset highlight.js flag");
        }
        if let Err(err) = init.call0(&hljs) {
            tracing::warn!(?err, "highlight.js failed");
        }
    }
}

#[wasm_bindgen(start)]
pub fn init_logging() {
    wasm_logger::init(wasm_logger::Config::default());
}

/// Open the live-patch socket for the current page.
///
/// `reload_on_close` selects [`ClosePolicy::Reload`]; `content_selector`
/// overrides the default `main` anchor.
///
/// # Errors
///
/// Returns an error outside a browsing context or when the socket cannot be
/// created.
#[wasm_bindgen(js_name = startLivePatch)]
pub fn start_live_patch(
    reload_on_close: bool,
    content_selector: Option<String>,
) -> Result<(), JsValue> {
    let mut options = ClientOptions::default();
    if reload_on_close {
        options.close_policy = ClosePolicy::Reload;
    }
    if let Some(selector) = content_selector {
        options.content_selector = selector;
    }
    start_with_options(options)
}

/// Open the live-patch socket with explicit options.
///
/// # Errors
///
/// Returns an error outside a browsing context or when the socket cannot be
/// created.
pub fn start_with_options(options: ClientOptions) -> Result<(), JsValue> {
    let page = BrowserPage::from_window()?;
    let window = page.window.clone();
    let client = Rc::new(
        LivePatchClient::new(page, options).with_highlighter(HljsHighlighter::new(window.clone())),
    );

    let url = client.socket_url();
    tracing::info!(%url, "Opening live patch socket");
    let socket = WebSocket::new(&url)?;

    let client_open = Rc::clone(&client);
    let socket_open = socket.clone();
    let onopen = Closure::wrap(Box::new(move |_e: JsValue| {
        if let Some(frame) = client_open.on_open()
            && let Err(err) = socket_open.send_with_str(&frame)
        {
            tracing::warn!(?err, "Cannot send page path");
        }
    }) as Box<dyn FnMut(JsValue)>);
    socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    let client_message = Rc::clone(&client);
    let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
        if let Some(text) = e.data().as_string() {
            // Failures are logged by the client.
            let _ = client_message.on_message(&text);
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    let client_close = Rc::clone(&client);
    let onclose = Closure::wrap(Box::new(move |_e: JsValue| {
        client_close.on_close();
    }) as Box<dyn FnMut(JsValue)>);
    socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    let client_unload = Rc::clone(&client);
    let socket_unload = socket.clone();
    let onunload = Closure::wrap(Box::new(move |_e: JsValue| {
        if client_unload.on_unload()
            && let Err(err) = socket_unload.close()
        {
            tracing::debug!(?err, "Cannot close live patch socket");
        }
    }) as Box<dyn FnMut(JsValue)>);
    window.add_event_listener_with_callback("beforeunload", onunload.as_ref().unchecked_ref())?;
    onunload.forget();

    Ok(())
}
