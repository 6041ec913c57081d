use std::collections::HashMap;
use std::time::Duration;

use futures::channel::mpsc::{channel, unbounded, Sender};
use futures::channel::oneshot::channel as oneshot_channel;
use futures::SinkExt;

use chromite_cdp::cdp::browser_protocol::browser::{GetVersionParams, GetVersionReturns};
use chromite_cdp::cdp::browser_protocol::target::{CreateTargetParams, TargetInfo};
use chromite_cdp::cdp::IntoEventKind;
use chromite_types::{Command, CommandResponse};

use crate::cmd::{to_command_response, CommandMessage};
use crate::conn::Connection;
use crate::error::Result;
use crate::fanout::InvocationList;
use crate::handler::network::Credentials;
use crate::handler::emulation::Viewport;
use crate::handler::{Handler, HandlerConfig, HandlerMessage, REQUEST_TIMEOUT};
use crate::listeners::{EventStream, Subscription};
use crate::page::Page;

/// The entry point to a browser instance reachable over its devtools
/// websocket endpoint.
///
/// Connecting returns a `(Browser, Handler)` pair; the [`Handler`] is a
/// stream the caller must drive (e.g. in a spawned task) for anything to make
/// progress.
pub struct Browser {
    /// Communication channel to the background handler
    sender: Sender<HandlerMessage>,
    config: BrowserConfig,
    /// Guards `close` against double execution
    is_closed: bool,
    /// Invoked after the browser closed and the handler quiesced
    on_closed: InvocationList<()>,
    /// Invoked after the connection was abandoned, with the browser process
    /// left running
    on_disconnected: InvocationList<()>,
}

impl Browser {
    /// Connect to an already running browser instance via its websocket
    /// debugger url.
    pub async fn connect(config: BrowserConfig) -> Result<(Self, Handler)> {
        // fail early on an unusable endpoint
        let ws_url = url::Url::parse(&config.ws_url)?;
        let conn = Connection::connect(ws_url.as_str()).await?;

        let (tx, rx) = channel(1);
        let handler = Handler::new(conn, rx, config.handler_config());

        let browser = Self {
            sender: tx,
            config,
            is_closed: false,
            on_closed: Default::default(),
            on_disconnected: Default::default(),
        };
        Ok((browser, handler))
    }

    /// Connect with default configuration.
    pub async fn connect_to(ws_url: impl Into<String>) -> Result<(Self, Handler)> {
        Self::connect(BrowserConfig::new(ws_url)).await
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Execute a protocol command on the browser's root session.
    pub async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        let (tx, rx) = oneshot_channel();
        let method = cmd.identifier();
        let msg = CommandMessage::new(cmd, tx)?;

        self.sender
            .clone()
            .send(HandlerMessage::Command(msg))
            .await?;
        let resp = rx.await??;
        to_command_response::<T>(resp, method)
    }

    /// Create a new page, navigated to the given url, and wait for it to be
    /// usable.
    pub async fn new_page(&self, params: impl Into<CreateTargetParams>) -> Result<Page> {
        let (tx, rx) = oneshot_channel();
        self.sender
            .clone()
            .send(HandlerMessage::CreatePage(params.into(), tx))
            .await?;
        rx.await?
    }

    /// All pages of initialized targets.
    pub async fn pages(&self) -> Result<Vec<Page>> {
        let (tx, rx) = oneshot_channel();
        self.sender.clone().send(HandlerMessage::GetPages(tx)).await?;
        Ok(rx.await?)
    }

    /// A snapshot of all targets the browser currently tracks.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        let (tx, rx) = oneshot_channel();
        self.sender
            .clone()
            .send(HandlerMessage::GetTargets(tx))
            .await?;
        Ok(rx.await?)
    }

    /// Version information about the browser.
    pub async fn version(&self) -> Result<GetVersionReturns> {
        Ok(self.execute(GetVersionParams::default()).await?.result)
    }

    /// The user agent the browser identifies as.
    pub async fn user_agent(&self) -> Result<String> {
        Ok(self.version().await?.user_agent)
    }

    /// Subscribe to a typed browser-wide protocol event.
    pub async fn event_listener<T: IntoEventKind + Unpin>(&self) -> Result<EventStream<T>> {
        let (tx, rx) = unbounded();
        self.sender
            .clone()
            .send(HandlerMessage::Subscribe(Subscription::new::<T>(tx)))
            .await?;
        Ok(EventStream::new(rx))
    }

    /// Subscribers invoked once the browser has been closed.
    pub fn on_closed(&self) -> &InvocationList<()> {
        &self.on_closed
    }

    /// Subscribers invoked once the connection has been abandoned.
    pub fn on_disconnected(&self) -> &InvocationList<()> {
        &self.on_disconnected
    }

    /// Close the browser gracefully.
    ///
    /// Idempotent; the second call is a no-op. The handler stream ends once
    /// the browser acknowledged the close, so by the time the closed
    /// subscribers run no further events are delivered.
    pub async fn close(&mut self) -> Result<()> {
        if self.is_closed {
            return Ok(());
        }
        self.is_closed = true;

        let (tx, rx) = oneshot_channel();
        self.sender
            .clone()
            .send(HandlerMessage::CloseBrowser(tx))
            .await?;
        // in-flight sends racing the close are expected to fail with
        // `TargetClosed`; the close itself tolerates that too
        match rx.await {
            Ok(Ok(_)) | Err(_) => {}
            Ok(Err(err)) => {
                tracing::warn!("browser close returned an error: {err}");
            }
        }
        self.on_closed.invoke_sync(&());
        Ok(())
    }

    /// Abandon the connection. The browser process keeps running.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.is_closed {
            return Ok(());
        }
        self.is_closed = true;
        self.sender.clone().send(HandlerMessage::Disconnect).await?;
        self.on_disconnected.invoke_sync(&());
        Ok(())
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("config", &self.config)
            .field("is_closed", &self.is_closed)
            .finish()
    }
}

/// How to connect to the browser and configure its targets.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// The websocket debugger url, e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`
    pub ws_url: String,
    /// Whether certificate errors should be ignored. Defaults to true.
    pub ignore_https_errors: bool,
    /// Whether the browser was launched in app mode (no browser UI). Process
    /// launching itself is up to the caller.
    pub app_mode: bool,
    /// The viewport to apply to every page.
    pub default_viewport: Option<Viewport>,
    /// Timeout for a command until its response must arrive.
    pub request_timeout: Duration,
    /// Enable request interception for every page from the start.
    pub request_intercept: bool,
    /// Whether pages use the browser cache. Defaults to true.
    pub cache_enabled: bool,
    /// Headers attached to every request of every page.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Credentials offered whenever a page hits an auth challenge.
    pub credentials: Option<Credentials>,
}

impl BrowserConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            ignore_https_errors: true,
            app_mode: false,
            default_viewport: Some(Viewport::default()),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT),
            request_intercept: false,
            cache_enabled: true,
            extra_headers: None,
            credentials: None,
        }
    }

    pub fn with_viewport(mut self, viewport: Option<Viewport>) -> Self {
        self.default_viewport = viewport;
        self
    }

    pub fn with_request_intercept(mut self, enabled: bool) -> Self {
        self.request_intercept = enabled;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub(crate) fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            ignore_https_errors: self.ignore_https_errors,
            viewport: self.default_viewport.clone(),
            request_timeout: self.request_timeout,
            request_intercept: self.request_intercept,
            cache_enabled: self.cache_enabled,
            extra_headers: self.extra_headers.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

#[cfg(test)]
impl Browser {
    /// A browser wired to a bare channel instead of a live connection, so
    /// the message-level behavior can be exercised without a websocket.
    fn detached(config: BrowserConfig) -> (Self, futures::channel::mpsc::Receiver<HandlerMessage>) {
        let (tx, rx) = channel(1);
        let browser = Self {
            sender: tx,
            config,
            is_closed: false,
            on_closed: Default::default(),
            on_disconnected: Default::default(),
        };
        (browser, rx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;

    use chromite_cdp::cdp::browser_protocol::browser::CloseReturns;

    use crate::fanout::Subscriber;

    use super::*;

    #[test]
    fn default_config_uses_sane_defaults() {
        let config = BrowserConfig::new("ws://127.0.0.1:9222/devtools/browser/1");
        assert!(config.ignore_https_errors);
        assert!(config.cache_enabled);
        assert!(!config.request_intercept);
        assert_eq!(
            config.request_timeout,
            Duration::from_millis(REQUEST_TIMEOUT)
        );
    }

    #[tokio::test]
    async fn close_is_a_noop_the_second_time() {
        let (mut browser, mut from_browser) =
            Browser::detached(BrowserConfig::new("ws://127.0.0.1:9222/devtools/browser/1"));

        let closed = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&closed);
        browser.on_closed().add(Subscriber::sync(move |_| {
            *counter.lock().unwrap() += 1;
        }));

        // acknowledge exactly one close request, then hang up like a
        // quiesced handler
        let acknowledge = tokio::task::spawn(async move {
            let mut close_requests = 0usize;
            if let Some(HandlerMessage::CloseBrowser(tx)) = from_browser.next().await {
                let _ = tx.send(Ok(CloseReturns {}));
                close_requests += 1;
            }
            close_requests
        });

        browser.close().await.unwrap();
        // the second call returns without touching the channel; a resent
        // close would fail on the dropped receiver
        browser.close().await.unwrap();

        assert_eq!(acknowledge.await.unwrap(), 1);
        assert_eq!(*closed.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn disconnect_after_close_is_a_noop() {
        let (mut browser, mut from_browser) =
            Browser::detached(BrowserConfig::new("ws://127.0.0.1:9222/devtools/browser/1"));

        let disconnected = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&disconnected);
        browser.on_disconnected().add(Subscriber::sync(move |_| {
            *flag.lock().unwrap() = true;
        }));

        let acknowledge = tokio::task::spawn(async move {
            if let Some(HandlerMessage::CloseBrowser(tx)) = from_browser.next().await {
                let _ = tx.send(Ok(CloseReturns {}));
            }
        });

        browser.close().await.unwrap();
        browser.disconnect().await.unwrap();
        acknowledge.await.unwrap();

        assert!(!*disconnected.lock().unwrap());
    }
}
