use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::channel::oneshot::Sender as OneshotSender;
use futures::StreamExt;

use chromite_cdp::cdp::browser_protocol::page::{FrameId, GetFrameTreeParams};
use chromite_cdp::cdp::js_protocol::runtime::ExecutionContextId;
use chromite_cdp::cdp::browser_protocol::target::{
    AttachToTargetParams, CloseTargetParams, SessionId, TargetId, TargetInfo,
};
use chromite_cdp::cdp::events::{CdpEvent, CdpEventMessage};
use chromite_types::{Command, Method, Request, Response};

use crate::cmd::{CommandChain, CommandMessage};
use crate::dialog::Dialog;
use crate::error::{CdpError, Result};
use crate::handler::emulation::EmulationManager;
use crate::handler::frame::{
    FrameEvent, FrameManager, FrameRequestedNavigation, NavigationError, NavigationId,
    NavigationOk,
};
use crate::handler::emulation::Viewport;
use crate::handler::network::{Credentials, HttpRequest, NetworkEvent, NetworkManager};
use crate::handler::page::{PageEvent, PageHandle, PageInner};
use crate::listeners::{Subscription, Subscriptions};
use crate::page::Page;
use std::time::Duration;

macro_rules! advance_state {
    ($s:ident, $cx:ident, $now:ident, $cmds:ident, $next_state:expr) => {{
        if let Poll::Ready(poll) = $cmds.poll($now) {
            return match poll {
                None => {
                    $s.init_state = $next_state;
                    $s.poll($cx, $now)
                }
                Some(Ok((method, params))) => Some(TargetEvent::Request(Request {
                    method,
                    session_id: $s.session_id.clone().map(Into::into),
                    params,
                })),
                Some(Err(_)) => Some($s.on_initialization_failed()),
            };
        } else {
            return None;
        }
    }};
}

/// The kind of thing a target represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Page,
    BackgroundPage,
    ServiceWorker,
    SharedWorker,
    Browser,
    Other(String),
}

impl TargetType {
    pub fn new(kind: &str) -> Self {
        match kind {
            "page" => TargetType::Page,
            "background_page" => TargetType::BackgroundPage,
            "service_worker" => TargetType::ServiceWorker,
            "shared_worker" => TargetType::SharedWorker,
            "browser" => TargetType::Browser,
            other => TargetType::Other(other.to_string()),
        }
    }

    /// Whether this target is driven as a page.
    pub fn is_page(&self) -> bool {
        matches!(self, TargetType::Page | TargetType::BackgroundPage)
    }
}

/// How a new target should be initialized.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub ignore_https_errors: bool,
    pub request_timeout: Duration,
    pub viewport: Option<Viewport>,
    pub request_intercept: bool,
    pub cache_enabled: bool,
    pub extra_headers: Option<HashMap<String, String>>,
    pub credentials: Option<Credentials>,
}

pub(crate) struct Target {
    /// Info about this target as reported by the browser
    info: TargetInfo,
    r#type: TargetType,
    config: TargetConfig,
    /// Maintains the state of all frames and tracks navigations
    frame_manager: FrameManager,
    /// Tracks all requests and the interception machinery
    network_manager: NetworkManager,
    emulation_manager: EmulationManager,
    /// The identifier of the session this target is attached to
    session_id: Option<SessionId>,
    /// The handle of the page of this target, if one was created
    page: Option<PageHandle>,
    /// Drives this target towards being usable
    init_state: TargetInit,
    /// Whether initialization completion was already observed
    initialized_announced: bool,
    /// Set once when initialization completes, consumed by the handler
    just_initialized: bool,
    /// Events to report to the handler
    queued_events: VecDeque<TargetEvent>,
    /// All registered event subscriptions scoped to this target
    subscriptions: Subscriptions,
    /// Senders notified once the main frame finished loading
    wait_for_frame_navigation: Vec<OneshotSender<Option<Arc<HttpRequest>>>>,
    /// The sender who requested the page
    initiator: Option<OneshotSender<Result<Page>>>,
}

impl Target {
    /// Create a new target instance after a `Target.targetCreated` event.
    pub fn new(info: TargetInfo, config: TargetConfig) -> Self {
        let r#type = TargetType::new(&info.r#type);
        let mut network_manager =
            NetworkManager::new(config.ignore_https_errors, config.request_timeout);

        if !config.cache_enabled {
            network_manager.set_cache_enabled(false);
        }
        if config.request_intercept {
            network_manager.set_request_interception(true);
        }
        if let Some(credentials) = config.credentials.clone() {
            network_manager.authenticate(credentials);
        }
        if let Some(headers) = config.extra_headers.clone() {
            network_manager.set_extra_headers(headers);
        }

        Self {
            info,
            r#type,
            frame_manager: FrameManager::new(config.request_timeout),
            network_manager,
            emulation_manager: EmulationManager::new(config.request_timeout),
            config,
            session_id: None,
            page: None,
            init_state: TargetInit::AttachToTarget,
            initialized_announced: false,
            just_initialized: false,
            queued_events: Default::default(),
            subscriptions: Default::default(),
            wait_for_frame_navigation: Default::default(),
            initiator: None,
        }
    }

    pub fn set_session_id(&mut self, id: SessionId) {
        self.session_id = Some(id)
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn session_id_mut(&mut self) -> &mut Option<SessionId> {
        &mut self.session_id
    }

    /// The identifier for this target
    pub fn target_id(&self) -> &TargetId {
        &self.info.target_id
    }

    pub fn r#type(&self) -> &TargetType {
        &self.r#type
    }

    pub fn is_page(&self) -> bool {
        self.r#type.is_page()
    }

    pub fn info(&self) -> &TargetInfo {
        &self.info
    }

    /// Get the target that opened this target. Top-level targets return
    /// `None`.
    pub fn opener_id(&self) -> Option<&TargetId> {
        self.info.opener_id.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.init_state, TargetInit::Initialized)
    }

    /// Consumes the one-shot flag set when initialization completed.
    pub fn take_just_initialized(&mut self) -> bool {
        std::mem::take(&mut self.just_initialized)
    }

    pub fn frame_manager(&self) -> &FrameManager {
        &self.frame_manager
    }

    /// Updates the target info and reports whether the change is observable
    /// by the caller.
    pub fn on_info_changed(&mut self, info: TargetInfo) -> bool {
        let changed = self.info.url != info.url || self.info.r#type != info.r#type;
        self.r#type = TargetType::new(&info.r#type);
        self.info = info;
        changed && self.is_initialized()
    }

    /// Navigate the main frame
    pub fn goto(&mut self, req: FrameRequestedNavigation) {
        self.frame_manager.goto(req)
    }

    pub fn set_initiator(&mut self, tx: OneshotSender<Result<Page>>) {
        self.initiator = Some(tx)
    }

    fn create_page(&mut self) {
        if self.page.is_none() {
            if let Some(session) = self.session_id.clone() {
                let handle = PageHandle::new(
                    self.target_id().clone(),
                    session,
                    self.opener_id().cloned(),
                );
                self.page = Some(handle);
            }
        }
    }

    /// Tries to create the `PageInner` if this target is attached already
    pub(crate) fn get_or_create_page(&mut self) -> Option<&Arc<PageInner>> {
        self.create_page();
        self.page.as_ref().map(|p| p.inner())
    }

    /// Received a response to a command issued by this target
    pub fn on_response(&mut self, resp: Response, method: &str) {
        if let Some(cmds) = self.init_state.commands_mut() {
            cmds.received_response(method);
        }

        if let Some(err) = resp.error {
            // side effects of event processing are allowed to fail, e.g. when
            // the target went away mid flight
            tracing::debug!(%method, %err, "command issued by target failed");
            return;
        }

        if method == GetFrameTreeParams::IDENTIFIER {
            if let Some(tree) = resp
                .result
                .and_then(|val| GetFrameTreeParams::response_from_value(val).ok())
            {
                self.frame_manager.on_frame_tree(tree.frame_tree);
            }
        }
    }

    /// Process an incoming event scoped to this target's session
    pub fn on_event(&mut self, event: CdpEventMessage) {
        let CdpEventMessage { params, method, .. } = event;

        match &params {
            // `FrameManager` events
            CdpEvent::PageFrameAttached(ev) => self
                .frame_manager
                .on_frame_attached(ev.frame_id.clone(), Some(ev.parent_frame_id.clone())),
            CdpEvent::PageFrameDetached(ev) => self.frame_manager.on_frame_detached(ev),
            CdpEvent::PageFrameNavigated(ev) => self.frame_manager.on_frame_navigated(&ev.frame),
            CdpEvent::PageNavigatedWithinDocument(ev) => {
                self.frame_manager.on_frame_navigated_within_document(ev)
            }
            CdpEvent::PageFrameStartedLoading(ev) => {
                self.frame_manager.on_frame_started_loading(ev)
            }
            CdpEvent::PageFrameStoppedLoading(ev) => {
                self.frame_manager.on_frame_stopped_loading(ev)
            }
            CdpEvent::PageLifecycleEvent(ev) => self.frame_manager.on_page_lifecycle_event(ev),
            CdpEvent::RuntimeExecutionContextCreated(ev) => {
                self.frame_manager.on_execution_context_created(ev)
            }
            CdpEvent::RuntimeExecutionContextDestroyed(ev) => {
                self.frame_manager.on_execution_context_destroyed(ev)
            }
            CdpEvent::RuntimeExecutionContextsCleared(_) => {
                self.frame_manager.on_execution_contexts_cleared()
            }
            // `NetworkManager` events
            CdpEvent::NetworkRequestWillBeSent(ev) => {
                self.network_manager.on_request_will_be_sent(ev)
            }
            CdpEvent::NetworkRequestIntercepted(ev) => {
                self.network_manager.on_request_intercepted(ev)
            }
            CdpEvent::NetworkRequestServedFromCache(ev) => {
                self.network_manager.on_request_served_from_cache(ev)
            }
            CdpEvent::NetworkResponseReceived(ev) => self.network_manager.on_response_received(ev),
            CdpEvent::NetworkLoadingFinished(ev) => self.network_manager.on_loading_finished(ev),
            CdpEvent::NetworkLoadingFailed(ev) => self.network_manager.on_loading_failed(ev),
            // dialogs are handed to the page as ready-to-answer objects
            CdpEvent::PageJavascriptDialogOpening(ev) => {
                self.create_page();
                if let Some(handle) = self.page.as_ref() {
                    let dialog = Dialog::new(Arc::clone(handle.inner()), ev);
                    handle.send_event(PageEvent::Dialog(dialog));
                }
            }
            _ => {}
        }

        chromite_cdp::consume_event!(match params {
            |ev| self.subscriptions.dispatch(ev),
            |json| { let _ = self.subscriptions.dispatch_custom(&method, json); }
        });
    }

    /// Called when an init command failed or timed out
    fn on_initialization_failed(&mut self) -> TargetEvent {
        if let Some(initiator) = self.initiator.take() {
            let _ = initiator.send(Err(CdpError::Timeout));
        }
        self.init_state = TargetInit::Closing;
        let close_target = CloseTargetParams::new(self.info.target_id.clone());
        TargetEvent::Request(Request {
            method: close_target.identifier(),
            session_id: self.session_id.clone().map(Into::into),
            params: serde_json::to_value(close_target).unwrap_or_default(),
        })
    }

    /// Advance this target's state
    pub(crate) fn poll(&mut self, cx: &mut Context<'_>, now: Instant) -> Option<TargetEvent> {
        if !self.is_page() {
            // only pages are driven, other target kinds are merely tracked
            return None;
        }

        match &mut self.init_state {
            TargetInit::AttachToTarget => {
                self.init_state = TargetInit::InitializingFrame(FrameManager::init_commands(
                    self.config.request_timeout,
                ));
                let params = AttachToTargetParams::new(self.target_id().clone());
                return Some(TargetEvent::Request(Request::new(
                    params.identifier(),
                    serde_json::to_value(params).unwrap_or_default(),
                )));
            }
            TargetInit::InitializingFrame(cmds) => {
                self.session_id.as_ref()?;
                advance_state!(
                    self,
                    cx,
                    now,
                    cmds,
                    TargetInit::InitializingNetwork(self.network_manager.init_commands())
                );
            }
            TargetInit::InitializingNetwork(cmds) => {
                advance_state!(
                    self,
                    cx,
                    now,
                    cmds,
                    match self.config.viewport.as_ref() {
                        Some(viewport) => TargetInit::InitializingEmulation(
                            self.emulation_manager.init_commands(viewport),
                        ),
                        None => TargetInit::Initialized,
                    }
                );
            }
            TargetInit::InitializingEmulation(cmds) => {
                advance_state!(self, cx, now, cmds, TargetInit::Initialized);
            }
            TargetInit::Initialized => {
                if !self.initialized_announced {
                    self.initialized_announced = true;
                    self.just_initialized = true;
                }
            }
            TargetInit::Closing => return None,
        }

        loop {
            if let Some(event) = self.queued_events.pop_front() {
                return Some(event);
            }

            // drain messages the public page surface sent
            let mut messages = Vec::new();
            if let Some(handle) = self.page.as_mut() {
                while let Poll::Ready(Some(msg)) = handle.rx.poll_next_unpin(cx) {
                    messages.push(msg);
                }
            }
            for msg in messages {
                match msg {
                    TargetMessage::Command(msg) => {
                        self.queued_events.push_back(TargetEvent::Command(msg))
                    }
                    TargetMessage::WaitForNavigation(tx) => {
                        self.wait_for_frame_navigation.push(tx)
                    }
                    TargetMessage::GetExecutionContext { frame_id, tx } => {
                        let _ = tx.send(self.frame_execution_context(frame_id.as_ref()));
                    }
                    TargetMessage::Subscribe(subscription) => {
                        self.subscriptions.add(subscription)
                    }
                    TargetMessage::SetRequestInterception(enabled) => {
                        self.network_manager.set_request_interception(enabled)
                    }
                    TargetMessage::Authenticate(credentials) => {
                        self.network_manager.authenticate(credentials)
                    }
                    TargetMessage::SetCacheEnabled(enabled) => {
                        self.network_manager.set_cache_enabled(enabled)
                    }
                    TargetMessage::SetOfflineMode(offline) => {
                        self.network_manager.set_offline_mode(offline)
                    }
                    TargetMessage::SetExtraHeaders(headers) => {
                        self.network_manager.set_extra_headers(headers)
                    }
                }
            }

            // advance the tracked navigation
            if let Some(event) = self.frame_manager.poll(now) {
                match event {
                    FrameEvent::NavigationRequest(id, mut req) => {
                        req.session_id = self.session_id.clone().map(Into::into);
                        return Some(TargetEvent::NavigationRequest(id, req));
                    }
                    FrameEvent::NavigationResult(res) => {
                        return Some(TargetEvent::NavigationResult(res));
                    }
                }
            }

            // drain the network manager
            while let Some(event) = self.network_manager.poll() {
                match event {
                    NetworkEvent::SendCdpRequest(method, params) => {
                        self.queued_events.push_back(TargetEvent::Request(Request {
                            method,
                            session_id: self.session_id.clone().map(Into::into),
                            params,
                        }))
                    }
                    NetworkEvent::Request(request) => {
                        self.forward_page_event(PageEvent::Request(request))
                    }
                    NetworkEvent::Response(request) => {
                        self.forward_page_event(PageEvent::Response(request))
                    }
                    NetworkEvent::RequestFailed(request) => {
                        self.forward_page_event(PageEvent::RequestFailed(request))
                    }
                    NetworkEvent::RequestFinished(request) => {
                        self.frame_manager.on_request_finished(Arc::clone(&request));
                        self.forward_page_event(PageEvent::RequestFinished(request))
                    }
                }
            }

            // notify waiters once the main frame finished loading
            if let Some(frame) = self.frame_manager.main_frame() {
                if frame.is_loaded() {
                    let request = frame.http_request().cloned();
                    while let Some(tx) = self.wait_for_frame_navigation.pop() {
                        let _ = tx.send(request.clone());
                    }
                }
            }

            // a resolved initiator receives the page once it finished loading
            if let Some(initiator) = self.initiator.take() {
                if self
                    .frame_manager
                    .main_frame()
                    .map(|frame| frame.is_loaded())
                    .unwrap_or_default()
                {
                    if let Some(page) = self.get_or_create_page() {
                        let _ = initiator.send(Ok(Page::from(Arc::clone(page))));
                    }
                } else {
                    self.initiator = Some(initiator);
                }
            }

            if self.queued_events.is_empty() {
                return None;
            }
        }
    }

    fn forward_page_event(&mut self, event: PageEvent) {
        self.create_page();
        if let Some(handle) = self.page.as_ref() {
            handle.send_event(event);
        }
    }

    /// The default execution context of the frame, or of the main frame.
    fn frame_execution_context(
        &self,
        frame_id: Option<&FrameId>,
    ) -> Result<ExecutionContextId> {
        let frame = match frame_id {
            Some(id) => self
                .frame_manager
                .frame(id)
                .ok_or_else(|| CdpError::DetachedFrame(id.clone()))?,
            None => self
                .frame_manager
                .main_frame()
                .ok_or_else(|| CdpError::msg("main frame is not available yet"))?,
        };
        frame
            .execution_context()
            .ok_or(CdpError::ExecutionContextDestroyed)
    }
}

/// The state the target initialization is in.
#[derive(Debug)]
pub(crate) enum TargetInit {
    AttachToTarget,
    InitializingFrame(CommandChain),
    InitializingNetwork(CommandChain),
    InitializingEmulation(CommandChain),
    Initialized,
    Closing,
}

impl TargetInit {
    fn commands_mut(&mut self) -> Option<&mut CommandChain> {
        match self {
            TargetInit::InitializingFrame(cmds) => Some(cmds),
            TargetInit::InitializingNetwork(cmds) => Some(cmds),
            TargetInit::InitializingEmulation(cmds) => Some(cmds),
            TargetInit::AttachToTarget | TargetInit::Initialized | TargetInit::Closing => None,
        }
    }
}

/// Events the target reports to the handler while being polled
#[derive(Debug)]
pub(crate) enum TargetEvent {
    /// An internal request whose response is routed back to this target
    Request(Request),
    /// A message from the page that the handler has to submit
    Command(CommandMessage),
    /// A navigation request ready to be sent to the browser
    NavigationRequest(NavigationId, Request),
    /// A tracked navigation settled
    NavigationResult(Result<NavigationOk, NavigationError>),
}

/// Messages the public page surface sends to its target
#[derive(Debug)]
pub(crate) enum TargetMessage {
    Command(CommandMessage),
    WaitForNavigation(OneshotSender<Option<Arc<HttpRequest>>>),
    GetExecutionContext {
        frame_id: Option<FrameId>,
        tx: OneshotSender<Result<ExecutionContextId>>,
    },
    Subscribe(Subscription),
    SetRequestInterception(bool),
    Authenticate(Credentials),
    SetCacheEnabled(bool),
    SetOfflineMode(bool),
    SetExtraHeaders(HashMap<String, String>),
}
