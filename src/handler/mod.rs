use std::collections::HashMap;
use std::pin::Pin;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::channel::mpsc::Receiver;
use futures::channel::oneshot::Sender as OneshotSender;
use futures::stream::{Fuse, Stream, StreamExt};
use futures::task::{Context, Poll};
use futures::Future;
use futures_timer::Delay;

use chromite_cdp::cdp::browser_protocol::browser::CloseReturns;
use chromite_cdp::cdp::browser_protocol::target::{
    CreateTargetParams, EventTargetCreated, EventTargetDestroyed, EventTargetInfoChanged,
    SessionId, SetDiscoverTargetsParams, TargetId, TargetInfo,
};
use chromite_cdp::cdp::events::{CdpEvent, CdpEventMessage};
use chromite_types::{
    CallId, Message, Method, MethodId, Request as CdpRequest, Response,
};

use crate::cmd::{to_command_response, CommandMessage};
use crate::conn::Connection;
use crate::error::{CdpError, Result};
use crate::handler::frame::{
    FrameRequestedNavigation, NavigationError, NavigationId, NavigationOk,
};
use crate::handler::emulation::Viewport;
use crate::handler::network::Credentials;
use crate::handler::target::{Target, TargetConfig, TargetEvent};
use crate::listeners::{Subscription, Subscriptions};
use crate::page::Page;

/// Standard timeout in MS
pub const REQUEST_TIMEOUT: u64 = 30_000;

pub(crate) mod commandfuture;
pub mod emulation;
pub mod frame;
pub mod network;
pub(crate) mod page;
pub(crate) mod target;

pub(crate) use page::PageInner;

/// The handler that mirrors the state of the browser and drives all requests
/// and events.
///
/// This is the single place where per-session state is mutated: the caller
/// drives this stream, and every mutation happens on its poll path.
#[must_use = "streams do nothing unless polled"]
pub struct Handler {
    /// Commands that are being processed and awaiting a response from the
    /// browser, together with the timestamp the request started at
    pending_commands: FnvHashMap<CallId, (PendingRequest, MethodId, Instant)>,
    /// Messages from the `Browser` and the pages it handed out
    from_browser: Fuse<Receiver<HandlerMessage>>,
    /// Used to loop over all targets in a consistent manner
    target_ids: Vec<TargetId>,
    /// The created targets
    targets: HashMap<TargetId, Target>,
    /// Currently in-flight navigations
    navigations: FnvHashMap<NavigationId, NavigationRequest>,
    /// Routes attached sessions to the target they drive.
    ///
    /// There can be multiple sessions per target; the per-session request
    /// bookkeeping itself lives in the connection and `pending_commands`.
    sessions: HashMap<SessionId, TargetId>,
    /// The websocket connection to the browser instance
    conn: Connection<CdpEventMessage>,
    /// Sweeps `pending_commands` for requests whose deadline passed
    command_eviction: CommandEviction,
    /// The internal identifier for a specific navigation
    next_navigation_id: usize,
    /// How this handler configures targets
    config: HandlerConfig,
    /// All registered browser-wide event subscriptions
    subscriptions: Subscriptions,
    /// Set once the browser acknowledged the close
    closing: bool,
}

impl Handler {
    /// Create a new `Handler` that drives the connection and listens for
    /// messages on the receiver `rx`.
    pub(crate) fn new(
        mut conn: Connection<CdpEventMessage>,
        rx: Receiver<HandlerMessage>,
        config: HandlerConfig,
    ) -> Self {
        let discover = SetDiscoverTargetsParams::new(true);
        let _ = conn.submit_command(
            discover.identifier(),
            None,
            serde_json::to_value(discover).unwrap_or_default(),
        );

        Self {
            pending_commands: Default::default(),
            from_browser: rx.fuse(),
            target_ids: Default::default(),
            targets: Default::default(),
            navigations: Default::default(),
            sessions: Default::default(),
            conn,
            command_eviction: CommandEviction::new(config.request_timeout),
            next_navigation_id: 0,
            config,
            subscriptions: Default::default(),
            closing: false,
        }
    }

    /// Iterator over all currently tracked targets
    pub(crate) fn targets(&self) -> impl Iterator<Item = &Target> + '_ {
        self.targets.values()
    }

    /// received the response to a navigation request, e.g. `Page.navigate`
    fn on_navigation_response(&mut self, id: NavigationId, resp: Response) {
        if let Some(nav) = self.navigations.remove(&id) {
            match nav {
                NavigationRequest::Navigate(mut nav) => {
                    if nav.navigated {
                        let _ = nav.tx.send(Ok(resp));
                    } else {
                        nav.set_response(resp);
                        self.navigations.insert(id, NavigationRequest::Navigate(nav));
                    }
                }
            }
        }
    }

    /// A tracked navigation settled
    fn on_navigation_lifecycle_completed(&mut self, res: Result<NavigationOk, NavigationError>) {
        match res {
            Ok(ok) => {
                let id = *ok.navigation_id();
                if let Some(nav) = self.navigations.remove(&id) {
                    match nav {
                        NavigationRequest::Navigate(mut nav) => {
                            if let Some(resp) = nav.response.take() {
                                let _ = nav.tx.send(Ok(resp));
                            } else {
                                nav.set_navigated();
                                self.navigations.insert(id, NavigationRequest::Navigate(nav));
                            }
                        }
                    }
                }
            }
            Err(err) => {
                if let Some(nav) = self.navigations.remove(err.navigation_id()) {
                    match nav {
                        NavigationRequest::Navigate(nav) => {
                            let _ = nav.tx.send(Err(err.into()));
                        }
                    }
                }
            }
        }
    }

    /// Received a response to a request
    fn on_response(&mut self, resp: Response) {
        if let Some((req, method, _)) = self.pending_commands.remove(&resp.id) {
            match req {
                PendingRequest::CreateTarget(tx) => {
                    match to_command_response::<CreateTargetParams>(resp, method) {
                        Ok(resp) => {
                            if let Some(target) = self.targets.get_mut(&resp.target_id) {
                                // move the sender to the target, it sends the
                                // page once initialized and loaded
                                target.set_initiator(tx);
                            } else {
                                let _ = tx
                                    .send(Err(CdpError::InvalidTarget(resp.result.target_id)))
                                    .ok();
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err)).ok();
                        }
                    }
                }
                PendingRequest::Navigate(id) => {
                    self.on_navigation_response(id, resp);
                }
                PendingRequest::ExternalCommand(tx) => {
                    let _ = tx.send(Ok(resp)).ok();
                }
                PendingRequest::InternalCommand(target_id) => {
                    if let Some(target) = self.targets.get_mut(&target_id) {
                        target.on_response(resp, method.as_ref());
                    }
                }
                PendingRequest::CloseBrowser(tx) => {
                    self.closing = true;
                    let _ = tx.send(Ok(CloseReturns {})).ok();
                }
            }
        }
    }

    /// Submit a command initiated by the browser or a page
    pub(crate) fn submit_external_command(
        &mut self,
        msg: CommandMessage,
        now: Instant,
    ) -> Result<()> {
        let call_id = self
            .conn
            .submit_command(msg.method.clone(), msg.session_id, msg.params)?;
        self.pending_commands.insert(
            call_id,
            (PendingRequest::ExternalCommand(msg.sender), msg.method, now),
        );
        Ok(())
    }

    /// Submit a command issued by a target itself, e.g. initialization
    /// commands. Their responses are routed back to the target; errors are
    /// logged and swallowed.
    pub(crate) fn submit_internal_command(
        &mut self,
        target_id: TargetId,
        req: CdpRequest,
        now: Instant,
    ) -> Result<()> {
        let call_id = self.conn.submit_command(
            req.method.clone(),
            req.session_id.map(Into::into),
            req.params,
        )?;
        self.pending_commands.insert(
            call_id,
            (PendingRequest::InternalCommand(target_id), req.method, now),
        );
        Ok(())
    }

    /// Send the navigation request to the browser and store its identifier,
    /// so the response can be paired with the tracked navigation.
    fn submit_navigation(&mut self, id: NavigationId, req: CdpRequest, now: Instant) {
        if let Ok(call_id) = self.conn.submit_command(
            req.method.clone(),
            req.session_id.map(Into::into),
            req.params,
        ) {
            self.pending_commands
                .insert(call_id, (PendingRequest::Navigate(id), req.method, now));
        }
    }

    fn submit_close(&mut self, tx: OneshotSender<Result<CloseReturns>>, now: Instant) {
        let close = chromite_cdp::cdp::browser_protocol::browser::CloseParams::default();
        let method = close.identifier();
        if let Ok(call_id) =
            self.conn
                .submit_command(method.clone(), None, serde_json::to_value(close).unwrap_or_default())
        {
            self.pending_commands
                .insert(call_id, (PendingRequest::CloseBrowser(tx), method, now));
        }
    }

    /// Process a message received from the target's page
    fn on_target_message(&mut self, target: &mut Target, mut msg: CommandMessage, now: Instant) {
        if msg.is_navigation() {
            let opts = msg.nav_options.take().unwrap_or_default();
            let (req, tx) = msg.split();
            let id = self.next_navigation_id();

            target.goto(FrameRequestedNavigation::new(id, req, opts));

            self.navigations.insert(
                id,
                NavigationRequest::Navigate(NavigationInProgress::new(tx)),
            );
        } else {
            let _ = self.submit_external_command(msg, now);
        }
    }

    /// An identifier for queued `NavigationRequest`s.
    fn next_navigation_id(&mut self) -> NavigationId {
        let id = NavigationId(self.next_navigation_id);
        self.next_navigation_id = self.next_navigation_id.wrapping_add(1);
        id
    }

    /// Create a new page and send it to the receiver when ready.
    ///
    /// The `Target.createTarget` request triggers `Target.targetCreated`,
    /// which creates the `Target`. Once the response to the request arrives
    /// the initiator is moved into the target, which answers it with the
    /// `Page` after its initialization queue ran and the initial document
    /// finished loading.
    fn create_page(&mut self, params: CreateTargetParams, tx: OneshotSender<Result<Page>>) {
        let method = params.identifier();
        match serde_json::to_value(params) {
            Ok(params) => match self.conn.submit_command(method.clone(), None, params) {
                Ok(call_id) => {
                    self.pending_commands.insert(
                        call_id,
                        (PendingRequest::CreateTarget(tx), method, Instant::now()),
                    );
                }
                Err(err) => {
                    let _ = tx.send(Err(err.into())).ok();
                }
            },
            Err(err) => {
                let _ = tx.send(Err(err.into())).ok();
            }
        }
    }

    /// Process an incoming event read from the websocket
    fn on_event(&mut self, event: CdpEventMessage) -> Result<()> {
        if let Some(ref session_id) = event.session_id {
            if let Some(target_id) = self.sessions.get(session_id.as_str()) {
                if let Some(target) = self.targets.get_mut(target_id) {
                    target.on_event(event);
                    return Ok(());
                }
            }
        }
        let CdpEventMessage { params, method, .. } = event;

        match params {
            CdpEvent::TargetTargetCreated(ev) => self.on_target_created(ev),
            CdpEvent::TargetTargetInfoChanged(ev) => self.on_target_info_changed(ev)?,
            CdpEvent::TargetTargetDestroyed(ev) => self.on_target_destroyed(ev)?,
            CdpEvent::TargetAttachedToTarget(ev) => self.on_attached_to_target(*ev),
            CdpEvent::TargetDetachedFromTarget(ev) => self.on_detached_from_target(ev),
            params => {
                chromite_cdp::consume_event!(match params {
                    |ev| self.subscriptions.dispatch(ev),
                    |json| { let _ = self.subscriptions.dispatch_custom(&method, json); }
                });
            }
        }
        Ok(())
    }

    /// Fired when a new target was created on the browser instance.
    ///
    /// The `TargetCreated` browser event is only emitted once the target's
    /// initialization resolved, see the poll loop.
    fn on_target_created(&mut self, event: EventTargetCreated) {
        let target = Target::new(
            event.target_info,
            TargetConfig {
                ignore_https_errors: self.config.ignore_https_errors,
                request_timeout: self.config.request_timeout,
                viewport: self.config.viewport.clone(),
                request_intercept: self.config.request_intercept,
                cache_enabled: self.config.cache_enabled,
                extra_headers: self.config.extra_headers.clone(),
                credentials: self.config.credentials.clone(),
            },
        );
        let target_id = target.target_id().clone();
        if self.targets.insert(target_id.clone(), target).is_some() {
            tracing::warn!(target = %target_id, "duplicate targetCreated, replacing known target");
        } else {
            self.target_ids.push(target_id);
        }
    }

    /// The browser reported a change for a target it must have announced
    /// before; anything else is a protocol violation.
    fn on_target_info_changed(&mut self, event: EventTargetInfoChanged) -> Result<()> {
        let target_id = event.target_info.target_id.clone();
        let Some(target) = self.targets.get_mut(&target_id) else {
            return Err(CdpError::InvalidTarget(target_id));
        };
        if target.on_info_changed(event.target_info.clone()) {
            self.subscriptions.dispatch(event);
        }
        Ok(())
    }

    /// Fired when the target was destroyed in the browser
    fn on_target_destroyed(&mut self, event: EventTargetDestroyed) -> Result<()> {
        let Some(target) = self.targets.remove(&event.target_id) else {
            return Err(CdpError::InvalidTarget(event.target_id));
        };
        self.target_ids.retain(|id| id != &event.target_id);
        if let Some(session) = target.session_id() {
            self.sessions.remove(session);
        }
        if target.is_initialized() {
            self.subscriptions.dispatch(event);
        }
        // dropping the target drops the page channels, pending sends fail
        // with `TargetClosed`
        Ok(())
    }

    /// A new session got attached to a target
    fn on_attached_to_target(
        &mut self,
        event: chromite_cdp::cdp::browser_protocol::target::EventAttachedToTarget,
    ) {
        if let Some(target) = self.targets.get_mut(&event.target_info.target_id) {
            target.set_session_id(event.session_id.clone())
        }
        self.sessions
            .insert(event.session_id, event.target_info.target_id);
    }

    /// The session was detached from the target.
    /// Can be issued multiple times per target if multiple sessions were
    /// attached to it.
    fn on_detached_from_target(
        &mut self,
        event: chromite_cdp::cdp::browser_protocol::target::EventDetachedFromTarget,
    ) {
        if let Some(target_id) = self.sessions.remove(&event.session_id) {
            if let Some(target) = self.targets.get_mut(&target_id) {
                target.session_id_mut().take();
            }
        }
    }

    /// Remove all commands where `now > started + request_timeout` and fail
    /// their awaiters.
    fn evict_timed_out_commands(&mut self, now: Instant) {
        let timed_out = self
            .pending_commands
            .iter()
            .filter(|(_, (_, _, started))| now > (*started + self.config.request_timeout))
            .map(|(k, _)| *k)
            .collect::<Vec<_>>();

        for call in timed_out {
            if let Some((req, _, _)) = self.pending_commands.remove(&call) {
                match req {
                    PendingRequest::CreateTarget(tx) => {
                        let _ = tx.send(Err(CdpError::Timeout));
                    }
                    PendingRequest::Navigate(nav) => {
                        if let Some(NavigationRequest::Navigate(nav)) =
                            self.navigations.remove(&nav)
                        {
                            let _ = nav.tx.send(Err(CdpError::Timeout));
                        }
                    }
                    PendingRequest::ExternalCommand(tx) => {
                        let _ = tx.send(Err(CdpError::Timeout));
                    }
                    PendingRequest::InternalCommand(_) => {}
                    PendingRequest::CloseBrowser(tx) => {
                        let _ = tx.send(Err(CdpError::Timeout));
                    }
                }
            }
        }
    }
}

impl Stream for Handler {
    type Item = Result<()>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();

        loop {
            let now = Instant::now();

            while let Poll::Ready(Some(msg)) = Pin::new(&mut pin.from_browser).poll_next(cx) {
                match msg {
                    HandlerMessage::Command(cmd) => {
                        pin.submit_external_command(cmd, now)?;
                    }
                    HandlerMessage::CreatePage(params, tx) => {
                        pin.create_page(params, tx);
                    }
                    HandlerMessage::GetPages(tx) => {
                        let pages: Vec<_> = pin
                            .targets
                            .values_mut()
                            .filter(|target| target.is_page() && target.is_initialized())
                            .filter_map(|target| target.get_or_create_page())
                            .map(|page| Page::from(page.clone()))
                            .collect();
                        let _ = tx.send(pages);
                    }
                    HandlerMessage::GetTargets(tx) => {
                        let targets = pin
                            .targets
                            .values()
                            .map(|target| target.info().clone())
                            .collect();
                        let _ = tx.send(targets);
                    }
                    HandlerMessage::Subscribe(subscription) => {
                        pin.subscriptions.add(subscription);
                    }
                    HandlerMessage::CloseBrowser(tx) => {
                        pin.submit_close(tx, now);
                    }
                    HandlerMessage::Disconnect => {
                        // terminate reading; the browser process stays alive
                        return Poll::Ready(None);
                    }
                }
            }

            for n in (0..pin.target_ids.len()).rev() {
                let target_id = pin.target_ids.swap_remove(n);

                if let Some((id, mut target)) = pin.targets.remove_entry(&target_id) {
                    while let Some(event) = target.poll(cx, now) {
                        match event {
                            TargetEvent::Request(req) => {
                                let _ = pin.submit_internal_command(
                                    target.target_id().clone(),
                                    req,
                                    now,
                                );
                            }
                            TargetEvent::Command(msg) => {
                                pin.on_target_message(&mut target, msg, now);
                            }
                            TargetEvent::NavigationRequest(id, req) => {
                                pin.submit_navigation(id, req, now);
                            }
                            TargetEvent::NavigationResult(res) => {
                                pin.on_navigation_lifecycle_completed(res);
                            }
                        }
                    }

                    if target.take_just_initialized() {
                        pin.subscriptions.dispatch(EventTargetCreated {
                            target_info: target.info().clone(),
                        });
                    }

                    pin.targets.insert(id, target);
                    pin.target_ids.push(target_id);
                }
            }

            let mut done = true;

            while let Poll::Ready(Some(ev)) = Pin::new(&mut pin.conn).poll_next(cx) {
                match ev {
                    Ok(Message::Response(resp)) => {
                        pin.on_response(resp);
                        if pin.closing {
                            // the browser acknowledged the close, stop
                            // processing
                            return Poll::Ready(None);
                        }
                    }
                    Ok(Message::Event(ev)) => {
                        pin.on_event(ev)?;
                    }
                    Err(err) => {
                        tracing::error!("connection error: {err}");
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                done = false;
            }

            if pin.command_eviction.due(cx) {
                pin.evict_timed_out_commands(now);
            }

            if done {
                // no events or responses were read from the websocket
                return Poll::Pending;
            }
        }
    }
}

/// How the handler configures new targets
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Whether the `NetworkManager`s should ignore https errors
    pub ignore_https_errors: bool,
    /// Window and device settings
    pub viewport: Option<Viewport>,
    /// Default timeout until a request is considered failed
    pub request_timeout: Duration,
    /// Whether to enable request interception from the start
    pub request_intercept: bool,
    /// Whether the browser cache should be used
    pub cache_enabled: bool,
    /// Headers attached to every request of every target
    pub extra_headers: Option<HashMap<String, String>>,
    /// Credentials offered on auth challenges
    pub credentials: Option<Credentials>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            ignore_https_errors: true,
            viewport: Default::default(),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT),
            request_intercept: false,
            cache_enabled: true,
            extra_headers: None,
            credentials: None,
        }
    }
}

/// Wraps the sender half of the channel who requested a navigation
#[derive(Debug)]
struct NavigationInProgress<T> {
    /// Whether the navigation lifecycle has settled
    navigated: bool,
    /// The response to the issued navigation request
    response: Option<Response>,
    /// The sender who initiated the navigation
    tx: OneshotSender<T>,
}

impl<T> NavigationInProgress<T> {
    fn new(tx: OneshotSender<T>) -> Self {
        Self {
            navigated: false,
            response: None,
            tx,
        }
    }

    fn set_response(&mut self, resp: Response) {
        self.response = Some(resp);
    }

    fn set_navigated(&mut self) {
        self.navigated = true;
    }
}

/// Request type for navigation
#[derive(Debug)]
enum NavigationRequest {
    /// A navigation request like `Page.navigate` or `Page.reload`
    Navigate(NavigationInProgress<Result<Response>>),
}

/// The different kinds of submitted requests the handler waits on for a
/// response.
#[derive(Debug)]
enum PendingRequest {
    /// A request to create a new target, resolving with the `Page` of the
    /// created target
    CreateTarget(OneshotSender<Result<Page>>),
    /// A request to navigate a specific target.
    ///
    /// Navigation requests are only completed once the `Target` notified the
    /// handler that the page finished loading, which comes after the raw
    /// response.
    Navigate(NavigationId),
    /// A request received via a channel, the response is handed back to the
    /// sender
    ExternalCommand(OneshotSender<Result<Response>>),
    /// A request initiated by a `Target` itself; errors are logged and
    /// swallowed
    InternalCommand(TargetId),
    /// The request to close the browser
    CloseBrowser(OneshotSender<Result<CloseReturns>>),
}

/// Messages the `Browser` sends to its background handler
#[derive(Debug)]
pub(crate) enum HandlerMessage {
    CreatePage(CreateTargetParams, OneshotSender<Result<Page>>),
    GetPages(OneshotSender<Vec<Page>>),
    GetTargets(OneshotSender<Vec<TargetInfo>>),
    Command(CommandMessage),
    Subscribe(Subscription),
    CloseBrowser(OneshotSender<Result<CloseReturns>>),
    Disconnect,
}

/// Periodically sweeps the pending commands for requests whose deadline
/// passed.
struct CommandEviction {
    period: Duration,
    timer: Delay,
}

impl CommandEviction {
    fn new(request_timeout: Duration) -> Self {
        // sweeping at half the timeout bounds how late an eviction can fire
        let period = request_timeout / 2;
        Self {
            timer: Delay::new(period),
            period,
        }
    }

    /// True whenever a full period elapsed since the last sweep.
    fn due(&mut self, cx: &mut Context<'_>) -> bool {
        match Future::poll(Pin::new(&mut self.timer), cx) {
            Poll::Ready(()) => {
                self.timer.reset(self.period);
                true
            }
            Poll::Pending => false,
        }
    }
}
