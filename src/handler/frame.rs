use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::map::Entry;

use chromite_cdp::cdp::browser_protocol::network::LoaderId;
use chromite_cdp::cdp::browser_protocol::page::{
    self, EventFrameDetached, EventFrameStartedLoading, EventFrameStoppedLoading,
    EventLifecycleEvent, EventNavigatedWithinDocument, Frame as CdpFrame, FrameId, FrameTree,
};
use chromite_cdp::cdp::js_protocol::runtime::{
    self, EventExecutionContextCreated, EventExecutionContextDestroyed, ExecutionContextId,
};
use chromite_types::{Method, MethodId, Request};

use crate::cmd::CommandChain;
use crate::error::DeadlineExceeded;
use crate::handler::network::HttpRequest;
use crate::handler::REQUEST_TIMEOUT;

/// Represents a frame on the page
#[derive(Debug)]
pub struct Frame {
    parent_frame: Option<FrameId>,
    /// Identifier of this frame
    id: FrameId,
    /// Identifier of the loader that committed the current document
    loader_id: Option<LoaderId>,
    /// Current url of this frame
    url: Option<String>,
    /// The frames contained in this frame
    child_frames: HashSet<FrameId>,
    name: Option<String>,
    /// The lifecycle events the current document has reached
    lifecycle_events: HashSet<MethodId>,
    /// The default execution context of this frame, if one was announced
    execution_context: Option<ExecutionContextId>,
    /// The request that loaded the current document
    http_request: Option<Arc<HttpRequest>>,
}

impl Frame {
    pub fn new(id: FrameId) -> Self {
        Self {
            parent_frame: None,
            id,
            loader_id: None,
            url: None,
            child_frames: Default::default(),
            name: None,
            lifecycle_events: Default::default(),
            execution_context: None,
            http_request: None,
        }
    }

    pub fn with_parent(id: FrameId, parent: &mut Frame) -> Self {
        parent.child_frames.insert(id.clone());
        Self {
            parent_frame: Some(parent.id.clone()),
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> &FrameId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&FrameId> {
        self.parent_frame.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn loader_id(&self) -> Option<&LoaderId> {
        self.loader_id.as_ref()
    }

    pub fn child_frames(&self) -> &HashSet<FrameId> {
        &self.child_frames
    }

    pub fn lifecycle_events(&self) -> &HashSet<MethodId> {
        &self.lifecycle_events
    }

    /// The id of the default execution context of this frame, if the browser
    /// announced one.
    pub fn execution_context(&self) -> Option<ExecutionContextId> {
        self.execution_context
    }

    pub fn http_request(&self) -> Option<&Arc<HttpRequest>> {
        self.http_request.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.lifecycle_events.contains("load")
    }

    fn navigated(&mut self, frame: &CdpFrame) {
        self.name.clone_from(&frame.name);
        let url = if let Some(ref fragment) = frame.url_fragment {
            format!("{}{fragment}", frame.url)
        } else {
            frame.url.clone()
        };
        self.url = Some(url);
        if frame.loader_id.is_some() {
            self.loader_id.clone_from(&frame.loader_id);
        }
    }

    fn navigated_within_url(&mut self, url: String) {
        self.url = Some(url)
    }

    fn on_loading_started(&mut self) {
        self.lifecycle_events.clear();
        self.http_request.take();
    }

    fn on_loading_stopped(&mut self) {
        self.lifecycle_events.insert("DOMContentLoaded".into());
        self.lifecycle_events.insert("load".into());
    }

    fn set_default_context(&mut self, id: ExecutionContextId) {
        self.execution_context = Some(id);
    }

    fn destroy_context(&mut self, id: ExecutionContextId) {
        if self.execution_context == Some(id) {
            self.execution_context = None;
        }
    }

    fn set_request(&mut self, request: Arc<HttpRequest>) {
        self.http_request = Some(request);
    }
}

/// A tracked javascript execution context.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    id: ExecutionContextId,
    /// The frame this context was created in, if any
    frame_id: Option<FrameId>,
    /// Whether this is the default world of its frame
    is_default: bool,
    name: String,
    origin: String,
}

impl ExecutionContext {
    pub fn id(&self) -> ExecutionContextId {
        self.id
    }

    pub fn frame_id(&self) -> Option<&FrameId> {
        self.frame_id.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Maintains the state of the page's frames and listens to events produced by
/// the browser targeting the `Target`. Also tracks in-progress navigations
/// until their lifecycle settles.
#[derive(Debug)]
pub struct FrameManager {
    main_frame: Option<FrameId>,
    frames: HashMap<FrameId, Frame>,
    /// The execution contexts of this target, by their session-scoped id
    contexts: HashMap<ExecutionContextId, ExecutionContext>,
    /// Default budget for a navigation until it is considered failed
    timeout: Duration,
    /// Navigations that have not been submitted to the browser yet
    pending_navigations: VecDeque<(FrameRequestedNavigation, NavigationWatcher)>,
    /// The currently ongoing navigation and its deadline, `None` deadline
    /// means the navigation never times out
    navigation: Option<(NavigationWatcher, Option<Instant>)>,
}

impl FrameManager {
    pub fn new(timeout: Duration) -> Self {
        FrameManager {
            main_frame: None,
            frames: Default::default(),
            contexts: Default::default(),
            timeout,
            pending_navigations: Default::default(),
            navigation: None,
        }
    }

    /// The commands to execute in order to initialize this frame manager
    pub fn init_commands(timeout: Duration) -> CommandChain {
        let enable = page::EnableParams::default();
        let get_tree = page::GetFrameTreeParams::default();
        let set_lifecycle = page::SetLifecycleEventsEnabledParams::new(true);
        let enable_runtime = runtime::EnableParams::default();

        let mut cmds = Vec::with_capacity(4);
        if let Ok(params) = serde_json::to_value(&enable) {
            cmds.push((enable.identifier(), params));
        }
        if let Ok(params) = serde_json::to_value(&get_tree) {
            cmds.push((get_tree.identifier(), params));
        }
        if let Ok(params) = serde_json::to_value(&set_lifecycle) {
            cmds.push((set_lifecycle.identifier(), params));
        }
        if let Ok(params) = serde_json::to_value(&enable_runtime) {
            cmds.push((enable_runtime.identifier(), params));
        }
        CommandChain::new(cmds, timeout)
    }

    pub fn main_frame(&self) -> Option<&Frame> {
        self.main_frame.as_ref().and_then(|id| self.frames.get(id))
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.values()
    }

    pub fn frame(&self, id: &FrameId) -> Option<&Frame> {
        self.frames.get(id)
    }

    pub fn context(&self, id: ExecutionContextId) -> Option<&ExecutionContext> {
        self.contexts.get(&id)
    }

    /// The default execution context of the frame, if both still exist.
    pub fn frame_execution_context(&self, id: &FrameId) -> Option<&ExecutionContext> {
        self.frames
            .get(id)
            .and_then(|frame| frame.execution_context())
            .and_then(|ctx| self.contexts.get(&ctx))
    }

    fn check_lifecycle(&self, watcher: &NavigationWatcher, frame: &Frame) -> bool {
        watcher
            .expected_lifecycle
            .iter()
            .all(|ev| frame.lifecycle_events.contains(ev))
            && frame
                .child_frames
                .iter()
                .filter_map(|f| self.frames.get(f))
                .all(|f| self.check_lifecycle(watcher, f))
    }

    fn check_lifecycle_complete(
        &self,
        watcher: &NavigationWatcher,
        frame: &Frame,
    ) -> Option<NavigationOk> {
        if !self.check_lifecycle(watcher, frame) {
            return None;
        }
        if frame.loader_id == watcher.loader_id && !watcher.same_document_navigation {
            return None;
        }
        if watcher.same_document_navigation {
            return Some(NavigationOk::SameDocumentNavigation(watcher.id));
        }
        if frame.loader_id != watcher.loader_id {
            return Some(NavigationOk::NewDocumentNavigation(watcher.id));
        }
        None
    }

    /// Advance the tracked navigation, if any.
    pub fn poll(&mut self, now: Instant) -> Option<FrameEvent> {
        if let Some((watcher, deadline)) = self.navigation.take() {
            if let Some(deadline) = deadline {
                if now > deadline {
                    return Some(FrameEvent::NavigationResult(Err(
                        NavigationError::Timeout {
                            id: watcher.id,
                            err: DeadlineExceeded::new(now, deadline),
                        },
                    )));
                }
            }
            if let Some(frame) = self.frames.get(&watcher.frame_id) {
                if let Some(nav) = self.check_lifecycle_complete(&watcher, frame) {
                    return Some(FrameEvent::NavigationResult(Ok(nav)));
                }
                // not settled yet
                self.navigation = Some((watcher, deadline));
            } else {
                return Some(FrameEvent::NavigationResult(Err(
                    NavigationError::FrameDetached {
                        id: watcher.id,
                        frame: watcher.frame_id,
                    },
                )));
            }
        } else if let Some((req, watcher)) = self.pending_navigations.pop_front() {
            let deadline = req.opts.deadline_from(now);
            self.navigation = Some((watcher, deadline));
            return Some(FrameEvent::NavigationRequest(req.id, req.req));
        }
        None
    }

    /// Entrypoint for page navigation
    pub fn goto(&mut self, req: FrameRequestedNavigation) {
        if let Some(frame_id) = self.main_frame.clone() {
            self.navigate_frame(frame_id, req);
        }
    }

    /// Navigate a specific frame
    pub fn navigate_frame(&mut self, frame_id: FrameId, mut req: FrameRequestedNavigation) {
        let loader_id = self.frames.get(&frame_id).and_then(|f| f.loader_id.clone());
        let watcher =
            NavigationWatcher::until(req.id, frame_id.clone(), loader_id, &req.opts.wait_until);
        req.set_frame_id(frame_id);
        self.pending_navigations.push_back((req, watcher))
    }

    /// Replays the frame tree returned by `Page.getFrameTree` into attach and
    /// navigate transitions.
    pub fn on_frame_tree(&mut self, frame_tree: FrameTree) {
        self.on_frame_attached(
            frame_tree.frame.id.clone(),
            frame_tree.frame.parent_id.clone(),
        );
        self.on_frame_navigated(&frame_tree.frame);
        if let Some(children) = frame_tree.child_frames {
            for child_tree in children {
                self.on_frame_tree(child_tree);
            }
        }
    }

    pub fn on_frame_attached(&mut self, frame_id: FrameId, parent_frame_id: Option<FrameId>) {
        if self.frames.contains_key(&frame_id) {
            return;
        }
        if let Some(parent_frame_id) = parent_frame_id {
            if let Some(parent_frame) = self.frames.get_mut(&parent_frame_id) {
                let frame = Frame::with_parent(frame_id.clone(), parent_frame);
                self.frames.insert(frame_id, frame);
            } else {
                // events arrived out of order, the upcoming `frameNavigated`
                // recreates the state
                tracing::debug!(frame = %frame_id, parent = %parent_frame_id, "attach for unknown parent ignored");
            }
        }
    }

    pub fn on_frame_detached(&mut self, event: &EventFrameDetached) {
        self.remove_frames_recursively(&event.frame_id);
    }

    pub fn on_frame_navigated(&mut self, frame: &CdpFrame) {
        if frame.parent_id.is_some() {
            if let Some((id, mut f)) = self.frames.remove_entry(&frame.id) {
                let children = std::mem::take(&mut f.child_frames);
                for child in children {
                    self.remove_frames_recursively(&child);
                }
                f.navigated(frame);
                self.frames.insert(id, f);
            }
        } else {
            let mut f = if let Some(main) = self.main_frame.take() {
                if let Some(mut main_frame) = self.frames.remove(&main) {
                    let children = std::mem::take(&mut main_frame.child_frames);
                    for child in children {
                        self.remove_frames_recursively(&child);
                    }
                    // a cross-process navigation changes the id of the main frame
                    main_frame.id = frame.id.clone();
                    main_frame
                } else {
                    Frame::new(frame.id.clone())
                }
            } else {
                // initial main frame navigation
                Frame::new(frame.id.clone())
            };
            f.navigated(frame);
            self.main_frame = Some(f.id.clone());
            self.frames.insert(f.id.clone(), f);
        }
    }

    pub fn on_frame_navigated_within_document(&mut self, event: &EventNavigatedWithinDocument) {
        if let Some(frame) = self.frames.get_mut(&event.frame_id) {
            frame.navigated_within_url(event.url.clone());
        }
        if let Some((watcher, _)) = self.navigation.as_mut() {
            watcher.on_frame_navigated_within_document(event);
        }
    }

    pub fn on_frame_started_loading(&mut self, event: &EventFrameStartedLoading) {
        if let Some(frame) = self.frames.get_mut(&event.frame_id) {
            frame.on_loading_started();
        }
    }

    pub fn on_frame_stopped_loading(&mut self, event: &EventFrameStoppedLoading) {
        if let Some(frame) = self.frames.get_mut(&event.frame_id) {
            frame.on_loading_stopped();
        }
    }

    /// Fired for top level page lifecycle events (nav, load, paint, etc.)
    pub fn on_page_lifecycle_event(&mut self, event: &EventLifecycleEvent) {
        if let Some(frame) = self.frames.get_mut(&event.frame_id) {
            if frame.loader_id.as_ref() != Some(&event.loader_id) {
                // a new document committed, previous lifecycle no longer applies
                frame.loader_id = Some(event.loader_id.clone());
                frame.lifecycle_events.clear();
            }
            frame.lifecycle_events.insert(event.name.clone().into());
        }
    }

    /// Issued when a new execution context is created.
    ///
    /// Only the default world of a frame is installed as the frame's default
    /// context, other worlds are merely tracked.
    pub fn on_execution_context_created(&mut self, event: &EventExecutionContextCreated) {
        let aux = event.context.aux_data.as_ref();
        let frame_id = aux
            .and_then(|v| v["frameId"].as_str())
            .map(FrameId::from);
        let is_default = aux
            .and_then(|v| v["isDefault"].as_bool())
            .unwrap_or_default();

        let ctx = ExecutionContext {
            id: event.context.id,
            frame_id: frame_id.clone(),
            is_default,
            name: event.context.name.clone(),
            origin: event.context.origin.clone(),
        };
        self.contexts.insert(ctx.id, ctx);

        if is_default {
            if let Some(frame) = frame_id.and_then(|id| self.frames.get_mut(&id)) {
                frame.set_default_context(event.context.id);
            }
        }
    }

    /// Issued when an execution context is destroyed
    pub fn on_execution_context_destroyed(&mut self, event: &EventExecutionContextDestroyed) {
        if let Some(ctx) = self.contexts.remove(&event.execution_context_id) {
            if let Some(frame) = ctx.frame_id.and_then(|id| self.frames.get_mut(&id)) {
                frame.destroy_context(event.execution_context_id);
            }
        }
    }

    /// Issued when all execution contexts were cleared
    pub fn on_execution_contexts_cleared(&mut self) {
        for ctx in self.contexts.values() {
            if let Some(frame) = ctx
                .frame_id
                .as_ref()
                .and_then(|id| self.frames.get_mut(id))
            {
                frame.destroy_context(ctx.id);
            }
        }
        self.contexts.clear()
    }

    /// Track the document request that loaded the frame
    pub fn on_request_finished(&mut self, request: Arc<HttpRequest>) {
        if !request.is_navigation_request {
            return;
        }
        if let Some(frame) = request
            .frame
            .as_ref()
            .and_then(|id| self.frames.get_mut(id))
        {
            frame.set_request(request);
        }
    }

    /// Detach the frame and all its descendants
    fn remove_frames_recursively(&mut self, id: &FrameId) -> Option<Frame> {
        if let Some(mut frame) = self.frames.remove(id) {
            for child in &frame.child_frames {
                self.remove_frames_recursively(child);
            }
            if let Some(parent_id) = frame.parent_frame.take() {
                if let Some(parent) = self.frames.get_mut(&parent_id) {
                    parent.child_frames.remove(&frame.id);
                }
            }
            Some(frame)
        } else {
            None
        }
    }
}

impl Default for FrameManager {
    fn default() -> Self {
        FrameManager::new(Duration::from_millis(REQUEST_TIMEOUT))
    }
}

#[derive(Debug)]
pub enum FrameEvent {
    /// A previously submitted navigation has settled
    NavigationResult(Result<NavigationOk, NavigationError>),
    /// A new navigation request needs to be submitted
    NavigationRequest(NavigationId, Request),
}

#[derive(Debug)]
pub enum NavigationError {
    Timeout {
        id: NavigationId,
        err: DeadlineExceeded,
    },
    FrameDetached {
        id: NavigationId,
        frame: FrameId,
    },
}

impl NavigationError {
    pub fn navigation_id(&self) -> &NavigationId {
        match self {
            NavigationError::Timeout { id, .. } => id,
            NavigationError::FrameDetached { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NavigationOk {
    SameDocumentNavigation(NavigationId),
    NewDocumentNavigation(NavigationId),
}

impl NavigationOk {
    pub fn navigation_id(&self) -> &NavigationId {
        match self {
            NavigationOk::SameDocumentNavigation(id) => id,
            NavigationOk::NewDocumentNavigation(id) => id,
        }
    }
}

/// The lifecycle points a navigation can wait for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WaitUntil {
    /// The `load` event fired.
    #[default]
    Load,
    /// The `DOMContentLoaded` event fired.
    DomContentLoaded,
    /// No more than 0 network connections for at least 500ms.
    NetworkIdle0,
    /// No more than 2 network connections for at least 500ms.
    NetworkIdle2,
}

impl WaitUntil {
    /// The protocol lifecycle name this wait maps to.
    pub fn lifecycle_event(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "DOMContentLoaded",
            WaitUntil::NetworkIdle0 => "networkIdle",
            WaitUntil::NetworkIdle2 => "networkAlmostIdle",
        }
    }
}

impl AsRef<str> for WaitUntil {
    fn as_ref(&self) -> &str {
        self.lifecycle_event()
    }
}

/// How a navigation decides it has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOptions {
    /// The lifecycle events that all have to be reached, in the navigated
    /// frame and every descendant.
    pub wait_until: Vec<WaitUntil>,
    /// Budget in milliseconds, `0` means the navigation never times out.
    pub timeout_ms: u32,
}

impl NavigationOptions {
    pub fn new(wait_until: Vec<WaitUntil>, timeout_ms: u32) -> Self {
        Self {
            wait_until,
            timeout_ms,
        }
    }

    pub(crate) fn deadline_from(&self, now: Instant) -> Option<Instant> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(now + Duration::from_millis(self.timeout_ms as u64))
        }
    }
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            wait_until: vec![WaitUntil::Load],
            timeout_ms: REQUEST_TIMEOUT as u32,
        }
    }
}

/// Tracks the progress of an issued navigation request until its lifecycle
/// settles.
#[derive(Debug)]
pub struct NavigationWatcher {
    id: NavigationId,
    frame_id: FrameId,
    /// The loader of the frame at the time the navigation was issued. A
    /// different loader means a new document committed.
    loader_id: Option<LoaderId>,
    expected_lifecycle: HashSet<MethodId>,
    /// Set when the frame navigated without leaving the document, in which
    /// case no new lifecycle events follow.
    same_document_navigation: bool,
}

impl NavigationWatcher {
    pub fn until(
        id: NavigationId,
        frame: FrameId,
        loader_id: Option<LoaderId>,
        wait_until: &[WaitUntil],
    ) -> Self {
        let expected_lifecycle: HashSet<MethodId> = if wait_until.is_empty() {
            std::iter::once(WaitUntil::Load.lifecycle_event().into()).collect()
        } else {
            wait_until
                .iter()
                .map(|w| w.lifecycle_event().into())
                .collect()
        };
        Self {
            id,
            frame_id: frame,
            loader_id,
            expected_lifecycle,
            same_document_navigation: false,
        }
    }

    fn on_frame_navigated_within_document(&mut self, ev: &EventNavigatedWithinDocument) {
        if self.frame_id == ev.frame_id {
            self.same_document_navigation = true;
        }
    }
}

/// An identifier for an ongoing navigation
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct NavigationId(pub usize);

/// Represents the request for a navigation
#[derive(Debug)]
pub struct FrameRequestedNavigation {
    /// The internal identifier
    pub id: NavigationId,
    /// The protocol request that will trigger the navigation
    pub req: Request,
    /// How the navigation decides completion
    pub opts: NavigationOptions,
}

impl FrameRequestedNavigation {
    pub fn new(id: NavigationId, req: Request, opts: NavigationOptions) -> Self {
        Self { id, req, opts }
    }

    /// This will set the id of the frame into the `params` `frameId` field,
    /// unless already present. Only `Page.navigate` accepts a frame id.
    pub fn set_frame_id(&mut self, frame_id: FrameId) {
        if self.req.method.as_ref() != page::NavigateParams::IDENTIFIER {
            return;
        }
        if let Some(params) = self.req.params.as_object_mut() {
            if let Entry::Vacant(entry) = params.entry("frameId") {
                entry.insert(serde_json::Value::String(frame_id.into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromite_cdp::cdp::browser_protocol::page::NavigateParams;

    fn frame_payload(id: &str, parent: Option<&str>, url: &str, loader: &str) -> CdpFrame {
        CdpFrame {
            id: id.into(),
            parent_id: parent.map(Into::into),
            loader_id: Some(loader.into()),
            name: None,
            url: url.to_string(),
            url_fragment: None,
            security_origin: None,
            mime_type: None,
        }
    }

    fn lifecycle(frame: &str, loader: &str, name: &str) -> EventLifecycleEvent {
        EventLifecycleEvent {
            frame_id: frame.into(),
            loader_id: loader.into(),
            name: name.to_string(),
            timestamp: None,
        }
    }

    fn navigate_request() -> Request {
        let params = NavigateParams::new("http://example.com");
        Request::new(
            chromite_types::Method::identifier(&params),
            serde_json::to_value(params).unwrap(),
        )
    }

    fn manager_with_tree() -> FrameManager {
        let mut fm = FrameManager::default();
        fm.on_frame_navigated(&frame_payload("main", None, "http://example.com", "l0"));
        fm.on_frame_attached("child".into(), Some("main".into()));
        fm.on_frame_navigated(&frame_payload(
            "child",
            Some("main"),
            "http://example.com/iframe",
            "cl0",
        ));
        fm
    }

    #[test]
    fn main_frame_is_tracked() {
        let fm = manager_with_tree();
        assert_eq!(fm.main_frame().unwrap().id().inner(), "main");
        assert_eq!(fm.frames().count(), 2);
        let child = fm.frame(&"child".into()).unwrap();
        assert_eq!(child.parent_id().unwrap().inner(), "main");
    }

    #[test]
    fn attach_with_unknown_parent_is_ignored() {
        let mut fm = manager_with_tree();
        fm.on_frame_attached("orphan".into(), Some("nonexistent".into()));
        assert!(fm.frame(&"orphan".into()).is_none());
        assert_eq!(fm.frames().count(), 2);
    }

    #[test]
    fn cross_process_navigation_rewrites_main_frame_id() {
        let mut fm = manager_with_tree();
        fm.on_frame_navigated(&frame_payload("main2", None, "http://b.test", "l1"));

        assert_eq!(fm.main_frame().unwrap().id().inner(), "main2");
        assert!(fm.frame(&"main".into()).is_none());
        // children of the previous document are gone
        assert!(fm.frame(&"child".into()).is_none());
        assert_eq!(fm.frames().count(), 1);
    }

    #[test]
    fn detach_removes_subtree() {
        let mut fm = manager_with_tree();
        fm.on_frame_attached("grandchild".into(), Some("child".into()));
        fm.on_frame_detached(&EventFrameDetached {
            frame_id: "child".into(),
        });

        assert!(fm.frame(&"child".into()).is_none());
        assert!(fm.frame(&"grandchild".into()).is_none());
        assert!(fm
            .main_frame()
            .unwrap()
            .child_frames()
            .is_empty());
    }

    #[test]
    fn lifecycle_set_resets_on_new_loader() {
        let mut fm = manager_with_tree();
        fm.on_page_lifecycle_event(&lifecycle("main", "l0", "DOMContentLoaded"));
        fm.on_page_lifecycle_event(&lifecycle("main", "l0", "load"));
        assert!(fm.main_frame().unwrap().is_loaded());

        // a new loader means a new document, previous events no longer apply
        fm.on_page_lifecycle_event(&lifecycle("main", "l1", "init"));
        let main = fm.main_frame().unwrap();
        assert!(!main.is_loaded());
        assert!(main.lifecycle_events().contains("init"));
    }

    #[test]
    fn default_execution_context_is_installed() {
        let mut fm = manager_with_tree();
        let event = EventExecutionContextCreated {
            context: runtime::ExecutionContextDescription {
                id: 7.into(),
                origin: "http://example.com".to_string(),
                name: "".to_string(),
                aux_data: Some(serde_json::json!({"frameId": "main", "isDefault": true})),
            },
        };
        fm.on_execution_context_created(&event);
        assert_eq!(
            fm.main_frame().unwrap().execution_context(),
            Some(7.into())
        );

        // a non default world is tracked but not installed
        let isolated = EventExecutionContextCreated {
            context: runtime::ExecutionContextDescription {
                id: 8.into(),
                origin: "http://example.com".to_string(),
                name: "isolated".to_string(),
                aux_data: Some(serde_json::json!({"frameId": "main", "isDefault": false})),
            },
        };
        fm.on_execution_context_created(&isolated);
        assert_eq!(
            fm.main_frame().unwrap().execution_context(),
            Some(7.into())
        );
        assert!(fm.context(8.into()).is_some());

        fm.on_execution_context_destroyed(&EventExecutionContextDestroyed {
            execution_context_id: 7.into(),
        });
        assert_eq!(fm.main_frame().unwrap().execution_context(), None);

        fm.on_execution_contexts_cleared();
        assert!(fm.context(8.into()).is_none());
    }

    #[test]
    fn navigation_settles_after_expected_lifecycle() {
        let mut fm = manager_with_tree();
        fm.goto(FrameRequestedNavigation::new(
            NavigationId(1),
            navigate_request(),
            NavigationOptions::default(),
        ));

        let now = Instant::now();
        // first poll submits the request
        match fm.poll(now) {
            Some(FrameEvent::NavigationRequest(id, req)) => {
                assert_eq!(id, NavigationId(1));
                assert_eq!(req.params["frameId"], "main");
            }
            other => panic!("unexpected event {other:?}"),
        }
        // nothing happened yet
        assert!(fm.poll(now).is_none());

        // new document commits and loads
        fm.on_frame_navigated(&frame_payload("main", None, "http://example.com/2", "l1"));
        fm.on_page_lifecycle_event(&lifecycle("main", "l1", "load"));

        match fm.poll(now) {
            Some(FrameEvent::NavigationResult(Ok(NavigationOk::NewDocumentNavigation(id)))) => {
                assert_eq!(id, NavigationId(1))
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn navigation_waits_for_descendant_frames() {
        let mut fm = manager_with_tree();
        fm.on_page_lifecycle_event(&lifecycle("child", "cl0", "load"));
        fm.goto(FrameRequestedNavigation::new(
            NavigationId(3),
            navigate_request(),
            NavigationOptions::default(),
        ));
        let now = Instant::now();
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationRequest(..))
        ));

        // main frame commits a new document and a new child appears
        fm.on_frame_navigated(&frame_payload("main", None, "http://example.com/2", "l1"));
        fm.on_frame_attached("child2".into(), Some("main".into()));
        fm.on_page_lifecycle_event(&lifecycle("main", "l1", "load"));
        // the child has not loaded yet
        assert!(fm.poll(now).is_none());

        fm.on_page_lifecycle_event(&lifecycle("child2", "cl1", "load"));
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationResult(Ok(
                NavigationOk::NewDocumentNavigation(_)
            )))
        ));
    }

    #[test]
    fn same_document_navigation_settles_immediately() {
        let mut fm = manager_with_tree();
        // document loaded before the navigation starts
        fm.on_page_lifecycle_event(&lifecycle("main", "l0", "load"));
        fm.on_page_lifecycle_event(&lifecycle("child", "cl0", "load"));

        fm.goto(FrameRequestedNavigation::new(
            NavigationId(2),
            navigate_request(),
            NavigationOptions::default(),
        ));
        let now = Instant::now();
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationRequest(..))
        ));

        fm.on_frame_navigated_within_document(&EventNavigatedWithinDocument {
            frame_id: "main".into(),
            url: "http://example.com/#anchor".to_string(),
        });

        match fm.poll(now) {
            Some(FrameEvent::NavigationResult(Ok(NavigationOk::SameDocumentNavigation(id)))) => {
                assert_eq!(id, NavigationId(2));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            fm.main_frame().unwrap().url(),
            Some("http://example.com/#anchor")
        );
    }

    #[test]
    fn navigation_times_out() {
        let mut fm = manager_with_tree();
        fm.goto(FrameRequestedNavigation::new(
            NavigationId(4),
            navigate_request(),
            NavigationOptions::new(vec![WaitUntil::Load], 100),
        ));
        let now = Instant::now();
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationRequest(..))
        ));

        let late = now + Duration::from_millis(500);
        assert!(matches!(
            fm.poll(late),
            Some(FrameEvent::NavigationResult(Err(
                NavigationError::Timeout { .. }
            )))
        ));
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        let mut fm = manager_with_tree();
        fm.goto(FrameRequestedNavigation::new(
            NavigationId(5),
            navigate_request(),
            NavigationOptions::new(vec![WaitUntil::Load], 0),
        ));
        let now = Instant::now();
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationRequest(..))
        ));

        let much_later = now + Duration::from_secs(60 * 60);
        assert!(fm.poll(much_later).is_none());
    }

    #[test]
    fn navigation_fails_when_frame_detaches() {
        let mut fm = manager_with_tree();
        fm.navigate_frame(
            "child".into(),
            FrameRequestedNavigation::new(
                NavigationId(6),
                navigate_request(),
                NavigationOptions::default(),
            ),
        );
        let now = Instant::now();
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationRequest(..))
        ));

        fm.on_frame_detached(&EventFrameDetached {
            frame_id: "child".into(),
        });
        assert!(matches!(
            fm.poll(now),
            Some(FrameEvent::NavigationResult(Err(
                NavigationError::FrameDetached { .. }
            )))
        ));
    }

    #[test]
    fn wait_until_maps_to_protocol_names() {
        assert_eq!(WaitUntil::Load.lifecycle_event(), "load");
        assert_eq!(WaitUntil::DomContentLoaded.lifecycle_event(), "DOMContentLoaded");
        assert_eq!(WaitUntil::NetworkIdle0.lifecycle_event(), "networkIdle");
        assert_eq!(WaitUntil::NetworkIdle2.lifecycle_event(), "networkAlmostIdle");
    }
}
