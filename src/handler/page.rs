use std::sync::Arc;

use futures::channel::mpsc::{channel, unbounded, Receiver, Sender, UnboundedSender};
use futures::stream::Fuse;
use futures::StreamExt;

use chromite_cdp::cdp::browser_protocol::target::{SessionId, TargetId};
use chromite_types::{Command, CommandResponse};

use crate::dialog::Dialog;
use crate::error::Result;
use crate::fanout::InvocationList;
use crate::handler::commandfuture::CommandFuture;
use crate::handler::network::HttpRequest;
use crate::handler::target::TargetMessage;

/// A page-level event dispatched to the fanout subscribers of the page.
#[derive(Debug)]
pub(crate) enum PageEvent {
    Request(Arc<HttpRequest>),
    Response(Arc<HttpRequest>),
    RequestFailed(Arc<HttpRequest>),
    RequestFinished(Arc<HttpRequest>),
    Dialog(Dialog),
}

/// The fanout lists a page exposes for its high level events.
///
/// Dispatch happens on a dedicated pump task per page, one event at a time,
/// so subscribers observe events in the order the handler produced them.
#[derive(Debug, Default, Clone)]
pub(crate) struct PageEvents {
    pub request: InvocationList<Arc<HttpRequest>>,
    pub response: InvocationList<Arc<HttpRequest>>,
    pub request_failed: InvocationList<Arc<HttpRequest>>,
    pub request_finished: InvocationList<Arc<HttpRequest>>,
    pub dialog: InvocationList<Dialog>,
}

impl PageEvents {
    async fn dispatch(&self, event: PageEvent) {
        match event {
            PageEvent::Request(req) => self.request.invoke_async(&req).await,
            PageEvent::Response(req) => self.response.invoke_async(&req).await,
            PageEvent::RequestFailed(req) => self.request_failed.invoke_async(&req).await,
            PageEvent::RequestFinished(req) => self.request_finished.invoke_async(&req).await,
            PageEvent::Dialog(dialog) => self.dialog.invoke_async(&dialog).await,
        }
    }
}

/// The handler side of a page: the receiver for messages coming from the
/// public [`crate::page::Page`] and the sender for page events going the
/// other way.
#[derive(Debug)]
pub(crate) struct PageHandle {
    pub(crate) rx: Fuse<Receiver<TargetMessage>>,
    page: Arc<PageInner>,
    events: UnboundedSender<PageEvent>,
}

impl PageHandle {
    pub fn new(target_id: TargetId, session_id: SessionId, opener_id: Option<TargetId>) -> Self {
        let (commands, rx) = channel(100);
        let (events_tx, mut events_rx) = unbounded();
        let page = PageInner {
            target_id,
            session_id,
            opener_id,
            sender: commands,
            events: Default::default(),
        };
        let events = page.events.clone();
        crate::utils::spawn(async move {
            while let Some(event) = events_rx.next().await {
                events.dispatch(event).await;
            }
        });
        Self {
            rx: rx.fuse(),
            page: Arc::new(page),
            events: events_tx,
        }
    }

    pub(crate) fn inner(&self) -> &Arc<PageInner> {
        &self.page
    }

    /// Forward a page event to the pump that drives the fanout subscribers
    pub(crate) fn send_event(&self, event: PageEvent) {
        let _ = self.events.unbounded_send(event);
    }
}

/// The shared state of a page that the public surface operates on.
#[derive(Debug)]
pub(crate) struct PageInner {
    target_id: TargetId,
    session_id: SessionId,
    opener_id: Option<TargetId>,
    sender: Sender<TargetMessage>,
    events: PageEvents,
}

impl PageInner {
    /// Execute a protocol command and return its response
    pub(crate) async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        self.command_future(cmd)?.await
    }

    /// Create a command future scoped to this page's session
    pub(crate) fn command_future<T: Command>(&self, cmd: T) -> Result<CommandFuture<T>> {
        CommandFuture::new(cmd, self.sender.clone(), Some(self.session_id.clone()))
    }

    pub(crate) fn sender(&self) -> &Sender<TargetMessage> {
        &self.sender
    }

    pub(crate) async fn send_message(&self, msg: TargetMessage) -> Result<()> {
        use futures::SinkExt;
        self.sender.clone().send(msg).await?;
        Ok(())
    }

    /// Execute a command that triggers a navigation tracked until its
    /// lifecycle settles.
    pub(crate) fn navigation_future<T: Command>(
        &self,
        cmd: T,
        opts: crate::handler::frame::NavigationOptions,
    ) -> Result<CommandFuture<T>> {
        CommandFuture::navigation(cmd, self.sender.clone(), Some(self.session_id.clone()), opts)
    }

    pub(crate) fn events(&self) -> &PageEvents {
        &self.events
    }

    /// The identifier of this page's target
    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    /// The identifier of the session this page's target is attached to
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The target that opened this page, if any
    pub fn opener_id(&self) -> Option<&TargetId> {
        self.opener_id.as_ref()
    }
}
