use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::{
    mpsc,
    oneshot::{self, channel as oneshot_channel},
};
use pin_project_lite::pin_project;

use chromite_cdp::cdp::browser_protocol::target::SessionId;
use chromite_types::{Command, CommandResponse, MethodId, Response};

use crate::cmd::{to_command_response, CommandMessage};
use crate::error::Result;
use crate::handler::frame::NavigationOptions;
use crate::handler::target::TargetMessage;
use crate::handler::REQUEST_TIMEOUT;

pin_project! {
    /// Resolves with the response to a command submitted through a target's
    /// channel.
    pub struct CommandFuture<T, M = Result<Response>> {
        #[pin]
        rx_command: oneshot::Receiver<M>,
        #[pin]
        target_sender: mpsc::Sender<TargetMessage>,
        // times the command out if the target is gone without the reply
        // channel being dropped
        #[pin]
        delay: futures_timer::Delay,

        message: Option<TargetMessage>,

        method: MethodId,

        _marker: PhantomData<T>
    }
}

impl<T: Command> CommandFuture<T> {
    pub fn new(
        cmd: T,
        target_sender: mpsc::Sender<TargetMessage>,
        session: Option<SessionId>,
    ) -> Result<Self> {
        Self::create(cmd, target_sender, session, None)
    }

    /// A command that triggers a navigation. Its response resolves only once
    /// the navigation lifecycle settled.
    pub fn navigation(
        cmd: T,
        target_sender: mpsc::Sender<TargetMessage>,
        session: Option<SessionId>,
        opts: NavigationOptions,
    ) -> Result<Self> {
        Self::create(cmd, target_sender, session, Some(opts))
    }

    fn create(
        cmd: T,
        target_sender: mpsc::Sender<TargetMessage>,
        session: Option<SessionId>,
        nav_options: Option<NavigationOptions>,
    ) -> Result<Self> {
        let (tx, rx_command) = oneshot_channel::<Result<Response>>();
        let method = cmd.identifier();

        let mut msg = CommandMessage::with_session(cmd, tx, session)?;
        // a navigation with no deadline must not be cut short by the command
        // timeout either
        let timeout = match nav_options.as_ref() {
            Some(opts) if opts.timeout_ms == 0 => Duration::from_secs(60 * 60 * 24),
            Some(opts) => Duration::from_millis(opts.timeout_ms as u64 + REQUEST_TIMEOUT),
            None => Duration::from_millis(REQUEST_TIMEOUT),
        };
        msg.nav_options = nav_options;

        Ok(Self {
            target_sender,
            rx_command,
            message: Some(TargetMessage::Command(msg)),
            delay: futures_timer::Delay::new(timeout),
            method,
            _marker: PhantomData,
        })
    }
}

impl<T> Future for CommandFuture<T>
where
    T: Command,
{
    type Output = Result<CommandResponse<T::Response>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if this.message.is_some() {
            match this.target_sender.poll_ready(cx) {
                Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
                Poll::Ready(Ok(())) => {
                    let message = this.message.take().expect("existence checked above");
                    this.target_sender.start_send(message)?;

                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
                Poll::Pending => Poll::Pending,
            }
        } else if this.delay.poll(cx).is_ready() {
            Poll::Ready(Err(crate::error::CdpError::Timeout))
        } else {
            match this.rx_command.as_mut().poll(cx) {
                Poll::Ready(Ok(Ok(response))) => {
                    Poll::Ready(to_command_response::<T>(response, this.method.clone()))
                }
                Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
                Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
                Poll::Pending => Poll::Pending,
            }
        }
    }
}
