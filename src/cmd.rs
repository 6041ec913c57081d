use std::collections::VecDeque;
use std::iter::FromIterator;
use std::time::{Duration, Instant};

use futures::channel::oneshot::Sender as OneshotSender;
use futures::task::Poll;
use serde::Serialize;

use chromite_cdp::cdp::browser_protocol::page::{NavigateParams, ReloadParams};
use chromite_cdp::cdp::browser_protocol::target::SessionId;
use chromite_types::{Command, CommandResponse, Method, MethodId, Request, Response};

use crate::error::{CdpError, DeadlineExceeded, Result};
use crate::handler::frame::NavigationOptions;
use crate::handler::REQUEST_TIMEOUT;

/// Deserialize the payload of a [`Response`] into the command's response
/// type.
pub(crate) fn to_command_response<T: Command>(
    resp: Response,
    method: MethodId,
) -> Result<CommandResponse<T::Response>> {
    if let Some(res) = resp.result {
        let result = serde_json::from_value(res)?;
        Ok(CommandResponse {
            id: resp.id,
            result,
            method,
        })
    } else if let Some(err) = resp.error {
        Err(err.into())
    } else {
        Err(CdpError::NoResponse)
    }
}

/// Messages used internally to communicate with the handler, which is
/// executed in the background task.
#[derive(Debug, Serialize)]
pub struct CommandMessage<T = Result<Response>> {
    pub method: MethodId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub params: serde_json::Value,
    /// Options applied when this command triggers a navigation.
    #[serde(skip_serializing)]
    pub nav_options: Option<NavigationOptions>,
    #[serde(skip_serializing)]
    pub sender: OneshotSender<T>,
}

impl<T> CommandMessage<T> {
    pub fn new<C: Command>(cmd: C, sender: OneshotSender<T>) -> serde_json::Result<Self> {
        Self::with_session(cmd, sender, None)
    }

    pub fn with_session<C: Command>(
        cmd: C,
        sender: OneshotSender<T>,
        session_id: Option<SessionId>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            method: cmd.identifier(),
            session_id,
            params: serde_json::to_value(cmd)?,
            nav_options: None,
            sender,
        })
    }

    /// Whether this command starts a navigation that has to be tracked until
    /// its lifecycle completes.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self.method.as_ref(),
            NavigateParams::IDENTIFIER | ReloadParams::IDENTIFIER
        )
    }

    pub fn split(self) -> (Request, OneshotSender<T>) {
        (
            Request {
                method: self.method,
                session_id: self.session_id.map(Into::into),
                params: self.params,
            },
            self.sender,
        )
    }
}

impl Method for CommandMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

/// A queue of commands answered one at a time, used to drive a target
/// through its initialization stages.
#[derive(Debug)]
pub struct CommandChain {
    /// The commands to process: (method identifier, params)
    cmds: VecDeque<(MethodId, serde_json::Value)>,
    /// The last issued command we are currently waiting on for completion
    waiting: Option<(MethodId, Instant)>,
    /// The window a response after issuing a request must arrive in
    timeout: Duration,
}

pub type NextCommand = Poll<Option<Result<(MethodId, serde_json::Value), DeadlineExceeded>>>;

impl CommandChain {
    /// Creates a new `CommandChain` from an `Iterator`.
    ///
    /// The order of the commands corresponds to the iterator's
    pub fn new<I>(cmds: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = (MethodId, serde_json::Value)>,
    {
        Self {
            cmds: VecDeque::from_iter(cmds),
            waiting: None,
            timeout,
        }
    }

    /// queue in another request
    pub fn push_back(&mut self, method: MethodId, params: serde_json::Value) {
        self.cmds.push_back((method, params))
    }

    /// Removes the waiting state if the identifier matches that of the last
    /// issued command
    pub fn received_response(&mut self, identifier: &str) -> bool {
        if self.waiting.as_ref().map(|(c, _)| c.as_ref()) == Some(identifier) {
            self.waiting.take();
            true
        } else {
            false
        }
    }

    /// Return the next command to process or `None` if done.
    /// If the response timed out an error is returned instead.
    pub fn poll(&mut self, now: Instant) -> NextCommand {
        if let Some((cmd, deadline)) = self.waiting.as_ref() {
            if now > *deadline {
                tracing::error!("command {:?} exceeded deadline", cmd);
                Poll::Ready(Some(Err(DeadlineExceeded::new(now, *deadline))))
            } else {
                Poll::Pending
            }
        } else if let Some((method, val)) = self.cmds.pop_front() {
            self.waiting = Some((method.clone(), now + self.timeout));
            Poll::Ready(Some(Ok((method, val))))
        } else {
            Poll::Ready(None)
        }
    }
}

impl Default for CommandChain {
    fn default() -> Self {
        Self {
            cmds: Default::default(),
            waiting: None,
            timeout: Duration::from_millis(REQUEST_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromite_types::Method;

    #[test]
    fn command_chain_issues_commands_in_order() {
        let enable = chromite_cdp::cdp::browser_protocol::page::EnableParams::default();
        let reload = ReloadParams::default();
        let mut chain = CommandChain::new(
            vec![
                (enable.identifier(), serde_json::to_value(&enable).unwrap()),
                (reload.identifier(), serde_json::to_value(&reload).unwrap()),
            ],
            Duration::from_secs(5),
        );

        let now = Instant::now();
        match chain.poll(now) {
            Poll::Ready(Some(Ok((method, _)))) => assert_eq!(method.as_ref(), "Page.enable"),
            other => panic!("unexpected poll result {other:?}"),
        }
        // still waiting for the response to the first command
        assert!(matches!(chain.poll(now), Poll::Pending));

        assert!(chain.received_response("Page.enable"));
        match chain.poll(now) {
            Poll::Ready(Some(Ok((method, _)))) => assert_eq!(method.as_ref(), "Page.reload"),
            other => panic!("unexpected poll result {other:?}"),
        }
        assert!(chain.received_response("Page.reload"));
        assert!(matches!(chain.poll(now), Poll::Ready(None)));
    }

    #[test]
    fn command_chain_times_out_waiting() {
        let enable = chromite_cdp::cdp::browser_protocol::page::EnableParams::default();
        let mut chain = CommandChain::new(
            vec![(enable.identifier(), serde_json::to_value(&enable).unwrap())],
            Duration::from_millis(10),
        );

        let now = Instant::now();
        assert!(matches!(chain.poll(now), Poll::Ready(Some(Ok(_)))));
        let late = now + Duration::from_millis(50);
        assert!(matches!(chain.poll(late), Poll::Ready(Some(Err(_)))));
    }
}
