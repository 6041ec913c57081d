use std::io;
use std::time::Instant;

use async_tungstenite::tungstenite;
use futures::channel::mpsc::SendError;
use futures::channel::oneshot::Canceled;
use thiserror::Error;

use chromite_cdp::cdp::browser_protocol::page::FrameId;
use chromite_cdp::cdp::browser_protocol::target::TargetId;
use chromite_cdp::cdp::js_protocol::runtime::ExceptionDetails;

use crate::handler::frame::NavigationError;

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// The remote endpoint answered a method call with an error object.
    #[error("{0}")]
    Chrome(#[from] chromite_types::Error),
    #[error("Received no response from the browser instance.")]
    NoResponse,
    #[error("{0}")]
    ChannelSendError(#[from] SendError),
    /// The session or the connection was terminated before a reply arrived.
    #[error("Target or connection closed: {0}")]
    TargetClosed(&'static str),
    /// The browser referred to a target the client does not track. This is a
    /// bug signal, not an expected runtime condition.
    #[error("Unknown target {0:?}")]
    InvalidTarget(TargetId),
    #[error("Request timed out.")]
    Timeout,
    #[error("Navigation timed out")]
    NavigationTimeout(DeadlineExceeded),
    /// Navigation failed on the network level, e.g. dns resolution or an
    /// aborted load.
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("The response body of a redirect response is not available.")]
    BodyUnavailable,
    #[error("Frame {0:?} is detached.")]
    DetachedFrame(FrameId),
    #[error("The execution context was destroyed.")]
    ExecutionContextDestroyed,
    /// Error message related to a response that is not a
    /// `chromite_types::Error`
    #[error("{0}")]
    ChromeMessage(String),
    /// Detailed information about an exception (or error) that was thrown
    /// during script compilation or execution
    #[error("{0:?}")]
    JavascriptException(Box<ExceptionDetails>),
    #[error("{0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    DecodeError(#[from] base64::DecodeError),
}

impl CdpError {
    pub fn msg(msg: impl Into<String>) -> Self {
        CdpError::ChromeMessage(msg.into())
    }
}

impl From<Canceled> for CdpError {
    fn from(_: Canceled) -> Self {
        CdpError::TargetClosed("the reply channel was dropped")
    }
}

impl From<NavigationError> for CdpError {
    fn from(err: NavigationError) -> Self {
        match err {
            NavigationError::Timeout { err, .. } => CdpError::NavigationTimeout(err),
            NavigationError::FrameDetached { frame, .. } => CdpError::DetachedFrame(frame),
        }
    }
}

/// An Error where `now > deadline`
#[derive(Debug, Clone)]
pub struct DeadlineExceeded {
    /// The deadline that was set.
    pub deadline: Instant,
    /// The current time
    pub now: Instant,
}

impl DeadlineExceeded {
    pub fn new(now: Instant, deadline: Instant) -> Self {
        Self { deadline, now }
    }
}
