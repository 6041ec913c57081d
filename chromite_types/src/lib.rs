use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identifier of a method: the `domain.method` string, e.g. `Page.navigate`
pub type MethodId = Cow<'static, str>;

/// A message sent by the client over the wire.
#[derive(Serialize, Debug, PartialEq)]
pub struct MethodCall {
    /// Identifier for this method call.
    ///
    /// [`MethodCall`] ids must be unique for every connection.
    pub id: CallId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub method: MethodId,
    pub params: serde_json::Value,
}

/// Unique identifier for a single outgoing method call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(usize);

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// A type that can be issued as a protocol request and knows the shape of
/// its response.
pub trait Command: serde::ser::Serialize + Method {
    type Response: DeserializeOwned + fmt::Debug;

    /// Deserialize the raw `result` payload into the response type.
    fn response_from_value(response: serde_json::Value) -> serde_json::Result<Self::Response> {
        serde_json::from_value(response)
    }
}

/// The decoded reply to a [`Command`].
pub struct CommandResponse<T>
where
    T: fmt::Debug,
{
    pub id: CallId,
    pub result: T,
    pub method: MethodId,
}

impl<T: fmt::Debug> Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

pub trait Method {
    /// The whole string identifier for this method like: `Page.navigate`
    fn identifier(&self) -> MethodId;

    /// The name of the domain this method belongs to: `Page`
    fn domain_name(&self) -> MethodId {
        self.split().0
    }

    /// The standalone identifier of the method inside the domain: `navigate`
    fn method_name(&self) -> MethodId {
        self.split().1
    }

    /// Tuple of (`domain_name`, `method_name`)
    fn split(&self) -> (MethodId, MethodId) {
        match self.identifier() {
            Cow::Borrowed(id) => {
                let mut iter = id.split('.');
                (iter.next().unwrap().into(), iter.next().unwrap().into())
            }
            Cow::Owned(id) => {
                let mut iter = id.split('.');
                (
                    Cow::Owned(iter.next().unwrap().into()),
                    Cow::Owned(iter.next().unwrap().into()),
                )
            }
        }
    }
}

/// An unparametrized identifier lookup for a method, usable without an
/// instance.
pub trait MethodType {
    fn method_id() -> MethodId
    where
        Self: Sized;
}

/// A protocol event: a method identifier plus a payload, optionally scoped
/// to a session.
pub trait Event: Method + DeserializeOwned {
    fn session_id(&self) -> Option<&str>;
}

/// An event whose payload the client keeps as raw json.
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct CdpJsonEventMessage {
    /// Name of the method
    pub method: MethodId,
    /// The session this event is meant for.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    /// Json payload of the event
    pub params: serde_json::Value,
}

impl Method for CdpJsonEventMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

impl Event for CdpJsonEventMessage {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// A request destined for the wire, not yet assigned a [`CallId`].
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Request {
    pub method: MethodId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(method: MethodId, params: serde_json::Value) -> Self {
        Self {
            method,
            params,
            session_id: None,
        }
    }

    pub fn with_session(
        method: MethodId,
        params: serde_json::Value,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            method,
            params,
            session_id: Some(session_id.into()),
        }
    }
}

/// A response to a [`MethodCall`] from the browser instance.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    /// matching [`MethodCall`] identifier
    pub id: CallId,
    /// The response payload
    pub result: Option<serde_json::Value>,
    /// The reason why the [`MethodCall`] failed.
    pub error: Option<Error>,
}

/// Incoming messages are either replies to method calls or events.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum Message<T = CdpJsonEventMessage> {
    Response(Response),
    Event(T),
}

/// Error object the remote endpoint attaches to a failed method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Error code
    pub code: i64,
    /// Error Message
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// Represents a binary type as defined by the protocol: base64-encoded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary(String);

impl Binary {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Binary {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for Binary {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_distinguishes_response_and_event() {
        let msg: Message = serde_json::from_str(r#"{"id":1,"result":{}}"#).unwrap();
        assert!(matches!(msg, Message::Response(_)));

        let msg: Message =
            serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{"timestamp":1.0}}"#)
                .unwrap();
        match msg {
            Message::Event(ev) => assert_eq!(ev.method, "Page.loadEventFired"),
            _ => panic!("expected event"),
        }
    }

    #[test]
    fn method_split() {
        let ev = CdpJsonEventMessage {
            method: "DOM.documentUpdated".into(),
            session_id: None,
            params: serde_json::Value::Null,
        };
        assert_eq!(ev.domain_name(), "DOM");
        assert_eq!(ev.method_name(), "documentUpdated");
    }

    #[test]
    fn response_error_is_decoded() {
        let msg: Message =
            serde_json::from_str(r#"{"id":7,"error":{"code":-32601,"message":"method missing"}}"#)
                .unwrap();
        match msg {
            Message::Response(resp) => {
                let err = resp.error.unwrap();
                assert_eq!(err.code, -32601);
                assert_eq!(err.message, "method missing");
            }
            _ => panic!("expected response"),
        }
    }
}
