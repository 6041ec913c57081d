//! The typed envelope every incoming event is decoded into at the router
//! boundary.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

use chromite_types::{Event, Method, MethodId};

use super::browser_protocol::network::*;
use super::browser_protocol::page::*;
use super::browser_protocol::target::*;
use super::js_protocol::runtime::*;

/// All protocol events the client knows the shape of.
///
/// Events not listed here are carried as raw json in [`CdpEvent::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum CdpEvent {
    TargetTargetCreated(EventTargetCreated),
    TargetTargetInfoChanged(EventTargetInfoChanged),
    TargetTargetDestroyed(EventTargetDestroyed),
    TargetAttachedToTarget(Box<EventAttachedToTarget>),
    TargetDetachedFromTarget(EventDetachedFromTarget),
    PageFrameAttached(EventFrameAttached),
    PageFrameDetached(EventFrameDetached),
    PageFrameNavigated(Box<EventFrameNavigated>),
    PageNavigatedWithinDocument(EventNavigatedWithinDocument),
    PageFrameStartedLoading(EventFrameStartedLoading),
    PageFrameStoppedLoading(EventFrameStoppedLoading),
    PageLifecycleEvent(EventLifecycleEvent),
    PageJavascriptDialogOpening(EventJavascriptDialogOpening),
    PageJavascriptDialogClosed(EventJavascriptDialogClosed),
    RuntimeExecutionContextCreated(EventExecutionContextCreated),
    RuntimeExecutionContextDestroyed(EventExecutionContextDestroyed),
    RuntimeExecutionContextsCleared(EventExecutionContextsCleared),
    NetworkRequestWillBeSent(Box<EventRequestWillBeSent>),
    NetworkRequestIntercepted(Box<EventRequestIntercepted>),
    NetworkRequestServedFromCache(EventRequestServedFromCache),
    NetworkResponseReceived(Box<EventResponseReceived>),
    NetworkLoadingFinished(EventLoadingFinished),
    NetworkLoadingFailed(EventLoadingFailed),
    /// Any event the client has no static definition for.
    Other(serde_json::Value),
}

impl CdpEvent {
    /// Decodes the `params` payload of the event identified by `method`.
    ///
    /// Unknown methods are preserved as [`CdpEvent::Other`].
    pub fn new(method: &str, params: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match method {
            EventTargetCreated::IDENTIFIER => {
                CdpEvent::TargetTargetCreated(serde_json::from_value(params)?)
            }
            EventTargetInfoChanged::IDENTIFIER => {
                CdpEvent::TargetTargetInfoChanged(serde_json::from_value(params)?)
            }
            EventTargetDestroyed::IDENTIFIER => {
                CdpEvent::TargetTargetDestroyed(serde_json::from_value(params)?)
            }
            EventAttachedToTarget::IDENTIFIER => {
                CdpEvent::TargetAttachedToTarget(Box::new(serde_json::from_value(params)?))
            }
            EventDetachedFromTarget::IDENTIFIER => {
                CdpEvent::TargetDetachedFromTarget(serde_json::from_value(params)?)
            }
            EventFrameAttached::IDENTIFIER => {
                CdpEvent::PageFrameAttached(serde_json::from_value(params)?)
            }
            EventFrameDetached::IDENTIFIER => {
                CdpEvent::PageFrameDetached(serde_json::from_value(params)?)
            }
            EventFrameNavigated::IDENTIFIER => {
                CdpEvent::PageFrameNavigated(Box::new(serde_json::from_value(params)?))
            }
            EventNavigatedWithinDocument::IDENTIFIER => {
                CdpEvent::PageNavigatedWithinDocument(serde_json::from_value(params)?)
            }
            EventFrameStartedLoading::IDENTIFIER => {
                CdpEvent::PageFrameStartedLoading(serde_json::from_value(params)?)
            }
            EventFrameStoppedLoading::IDENTIFIER => {
                CdpEvent::PageFrameStoppedLoading(serde_json::from_value(params)?)
            }
            EventLifecycleEvent::IDENTIFIER => {
                CdpEvent::PageLifecycleEvent(serde_json::from_value(params)?)
            }
            EventJavascriptDialogOpening::IDENTIFIER => {
                CdpEvent::PageJavascriptDialogOpening(serde_json::from_value(params)?)
            }
            EventJavascriptDialogClosed::IDENTIFIER => {
                CdpEvent::PageJavascriptDialogClosed(serde_json::from_value(params)?)
            }
            EventExecutionContextCreated::IDENTIFIER => {
                CdpEvent::RuntimeExecutionContextCreated(serde_json::from_value(params)?)
            }
            EventExecutionContextDestroyed::IDENTIFIER => {
                CdpEvent::RuntimeExecutionContextDestroyed(serde_json::from_value(params)?)
            }
            EventExecutionContextsCleared::IDENTIFIER => {
                CdpEvent::RuntimeExecutionContextsCleared(serde_json::from_value(params)?)
            }
            EventRequestWillBeSent::IDENTIFIER => {
                CdpEvent::NetworkRequestWillBeSent(Box::new(serde_json::from_value(params)?))
            }
            EventRequestIntercepted::IDENTIFIER => {
                CdpEvent::NetworkRequestIntercepted(Box::new(serde_json::from_value(params)?))
            }
            EventRequestServedFromCache::IDENTIFIER => {
                CdpEvent::NetworkRequestServedFromCache(serde_json::from_value(params)?)
            }
            EventResponseReceived::IDENTIFIER => {
                CdpEvent::NetworkResponseReceived(Box::new(serde_json::from_value(params)?))
            }
            EventLoadingFinished::IDENTIFIER => {
                CdpEvent::NetworkLoadingFinished(serde_json::from_value(params)?)
            }
            EventLoadingFailed::IDENTIFIER => {
                CdpEvent::NetworkLoadingFailed(serde_json::from_value(params)?)
            }
            _ => CdpEvent::Other(params),
        })
    }
}

/// A decoded incoming event: the method identifier, the session it is scoped
/// to, if any, and the typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEventMessage {
    /// Name of the method
    pub method: MethodId,
    /// The session this event is meant for.
    pub session_id: Option<String>,
    /// The decoded payload
    pub params: CdpEvent,
}

impl Method for CdpEventMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

impl Event for CdpEventMessage {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

impl<'de> Deserialize<'de> for CdpEventMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            method: String,
            #[serde(rename = "sessionId")]
            session_id: Option<String>,
            params: serde_json::Value,
        }

        let raw = Raw::deserialize(deserializer)?;
        let params = CdpEvent::new(&raw.method, raw.params).map_err(D::Error::custom)?;
        Ok(CdpEventMessage {
            method: raw.method.into(),
            session_id: raw.session_id,
            params,
        })
    }
}

/// Matches a [`CdpEvent`] and hands built-in payloads to the first closure
/// and the raw json of unknown events to the second.
#[macro_export]
macro_rules! consume_event {
    (match $ev:ident { $builtin:expr, $custom:expr }) => {{
        match $ev {
            $crate::cdp::CdpEvent::TargetTargetCreated(event) => $builtin(event),
            $crate::cdp::CdpEvent::TargetTargetInfoChanged(event) => $builtin(event),
            $crate::cdp::CdpEvent::TargetTargetDestroyed(event) => $builtin(event),
            $crate::cdp::CdpEvent::TargetAttachedToTarget(event) => $builtin(*event),
            $crate::cdp::CdpEvent::TargetDetachedFromTarget(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageFrameAttached(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageFrameDetached(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageFrameNavigated(event) => $builtin(*event),
            $crate::cdp::CdpEvent::PageNavigatedWithinDocument(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageFrameStartedLoading(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageFrameStoppedLoading(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageLifecycleEvent(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageJavascriptDialogOpening(event) => $builtin(event),
            $crate::cdp::CdpEvent::PageJavascriptDialogClosed(event) => $builtin(event),
            $crate::cdp::CdpEvent::RuntimeExecutionContextCreated(event) => $builtin(event),
            $crate::cdp::CdpEvent::RuntimeExecutionContextDestroyed(event) => $builtin(event),
            $crate::cdp::CdpEvent::RuntimeExecutionContextsCleared(event) => $builtin(event),
            $crate::cdp::CdpEvent::NetworkRequestWillBeSent(event) => $builtin(*event),
            $crate::cdp::CdpEvent::NetworkRequestIntercepted(event) => $builtin(*event),
            $crate::cdp::CdpEvent::NetworkRequestServedFromCache(event) => $builtin(event),
            $crate::cdp::CdpEvent::NetworkResponseReceived(event) => $builtin(*event),
            $crate::cdp::CdpEvent::NetworkLoadingFinished(event) => $builtin(event),
            $crate::cdp::CdpEvent::NetworkLoadingFailed(event) => $builtin(event),
            $crate::cdp::CdpEvent::Other(json) => $custom(json),
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_event() {
        let json = r#"{
            "method": "Page.lifecycleEvent",
            "sessionId": "SESSION",
            "params": {
                "frameId": "FRAME",
                "loaderId": "LOADER",
                "name": "load",
                "timestamp": 12.5
            }
        }"#;
        let msg: CdpEventMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.session_id.as_deref(), Some("SESSION"));
        match msg.params {
            CdpEvent::PageLifecycleEvent(ev) => {
                assert_eq!(ev.name, "load");
                assert_eq!(ev.frame_id.inner(), "FRAME");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_event_falls_back_to_raw_json() {
        let json = r#"{
            "method": "Animation.animationCanceled",
            "params": {"id": "1"}
        }"#;
        let msg: CdpEventMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.method, "Animation.animationCanceled");
        match msg.params {
            CdpEvent::Other(val) => assert_eq!(val["id"], "1"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn decodes_intercepted_request() {
        let json = r#"{
            "method": "Network.requestIntercepted",
            "params": {
                "interceptionId": "interception-job-1.0",
                "request": {
                    "url": "http://example.com/",
                    "method": "GET",
                    "headers": {}
                },
                "frameId": "FRAME",
                "resourceType": "Document",
                "isNavigationRequest": true,
                "authChallenge": {
                    "origin": "http://example.com",
                    "scheme": "basic",
                    "realm": "secret"
                }
            }
        }"#;
        let msg: CdpEventMessage = serde_json::from_str(json).unwrap();
        match msg.params {
            CdpEvent::NetworkRequestIntercepted(ev) => {
                assert!(ev.is_navigation_request);
                assert_eq!(ev.auth_challenge.unwrap().scheme, "basic");
                assert_eq!(ev.resource_type, ResourceType::Document);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
