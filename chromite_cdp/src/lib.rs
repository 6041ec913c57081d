//! A curated, statically typed subset of the Chrome DevTools Protocol.
//!
//! Only the domains the client core consumes are defined here. Event
//! payloads the core does not own stay available as raw json through
//! [`cdp::events::CdpEvent::Other`].

pub mod cdp;

use crate::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use crate::cdp::browser_protocol::page::NavigateParams;
use crate::cdp::browser_protocol::target::CreateTargetParams;
use crate::cdp::js_protocol::runtime::EvaluateParams;

/// convenience fixups
impl<T: Into<String>> From<T> for CreateTargetParams {
    fn from(url: T) -> Self {
        CreateTargetParams::new(url)
    }
}

impl Default for CreateTargetParams {
    fn default() -> Self {
        "about:blank".into()
    }
}

impl<T: Into<String>> From<T> for NavigateParams {
    fn from(url: T) -> Self {
        NavigateParams::new(url)
    }
}

impl<T: Into<String>> From<T> for SetUserAgentOverrideParams {
    fn from(user_agent: T) -> Self {
        SetUserAgentOverrideParams::new(user_agent)
    }
}

impl<T: Into<String>> From<T> for EvaluateParams {
    fn from(expr: T) -> Self {
        EvaluateParams::new(expr)
    }
}
