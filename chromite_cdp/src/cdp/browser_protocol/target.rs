//! The `Target` domain: discovery, attachment and lifetime of the things a
//! client can drive.

use serde::{Deserialize, Serialize};

use super::browser::BrowserContextId;

string_id! {
    /// Opaque identifier of a target.
    TargetId
}

string_id! {
    /// Unique identifier of an attached debugging session.
    SessionId
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    pub r#type: String,
    pub title: String,
    pub url: String,
    /// Whether the target has an attached client.
    pub attached: bool,
    /// Opener target Id
    pub opener_id: Option<TargetId>,
    pub browser_context_id: Option<BrowserContextId>,
}

/// Creates a new page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    /// The initial URL the page will be navigated to.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<BrowserContextId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
}

impl CreateTargetParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            browser_context_id: None,
            new_window: None,
            background: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetReturns {
    /// The id of the page opened.
    pub target_id: TargetId,
}

impl_command!(CreateTargetParams, "Target.createTarget", CreateTargetReturns);

/// Attaches to the target with given id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    pub target_id: TargetId,
    /// Enables "flat" access to the session via specifying sessionId
    /// attribute in the commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl AttachToTargetParams {
    pub fn new(target_id: impl Into<TargetId>) -> Self {
        Self {
            target_id: target_id.into(),
            flatten: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetReturns {
    /// Id assigned to the session.
    pub session_id: SessionId,
}

impl_command!(AttachToTargetParams, "Target.attachToTarget", AttachToTargetReturns);

/// Detaches session with given id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetachFromTargetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetachFromTargetReturns {}

impl_command!(DetachFromTargetParams, "Target.detachFromTarget", DetachFromTargetReturns);

/// Controls whether to discover available targets and notify via
/// `targetCreated`/`targetInfoChanged`/`targetDestroyed` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsParams {
    /// Whether to discover available targets.
    pub discover: bool,
}

impl SetDiscoverTargetsParams {
    pub fn new(discover: bool) -> Self {
        Self { discover }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsReturns {}

impl_command!(SetDiscoverTargetsParams, "Target.setDiscoverTargets", SetDiscoverTargetsReturns);

/// Closes the target. If the target is a page that gets closed too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetParams {
    pub target_id: TargetId,
}

impl CloseTargetParams {
    pub fn new(target_id: impl Into<TargetId>) -> Self {
        Self {
            target_id: target_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetReturns {
    pub success: Option<bool>,
}

impl_command!(CloseTargetParams, "Target.closeTarget", CloseTargetReturns);

/// Activates (focuses) the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateTargetParams {
    pub target_id: TargetId,
}

impl ActivateTargetParams {
    pub fn new(target_id: impl Into<TargetId>) -> Self {
        Self {
            target_id: target_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivateTargetReturns {}

impl_command!(ActivateTargetParams, "Target.activateTarget", ActivateTargetReturns);

/// Issued when a possible inspection target is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetCreated {
    pub target_info: TargetInfo,
}

impl_event!(EventTargetCreated, "Target.targetCreated");

/// Issued when some information about a target has changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetInfoChanged {
    pub target_info: TargetInfo,
}

impl_event!(EventTargetInfoChanged, "Target.targetInfoChanged");

/// Issued when a target is destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTargetDestroyed {
    pub target_id: TargetId,
}

impl_event!(EventTargetDestroyed, "Target.targetDestroyed");

/// Issued when an attached session is created on the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttachedToTarget {
    pub session_id: SessionId,
    pub target_info: TargetInfo,
    pub waiting_for_debugger: bool,
}

impl_event!(EventAttachedToTarget, "Target.attachedToTarget");

/// Issued when a session is detached, either through an explicit detach or
/// because the target was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetachedFromTarget {
    pub session_id: SessionId,
    pub target_id: Option<TargetId>,
}

impl_event!(EventDetachedFromTarget, "Target.detachedFromTarget");
