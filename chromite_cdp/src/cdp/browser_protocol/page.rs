//! The `Page` domain: frames, navigation and page lifecycle.

use serde::{Deserialize, Serialize};

use super::network::LoaderId;

string_id! {
    /// Unique frame identifier.
    FrameId
}

string_id! {
    /// Identifier of a script injected via `addScriptToEvaluateOnNewDocument`.
    ScriptIdentifier
}

/// Information about the frame on the page, as reported by the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Frame unique identifier.
    pub id: FrameId,
    /// Parent frame identifier.
    pub parent_id: Option<FrameId>,
    /// Identifier of the loader associated with this frame.
    pub loader_id: Option<LoaderId>,
    /// Frame's name as specified in the tag.
    pub name: Option<String>,
    /// Frame document's URL without fragment.
    pub url: String,
    /// Frame document's URL fragment including the '#'.
    pub url_fragment: Option<String>,
    /// Frame document's security origin.
    pub security_origin: Option<String>,
    /// Frame document's mimeType as determined by the browser.
    pub mime_type: Option<String>,
}

/// Information about the frame hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
    /// Child frames.
    pub child_frames: Option<Vec<FrameTree>>,
}

/// Javascript dialog type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogType {
    Alert,
    Confirm,
    Prompt,
    Beforeunload,
}

impl AsRef<str> for DialogType {
    fn as_ref(&self) -> &str {
        match self {
            DialogType::Alert => "alert",
            DialogType::Confirm => "confirm",
            DialogType::Prompt => "prompt",
            DialogType::Beforeunload => "beforeunload",
        }
    }
}

/// Enables page domain notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableReturns {}

impl_command!(EnableParams, "Page.enable", EnableReturns);

/// Returns present frame tree structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeReturns {
    pub frame_tree: FrameTree,
}

impl_command!(GetFrameTreeParams, "Page.getFrameTree", GetFrameTreeReturns);

/// Controls whether page will emit lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLifecycleEventsEnabledParams {
    pub enabled: bool,
}

impl SetLifecycleEventsEnabledParams {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetLifecycleEventsEnabledReturns {}

impl_command!(
    SetLifecycleEventsEnabledParams,
    "Page.setLifecycleEventsEnabled",
    SetLifecycleEventsEnabledReturns
);

/// Navigates current page to the given URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    /// URL to navigate the page to.
    pub url: String,
    /// Referrer URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Frame id to navigate, if not specified navigates the top frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

impl NavigateParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
            frame_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    /// Frame id that has navigated (or failed to navigate)
    pub frame_id: FrameId,
    /// Loader identifier. Absent for same-document navigations.
    pub loader_id: Option<LoaderId>,
    /// User friendly error message, present if and only if navigation has
    /// failed.
    pub error_text: Option<String>,
}

impl_command!(NavigateParams, "Page.navigate", NavigateReturns);

/// Reloads given page, optionally ignoring the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReloadParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
    /// If set, the script will be injected into all frames of the inspected
    /// page after reload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_to_evaluate_on_load: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReloadReturns {}

impl_command!(ReloadParams, "Page.reload", ReloadReturns);

/// Enable page Content Security Policy by-passing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBypassCspParams {
    /// Whether to bypass page CSP.
    pub enabled: bool,
}

impl SetBypassCspParams {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetBypassCspReturns {}

impl_command!(SetBypassCspParams, "Page.setBypassCSP", SetBypassCspReturns);

/// Evaluates given script in every frame upon creation (before loading
/// frame's scripts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentParams {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

impl AddScriptToEvaluateOnNewDocumentParams {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            world_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentReturns {
    pub identifier: ScriptIdentifier,
}

impl_command!(
    AddScriptToEvaluateOnNewDocumentParams,
    "Page.addScriptToEvaluateOnNewDocument",
    AddScriptToEvaluateOnNewDocumentReturns
);

/// Accepts or dismisses a JavaScript initiated dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleJavaScriptDialogParams {
    /// Whether to accept or dismiss the dialog.
    pub accept: bool,
    /// The text to enter into the dialog prompt before accepting. Used only
    /// if this is a prompt dialog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
}

impl HandleJavaScriptDialogParams {
    pub fn new(accept: bool) -> Self {
        Self {
            accept,
            prompt_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HandleJavaScriptDialogReturns {}

impl_command!(
    HandleJavaScriptDialogParams,
    "Page.handleJavaScriptDialog",
    HandleJavaScriptDialogReturns
);

/// Fired when frame has been attached to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameAttached {
    pub frame_id: FrameId,
    pub parent_frame_id: FrameId,
}

impl_event!(EventFrameAttached, "Page.frameAttached");

/// Fired when frame has been detached from its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameDetached {
    pub frame_id: FrameId,
}

impl_event!(EventFrameDetached, "Page.frameDetached");

/// Fired once navigation of the frame has completed. Frame is now associated
/// with the new loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameNavigated {
    pub frame: Frame,
}

impl_event!(EventFrameNavigated, "Page.frameNavigated");

/// Fired when same-document navigation happens, e.g. due to history API usage
/// or anchor navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNavigatedWithinDocument {
    pub frame_id: FrameId,
    /// Frame's new url.
    pub url: String,
}

impl_event!(EventNavigatedWithinDocument, "Page.navigatedWithinDocument");

/// Fired when frame has started loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameStartedLoading {
    pub frame_id: FrameId,
}

impl_event!(EventFrameStartedLoading, "Page.frameStartedLoading");

/// Fired when frame has stopped loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameStoppedLoading {
    pub frame_id: FrameId,
}

impl_event!(EventFrameStoppedLoading, "Page.frameStoppedLoading");

/// Fired for top level page lifecycle events such as navigation, load,
/// paint, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLifecycleEvent {
    /// Id of the frame.
    pub frame_id: FrameId,
    /// Loader identifier.
    pub loader_id: LoaderId,
    pub name: String,
    pub timestamp: Option<f64>,
}

impl_event!(EventLifecycleEvent, "Page.lifecycleEvent");

/// Fired when a JavaScript initiated dialog (alert, confirm, prompt, or
/// onbeforeunload) is about to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventJavascriptDialogOpening {
    /// Frame url.
    pub url: String,
    /// Message that will be displayed by the dialog.
    pub message: String,
    /// Dialog type.
    pub r#type: DialogType,
    /// Default dialog prompt.
    pub default_prompt: Option<String>,
}

impl_event!(EventJavascriptDialogOpening, "Page.javascriptDialogOpening");

/// Fired when a JavaScript initiated dialog has been closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventJavascriptDialogClosed {
    /// Whether dialog was confirmed.
    pub result: bool,
    /// User input in case of prompt.
    pub user_input: String,
}

impl_event!(EventJavascriptDialogClosed, "Page.javascriptDialogClosed");
