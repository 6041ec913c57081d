//! The `Browser` domain.

use serde::{Deserialize, Serialize};

string_id! {
    /// Identifier of a browser context a target runs in.
    BrowserContextId
}

/// Version information about the browser instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVersionReturns {
    /// Protocol version.
    pub protocol_version: String,
    /// Product name.
    pub product: String,
    /// Product revision.
    pub revision: String,
    /// User-Agent.
    pub user_agent: String,
    /// V8 version.
    pub js_version: String,
}

impl_command!(GetVersionParams, "Browser.getVersion", GetVersionReturns);

/// Close the browser gracefully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseParams {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseReturns {}

impl_command!(CloseParams, "Browser.close", CloseReturns);
