//! The `Security` domain.

use serde::{Deserialize, Serialize};

/// Enable/disable whether all certificate errors should be ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIgnoreCertificateErrorsParams {
    /// If true, all certificate errors will be ignored.
    pub ignore: bool,
}

impl SetIgnoreCertificateErrorsParams {
    pub fn new(ignore: bool) -> Self {
        Self { ignore }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetIgnoreCertificateErrorsReturns {}

impl_command!(
    SetIgnoreCertificateErrorsParams,
    "Security.setIgnoreCertificateErrors",
    SetIgnoreCertificateErrorsReturns
);
