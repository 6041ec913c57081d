//! The `Emulation` domain, as far as viewport overrides are concerned.

use serde::{Deserialize, Serialize};

/// Orientation type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenOrientationType {
    #[serde(rename = "portraitPrimary")]
    PortraitPrimary,
    #[serde(rename = "portraitSecondary")]
    PortraitSecondary,
    #[serde(rename = "landscapePrimary")]
    LandscapePrimary,
    #[serde(rename = "landscapeSecondary")]
    LandscapeSecondary,
}

/// Screen orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenOrientation {
    /// Orientation type.
    pub r#type: ScreenOrientationType,
    /// Rotation angle.
    pub angle: i64,
}

impl ScreenOrientation {
    pub fn new(r#type: ScreenOrientationType, angle: i64) -> Self {
        Self { r#type, angle }
    }
}

/// Overrides the values of device screen dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceMetricsOverrideParams {
    /// Overriding width value in pixels (minimum 0, maximum 10000000). 0
    /// disables the override.
    pub width: i64,
    /// Overriding height value in pixels (minimum 0, maximum 10000000). 0
    /// disables the override.
    pub height: i64,
    /// Overriding device scale factor value. 0 disables the override.
    pub device_scale_factor: f64,
    /// Whether to emulate mobile device.
    pub mobile: bool,
    /// Screen orientation override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_orientation: Option<ScreenOrientation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceMetricsOverrideReturns {}

impl_command!(
    SetDeviceMetricsOverrideParams,
    "Emulation.setDeviceMetricsOverride",
    SetDeviceMetricsOverrideReturns
);

/// Enables touch on platforms which do not support them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTouchEmulationEnabledParams {
    /// Whether the touch event emulation should be enabled.
    pub enabled: bool,
    /// Maximum touch points supported. Defaults to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_touch_points: Option<i64>,
}

impl SetTouchEmulationEnabledParams {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            max_touch_points: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetTouchEmulationEnabledReturns {}

impl_command!(
    SetTouchEmulationEnabledParams,
    "Emulation.setTouchEmulationEnabled",
    SetTouchEmulationEnabledReturns
);
