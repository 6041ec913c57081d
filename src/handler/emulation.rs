use std::time::Duration;

use chromite_cdp::cdp::browser_protocol::emulation::{
    ScreenOrientation, ScreenOrientationType, SetDeviceMetricsOverrideParams,
    SetTouchEmulationEnabledParams,
};
use chromite_types::Method;

use crate::cmd::CommandChain;

/// Device metrics applied to every page of a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Device scale factor, `None` keeps the platform default.
    pub device_scale_factor: Option<f64>,
    pub emulating_mobile: bool,
    pub is_landscape: bool,
    pub has_touch: bool,
}

impl Viewport {
    fn orientation(&self) -> ScreenOrientation {
        if self.is_landscape {
            ScreenOrientation::new(ScreenOrientationType::LandscapePrimary, 90)
        } else {
            ScreenOrientation::new(ScreenOrientationType::PortraitPrimary, 0)
        }
    }

    /// The device metrics override this viewport translates to.
    fn device_metrics(&self) -> SetDeviceMetricsOverrideParams {
        SetDeviceMetricsOverrideParams {
            width: self.width as i64,
            height: self.height as i64,
            device_scale_factor: self.device_scale_factor.unwrap_or(1.),
            mobile: self.emulating_mobile,
            screen_orientation: Some(self.orientation()),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 800,
            height: 600,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        }
    }
}

/// Applies the configured viewport override to a freshly attached target.
#[derive(Debug)]
pub struct EmulationManager {
    pub emulating_mobile: bool,
    pub has_touch: bool,
    pub needs_reload: bool,
    pub request_timeout: Duration,
}

impl EmulationManager {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            emulating_mobile: false,
            has_touch: false,
            needs_reload: false,
            request_timeout,
        }
    }

    pub fn init_commands(&mut self, viewport: &Viewport) -> CommandChain {
        let set_device = viewport.device_metrics();
        let set_touch = SetTouchEmulationEnabledParams::new(viewport.has_touch);

        let mut cmds = Vec::with_capacity(2);
        if let Ok(params) = serde_json::to_value(&set_device) {
            cmds.push((set_device.identifier(), params));
        }
        if let Ok(params) = serde_json::to_value(&set_touch) {
            cmds.push((set_touch.identifier(), params));
        }

        self.needs_reload = self.emulating_mobile != viewport.emulating_mobile
            || self.has_touch != viewport.has_touch;

        CommandChain::new(cmds, self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_follows_the_landscape_flag() {
        let mut viewport = Viewport::default();
        assert_eq!(viewport.orientation().angle, 0);

        viewport.is_landscape = true;
        let orientation = viewport.orientation();
        assert_eq!(orientation.angle, 90);
        assert_eq!(orientation.r#type, ScreenOrientationType::LandscapePrimary);
    }

    #[test]
    fn device_metrics_default_the_scale_factor() {
        let viewport = Viewport {
            width: 1280,
            height: 720,
            ..Default::default()
        };
        let metrics = viewport.device_metrics();
        assert_eq!(metrics.width, 1280);
        assert_eq!(metrics.height, 720);
        assert_eq!(metrics.device_scale_factor, 1.);
        assert!(!metrics.mobile);
    }
}
