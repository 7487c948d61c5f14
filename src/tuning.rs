//! Live tuning pushed from a debug panel.

use serde::{Deserialize, Serialize};

use crate::controller::ControllerTuning;
use crate::wheel::WheelTuning;

/// Either half may be absent; absent halves leave the current values alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningUpdate {
    #[serde(default)]
    pub wheel: Option<WheelTuning>,
    #[serde(default)]
    pub controller: Option<ControllerTuning>,
}

impl TuningUpdate {
    pub fn is_empty(&self) -> bool {
        self.wheel.is_none() && self.controller.is_none()
    }
}
