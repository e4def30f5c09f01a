use serde::{Deserialize, Serialize};

use crate::markers::UpdateMode;

/// What started a processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// File events, startup scans and other background passes.
    Automatic,
    /// An explicit user request; evaluates every directive.
    Manual,
}

impl Trigger {
    pub fn is_manual(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Decides whether a directive is left alone during a pass.
pub fn should_skip(mode: UpdateMode, trigger: Trigger, already_serialized: bool) -> bool {
    if trigger.is_manual() {
        return false;
    }
    match mode {
        UpdateMode::Manual => true,
        UpdateMode::Once => already_serialized,
        UpdateMode::Auto | UpdateMode::OnceAndEject => false,
    }
}
