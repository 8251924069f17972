//! Agent activity flags driving the "thinking" and "typing" affordances.

use serde::{Deserialize, Serialize};

/// Whether the remote agent is currently thinking and/or typing.
///
/// The two flags are independent; the host may flip either one on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub is_thinking: bool,
    pub is_typing: bool,
}

impl AgentState {
    /// Both flags cleared.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// State forced by the send action before the host answers.
    #[must_use]
    pub fn thinking() -> Self {
        Self {
            is_thinking: true,
            is_typing: false,
        }
    }

    #[must_use]
    pub fn is_idle(self) -> bool {
        !self.is_thinking && !self.is_typing
    }

    /// Merge the fields present in `patch`, leaving the others unchanged.
    pub fn apply(&mut self, patch: AgentStatePatch) {
        if let Some(thinking) = patch.is_thinking {
            self.is_thinking = thinking;
        }
        if let Some(typing) = patch.is_typing {
            self.is_typing = typing;
        }
    }
}

/// Partial update pushed by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_typing: Option<bool>,
}

impl AgentStatePatch {
    #[must_use]
    pub fn thinking(value: bool) -> Self {
        Self {
            is_thinking: Some(value),
            is_typing: None,
        }
    }

    #[must_use]
    pub fn typing(value: bool) -> Self {
        Self {
            is_thinking: None,
            is_typing: Some(value),
        }
    }
}
