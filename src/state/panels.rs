//! Panel visibility: the sidebar plus a group of mutually exclusive right panels.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Auxiliary panels the shell can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Panel {
    Sidebar,
    Code,
    Logs,
    Canvas,
    ProjectBoard,
}

/// Right panels in the priority order used to pick the visible one.
pub const RIGHT_PANELS: [Panel; 4] = [Panel::Code, Panel::Logs, Panel::Canvas, Panel::ProjectBoard];

impl Panel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sidebar => "sidebar",
            Self::Code => "code",
            Self::Logs => "logs",
            Self::Canvas => "canvas",
            Self::ProjectBoard => "project-board",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sidebar" | "settings" => Some(Self::Sidebar),
            "code" | "ide" => Some(Self::Code),
            "logs" => Some(Self::Logs),
            "canvas" => Some(Self::Canvas),
            "project-board" | "board" | "tasks" => Some(Self::ProjectBoard),
            _ => None,
        }
    }

    /// Whether this panel belongs to the mutually exclusive right group.
    #[must_use]
    pub fn is_right(self) -> bool {
        RIGHT_PANELS.contains(&self)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of active panels. At most one right panel is ever active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSet {
    active: BTreeSet<Panel>,
}

impl Default for PanelSet {
    /// The shell opens with the sidebar shown.
    fn default() -> Self {
        Self {
            active: BTreeSet::from([Panel::Sidebar]),
        }
    }
}

impl PanelSet {
    /// A set with nothing open.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            active: BTreeSet::new(),
        }
    }

    /// Toggle a panel and return whether it is active afterwards.
    ///
    /// Right panels first clear the whole right group, then the panel is
    /// re-added unless it was the one already open. The sidebar toggles on
    /// its own without touching the right group.
    pub fn toggle(&mut self, panel: Panel) -> bool {
        let was_active = self.active.contains(&panel);
        if panel.is_right() {
            for right in RIGHT_PANELS {
                self.active.remove(&right);
            }
            if !was_active {
                self.active.insert(panel);
            }
        } else if was_active {
            self.active.remove(&panel);
        } else {
            self.active.insert(panel);
        }
        !was_active
    }

    #[must_use]
    pub fn is_active(&self, panel: Panel) -> bool {
        self.active.contains(&panel)
    }

    /// The right panel currently shown, if any.
    #[must_use]
    pub fn active_right_panel(&self) -> Option<Panel> {
        RIGHT_PANELS.into_iter().find(|p| self.active.contains(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = Panel> + '_ {
        self.active.iter().copied()
    }
}
