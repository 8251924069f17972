//! Backend model list, per-role model assignments and pull progress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A model installed in the host's Ollama instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
}

/// Functional slot a model can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ORCHESTRATOR_MODEL")]
    Orchestrator,
    #[serde(rename = "SPEAKER_MODEL")]
    Speaker,
    #[serde(rename = "ANALYST_MODEL")]
    Analyst,
    #[serde(rename = "CODER_MODEL")]
    Coder,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Orchestrator, Self::Speaker, Self::Analyst, Self::Coder];

    /// Render role to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "ORCHESTRATOR_MODEL",
            Self::Speaker => "SPEAKER_MODEL",
            Self::Analyst => "ANALYST_MODEL",
            Self::Coder => "CODER_MODEL",
        }
    }

    /// Short human label (`ORCHESTRATOR`, `CODER`, ...).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Orchestrator => "ORCHESTRATOR",
            Self::Speaker => "SPEAKER",
            Self::Analyst => "ANALYST",
            Self::Coder => "CODER",
        }
    }

    /// Parse either the wire name or the short label, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        let short = upper.strip_suffix("_MODEL").unwrap_or(upper.as_str());
        match short {
            "ORCHESTRATOR" => Some(Self::Orchestrator),
            "SPEAKER" => Some(Self::Speaker),
            "ANALYST" => Some(Self::Analyst),
            "CODER" => Some(Self::Coder),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Model assigned to each role. Every role always has an entry; an empty
/// string means "unassigned". Keys missing from a host snapshot default to
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleModels {
    #[serde(rename = "ORCHESTRATOR_MODEL")]
    orchestrator: String,
    #[serde(rename = "SPEAKER_MODEL")]
    speaker: String,
    #[serde(rename = "ANALYST_MODEL")]
    analyst: String,
    #[serde(rename = "CODER_MODEL")]
    coder: String,
}

impl RoleModels {
    /// Assign the same model to every role.
    #[must_use]
    pub fn uniform(model: &str) -> Self {
        let mut roles = Self::default();
        for role in Role::ALL {
            roles.set(role, model);
        }
        roles
    }

    #[must_use]
    pub fn get(&self, role: Role) -> &str {
        match role {
            Role::Orchestrator => &self.orchestrator,
            Role::Speaker => &self.speaker,
            Role::Analyst => &self.analyst,
            Role::Coder => &self.coder,
        }
    }

    pub fn set(&mut self, role: Role, model: impl Into<String>) {
        let slot = match role {
            Role::Orchestrator => &mut self.orchestrator,
            Role::Speaker => &mut self.speaker,
            Role::Analyst => &mut self.analyst,
            Role::Coder => &mut self.coder,
        };
        *slot = model.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        Role::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

/// Available models, role assignments and the single in-flight pull.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<OllamaModel>,
    roles: RoleModels,
    pull_progress: String,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the model list with a fresh host snapshot.
    pub fn replace_models(&mut self, models: Vec<OllamaModel>) {
        self.models = models;
    }

    /// Replace all role assignments with a host snapshot.
    pub fn replace_roles(&mut self, roles: RoleModels) {
        self.roles = roles;
    }

    /// Local, optimistic assignment.
    pub fn assign(&mut self, role: Role, model: impl Into<String>) {
        self.roles.set(role, model);
    }

    pub fn set_pull_progress(&mut self, status: impl Into<String>) {
        self.pull_progress = status.into();
    }

    pub fn clear_pull_progress(&mut self) {
        self.pull_progress.clear();
    }

    /// A pull is in flight while the progress string is non-empty.
    #[must_use]
    pub fn is_pulling(&self) -> bool {
        !self.pull_progress.is_empty()
    }

    #[must_use]
    pub fn pull_progress(&self) -> &str {
        &self.pull_progress
    }

    #[must_use]
    pub fn models(&self) -> &[OllamaModel] {
        &self.models
    }

    #[must_use]
    pub fn roles(&self) -> &RoleModels {
        &self.roles
    }

    #[must_use]
    pub fn has_model(&self, name: &str) -> bool {
        self.models.iter().any(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn model(name: &str) -> OllamaModel {
        OllamaModel {
            name: name.to_owned(),
            modified_at: "2024-05-01T10:00:00Z".to_owned(),
            size: 4_000_000_000,
        }
    }

    #[test]
    fn role_parse_accepts_label_and_wire_name() {
        assert_eq!(Role::parse("coder"), Some(Role::Coder));
        assert_eq!(Role::parse("SPEAKER_MODEL"), Some(Role::Speaker));
        assert_eq!(Role::parse("writer"), None);
        assert_eq!(Role::Analyst.as_str(), "ANALYST_MODEL");
        assert_eq!(serde_json::to_value(Role::Coder).unwrap(), "CODER_MODEL");
    }

    #[test]
    fn role_models_always_have_every_role() {
        let roles: RoleModels =
            serde_json::from_value(serde_json::json!({"CODER_MODEL": "llama3"})).unwrap();
        assert_eq!(roles.get(Role::Coder), "llama3");
        assert_eq!(roles.get(Role::Orchestrator), "");
        assert_eq!(roles.iter().count(), 4);

        let empty: RoleModels = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty, RoleModels::default());

        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn uniform_assigns_every_role() {
        let roles = RoleModels::uniform("qwen2");
        assert!(roles.iter().all(|(_, m)| m == "qwen2"));
    }

    #[test]
    fn model_list_is_replaced_wholesale() {
        let mut registry = ModelRegistry::new();
        registry.replace_models(vec![model("a"), model("b")]);
        registry.replace_models(vec![model("c")]);
        assert_eq!(registry.models(), &[model("c")]);
        assert!(registry.has_model("c"));
        assert!(!registry.has_model("a"));
    }

    #[test]
    fn pull_progress_gates_new_pulls() {
        let mut registry = ModelRegistry::new();
        assert!(!registry.is_pulling());
        registry.set_pull_progress("pulling manifest");
        assert!(registry.is_pulling());
        registry.set_pull_progress("");
        assert!(!registry.is_pulling());
        registry.set_pull_progress("downloading (12.5%)");
        registry.clear_pull_progress();
        assert_eq!(registry.pull_progress(), "");
    }

    #[test]
    fn ollama_model_tolerates_missing_optional_fields() {
        let parsed: OllamaModel =
            serde_json::from_value(serde_json::json!({"name": "phi3"})).unwrap();
        assert_eq!(parsed.size, 0);
        assert!(parsed.modified_at.is_empty());
    }
}
