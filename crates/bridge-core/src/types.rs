//! Shared pipeline types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StreamFailure;

/// Target audience for a summary.
///
/// The set is closed: adding a role means adding a prompt template case,
/// not registering a value at runtime. Unknown role names arriving over a
/// wire boundary are handled by [`Role::parse`] returning `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Developer,
    #[serde(rename = "PM")]
    Pm,
    Support,
}

impl Role {
    /// All roles, in the order summaries are presented.
    pub const ALL: [Role; 3] = [Role::Developer, Role::Pm, Role::Support];

    /// Parse a role name from a wire or CLI boundary. Case-insensitive.
    pub fn parse(name: &str) -> Option<Role> {
        match name.trim().to_ascii_lowercase().as_str() {
            "developer" | "dev" => Some(Role::Developer),
            "pm" => Some(Role::Pm),
            "support" => Some(Role::Support),
            _ => None,
        }
    }

    /// The audience name used in prompt templates and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "Developer",
            Role::Pm => "PM",
            Role::Support => "Support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passage retrieved from the corpus, ordered by descending similarity
/// to the input text. Read-only; the pipeline never mutates passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPassage {
    pub content: String,
    pub similarity: f32,
}

/// A composed prompt for one (role, text) pair. Derived deterministically;
/// constructed per request and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBundle {
    pub system_instruction: String,
    pub user_prompt: String,
}

/// Events observed on a summary stream.
///
/// Zero or more `Fragment`s followed by exactly one terminal event; no
/// fragment is ever delivered after the terminal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryEvent {
    /// Incremental text produced by the model, in production order.
    Fragment { text: String },
    /// Success terminal. An empty accumulated text is valid.
    Completed,
    /// Failure terminal carrying the cause.
    Failed {
        #[serde(serialize_with = "serialize_failure")]
        failure: StreamFailure,
    },
}

fn serialize_failure<S>(failure: &StreamFailure, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&failure.to_string())
}

/// Aggregate outcome of draining all role streams. Partial success is a
/// normal result: some roles completed, others carry their failure.
#[derive(Debug)]
pub struct SummaryResult {
    pub by_role: HashMap<Role, Result<String, StreamFailure>>,
}

impl SummaryResult {
    /// Completed text for a role, if that role's stream succeeded.
    pub fn text(&self, role: Role) -> Option<&str> {
        match self.by_role.get(&role) {
            Some(Ok(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// The failure for a role, if that role's stream failed.
    pub fn failure(&self, role: Role) -> Option<&StreamFailure> {
        match self.by_role.get(&role) {
            Some(Err(failure)) => Some(failure),
            _ => None,
        }
    }

    pub fn all_completed(&self) -> bool {
        Role::ALL.iter().all(|role| self.text(*role).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_roles_case_insensitively() {
        assert_eq!(Role::parse("Developer"), Some(Role::Developer));
        assert_eq!(Role::parse("developer"), Some(Role::Developer));
        assert_eq!(Role::parse("dev"), Some(Role::Developer));
        assert_eq!(Role::parse("PM"), Some(Role::Pm));
        assert_eq!(Role::parse("pm"), Some(Role::Pm));
        assert_eq!(Role::parse(" Support "), Some(Role::Support));
    }

    #[test]
    fn parse_rejects_unknown_roles() {
        assert_eq!(Role::parse("designer"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn display_matches_audience_names() {
        assert_eq!(Role::Developer.to_string(), "Developer");
        assert_eq!(Role::Pm.to_string(), "PM");
        assert_eq!(Role::Support.to_string(), "Support");
    }

    #[test]
    fn role_round_trips_through_its_wire_names() {
        assert_eq!(serde_json::to_value(Role::Developer).unwrap(), "Developer");
        assert_eq!(serde_json::to_value(Role::Pm).unwrap(), "PM");
        assert_eq!(serde_json::to_value(Role::Support).unwrap(), "Support");

        let role: Role = serde_json::from_str("\"PM\"").unwrap();
        assert_eq!(role, Role::Pm);
        assert!(serde_json::from_str::<Role>("\"Pm\"").is_err());
    }

    #[test]
    fn summary_events_serialize_with_tagged_shapes() {
        let fragment = serde_json::to_value(SummaryEvent::Fragment {
            text: "Added ".to_string(),
        })
        .unwrap();
        assert_eq!(fragment["type"], "fragment");
        assert_eq!(fragment["text"], "Added ");

        let completed = serde_json::to_value(SummaryEvent::Completed).unwrap();
        assert_eq!(completed["type"], "completed");

        let failed = serde_json::to_value(SummaryEvent::Failed {
            failure: StreamFailure::ConfigurationMissing,
        })
        .unwrap();
        assert_eq!(failed["type"], "failed");
        assert_eq!(failed["failure"], "generation credential is not configured");
    }

    #[test]
    fn result_distinguishes_completed_from_failed_roles() {
        let mut by_role = HashMap::new();
        by_role.insert(Role::Developer, Ok("done".to_string()));
        by_role.insert(
            Role::Pm,
            Err(StreamFailure::GenerationFailed("quota".to_string())),
        );
        let result = SummaryResult { by_role };

        assert_eq!(result.text(Role::Developer), Some("done"));
        assert!(result.failure(Role::Developer).is_none());
        assert!(result.text(Role::Pm).is_none());
        assert!(result.failure(Role::Pm).is_some());
        assert!(!result.all_completed());
    }
}
