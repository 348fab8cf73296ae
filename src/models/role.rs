use serde::{Deserialize, Serialize};

/// The role an actor acts under.
///
/// - `Planner`: Writes and submits items for review, manages dependencies
/// - `Implementer`: Picks up approved items and completes them (the
///   autonomous worker acts as this role)
/// - `Authority`: Approves, accepts and rejects work
///
/// The short names used by API keys of earlier releases (`pm`, `dev`,
/// `human`) are still accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "pm")]
    Planner,
    #[serde(alias = "dev")]
    Implementer,
    #[serde(alias = "human")]
    Authority,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Planner, Role::Implementer, Role::Authority];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Implementer => "implementer",
            Self::Authority => "authority",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planner" | "pm" => Some(Self::Planner),
            "implementer" | "dev" => Some(Self::Implementer),
            "authority" | "human" => Some(Self::Authority),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_role_names_parse() {
        assert_eq!(Role::from_str("pm"), Some(Role::Planner));
        assert_eq!(Role::from_str("dev"), Some(Role::Implementer));
        assert_eq!(Role::from_str("human"), Some(Role::Authority));
        assert_eq!(Role::from_str("admin"), None);

        let role: Role = serde_json::from_str("\"human\"").unwrap();
        assert_eq!(role, Role::Authority);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"authority\"");
    }
}
