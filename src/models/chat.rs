use serde::{ Deserialize, Deserializer, Serialize, Serializer };
use std::fmt;

/// Author of a transcript entry.
///
/// The wire form follows the chat-completion vocabulary the frontend already
/// speaks: the interviewer is `"assistant"`, the candidate is `"user"`. Any
/// role string other than `"assistant"` / `"interviewer"` is read as the
/// candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Candidate,
    Interviewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "user",
            Role::Interviewer => "assistant",
        }
    }

    pub fn from_wire(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "assistant" | "interviewer" => Role::Interviewer,
            _ => Role::Candidate,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::from_wire(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn candidate(content: impl Into<String>) -> Self {
        Self { role: Role::Candidate, content: content.into() }
    }

    pub fn interviewer(content: impl Into<String>) -> Self {
        Self { role: Role::Interviewer, content: content.into() }
    }

    pub fn is_candidate(&self) -> bool {
        self.role == Role::Candidate
    }
}
