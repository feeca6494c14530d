// src/track/status.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Review state of a tracked lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    InProgress,
    Completed,
    Rejected,
    Expired,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Rejected | Status::Expired)
    }

    /// Allowed edges: new -> in_progress, in_progress -> completed or
    /// rejected, and any non-terminal state -> expired. Everything else,
    /// including self-transitions, is refused.
    pub fn can_transition(self, to: Status) -> bool {
        match (self, to) {
            (Status::New, Status::InProgress) => true,
            (Status::InProgress, Status::Completed) | (Status::InProgress, Status::Rejected) => {
                true
            }
            (from, Status::Expired) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::New => "new",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Rejected => "rejected",
            Status::Expired => "expired",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Status::*;

    #[test]
    fn edge_set_is_exact() {
        let all = [New, InProgress, Completed, Rejected, Expired];
        let allowed = [
            (New, InProgress),
            (New, Expired),
            (InProgress, Completed),
            (InProgress, Rejected),
            (InProgress, Expired),
        ];
        for from in all {
            for to in all {
                let expect = allowed.contains(&(from, to));
                assert_eq!(from.can_transition(to), expect, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!New.is_terminal());
        assert!(!InProgress.is_terminal());
        assert!(Completed.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(Expired.is_terminal());
    }

    #[test]
    fn snake_case_wire_format() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in_progress\"");
        let back: Status = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(back, InProgress);
    }
}
