use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Interviewer,
    Candidate,
}

impl Role {
    /// Line prefix in the flattened transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::Interviewer => "Interviewer",
            Role::Candidate => "Candidate",
        }
    }
}

/// A single utterance in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Message {
    /// Rendered form, e.g. `"Candidate: I'm a backend engineer."`
    pub fn line(&self) -> String {
        format!("{}: {}", self.role.label(), self.text)
    }
}

/// Append-only conversation record.
///
/// Keeps the structured list and the newline-joined string the backend wants.
/// Both change only inside [`Transcript::append`], so splitting the flattened
/// string on `\n` always gives the rendered lines of the list, in order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    flattened: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one utterance. Embedded line breaks are folded into spaces.
    pub fn append(&mut self, role: Role, text: &str) -> &Message {
        let text = text
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let message = Message {
            role,
            text,
            at: Utc::now(),
        };

        if !self.flattened.is_empty() {
            self.flattened.push('\n');
        }
        self.flattened.push_str(&message.line());

        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn flattened(&self) -> &str {
        &self.flattened
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
