use serde::{Deserialize, Serialize};

/// One exchange: what the user asked and what the assistant answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

impl Turn {
    pub fn new(user: &str, assistant: &str) -> Self {
        Self {
            user: user.to_string(),
            assistant: assistant.to_string(),
        }
    }
}

/// Conversation shown in the chat window, oldest turn first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn push(&mut self, user: &str, assistant: &str) {
        self.turns.push(Turn::new(user, assistant));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

#[cfg(test)]
impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_empties_any_history() {
        let mut history = History::new();
        history.push("hi", "hello");
        history.push("rain?", "maybe");
        history.clear();
        assert!(history.is_empty());

        // clearing again changes nothing
        history.clear();
        assert_eq!(history, History::new());
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut history = History::new();
        history.push("q", "a");
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json, serde_json::json!([{ "user": "q", "assistant": "a" }]));

        let back: History = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
