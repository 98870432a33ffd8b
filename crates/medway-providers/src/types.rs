use serde::{Deserialize, Serialize};

use medway_core::types::Intent;

/// A single user turn handed to the intent classifier.
#[derive(Clone, Debug)]
pub enum UserInput {
    /// Plain text typed by the user.
    Text(String),
    /// Raw voice payload; the classifier transcribes it as part of the call.
    Voice { mime: String, data: Vec<u8> },
}

impl UserInput {
    /// The text of the input, if it was typed. Voice inputs have no text
    /// until the classifier returns a transcription.
    pub fn text(&self) -> Option<&str> {
        match self {
            UserInput::Text(t) => Some(t),
            UserInput::Voice { .. } => None,
        }
    }
}

/// Result of classifying one user turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    /// Extracted search subject for the chosen intent.
    pub query: String,
    /// Transcription of voice input; equals the raw text for text input.
    pub transcription: String,
    /// Whether the classifier detected an emergency in the turn.
    pub is_emergency: bool,
    /// Location mentioned in the turn, if the classifier extracted one.
    pub detected_location: Option<String>,
}

/// One message of trimmed history fed to the contextual-chat collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "system".
    pub role: String,
    pub content: String,
}

/// Structured action a contextual-chat reply can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatAction {
    /// Run a nearby-facility search with the supplied query.
    SearchMaps,
}

/// Reply from the contextual-chat collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub action: Option<ChatAction>,
    pub query: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_input_text() {
        let input = UserInput::Text("hola".to_string());
        assert_eq!(input.text(), Some("hola"));

        let input = UserInput::Voice {
            mime: "audio/webm".to_string(),
            data: vec![1, 2, 3],
        };
        assert_eq!(input.text(), None);
    }

    #[test]
    fn test_chat_action_serializes_screaming() {
        let json = serde_json::to_string(&ChatAction::SearchMaps).unwrap();
        assert_eq!(json, "\"SEARCH_MAPS\"");
    }

    #[test]
    fn test_classified_intent_round_trip() {
        let classified = ClassifiedIntent {
            intent: Intent::Pharmacy,
            query: "paracetamol".to_string(),
            transcription: "necesito paracetamol".to_string(),
            is_emergency: false,
            detected_location: Some("Miraflores".to_string()),
        };
        let json = serde_json::to_string(&classified).unwrap();
        let back: ClassifiedIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.intent, Intent::Pharmacy);
        assert_eq!(back.detected_location.as_deref(), Some("Miraflores"));
    }
}
