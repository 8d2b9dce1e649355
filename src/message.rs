//! Provider-agnostic chat types exchanged with gateway callers

use serde::{Deserialize, Deserializer, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (sets behavior)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Lowercase wire name, shared by the inbound and provider shapes
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One prior turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced this turn
    pub role: MessageRole,

    /// Text of the turn
    pub text: String,
}

impl ChatTurn {
    /// Create a new turn
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        ChatTurn {
            role,
            text: text.into(),
        }
    }

    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }
}

/// Inbound request body of the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message
    pub message: String,

    /// Prior turns in conversational order; `null` reads as none
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub history: Vec<ChatTurn>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ChatTurn>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ChatTurn>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatRequest {
    /// Create a request with no history
    pub fn new(message: impl Into<String>) -> Self {
        ChatRequest {
            message: message.into(),
            history: Vec::new(),
        }
    }

    /// Attach prior turns
    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    /// Check the invariants a request must satisfy before it may go upstream.
    ///
    /// Whitespace-only text counts as empty.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.message.trim().is_empty() {
            return Err("`message` must be a non-empty string".to_string());
        }
        if let Some(index) = self.history.iter().position(|t| t.text.trim().is_empty()) {
            return Err(format!("`history[{}].text` must be a non-empty string", index));
        }
        Ok(())
    }
}

/// Token usage statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,

    /// Number of tokens in the completion
    pub completion_tokens: u32,

    /// Total number of tokens
    pub total_tokens: u32,
}

/// Outbound response body of the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text generated by the model, verbatim
    pub reply: String,

    /// Token counts, when the provider reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Create a response without usage metadata
    pub fn new(reply: impl Into<String>) -> Self {
        ChatResponse {
            reply: reply.into(),
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"2+2?"}"#).unwrap();
        assert_eq!(req.message, "2+2?");
        assert!(req.history.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_null_history_reads_as_empty() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","history":null}"#).unwrap();
        assert!(req.history.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_history_order_preserved() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"and now?","history":[
                {"role":"user","text":"first"},
                {"role":"assistant","text":"second"},
                {"role":"user","text":"third"}
            ]}"#,
        )
        .unwrap();
        let texts: Vec<&str> = req.history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(req.history[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_missing_message_fails_to_parse() {
        let result = serde_json::from_str::<ChatRequest>(r#"{"history":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_fails_to_parse() {
        let result = serde_json::from_str::<ChatRequest>(
            r#"{"message":"hi","history":[{"role":"tool","text":"x"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_message_is_invalid() {
        assert!(ChatRequest::new("").validate().is_err());
        assert!(ChatRequest::new("   \n").validate().is_err());
    }

    #[test]
    fn test_blank_history_turn_is_invalid() {
        let req = ChatRequest::new("hello")
            .with_history(vec![ChatTurn::user("hi"), ChatTurn::assistant(" ")]);
        let err = req.validate().unwrap_err();
        assert!(err.contains("history[1]"));
    }

    #[test]
    fn test_response_omits_missing_usage() {
        let json = serde_json::to_value(ChatResponse::new("4")).unwrap();
        assert_eq!(json, serde_json::json!({"reply": "4"}));
    }

    #[test]
    fn test_response_includes_usage() {
        let resp = ChatResponse {
            reply: "ok".to_string(),
            usage: Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 3,
                total_tokens: 15,
            }),
        };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["usage"]["total_tokens"], 15);
    }
}
