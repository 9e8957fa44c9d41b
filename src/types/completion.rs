use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatCompletionResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Structured classification the language model is asked to return.
/// Every field is optional so partial answers still deserialize.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteIntent {
    pub intent: String,
    pub confidence: Option<f64>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub condition: Option<String>,
    pub equipment_name: Option<String>,
    pub asset_tag: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub aggregation_type: Option<String>,
    pub aggregation_field: Option<String>,
    pub group_by_field: Option<String>,
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_remote_intent_deserializes() {
        let intent: RemoteIntent =
            serde_json::from_str(r#"{"intent":"filtered_query","department":"IT"}"#).unwrap();
        assert_eq!(intent.intent, "filtered_query");
        assert_eq!(intent.department.as_deref(), Some("IT"));
        assert!(intent.confidence.is_none());
    }

    #[test]
    fn blank_content_is_treated_as_missing() {
        let resp: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#,
        )
        .unwrap();
        assert!(resp.first_content().is_none());
    }
}
