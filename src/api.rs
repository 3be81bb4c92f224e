use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Config;
use crate::conversation::{ChatReply, ChatRequest};
use crate::knowledge::KnowledgeMenu;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("agent API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for the agent service.
#[derive(Debug, Clone)]
pub struct AgentClient {
    chat_url: String,
    menu_url: String,
    client: reqwest::Client,
}

impl AgentClient {
    pub fn with_config(config: &Config) -> Self {
        AgentClient {
            chat_url: config.chat_url(),
            menu_url: config.knowledge_menu_url(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        tracing::debug!(url = %self.chat_url, session = ?request.session_id, "sending chat request");
        let response = self.client.post(&self.chat_url).json(request).send().await?;
        read_json(response).await
    }

    pub async fn knowledge_menu(&self) -> Result<KnowledgeMenu, ApiError> {
        tracing::debug!(url = %self.menu_url, "fetching knowledge menu");
        let response = self.client.get(&self.menu_url).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    decode(&body)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Author, ContentVariant};

    #[test]
    fn decodes_reply_with_session() {
        let reply: ChatReply = decode(
            r#"{
                "id": "msg-agent-1",
                "author": "agent",
                "timestamp": "2024-05-01T09:00:00Z",
                "sessionId": "s-42",
                "content": [{"type": "summary", "content": "Done"}]
            }"#,
        )
        .unwrap();
        assert_eq!(reply.session_id.as_deref(), Some("s-42"));
        assert_eq!(reply.message.author, Author::Agent);
        assert!(matches!(reply.message.content[0], ContentVariant::Text { .. }));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode::<ChatReply>("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn status_error_carries_body() {
        let err = ApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "agent API error (500): boom");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let mut config = Config::default();
        config.agent.host = "http://127.0.0.1:9".to_string();
        let client = AgentClient::with_config(&config);
        let request = ChatRequest {
            session_id: None,
            query: "hello".into(),
        };
        let err = client.send_chat(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
