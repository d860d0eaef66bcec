use crate::llm::client::{FragmentStream, LLMClient};
use crate::types::{AppError, Message, Result, Role};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

/// Split a base URL into the `scheme://host` and port pair `Ollama` expects.
fn host_and_port(base_url: &str) -> Result<(String, u16)> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| AppError::Configuration(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Configuration(format!("Ollama URL '{}' has no host", base_url)))?;

    Ok((
        format!("{}://{}", url.scheme(), host),
        url.port().unwrap_or(DEFAULT_PORT),
    ))
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, base_url: String, model: String) -> Result<Self> {
        let (host, port) = host_and_port(&base_url)?;
        let client = Ollama::new_with_client(host, port, http);

        Ok(Self { client, model })
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| match message.role {
            Role::System => ChatMessage::system(message.content.clone()),
            Role::User => ChatMessage::user(message.content.clone()),
            Role::Assistant => ChatMessage::assistant(message.content.clone()),
        })
        .collect()
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<FragmentStream> {
        let request = ChatMessageRequest::new(self.model.clone(), to_chat_messages(messages));

        let mut stream_response = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| AppError::CompletionStream(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::CompletionStream("Ollama stream chunk error".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(output_stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port_full() {
        let (host, port) = host_and_port("http://localhost:11434").unwrap();
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_host_and_port_defaults_port() {
        let (host, port) = host_and_port("https://ollama.internal").unwrap();
        assert_eq!(host, "https://ollama.internal");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn test_host_and_port_rejects_garbage() {
        let err = host_and_port("not a url").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_chat_messages_keep_order() {
        let converted = to_chat_messages(&[
            Message::system("be brief"),
            Message::user("Hello"),
            Message::assistant("Hi"),
        ]);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].content, "be brief");
        assert_eq!(converted[2].content, "Hi");
    }
}
