use crate::llm::client::{FragmentStream, LLMClient};
use crate::types::{AppError, Message, Result, Role};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::StreamExt;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new(http: reqwest::Client, api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config).with_http_client(http),
            model,
        }
    }
}

fn to_request_messages(messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages
        .iter()
        .map(|message| {
            Ok(match message.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(message.content.clone()),
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(message.content.clone()),
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(message.content.clone())
                        .build()
                        .map_err(|e| {
                            AppError::CompletionStream(format!("Failed to build request: {}", e))
                        })?,
                ),
            })
        })
        .collect()
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<FragmentStream> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_request_messages(messages)?)
            .build()
            .map_err(|e| AppError::CompletionStream(format!("Failed to build request: {}", e)))?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AppError::CompletionStream(format!("OpenAI API error: {}", e)))?;

        let result_stream = async_stream::stream! {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        let delta: String = response
                            .choices
                            .into_iter()
                            .filter_map(|choice| choice.delta.content)
                            .collect();
                        if !delta.is_empty() {
                            yield Ok(delta);
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::CompletionStream(format!("OpenAI stream error: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(result_stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
