//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the weekly-summary LLM.
//! It implements the `NarrativeGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use study_insights_core::ports::{NarrativeGenerationService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = r#"You are a supportive study coach writing a student's weekly summary.

You receive a JSON object with these fields:
- totalStudyTime: seconds studied this week
- quizAccuracy: percentage of quiz questions answered correctly
- strengths: topics the student is doing well in (topic, attempts, correct, accuracy)
- weaknesses: topics that need more practice (same shape)
- completedPomodoros: focus sessions finished

Write two or three short paragraphs:
- Open with an encouraging recap of the week using the numbers (convert seconds to hours and minutes).
- Name the strongest topics and suggest how to keep them fresh.
- Give one or two concrete, practical suggestions for the weakest topics.
If strengths and weaknesses are both empty, say there is not enough quiz data yet and encourage a few practice quizzes.
Plain text only, no headings, no bullet lists, no JSON."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `NarrativeGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSummaryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummaryAdapter {
    /// Creates a new `OpenAiSummaryAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `NarrativeGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl NarrativeGenerationService for OpenAiSummaryAdapter {
    async fn generate_summary(&self, payload_text: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::NarrativeService(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("WEEKLY REPORT:\n{}", payload_text))
                .build()
                .map_err(|e| PortError::NarrativeService(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.7)
            .build()
            .map_err(|e| PortError::NarrativeService(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::NarrativeService(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::NarrativeService("Summary LLM returned no choices.".to_string())
            })?
            .message
            .content
            .ok_or_else(|| {
                PortError::NarrativeService("Summary LLM response contained no text.".to_string())
            })?;

        if content.trim().is_empty() {
            return Err(PortError::NarrativeService(
                "Summary LLM returned blank text.".to_string(),
            ));
        }
        Ok(content)
    }
}
