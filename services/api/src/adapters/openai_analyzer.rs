//! services/api/src/adapters/openai_analyzer.rs
//!
//! This module contains the adapter for the remote document analyzer.
//! It implements the `AnalysisService` port from the `core` crate by extracting
//! the document's text and asking an OpenAI chat model for a summary.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use docvault_core::domain::file_extension;
use docvault_core::ports::{AnalysisService, PortError, PortResult};
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are an expert document analyst. Your task is to provide a concise, one-paragraph summary of the provided text.";

/// Appended to the document text when it was cut to the input limit.
pub const TRUNCATION_MARKER: &str = "\n\n[...text was truncated...]";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnalyzer {
    client: Client<OpenAIConfig>,
    model: String,
    max_input_chars: usize,
}

impl OpenAiAnalyzer {
    /// Creates a new `OpenAiAnalyzer`.
    pub fn new(client: Client<OpenAIConfig>, model: String, max_input_chars: usize) -> Self {
        Self {
            client,
            model,
            max_input_chars,
        }
    }

    /// Pulls plain text out of the document: PDFs through `pdf-extract`, anything
    /// else must already be UTF-8 text.
    async fn extract_text(content: &[u8], display_name: &str) -> PortResult<String> {
        if looks_like_pdf(content, display_name) {
            let bytes = content.to_vec();
            return tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| PortError::Analysis(format!("PDF extraction task failed: {}", e)))?
                .map_err(|e| {
                    PortError::Analysis(format!("failed to extract text from PDF: {}", e))
                });
        }

        String::from_utf8(content.to_vec()).map_err(|_| {
            PortError::Analysis(format!(
                "'{}' is neither a PDF nor UTF-8 text",
                display_name
            ))
        })
    }
}

fn looks_like_pdf(content: &[u8], display_name: &str) -> bool {
    content.starts_with(b"%PDF")
        || file_extension(display_name).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Cuts `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

//=========================================================================================
// `AnalysisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisService for OpenAiAnalyzer {
    /// Summarizes the document's text with the configured chat model.
    async fn analyze(&self, content: &[u8], display_name: &str) -> PortResult<String> {
        let extracted = Self::extract_text(content, display_name).await?;
        if extracted.trim().is_empty() {
            return Err(PortError::Analysis(format!(
                "no text could be extracted from '{}'; it may be empty or contain only images",
                display_name
            )));
        }
        let text = truncate_for_prompt(&extracted, self.max_input_chars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Analysis(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Analyze the following text from the document '{}':\n\n{}",
                    display_name, text
                ))
                .build()
                .map_err(|e| PortError::Analysis(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(500u32)
            .temperature(0.7)
            .build()
            .map_err(|e| PortError::Analysis(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| {
                warn!("Analysis request for '{}' failed: {}", display_name, e);
                PortError::Analysis(format!("OpenAI API error: {}", e))
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                PortError::Analysis("analysis model returned no text content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_left_alone() {
        assert_eq!(truncate_for_prompt("hello", 5), "hello");
        assert_eq!(truncate_for_prompt("", 0), "");
    }

    #[test]
    fn long_text_is_cut_on_a_character_boundary() {
        let text = "ééééé";
        let cut = truncate_for_prompt(text, 3);
        assert_eq!(cut, format!("ééé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn pdf_is_detected_by_magic_or_extension() {
        assert!(looks_like_pdf(b"%PDF-1.4\n", "scan"));
        assert!(looks_like_pdf(b"", "Report.PDF"));
        assert!(!looks_like_pdf(b"plain", "notes.txt"));
    }

    #[tokio::test]
    async fn utf8_text_is_passed_through() {
        let text = OpenAiAnalyzer::extract_text("résumé".as_bytes(), "cv.txt")
            .await
            .unwrap();
        assert_eq!(text, "résumé");
    }

    #[tokio::test]
    async fn binary_non_pdf_content_is_an_analysis_error() {
        let err = OpenAiAnalyzer::extract_text(&[0xff, 0xfe, 0x00], "image.png")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Analysis(_)));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_an_analysis_error() {
        let err = OpenAiAnalyzer::extract_text(b"%PDF-not really", "broken.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Analysis(_)));
    }

    #[tokio::test]
    async fn empty_extraction_fails_before_calling_the_model() {
        // No network is touched: the empty-text check runs first.
        let analyzer = OpenAiAnalyzer::new(
            Client::with_config(OpenAIConfig::new().with_api_key("sk-test")),
            "gpt-4o-mini".to_string(),
            100,
        );
        let err = analyzer.analyze(b"   \n", "blank.txt").await.unwrap_err();
        assert!(matches!(err, PortError::Analysis(ref m) if m.contains("blank.txt")));
    }
}
