//! Classification and structured extraction through a completion service.
//!
//! One document costs one completion call under the default settings. With
//! [`UnknownPolicy::BestOfSchemas`] an `Unknown` answer triggers one extra
//! call per type-specific schema and the best-scoring record is kept.

mod classify;
mod client;
mod prompt;
mod response;

pub use classify::KeywordClassifier;
pub use client::{CompletionService, OllamaClient};
pub use prompt::{truncate_chars, Prompt, PromptBuilder, SchemaKind};
pub use response::{locate_json, parse_response};

use tracing::{debug, info, warn};

use crate::error::DocexError;
use crate::models::config::{ClassificationMode, DocexConfig, UnknownPolicy};
use crate::models::record::{DocumentType, ExtractionRecord};

/// Schemas tried, in order, when the model cannot classify a document.
const FALLBACK_SCHEMAS: [SchemaKind; 2] = [SchemaKind::Invoice, SchemaKind::PackingList];

/// Turns OCR text into an [`ExtractionRecord`].
pub struct Extractor<C: CompletionService> {
    client: C,
    prompts: PromptBuilder,
    classifier: KeywordClassifier,
    classification: ClassificationMode,
    unknown_policy: UnknownPolicy,
}

impl<C: CompletionService> Extractor<C> {
    pub fn new(client: C, config: &DocexConfig) -> Self {
        let mut prompts = PromptBuilder::new(config.extraction.max_prompt_chars);
        if let Some(system) = &config.completion.system_prompt {
            prompts = prompts.with_system_prompt(system.clone());
        }

        Self {
            client,
            prompts,
            classifier: KeywordClassifier::new(),
            classification: config.extraction.classification,
            unknown_policy: config.extraction.unknown_policy,
        }
    }

    /// The underlying completion service.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Classify and extract `text`.
    ///
    /// Completion failures surface as [`DocexError::Completion`] and
    /// unusable responses as [`DocexError::Parse`].
    pub async fn extract(&self, text: &str) -> Result<ExtractionRecord, DocexError> {
        let schema = match self.classification {
            ClassificationMode::Model => SchemaKind::Combined,
            ClassificationMode::Keywords => self.classifier.classify(text),
        };

        let record = self.attempt(text, schema).await?;
        if record.document_type != DocumentType::Unknown
            || self.unknown_policy == UnknownPolicy::Single
            || schema != SchemaKind::Combined
        {
            return Ok(record);
        }

        info!("Model could not classify the document, trying type-specific schemas");
        let mut best = record;
        for candidate_schema in FALLBACK_SCHEMAS {
            match self.attempt(text, candidate_schema).await {
                Ok(candidate) if candidate.score() > best.score() => {
                    debug!(
                        "{:?} schema scored {} (previous best {})",
                        candidate_schema,
                        candidate.score(),
                        best.score()
                    );
                    best = candidate;
                }
                Ok(_) => {}
                Err(e) => warn!("{:?} schema attempt failed: {}", candidate_schema, e),
            }
        }
        Ok(best)
    }

    /// One completion call under `schema`, parsed and normalized.
    async fn attempt(
        &self,
        text: &str,
        schema: SchemaKind,
    ) -> Result<ExtractionRecord, DocexError> {
        let prompt = self.prompts.build(text, schema);
        let raw = self.client.complete(&prompt).await?;
        debug!("Model response: {} chars", raw.len());

        let mut record = parse_response(&raw)?;
        if record.document_type == DocumentType::Unknown {
            if let Some(doc_type) = schema.document_type() {
                record.document_type = doc_type;
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use std::sync::Mutex;

    /// Replays canned replies and records the prompts it was sent.
    struct Scripted {
        replies: Mutex<Vec<Result<String, CompletionError>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl CompletionService for Scripted {
        async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(CompletionError::InvalidReply("script exhausted".into())))
        }

        async fn health_check(&self) -> Result<(), CompletionError> {
            Ok(())
        }
    }

    fn config(classification: ClassificationMode, policy: UnknownPolicy) -> DocexConfig {
        let mut config = DocexConfig::default();
        config.extraction.classification = classification;
        config.extraction.unknown_policy = policy;
        config
    }

    #[tokio::test]
    async fn test_single_call_by_default() {
        let client = Scripted::new(vec![Ok(
            r#"{"document_type":"Invoice","metadata":{"invoice_number":"123"},"line_items":[]}"#,
        )]);
        let extractor = Extractor::new(client, &DocexConfig::default());

        let record = extractor.extract("INVOICE #123").await.unwrap();
        assert_eq!(record.document_type, DocumentType::Invoice);
        assert_eq!(extractor.client().calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kept_under_single_policy() {
        let client = Scripted::new(vec![Ok(r#"{"document_type":"Unknown","metadata":{}}"#)]);
        let extractor =
            Extractor::new(client, &config(ClassificationMode::Model, UnknownPolicy::Single));

        let record = extractor.extract("Lorem ipsum").await.unwrap();
        assert_eq!(record.document_type, DocumentType::Unknown);
        assert_eq!(extractor.client().calls(), 1);
    }

    #[tokio::test]
    async fn test_best_of_schemas_keeps_highest_score() {
        let client = Scripted::new(vec![
            Ok(r#"{"document_type":"Unknown","metadata":{"a":"1"}}"#),
            Ok(r#"{"metadata":{"invoice_number":"9"}}"#),
            Ok(r#"{"metadata":{"shipper_name":"X","total_weight":"5kg"},"line_items":[{"description":"box"}]}"#),
        ]);
        let extractor = Extractor::new(
            client,
            &config(ClassificationMode::Model, UnknownPolicy::BestOfSchemas),
        );

        let record = extractor.extract("???").await.unwrap();
        assert_eq!(record.document_type, DocumentType::PackingList);
        assert_eq!(record.score(), 3);
        assert_eq!(extractor.client().calls(), 3);
    }

    #[tokio::test]
    async fn test_best_of_schemas_tie_keeps_first_answer() {
        let client = Scripted::new(vec![
            Ok(r#"{"document_type":"Unknown","metadata":{"a":"1"}}"#),
            Ok(r#"{"metadata":{"invoice_number":"9"}}"#),
            Err(CompletionError::Timeout(std::time::Duration::from_secs(1))),
        ]);
        let extractor = Extractor::new(
            client,
            &config(ClassificationMode::Model, UnknownPolicy::BestOfSchemas),
        );

        let record = extractor.extract("???").await.unwrap();
        assert_eq!(record.document_type, DocumentType::Unknown);
        assert_eq!(record.metadata["a"], "1");
    }

    #[tokio::test]
    async fn test_keyword_schema_sets_type() {
        let client = Scripted::new(vec![Ok(r#"{"metadata":{"consignee_name":"Initech"}}"#)]);
        let extractor = Extractor::new(
            client,
            &config(ClassificationMode::Keywords, UnknownPolicy::BestOfSchemas),
        );

        let record = extractor.extract("PACKING LIST\nConsignee: Initech").await.unwrap();
        assert_eq!(record.document_type, DocumentType::PackingList);

        let prompts = extractor.client().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("Set document_type to \"PackingList\""));
    }

    #[tokio::test]
    async fn test_errors_map_to_variants() {
        let extractor = Extractor::new(
            Scripted::new(vec![Err(CompletionError::ServiceUnavailable("down".into()))]),
            &DocexConfig::default(),
        );
        assert!(matches!(
            extractor.extract("x").await,
            Err(DocexError::Completion(_))
        ));

        let extractor = Extractor::new(
            Scripted::new(vec![Ok("no json here")]),
            &DocexConfig::default(),
        );
        assert!(matches!(extractor.extract("x").await, Err(DocexError::Parse(_))));
    }

    #[tokio::test]
    async fn test_custom_system_prompt() {
        let mut cfg = DocexConfig::default();
        cfg.completion.system_prompt = Some("Reply in JSON.".into());
        let extractor = Extractor::new(Scripted::new(vec![Ok("{}")]), &cfg);

        extractor.extract("x").await.unwrap();
        assert_eq!(extractor.client().prompts.lock().unwrap()[0].system, "Reply in JSON.");
    }
}
