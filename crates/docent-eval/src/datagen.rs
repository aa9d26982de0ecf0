//! Synthetic questions from sampled documents, answered by the agent and
//! logged as `ai-generated`.

use std::path::PathBuf;

use docent_core::agent::{Agent, AgentError};
use docent_core::logs::{LogSource, LogStore, LogWriteError};
use docent_index::Document;
use docent_llm::provider::{LlmProvider, Message, Role};
use docent_tools::ToolExecutor;
use rand::Rng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionsList {
    pub questions: Vec<String>,
}

/// Pick up to `n` distinct documents at random.
pub fn sample_documents<'a, R: Rng + ?Sized>(
    documents: &'a [Document],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Document> {
    documents.choose_multiple(rng, n).collect()
}

pub struct QuestionGenerator<P> {
    provider: P,
    instructions: String,
}

impl<P: LlmProvider> QuestionGenerator<P> {
    #[must_use]
    pub fn new(provider: P, instructions: impl Into<String>) -> Self {
        Self {
            provider,
            instructions: instructions.into(),
        }
    }

    /// One question per document, asked of the model in a single call.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EvalError`] if the model call fails or its output is
    /// not a question list.
    pub async fn generate(&self, documents: &[&Document]) -> Result<Vec<String>> {
        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let prompt = serde_json::to_string(&contents).map_err(docent_llm::LlmError::from)?;
        let messages = [
            Message::from_legacy(Role::System, self.instructions.as_str()),
            Message::from_legacy(Role::User, prompt),
        ];
        let list = self
            .provider
            .chat_typed::<QuestionsList>(&messages)
            .instrument(tracing::info_span!("llm_call", purpose = "question_generation"))
            .await?;
        tracing::info!(
            documents = documents.len(),
            questions = list.questions.len(),
            "questions generated"
        );
        Ok(list.questions)
    }
}

/// Outcome of answering one generated question.
#[derive(Debug)]
pub struct GeneratedTurn {
    pub question: String,
    pub answer: String,
    pub logged: std::result::Result<PathBuf, LogWriteError>,
}

/// Answer each question in order with the non-streaming agent and log every
/// completed turn as `ai-generated`.
///
/// # Errors
///
/// Returns the first [`AgentError`]; turns completed before it stay logged.
pub async fn run_agent_on_questions<P, T, F>(
    agent: &Agent<P, T>,
    store: &LogStore,
    questions: &[String],
    mut on_turn: F,
) -> std::result::Result<Vec<GeneratedTurn>, AgentError>
where
    P: LlmProvider,
    T: ToolExecutor,
    F: FnMut(&GeneratedTurn),
{
    let mut turns = Vec::with_capacity(questions.len());
    for question in questions {
        let outcome = agent.run(question).await?;
        let record = agent.log_record(outcome.messages, LogSource::AiGenerated);
        let logged = store.append(&record);
        if let Err(e) = &logged {
            tracing::warn!("failed to write interaction log: {e}");
        }
        let turn = GeneratedTurn {
            question: question.clone(),
            answer: outcome.answer,
            logged,
        };
        on_turn(&turn);
        turns.push(turn);
    }
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docent_index::{Chunk, Index, IndexFields};
    use docent_llm::mock::MockProvider;
    use docent_tools::SearchTool;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(format!("faq/q{i}.md"), format!("answer number {i}")))
            .collect()
    }

    #[test]
    fn sample_is_bounded_and_distinct() {
        let docs = docs(25);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = sample_documents(&docs, 10, &mut rng);
        assert_eq!(sample.len(), 10);
        let mut paths: Vec<_> = sample.iter().map(|d| d.path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 10);
    }

    #[test]
    fn sample_of_small_corpus_takes_everything() {
        let docs = docs(3);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_documents(&docs, 10, &mut rng).len(), 3);
    }

    #[tokio::test]
    async fn generator_sends_document_contents() {
        let provider = MockProvider::with_responses(vec![
            r#"{"questions": ["What is answer 0?", "What is answer 1?"]}"#.into(),
        ]);
        let generator = QuestionGenerator::new(provider.clone(), "make questions");
        let docs = docs(2);
        let refs: Vec<&Document> = docs.iter().collect();
        let questions = generator.generate(&refs).await.unwrap();

        assert_eq!(questions.len(), 2);
        let sent = &provider.requests()[0];
        assert_eq!(sent[0].content, "make questions");
        assert!(sent[1].content.contains("answer number 0"));
    }

    #[tokio::test]
    async fn generator_rejects_unstructured_output() {
        let generator =
            QuestionGenerator::new(MockProvider::with_responses(vec!["no".into()]), "x");
        let docs = docs(1);
        let err = generator.generate(&[&docs[0]]).await.unwrap_err();
        assert!(matches!(err, crate::EvalError::JudgeParse(_)));
    }

    #[tokio::test]
    async fn answers_are_logged_as_ai_generated() {
        let dir = tempfile::tempdir().unwrap();
        let items = docs(3).iter().map(Chunk::whole).collect();
        let tool = Arc::new(SearchTool::new(Arc::new(Index::build(
            items,
            &IndexFields::default(),
        ))));
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        let agent = Agent::new(Arc::new(provider), tool, "docs_agent", "be brief");
        let store = LogStore::new(dir.path());

        let questions = vec!["q1".to_owned(), "q2".to_owned()];
        let mut seen = 0;
        let turns = run_agent_on_questions(&agent, &store, &questions, |_| seen += 1)
            .await
            .unwrap();

        assert_eq!(seen, 2);
        assert_eq!(turns[1].answer, "second");
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(
            loaded
                .records
                .iter()
                .all(|r| r.record.source == LogSource::AiGenerated)
        );
    }
}
