//! LLM-as-judge over stored interaction logs.

use docent_core::logs::{LogRecord, StoredRecord};
use docent_core::transcript::{answer_of, question_of};
use docent_llm::provider::{LlmProvider, Message, Role};
use tracing::Instrument;

use crate::checklist::{EvaluationChecklist, judge_instructions};
use crate::error::{EvalError, Result};
use crate::redact::redact;

/// One judged log record.
#[derive(Debug, Clone)]
pub struct RecordResult {
    /// File name of the log record.
    pub file: String,
    pub question: String,
    pub answer: String,
    pub checklist: EvaluationChecklist,
}

#[derive(Debug, Default)]
pub struct EvalRun {
    pub results: Vec<RecordResult>,
    /// Records dropped because the judge output did not parse or the
    /// transcript was empty.
    pub skipped: usize,
}

pub struct Judge<P> {
    provider: P,
    instructions: String,
}

impl<P: LlmProvider> Judge<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            instructions: judge_instructions(),
        }
    }

    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Ask the judge for a checklist on one record.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::JudgeParse`] when the verdict is not a valid
    /// checklist and [`EvalError::Llm`] when the judge call itself fails.
    pub async fn evaluate(&self, record: &LogRecord) -> Result<EvaluationChecklist> {
        let prompt = build_prompt(record).ok_or(EvalError::EmptyTranscript)?;
        let messages = [
            Message::from_legacy(Role::System, self.instructions.as_str()),
            Message::from_legacy(Role::User, prompt),
        ];
        let checklist = self
            .provider
            .chat_typed::<EvaluationChecklist>(&messages)
            .instrument(tracing::info_span!("llm_call", purpose = "judge"))
            .await?;
        Ok(checklist)
    }

    /// Judge every record in order. Parse failures are skipped with a
    /// warning; a failing judge call aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Llm`] if the judge model cannot be reached.
    pub async fn evaluate_all<F>(&self, records: &[StoredRecord], mut on_progress: F) -> Result<EvalRun>
    where
        F: FnMut(usize, usize, &str),
    {
        let mut run = EvalRun::default();
        let total = records.len();

        for (i, stored) in records.iter().enumerate() {
            let file = stored
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(question) = question_of(&stored.record.messages) else {
                tracing::warn!(path = %stored.path.display(), "skipping log record with no messages");
                run.skipped += 1;
                continue;
            };
            on_progress(i + 1, total, &question);

            match self.evaluate(&stored.record).await {
                Ok(checklist) => run.results.push(RecordResult {
                    file,
                    answer: answer_of(&stored.record.messages).unwrap_or_default(),
                    question,
                    checklist,
                }),
                Err(e) if e.is_skippable() => {
                    tracing::warn!(path = %stored.path.display(), "skipping record: {e}");
                    run.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(run)
    }
}

/// Judge prompt: original instructions, question, answer and the redacted
/// transcript. `None` for a record without messages.
#[must_use]
pub fn build_prompt(record: &LogRecord) -> Option<String> {
    let question = question_of(&record.messages)?;
    let answer = answer_of(&record.messages)?;
    let log = serde_json::to_string(&redact(&record.messages)).ok()?;
    Some(format!(
        "<INSTRUCTIONS>{}</INSTRUCTIONS>\n<QUESTION>{question}</QUESTION>\n<ANSWER>{answer}</ANSWER>\n<LOG>{log}</LOG>",
        record.system_prompt
    ))
}
