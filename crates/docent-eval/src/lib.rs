//! Offline evaluation of logged interactions: redaction, LLM-as-judge
//! checklists, pass-rate reports and synthetic question generation.

pub mod checklist;
pub mod datagen;
pub mod error;
pub mod judge;
pub mod redact;
pub mod report;

pub use checklist::{CHECKS, EvaluationCheck, EvaluationChecklist, judge_instructions};
pub use datagen::{
    GeneratedTurn, QuestionGenerator, QuestionsList, run_agent_on_questions, sample_documents,
};
pub use error::{EvalError, Result};
pub use judge::{EvalRun, Judge, RecordResult, build_prompt};
pub use redact::{REDACTED_MARKER, redact};
pub use report::{CheckRate, RecordSummary, Report};
