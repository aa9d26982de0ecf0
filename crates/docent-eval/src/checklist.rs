//! Fixed rubric and the judge's structured verdict.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Check names with what each one asks of the answer.
pub const CHECKS: [(&str, &str); 7] = [
    (
        "instructions_follow",
        "The agent followed the user's instructions (in <INSTRUCTIONS>)",
    ),
    (
        "instructions_avoid",
        "The agent avoided doing things it was told not to do",
    ),
    (
        "answer_relevant",
        "The response directly addresses the user's question",
    ),
    ("answer_clear", "The answer is clear and correct"),
    (
        "answer_citations",
        "The response includes proper citations or sources when required",
    ),
    (
        "completeness",
        "The response is complete and covers all key aspects of the request",
    ),
    ("tool_call_search", "Is the search tool invoked?"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationCheck {
    pub check_name: String,
    pub justification: String,
    pub check_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationChecklist {
    pub checklist: Vec<EvaluationCheck>,
    pub summary: String,
}

impl EvaluationChecklist {
    /// Verdict per distinct check name, in first-seen order. When the judge
    /// repeats a name, its last verdict wins.
    #[must_use]
    pub fn verdicts(&self) -> Vec<(&str, bool)> {
        let mut out: Vec<(&str, bool)> = Vec::new();
        for check in &self.checklist {
            match out.iter_mut().find(|(name, _)| *name == check.check_name) {
                Some(entry) => entry.1 = check.check_pass,
                None => out.push((&check.check_name, check.check_pass)),
            }
        }
        out
    }

    #[must_use]
    pub fn passed(&self, name: &str) -> Option<bool> {
        self.verdicts()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, pass)| pass)
    }

    #[must_use]
    pub fn failed_checks(&self) -> Vec<&str> {
        self.verdicts()
            .into_iter()
            .filter(|(_, pass)| !pass)
            .map(|(name, _)| name)
            .collect()
    }
}

/// System instructions for the judge, listing every check.
#[must_use]
pub fn judge_instructions() -> String {
    let mut out = String::from(
        "Use this checklist to evaluate the quality of an AI agent's answer (<ANSWER>) \
         to a user question (<QUESTION>).\n\
         We also include the entire log (<LOG>) for analysis.\n\n\
         For each item, check if the condition is met.\n\n\
         Checklist:\n\n",
    );
    for (name, description) in CHECKS {
        out.push_str("- ");
        out.push_str(name);
        out.push_str(": ");
        out.push_str(description);
        out.push('\n');
    }
    out.push_str(
        "\nOutput true/false for each check and provide a short explanation for your judgment.",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, pass: bool) -> EvaluationCheck {
        EvaluationCheck {
            check_name: name.into(),
            justification: String::new(),
            check_pass: pass,
        }
    }

    #[test]
    fn duplicate_names_collapse_to_last_verdict() {
        let list = EvaluationChecklist {
            checklist: vec![
                check("answer_clear", true),
                check("tool_call_search", true),
                check("answer_clear", false),
            ],
            summary: String::new(),
        };
        assert_eq!(
            list.verdicts(),
            vec![("answer_clear", false), ("tool_call_search", true)]
        );
        assert_eq!(list.failed_checks(), vec!["answer_clear"]);
        assert_eq!(list.passed("tool_call_search"), Some(true));
        assert_eq!(list.passed("completeness"), None);
    }

    #[test]
    fn instructions_name_every_check() {
        let text = judge_instructions();
        for (name, _) in CHECKS {
            assert!(text.contains(&format!("- {name}: ")), "{name}");
        }
    }

    #[test]
    fn schema_requires_checklist_and_summary() {
        let schema = docent_llm::provider::schema_value::<EvaluationChecklist>().unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "checklist"));
        assert!(required.iter().any(|v| v == "summary"));
    }
}
