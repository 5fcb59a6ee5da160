use regex::{Regex, RegexBuilder};

use crate::error::{QaragError, Result};

/// Default question patterns, tried in order against trimmed lines
pub const DEFAULT_QUESTION_PATTERNS: &[&str] = &[
    r"^Q\s*[:.]\s*(.+)$",
    r"^Question\s*\d*\s*[:.]\s*(.+)$",
    r"^(\d+)\.\s*(.+\?)$",
    r"^(.+\?)$",
    r"^Comment\s+(.+\?)$",
    r"^Que\s+(.+\?)$",
    r"^Pourquoi\s+(.+\?)$",
];

/// Default answer patterns, tried in order against trimmed lines
pub const DEFAULT_ANSWER_PATTERNS: &[&str] = &[
    r"^R\s*[:.]\s*(.*)$",
    r"^A\s*[:.]\s*(.*)$",
    r"^Answer\s*[:.]\s*(.*)$",
    r"^R[ée]ponse\s*[:.]\s*(.*)$",
];

const LIST_ITEM_PATTERN: &str = r"^(?:[-*•]|\d+\))\s+\S";

/// Compiled, case-insensitive line classifiers
#[derive(Debug, Clone)]
pub struct QaPatterns {
    questions: Vec<Regex>,
    answers: Vec<Regex>,
    list_item: Regex,
}

impl QaPatterns {
    /// Compile pattern lists, reporting the first invalid expression
    pub fn new(questions: &[String], answers: &[String]) -> Result<Self> {
        Ok(Self {
            questions: compile_all("question_patterns", questions)?,
            answers: compile_all("answer_patterns", answers)?,
            list_item: compile("list_item_pattern", LIST_ITEM_PATTERN)?,
        })
    }

    pub fn is_question_line(&self, line: &str) -> bool {
        self.questions.iter().any(|re| re.is_match(line))
    }

    pub fn is_answer_line(&self, line: &str) -> bool {
        self.answers.iter().any(|re| re.is_match(line))
    }

    pub fn is_list_item(&self, line: &str) -> bool {
        self.list_item.is_match(line)
    }

    /// A question mark anywhere, or any line matching a question pattern
    pub fn has_questions(&self, text: &str) -> bool {
        text.contains('?') || trimmed_lines(text).any(|line| self.is_question_line(line))
    }

    pub fn has_answers(&self, text: &str) -> bool {
        trimmed_lines(text).any(|line| self.is_answer_line(line))
    }

    /// Count (question, answer) lines independently
    pub fn count_lines(&self, text: &str) -> (usize, usize) {
        trimmed_lines(text).fold((0, 0), |(q, a), line| {
            (
                q + usize::from(self.is_question_line(line)),
                a + usize::from(self.is_answer_line(line)),
            )
        })
    }
}

/// Non-empty lines with surrounding whitespace removed
pub fn trimmed_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn compile_all(key: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(key, p)).collect()
}

fn compile(key: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| QaragError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("Invalid pattern '{}': {}", pattern, e),
        })
}
