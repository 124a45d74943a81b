// SPDX-License-Identifier: Apache-2.0

//! Issue form parsing.
//!
//! GitHub renders issue forms as markdown with one `### Label` heading per
//! field followed by a blank line and the answer. Unanswered optional fields
//! render as `_No response_`.

use std::collections::BTreeMap;

use crate::error::BotError;

/// Placeholder GitHub writes for unanswered optional fields.
const NO_RESPONSE: &str = "_No response_";

/// Value of one issue form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free-text answer.
    Text(String),
    /// Multi-valued answer (list items or checked boxes), in form order.
    List(Vec<String>),
}

/// Parsed issue form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueForm {
    /// The user's instruction field, if answered.
    pub instruction: Option<FieldValue>,
    /// Every answered field keyed by its heading.
    pub fields: BTreeMap<String, FieldValue>,
}

/// Parses a raw issue body into form fields.
pub trait FormParser: Send + Sync {
    /// Parses an issue body.
    ///
    /// # Errors
    ///
    /// Returns `BotError::FormParse` if the body is not a rendered issue form.
    fn parse(&self, body: &str) -> crate::Result<IssueForm>;
}

/// Parser for GitHub's rendered issue-form markdown.
#[derive(Debug, Clone)]
pub struct MarkdownFormParser {
    instruction_field: String,
}

impl MarkdownFormParser {
    /// Creates a parser that reads the instruction from the given heading.
    pub fn new(instruction_field: impl Into<String>) -> Self {
        Self {
            instruction_field: instruction_field.into(),
        }
    }
}

impl FormParser for MarkdownFormParser {
    fn parse(&self, body: &str) -> crate::Result<IssueForm> {
        if body.trim().is_empty() {
            return Err(BotError::FormParse {
                message: "issue body is empty".to_string(),
            });
        }

        let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
        for line in body.lines() {
            if let Some(heading) = line.strip_prefix("### ") {
                sections.push((heading.trim().to_string(), Vec::new()));
            } else if let Some((_, lines)) = sections.last_mut() {
                lines.push(line);
            }
        }

        if sections.is_empty() {
            return Err(BotError::FormParse {
                message: "no form headings found".to_string(),
            });
        }

        let mut form = IssueForm::default();
        for (heading, lines) in sections {
            let Some(value) = field_value(&lines) else {
                continue;
            };
            if heading.eq_ignore_ascii_case(&self.instruction_field) {
                form.instruction = Some(value.clone());
            }
            form.fields.insert(heading, value);
        }

        Ok(form)
    }
}

/// Interprets the lines under one heading.
fn field_value(lines: &[&str]) -> Option<FieldValue> {
    let text = lines.join("\n");
    let text = text.trim();
    if text.is_empty() || text == NO_RESPONSE {
        return None;
    }

    let items: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if items.iter().all(|l| l.trim_start().starts_with("- ")) {
        let values: Vec<String> = items
            .iter()
            .filter_map(|l| list_item(l.trim_start()))
            .collect();
        if values.is_empty() {
            return None;
        }
        return Some(FieldValue::List(values));
    }

    Some(FieldValue::Text(text.to_string()))
}

/// Extracts the value of a `- item`, `- [x] item` line. Unchecked boxes yield nothing.
fn list_item(line: &str) -> Option<String> {
    let item = line.strip_prefix("- ")?.trim();
    if item.starts_with("[ ]") {
        return None;
    }
    let item = item
        .strip_prefix("[x]")
        .or_else(|| item.strip_prefix("[X]"))
        .unwrap_or(item)
        .trim();
    (!item.is_empty()).then(|| item.to_string())
}
