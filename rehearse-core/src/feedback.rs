//! End-of-session feedback.
//!
//! The model is asked (see [`FEEDBACK_INSTRUCTION`]) to answer in three
//! labelled sections. [`parse_feedback`] recovers those sections from its
//! free-form reply line by line; when no section header is found at all the
//! whole reply is kept as the improvement text so nothing is lost.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Appended as a final user turn before asking the model for feedback.
pub const FEEDBACK_INSTRUCTION: &str = "Please provide interview feedback in the following format:

Strengths: [List 2-3 specific strengths you observed]

Weaknesses: [List 2-3 areas that need improvement]

Actionable Improvement: [Provide ONE specific, actionable recommendation for improvement]

Keep it concise and constructive.";

/// Placeholder used for strengths and weaknesses when the reply has no headers.
pub const SEE_FULL_FEEDBACK: &str = "See full feedback below";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub strengths: String,
    pub weaknesses: String,
    pub improvement: String,
}

impl FeedbackRecord {
    fn section_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Strengths => &mut self.strengths,
            Section::Weaknesses => &mut self.weaknesses,
            Section::Improvement => &mut self.improvement,
        }
    }

    fn is_empty(&self) -> bool {
        self.strengths.is_empty() && self.weaknesses.is_empty() && self.improvement.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Strengths,
    Weaknesses,
    Improvement,
}

impl Section {
    const ALL: [Section; 3] = [Section::Strengths, Section::Weaknesses, Section::Improvement];

    fn label(self) -> &'static str {
        match self {
            Section::Strengths => "Strengths:",
            Section::Weaknesses => "Weaknesses:",
            Section::Improvement => "Actionable Improvement:",
        }
    }

    /// Match a header case-insensitively, returning the section and the text
    /// after the label. The label is removed whatever its capitalisation.
    fn match_header(line: &str) -> Option<(Section, &str)> {
        Section::ALL.into_iter().find_map(|section| {
            let label = section.label();
            let head = line.get(..label.len())?;
            head.eq_ignore_ascii_case(label)
                .then(|| (section, line[label.len()..].trim()))
        })
    }
}

/// The conversation plus the feedback instruction as a final user turn.
pub fn feedback_request(messages: impl IntoIterator<Item = Message>) -> Vec<Message> {
    let mut out: Vec<Message> = messages.into_iter().collect();
    out.push(Message::user(FEEDBACK_INSTRUCTION));
    out
}

pub fn parse_feedback(text: &str) -> FeedbackRecord {
    let mut record = FeedbackRecord::default();
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim) {
        if let Some((section, rest)) = Section::match_header(line) {
            current = Some(section);
            *record.section_mut(section) = rest.to_owned();
            continue;
        }

        let Some(section) = current else { continue };
        if line.is_empty() {
            continue;
        }

        let content = record.section_mut(section);
        if !content.is_empty() {
            content.push(' ');
        }
        content.push_str(line);
    }

    if record.is_empty() {
        return FeedbackRecord {
            strengths: SEE_FULL_FEEDBACK.to_owned(),
            weaknesses: SEE_FULL_FEEDBACK.to_owned(),
            improvement: text.to_owned(),
        };
    }
    record
}

// ── Tests ──────────────────────────────────────────────────────────────────────
