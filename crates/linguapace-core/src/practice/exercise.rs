use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag identifying which evaluator handles an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    FillBlank,
    Translation,
    Matching,
    Listening,
}

impl ExerciseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::MultipleChoice => "multiple_choice",
            ExerciseKind::FillBlank => "fill_blank",
            ExerciseKind::Translation => "translation",
            ExerciseKind::Matching => "matching",
            ExerciseKind::Listening => "listening",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt payload, one variant per exercise kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExercisePrompt {
    MultipleChoice {
        question: String,
        options: Vec<String>,
    },
    /// `sentence` marks the gap with `___`.
    FillBlank {
        sentence: String,
    },
    Translation {
        source_text: String,
        #[serde(default)]
        source_lang: Option<String>,
        #[serde(default)]
        target_lang: Option<String>,
    },
    Matching {
        instruction: String,
        left: Vec<String>,
        right: Vec<String>,
    },
    Listening {
        #[serde(default)]
        transcript_hint: Option<String>,
        audio_ref: String,
    },
}

impl ExercisePrompt {
    pub fn kind(&self) -> ExerciseKind {
        match self {
            ExercisePrompt::MultipleChoice { .. } => ExerciseKind::MultipleChoice,
            ExercisePrompt::FillBlank { .. } => ExerciseKind::FillBlank,
            ExercisePrompt::Translation { .. } => ExerciseKind::Translation,
            ExercisePrompt::Matching { .. } => ExerciseKind::Matching,
            ExercisePrompt::Listening { .. } => ExerciseKind::Listening,
        }
    }

    /// Text shown to the learner, also recorded on mistakes.
    pub fn question_text(&self) -> String {
        match self {
            ExercisePrompt::MultipleChoice { question, .. } => question.clone(),
            ExercisePrompt::FillBlank { sentence } => sentence.clone(),
            ExercisePrompt::Translation {
                source_text,
                target_lang,
                ..
            } => match target_lang {
                Some(lang) => format!("Translate into {lang}: {source_text}"),
                None => format!("Translate: {source_text}"),
            },
            ExercisePrompt::Matching { instruction, .. } => instruction.clone(),
            ExercisePrompt::Listening {
                transcript_hint,
                audio_ref,
            } => transcript_hint
                .clone()
                .unwrap_or_else(|| format!("Listen: {audio_ref}")),
        }
    }
}

/// One exercise in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseItem {
    pub id: String,
    pub prompt: ExercisePrompt,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ExerciseItem {
    pub fn kind(&self) -> ExerciseKind {
        self.prompt.kind()
    }
}

/// A learner's submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Zero-based option index.
    Choice(usize),
    Text(String),
    Pairs(Vec<(String, String)>),
}

impl Answer {
    /// Human-readable form, resolving choice indices against the prompt.
    pub fn render(&self, prompt: &ExercisePrompt) -> String {
        match (self, prompt) {
            (Answer::Choice(idx), ExercisePrompt::MultipleChoice { options, .. }) => options
                .get(*idx)
                .cloned()
                .unwrap_or_else(|| format!("option #{}", idx.saturating_add(1))),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Choice(idx) => write!(f, "option #{}", idx.saturating_add(1)),
            Answer::Text(text) => f.write_str(text),
            Answer::Pairs(pairs) => {
                let joined = pairs
                    .iter()
                    .map(|(l, r)| format!("{l}={r}"))
                    .collect::<Vec<_>>()
                    .join(";");
                f.write_str(&joined)
            }
        }
    }
}
