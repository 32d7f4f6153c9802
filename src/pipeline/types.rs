use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Inference task a server instance is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    TextGeneration,
    Text2TextGeneration,
    Summarization,
    Translation,
    FillMask,
    TextClassification,
    TokenClassification,
    QuestionAnswering,
    FeatureExtraction,
    ZeroShotClassification,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextGeneration => "text-generation",
            Self::Text2TextGeneration => "text2text-generation",
            Self::Summarization => "summarization",
            Self::Translation => "translation",
            Self::FillMask => "fill-mask",
            Self::TextClassification => "text-classification",
            Self::TokenClassification => "token-classification",
            Self::QuestionAnswering => "question-answering",
            Self::FeatureExtraction => "feature-extraction",
            Self::ZeroShotClassification => "zero-shot-classification",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let task = match s.trim() {
            "text-generation" => Self::TextGeneration,
            "text2text-generation" => Self::Text2TextGeneration,
            "summarization" => Self::Summarization,
            "fill-mask" => Self::FillMask,
            "text-classification" | "sentiment-analysis" => Self::TextClassification,
            "token-classification" | "ner" => Self::TokenClassification,
            "question-answering" => Self::QuestionAnswering,
            "feature-extraction" => Self::FeatureExtraction,
            "zero-shot-classification" => Self::ZeroShotClassification,
            // translation_en_to_fr and friends
            t if t == "translation" || t.starts_with("translation_") => Self::Translation,
            other => {
                return Err(Error::UnknownTask {
                    task: other.to_string(),
                });
            }
        };
        Ok(task)
    }
}

pub const DEFAULT_MAX_LENGTH: usize = 50;
pub const DEFAULT_NUM_RETURN_SEQUENCES: usize = 1;
pub const DEFAULT_SEED: u64 = 42;

/// Per-request generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on prompt plus generated tokens.
    pub max_length: usize,
    pub num_return_sequences: usize,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub seed: Option<u64>,
}

impl GenerationParams {
    /// Greedy decoding unless a temperature was requested or several
    /// sequences are wanted. Checkpoint `task_specific_params` that turn on
    /// sampling (as `gpt2` ships) are not consulted.
    pub fn do_sample(&self) -> bool {
        self.temperature.is_some() || self.num_return_sequences > 1
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            num_return_sequences: DEFAULT_NUM_RETURN_SEQUENCES,
            temperature: None,
            top_p: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

impl GeneratedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            generated_text: text.into(),
        }
    }
}
