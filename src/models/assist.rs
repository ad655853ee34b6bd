use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of code assistance requested from the language model
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssistKind {
    Explain,
    Refactor,
    Debug,
    Optimize,
    Generate,
    Complete,
}

impl AssistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistKind::Explain => "explain",
            AssistKind::Refactor => "refactor",
            AssistKind::Debug => "debug",
            AssistKind::Optimize => "optimize",
            AssistKind::Generate => "generate",
            AssistKind::Complete => "complete",
        }
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct AssistRequest {
    pub code: String,
    pub language: String,
    pub context: Option<String>,
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct SuggestRequest {
    #[serde(rename = "type")]
    pub kind: AssistKind,
    pub code: String,
    pub language: String,
    pub context: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct AssistResponse {
    #[serde(rename = "type")]
    pub kind: AssistKind,
    pub content: String,
    pub cached: bool,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct CompletionResponse {
    pub completions: Vec<String>,
    pub cached: bool,
}
