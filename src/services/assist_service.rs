use base64::{engine::general_purpose::STANDARD, Engine as _};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::llm_client::{ChatBackend, LlmClient, LlmError, Prompt};
use crate::config::Config;
use crate::models::{AssistKind, AssistResponse, CompletionResponse};

/// Code assistance backed by a chat model, with answers cached per
/// (kind, language, context, code).
pub struct AssistService {
    backend: Arc<dyn ChatBackend>,
    cache: Cache<String, String>,
}

impl AssistService {
    pub fn new(backend: Arc<dyn ChatBackend>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
        Self { backend, cache }
    }

    /// None when no API key is configured
    pub fn from_config(config: &Config) -> Result<Option<Self>, LlmError> {
        let Some(api_key) = config.llm_api_key.as_deref() else {
            return Ok(None);
        };
        let client = LlmClient::new(&config.llm_api_url, api_key, &config.llm_model)?;
        info!("Code assistance enabled with model {}", client.model());
        Ok(Some(Self::new(Arc::new(client), Duration::from_secs(config.ai_cache_ttl_secs))))
    }

    pub async fn assist(
        &self,
        kind: AssistKind,
        code: &str,
        language: &str,
        context: Option<&str>,
    ) -> Result<AssistResponse, LlmError> {
        let (content, cached) = self.ask(kind, code, language, context).await?;
        Ok(AssistResponse { kind, content, cached })
    }

    /// Likely continuations of `code`. A model answer that is not a JSON array
    /// of strings becomes a single suggestion.
    pub async fn complete(&self, code: &str, language: &str, context: Option<&str>) -> Result<CompletionResponse, LlmError> {
        let (raw, cached) = self.ask(AssistKind::Complete, code, language, context).await?;
        Ok(CompletionResponse {
            completions: parse_completions(&raw),
            cached,
        })
    }

    async fn ask(
        &self,
        kind: AssistKind,
        code: &str,
        language: &str,
        context: Option<&str>,
    ) -> Result<(String, bool), LlmError> {
        let key = cache_key(kind, code, language, context);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Assistance cache hit for {} ({})", kind.as_str(), language);
            return Ok((hit, true));
        }

        let user = user_prompt(kind, code, language, context);
        let answer = self
            .backend
            .chat(Prompt {
                system: system_prompt(kind),
                user: &user,
                max_tokens: max_tokens(kind),
                temperature: if kind == AssistKind::Refactor { 0.2 } else { 0.3 },
            })
            .await?;
        self.cache.insert(key, answer.clone()).await;
        Ok((answer, false))
    }
}

// Free-form fields are base64 encoded so ':' never appears inside one.
// A missing context is '-', which is outside the base64 alphabet.
fn cache_key(kind: AssistKind, code: &str, language: &str, context: Option<&str>) -> String {
    format!(
        "{}:{}:{}:{}",
        kind.as_str(),
        STANDARD.encode(language),
        context.map_or_else(|| "-".to_string(), |c| STANDARD.encode(c)),
        STANDARD.encode(code)
    )
}

fn system_prompt(kind: AssistKind) -> &'static str {
    match kind {
        AssistKind::Explain => "You are a senior engineer who explains code to colleagues clearly and precisely.",
        AssistKind::Refactor => "You are a senior engineer who rewrites code to be cleaner and easier to maintain.",
        AssistKind::Debug => "You are a debugging specialist. Find defects in code and propose concrete fixes.",
        AssistKind::Optimize => "You are a performance specialist. Suggest faster or leaner versions of code.",
        AssistKind::Generate => "You are a senior engineer who writes production quality code from a description.",
        AssistKind::Complete => "You are a code completion engine. Answer with code only.",
    }
}

fn user_prompt(kind: AssistKind, code: &str, language: &str, context: Option<&str>) -> String {
    let task = match kind {
        AssistKind::Explain => format!(
            "Explain what this {} code does, its main parts and any notable patterns.",
            language
        ),
        AssistKind::Refactor => format!(
            "Refactor this {} code for readability and structure. Reply with the refactored code only.",
            language
        ),
        AssistKind::Debug => format!("Find bugs in this {} code and suggest fixes.", language),
        AssistKind::Optimize => format!("Improve the performance of this {} code.", language),
        AssistKind::Generate => format!(
            "Write {} code for: {}",
            language,
            context.unwrap_or("the requirements below")
        ),
        AssistKind::Complete => format!(
            "Suggest 3 to 5 plausible continuations of this {} code. Reply with a JSON array of strings.",
            language
        ),
    };
    let context = match (kind, context) {
        (AssistKind::Generate, _) | (_, None) => String::new(),
        (_, Some(c)) => format!("\nContext: {}", c),
    };
    format!("{}{}\n\n```{}\n{}\n```", task, context, language, code)
}

fn max_tokens(kind: AssistKind) -> u32 {
    match kind {
        AssistKind::Complete => 500,
        AssistKind::Explain => 1000,
        AssistKind::Refactor => 2000,
        _ => 1500,
    }
}

fn parse_completions(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    match serde_json::from_str::<Vec<String>>(body) {
        Ok(list) => list,
        Err(_) => vec![trimmed.to_string()],
    }
}


#[cfg(test)]
mod tests {
    use super::test_backend::CannedBackend;
    use super::*;

    #[tokio::test]
    async fn test_answers_are_cached_per_input() {
        let backend = CannedBackend::new("It prints one.");
        let service = AssistService::new(backend.clone(), Duration::from_secs(60));

        let first = service.assist(AssistKind::Explain, "print(1)", "python", None).await.unwrap();
        let second = service.assist(AssistKind::Explain, "print(1)", "python", None).await.unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.content, "It prints one.");
        assert_eq!(backend.calls(), 1);

        service.assist(AssistKind::Explain, "print(2)", "python", None).await.unwrap();
        service.assist(AssistKind::Debug, "print(1)", "python", None).await.unwrap();
        service.assist(AssistKind::Explain, "print(1)", "python", Some("tests")).await.unwrap();
        assert_eq!(backend.calls(), 4);
    }

    #[test]
    fn test_cache_keys_do_not_collide_across_fields() {
        let a = cache_key(AssistKind::Explain, "x", "a:b", Some("c"));
        let b = cache_key(AssistKind::Explain, "x", "a", Some("b:c"));
        assert_ne!(a, b);

        let none = cache_key(AssistKind::Explain, "x", "rust", None);
        let empty = cache_key(AssistKind::Explain, "x", "rust", Some(""));
        assert_ne!(none, empty);
    }

    #[tokio::test]
    async fn test_colon_in_language_does_not_share_answers() {
        let backend = CannedBackend::new("answer");
        let service = AssistService::new(backend.clone(), Duration::from_secs(60));
        service.assist(AssistKind::Explain, "x", "a:b", Some("c")).await.unwrap();
        let second = service.assist(AssistKind::Explain, "x", "a", Some("b:c")).await.unwrap();
        assert!(!second.cached);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_complete_parses_json_array() {
        let backend = CannedBackend::new("```json\n[\"a()\", \"b()\"]\n```");
        let service = AssistService::new(backend, Duration::from_secs(60));
        let res = service.complete("fn ", "rust", None).await.unwrap();
        assert_eq!(res.completions, vec!["a()", "b()"]);
    }

    #[test]
    fn test_complete_falls_back_to_single_item() {
        assert_eq!(parse_completions("  x + 1  "), vec!["x + 1"]);
        assert_eq!(parse_completions(r#"["one"]"#), vec!["one"]);
    }

    #[test]
    fn test_prompts_carry_code_and_context() {
        let prompt = user_prompt(AssistKind::Refactor, "let x=1", "javascript", Some("legacy module"));
        assert!(prompt.contains("```javascript\nlet x=1\n```"));
        assert!(prompt.contains("Context: legacy module"));

        let generate = user_prompt(AssistKind::Generate, "", "go", Some("an http server"));
        assert!(generate.starts_with("Write go code for: an http server"));
        assert!(!generate.contains("Context:"));
    }

    #[test]
    fn test_no_api_key_disables_assistance() {
        let config = Config::default();
        assert!(AssistService::from_config(&config).unwrap().is_none());
    }
}
