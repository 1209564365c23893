//! Proposals from an external reasoning provider.
//!
//! The provider is an opaque async text-completion call. Its reply is
//! parsed as a proposal JSON object; anything unusable becomes a safe
//! no-op proposal instead of an error.

use std::time::Duration;

use async_trait::async_trait;
use evo_telemetry::Diagnosis;
use evo_types::{Proposal, ProposalId, RiskLevel};
use tracing::{debug, warn};

use crate::error::AutopilotError;
use crate::source::ProposalSource;

/// History context is limited to this many trailing characters.
pub const HISTORY_SNIPPET_CHARS: usize = 4000;

/// Title of the fallback proposal.
pub const NO_OP_TITLE: &str = "no-op";

pub const SYSTEM_PROMPT: &str = "\
You propose small, safe changes to the agent's own repository.

Given a failure diagnosis and an optional history snippet, reply with a
single JSON object with exactly these keys:

{
  \"id\": \"<uuid>\",
  \"title\": \"<short title>\",
  \"objective\": \"<what the change achieves>\",
  \"evidence\": [\"<evidence line>\"],
  \"risk_level\": \"low\" | \"medium\" | \"high\",
  \"files_touched\": [\"<relative path>\"],
  \"unified_diff\": \"<unified diff>\",
  \"tests_to_run\": [\"<test invocation>\"],
  \"rollback_plan\": \"<how to undo>\"
}

Rules:
- Reply with the JSON object only.
- Keep changes minimal.
- Never modify .env, secrets or .git files.
- If nothing should change, return title \"no-op\" with an empty diff.
";

/// An external text-completion service.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AutopilotError>;
}

/// [`ProposalSource`] backed by a [`ReasoningProvider`].
pub struct ReasoningProposalSource {
    provider: Box<dyn ReasoningProvider>,
    timeout: Duration,
}

impl ReasoningProposalSource {
    pub fn new(provider: impl ReasoningProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProposalSource for ReasoningProposalSource {
    async fn propose(&self, diagnosis: &Diagnosis, history: &str) -> Result<Proposal, AutopilotError> {
        let prompt = build_user_prompt(diagnosis, history);
        let reply = tokio::time::timeout(self.timeout, self.provider.complete(SYSTEM_PROMPT, &prompt)).await;
        let text = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "reasoning provider failed; using no-op proposal");
                return Ok(fallback_proposal(diagnosis));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "reasoning provider timed out; using no-op proposal");
                return Ok(fallback_proposal(diagnosis));
            }
        };
        Ok(parse_proposal_text(&text, diagnosis))
    }

    fn name(&self) -> &str {
        "reasoning"
    }
}

/// Diagnosis as pretty JSON, then the redacted tail of the history.
pub fn build_user_prompt(diagnosis: &Diagnosis, history: &str) -> String {
    let diagnosis_json =
        serde_json::to_string_pretty(diagnosis).unwrap_or_else(|_| diagnosis.summary.clone());
    let mut parts = vec!["## Diagnosis".to_string(), diagnosis_json];
    let snippet = tail_chars(history, HISTORY_SNIPPET_CHARS);
    if !snippet.trim().is_empty() {
        parts.push("## Recent History Snippet".into());
        parts.push(evo_redact::redact(snippet));
    }
    parts.push("Generate the proposal JSON now.".into());
    parts.join("\n\n")
}

/// Last `n` characters of `text`.
pub fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    let skip = count - n;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Parse provider output into a proposal, or fall back to a no-op.
///
/// Accepts a bare JSON object or one wrapped in a Markdown code fence.
/// Near-JSON replies (prose around the object, trailing commas) are
/// repaired deterministically first. A missing or blank id is replaced with
/// a fresh one.
pub fn parse_proposal_text(text: &str, diagnosis: &Diagnosis) -> Proposal {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return fallback_proposal(diagnosis);
    }
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => match repair_and_parse(body) {
            Some(value) => {
                debug!(error = %e, "provider reply repaired");
                value
            }
            None => {
                warn!(error = %e, "provider reply is not JSON; using no-op proposal");
                return fallback_proposal(diagnosis);
            }
        },
    };
    if !value.is_object() {
        return fallback_proposal(diagnosis);
    }
    match serde_json::from_value::<Proposal>(value) {
        Ok(mut proposal) => {
            if proposal.id.is_blank() {
                proposal.id = ProposalId::new();
            }
            proposal
        }
        Err(e) => {
            warn!(error = %e, "provider reply is not a valid proposal; using no-op proposal");
            fallback_proposal(diagnosis)
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let after_opening = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let inner = after_opening
        .rsplit_once("```")
        .map(|(inner, _)| inner)
        .unwrap_or(after_opening);
    inner.trim()
}

/// First repair candidate that parses to a JSON object.
fn repair_and_parse(body: &str) -> Option<serde_json::Value> {
    let mut candidates = Vec::new();
    if let Some(object) = extract_first_object(body) {
        candidates.push(object.to_string());
        candidates.push(strip_trailing_commas(object));
    }
    candidates.push(strip_trailing_commas(body));

    candidates
        .iter()
        .filter_map(|candidate| serde_json::from_str::<serde_json::Value>(candidate).ok())
        .find(serde_json::Value::is_object)
}

/// The first balanced `{...}` in `text`. Braces inside strings do not count.
fn extract_first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas that directly precede `}` or `]`, outside strings.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = text[idx + 1..].chars().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Low-risk proposal with no diff, carrying the diagnosis as evidence.
pub fn fallback_proposal(diagnosis: &Diagnosis) -> Proposal {
    Proposal::new(NO_OP_TITLE)
        .with_objective("Provider output was unusable; no change proposed.")
        .with_evidence(diagnosis.summary.clone())
        .with_risk(RiskLevel::Low)
}

// ── Scripted provider ───────────────────────────────────────────────────

/// Provider returning a fixed reply, for tests and offline runs.
#[derive(Clone, Debug)]
pub struct ScriptedProvider {
    reply: Result<String, String>,
}

impl ScriptedProvider {
    pub fn replying(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
        }
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, AutopilotError> {
        self.reply.clone().map_err(AutopilotError::Provider)
    }
}
