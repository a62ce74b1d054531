use crate::chunker::word_count;
use crate::types::{ChunkVerdict, Finding, JudgeTag, Pass, Result, ScreenError, Tag};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Token counts reported for a single oracle call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// An oracle answer together with what it cost.
#[derive(Debug, Clone)]
pub struct OracleReply<T> {
    pub value: T,
    pub usage: TokenUsage,
}

impl<T> OracleReply<T> {
    pub fn new(value: T, usage: TokenUsage) -> Self {
        Self { value, usage }
    }

    pub fn unmetered(value: T) -> Self {
        Self::new(value, TokenUsage::default())
    }
}

/// Per-submission tally of oracle calls and tokens.
///
/// Only the invocation wrappers below touch it, once per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageContext {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub oracle_calls: u64,
}

impl UsageContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin_call(&mut self) {
        self.oracle_calls += 1;
    }

    fn record(&mut self, usage: TokenUsage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Classification {
    pub tag: Tag,
    pub summary: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregation {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Description {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Judgment {
    pub tag: JudgeTag,
}

/// External text classification and generation capability.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn oracle_name(&self) -> String;

    /// Classify one chunk as suspicious or not.
    async fn classify(&self, system_prompt: &str, chunk: &str) -> Result<OracleReply<Classification>>;

    /// Collapse a pass's findings into one result label.
    async fn aggregate(&self, system_prompt: &str, findings: &[Finding]) -> Result<OracleReply<Aggregation>>;

    /// Produce a neutral description bounded by `max_output_tokens`.
    async fn describe(
        &self,
        system_prompt: &str,
        text: &str,
        max_output_tokens: u32,
    ) -> Result<OracleReply<Description>>;

    /// Render the final GOOD/BAD judgment.
    async fn judge(&self, system_prompt: &str, text: &str) -> Result<OracleReply<Judgment>>;
}

pub async fn classify_chunk(
    oracle: &dyn Oracle,
    usage: &mut UsageContext,
    system_prompt: &str,
    chunk: &str,
) -> Result<ChunkVerdict> {
    usage.begin_call();
    let reply = oracle.classify(system_prompt, chunk).await?;
    usage.record(reply.usage);

    let Classification { tag, summary, context } = reply.value;
    if summary.trim().is_empty() || context.trim().is_empty() {
        return Err(ScreenError::OracleContract(format!(
            "classification for chunk '{}' is missing summary or context",
            chunk
        )));
    }

    debug!("Chunk classified as {}: {}", tag.as_str(), summary);
    Ok(ChunkVerdict {
        chunk: chunk.to_string(),
        tag,
        summary,
        context,
    })
}

pub async fn aggregate_findings(
    oracle: &dyn Oracle,
    usage: &mut UsageContext,
    system_prompt: &str,
    findings: &[Finding],
) -> Result<String> {
    usage.begin_call();
    let reply = oracle.aggregate(system_prompt, findings).await?;
    usage.record(reply.usage);

    let result = reply.value.result.trim().to_string();
    if result.is_empty() {
        return Err(ScreenError::AggregatorContract("aggregator returned an empty result".to_string()));
    }
    Ok(result)
}

pub async fn describe_text(
    oracle: &dyn Oracle,
    usage: &mut UsageContext,
    system_prompt: &str,
    text: &str,
    max_output_tokens: u32,
) -> Result<String> {
    usage.begin_call();
    let reply = oracle.describe(system_prompt, text, max_output_tokens).await?;
    usage.record(reply.usage);

    let description = reply.value.description.trim().to_string();
    if description.is_empty() {
        return Err(ScreenError::OracleContract("describer returned an empty description".to_string()));
    }
    Ok(description)
}

pub async fn judge_text(
    oracle: &dyn Oracle,
    usage: &mut UsageContext,
    system_prompt: &str,
    text: &str,
) -> Result<JudgeTag> {
    usage.begin_call();
    let reply = oracle.judge(system_prompt, text).await?;
    usage.record(reply.usage);
    Ok(reply.value.tag)
}

const SUSPICIOUS_PATTERNS: &[&str] = &[
    "ignore",
    "disregard",
    "previous instructions",
    "system prompt",
    "jailbreak",
    "pretend",
    "you must",
    "override",
    "rate this",
    "mark this",
    "dying",
    "grandma",
];

/// Offline oracle for development runs and demos.
///
/// Flags chunks containing common injection phrasing and otherwise echoes the input.
pub struct MockOracle {
    name: String,
    response_delay_ms: u64,
    judge_verdict: JudgeTag,
}

impl MockOracle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            response_delay_ms: 0,
            judge_verdict: JudgeTag::Bad,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn with_judge_verdict(mut self, verdict: JudgeTag) -> Self {
        self.judge_verdict = verdict;
        self
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.response_delay_ms)).await;
        }
    }

    fn estimate_usage(prompt: &str, input: &str, output_words: usize) -> TokenUsage {
        TokenUsage {
            prompt_tokens: (word_count(prompt) + word_count(input)) as u64,
            completion_tokens: output_words as u64,
        }
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn oracle_name(&self) -> String {
        format!("Mock Oracle ({})", self.name)
    }

    async fn classify(&self, system_prompt: &str, chunk: &str) -> Result<OracleReply<Classification>> {
        self.simulate_processing().await;

        let lowered = chunk.to_lowercase();
        let hit = SUSPICIOUS_PATTERNS.iter().find(|pattern| lowered.contains(*pattern));
        let classification = match hit {
            Some(pattern) => Classification {
                tag: Tag::Sus,
                summary: format!("contains manipulative phrase '{}'", pattern),
                context: "text appears to address the reviewer rather than tell a joke".to_string(),
            },
            None => Classification {
                tag: Tag::Nan,
                summary: "ordinary text with no instructions".to_string(),
                context: format!("fragment reading '{}'", chunk),
            },
        };

        let output_words = word_count(&classification.summary) + word_count(&classification.context);
        Ok(OracleReply::new(classification, Self::estimate_usage(system_prompt, chunk, output_words)))
    }

    async fn aggregate(&self, system_prompt: &str, findings: &[Finding]) -> Result<OracleReply<Aggregation>> {
        self.simulate_processing().await;

        let pass = if system_prompt.contains(Pass::Second.flag_label()) {
            Pass::Second
        } else {
            Pass::First
        };
        let result = if findings.iter().any(|finding| finding.tag.is_suspicious()) {
            pass.flag_label()
        } else {
            pass.valid_label()
        };
        info!("Mock aggregator saw {} findings, answering {}", findings.len(), result);

        let usage = TokenUsage {
            prompt_tokens: (word_count(system_prompt) + findings.len() * 20) as u64,
            completion_tokens: 1,
        };
        Ok(OracleReply::new(Aggregation { result: result.to_string() }, usage))
    }

    async fn describe(
        &self,
        system_prompt: &str,
        text: &str,
        max_output_tokens: u32,
    ) -> Result<OracleReply<Description>> {
        self.simulate_processing().await;

        let excerpt: Vec<&str> = text
            .split_whitespace()
            .take((max_output_tokens as usize).saturating_sub(4).max(1))
            .collect();
        let description = format!("A short text that reads: {}", excerpt.join(" "));
        let usage = Self::estimate_usage(system_prompt, text, word_count(&description));
        Ok(OracleReply::new(Description { description }, usage))
    }

    async fn judge(&self, system_prompt: &str, text: &str) -> Result<OracleReply<Judgment>> {
        self.simulate_processing().await;
        Ok(OracleReply::new(
            Judgment { tag: self.judge_verdict },
            Self::estimate_usage(system_prompt, text, 1),
        ))
    }
}
