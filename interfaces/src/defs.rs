use serde::{Deserialize, Serialize};

use crate::state::SubmissionState;

/// Per-chunk classification tag returned by the classifier oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "SUS")]
    Sus,
    #[serde(rename = "NAN")]
    Nan,
}

impl Tag {
    pub fn is_suspicious(self) -> bool {
        matches!(self, Tag::Sus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Sus => "SUS",
            Tag::Nan => "NAN",
        }
    }
}

/// One classification of one chunk in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkVerdict {
    pub chunk: String,
    pub tag: Tag,
    pub summary: String,
    pub context: String,
}

impl ChunkVerdict {
    pub fn finding(&self) -> Finding {
        Finding {
            tag: self.tag,
            summary: self.summary.clone(),
            context: self.context.clone(),
        }
    }
}

/// A verdict without its chunk text, as handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub tag: Tag,
    pub summary: String,
    pub context: String,
}

/// Which of the two verification passes is running.
///
/// Pass one screens the raw memo, pass two screens the neutral description of it.
/// Each pass has its own aggregator vocabulary (`FLAG1`/`VALID1`, `FLAG2`/`VALID2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    First,
    Second,
}

impl Pass {
    pub fn flag_label(self) -> &'static str {
        match self {
            Pass::First => "FLAG1",
            Pass::Second => "FLAG2",
        }
    }

    pub fn valid_label(self) -> &'static str {
        match self {
            Pass::First => "VALID1",
            Pass::Second => "VALID2",
        }
    }

    /// Short operator-facing name used in logs and reports.
    pub fn cop_name(self) -> &'static str {
        match self {
            Pass::First => "COP1",
            Pass::Second => "COP2",
        }
    }

    /// Interpret a raw aggregator result in this pass's vocabulary.
    pub fn decode(self, raw: &str) -> Decision {
        if raw == self.flag_label() {
            Decision::Flag
        } else if raw == self.valid_label() {
            Decision::Valid
        } else {
            Decision::Unrecognized(raw.to_string())
        }
    }

    pub fn flagged_state(self) -> SubmissionState {
        match self {
            Pass::First => SubmissionState::Flag1,
            Pass::Second => SubmissionState::Flag2,
        }
    }
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cop_name())
    }
}

/// Aggregated decision of one verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Flag,
    Valid,
    /// The aggregator answered outside the pass's two-value vocabulary.
    Unrecognized(String),
}

/// Final quality tag returned by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgeTag {
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "BAD")]
    Bad,
}

impl JudgeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            JudgeTag::Good => "GOOD",
            JudgeTag::Bad => "BAD",
        }
    }

    pub fn final_state(self) -> SubmissionState {
        match self {
            JudgeTag::Good => SubmissionState::Good,
            JudgeTag::Bad => SubmissionState::Bad,
        }
    }
}

/// Result of one multi-round verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub result: Decision,
    pub word_count: usize,
    pub rounds_planned: usize,
    pub rounds_executed: usize,
    /// Every verdict of every executed round, round-major and chunk-minor.
    pub all_verdicts: Vec<ChunkVerdict>,
}

impl VerificationOutcome {
    pub fn suspicious_verdicts(&self) -> impl Iterator<Item = &ChunkVerdict> {
        self.all_verdicts.iter().filter(|verdict| verdict.tag.is_suspicious())
    }
}

// Object style note:
// Oracles and stores are written against these plain data types so that a
// screening run can be replayed from its report alone. Nothing in here owns
// I/O or mutable state.
