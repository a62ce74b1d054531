use crate::chunker::{chunk_range_for, word_count, SizeSource};
use crate::oracle::{aggregate_findings, Oracle, UsageContext};
use crate::prompts::PassPrompts;
use crate::round::run_round;
use crate::types::{ChunkVerdict, Decision, Finding, Pass, ScreenError, VerificationOutcome};
use tracing::{debug, info, warn};

/// Number of independent rounds to sample for a text of `word_count` words.
///
/// Longer texts yield more chunks per round, so they get fewer rounds. Below
/// 20 words the count shrinks with the text so it never exceeds what the
/// text can meaningfully be re-chunked into.
pub fn round_count_for(word_count: usize) -> usize {
    match word_count {
        0..=19 => word_count.saturating_sub(2).max(1),
        20..=29 => 13,
        30..=39 => 12,
        40..=59 => 11,
        60..=79 => 10,
        80..=99 => 9,
        100..=149 => 8,
        150..=199 => 7,
        200..=299 => 6,
        300..=499 => 5,
        500..=699 => 4,
        700..=899 => 3,
        _ => 2,
    }
}

/// A pass that stopped on an error, with what it collected before stopping.
#[derive(Debug)]
pub struct PassFailure {
    pub error: ScreenError,
    pub word_count: usize,
    pub rounds_planned: usize,
    /// Rounds that finished before the failure.
    pub rounds_completed: usize,
    /// Verdicts of the finished rounds, round-major and chunk-minor.
    pub all_verdicts: Vec<ChunkVerdict>,
}

/// Run one verification pass over `text`.
///
/// Rounds run one after another. The first suspicious round ends the pass
/// with [`Decision::Flag`] and the aggregator is skipped. A clean pass sends
/// every finding to the aggregator once and adopts its answer. On failure the
/// verdicts of every finished round travel back in the [`PassFailure`].
pub async fn verify(
    oracle: &dyn Oracle,
    prompts: &PassPrompts,
    pass: Pass,
    text: &str,
    usage: &mut UsageContext,
    sizes: &mut dyn SizeSource,
) -> std::result::Result<VerificationOutcome, PassFailure> {
    let words = word_count(text);
    if words == 0 {
        return Err(PassFailure {
            error: ScreenError::EmptyInput,
            word_count: 0,
            rounds_planned: 0,
            rounds_completed: 0,
            all_verdicts: Vec::new(),
        });
    }

    let rounds = round_count_for(words);
    let range = chunk_range_for(words);
    info!(
        "{} verifying {} words over {} rounds (chunks of {}-{} words)",
        pass, words, rounds, range.min_words(), range.max_words()
    );

    let mut all_verdicts = Vec::new();
    for round in 1..=rounds {
        let result = match run_round(oracle, &prompts.instruction, text, range, usage, sizes).await {
            Ok(result) => result,
            Err(error) => {
                warn!("{} round {}/{} failed: {}", pass, round, rounds, error);
                return Err(PassFailure {
                    error,
                    word_count: words,
                    rounds_planned: rounds,
                    rounds_completed: round - 1,
                    all_verdicts,
                });
            }
        };
        let suspicious = result.is_suspicious();
        all_verdicts.extend(result.verdicts);

        if suspicious {
            warn!("{} round {}/{} found a suspicious chunk", pass, round, rounds);
            return Ok(VerificationOutcome {
                result: Decision::Flag,
                word_count: words,
                rounds_planned: rounds,
                rounds_executed: round,
                all_verdicts,
            });
        }
        debug!("{} round {}/{} clean", pass, round, rounds);
    }

    let findings: Vec<Finding> = all_verdicts.iter().map(|verdict| verdict.finding()).collect();
    let raw = match aggregate_findings(oracle, usage, &prompts.aggregator, &findings).await {
        Ok(raw) => raw,
        Err(error) => {
            warn!("{} aggregator failed: {}", pass, error);
            return Err(PassFailure {
                error,
                word_count: words,
                rounds_planned: rounds,
                rounds_completed: rounds,
                all_verdicts,
            });
        }
    };
    let result = pass.decode(&raw);
    info!("{} aggregator answered {} over {} findings", pass, raw, findings.len());

    Ok(VerificationOutcome {
        result,
        word_count: words,
        rounds_planned: rounds,
        rounds_executed: rounds,
        all_verdicts,
    })
}
