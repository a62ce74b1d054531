use crate::chunker::{word_count, RandomSizes, SizeSource};
use crate::oracle::{describe_text, judge_text, Oracle, UsageContext};
use crate::prompts::PromptSet;
use crate::store::SubmissionStore;
use crate::types::{
    ChunkVerdict, Decision, JudgeTag, Pass, Result, ScreenConfig, ScreenError, SubmissionState,
    VerificationOutcome,
};
use crate::verifier::{verify, PassFailure};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Terminal outcome of one screening run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Refused at the door, nothing was stored or sent to the oracle.
    Rejected,
    FlaggedCop1,
    FlaggedCop2,
    Good,
    Bad,
    Error,
}

impl Outcome {
    pub fn message(self) -> &'static str {
        match self {
            Outcome::Rejected => "Submission rejected",
            Outcome::FlaggedCop1 => "jailbreak detected",
            Outcome::FlaggedCop2 => "advanced jailbreak detected",
            Outcome::Good => "I like what you got",
            Outcome::Bad => "disqualified",
            Outcome::Error => "Internal error",
        }
    }

    fn flagged(pass: Pass) -> Self {
        match pass {
            Pass::First => Outcome::FlaggedCop1,
            Pass::Second => Outcome::FlaggedCop2,
        }
    }
}

/// Step of the pipeline a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Cop1Verify,
    Describe,
    Cop2Verify,
    Judge,
    Storage,
}

impl Stage {
    fn verify(pass: Pass) -> Self {
        match pass {
            Pass::First => Stage::Cop1Verify,
            Pass::Second => Stage::Cop2Verify,
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Stage::Intake => "Error: submission could not be accepted",
            Stage::Cop1Verify => "Error: invalid response from COP1",
            Stage::Describe => "Error: description step failed",
            Stage::Cop2Verify => "Error: invalid response from COP2",
            Stage::Judge => "Error: judgment step failed",
            Stage::Storage => "Error: storage update failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningStats {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub oracle_calls: u64,
    pub submission_words: usize,
    pub cop1_rounds: Option<usize>,
    pub cop2_rounds: Option<usize>,
    pub description_words: Option<usize>,
}

/// Everything a caller needs to know about one run, success or not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningReport {
    pub submission_id: Option<Uuid>,
    pub outcome: Outcome,
    pub message: String,
    /// Last state the store accepted for this submission.
    pub final_state: Option<SubmissionState>,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub description: Option<String>,
    pub chunk_logs_cop1: Vec<ChunkVerdict>,
    pub chunk_logs_cop2: Vec<ChunkVerdict>,
    pub stats: ScreeningStats,
}

impl ScreeningReport {
    fn new(submission_id: Option<Uuid>, submission_words: usize) -> Self {
        Self {
            submission_id,
            outcome: Outcome::Error,
            message: String::new(),
            final_state: None,
            failed_stage: None,
            error: None,
            description: None,
            chunk_logs_cop1: Vec::new(),
            chunk_logs_cop2: Vec::new(),
            stats: ScreeningStats {
                submission_words,
                ..ScreeningStats::default()
            },
        }
    }

    fn rejected(reason: String, submission_words: usize) -> Self {
        let mut report = Self::new(None, submission_words);
        report.outcome = Outcome::Rejected;
        report.message = reason;
        report
    }

    fn record_pass(&mut self, pass: Pass, outcome: &VerificationOutcome) {
        self.record_logs(pass, outcome.all_verdicts.clone(), outcome.rounds_executed, outcome.word_count);
    }

    /// Keep what a failed pass collected and hand back its error.
    fn record_failed_pass(&mut self, pass: Pass, failure: PassFailure) -> ScreenError {
        if failure.word_count > 0 {
            self.record_logs(pass, failure.all_verdicts, failure.rounds_completed, failure.word_count);
        }
        failure.error
    }

    fn record_logs(&mut self, pass: Pass, verdicts: Vec<ChunkVerdict>, rounds: usize, words: usize) {
        match pass {
            Pass::First => {
                self.chunk_logs_cop1 = verdicts;
                self.stats.cop1_rounds = Some(rounds);
            }
            Pass::Second => {
                self.chunk_logs_cop2 = verdicts;
                self.stats.cop2_rounds = Some(rounds);
                self.stats.description_words = Some(words);
            }
        }
    }

    fn record_usage(&mut self, usage: &UsageContext) {
        self.stats.prompt_tokens = usage.prompt_tokens;
        self.stats.completion_tokens = usage.completion_tokens;
        self.stats.oracle_calls = usage.oracle_calls;
    }

    fn conclude(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.message = outcome.message().to_string();
    }

    fn fail(&mut self, failure: StageFailure) {
        self.outcome = Outcome::Error;
        self.message = failure.stage.failure_message().to_string();
        self.failed_stage = Some(failure.stage);
        self.error = Some(failure.error.to_string());
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self.outcome, Outcome::FlaggedCop1 | Outcome::FlaggedCop2)
    }
}

#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    error: ScreenError,
}

fn at(stage: Stage) -> impl FnOnce(ScreenError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Two verification passes around a describer, followed by the judge.
///
/// ```text
/// COP1 verify -> flag1 | describe -> COP2 verify -> flag2 | judge -> good | bad
/// ```
pub struct ScreeningPipeline {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn SubmissionStore>,
    prompts: PromptSet,
    config: ScreenConfig,
}

impl ScreeningPipeline {
    pub fn new(oracle: Arc<dyn Oracle>, store: Arc<dyn SubmissionStore>, config: ScreenConfig) -> Self {
        Self {
            oracle,
            store,
            prompts: PromptSet::default(),
            config,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Screen one memo with randomly drawn chunk sizes.
    pub async fn screen(&self, memo: &str) -> ScreeningReport {
        let mut sizes = RandomSizes::from_entropy();
        self.screen_with_sizes(memo, &mut sizes).await
    }

    /// Screen one memo, drawing chunk sizes from `sizes`.
    pub async fn screen_with_sizes(&self, memo: &str, sizes: &mut dyn SizeSource) -> ScreeningReport {
        let words = word_count(memo);

        if memo.trim().chars().count() < self.config.min_memo_chars {
            warn!("Rejecting submission shorter than {} characters", self.config.min_memo_chars);
            return ScreeningReport::rejected(
                format!(
                    "Error: Submission too short. Minimum {} characters required.",
                    self.config.min_memo_chars
                ),
                words,
            );
        }
        if words == 0 {
            return ScreeningReport::rejected(ScreenError::EmptyInput.to_string(), words);
        }

        let id = Uuid::new_v4();
        info!("== New submission {} ({} words) via {} ==", id, words, self.oracle.oracle_name());

        let mut report = ScreeningReport::new(Some(id), words);
        let mut usage = UsageContext::new();
        let result = self.run_stages(id, memo, &mut report, &mut usage, sizes).await;
        report.record_usage(&usage);

        if let Err(failure) = result {
            error!("Submission {} failed during {:?}: {}", id, failure.stage, failure.error);
            report.fail(failure);
        }

        info!(
            "Submission {} finished as {:?} after {} oracle calls",
            id, report.outcome, report.stats.oracle_calls
        );
        report
    }

    async fn run_stages(
        &self,
        id: Uuid,
        memo: &str,
        report: &mut ScreeningReport,
        usage: &mut UsageContext,
        sizes: &mut dyn SizeSource,
    ) -> std::result::Result<(), StageFailure> {
        self.store
            .insert_pending(id, memo, &self.config.submitter_address)
            .await
            .map_err(at(Stage::Intake))?;
        report.final_state = Some(SubmissionState::Pending);

        if self.verification_pass(Pass::First, id, memo, report, usage, sizes).await? {
            return Ok(());
        }

        info!("Submission {} passed COP1, requesting description", id);
        let description = describe_text(
            self.oracle.as_ref(),
            usage,
            &self.prompts.describer,
            memo,
            self.config.describe_max_tokens,
        )
        .await
        .map_err(at(Stage::Describe))?;
        report.stats.description_words = Some(word_count(&description));
        report.description = Some(description.clone());

        self.store
            .record_description(id, &description)
            .await
            .map_err(at(Stage::Storage))?;
        report.final_state = Some(SubmissionState::GotMain1);

        if self.verification_pass(Pass::Second, id, &description, report, usage, sizes).await? {
            return Ok(());
        }

        info!("Submission {} passed COP2, requesting judgment", id);
        let tag = judge_text(self.oracle.as_ref(), usage, &self.prompts.judge, &description)
            .await
            .map_err(at(Stage::Judge))?;

        self.advance(id, tag.final_state(), report).await?;
        report.conclude(match tag {
            JudgeTag::Good => Outcome::Good,
            JudgeTag::Bad => Outcome::Bad,
        });
        info!("Submission {} judged {}", id, tag.as_str());
        Ok(())
    }

    /// Run one verification pass; `Ok(true)` means the submission was flagged and the run is over.
    async fn verification_pass(
        &self,
        pass: Pass,
        id: Uuid,
        text: &str,
        report: &mut ScreeningReport,
        usage: &mut UsageContext,
        sizes: &mut dyn SizeSource,
    ) -> std::result::Result<bool, StageFailure> {
        let stage = Stage::verify(pass);
        let outcome = match verify(self.oracle.as_ref(), self.prompts.pass(pass), pass, text, usage, sizes).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                let error = report.record_failed_pass(pass, failure);
                return Err(StageFailure { stage, error });
            }
        };
        report.record_pass(pass, &outcome);

        match outcome.result {
            Decision::Flag => {
                warn!("{} flagged submission {}", pass, id);
                self.advance(id, pass.flagged_state(), report).await?;
                report.conclude(Outcome::flagged(pass));
                Ok(true)
            }
            Decision::Valid => Ok(false),
            Decision::Unrecognized(raw) => Err(StageFailure {
                stage,
                error: ScreenError::OracleContract(format!(
                    "{} aggregator answered '{}', expected {} or {}",
                    pass,
                    raw,
                    pass.flag_label(),
                    pass.valid_label()
                )),
            }),
        }
    }

    async fn advance(
        &self,
        id: Uuid,
        state: SubmissionState,
        report: &mut ScreeningReport,
    ) -> std::result::Result<(), StageFailure> {
        self.store.transition(id, state).await.map_err(at(Stage::Storage))?;
        report.final_state = Some(state);
        Ok(())
    }
}

/// Render a report the way the CLI prints it.
pub fn report_json(report: &ScreeningReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
