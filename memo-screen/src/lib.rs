pub mod types;
pub mod chunker;
pub mod oracle;
pub mod openai;
pub mod prompts;
pub mod round;
pub mod verifier;
pub mod store;
pub mod pipeline;

pub use types::*;
pub use chunker::{chunk_range_for, chunk_text, word_count, ChunkRange, FixedSizes, RandomSizes, SizeSource};
pub use oracle::{MockOracle, Oracle, OracleReply, TokenUsage, UsageContext};
pub use openai::OpenAiOracle;
pub use prompts::{PassPrompts, PromptSet};
pub use round::{run_round, RoundResult};
pub use verifier::{round_count_for, verify, PassFailure};
pub use store::{MemoryStore, PgSubmissionStore, SubmissionStore};
pub use pipeline::{report_json, Outcome, ScreeningPipeline, ScreeningReport, Stage};
