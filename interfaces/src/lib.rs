pub mod defs;
pub mod state;

pub use defs::{ChunkVerdict, Decision, Finding, JudgeTag, Pass, Tag, VerificationOutcome};
pub use state::SubmissionState;
