use serde::{Deserialize, Serialize};

/// Lifecycle of a stored submission.
///
/// `pending -> (flag1 | got_main1 -> (flag2 | good | bad))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionState {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "flag1")]
    Flag1,
    #[serde(rename = "got_main1")]
    GotMain1,
    #[serde(rename = "flag2")]
    Flag2,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "bad")]
    Bad,
}

impl SubmissionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionState::Pending => "pending",
            SubmissionState::Flag1 => "flag1",
            SubmissionState::GotMain1 => "got_main1",
            SubmissionState::Flag2 => "flag2",
            SubmissionState::Good => "good",
            SubmissionState::Bad => "bad",
        }
    }

    /// States a submission may be in right before entering `self`.
    pub fn predecessors(self) -> &'static [SubmissionState] {
        match self {
            SubmissionState::Pending => &[],
            SubmissionState::Flag1 | SubmissionState::GotMain1 => &[SubmissionState::Pending],
            SubmissionState::Flag2 | SubmissionState::Good | SubmissionState::Bad => {
                &[SubmissionState::GotMain1]
            }
        }
    }

    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        next.predecessors().contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmissionState::Flag1
                | SubmissionState::Flag2
                | SubmissionState::Good
                | SubmissionState::Bad
        )
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
