#![allow(dead_code)]

use async_trait::async_trait;
use memo_screen::oracle::{Aggregation, Classification, Description, Judgment};
use memo_screen::{Finding, JudgeTag, Oracle, OracleReply, Result, ScreenError, Tag, TokenUsage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

pub const CALL_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
};

/// Oracle with scripted answers and call counters.
pub struct ScriptedOracle {
    /// 1-based classify call that answers SUS.
    sus_on_call: Option<usize>,
    /// 1-based classify call that fails outright.
    fail_on_call: Option<usize>,
    blank_summary: bool,
    aggregate_results: Mutex<VecDeque<String>>,
    description: String,
    judge_tag: JudgeTag,
    refuse_describe: bool,
    fail_judge: bool,

    pub classify_calls: AtomicUsize,
    pub aggregate_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
    pub judge_calls: AtomicUsize,
    pub classified_chunks: Mutex<Vec<String>>,
    pub aggregate_inputs: Mutex<Vec<Vec<Finding>>>,
    pub describe_budgets: Mutex<Vec<u32>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            sus_on_call: None,
            fail_on_call: None,
            blank_summary: false,
            aggregate_results: Mutex::new(VecDeque::new()),
            description: "a neutral description".to_string(),
            judge_tag: JudgeTag::Bad,
            refuse_describe: false,
            fail_judge: false,
            classify_calls: AtomicUsize::new(0),
            aggregate_calls: AtomicUsize::new(0),
            describe_calls: AtomicUsize::new(0),
            judge_calls: AtomicUsize::new(0),
            classified_chunks: Mutex::new(Vec::new()),
            aggregate_inputs: Mutex::new(Vec::new()),
            describe_budgets: Mutex::new(Vec::new()),
        }
    }

    pub fn sus_on_call(mut self, call: usize) -> Self {
        self.sus_on_call = Some(call);
        self
    }

    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn with_blank_summary(mut self) -> Self {
        self.blank_summary = true;
        self
    }

    /// Aggregator answers, handed out in call order.
    pub fn aggregate_results(self, results: &[&str]) -> Self {
        *self.aggregate_results.lock().unwrap() = results.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn judge(mut self, tag: JudgeTag) -> Self {
        self.judge_tag = tag;
        self
    }

    pub fn refusing_describe(mut self) -> Self {
        self.refuse_describe = true;
        self
    }

    pub fn failing_judge(mut self) -> Self {
        self.fail_judge = true;
        self
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn aggregate_count(&self) -> usize {
        self.aggregate_calls.load(Ordering::SeqCst)
    }

    pub fn describe_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn judge_count(&self) -> usize {
        self.judge_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn oracle_name(&self) -> String {
        "scripted".to_string()
    }

    async fn classify(&self, _system_prompt: &str, chunk: &str) -> Result<OracleReply<Classification>> {
        let call = self.classify_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.classified_chunks.lock().unwrap().push(chunk.to_string());

        if self.fail_on_call == Some(call) {
            return Err(ScreenError::OracleContract("malformed chunk reply".to_string()));
        }

        let tag = if self.sus_on_call == Some(call) { Tag::Sus } else { Tag::Nan };
        let summary = if self.blank_summary { String::new() } else { format!("call {}", call) };
        Ok(OracleReply::new(
            Classification {
                tag,
                summary,
                context: format!("chunk '{}'", chunk),
            },
            CALL_USAGE,
        ))
    }

    async fn aggregate(&self, _system_prompt: &str, findings: &[Finding]) -> Result<OracleReply<Aggregation>> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        self.aggregate_inputs.lock().unwrap().push(findings.to_vec());

        let result = self
            .aggregate_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ScreenError::AggregatorContract("no result field".to_string()))?;
        Ok(OracleReply::new(Aggregation { result }, CALL_USAGE))
    }

    async fn describe(
        &self,
        _system_prompt: &str,
        _text: &str,
        max_output_tokens: u32,
    ) -> Result<OracleReply<Description>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.describe_budgets.lock().unwrap().push(max_output_tokens);

        if self.refuse_describe {
            return Err(ScreenError::OracleRefusal("I can't describe that.".to_string()));
        }
        Ok(OracleReply::new(
            Description {
                description: self.description.clone(),
            },
            CALL_USAGE,
        ))
    }

    async fn judge(&self, _system_prompt: &str, _text: &str) -> Result<OracleReply<Judgment>> {
        self.judge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_judge {
            return Err(ScreenError::OracleContract("judge reply missing tag".to_string()));
        }
        Ok(OracleReply::new(Judgment { tag: self.judge_tag }, CALL_USAGE))
    }
}

/// `count` distinct words: "w1 w2 w3 ...".
pub fn numbered_words(count: usize) -> String {
    (1..=count).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
}
