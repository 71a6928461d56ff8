//! Fan-in of per-item outcomes for batch operations.
//!
//! A batch issues one engine request per item. Each request settles on its
//! own; the [`BatchAccumulator`] counts the outcomes and releases a single
//! [`BatchReport`] once every expected item has settled.

use serde::Serialize;
use serde_json::Value;

/// Why a batch item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The lookup ran but matched nothing.
    NotFound,
    /// The engine reported an error.
    TransactionFailed,
}

impl FailureReason {
    pub fn info(self) -> &'static str {
        match self {
            FailureReason::NotFound => "no data found",
            FailureReason::TransactionFailed => "transaction failed",
        }
    }
}

/// Failure payload for one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub reason: FailureReason,
    pub info: &'static str,
    /// The input that failed, when it is meaningful to the caller.
    pub item: Option<Value>,
    /// Engine error text for [`FailureReason::TransactionFailed`].
    pub error: Option<String>,
}

impl Failure {
    pub fn not_found(item: Value) -> Self {
        Self {
            reason: FailureReason::NotFound,
            info: FailureReason::NotFound.info(),
            item: Some(item),
            error: None,
        }
    }

    pub fn transaction(item: Option<Value>, error: &anyhow::Error) -> Self {
        Self {
            reason: FailureReason::TransactionFailed,
            info: FailureReason::TransactionFailed.info(),
            item,
            error: Some(format!("{error:#}")),
        }
    }
}

/// Aggregate result handed to a batch's completion callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub successfully: usize,
    pub successfully_info: Vec<Value>,
    pub failed: usize,
    pub failed_info: Vec<Failure>,
    pub count: usize,
    pub prompt: &'static str,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.successfully + self.failed == self.count
    }
}

/// Per-call accumulator. Yields its report exactly once, when complete.
#[derive(Debug)]
pub struct BatchAccumulator {
    report: BatchReport,
}

impl BatchAccumulator {
    pub fn new(count: usize, prompt: &'static str) -> Self {
        Self {
            report: BatchReport {
                successfully: 0,
                successfully_info: Vec::new(),
                failed: 0,
                failed_info: Vec::new(),
                count,
                prompt,
            },
        }
    }

    pub fn record(&mut self, outcome: Result<Value, Failure>) {
        if self.is_complete() {
            tracing::warn!(
                prompt = self.report.prompt,
                count = self.report.count,
                "outcome recorded after batch completed; ignoring"
            );
            return;
        }
        match outcome {
            Ok(payload) => {
                self.report.successfully += 1;
                self.report.successfully_info.push(payload);
            }
            Err(failure) => {
                self.report.failed += 1;
                self.report.failed_info.push(failure);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.report.is_complete()
    }

    /// The report, if every expected outcome has been recorded.
    pub fn finish(self) -> Option<BatchReport> {
        if self.is_complete() {
            Some(self.report)
        } else {
            None
        }
    }
}
