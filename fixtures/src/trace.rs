// fixtures/src/trace.rs
//! Structured record of every fixture operation: its name, parameters and outcome.
//! Tests can capture records with [`MemorySink`] and assert on them; the default
//! [`LogSink`] forwards them to `tracing`.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub operation: &'static str,
    pub params: Value,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Ok(Value),
    Err(String),
}

impl TraceRecord {
    pub fn new<T: Serialize>(operation: &'static str, params: Value, result: &Result<T>) -> Self {
        let outcome = match result {
            Ok(value) => Outcome::Ok(serde_json::to_value(value).unwrap_or_default()),
            Err(e) => Outcome::Err(e.to_string()),
        };
        Self {
            operation,
            params,
            outcome,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok(_))
    }
}

pub trait TraceSink: Send + Sync {
    fn record(&self, record: TraceRecord);
}

/// Emits each record as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&self, record: TraceRecord) {
        match &record.outcome {
            Outcome::Ok(result) => info!(
                operation = record.operation,
                params = %record.params,
                result = %result,
                "fixture operation completed"
            ),
            Outcome::Err(error) => warn!(
                operation = record.operation,
                params = %record.params,
                error = %error,
                "fixture operation failed"
            ),
        }
    }
}

/// Keeps records in memory for assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.operation).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl TraceSink for MemorySink {
    fn record(&self, record: TraceRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
