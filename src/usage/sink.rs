//! Usage log persistence seam.

use super::UsageLogPayload;
use crate::error::ErrorContext;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Destination for finished usage records. Owned outside this crate.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn save(&self, payload: UsageLogPayload) -> Result<()>;

    async fn save_batch(&self, payloads: Vec<UsageLogPayload>) -> Result<()> {
        for p in payloads {
            self.save(p).await?;
        }
        Ok(())
    }
}

/// Discards every record.
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn save(&self, _: UsageLogPayload) -> Result<()> {
        Ok(())
    }
}

pub fn noop_usage_sink() -> Arc<dyn UsageSink> {
    Arc::new(NoopUsageSink)
}

/// Bounded in-memory sink; the oldest record is evicted first.
pub struct InMemoryUsageSink {
    records: RwLock<VecDeque<UsageLogPayload>>,
    max_records: usize,
}

impl InMemoryUsageSink {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn records(&self) -> Vec<UsageLogPayload> {
        match self.records.read() {
            Ok(r) => r.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn records_for_model(&self, model_id: &str) -> Vec<UsageLogPayload> {
        self.records()
            .into_iter()
            .filter(|r| r.model_id == model_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageSink for InMemoryUsageSink {
    async fn save(&self, payload: UsageLogPayload) -> Result<()> {
        let mut records = self.records.write().map_err(|_| {
            Error::sink_with_context(
                "usage sink lock poisoned",
                ErrorContext::new().with_source("in_memory"),
            )
        })?;
        records.push_back(payload);
        while records.len() > self.max_records {
            records.pop_front();
        }
        Ok(())
    }
}
