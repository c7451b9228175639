//! Audit log querying and filtering

use chrono::{DateTime, Utc};

use super::models::{AuditLogEntry, AuditOutcome};
use crate::actor::ActorId;

/// Filter criteria for audit log queries
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub actor: Option<ActorId>,
    pub module: Option<String>,
    pub outcome: Option<AuditOutcome>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_end_date(mut self, date: DateTime<Utc>) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Check if an entry matches this filter
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(ref actor) = self.actor {
            if entry.actor.as_ref() != Some(actor) {
                return false;
            }
        }

        if let Some(ref module) = self.module {
            if entry.module != *module {
                return false;
            }
        }

        if let Some(outcome) = self.outcome {
            if entry.outcome != outcome {
                return false;
            }
        }

        if let Some(start_date) = self.start_date {
            if entry.timestamp < start_date {
                return false;
            }
        }

        if let Some(end_date) = self.end_date {
            if entry.timestamp > end_date {
                return false;
            }
        }

        true
    }
}

/// Pagination parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results per page
    pub limit: usize,
    /// Number of results to skip
    pub offset: usize,
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn first_page(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }

    pub fn next_page(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(10, 0)
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Filtered and paginated entries
    pub entries: Vec<AuditLogEntry>,
    /// Total number of entries matching the filter
    pub total: usize,
    pub pagination: Pagination,
}

impl AuditQuery {
    /// Execute a query over entries, oldest first
    pub fn execute<'a, I>(entries: I, filter: &QueryFilter, pagination: &Pagination) -> Self
    where
        I: IntoIterator<Item = &'a AuditLogEntry>,
    {
        let mut total = 0;
        let mut page = Vec::new();

        for entry in entries.into_iter().filter(|e| filter.matches(e)) {
            if total >= pagination.offset && page.len() < pagination.limit {
                page.push(entry.clone());
            }
            total += 1;
        }

        Self {
            entries: page,
            total,
            pagination: pagination.clone(),
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.pagination.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.pagination.limit)
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.offset + self.pagination.limit < self.total
    }
}
