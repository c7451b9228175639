//! Audit logger implementation

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use super::models::AuditLogEntry;
use super::query::{AuditQuery, Pagination, QueryFilter};

/// Bounded in-memory audit trail of gate decisions.
///
/// Once `capacity` is reached the oldest entries are dropped.
#[derive(Clone)]
pub struct AuditLogger {
    entries: Arc<RwLock<VecDeque<AuditLogEntry>>>,
    capacity: usize,
}

impl AuditLogger {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, entry: AuditLogEntry) {
        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn query(&self, filter: &QueryFilter, pagination: &Pagination) -> AuditQuery {
        let entries = self.entries.read();
        AuditQuery::execute(entries.iter(), filter, pagination)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::models::AuditOutcome;

    fn entry(module: &str, outcome: AuditOutcome) -> AuditLogEntry {
        AuditLogEntry::new(None, module, "read", None, outcome)
    }

    #[test]
    fn test_audit_logger_creation() {
        let logger = AuditLogger::new();
        assert!(logger.is_empty());
        assert_eq!(logger.len(), 0);
    }

    #[test]
    fn test_record_keeps_order() {
        let logger = AuditLogger::new();
        logger.record(entry("caisse", AuditOutcome::Allowed));
        logger.record(entry("bilan", AuditOutcome::Denied));

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].module, "caisse");
        assert_eq!(entries[1].outcome, AuditOutcome::Denied);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let logger = AuditLogger::with_capacity(2);
        logger.record(entry("caisse", AuditOutcome::Allowed));
        logger.record(entry("bilan", AuditOutcome::Allowed));
        logger.record(entry("pharmacie", AuditOutcome::Allowed));

        let modules: Vec<String> = logger.entries().into_iter().map(|e| e.module).collect();
        assert_eq!(modules, vec!["bilan", "pharmacie"]);
    }

    #[test]
    fn test_clear_entries() {
        let logger = AuditLogger::new();
        logger.record(entry("caisse", AuditOutcome::Allowed));
        logger.clear();
        assert!(logger.is_empty());
    }

    #[test]
    fn test_clone_shares_entries() {
        let logger1 = AuditLogger::new();
        let logger2 = logger1.clone();
        logger2.record(entry("caisse", AuditOutcome::Allowed));
        assert_eq!(logger1.len(), 1);
    }

    #[test]
    fn test_query_through_logger() {
        let logger = AuditLogger::new();
        logger.record(entry("caisse", AuditOutcome::Allowed));
        logger.record(entry("bilan", AuditOutcome::Denied));

        let result = logger.query(
            &QueryFilter::new().with_outcome(AuditOutcome::Denied),
            &Pagination::first_page(10),
        );
        assert_eq!(result.total, 1);
        assert_eq!(result.entries[0].module, "bilan");
    }
}
