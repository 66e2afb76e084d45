//! Message catalog: the ordinal-addressed message list the API works with.
//!
//! Every call rescans the modem store, links and decodes from scratch. There
//! is no cache, so an ordinal is only meaningful against the listing computed
//! in the same call. Each operation holds the modem gate for its whole span,
//! which keeps a scan and the deletes based on it atomic with respect to
//! other callers.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{GateError, Result};
use crate::gate::ModemGate;
use crate::link;
use crate::model::message::{LogicalMessage, SmsRecord};
use crate::model::segment::Segment;
use crate::store::reader::SegmentStore;

/// Outcome of deleting every part of one logical message.
///
/// Parts are deleted independently; a failure does not stop the remaining
/// deletes and nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<u32>,
    pub failed: Vec<FailedDelete>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelete {
    pub location: u32,
    pub error: String,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordinal-addressed view over the modem's inbox folder.
pub struct MessageCatalog {
    gate: Arc<ModemGate>,
    folder: u32,
}

impl MessageCatalog {
    pub fn new(gate: Arc<ModemGate>, folder: u32) -> Self {
        Self { gate, folder }
    }

    /// Every logical message, in storage order of its first part.
    pub fn list(&self) -> Result<Vec<LogicalMessage>> {
        let mut guard = self.gate.acquire()?;
        let mut store = SegmentStore::new(&mut **guard, self.folder);
        scan(&mut store)
    }

    pub fn get(&self, ordinal: usize) -> Result<LogicalMessage> {
        let mut messages = self.list()?;
        if ordinal >= messages.len() {
            return Err(not_found(ordinal));
        }
        Ok(messages.swap_remove(ordinal))
    }

    /// Delete every segment of the message at `ordinal`.
    pub fn delete_at(&self, ordinal: usize) -> Result<DeleteReport> {
        let mut guard = self.gate.acquire()?;
        let mut store = SegmentStore::new(&mut **guard, self.folder);
        let messages = scan(&mut store)?;
        let message = messages.get(ordinal).ok_or_else(|| not_found(ordinal))?;
        let report = delete_locations(&mut store, &message.locations);
        info!(
            ordinal,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Deleted message"
        );
        Ok(report)
    }

    /// Remove and return the first message, or the empty placeholder when the
    /// store holds none.
    pub fn pop_oldest(&self) -> Result<SmsRecord> {
        let mut guard = self.gate.acquire()?;
        let mut store = SegmentStore::new(&mut **guard, self.folder);
        let messages = scan(&mut store)?;
        let Some(oldest) = messages.first() else {
            debug!("No message to pop");
            return Ok(SmsRecord::empty());
        };
        let report = delete_locations(&mut store, &oldest.locations);
        if !report.is_complete() {
            warn!(failed = ?report.failed, "Popped message was only partially deleted");
        }
        Ok(SmsRecord::from(oldest))
    }
}

fn scan(store: &mut SegmentStore<'_>) -> Result<Vec<LogicalMessage>> {
    let segments = store.fetch_all()?;
    Ok(link::link_all(segments)
        .into_iter()
        .filter_map(|group| to_logical(&group))
        .collect())
}

fn to_logical(group: &[Segment]) -> Option<LogicalMessage> {
    let first = group.first()?;
    Some(LogicalMessage {
        date: first.date_time,
        number: first.number.clone(),
        state: first.state.clone(),
        locations: group.iter().map(|s| s.location).collect(),
        text: codec::decode(group),
    })
}

fn delete_locations(store: &mut SegmentStore<'_>, locations: &[u32]) -> DeleteReport {
    let mut report = DeleteReport::default();
    for &location in locations {
        match store.delete(location) {
            Ok(()) => report.deleted.push(location),
            Err(e) => {
                warn!(location, error = %e, "Failed to delete segment");
                report.failed.push(FailedDelete {
                    location,
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

fn not_found(ordinal: usize) -> GateError {
    GateError::NotFound(format!("Sms with id '{ordinal}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::simulated::{SimulatedModem, SimulatorHandle, INBOX_FOLDER};
    use chrono::{TimeZone, Utc};

    fn catalog() -> (MessageCatalog, SimulatorHandle) {
        let modem = SimulatedModem::new();
        let handle = modem.handle();
        let gate = Arc::new(ModemGate::new(modem));
        (MessageCatalog::new(gate, INBOX_FOLDER), handle)
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_list_links_and_decodes() {
        let (catalog, h) = catalog();
        h.receive_text("+1", "first", at(8)).unwrap();
        let long = "0123456789".repeat(20);
        h.receive_text("+2", &long, at(9)).unwrap();
        h.receive_raw("Operator", "balance low", at(10));

        let messages = catalog.list().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, long);
        assert_eq!(messages[1].locations.len(), 2);
        assert_eq!(messages[2].text, "balance low");
        assert_eq!(messages[2].number, "Operator");
    }

    #[test]
    fn test_get_out_of_range() {
        let (catalog, h) = catalog();
        h.receive_text("+1", "only", at(8)).unwrap();
        assert_eq!(catalog.get(0).unwrap().text, "only");
        assert!(matches!(catalog.get(1), Err(GateError::NotFound(_))));
    }

    #[test]
    fn test_delete_at_removes_all_parts() {
        let (catalog, h) = catalog();
        h.receive_text("+1", "keep me", at(8)).unwrap();
        let parts = h.receive_text("+2", &"x".repeat(400), at(9)).unwrap();
        assert_eq!(parts.len(), 3);

        let report = catalog.delete_at(1).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.deleted, parts);

        let remaining = catalog.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "keep me");
    }

    #[test]
    fn test_delete_partial_failure_is_reported() {
        let (catalog, h) = catalog();
        let parts = h.receive_text("+2", &"y".repeat(200), at(9)).unwrap();
        h.fail_delete_of(parts[1]);

        let report = catalog.delete_at(0).unwrap();
        assert_eq!(report.deleted, vec![parts[0]]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].location, parts[1]);
        assert_eq!(h.locations(), vec![parts[1]]);
    }

    #[test]
    fn test_delete_out_of_range() {
        let (catalog, h) = catalog();
        h.receive_text("+1", "a", at(8)).unwrap();
        assert!(matches!(catalog.delete_at(5), Err(GateError::NotFound(_))));
        assert_eq!(h.locations().len(), 1);
    }

    #[test]
    fn test_pop_oldest() {
        let (catalog, h) = catalog();
        h.receive_text("+1", "older", at(8)).unwrap();
        h.receive_text("+2", "newer", at(9)).unwrap();

        let popped = catalog.pop_oldest().unwrap();
        assert_eq!(popped.text, "older");
        assert_eq!(popped.number, "+1");
        assert_eq!(popped.date, "2024-02-10 08:00:00");

        let remaining = catalog.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "newer");
    }

    #[test]
    fn test_pop_oldest_empty_store() {
        let (catalog, _h) = catalog();
        assert_eq!(catalog.pop_oldest().unwrap(), SmsRecord::empty());
    }

    #[test]
    fn test_store_unavailable_propagates() {
        let (catalog, h) = catalog();
        h.set_initialized(false);
        assert!(matches!(
            catalog.list(),
            Err(GateError::StoreUnavailable(_))
        ));
    }
}
