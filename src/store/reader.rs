//! Segment store: sequential reads and deletes over one driver folder.

use tracing::{debug, warn};

use crate::driver::ModemDriver;
use crate::error::Result;
use crate::model::segment::Segment;

/// Query surface over the driver's storage for a single folder.
///
/// Borrows the driver from a held gate guard, so a whole scan runs under one
/// acquisition.
pub struct SegmentStore<'a> {
    driver: &'a mut dyn ModemDriver,
    folder: u32,
}

impl<'a> SegmentStore<'a> {
    pub fn new(driver: &'a mut dyn ModemDriver, folder: u32) -> Self {
        Self { driver, folder }
    }

    /// Occupied slots across SIM, phone and template storage.
    pub fn count(&mut self) -> Result<usize> {
        Ok(self.driver.sms_status()?.total())
    }

    pub fn first_segment(&mut self) -> Result<Segment> {
        self.driver.first_segment(self.folder)
    }

    pub fn next_segment(&mut self, after: u32) -> Result<Segment> {
        self.driver.next_segment(self.folder, after)
    }

    /// Fetch every stored segment in cursor order.
    ///
    /// Stops once the number fetched reaches [`count`](Self::count). Driver
    /// errors mid-scan are propagated unchanged.
    pub fn fetch_all(&mut self) -> Result<Vec<Segment>> {
        let total = self.count()?;
        let mut segments: Vec<Segment> = Vec::with_capacity(total);

        while segments.len() < total {
            let segment = match segments.last() {
                None => self.first_segment()?,
                Some(last) => self.next_segment(last.location)?,
            };
            if segments.iter().any(|s| s.location == segment.location) {
                warn!(
                    location = segment.location,
                    "Driver returned a location twice; stopping scan"
                );
                break;
            }
            segments.push(segment);
        }

        debug!(folder = self.folder, count = segments.len(), "Fetched segments");
        Ok(segments)
    }

    pub fn delete(&mut self, location: u32) -> Result<()> {
        debug!(folder = self.folder, location, "Deleting segment");
        self.driver.delete(self.folder, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::simulated::{SimulatedModem, INBOX_FOLDER};
    use crate::error::GateError;
    use chrono::Utc;

    #[test]
    fn test_fetch_all_empty_store() {
        let mut modem = SimulatedModem::new();
        let mut store = SegmentStore::new(&mut modem, INBOX_FOLDER);
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_all_returns_count_segments() {
        let mut modem = SimulatedModem::new();
        let h = modem.handle();
        h.receive_raw("+1", "one", Utc::now());
        h.receive_text("+2", &"long ".repeat(50), Utc::now()).unwrap();
        h.receive_raw("+3", "three", Utc::now());

        let mut store = SegmentStore::new(&mut modem, INBOX_FOLDER);
        let total = store.count().unwrap();
        let segments = store.fetch_all().unwrap();
        assert_eq!(segments.len(), total);
        let locs: Vec<u32> = segments.iter().map(|s| s.location).collect();
        assert_eq!(locs, h.locations());
    }

    #[test]
    fn test_fetch_all_unavailable() {
        let mut modem = SimulatedModem::new();
        modem.handle().set_initialized(false);
        let mut store = SegmentStore::new(&mut modem, INBOX_FOLDER);
        assert!(matches!(
            store.fetch_all(),
            Err(GateError::StoreUnavailable(_))
        ));
    }
}
