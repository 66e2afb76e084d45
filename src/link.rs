//! Segment linking: reassembles concatenated messages.
//!
//! Segments of one multi-part message share a reference number and announce
//! their part index and the total part count. Linking groups them and orders
//! each group by part index. Nothing is ever dropped: incomplete groups,
//! duplicate parts and references reused with a different total all come out
//! as groups of their own so no received text is lost.

use std::collections::HashMap;

use crate::model::segment::Segment;

/// Segments sharing this key belong to the same logical message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LinkKey {
    number: String,
    reference: u16,
    total: u8,
}

/// Group segments into logical messages.
///
/// Groups are returned in the order their first segment appears in
/// `segments` (storage order). Within a group, segments are sorted by part
/// index; the sort is stable, so duplicates keep their storage order.
pub fn link_all(segments: Vec<Segment>) -> Vec<Vec<Segment>> {
    let mut groups: Vec<Vec<Segment>> = Vec::new();
    let mut by_key: HashMap<LinkKey, usize> = HashMap::new();

    for segment in segments {
        let Some(link) = segment.link else {
            groups.push(vec![segment]);
            continue;
        };

        let key = LinkKey {
            number: normalize_number(&segment.number),
            reference: link.reference,
            total: link.total,
        };
        match by_key.get(&key) {
            Some(&idx) => groups[idx].push(segment),
            None => {
                by_key.insert(key, groups.len());
                groups.push(vec![segment]);
            }
        }
    }

    for group in &mut groups {
        group.sort_by_key(|s| s.link.map(|l| l.part).unwrap_or(0));
    }

    groups
}

/// Normalize a sender number for matching: strip spaces and dashes.
fn normalize_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
