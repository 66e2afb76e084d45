//! Property tests across the linker, codec and catalog.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::catalog::MessageCatalog;
use crate::codec;
use crate::driver::simulated::{SimulatedModem, INBOX_FOLDER};
use crate::gate::ModemGate;
use crate::link;
use crate::model::segment::Segment;

/// Text drawn from the GSM default alphabet, extension characters included.
fn gsm_text(max: usize) -> impl Strategy<Value = String> {
    let pattern = format!(
        "[A-Za-z0-9 @£$¥èéùìòÇØøÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ!\"#¤%&'()*+,./:;<=>?¡ÄÖÑÜ§¿äöñüà{{}}~|€^-]{{0,{max}}}"
    );
    proptest::string::string_regex(&pattern).expect("valid regex")
}

fn stored(text: &str, is_unicode: bool) -> Vec<Segment> {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    codec::encode(text, is_unicode)
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, part)| part.into_stored(i as u32 + 1, INBOX_FOLDER, "+100", at))
        .collect()
}

proptest! {
    #[test]
    fn gsm_text_roundtrips(text in gsm_text(700)) {
        let segments = stored(&text, false);
        prop_assert_eq!(codec::decode(&segments), text);
    }

    #[test]
    fn unicode_text_roundtrips(text in "\\PC{0,300}") {
        let segments = stored(&text, true);
        prop_assert_eq!(codec::decode(&segments), text);
    }

    #[test]
    fn linking_ignores_fetch_order(
        text in gsm_text(800),
        keys in proptest::collection::vec(any::<u32>(), 6),
    ) {
        let mut segments = stored(&text, false);
        let mut order: Vec<(u32, Segment)> = segments
            .drain(..)
            .enumerate()
            .map(|(i, s)| (keys[i % keys.len()], s))
            .collect();
        order.sort_by_key(|(k, _)| *k);
        let shuffled: Vec<Segment> = order.into_iter().map(|(_, s)| s).collect();

        let groups = link::link_all(shuffled);
        prop_assert_eq!(groups.len(), 1);
        let parts: Vec<u8> = groups[0].iter().filter_map(|s| s.link.map(|l| l.part)).collect();
        let mut sorted = parts.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&parts, &sorted);
        prop_assert_eq!(codec::decode(&groups[0]), text);
    }

    #[test]
    fn listing_reduces_store_by_linking(
        lengths in proptest::collection::vec(0usize..400, 0..6),
        delete in any::<prop::sample::Index>(),
    ) {
        let modem = SimulatedModem::new();
        let h = modem.handle();
        let catalog = MessageCatalog::new(Arc::new(ModemGate::new(modem)), INBOX_FOLDER);
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, len) in lengths.iter().enumerate() {
            h.receive_text(&format!("+{i}"), &"m".repeat(*len), at).unwrap();
        }

        let messages = catalog.list().unwrap();
        prop_assert_eq!(messages.len(), lengths.len());
        let total: usize = messages.iter().map(|m| m.locations.len()).sum();
        prop_assert_eq!(total, h.locations().len());

        if !messages.is_empty() {
            let k = delete.index(messages.len());
            let gone = messages[k].locations.clone();
            catalog.delete_at(k).unwrap();
            let after = catalog.list().unwrap();
            prop_assert_eq!(after.len(), messages.len() - 1);
            for msg in &after {
                prop_assert!(msg.locations.iter().all(|l| !gone.contains(l)));
            }
        }
    }
}
