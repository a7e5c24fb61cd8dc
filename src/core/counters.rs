//! Raw counter acquisition: classify interfaces by name and sum their bytes.

use serde::Serialize;

use crate::config::{DEFAULT_CELLULAR_PREFIXES, DEFAULT_WIFI_PREFIXES};
use crate::core::interfaces::{AddressFamily, InterfaceRecord, InterfaceSource};
use crate::error::MonitorError;

/// Cumulative bytes for one link class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RawCounterBucket {
    pub sent: u64,
    pub received: u64,
}

impl RawCounterBucket {
    fn add(&mut self, sent: u64, received: u64) {
        self.sent = self.sent.saturating_add(sent);
        self.received = self.received.saturating_add(received);
    }
}

/// One raw sample: a bucket per link class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RawCounters {
    pub wifi: RawCounterBucket,
    pub cellular: RawCounterBucket,
}

/// Link class of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkClass {
    Wifi,
    Cellular,
}

/// Maps interface names to link classes by prefix. Wifi prefixes win ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClassifier {
    pub wifi_prefixes: Vec<String>,
    pub cellular_prefixes: Vec<String>,
}

impl Default for LinkClassifier {
    fn default() -> Self {
        Self {
            wifi_prefixes: DEFAULT_WIFI_PREFIXES.iter().map(|p| p.to_string()).collect(),
            cellular_prefixes: DEFAULT_CELLULAR_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl LinkClassifier {
    pub fn classify(&self, name: &str) -> Option<LinkClass> {
        if self.wifi_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            Some(LinkClass::Wifi)
        } else if self.cellular_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            Some(LinkClass::Cellular)
        } else {
            None
        }
    }
}

/// Sum already-enumerated records into wifi / cellular buckets.
///
/// Only link-layer entries count; an interface listed more than once
/// accumulates.
pub fn sum_records<'a, I>(records: I, classifier: &LinkClassifier) -> RawCounters
where
    I: IntoIterator<Item = &'a InterfaceRecord>,
{
    let mut counters = RawCounters::default();
    for record in records {
        if record.family != AddressFamily::Link {
            continue;
        }
        let bucket = match classifier.classify(&record.name) {
            Some(LinkClass::Wifi) => &mut counters.wifi,
            Some(LinkClass::Cellular) => &mut counters.cellular,
            None => continue,
        };
        bucket.add(record.sent_bytes, record.received_bytes);
    }
    counters
}

/// Take one raw sample from `source`.
///
/// An enumeration failure degrades to a zero sample so the caller's tick keeps
/// running; it shows up as a one-tick dip in the rates.
pub fn sample_raw_counters(source: &dyn InterfaceSource, classifier: &LinkClassifier) -> RawCounters {
    match source.interfaces() {
        Ok(records) => sum_records(&records, classifier),
        Err(e) => {
            let err = MonitorError::from(e);
            tracing::warn!("{err}; reporting a zero sample");
            RawCounters::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Fixed(Vec<InterfaceRecord>);

    impl InterfaceSource for Fixed {
        fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl InterfaceSource for Failing {
        fn interfaces(&self) -> io::Result<Vec<InterfaceRecord>> {
            Err(io::Error::new(io::ErrorKind::Other, "getifaddrs failed"))
        }
    }

    fn apple() -> LinkClassifier {
        LinkClassifier {
            wifi_prefixes: vec!["en".into()],
            cellular_prefixes: vec!["pdp_ip".into()],
        }
    }

    fn inet(name: &str) -> InterfaceRecord {
        InterfaceRecord {
            name: name.into(),
            family: AddressFamily::Inet,
            sent_bytes: 999,
            received_bytes: 999,
        }
    }

    #[test]
    fn test_classify_by_prefix() {
        let c = apple();
        assert_eq!(c.classify("en0"), Some(LinkClass::Wifi));
        assert_eq!(c.classify("pdp_ip1"), Some(LinkClass::Cellular));
        assert_eq!(c.classify("lo0"), None);
        assert_eq!(c.classify("utun3"), None);
    }

    #[test]
    fn test_sample_sums_each_bucket() {
        let source = Fixed(vec![
            InterfaceRecord::link("en0", 100, 200),
            InterfaceRecord::link("en1", 10, 20),
            InterfaceRecord::link("pdp_ip0", 5, 7),
            InterfaceRecord::link("lo0", 1_000, 1_000),
        ]);
        let counters = sample_raw_counters(&source, &apple());
        assert_eq!(counters.wifi, RawCounterBucket { sent: 110, received: 220 });
        assert_eq!(counters.cellular, RawCounterBucket { sent: 5, received: 7 });
    }

    #[test]
    fn test_non_link_entries_are_skipped() {
        let source = Fixed(vec![inet("en0"), InterfaceRecord::link("en0", 1, 2)]);
        let counters = sample_raw_counters(&source, &apple());
        assert_eq!(counters.wifi, RawCounterBucket { sent: 1, received: 2 });
    }

    #[test]
    fn test_duplicate_link_entries_accumulate() {
        let source = Fixed(vec![
            InterfaceRecord::link("pdp_ip0", 3, 4),
            InterfaceRecord::link("pdp_ip0", 3, 4),
        ]);
        let counters = sample_raw_counters(&source, &apple());
        assert_eq!(counters.cellular, RawCounterBucket { sent: 6, received: 8 });
    }

    #[test]
    fn test_enumeration_failure_yields_zero_sample() {
        assert_eq!(sample_raw_counters(&Failing, &apple()), RawCounters::default());
    }

    #[test]
    fn test_sums_saturate() {
        let records = vec![
            InterfaceRecord::link("en0", u64::MAX, 0),
            InterfaceRecord::link("en1", 1, 0),
        ];
        assert_eq!(sum_records(&records, &apple()).wifi.sent, u64::MAX);
    }
}
