//! Time-zone lookup and lenient local-time resolution.

use std::collections::BTreeSet;
use std::sync::{Mutex, OnceLock};

use chrono::{Duration, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

/// Source of IANA zone definitions.
///
/// Implementations must never fail hard: an unknown name is reported as `None` and callers fall
/// back to UTC.
pub trait ZoneDatabase: Send + Sync {
    fn zone_or_none(&self, name: &str) -> Option<Tz>;
}

/// Zone database backed by the tables compiled into `chrono-tz`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TzDatabase;

impl ZoneDatabase for TzDatabase {
    fn zone_or_none(&self, name: &str) -> Option<Tz> {
        name.trim().parse::<Tz>().ok()
    }
}

/// Look up `name`, falling back to UTC when the database does not know it.
pub fn resolve_zone(zones: &dyn ZoneDatabase, name: &str) -> Tz {
    match zones.zone_or_none(name) {
        Some(tz) => tz,
        None => {
            warn_unknown_zone(name);
            Tz::UTC
        }
    }
}

fn warn_unknown_zone(name: &str) {
    static WARNED: OnceLock<Mutex<BTreeSet<String>>> = OnceLock::new();

    let warned = WARNED.get_or_init(|| Mutex::new(BTreeSet::new()));
    let mut warned = match warned.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if warned.insert(name.to_string()) {
        log::warn!("unknown time zone {name:?}; using UTC");
    } else {
        log::debug!("unknown time zone {name:?}; using UTC");
    }
}

/// Interpret a zone-naive local time in `tz` without failing.
///
/// - Unambiguous local times map to their single instant.
/// - Ambiguous local times (clocks turned back) pick the earlier instant.
/// - Skipped local times (clocks turned forward) are shifted forward by the length of the gap,
///   i.e. they are read with the offset in effect just before the transition.
pub fn resolve_local(tz: &Tz, local: &NaiveDateTime) -> chrono::DateTime<Tz> {
    if let Some(instant) = tz.from_local_datetime(local).earliest() {
        return instant;
    }

    // Offset a day earlier is the one in effect before the gap; zones never transition twice
    // within a day.
    let probe = local.checked_sub_signed(Duration::days(1)).unwrap_or(*local);
    let before = tz.offset_from_utc_datetime(&probe).fix().local_minus_utc();
    let utc = local
        .checked_sub_signed(Duration::seconds(i64::from(before)))
        .unwrap_or(*local);
    tz.from_utc_datetime(&utc)
}
