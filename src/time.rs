//! Time support for the rest of hawking.

use chrono::Utc;
use std::{cmp, thread, time};

/// The current time in nanoseconds since the epoch.
///
/// Every point derived from one snapshot shares a single stamp minted by
/// this function at collection, so a batch always describes one consistent
/// moment.
pub fn now_ns() -> i64 {
    Utc::now().timestamp_nanos()
}

/// Sleep as a function of failed attempts.
///
/// The sleep time grows exponentially in `attempts` until flattening out at
/// 500ms. A zero `attempts` does not sleep at all.
#[inline]
pub fn delay(attempts: u32) {
    if attempts > 0 && attempts < 9 {
        let delay = cmp::min(500, 2u32.pow(attempts));
        let sleep_time = time::Duration::from_millis(u64::from(delay));
        thread::sleep(sleep_time);
    } else if attempts >= 9 {
        let sleep_time = time::Duration::from_millis(500);
        thread::sleep(sleep_time);
    }
}
