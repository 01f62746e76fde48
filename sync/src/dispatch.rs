//! The on-change vs. staleness dispatch policy that decides, after a
//! mutating service operation, whether a root's lineage should be synced
//! right now (spec §4.6 "Dispatch policy" / §4.8).

use chrono::{DateTime, Utc};
use dex_core::config::AutoSyncConfig;
use dex_core::duration::parse_config_duration;

/// Decides whether to sync now, given the configured policy and the last
/// successful sync time for this store (`None` if it has never synced).
pub fn should_sync(config: &AutoSyncConfig, last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if config.on_change {
        return true;
    }
    let Some(max_age) = config.max_age.as_deref().and_then(parse_config_duration) else {
        return false;
    };
    match last_sync {
        None => true,
        Some(last) => now - last > max_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(on_change: bool, max_age: Option<&str>) -> AutoSyncConfig {
        AutoSyncConfig {
            on_change,
            max_age: max_age.map(str::to_string),
        }
    }

    #[test]
    fn on_change_always_syncs() {
        let now = Utc::now();
        assert!(should_sync(&config(true, None), Some(now), now));
    }

    #[test]
    fn stale_sync_is_triggered_past_max_age() {
        let now = Utc::now();
        let last = now - Duration::hours(2);
        assert!(should_sync(&config(false, Some("1h")), Some(last), now));
    }

    #[test]
    fn fresh_sync_is_skipped_within_max_age() {
        let now = Utc::now();
        let last = now - Duration::minutes(10);
        assert!(!should_sync(&config(false, Some("1h")), Some(last), now));
    }

    #[test]
    fn never_synced_before_always_syncs_under_max_age_policy() {
        let now = Utc::now();
        assert!(should_sync(&config(false, Some("1h")), None, now));
    }

    #[test]
    fn no_max_age_and_on_change_disabled_never_auto_syncs() {
        let now = Utc::now();
        assert!(!should_sync(&config(false, None), Some(now), now));
    }
}
