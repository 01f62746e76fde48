//! Duration string parsing for config values and bulk-archival flags.
//!
//! Two related grammars are in play (per spec §6): the general config
//! duration `^\d+(s|m|h|d|w|mo)$` used for `sync.github.auto.max_age`, and
//! the archive-specific `Nd|Nw|Nm` form used by `--older-than`, where `m`
//! means 30-day months directly (no minute unit in that context).

use chrono::Duration as ChronoDuration;

/// Parses a config-style duration: `30s`, `5m`, `1h`, `1d`, `2w`, `3mo`.
/// `mo` is treated as a 30-day approximation.
pub fn parse_config_duration(s: &str) -> Option<ChronoDuration> {
    let s = s.trim();
    let unit_start = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(unit_start);
    let amount: i64 = digits.parse().ok()?;
    let seconds_per_unit = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        "mo" => 30 * 24 * 60 * 60,
        _ => return None,
    };
    Some(ChronoDuration::seconds(amount * seconds_per_unit))
}

/// Parses an archive-bulk duration: `90d`, `12w`, `3m`, where `m` means a
/// 30-day month (not minutes, unlike [`parse_config_duration`]).
pub fn parse_archive_duration(s: &str) -> Option<ChronoDuration> {
    let s = s.trim();
    let unit_start = s.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = s.split_at(unit_start);
    if unit.len() != 1 {
        return None;
    }
    let amount: i64 = digits.parse().ok()?;
    let days_per_unit = match unit {
        "d" => 1,
        "w" => 7,
        "m" => 30,
        _ => return None,
    };
    Some(ChronoDuration::days(amount * days_per_unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_duration_parses_every_unit() {
        assert_eq!(parse_config_duration("30s"), Some(ChronoDuration::seconds(30)));
        assert_eq!(parse_config_duration("5m"), Some(ChronoDuration::seconds(300)));
        assert_eq!(parse_config_duration("1h"), Some(ChronoDuration::hours(1)));
        assert_eq!(parse_config_duration("1d"), Some(ChronoDuration::days(1)));
        assert_eq!(parse_config_duration("2w"), Some(ChronoDuration::days(14)));
        assert_eq!(parse_config_duration("3mo"), Some(ChronoDuration::days(90)));
    }

    #[test]
    fn config_duration_rejects_garbage() {
        assert_eq!(parse_config_duration("abc"), None);
        assert_eq!(parse_config_duration("10x"), None);
        assert_eq!(parse_config_duration(""), None);
    }

    #[test]
    fn archive_duration_treats_m_as_thirty_days() {
        assert_eq!(parse_archive_duration("90d"), Some(ChronoDuration::days(90)));
        assert_eq!(parse_archive_duration("2w"), Some(ChronoDuration::days(14)));
        assert_eq!(parse_archive_duration("3m"), Some(ChronoDuration::days(90)));
    }

    #[test]
    fn archive_duration_rejects_mo_suffix() {
        // The archive grammar is single-letter units only.
        assert_eq!(parse_archive_duration("3mo"), None);
    }
}
