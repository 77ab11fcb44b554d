//! Name codec for stored patches and backups.
//!
//! A patch is stored as `{YYYYMMDD_HHMMSS}_{target}` and a backup as
//! `{target}.bak_{YYYYMMDD_HHMMSS}`, where `target` is the root-relative path
//! with every separator replaced by `_`. Decoding turns underscores back into
//! `/`, so a target that itself contains `_` cannot round-trip.

use chrono::{DateTime, TimeZone};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const BACKUP_MARKER: &str = ".bak_";

pub fn timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Replace every path separator with `_`.
pub fn sanitize_target(path: &str) -> String {
    path.replace(['/', '\\'], "_")
}

pub fn patch_name(ts: &str, target: &str) -> String {
    format!("{ts}_{}", sanitize_target(target))
}

/// Recover the `/`-separated target of a patch by dropping the date and time
/// tokens. `None` when the name has no target part.
pub fn target_from_patch_name(name: &str) -> Option<String> {
    let mut parts = name.splitn(3, '_');
    let _date = parts.next()?;
    let _time = parts.next()?;
    let rest = parts.next().filter(|r| !r.is_empty())?;
    Some(rest.replace('_', "/"))
}

pub fn backup_name(sanitized_target: &str, ts: &str) -> String {
    format!("{sanitized_target}{BACKUP_MARKER}{ts}")
}

/// Recover the `/`-separated target of a backup from the part before the first
/// `.bak_` marker.
pub fn target_from_backup_name(name: &str) -> Option<String> {
    let (head, _) = name.split_once(BACKUP_MARKER)?;
    if head.is_empty() {
        return None;
    }
    Some(head.replace('_', "/"))
}

/// Timestamp portion of a backup name (including any collision suffix).
pub fn backup_timestamp(name: &str) -> Option<&str> {
    name.split_once(BACKUP_MARKER).map(|(_, ts)| ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn timestamp_is_sortable_prefix() {
        let at = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        assert_eq!(timestamp(&at), "20240101_120000");
    }

    #[test]
    fn patch_name_reverses_to_target() {
        let name = patch_name("20240101_120000", "src/app/config.json");
        assert_eq!(name, "20240101_120000_src_app_config.json");
        assert_eq!(target_from_patch_name(&name).as_deref(), Some("src/app/config.json"));
    }

    #[test]
    fn windows_separators_are_sanitized() {
        assert_eq!(sanitize_target(r"a\b/c.txt"), "a_b_c.txt");
    }

    #[test]
    fn underscores_in_target_do_not_round_trip() {
        let name = patch_name("20240101_120000", "my_file.txt");
        assert_eq!(target_from_patch_name(&name).as_deref(), Some("my/file.txt"));
    }

    #[test]
    fn patch_name_without_target_is_rejected() {
        assert_eq!(target_from_patch_name("20240101_120000"), None);
        assert_eq!(target_from_patch_name("20240101_120000_"), None);
        assert_eq!(target_from_patch_name("garbage"), None);
    }

    #[test]
    fn backup_name_reverses_to_target() {
        let name = backup_name("src_main.rs", "20240101_120000");
        assert_eq!(name, "src_main.rs.bak_20240101_120000");
        assert_eq!(target_from_backup_name(&name).as_deref(), Some("src/main.rs"));
        assert_eq!(backup_timestamp(&name), Some("20240101_120000"));
    }

    #[test]
    fn backup_name_splits_on_first_marker() {
        let name = "notes.bak_old.bak_20240101_120000";
        assert_eq!(target_from_backup_name(name).as_deref(), Some("notes"));
        assert_eq!(target_from_backup_name(".bak_20240101_120000"), None);
        assert_eq!(target_from_backup_name("plain.txt"), None);
    }
}
