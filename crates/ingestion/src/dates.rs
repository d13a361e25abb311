//! Publication date normalization
//!
//! Upstream records carry up to three date strings (`pubdate`,
//! `epubdate`, `sortpubdate`) in loosely specified formats. This module
//! coerces them into the canonical `YYYY-MM-DD` used for sort ordering
//! and picks the human-facing display string.

use chrono::{Datelike, NaiveDate};
use regex_lite::Regex;
use std::sync::OnceLock;

/// Formats the general parser attempts, in order
const CALENDAR_FORMATS: &[&str] = &["%Y %b %d", "%Y %B %d", "%Y-%m-%d", "%Y/%m/%d"];

fn year_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}$").unwrap())
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})\s+([A-Za-z]{3,})$").unwrap())
}

fn sortdate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(?:/(\d{2}))?(?:/(\d{2}))?").unwrap())
}

/// Coerce an upstream date string into `YYYY-MM-DD`; empty on failure.
///
/// Year-only dates land on `12-31` so they sort as end of year.
/// Year-month dates land on day `28`, which exists in every month.
pub fn to_iso(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    for format in CALENDAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    if year_only_re().is_match(raw) {
        return format!("{}-12-31", raw);
    }

    if let Some(caps) = year_month_re().captures(raw) {
        let year = &caps[1];
        let synthesized = format!("{} {} 01", year, &caps[2]);
        for format in ["%Y %b %d", "%Y %B %d"] {
            if let Ok(date) = NaiveDate::parse_from_str(&synthesized, format) {
                return format!("{}-{:02}-28", year, date.month());
            }
        }
    }

    String::new()
}

/// Combine the three upstream date fields into one canonical date.
///
/// The sort-date field wins when its `YYYY[/MM[/DD]]` prefix parses;
/// missing segments default to month 12, day 31. Otherwise the
/// electronic-publication date is coerced, then the generic one. First
/// non-empty result wins; empty means no upstream date was usable.
pub fn combine(sortpubdate: &str, epubdate: &str, pubdate: &str) -> String {
    if let Some(iso) = iso_from_sortdate(sortpubdate.trim()) {
        return iso;
    }

    let iso = to_iso(epubdate);
    if !iso.is_empty() {
        return iso;
    }

    to_iso(pubdate)
}

fn iso_from_sortdate(sortpubdate: &str) -> Option<String> {
    let caps = sortdate_re().captures(sortpubdate)?;

    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 12,
    };
    let day: u32 = match caps.get(3) {
        Some(d) => d.as_str().parse().ok()?,
        None => 31,
    };

    // Impossible segment combinations fall through to the other fields
    // rather than producing an invalid date.
    NaiveDate::from_ymd_opt(year, month, day)?;

    Some(format!("{:04}-{:02}-{:02}", year, month, day))
}

/// Pick the human-facing date string, independent of the ISO value
pub fn display_date(epubdate: &str, pubdate: &str) -> String {
    let epub = epubdate.trim();
    if !epub.is_empty() {
        return epub.to_string();
    }
    pubdate.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_iso_full_dates() {
        assert_eq!(to_iso("2021 Jun 15"), "2021-06-15");
        assert_eq!(to_iso("2021 June 15"), "2021-06-15");
        assert_eq!(to_iso("2021-06-15"), "2021-06-15");
        assert_eq!(to_iso("2021/06/15"), "2021-06-15");
    }

    #[test]
    fn test_to_iso_year_only_sorts_as_end_of_year() {
        assert_eq!(to_iso("2021"), "2021-12-31");
    }

    #[test]
    fn test_to_iso_year_month_uses_safe_day() {
        assert_eq!(to_iso("2021 Jun"), "2021-06-28");
        assert_eq!(to_iso("2020 February"), "2020-02-28");
    }

    #[test]
    fn test_to_iso_rejects_garbage() {
        assert_eq!(to_iso(""), "");
        assert_eq!(to_iso("not a date"), "");
        assert_eq!(to_iso("2021 Jan-Feb"), "");
        assert_eq!(to_iso("Spring 2021"), "");
    }

    #[test]
    fn test_combine_prefers_sortdate() {
        assert_eq!(combine("2020/05/10", "", ""), "2020-05-10");
        assert_eq!(combine("2020/05/10", "2019 Jan 1", "2018"), "2020-05-10");
        assert_eq!(combine("2020/05/10 00:00", "", ""), "2020-05-10");
    }

    #[test]
    fn test_combine_defaults_missing_segments() {
        assert_eq!(combine("2020", "", ""), "2020-12-31");
        assert_eq!(combine("2020/05", "", ""), "2020-05-31");
    }

    #[test]
    fn test_combine_falls_back_in_order() {
        assert_eq!(combine("", "2019 Mar", ""), "2019-03-28");
        assert_eq!(combine("", "", "2018 Nov 2"), "2018-11-02");
        assert_eq!(combine("", "", ""), "");
    }

    #[test]
    fn test_combine_invalid_sortdate_segments_fall_through() {
        // Day default 31 does not exist in February
        assert_eq!(combine("2020/02", "2019 Mar", ""), "2019-03-28");
    }

    #[test]
    fn test_display_date_prefers_epubdate() {
        assert_eq!(display_date("2021 Jun 15", "2021 Jul"), "2021 Jun 15");
        assert_eq!(display_date("", "2021 Jul"), "2021 Jul");
        assert_eq!(display_date("", ""), "");
    }
}
