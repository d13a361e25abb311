//! Effective-query resolution
//!
//! Derives the search expression for an author from either a stored
//! PubMed results URL or the stored manual query. Upstream query syntax
//! is sensitive to literal quoting, and text pasted from rich editors
//! arrives with typographic quotes or accidental whole-string quoting
//! that breaks boolean syntax, so both sources pass through the same
//! quote normalization.

use pubharvest_common::db::models::Author;
use reqwest::Url;

fn is_upstream_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "ncbi.nlm.nih.gov"
        || host == "pubmed.ncbi.nlm.nih.gov"
        || host.ends_with(".ncbi.nlm.nih.gov")
}

/// Straighten typographic quotes, then strip one matching pair of
/// straight quotes wrapping the entire trimmed string. Inner quoting
/// survives.
pub fn normalize_quotes(raw: &str) -> String {
    let straightened: String = raw
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();

    let trimmed = straightened.trim();
    let mut chars = trimmed.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if first == last && (first == '"' || first == '\'') {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }

    trimmed.to_string()
}

/// Derive the effective search expression for an author.
///
/// Precedence: a bibliography URL on the upstream domain carrying a
/// `term` parameter wins over the stored manual query. `None` signals
/// nothing to fetch.
pub fn resolve_query(author: &Author) -> Option<String> {
    if let Some(term) = author.bibliography_url.as_deref().and_then(term_from_url) {
        let normalized = normalize_quotes(&term);
        return if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
    }

    let normalized = normalize_quotes(&author.query);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn term_from_url(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    if !is_upstream_host(url.host_str()?) {
        return None;
    }

    url.query_pairs()
        .find(|(key, _)| key == "term")
        .map(|(_, value)| value.into_owned())
        .filter(|term| !term.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn author(query: &str, bibliography_url: Option<&str>) -> Author {
        let now = chrono::Utc::now();
        Author {
            id: Uuid::new_v4(),
            name: "Henderson".into(),
            query: query.into(),
            bibliography_url: bibliography_url.map(str::to_string),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_curly_quotes_match_straight_equivalent() {
        assert_eq!(
            normalize_quotes("\u{201C}henderson am[au]\u{201D}"),
            normalize_quotes("\"henderson am[au]\"")
        );
        assert_eq!(
            normalize_quotes("henderson\u{2019}s review"),
            "henderson's review"
        );
    }

    #[test]
    fn test_whole_string_wrapping_is_stripped_once() {
        assert_eq!(normalize_quotes("\"(a[au] OR b[au])\""), "(a[au] OR b[au])");
        assert_eq!(normalize_quotes("'smith j[au]'"), "smith j[au]");
        assert_eq!(normalize_quotes("\"\"quoted\"\""), "\"quoted\"");
    }

    #[test]
    fn test_unwrapped_and_mismatched_strings_survive() {
        assert_eq!(normalize_quotes("smith j[au]"), "smith j[au]");
        assert_eq!(normalize_quotes("\"half open"), "\"half open");
        assert_eq!(normalize_quotes("  padded  "), "padded");
        assert_eq!(normalize_quotes(""), "");
    }

    #[test]
    fn test_url_term_takes_precedence_over_manual_query() {
        let a = author(
            "manual[au]",
            Some("https://pubmed.ncbi.nlm.nih.gov/?term=smith+j%5Bau%5D&sort=date"),
        );
        assert_eq!(resolve_query(&a).as_deref(), Some("smith j[au]"));
    }

    #[test]
    fn test_non_upstream_url_falls_back_to_manual_query() {
        let a = author("manual[au]", Some("https://example.org/?term=smith"));
        assert_eq!(resolve_query(&a).as_deref(), Some("manual[au]"));
    }

    #[test]
    fn test_upstream_url_without_term_falls_back() {
        let a = author(
            "manual[au]",
            Some("https://www.ncbi.nlm.nih.gov/myncbi/collections/bibliography/"),
        );
        assert_eq!(resolve_query(&a).as_deref(), Some("manual[au]"));
    }

    #[test]
    fn test_nothing_to_fetch() {
        assert_eq!(resolve_query(&author("", None)), None);
        assert_eq!(resolve_query(&author("   ", None)), None);
    }

    #[test]
    fn test_manual_query_is_normalized() {
        let a = author("\u{201C}(a OR b)\u{201D}", None);
        assert_eq!(resolve_query(&a).as_deref(), Some("(a OR b)"));
    }
}
