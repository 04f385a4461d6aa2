//! Deterministic names derived from a job: slug, branch, and file path.
//!
//! Branch names depend only on the title and the UTC date, so re-running the
//! same job on the same day lands on the same branch. Two different records
//! with the same title on the same day share a branch as well; that collision
//! is what makes resumption work and must not be broken with random suffixes.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 50;

/// Slug used when a title normalizes to nothing.
pub const FALLBACK_SLUG: &str = "untitled";

/// Prefix shared by every export branch.
pub const BRANCH_PREFIX: &str = "adr/";

/// Directory in the target repository that receives exported documents.
pub const ADR_DIR: &str = "docs/adr";

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("slug regex is valid"));

/// Normalizes a title into a URL- and ref-safe slug.
///
/// Lowercases, collapses each run of non `[a-z0-9]` characters into a single
/// `-`, strips a leading and a trailing `-`, then truncates to
/// [`MAX_SLUG_LEN`]. Returns [`FALLBACK_SLUG`] if nothing is left.
#[must_use]
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "-");
    let trimmed = collapsed.strip_prefix('-').unwrap_or(&collapsed);
    let trimmed = trimmed.strip_suffix('-').unwrap_or(trimmed);

    // Only ASCII survives the replacement, so byte indexing is char indexing.
    let truncated = &trimmed[..trimmed.len().min(MAX_SLUG_LEN)];

    if truncated.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        truncated.to_string()
    }
}

/// Export branch name: `adr/<YYYY-MM-DD>-<slug>`.
#[must_use]
pub fn branch_name(title: &str, date: NaiveDate) -> String {
    format!("{BRANCH_PREFIX}{}-{}", date.format("%Y-%m-%d"), slugify(title))
}

/// Repository path of the exported document: `docs/adr/<record_id>.md`.
#[must_use]
pub fn adr_file_path(record_id: &str) -> String {
    format!("{ADR_DIR}/{record_id}.md")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn slugify_basic_title() {
        assert_eq!(slugify("Use Event Sourcing!!"), "use-event-sourcing");
        assert_eq!(slugify("Use Event Sourcing!!"), slugify("Use Event Sourcing!!"));
    }

    #[test]
    fn slugify_empty_and_punctuation_fall_back() {
        assert_eq!(slugify(""), "untitled");
        assert_eq!(slugify("!!! ??? ..."), "untitled");
        assert_eq!(slugify("---"), "untitled");
    }

    #[test]
    fn slugify_collapses_runs_and_strips_edges() {
        assert_eq!(slugify("  Hello,   World  "), "hello-world");
        assert_eq!(slugify("a--b__c"), "a-b-c");
    }

    #[test]
    fn slugify_non_ascii_becomes_separator() {
        assert_eq!(slugify("Café Déjà Vu"), "caf-d-j-vu");
    }

    #[test]
    fn slugify_truncates_after_trimming() {
        let title = "x".repeat(60);
        assert_eq!(slugify(&title).len(), MAX_SLUG_LEN);

        // Truncation can expose a hyphen at the cut point; it is kept.
        let title = format!("{} tail", "a".repeat(49));
        assert_eq!(slugify(&title), format!("{}-", "a".repeat(49)));
    }

    #[test]
    fn branch_name_format() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(
            branch_name("Use Event Sourcing", date),
            "adr/2025-01-05-use-event-sourcing"
        );
        assert_eq!(branch_name("", date), "adr/2025-01-05-untitled");
    }

    #[test]
    fn file_path_format() {
        assert_eq!(adr_file_path("ADR-042"), "docs/adr/ADR-042.md");
    }

    proptest! {
        #[test]
        fn slug_is_bounded_and_ref_safe(title in ".{0,200}") {
            let slug = slugify(&title);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.len() <= MAX_SLUG_LEN);
            prop_assert!(slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-'));
            prop_assert!(!slug.starts_with('-'));
        }

        #[test]
        fn slug_is_deterministic(title in ".{0,80}") {
            prop_assert_eq!(slugify(&title), slugify(&title));
        }
    }
}
