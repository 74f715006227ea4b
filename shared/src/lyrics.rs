//! Verse splitting and verse-level pagination of stored lyrics.

use crate::LyricsResponse;

/// Separator between verses in the stored text.
pub const VERSE_SEPARATOR: &str = "\n\n";

/// Splits lyrics on the blank-line separator, keeping empty fragments.
///
/// An empty text yields a single empty verse, so `total` is never zero.
pub fn split_verses(text: &str) -> Vec<&str> {
    text.split(VERSE_SEPARATOR).collect()
}

/// Returns the verses of `text` on the given 1-based page.
///
/// `total` always reports the full verse count. A page starting past the
/// last verse is empty rather than an error.
pub fn paginate_verses(text: &str, page: u32, size: u32) -> LyricsResponse {
    let verses = split_verses(text);
    let total = verses.len();

    let start = (page.saturating_sub(1) as usize).saturating_mul(size as usize);
    let page_verses = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(size as usize).min(total);
        verses[start..end]
            .iter()
            .map(|verse| (*verse).to_string())
            .collect()
    };

    LyricsResponse {
        total: total as u64,
        page,
        size,
        verses: page_verses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "v1\n\nv2\n\nv3";

    #[test]
    fn split_verses_keeps_order() {
        assert_eq!(split_verses(TEXT), vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn single_newlines_stay_inside_a_verse() {
        let verses = split_verses("line a\nline b\n\nline c");
        assert_eq!(verses, vec!["line a\nline b", "line c"]);
    }

    #[test]
    fn first_page_is_clamped_to_requested_size() {
        let page = paginate_verses(TEXT, 1, 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.verses, vec!["v1".to_string(), "v2".to_string()]);
    }

    #[test]
    fn last_page_is_clamped_to_verse_count() {
        let page = paginate_verses(TEXT, 2, 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.verses, vec!["v3".to_string()]);
    }

    #[test]
    fn page_past_the_end_is_empty_with_true_total() {
        let page = paginate_verses(TEXT, 5, 2);
        assert_eq!(page.total, 3);
        assert!(page.verses.is_empty());
        assert_eq!(page.page, 5);
        assert_eq!(page.size, 2);
    }

    #[test]
    fn concatenated_pages_rebuild_the_song() {
        let text = (1..=9)
            .map(|n| format!("verse {n}"))
            .collect::<Vec<_>>()
            .join(VERSE_SEPARATOR);
        for size in 1..=10 {
            let mut rebuilt = Vec::new();
            let mut page = 1;
            loop {
                let chunk = paginate_verses(&text, page, size);
                assert_eq!(chunk.total, 9);
                if chunk.verses.is_empty() {
                    break;
                }
                rebuilt.extend(chunk.verses);
                page += 1;
            }
            assert_eq!(rebuilt.join(VERSE_SEPARATOR), text, "size {size}");
        }
    }

    #[test]
    fn empty_text_counts_as_one_verse() {
        let page = paginate_verses("", 1, 4);
        assert_eq!(page.total, 1);
        assert_eq!(page.verses, vec![String::new()]);
    }
}
