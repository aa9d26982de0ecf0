use crate::document::{Chunk, Document};
use crate::error::{IndexError, Result};

/// One window produced by [`sliding_window`]. `start` counts characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub content: String,
}

/// Split `text` into windows of `size` characters, advancing by `step`.
///
/// The window that reaches the end of the text is always the last one emitted.
/// With `step <= size` consecutive windows overlap by `size - step` characters;
/// with `step > size` they leave gaps of `step - size` characters.
///
/// # Errors
///
/// Returns [`IndexError::InvalidParameter`] if `size` or `step` is zero.
pub fn sliding_window(text: &str, size: usize, step: usize) -> Result<Vec<Window>> {
    if size == 0 {
        return Err(IndexError::InvalidParameter(
            "window size must be positive".into(),
        ));
    }
    if step == 0 {
        return Err(IndexError::InvalidParameter(
            "window step must be positive".into(),
        ));
    }

    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = start.saturating_add(size).min(len);
        windows.push(Window {
            start,
            content: text[bounds[start]..bounds[end]].to_owned(),
        });
        if end == len {
            break;
        }
        start = start.saturating_add(step);
    }

    Ok(windows)
}

/// Window every document and attach its path and metadata to each chunk.
///
/// Output preserves document order, then window order within a document.
///
/// # Errors
///
/// Returns [`IndexError::InvalidParameter`] if `size` or `step` is zero,
/// even when `docs` is empty.
pub fn chunk_documents(docs: &[Document], size: usize, step: usize) -> Result<Vec<Chunk>> {
    // Validate eagerly so an empty corpus still rejects bad arguments.
    sliding_window("", size, step)?;

    let mut chunks = Vec::new();
    for doc in docs {
        for window in sliding_window(&doc.content, size, step)? {
            chunks.push(Chunk {
                start: window.start,
                content: window.content,
                path: doc.path.clone(),
                metadata: doc.metadata.clone(),
            });
        }
    }
    tracing::debug!(documents = docs.len(), chunks = chunks.len(), "chunked corpus");
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(windows: &[Window]) -> Vec<(usize, &str)> {
        windows
            .iter()
            .map(|w| (w.start, w.content.as_str()))
            .collect()
    }

    #[test]
    fn overlapping_windows() {
        let w = sliding_window("ABCDEFGHIJ", 4, 2).unwrap();
        assert_eq!(
            pairs(&w),
            vec![(0, "ABCD"), (2, "CDEF"), (4, "EFGH"), (6, "GHIJ")]
        );
    }

    #[test]
    fn short_final_window_is_kept_once() {
        let w = sliding_window("ABCDEFG", 4, 2).unwrap();
        assert_eq!(pairs(&w), vec![(0, "ABCD"), (2, "CDEF"), (4, "EFG")]);
    }

    #[test]
    fn text_shorter_than_window() {
        let w = sliding_window("AB", 4, 2).unwrap();
        assert_eq!(pairs(&w), vec![(0, "AB")]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(sliding_window("", 4, 2).unwrap().is_empty());
    }

    #[test]
    fn gapped_windows() {
        let w = sliding_window("ABCDEFGHIJ", 2, 5).unwrap();
        assert_eq!(pairs(&w), vec![(0, "AB"), (5, "FG")]);
    }

    #[test]
    fn offsets_count_characters() {
        let w = sliding_window("äöüßxy", 2, 2).unwrap();
        assert_eq!(pairs(&w), vec![(0, "äö"), (2, "üß"), (4, "xy")]);
    }

    #[test]
    fn zero_size_rejected() {
        let err = sliding_window("abc", 0, 1).unwrap_err();
        assert!(matches!(err, IndexError::InvalidParameter(_)));
    }

    #[test]
    fn zero_step_rejected() {
        let err = sliding_window("abc", 1, 0).unwrap_err();
        assert!(matches!(err, IndexError::InvalidParameter(_)));
    }

    #[test]
    fn chunk_documents_rejects_bad_args_on_empty_corpus() {
        assert!(chunk_documents(&[], 0, 1).is_err());
    }

    #[test]
    fn chunk_documents_copies_fields_and_keeps_order() {
        let docs = vec![
            Document::new("a.md", "ABCDEF").with_metadata("title", "A"),
            Document::new("b.md", "XYZ"),
        ];
        let chunks = chunk_documents(&docs, 4, 2).unwrap();
        let view: Vec<_> = chunks
            .iter()
            .map(|c| (c.path.as_str(), c.start, c.content.as_str()))
            .collect();
        assert_eq!(
            view,
            vec![("a.md", 0, "ABCD"), ("a.md", 2, "CDEF"), ("b.md", 0, "XYZ")]
        );
        assert_eq!(chunks[0].metadata.get("title").map(String::as_str), Some("A"));
        assert_eq!(chunks[1].metadata.get("title").map(String::as_str), Some("A"));
        assert!(chunks[2].metadata.is_empty());
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn overlapping_windows_cover_text_exactly(
                text in "\\PC{1,400}",
                size in 1usize..60,
                step_frac in 0.0f64..=1.0,
            ) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
                let step = ((size as f64 * step_frac) as usize).clamp(1, size);
                let windows = sliding_window(&text, size, step).unwrap();
                let chars: Vec<char> = text.chars().collect();

                prop_assert!(!windows.is_empty());
                prop_assert_eq!(windows[0].start, 0);
                let last = windows.last().unwrap();
                prop_assert_eq!(last.start + last.content.chars().count(), chars.len());

                for w in &windows {
                    let expected: String = chars[w.start..].iter().take(size).collect();
                    prop_assert_eq!(&w.content, &expected);
                }
                for pair in windows.windows(2) {
                    prop_assert_eq!(pair[1].start - pair[0].start, step);
                    let end = pair[0].start + pair[0].content.chars().count();
                    prop_assert!(pair[1].start <= end, "gap between windows");
                }
            }

            #[test]
            fn gapped_windows_skip_exactly_step_minus_size(
                text in "[a-z]{1,400}",
                size in 1usize..20,
                extra in 1usize..20,
            ) {
                let step = size + extra;
                let windows = sliding_window(&text, size, step).unwrap();
                for pair in windows.windows(2) {
                    let end = pair[0].start + pair[0].content.chars().count();
                    prop_assert_eq!(pair[1].start - end, step - size);
                }
            }

            #[test]
            fn never_panics(text in "\\PC{0,200}", size in 1usize..50, step in 1usize..50) {
                let _ = sliding_window(&text, size, step).unwrap();
            }
        }
    }
}
