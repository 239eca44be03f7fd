//! Context selection: flatten a per-page document into one bounded text blob.
//!
//! Pages are visited in [`PageOrder`] and each is turned into chunks:
//!
//! ```text
//! structured page  →  "Page {page} - {title}\n{content}\n\n"   (one per section)
//! raw text page    →  "Page {page}\n{text}\n\n"
//! ```
//!
//! Chunks are appended whole. The first chunk that would push the running
//! total past `max_context_chars` is rejected, and [`OverflowPolicy`] decides
//! whether selection ends there or resumes at the next page.

use crate::config::{OverflowPolicy, PageOrder, PipelineConfig};
use crate::document::{DocumentContent, PageContent};
use crate::pipeline::state::PipelineState;
use tracing::debug;

/// Result of one context selection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedContext {
    pub text: String,
    /// Length of `text` in characters.
    pub chars: usize,
    /// Number of chunks appended.
    pub chunks: usize,
    /// At least one chunk was rejected for lack of room.
    pub truncated: bool,
}

impl SelectedContext {
    /// True iff the context holds any non-whitespace text.
    pub fn is_answerable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Format one section of a structured page.
pub fn section_chunk(page: &str, title: &str, content: &str) -> String {
    format!("Page {page} - {title}\n{content}\n\n")
}

/// Format a raw text page.
pub fn page_chunk(page: &str, text: &str) -> String {
    format!("Page {page}\n{text}\n\n")
}

/// Select context from `document` within `budget` characters.
pub fn select_context(
    document: &DocumentContent,
    budget: usize,
    policy: OverflowPolicy,
    order: PageOrder,
) -> SelectedContext {
    let mut selected = SelectedContext::default();

    'pages: for (page, content) in document.ordered(order) {
        let chunks: Vec<String> = match content {
            PageContent::Text(text) => vec![page_chunk(page, text)],
            PageContent::Structured(record) => record
                .sections
                .iter()
                .map(|s| section_chunk(page, &s.title, &s.content))
                .collect(),
            PageContent::Malformed(value) => {
                debug!("Page {}: ignoring malformed page value ({})", page, value);
                continue;
            }
        };

        for chunk in chunks {
            let len = chunk.chars().count();
            if selected.chars + len > budget {
                selected.truncated = true;
                debug!(
                    "Page {}: chunk of {} chars exceeds remaining budget ({}/{})",
                    page, len, selected.chars, budget
                );
                match policy {
                    OverflowPolicy::StopAll => break 'pages,
                    OverflowPolicy::SkipPage => continue 'pages,
                }
            }
            selected.text.push_str(&chunk);
            selected.chars += len;
            selected.chunks += 1;
        }
    }

    selected
}

/// The `ContextSelection` stage: fill `selected_context` and `is_answerable`.
pub fn run(state: &mut PipelineState, config: &PipelineConfig) -> SelectedContext {
    let selected = select_context(
        &state.document_content,
        config.max_context_chars,
        config.overflow_policy,
        config.page_order,
    );
    state.selected_context = selected.text.clone();
    state.is_answerable = selected.is_answerable();
    debug!(
        "Selected {} chars in {} chunks from {} pages (truncated: {})",
        selected.chars,
        selected.chunks,
        state.document_content.len(),
        selected.truncated
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Section, StructuredPage};

    fn structured(sections: &[(&str, &str)]) -> PageContent {
        PageContent::Structured(StructuredPage {
            text: String::new(),
            sections: sections
                .iter()
                .map(|(t, c)| Section::new(*t, *c))
                .collect(),
        })
    }

    fn select(doc: &DocumentContent, budget: usize, policy: OverflowPolicy) -> SelectedContext {
        select_context(doc, budget, policy, PageOrder::Numeric)
    }

    #[test]
    fn formats_sections_and_raw_pages() {
        let doc = DocumentContent::new()
            .with_page("1", structured(&[("Intro", "Hello world")]))
            .with_page("2", "Some fact");

        let ctx = select(&doc, 8000, OverflowPolicy::StopAll);
        assert_eq!(ctx.text, "Page 1 - Intro\nHello world\n\nPage 2\nSome fact\n\n");
        assert_eq!(ctx.chars, ctx.text.chars().count());
        assert_eq!(ctx.chunks, 2);
        assert!(!ctx.truncated);
        assert!(ctx.is_answerable());
    }

    #[test]
    fn structured_page_text_field_is_not_used() {
        let doc = DocumentContent::new().with_page(
            "1",
            PageContent::Structured(StructuredPage {
                text: "only in text".into(),
                sections: vec![],
            }),
        );
        let ctx = select(&doc, 8000, OverflowPolicy::StopAll);
        assert!(ctx.text.is_empty());
        assert!(!ctx.is_answerable());
    }

    #[test]
    fn empty_and_whitespace_documents_are_not_answerable() {
        assert!(!select(&DocumentContent::new(), 8000, OverflowPolicy::StopAll).is_answerable());

        let doc = DocumentContent::new().with_page("1", structured(&[]));
        assert!(!select(&doc, 8000, OverflowPolicy::StopAll).is_answerable());
    }

    #[test]
    fn malformed_pages_contribute_nothing() {
        let doc = DocumentContent::new()
            .with_page("1", PageContent::Malformed(serde_json::json!(42)))
            .with_page("2", "kept");
        let ctx = select(&doc, 8000, OverflowPolicy::StopAll);
        assert_eq!(ctx.text, "Page 2\nkept\n\n");
    }

    #[test]
    fn chunk_that_exactly_fills_budget_is_kept() {
        let chunk = page_chunk("1", "abc");
        let budget = chunk.chars().count();
        let doc = DocumentContent::new().with_page("1", "abc");
        let ctx = select(&doc, budget, OverflowPolicy::StopAll);
        assert_eq!(ctx.text, chunk);
        assert!(!ctx.truncated);
    }

    #[test]
    fn overflowing_chunk_is_rejected_whole() {
        let doc = DocumentContent::new().with_page("1", "x".repeat(100));
        let ctx = select(&doc, 50, OverflowPolicy::StopAll);
        assert!(ctx.text.is_empty());
        assert!(ctx.truncated);
    }

    #[test]
    fn stop_all_ends_selection_at_first_overflow() {
        let long = "y".repeat(200);
        let doc = DocumentContent::new()
            .with_page("1", structured(&[("A", "short"), ("B", &long[..]), ("C", "tiny")]))
            .with_page("2", "later");
        let ctx = select(&doc, 100, OverflowPolicy::StopAll);
        assert_eq!(ctx.text, "Page 1 - A\nshort\n\n");
        assert_eq!(ctx.chunks, 1);
        assert!(ctx.truncated);
    }

    #[test]
    fn skip_page_resumes_at_next_page() {
        let long = "y".repeat(200);
        let doc = DocumentContent::new()
            .with_page("1", structured(&[("A", "short"), ("B", &long[..]), ("C", "tiny")]))
            .with_page("2", "later");
        let ctx = select(&doc, 100, OverflowPolicy::SkipPage);
        // Section C is never tried once B overflows, but page 2 still fits.
        assert_eq!(ctx.text, "Page 1 - A\nshort\n\nPage 2\nlater\n\n");
        assert!(!ctx.text.contains("tiny"));
        assert!(ctx.truncated);
    }

    #[test]
    fn never_exceeds_budget() {
        let doc: DocumentContent = (1..=40)
            .map(|n| (n.to_string(), "z".repeat(n * 37 % 500)))
            .collect();
        for budget in [1, 64, 500, 1234, 8000] {
            for policy in [OverflowPolicy::StopAll, OverflowPolicy::SkipPage] {
                let ctx = select(&doc, budget, policy);
                assert!(ctx.chars <= budget, "{} > {budget} ({policy:?})", ctx.chars);
                assert_eq!(ctx.chars, ctx.text.chars().count());
            }
        }
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        // 10 chars, 30 bytes
        let text = "日本語日本語日本語日";
        let chunk_chars = page_chunk("1", text).chars().count();
        let doc = DocumentContent::new().with_page("1", text);
        let ctx = select(&doc, chunk_chars, OverflowPolicy::StopAll);
        assert!(ctx.text.contains(text));
    }

    #[test]
    fn page_order_controls_visit_order() {
        let doc = DocumentContent::new()
            .with_page("10", "ten")
            .with_page("2", "two");
        let numeric = select_context(&doc, 8000, OverflowPolicy::StopAll, PageOrder::Numeric);
        assert!(numeric.text.starts_with("Page 2\ntwo"));

        let given = select_context(&doc, 8000, OverflowPolicy::StopAll, PageOrder::AsGiven);
        assert!(given.text.starts_with("Page 10\nten"));
    }

    #[test]
    fn run_sets_state_fields() {
        let config = PipelineConfig::default();

        let mut state = PipelineState::new(DocumentContent::new(), "q", vec![]);
        run(&mut state, &config);
        assert!(state.selected_context.is_empty());
        assert!(!state.is_answerable);

        // A blank page still contributes its "Page N" header.
        let mut state = PipelineState::new(DocumentContent::new().with_page("1", "  \n "), "q", vec![]);
        let selected = run(&mut state, &config);
        assert_eq!(state.selected_context, selected.text);
        assert_eq!(state.is_answerable, !state.selected_context.trim().is_empty());
        assert!(state.is_answerable);
    }
}
