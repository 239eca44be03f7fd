//! Prompt templates for the answer stage.
//!
//! Every prompt lives here so wording changes touch one file and unit tests
//! can inspect prompts directly without a model.
//!
//! Two templates exist, picked by [`QueryIntent`]:
//!
//! * **Analytical**: the model infers topic, purpose and key ideas from the
//!   whole context and answers in a structured way. The user's literal
//!   question is *not* inserted.
//! * **Factual**: the model must answer only from the context, without
//!   outside knowledge, and must say so when the answer is absent. Both the
//!   context and the literal question are inserted.

use crate::pipeline::intent::QueryIntent;

/// Template for whole-document questions. `{context}` is replaced.
pub const ANALYTICAL_TEMPLATE: &str = r#"You are an analytical document assistant.

Using the document below, infer:
- main topic
- purpose
- key ideas

Where details are unclear, you may offer a reasonable interpretation,
but base every point on the document.

Document:
{context}

Respond clearly and structurally."#;

/// Template for specific questions. `{context}` and `{query}` are replaced.
pub const FACTUAL_TEMPLATE: &str = r#"You are a factual document assistant.

Answer ONLY using the document content.
Do not use outside knowledge.
If the answer does not exist in the document, say so explicitly.

Document:
{context}

Question:
{query}"#;

/// Analytical prompt over `context`.
pub fn analytical_prompt(context: &str) -> String {
    ANALYTICAL_TEMPLATE.replacen("{context}", context, 1)
}

/// Factual prompt over `context` for `query`.
pub fn factual_prompt(context: &str, query: &str) -> String {
    // Context first, then query, so a literal "{query}" inside the document
    // text is never substituted.
    let (head, tail) = FACTUAL_TEMPLATE
        .split_once("{query}")
        .unwrap_or((FACTUAL_TEMPLATE, ""));
    let mut prompt = head.replacen("{context}", context, 1);
    prompt.push_str(query);
    prompt.push_str(tail);
    prompt
}

/// Build the model prompt, or `None` when the context holds no readable text.
pub fn build_prompt(intent: QueryIntent, context: &str, query: &str) -> Option<String> {
    if context.trim().is_empty() {
        return None;
    }
    Some(match intent {
        QueryIntent::Analytical => analytical_prompt(context),
        QueryIntent::Factual => factual_prompt(context, query),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_builds_nothing() {
        assert_eq!(build_prompt(QueryIntent::Factual, "", "What year?"), None);
        assert_eq!(build_prompt(QueryIntent::Analytical, " \n\t ", "summarize"), None);
    }

    #[test]
    fn analytical_prompt_omits_query() {
        let ctx = "Page 1 - Intro\nHello world\n\n";
        let prompt = build_prompt(QueryIntent::Analytical, ctx, "summarize").unwrap();
        assert!(prompt.contains(ctx));
        assert!(prompt.contains("main topic"));
        assert!(prompt.contains("structurally"));
        assert!(!prompt.contains("summarize"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn factual_prompt_has_context_query_and_guardrails() {
        let ctx = "Page 1\nSome fact\n\n";
        let prompt = build_prompt(QueryIntent::Factual, ctx, "What year?").unwrap();
        assert!(prompt.contains(ctx));
        assert!(prompt.contains("What year?"));
        assert!(prompt.contains("ONLY using the document"));
        assert!(prompt.contains("outside knowledge"));
        assert!(prompt.contains("say so"));
        assert!(prompt.ends_with("What year?"));
    }

    #[test]
    fn placeholders_in_document_text_are_left_alone() {
        let prompt = factual_prompt("literal {query} in text", "Q?");
        assert!(prompt.contains("literal {query} in text"));
        assert!(prompt.ends_with("Q?"));
    }

    #[test]
    fn templates_carry_their_placeholders() {
        assert_eq!(ANALYTICAL_TEMPLATE.matches("{context}").count(), 1);
        assert!(!ANALYTICAL_TEMPLATE.contains("{query}"));
        assert_eq!(FACTUAL_TEMPLATE.matches("{context}").count(), 1);
        assert_eq!(FACTUAL_TEMPLATE.matches("{query}").count(), 1);
    }
}
