//! Query intent: whole-document analysis vs. a specific factual question.
//!
//! A keyword heuristic: a case-insensitive substring match
//! against [`ANALYTICAL_KEYWORDS`], short-circuiting on the first hit.

use serde::{Deserialize, Serialize};

/// Phrases that mark a query as asking about the document as a whole.
pub const ANALYTICAL_KEYWORDS: [&str; 9] = [
    "summarize",
    "summary",
    "overview",
    "what is this",
    "what is the pdf about",
    "explain",
    "describe",
    "purpose",
    "objective",
];

/// How the answer stage should prompt the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Infer topic, purpose and key ideas from the whole context.
    Analytical,
    /// Answer strictly from the context.
    Factual,
}

impl QueryIntent {
    pub fn is_analytical(self) -> bool {
        self == QueryIntent::Analytical
    }
}

/// Classify `query`. Empty queries are factual.
pub fn classify(query: &str) -> QueryIntent {
    if is_analytical_query(query) {
        QueryIntent::Analytical
    } else {
        QueryIntent::Factual
    }
}

/// `true` if the lowercased query contains any analytical keyword.
pub fn is_analytical_query(query: &str) -> bool {
    if query.is_empty() {
        return false;
    }
    let q = query.to_lowercase();
    ANALYTICAL_KEYWORDS.iter().any(|k| q.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_in_any_case_is_analytical() {
        for q in ["summarize", "SUMMARIZE this", "Please Summarize the report", "sUmMaRiZe"] {
            assert!(is_analytical_query(q), "{q}");
            assert_eq!(classify(q), QueryIntent::Analytical);
        }
    }

    #[test]
    fn every_keyword_triggers() {
        for k in ANALYTICAL_KEYWORDS {
            assert!(is_analytical_query(&format!("could you {k} it?")), "{k}");
        }
    }

    #[test]
    fn substring_match_is_not_whole_word() {
        assert!(is_analytical_query("the results remain unexplained"));
        assert!(is_analytical_query("purposeful design"));
    }

    #[test]
    fn factual_queries_stay_factual() {
        for q in ["What year?", "Who signed the contract", "total revenue in 2021"] {
            assert!(!is_analytical_query(q), "{q}");
            assert_eq!(classify(q), QueryIntent::Factual);
        }
    }

    #[test]
    fn empty_query_is_factual() {
        assert!(!is_analytical_query(""));
        assert_eq!(classify(""), QueryIntent::Factual);
        assert!(!classify("").is_analytical());
    }
}
