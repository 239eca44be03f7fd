//! Document and transcript types consumed by the answer pipeline.
//!
//! A [`DocumentContent`] is produced once per uploaded PDF by an extraction
//! step (see [`crate::extract`] or any external extractor) and is immutable
//! afterwards. Two page shapes are accepted on the wire:
//!
//! ```json
//! { "1": "raw page text",
//!   "2": { "text": "...", "sections": [ { "title": "Intro", "content": "...", "page": 2 } ] } }
//! ```
//!
//! Key order from the JSON object is preserved, so callers that rely on
//! [`PageOrder::AsGiven`](crate::config::PageOrder::AsGiven) see pages exactly
//! as the extractor emitted them.

use crate::config::PageOrder;
use crate::error::DocuChatError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

fn default_section_title() -> String {
    "Section".to_string()
}

/// One titled section of a structured page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default = "default_section_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Page the section was found on, as reported by the extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Section {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            page: None,
        }
    }
}

/// A page record with its full text and an ordered list of sections.
///
/// Only `sections` contribute to the selected context; `text` is carried for
/// callers that want the raw page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredPage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// The value stored for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageContent {
    /// Flat page text, as produced by plain-text extractors.
    Text(String),
    /// `{text, sections}` record.
    Structured(StructuredPage),
    /// Anything else (numbers, null, arrays, ill-typed records). Kept so a
    /// bad page never rejects the whole document; contributes no context.
    Malformed(serde_json::Value),
}

impl From<String> for PageContent {
    fn from(text: String) -> Self {
        PageContent::Text(text)
    }
}

impl From<&str> for PageContent {
    fn from(text: &str) -> Self {
        PageContent::Text(text.to_string())
    }
}

impl From<StructuredPage> for PageContent {
    fn from(page: StructuredPage) -> Self {
        PageContent::Structured(page)
    }
}

/// Mapping from page identifier (1-based, as a string) to page content.
#[derive(Clone, Default, PartialEq)]
pub struct DocumentContent {
    pages: Vec<(String, PageContent)>,
    /// Position of each key in `pages`.
    index: HashMap<String, usize>,
}

impl fmt::Debug for DocumentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl DocumentContent {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            pages: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
        }
    }

    /// Insert or replace a page. A replaced page keeps its original position.
    pub fn insert(&mut self, page: impl Into<String>, content: impl Into<PageContent>) {
        let page = page.into();
        let content = content.into();
        match self.index.get(&page) {
            Some(&pos) => self.pages[pos].1 = content,
            None => {
                self.index.insert(page.clone(), self.pages.len());
                self.pages.push((page, content));
            }
        }
    }

    /// Builder-style variant of [`DocumentContent::insert`].
    pub fn with_page(mut self, page: impl Into<String>, content: impl Into<PageContent>) -> Self {
        self.insert(page, content);
        self
    }

    pub fn get(&self, page: &str) -> Option<&PageContent> {
        self.index.get(page).map(|&pos| &self.pages[pos].1)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PageContent)> {
        self.pages.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Pages arranged according to `order`.
    ///
    /// [`PageOrder::Numeric`] sorts keys that parse as integers ascending and
    /// places any other keys after them in lexicographic order.
    pub fn ordered(&self, order: PageOrder) -> Vec<(&str, &PageContent)> {
        let mut pages: Vec<_> = self.iter().collect();
        if order == PageOrder::Numeric {
            pages.sort_by(|(a, _), (b, _)| {
                match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => a.cmp(b),
                }
            });
        }
        pages
    }

    /// Parse document content from JSON text.
    ///
    /// `null` parses as an empty document.
    pub fn from_json_str(json: &str) -> Result<Self, DocuChatError> {
        Ok(serde_json::from_str::<Option<Self>>(json)?.unwrap_or_default())
    }
}

impl<K, V> FromIterator<(K, V)> for DocumentContent
where
    K: Into<String>,
    V: Into<PageContent>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut doc = DocumentContent::with_capacity(iter.size_hint().0);
        for (page, content) in iter {
            doc.insert(page, content);
        }
        doc
    }
}

impl Serialize for DocumentContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pages.len()))?;
        for (page, content) in &self.pages {
            map.serialize_entry(page, content)?;
        }
        map.end()
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = DocumentContent;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from page number to page text or {text, sections}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut doc = DocumentContent::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((page, content)) = access.next_entry::<String, PageContent>()? {
            doc.insert(page, content);
        }
        Ok(doc)
    }
}

impl<'de> Deserialize<'de> for DocumentContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the prior conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_page_shapes() {
        let doc = DocumentContent::from_json_str(
            r#"{"1": "Some fact",
                "2": {"text": "full", "sections": [{"title": "Intro", "content": "Hello world", "page": 2}]}}"#,
        )
        .unwrap();

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("1"), Some(&PageContent::Text("Some fact".into())));
        match doc.get("2") {
            Some(PageContent::Structured(page)) => {
                assert_eq!(page.text, "full");
                assert_eq!(page.sections[0].title, "Intro");
                assert_eq!(page.sections[0].page, Some(2));
            }
            other => panic!("expected structured page, got {other:?}"),
        }
    }

    #[test]
    fn section_defaults_apply() {
        let doc = DocumentContent::from_json_str(r#"{"1": {"sections": [{}]}}"#).unwrap();
        let Some(PageContent::Structured(page)) = doc.get("1") else {
            panic!("expected structured page");
        };
        assert_eq!(page.sections[0].title, "Section");
        assert_eq!(page.sections[0].content, "");
        assert_eq!(page.text, "");
    }

    #[test]
    fn malformed_pages_do_not_reject_document() {
        let doc =
            DocumentContent::from_json_str(r#"{"1": 42, "2": null, "3": {"sections": "nope"}}"#)
                .unwrap();
        assert_eq!(doc.len(), 3);
        assert!(doc
            .iter()
            .all(|(_, content)| matches!(content, PageContent::Malformed(_))));
    }

    #[test]
    fn null_document_is_empty() {
        assert!(DocumentContent::from_json_str("null").unwrap().is_empty());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(DocumentContent::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn json_key_order_is_preserved() {
        let doc = DocumentContent::from_json_str(r#"{"10": "j", "2": "b", "1": "a"}"#).unwrap();
        let keys: Vec<&str> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["10", "2", "1"]);
    }

    #[test]
    fn numeric_order_sorts_by_value_not_text() {
        let doc: DocumentContent = [("10", "j"), ("intro", "x"), ("2", "b"), ("1", "a")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = doc
            .ordered(PageOrder::Numeric)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["1", "2", "10", "intro"]);

        let given: Vec<&str> = doc
            .ordered(PageOrder::AsGiven)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(given, vec!["10", "intro", "2", "1"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = DocumentContent::new().with_page("1", "a").with_page("2", "b");
        doc.insert("1", "z");
        let pages: Vec<_> = doc.iter().collect();
        assert_eq!(pages[0], ("1", &PageContent::Text("z".into())));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn large_document_with_repeated_key_parses() {
        let n = 20_000;
        let mut json = String::from("{");
        for page in 1..=n {
            json.push_str(&format!("\"{page}\": \"text {page}\","));
        }
        json.push_str("\"1\": \"last write wins\"}");

        let doc = DocumentContent::from_json_str(&json).unwrap();
        assert_eq!(doc.len(), n);
        assert_eq!(doc.iter().next(), Some(("1", &PageContent::Text("last write wins".into()))));
        assert_eq!(doc.get("20000"), Some(&PageContent::Text("text 20000".into())));
        assert_eq!(doc.get("20001"), None);
    }

    #[test]
    fn equality_ignores_how_pages_were_added() {
        let parsed = DocumentContent::from_json_str(r#"{"1": "a", "2": "b"}"#).unwrap();
        let built = DocumentContent::new().with_page("1", "x").with_page("2", "b").with_page("1", "a");
        assert_eq!(parsed, built);
    }

    #[test]
    fn serialises_back_to_map() {
        let doc = DocumentContent::new().with_page("1", "Some fact");
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"1":"Some fact"}"#);
    }

    #[test]
    fn roles_are_lowercase() {
        let turn = ChatTurn::assistant("hi");
        assert_eq!(
            serde_json::to_string(&turn).unwrap(),
            r#"{"role":"assistant","content":"hi"}"#
        );
        let back: ChatTurn = serde_json::from_str(r#"{"role":"user","content":"q"}"#).unwrap();
        assert_eq!(back, ChatTurn::user("q"));
    }
}
