use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A node of document content: either literal text or an annotated term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Chunk {
    Text(String),
    Term(Term),
}

/// An annotated term. Its `expansion` is shown in a new column when the term
/// is activated; an empty expansion makes the term a leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    #[serde(alias = "word")]
    pub label: String,
    #[serde(default = "empty_expansion")]
    pub expansion: Arc<[Chunk]>,
}

fn empty_expansion() -> Arc<[Chunk]> {
    Arc::from(Vec::new())
}

impl Chunk {
    pub fn text(text: impl Into<String>) -> Self {
        Chunk::Text(text.into())
    }

    pub fn term(id: impl Into<String>, label: impl Into<String>, expansion: Vec<Chunk>) -> Self {
        Chunk::Term(Term::new(id, label, expansion))
    }

    pub fn leaf(id: impl Into<String>, label: impl Into<String>) -> Self {
        Chunk::term(id, label, Vec::new())
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Chunk::Term(term) => Some(term),
            Chunk::Text(_) => None,
        }
    }
}

impl Term {
    pub fn new(id: impl Into<String>, label: impl Into<String>, expansion: Vec<Chunk>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            expansion: Arc::from(expansion),
        }
    }

    /// Whether activating this term opens a column.
    pub fn is_expandable(&self) -> bool {
        !self.expansion.is_empty()
    }
}

/// Depth-first, order-preserving search for the term with `id` anywhere
/// below `chunks`.
pub fn find_term<'a>(chunks: &'a [Chunk], id: &str) -> Option<&'a Term> {
    for chunk in chunks {
        if let Chunk::Term(term) = chunk {
            if term.id == id {
                return Some(term);
            }
            if let Some(found) = find_term(&term.expansion, id) {
                return Some(found);
            }
        }
    }
    None
}

pub fn contains_term(chunks: &[Chunk], id: &str) -> bool {
    find_term(chunks, id).is_some()
}

/// Terms that appear directly in `chunks`, in reading order. These are the
/// terms a column actually renders.
pub fn terms(chunks: &[Chunk]) -> impl Iterator<Item = &Term> {
    chunks.iter().filter_map(Chunk::as_term)
}

/// Number of terms in the whole subtree.
pub fn term_count(chunks: &[Chunk]) -> usize {
    terms(chunks)
        .map(|term| 1 + term_count(&term.expansion))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Vec<Chunk> {
        vec![
            Chunk::text("An "),
            Chunk::term(
                "a",
                "Alpha",
                vec![
                    Chunk::text("contains "),
                    Chunk::term("b", "Beta", vec![Chunk::leaf("c", "Gamma")]),
                ],
            ),
            Chunk::text(" and "),
            Chunk::leaf("d", "Delta"),
        ]
    }

    #[test]
    fn find_term_searches_nested_expansions() {
        let chunks = nested();
        assert_eq!(find_term(&chunks, "a").map(|t| t.label.as_str()), Some("Alpha"));
        assert_eq!(find_term(&chunks, "c").map(|t| t.label.as_str()), Some("Gamma"));
        assert_eq!(find_term(&chunks, "d").map(|t| t.label.as_str()), Some("Delta"));
        assert!(find_term(&chunks, "missing").is_none());
    }

    #[test]
    fn find_term_ignores_literal_text() {
        let chunks = vec![Chunk::text("a"), Chunk::text("b")];
        assert!(find_term(&chunks, "a").is_none());
    }

    #[test]
    fn terms_only_lists_direct_children() {
        let chunks = nested();
        let ids: Vec<_> = terms(&chunks).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(term_count(&chunks), 4);
    }

    #[test]
    fn leaf_terms_are_not_expandable() {
        let chunks = nested();
        assert!(find_term(&chunks, "b").unwrap().is_expandable());
        assert!(!find_term(&chunks, "c").unwrap().is_expandable());
    }

    #[test]
    fn deserializes_strings_and_word_alias() {
        let json = r#"[
            "Plain ",
            { "word": "term", "id": "t", "expansion": ["inner ", { "label": "leaf", "id": "l" }] }
        ]"#;
        let chunks: Vec<Chunk> = serde_json::from_str(json).unwrap();
        assert_eq!(chunks[0], Chunk::text("Plain "));
        let term = chunks[1].as_term().unwrap();
        assert_eq!(term.label, "term");
        let leaf = find_term(&chunks, "l").unwrap();
        assert!(!leaf.is_expandable());
    }
}
