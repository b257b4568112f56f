use std::{collections::HashMap, sync::Arc};

use ratatui::style::Color;

use crate::chunk::{Chunk, Term, contains_term, find_term};
use crate::theme::accent_for;

/// Identity of an open column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnId {
    Root,
    Term(String),
}

/// A single open panel.
#[derive(Clone, Debug)]
pub struct Column {
    pub id: ColumnId,
    /// Term that was activated to open this column. `None` for the root.
    pub source_term_id: Option<String>,
    /// Label of that term, shown as the column header.
    pub source_label: Option<String>,
    pub content: Arc<[Chunk]>,
    pub accent: Color,
}

impl Column {
    fn root(content: Arc<[Chunk]>) -> Self {
        Self {
            id: ColumnId::Root,
            source_term_id: None,
            source_label: None,
            content,
            accent: accent_for(0),
        }
    }

    fn for_term(term: &Term, index: usize) -> Self {
        Self {
            id: ColumnId::Term(term.id.clone()),
            source_term_id: Some(term.id.clone()),
            source_label: Some(term.label.clone()),
            content: Arc::clone(&term.expansion),
            accent: accent_for(index),
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ColumnId::Root
    }
}

/// A term activation: the term id and the index of the column it was
/// rendered in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermClick {
    pub term_id: String,
    pub column_index: usize,
}

impl TermClick {
    pub fn new(term_id: impl Into<String>, column_index: usize) -> Self {
        Self {
            term_id: term_id.into(),
            column_index,
        }
    }
}

/// Side effect requested of the presentation layer after a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollCommand {
    #[default]
    None,
    ToEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    ColumnOutOfRange,
    NotFound,
    Leaf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Ignored(IgnoreReason),
    /// The term's column and everything right of it closed. `chain` is what
    /// was stored in the history for the term.
    Collapsed { chain: Vec<String> },
    /// The term's column reopened and `restored` of the `requested` saved
    /// descendants were replayed.
    Restored { restored: usize, requested: usize },
    Opened,
}

impl ClickOutcome {
    pub fn scroll(&self) -> ScrollCommand {
        match self {
            ClickOutcome::Restored { .. } | ClickOutcome::Opened => ScrollCommand::ToEnd,
            ClickOutcome::Ignored(_) | ClickOutcome::Collapsed { .. } => ScrollCommand::None,
        }
    }

    pub fn changed_columns(&self) -> bool {
        !matches!(self, ClickOutcome::Ignored(_))
    }
}

/// Term id to highlight color, for one column.
pub type Highlights = HashMap<String, Color>;

/// The open-column list and the expansion history.
///
/// Columns always form a single path from the root: each non-root column was
/// opened from a term reachable in the column to its left.
#[derive(Clone, Debug)]
pub struct ColumnState {
    columns: Vec<Column>,
    history: HashMap<String, Vec<String>>,
}

impl ColumnState {
    pub fn new(root: Arc<[Chunk]>) -> Self {
        Self {
            columns: vec![Column::root(root)],
            history: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always `false`: the root column is never removed. Present to pair
    /// with [`ColumnState::len`].
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn root(&self) -> &Column {
        &self.columns[0]
    }

    pub fn history(&self) -> &HashMap<String, Vec<String>> {
        &self.history
    }

    pub fn history_for(&self, term_id: &str) -> Option<&[String]> {
        self.history.get(term_id).map(Vec::as_slice)
    }

    /// Handle activation of a term rendered in column `click.column_index`.
    pub fn on_term_click(&mut self, click: &TermClick) -> ClickOutcome {
        let index = click.column_index;
        let Some(column) = self.columns.get(index) else {
            log::debug!("ignoring click on {} in missing column {index}", click.term_id);
            return ClickOutcome::Ignored(IgnoreReason::ColumnOutOfRange);
        };
        let Some(term) = find_term(&column.content, &click.term_id) else {
            log::debug!("ignoring stale click on {} in column {index}", click.term_id);
            return ClickOutcome::Ignored(IgnoreReason::NotFound);
        };
        if !term.is_expandable() {
            return ClickOutcome::Ignored(IgnoreReason::Leaf);
        }
        let term = term.clone();

        let outcome = if self.is_open_right_of(index, &term.id) {
            self.collapse(index, &term.id)
        } else {
            self.open(index, &term)
        };
        debug_assert!(self.path_is_consistent());
        outcome
    }

    fn is_open_right_of(&self, index: usize, term_id: &str) -> bool {
        self.columns
            .get(index + 1)
            .and_then(|next| next.source_term_id.as_deref())
            == Some(term_id)
    }

    fn collapse(&mut self, index: usize, term_id: &str) -> ClickOutcome {
        // The collapsed column itself sits at index + 1; only the columns
        // nested inside it are remembered.
        let chain: Vec<String> = self.columns[index + 2..]
            .iter()
            .filter_map(|column| column.source_term_id.clone())
            .collect();
        log::debug!("collapsing {term_id} after column {index}, saving {chain:?}");
        self.history.insert(term_id.to_string(), chain.clone());
        self.columns.truncate(index + 1);
        ClickOutcome::Collapsed { chain }
    }

    fn open(&mut self, index: usize, term: &Term) -> ClickOutcome {
        self.columns.truncate(index + 1);
        self.push_term(term);

        let chain = match self.history.remove(&term.id) {
            Some(chain) if !chain.is_empty() => chain,
            _ => {
                log::debug!("opened {} at column {}", term.id, self.columns.len() - 1);
                return ClickOutcome::Opened;
            }
        };

        let mut content = Arc::clone(&term.expansion);
        let mut restored = 0;
        for saved_id in &chain {
            let Some(saved) = find_term(&content, saved_id) else {
                break;
            };
            if !saved.is_expandable() {
                break;
            }
            let saved = saved.clone();
            self.push_term(&saved);
            content = Arc::clone(&saved.expansion);
            restored += 1;
        }
        log::debug!(
            "reopened {} and restored {restored} of {} saved columns",
            term.id,
            chain.len()
        );
        ClickOutcome::Restored {
            restored,
            requested: chain.len(),
        }
    }

    fn push_term(&mut self, term: &Term) {
        let index = self.columns.len();
        self.columns.push(Column::for_term(term, index));
    }

    /// Terms of column `index` to highlight: the term whose expansion is
    /// open in the next column, colored with that column's accent.
    pub fn highlights(&self, index: usize) -> Highlights {
        let mut highlights = Highlights::new();
        let (Some(column), Some(next)) = (self.columns.get(index), self.columns.get(index + 1))
        else {
            return highlights;
        };
        if let Some(source) = &next.source_term_id
            && contains_term(&column.content, source)
        {
            highlights.insert(source.clone(), next.accent);
        }
        highlights
    }

    /// Labels of the open non-root columns, left to right.
    pub fn breadcrumbs(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|column| column.source_label.as_deref())
            .collect()
    }

    /// Whether every non-root column was opened from a term reachable in the
    /// column before it.
    pub fn path_is_consistent(&self) -> bool {
        self.columns.first().is_some_and(Column::is_root)
            && self.columns.windows(2).all(|pair| {
                pair[1]
                    .source_term_id
                    .as_deref()
                    .is_some_and(|source| contains_term(&pair[0].content, source))
            })
    }
}

/// Pure form of [`ColumnState::on_term_click`].
pub fn transition(mut state: ColumnState, click: &TermClick) -> (ColumnState, ScrollCommand) {
    let outcome = state.on_term_click(click);
    (state, outcome.scroll())
}

#[cfg(test)]
#[path = "columns_tests.rs"]
mod columns_tests;
