use std::collections::HashMap;

use ratatui::{
    Frame,
    layout::{Position, Rect},
    text::{Span, Text},
    widgets::{Block, Borders, Paragraph},
};

use crate::columns::{ColumnId, ColumnState, ScrollCommand, TermClick};
use crate::config::LayoutConfig;
use crate::render::{RenderResult, render_chunks};
use crate::theme::Theme;

/// Keyboard focus: a column, and the term within it when the column has any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Focus {
    pub column: usize,
    pub term_id: Option<String>,
}

/// Geometry and rendered content of one drawn column.
#[derive(Debug)]
struct ColumnLayout {
    index: usize,
    outer: Rect,
    inner: Rect,
    scroll_top: usize,
    render: RenderResult,
}

/// Lays out the open columns left to right and owns horizontal scrolling.
///
/// Scrolling moves by whole columns. `first_visible` never goes below zero,
/// so the root column's leading edge can't be scrolled past.
#[derive(Debug)]
pub struct ColumnContainer {
    layout: LayoutConfig,
    first_visible: usize,
    pending_scroll: ScrollCommand,
    column_scroll: HashMap<ColumnId, usize>,
    last_visible_count: usize,
    last_column_count: usize,
    drawn: Vec<ColumnLayout>,
}

impl ColumnContainer {
    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            layout,
            first_visible: 0,
            pending_scroll: ScrollCommand::None,
            column_scroll: HashMap::new(),
            last_visible_count: 1,
            last_column_count: 1,
            drawn: Vec::new(),
        }
    }

    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    /// Indices of the columns drawn by the last frame.
    pub fn visible_columns(&self) -> std::ops::Range<usize> {
        let end = self
            .drawn
            .last()
            .map(|layout| layout.index + 1)
            .unwrap_or(self.first_visible);
        self.first_visible..end
    }

    /// Queue a scroll. It runs on the next draw, once the new column list
    /// has been laid out.
    pub fn request(&mut self, command: ScrollCommand) {
        if command != ScrollCommand::None {
            self.pending_scroll = command;
        }
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll != ScrollCommand::None
    }

    /// How many columns fit side by side in `width` cells.
    pub fn visible_count(&self, width: u16) -> usize {
        let stride = usize::from(self.layout.column_width) + usize::from(self.layout.column_gap);
        let fitting = (usize::from(width) + usize::from(self.layout.column_gap)) / stride.max(1);
        fitting.max(1)
    }

    fn max_first_visible(&self, column_count: usize, visible: usize) -> usize {
        column_count.saturating_sub(visible)
    }

    /// Scroll by `delta` columns, clamped to the valid range.
    pub fn scroll_columns(&mut self, delta: isize) {
        let max = self.max_first_visible(self.last_column_count, self.last_visible_count);
        self.first_visible = self.first_visible.saturating_add_signed(delta).min(max);
    }

    /// Make column `index` visible, moving as little as possible.
    pub fn reveal(&mut self, index: usize) {
        let visible = self.last_visible_count.max(1);
        if index < self.first_visible {
            self.first_visible = index;
        } else if index >= self.first_visible + visible {
            self.first_visible = index + 1 - visible;
        }
    }

    /// Scroll the content of the drawn column `index` vertically.
    pub fn scroll_column_content(&mut self, state: &ColumnState, index: usize, delta: isize) {
        let Some(column) = state.columns().get(index) else {
            return;
        };
        let max = self
            .drawn
            .iter()
            .find(|layout| layout.index == index)
            .map(|layout| {
                layout
                    .render
                    .total_lines
                    .saturating_sub(usize::from(layout.inner.height))
            })
            .unwrap_or(0);
        let entry = self.column_scroll.entry(column.id.clone()).or_insert(0);
        *entry = entry.saturating_add_signed(delta).min(max);
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        state: &ColumnState,
        focus: Option<&Focus>,
        theme: &Theme,
    ) {
        self.drawn.clear();
        let columns = state.columns();
        self.column_scroll
            .retain(|id, _| columns.iter().any(|column| &column.id == id));
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible = self.visible_count(area.width);
        self.last_visible_count = visible;
        self.last_column_count = columns.len();
        let max_first = self.max_first_visible(columns.len(), visible);
        if std::mem::take(&mut self.pending_scroll) == ScrollCommand::ToEnd {
            self.first_visible = max_first;
        }
        self.first_visible = self.first_visible.min(max_first);

        let stride = self.layout.column_width.saturating_add(self.layout.column_gap);
        let mut x = area.x;
        for (index, column) in columns.iter().enumerate().skip(self.first_visible) {
            let right = area.x.saturating_add(area.width);
            if x >= right {
                break;
            }
            let width = self.layout.column_width.min(right - x);
            let outer = Rect::new(x, area.y, width, area.height);
            x = x.saturating_add(stride);

            let mut block = Block::default()
                .borders(Borders::ALL)
                .border_style(theme.column_border_style(column.accent))
                .style(theme.column_style(column.accent));
            if let Some(label) = &column.source_label {
                block = block.title(Span::styled(
                    format!(" {label} "),
                    theme.column_title_style(column.accent),
                ));
            }
            let inner = block.inner(outer);

            let focused = focus
                .filter(|focus| focus.column == index)
                .and_then(|focus| focus.term_id.as_deref());
            let highlights = state.highlights(index);
            let render = render_chunks(
                &column.content,
                usize::from(inner.width),
                &highlights,
                focused,
                theme,
            );

            let viewport = usize::from(inner.height).max(1);
            let max_scroll = render.total_lines.saturating_sub(viewport);
            let scroll = self.column_scroll.entry(column.id.clone()).or_insert(0);
            if let Some(line) = focused.and_then(|term_id| render.line_of(term_id)) {
                if line < *scroll {
                    *scroll = line;
                } else if line >= *scroll + viewport {
                    *scroll = line + 1 - viewport;
                }
            }
            *scroll = (*scroll).min(max_scroll);
            let scroll_top = *scroll;

            let paragraph = Paragraph::new(Text::from(render.lines.clone()))
                .block(block)
                .scroll((scroll_top as u16, 0));
            frame.render_widget(paragraph, outer);

            self.drawn.push(ColumnLayout {
                index,
                outer,
                inner,
                scroll_top,
                render,
            });
        }
    }

    /// Column drawn at a screen position, border included.
    pub fn column_at(&self, x: u16, y: u16) -> Option<usize> {
        self.drawn
            .iter()
            .find(|layout| layout.outer.contains(Position::new(x, y)))
            .map(|layout| layout.index)
    }

    /// Resolve a screen position to the term drawn there.
    pub fn hit_test(&self, x: u16, y: u16) -> Option<TermClick> {
        let layout = self
            .drawn
            .iter()
            .find(|layout| layout.inner.contains(Position::new(x, y)))?;
        let line = layout.scroll_top + usize::from(y - layout.inner.y);
        let column = x - layout.inner.x;
        layout
            .render
            .term_at(line, column)
            .map(|term_id| TermClick::new(term_id, layout.index))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::document::Document;

    fn narrow_layout() -> LayoutConfig {
        LayoutConfig {
            column_width: 30,
            column_gap: 1,
        }
    }

    fn draw(
        terminal: &mut Terminal<TestBackend>,
        container: &mut ColumnContainer,
        state: &ColumnState,
        focus: Option<&Focus>,
    ) {
        let theme = Theme::default();
        terminal
            .draw(|frame| {
                let area = frame.area();
                container.draw(frame, area, state, focus, &theme);
            })
            .unwrap();
    }

    fn buffer_row(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect()
    }

    fn find_term_cell(container: &ColumnContainer, term_id: &str, width: u16, height: u16) -> (u16, u16) {
        for y in 0..height {
            for x in 0..width {
                if container
                    .hit_test(x, y)
                    .is_some_and(|click| click.term_id == term_id)
                {
                    return (x, y);
                }
            }
        }
        panic!("term {term_id} not drawn");
    }

    #[test]
    fn visible_count_accounts_for_gaps() {
        let container = ColumnContainer::new(narrow_layout());
        assert_eq!(container.visible_count(30), 1);
        assert_eq!(container.visible_count(61), 2);
        assert_eq!(container.visible_count(91), 2);
        assert_eq!(container.visible_count(92), 3);
        assert_eq!(container.visible_count(5), 1);
    }

    #[test]
    fn click_on_drawn_term_resolves_to_column() {
        let document = Document::sample();
        let state = ColumnState::new(Arc::clone(&document.root));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        draw(&mut terminal, &mut container, &state, None);

        let (x, y) = find_term_cell(&container, "npn", 80, 20);
        assert_eq!(container.hit_test(x, y), Some(TermClick::new("npn", 0)));
        assert_eq!(container.column_at(x, y), Some(0));
        // Borders are not clickable.
        assert_eq!(container.hit_test(0, 0), None);
    }

    #[test]
    fn header_shows_source_label() {
        let document = Document::sample();
        let mut state = ColumnState::new(Arc::clone(&document.root));
        state.on_term_click(&TermClick::new("npn", 0));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        draw(&mut terminal, &mut container, &state, None);

        assert!(buffer_row(&terminal, 0).contains("NPN transistor"));
    }

    #[test]
    fn scroll_to_end_reveals_newest_column_on_next_draw() {
        let document = Document::sample();
        let mut state = ColumnState::new(Arc::clone(&document.root));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(62, 20)).unwrap();
        draw(&mut terminal, &mut container, &state, None);

        let outcome = state.on_term_click(&TermClick::new("npn", 0));
        container.request(outcome.scroll());
        let outcome = state.on_term_click(&TermClick::new("base", 1));
        container.request(outcome.scroll());
        assert!(container.has_pending_scroll());
        assert_eq!(container.first_visible(), 0);

        draw(&mut terminal, &mut container, &state, None);
        assert!(!container.has_pending_scroll());
        assert_eq!(container.first_visible(), 1);
        assert_eq!(container.visible_columns(), 1..3);
        assert!(buffer_row(&terminal, 0).contains("base"));
    }

    #[test]
    fn collapse_clamps_scroll_without_request() {
        let document = Document::sample();
        let mut state = ColumnState::new(Arc::clone(&document.root));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(31, 20)).unwrap();

        container.request(state.on_term_click(&TermClick::new("npn", 0)).scroll());
        container.request(state.on_term_click(&TermClick::new("semi", 1)).scroll());
        draw(&mut terminal, &mut container, &state, None);
        assert_eq!(container.first_visible(), 2);

        let outcome = state.on_term_click(&TermClick::new("npn", 0));
        container.request(outcome.scroll());
        assert!(!container.has_pending_scroll());
        draw(&mut terminal, &mut container, &state, None);
        assert_eq!(container.first_visible(), 0);
    }

    #[test]
    fn manual_scrolling_is_clamped() {
        let document = Document::sample();
        let mut state = ColumnState::new(Arc::clone(&document.root));
        state.on_term_click(&TermClick::new("npn", 0));
        state.on_term_click(&TermClick::new("base", 1));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(31, 20)).unwrap();
        draw(&mut terminal, &mut container, &state, None);

        container.scroll_columns(-5);
        assert_eq!(container.first_visible(), 0);
        container.scroll_columns(10);
        assert_eq!(container.first_visible(), 2);
        container.reveal(0);
        assert_eq!(container.first_visible(), 0);
    }

    #[test]
    fn focused_term_is_scrolled_into_view() {
        let chunks: Vec<_> = (0..30)
            .flat_map(|i| {
                [
                    crate::chunk::Chunk::text(format!("line {i}\n")),
                    crate::chunk::Chunk::leaf(format!("t{i}"), format!("term {i}")),
                    crate::chunk::Chunk::text("\n"),
                ]
            })
            .collect();
        let document = Document::new("long", chunks).unwrap();
        let state = ColumnState::new(Arc::clone(&document.root));
        let mut container = ColumnContainer::new(narrow_layout());
        let mut terminal = Terminal::new(TestBackend::new(30, 10)).unwrap();

        let focus = Focus {
            column: 0,
            term_id: Some("t29".to_string()),
        };
        draw(&mut terminal, &mut container, &state, Some(&focus));
        let (_, y) = find_term_cell(&container, "t29", 30, 10);
        assert!(y >= 1 && y < 9);

        container.scroll_column_content(&state, 0, -1000);
        draw(&mut terminal, &mut container, &state, None);
        assert!(container.hit_test(1, 2).is_some());
    }
}
