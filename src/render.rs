use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::chunk::Chunk;
use crate::columns::Highlights;
use crate::theme::Theme;

const TAB_WIDTH: usize = 4;

/// Screen region occupied by a term, relative to the rendered lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermHotspot {
    pub term_id: String,
    pub line: usize,
    pub start: u16,
    pub end: u16,
}

impl TermHotspot {
    pub fn contains(&self, line: usize, column: u16) -> bool {
        self.line == line && column >= self.start && column < self.end
    }
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub hotspots: Vec<TermHotspot>,
    pub total_lines: usize,
}

impl RenderResult {
    pub fn term_at(&self, line: usize, column: u16) -> Option<&str> {
        self.hotspots
            .iter()
            .find(|hotspot| hotspot.contains(line, column))
            .map(|hotspot| hotspot.term_id.as_str())
    }

    /// First line on which `term_id` is drawn.
    pub fn line_of(&self, term_id: &str) -> Option<usize> {
        self.hotspots
            .iter()
            .find(|hotspot| hotspot.term_id == term_id)
            .map(|hotspot| hotspot.line)
    }
}

/// Lay out `chunks` as word-wrapped inline text. Every term, leaf or not,
/// produces a hotspot; whether activating it does anything is decided by the
/// column state.
pub fn render_chunks(
    chunks: &[Chunk],
    width: usize,
    highlights: &Highlights,
    focused: Option<&str>,
    theme: &Theme,
) -> RenderResult {
    let mut term_ids = Vec::new();
    let mut fragments = Vec::new();
    for chunk in chunks {
        match chunk {
            Chunk::Text(text) => {
                tokenize_text(text, theme.text_style(), None, &mut fragments);
            }
            Chunk::Term(term) => {
                let mut style = match highlights.get(&term.id) {
                    Some(accent) => theme.highlighted_term_style(*accent),
                    None => theme.term_style(),
                };
                if focused == Some(term.id.as_str()) {
                    style = style.add_modifier(theme.focus_modifier());
                }
                term_ids.push(term.id.clone());
                tokenize_text(&term.label, style, Some(term_ids.len() - 1), &mut fragments);
            }
        }
    }

    let outputs = wrap_fragments(&fragments, width.max(1));
    finish(outputs, &term_ids)
}

fn finish(outputs: Vec<LineOutput>, term_ids: &[String]) -> RenderResult {
    let mut lines = Vec::with_capacity(outputs.len());
    let mut hotspots = Vec::new();
    for (line_index, output) in outputs.into_iter().enumerate() {
        for region in output.regions {
            hotspots.push(TermHotspot {
                term_id: term_ids[region.term].clone(),
                line: line_index,
                start: region.start,
                end: region.end,
            });
        }
        let spans: Vec<Span<'static>> = output
            .spans
            .into_iter()
            .map(|segment| Span::styled(segment.text, segment.style))
            .collect();
        lines.push(Line::from(spans));
    }
    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    let total_lines = lines.len();
    RenderResult {
        lines,
        hotspots,
        total_lines,
    }
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone, Copy)]
struct TermRegion {
    term: usize,
    start: u16,
    end: u16,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    regions: Vec<TermRegion>,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    term: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

fn tokenize_text(text: &str, style: Style, term: Option<usize>, fragments: &mut Vec<FragmentItem>) {
    let mut builder: Option<TokenBuilder> = None;
    for ch in text.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                if let Some(token) = builder.take() {
                    fragments.push(FragmentItem::Token(token.finish()));
                }
                fragments.push(FragmentItem::LineBreak);
                continue;
            }
            _ => {}
        }

        let (actual, repeat) = if ch == '\t' { (' ', TAB_WIDTH) } else { (ch, 1) };
        let is_whitespace = actual.is_whitespace();
        for _ in 0..repeat {
            match builder.as_mut() {
                Some(current) if current.kind_matches(is_whitespace) => current.push_char(actual),
                _ => {
                    if let Some(existing) = builder.take() {
                        fragments.push(FragmentItem::Token(existing.finish()));
                    }
                    let mut next = TokenBuilder::new(style, is_whitespace, term);
                    next.push_char(actual);
                    builder = Some(next);
                }
            }
        }
    }

    if let Some(token) = builder {
        fragments.push(FragmentItem::Token(token.finish()));
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    term: Option<usize>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool, term: Option<usize>) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            term,
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            term: self.term,
        }
    }
}

fn wrap_fragments(fragments: &[FragmentItem], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new();
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > 0 && builder.width + whitespace_width + token.width > width {
                        // Whitespace at a wrap point is dropped.
                        pending_whitespace.clear();
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new();
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    regions: Vec<TermRegion>,
    width: usize,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            regions: Vec::new(),
            width: 0,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        if fragment.text.is_empty() {
            return;
        }
        let start = self.width as u16;
        self.width += fragment.width;
        let end = self.width as u16;

        if let Some(term) = fragment.term {
            match self.regions.last_mut() {
                Some(region) if region.term == term && region.end == start => region.end = end,
                _ => self.regions.push(TermRegion { term, start, end }),
            }
        }

        match self.segments.last_mut() {
            Some(segment) if segment.style == fragment.style => segment.text.push_str(&fragment.text),
            _ => self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            }),
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            regions: self.regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::style::{Color, Modifier};

    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn sample() -> Vec<Chunk> {
        vec![
            Chunk::text("An "),
            Chunk::term("npn", "NPN transistor", vec![Chunk::text("three layers")]),
            Chunk::text(" is a "),
            Chunk::leaf("ccs", "switch"),
            Chunk::text("."),
        ]
    }

    #[test]
    fn renders_text_and_terms_inline() {
        let theme = Theme::default();
        let render = render_chunks(&sample(), 80, &Highlights::new(), None, &theme);
        assert_eq!(render.total_lines, 1);
        assert_eq!(line_text(&render.lines[0]), "An NPN transistor is a switch.");
        assert_eq!(render.term_at(0, 3), Some("npn"));
        assert_eq!(render.term_at(0, 16), Some("npn"));
        assert_eq!(render.term_at(0, 17), None);
        assert_eq!(render.term_at(0, 23), Some("ccs"));
        assert_eq!(render.term_at(0, 0), None);
    }

    #[test]
    fn leaf_terms_look_like_other_terms() {
        let theme = Theme::default();
        let render = render_chunks(&sample(), 80, &Highlights::new(), None, &theme);
        let styles: Vec<Style> = render.lines[0]
            .spans
            .iter()
            .filter(|span| span.content == "NPN transistor" || span.content == "switch")
            .map(|span| span.style)
            .collect();
        assert_eq!(styles, vec![theme.term_style(), theme.term_style()]);
    }

    #[test]
    fn highlighted_term_uses_accent_and_tint() {
        let theme = Theme::default();
        let accent = Color::Rgb(0x10, 0xb9, 0x81);
        let mut highlights = Highlights::new();
        highlights.insert("npn".to_string(), accent);
        let render = render_chunks(&sample(), 80, &highlights, None, &theme);

        let span = render.lines[0]
            .spans
            .iter()
            .find(|span| span.content == "NPN transistor")
            .unwrap();
        assert_eq!(span.style.fg, Some(accent));
        assert_eq!(span.style.bg, Some(theme.tint(accent, theme.highlight_alpha)));
    }

    #[test]
    fn focused_term_is_emphasised() {
        let theme = Theme::default();
        let render = render_chunks(&sample(), 80, &Highlights::new(), Some("ccs"), &theme);
        let span = render.lines[0]
            .spans
            .iter()
            .find(|span| span.content == "switch")
            .unwrap();
        assert!(span.style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn wraps_and_tracks_hotspots_per_line() {
        let theme = Theme::default();
        let render = render_chunks(&sample(), 12, &Highlights::new(), None, &theme);
        let text: Vec<String> = render.lines.iter().map(line_text).collect();
        assert_eq!(text, vec!["An NPN", "transistor", "is a switch."]);

        let npn: Vec<_> = render
            .hotspots
            .iter()
            .filter(|hotspot| hotspot.term_id == "npn")
            .map(|hotspot| (hotspot.line, hotspot.start, hotspot.end))
            .collect();
        assert_eq!(npn, vec![(0, 3, 6), (1, 0, 10)]);
        assert_eq!(render.line_of("ccs"), Some(2));
    }

    #[test]
    fn newlines_and_tabs_in_text() {
        let theme = Theme::default();
        let chunks = vec![Chunk::text("one\n\ttwo")];
        let render = render_chunks(&chunks, 40, &Highlights::new(), None, &theme);
        let text: Vec<String> = render.lines.iter().map(line_text).collect();
        assert_eq!(text, vec!["one", "    two"]);
    }

    #[test]
    fn empty_content_renders_one_blank_line() {
        let theme = Theme::default();
        let render = render_chunks(&[], 10, &Highlights::new(), None, &theme);
        assert_eq!(render.total_lines, 1);
        assert!(render.hotspots.is_empty());
    }
}
