use ratatui::style::{Color, Modifier, Style};

/// Accent colors assigned to columns by position.
pub const ACCENT_PALETTE: [Color; 8] = [
    Color::Rgb(0x3b, 0x82, 0xf6), // blue
    Color::Rgb(0x10, 0xb9, 0x81), // green
    Color::Rgb(0xf5, 0x9e, 0x0b), // amber
    Color::Rgb(0xef, 0x44, 0x44), // red
    Color::Rgb(0x8b, 0x5c, 0xf6), // purple
    Color::Rgb(0xec, 0x48, 0x99), // pink
    Color::Rgb(0x06, 0xb6, 0xd4), // cyan
    Color::Rgb(0x84, 0xcc, 0x16), // lime
];

/// Accent color for the column at `index`. Depends on nothing but the index.
pub fn accent_for(index: usize) -> Color {
    ACCENT_PALETTE[index % ACCENT_PALETTE.len()]
}

/// Theme configuration for the column view
#[derive(Clone, Debug)]
pub struct Theme {
    /// Color that accent tints are blended against
    pub background: Color,

    /// Foreground color for literal text
    pub text_fg: Color,

    /// Foreground color for terms that are not highlighted
    pub term_fg: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the document title in the status bar
    pub title_color: Color,

    /// Opacity of the accent tint behind a highlighted term
    pub highlight_alpha: f32,

    /// Opacity of the accent tint on column borders
    pub border_alpha: f32,

    /// Opacity of the accent tint filling a column
    pub column_alpha: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(0x1e, 0x1e, 0x1e),
            text_fg: Color::Gray,
            term_fg: Color::White,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            title_color: Color::LightYellow,
            highlight_alpha: 0.25,
            border_alpha: 0.6,
            column_alpha: 0.08,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style for literal (non-clickable) text
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text_fg)
    }

    /// Style for a term that is not represented by an open column
    pub fn term_style(&self) -> Style {
        Style::default()
            .fg(self.term_fg)
            .add_modifier(Modifier::UNDERLINED)
    }

    /// Style for a term whose expansion is open in the column to its right
    pub fn highlighted_term_style(&self, accent: Color) -> Style {
        Style::default()
            .fg(accent)
            .bg(self.tint(accent, self.highlight_alpha))
            .add_modifier(Modifier::UNDERLINED)
    }

    /// Extra emphasis for the term that has keyboard focus
    pub fn focus_modifier(&self) -> Modifier {
        Modifier::REVERSED | Modifier::BOLD
    }

    /// Border style for a column with the given accent
    pub fn column_border_style(&self, accent: Color) -> Style {
        Style::default().fg(self.tint(accent, self.border_alpha))
    }

    /// Fill style for a column with the given accent
    pub fn column_style(&self, accent: Color) -> Style {
        Style::default().bg(self.tint(accent, self.column_alpha))
    }

    /// Title style for a column header
    pub fn column_title_style(&self, accent: Color) -> Style {
        Style::default().fg(accent).add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title_color)
    }

    /// Blend `color` over the theme background at `alpha`. Non-RGB colors
    /// are returned unchanged.
    pub fn tint(&self, color: Color, alpha: f32) -> Color {
        match (color, self.background) {
            (Color::Rgb(r, g, b), Color::Rgb(br, bg, bb)) => {
                let alpha = alpha.clamp(0.0, 1.0);
                let mix = |fg: u8, bg: u8| -> u8 {
                    (f32::from(fg) * alpha + f32::from(bg) * (1.0 - alpha)).round() as u8
                };
                Color::Rgb(mix(r, br), mix(g, bg), mix(b, bb))
            }
            _ => color,
        }
    }
}
