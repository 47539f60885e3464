//! Semantic render styles to terminal styles.

use chatview_render::{Style as ContentStyle, StyledLine};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub fn convert_line(line: StyledLine) -> Line<'static> {
    let spans: Vec<Span<'static>> = line
        .spans
        .into_iter()
        .map(|s| Span::styled(s.text, convert_style(s.style)))
        .collect();
    Line::from(spans)
}

pub fn convert_style(style: ContentStyle) -> Style {
    match style {
        ContentStyle::Plain => Style::default(),
        ContentStyle::User => Style::default().fg(Color::Green),
        ContentStyle::Assistant => Style::default().fg(Color::White),
        ContentStyle::Pending => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        ContentStyle::Failed => Style::default().fg(Color::Red),
        ContentStyle::Muted => Style::default().fg(Color::DarkGray),
        ContentStyle::CodeInline => Style::default().fg(Color::Yellow),
        ContentStyle::CodeBlock => Style::default().fg(Color::Gray),
        ContentStyle::CodeFence => Style::default().fg(Color::DarkGray),
        ContentStyle::Emphasis => Style::default().add_modifier(Modifier::ITALIC),
        ContentStyle::Strong => Style::default().add_modifier(Modifier::BOLD),
        ContentStyle::H1 => Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ContentStyle::H2 => Style::default().add_modifier(Modifier::BOLD),
        ContentStyle::H3 => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        ContentStyle::Link => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
        ContentStyle::BlockQuote => Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
        ContentStyle::ListBullet | ContentStyle::ListNumber => Style::default().fg(Color::Cyan),
        ContentStyle::Rule => Style::default().fg(Color::DarkGray),
        ContentStyle::Keyword => Style::default().fg(Color::Magenta),
        ContentStyle::StringLiteral => Style::default().fg(Color::Green),
        ContentStyle::NumberLiteral => Style::default().fg(Color::LightYellow),
        ContentStyle::Comment => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        ContentStyle::BlockTitle => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        ContentStyle::BlockDescription => Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
        ContentStyle::Button => Style::default()
            .fg(Color::Black)
            .bg(Color::Gray),
        ContentStyle::Input => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::UNDERLINED),
        ContentStyle::ChartTitle => Style::default().add_modifier(Modifier::BOLD),
        ContentStyle::ChartLabel => Style::default().fg(Color::Gray),
        ContentStyle::ChartBar => Style::default().fg(Color::Cyan),
        ContentStyle::ChartAxis | ContentStyle::ChartLegend => Style::default().fg(Color::DarkGray),
        ContentStyle::ErrorLabel => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
        ContentStyle::ErrorText => Style::default().fg(Color::LightRed),
    }
}
