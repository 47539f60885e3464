//! Charts drawn as text.
//!
//! A `ChartSpec` is what generated code asked for; `draw` turns it into
//! styled lines at a given width:
//!
//! - bar charts are horizontal bars, one row per label and series
//! - pie and doughnut charts are bars of each slice's share, with percentages
//! - line charts are sparklines, one row per series

use unicode_width::UnicodeWidthStr;

use crate::style::{Style, StyledLine, StyledSpan};

const SERIES_GLYPHS: [char; 4] = ['█', '▓', '▒', '░'];
const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MIN_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
}

impl ChartKind {
    /// Chart.js type names, plus the close relatives drawn the same way.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bar" | "horizontalbar" | "column" => Some(ChartKind::Bar),
            "line" | "area" | "radar" | "scatter" => Some(ChartKind::Line),
            "pie" | "polararea" => Some(ChartKind::Pie),
            "doughnut" | "donut" => Some(ChartKind::Doughnut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: Option<String>,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            title: None,
            labels: Vec::new(),
            datasets: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.iter().all(|d| d.data.is_empty())
    }

    fn row_count(&self) -> usize {
        self.datasets.iter().map(|d| d.data.len()).max().unwrap_or(0)
    }

    fn label(&self, i: usize) -> String {
        self.labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| (i + 1).to_string())
    }

    pub fn draw(&self, width: usize) -> Vec<StyledLine> {
        let width = width.max(MIN_WIDTH);
        let mut lines = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            lines.push(StyledLine::styled(title, Style::ChartTitle));
        }
        if self.is_empty() {
            lines.push(StyledLine::styled("(no data)", Style::Muted));
            return lines;
        }
        match self.kind {
            ChartKind::Bar => {
                self.draw_bars(width, &mut lines);
                if self.datasets.len() > 1 {
                    lines.push(self.legend());
                }
            }
            ChartKind::Pie | ChartKind::Doughnut => self.draw_shares(width, &mut lines),
            ChartKind::Line => self.draw_lines(width, &mut lines),
        }
        lines
    }

    fn label_width(&self, width: usize) -> usize {
        (0..self.row_count())
            .map(|i| self.label(i).width())
            .max()
            .unwrap_or(0)
            .min(width / 3)
    }

    fn draw_bars(&self, width: usize, lines: &mut Vec<StyledLine>) {
        let values = self.datasets.iter().flat_map(|d| d.data.iter().copied());
        let max = values.clone().filter(|v| v.is_finite()).fold(0.0, f64::max);
        let value_width = values.map(|v| format_value(v).width()).max().unwrap_or(1);
        let label_width = self.label_width(width);
        let bar_width = width.saturating_sub(label_width + value_width + 3).max(1);

        for i in 0..self.row_count() {
            for (series, dataset) in self.datasets.iter().enumerate() {
                let value = dataset.data.get(i).copied().unwrap_or(0.0);
                let label = if series == 0 {
                    fit(&self.label(i), label_width)
                } else {
                    " ".repeat(label_width)
                };
                let glyph = SERIES_GLYPHS[series % SERIES_GLYPHS.len()];
                let len = bar_len(value, max, bar_width);
                lines.push(bar_row(label, len, glyph, &format_value(value)));
            }
        }
    }

    fn draw_shares(&self, width: usize, lines: &mut Vec<StyledLine>) {
        let Some(dataset) = self.datasets.first() else {
            return;
        };
        let total: f64 = dataset.data.iter().filter(|v| **v > 0.0).sum();
        let label_width = self.label_width(width);
        let suffixes: Vec<String> = dataset
            .data
            .iter()
            .map(|v| {
                let pct = if total > 0.0 { v.max(0.0) / total * 100.0 } else { 0.0 };
                format!("{} ({pct:.1}%)", format_value(*v))
            })
            .collect();
        let suffix_width = suffixes.iter().map(|s| s.width()).max().unwrap_or(0);
        let bar_width = width.saturating_sub(label_width + suffix_width + 3).max(1);

        for (i, (value, suffix)) in dataset.data.iter().zip(&suffixes).enumerate() {
            let label = fit(&self.label(i), label_width);
            let glyph = SERIES_GLYPHS[0];
            lines.push(bar_row(label, bar_len(*value, total, bar_width), glyph, suffix));
        }
    }

    fn draw_lines(&self, width: usize, lines: &mut Vec<StyledLine>) {
        let named = self.datasets.len() > 1;
        let name_width = if named {
            self.datasets
                .iter()
                .enumerate()
                .map(|(i, d)| series_name(d, i).width())
                .max()
                .unwrap_or(0)
                .min(width / 3)
        } else {
            0
        };
        let gutter = if named { name_width + 1 } else { 0 };
        let spark_width = width.saturating_sub(gutter).max(1);

        let finite = || {
            self.datasets
                .iter()
                .flat_map(|d| d.data.iter().copied())
                .filter(|v| v.is_finite())
        };
        let min = finite().fold(f64::INFINITY, f64::min);
        let max = finite().fold(f64::NEG_INFINITY, f64::max);

        let mut drawn = 0;
        for (i, dataset) in self.datasets.iter().enumerate() {
            let points = sample(&dataset.data, spark_width);
            drawn = drawn.max(points.len());
            let spark: String = points.iter().map(|v| spark_glyph(*v, min, max)).collect();
            let mut spans = Vec::new();
            if named {
                spans.push(StyledSpan::new(
                    format!("{} ", fit(&series_name(dataset, i), name_width)),
                    Style::ChartLegend,
                ));
            }
            spans.push(StyledSpan::new(spark, Style::ChartBar));
            lines.push(StyledLine { spans });
        }

        let indent = " ".repeat(gutter);
        if let (Some(first), Some(last)) = (self.labels.first(), self.labels.last())
            && self.labels.len() > 1
        {
            let gap = drawn.saturating_sub(first.width() + last.width()).max(1);
            lines.push(StyledLine::styled(
                format!("{indent}{first}{}{last}", " ".repeat(gap)),
                Style::ChartAxis,
            ));
        }
        if min.is_finite() {
            lines.push(StyledLine::styled(
                format!("{indent}min {} · max {}", format_value(min), format_value(max)),
                Style::ChartAxis,
            ));
        }
    }

    fn legend(&self) -> StyledLine {
        let mut spans = Vec::new();
        for (i, dataset) in self.datasets.iter().enumerate() {
            if i > 0 {
                spans.push(StyledSpan::new("  ", Style::Plain));
            }
            let glyph = SERIES_GLYPHS[i % SERIES_GLYPHS.len()];
            spans.push(StyledSpan::new(
                format!("{glyph} {}", series_name(dataset, i)),
                Style::ChartLegend,
            ));
        }
        StyledLine { spans }
    }
}

fn series_name(dataset: &Dataset, i: usize) -> String {
    dataset
        .label
        .clone()
        .unwrap_or_else(|| format!("Series {}", i + 1))
}

fn bar_len(value: f64, scale: f64, bar_width: usize) -> usize {
    if !(value > 0.0 && scale > 0.0) {
        return 0;
    }
    let len = ((value / scale) * bar_width as f64).round() as usize;
    len.clamp(1, bar_width)
}

fn bar_row(label: String, len: usize, glyph: char, suffix: &str) -> StyledLine {
    StyledLine {
        spans: vec![
            StyledSpan::new(label, Style::ChartLabel),
            StyledSpan::new(" │", Style::ChartAxis),
            StyledSpan::new(glyph.to_string().repeat(len), Style::ChartBar),
            StyledSpan::new(format!(" {suffix}"), Style::ChartLabel),
        ],
    }
}

fn spark_glyph(value: f64, min: f64, max: f64) -> char {
    if !value.is_finite() {
        return ' ';
    }
    if max <= min {
        return SPARKS[SPARKS.len() / 2];
    }
    let idx = ((value - min) / (max - min) * (SPARKS.len() - 1) as f64).round() as usize;
    SPARKS[idx.min(SPARKS.len() - 1)]
}

/// Evenly picks at most `width` points.
fn sample(data: &[f64], width: usize) -> Vec<f64> {
    if data.len() <= width {
        return data.to_vec();
    }
    (0..width).map(|i| data[i * data.len() / width]).collect()
}

/// Truncates with an ellipsis and pads to exactly `width` columns.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    if text.width() > width {
        let mut used = 0;
        for c in text.chars() {
            let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if used + w + 1 > width {
                break;
            }
            out.push(c);
            used += w;
        }
        if width > 0 {
            out.push('…');
        }
    } else {
        out.push_str(text);
    }
    let pad = width.saturating_sub(out.width());
    out.push_str(&" ".repeat(pad));
    out
}

/// Integers print without decimals; everything else with at most two.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.0}");
    }
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::lines_to_text;

    fn bar_spec() -> ChartSpec {
        ChartSpec {
            kind: ChartKind::Bar,
            title: Some("Revenue".into()),
            labels: vec!["Jan".into(), "February".into()],
            datasets: vec![Dataset {
                label: Some("2024".into()),
                data: vec![50.0, 100.0],
            }],
        }
    }

    fn bar_glyphs(line: &StyledLine) -> usize {
        line.spans
            .iter()
            .filter(|s| s.style == Style::ChartBar)
            .map(|s| s.text.chars().count())
            .sum()
    }

    #[test]
    fn test_bar_lengths_are_proportional() {
        let lines = bar_spec().draw(40);
        assert_eq!(lines[0].text(), "Revenue");
        assert_eq!(lines.len(), 3);

        let half = bar_glyphs(&lines[1]);
        let full = bar_glyphs(&lines[2]);
        assert!(full > 0);
        assert!(half.abs_diff(full / 2) <= 1, "{half} vs {full}");
        assert!(lines[2].text().ends_with(" 100"));
        assert!(lines.iter().all(|l| l.text().width() <= 40));
    }

    #[test]
    fn test_multiple_series_get_legend() {
        let mut spec = bar_spec();
        spec.datasets.push(Dataset {
            label: None,
            data: vec![10.0, 20.0],
        });
        let text = lines_to_text(&spec.draw(40));
        assert!(text.contains("█ 2024"));
        assert!(text.contains("▓ Series 2"));
    }

    #[test]
    fn test_pie_shows_percentages() {
        let spec = ChartSpec {
            kind: ChartKind::Pie,
            title: None,
            labels: vec!["a".into(), "b".into()],
            datasets: vec![Dataset {
                label: None,
                data: vec![1.0, 3.0],
            }],
        };
        let text = lines_to_text(&spec.draw(40));
        assert!(text.contains("1 (25.0%)"));
        assert!(text.contains("3 (75.0%)"));
    }

    #[test]
    fn test_line_uses_full_spark_range() {
        let spec = ChartSpec {
            kind: ChartKind::Line,
            title: None,
            labels: vec!["Mon".into(), "Tue".into(), "Wed".into()],
            datasets: vec![Dataset {
                label: None,
                data: vec![1.0, 5.0, 3.0],
            }],
        };
        let lines = spec.draw(30);
        assert_eq!(lines[0].text(), "▁█▄");
        assert!(lines[1].text().starts_with("Mon"));
        assert!(lines[1].text().ends_with("Wed"));
        assert_eq!(lines[2].text(), "min 1 · max 5");
    }

    #[test]
    fn test_empty_chart() {
        let lines = ChartSpec::new(ChartKind::Bar).draw(40);
        assert_eq!(lines_to_text(&lines), "(no data)");
    }

    #[test]
    fn test_fit_truncates_and_pads() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ChartKind::from_name("Doughnut"), Some(ChartKind::Doughnut));
        assert_eq!(ChartKind::from_name("area"), Some(ChartKind::Line));
        assert_eq!(ChartKind::from_name("gantt"), None);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1200.0), "1200");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(1.0 / 3.0), "0.33");
    }
}
