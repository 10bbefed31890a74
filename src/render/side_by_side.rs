//! A two-column terminal renderer.
//!
//! The original binary is drawn on the left and the rebuilt one on the right, one projected row
//! per line:
//!
//! ```text
//! 08000120 │         push {r4, lr}      │ 08000120 │         push {r4, lr}
//!          │                            │ 08000122 │         movs r0, #1
//! ```
//!
//! Each side has a gutter with the line's address followed by the line's content. Changed
//! portions of a line are emphasized, and blank placeholders keep both sides aligned.

use crate::classify::Category;
use crate::compose::{RunCategory, compose};
use crate::diff::{LabelState, LineKind};
use crate::project::ColumnLine;
use crate::render::{
    ADDRESS_WIDTH, ColorDef, DisplayData, Renderer, default_option, format_address, opt_color_def,
};
use crate::state::Status;
use anyhow::Result;
use console::{Color, Style, Term, measure_text_width};
use log::debug;
use logging_timer::time;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::max;
use std::io::Write;
use unicode_segmentation::UnicodeSegmentation;

/// Separates the gutter from a line's content.
const GUTTER_SEPARATOR: &str = "│";
/// Separates the left column from the right column.
const COLUMN_SEPARATOR: &str = "┃";
const HORIZONTAL_LINE: char = '─';
const HEADER_LEFT: &str = "───";

/// Default terminal width when we can't detect it.
const DEFAULT_TERM_WIDTH: usize = 80;

/// Default tab width for expanding tabs, matching the assembler listings.
const DEFAULT_TAB_WIDTH: usize = 8;

/// Indentation of an instruction relative to its label.
const CODE_INDENT: &str = "\t\t";

/// Column widths for a given terminal width.
///
/// ```text
/// [address │ content] ┃ [address │ content]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    left_content_width: usize,
    right_content_width: usize,
}

impl Layout {
    /// " │ " after each gutter.
    const GUTTER_OVERHEAD: usize = ADDRESS_WIDTH + 3;
    /// " ┃ " between the two columns.
    const MIDDLE_SEPARATOR_WIDTH: usize = 3;

    fn calculate(term_width: usize) -> Layout {
        let overhead = Self::GUTTER_OVERHEAD * 2 + Self::MIDDLE_SEPARATOR_WIDTH;
        let available = term_width.saturating_sub(overhead);

        // Give any odd character to the left column.
        Layout {
            left_content_width: available.div_ceil(2).max(1),
            right_content_width: (available / 2).max(1),
        }
    }

    #[cfg(test)]
    fn total_width(&self) -> usize {
        Self::GUTTER_OVERHEAD * 2
            + Self::MIDDLE_SEPARATOR_WIDTH
            + self.left_content_width
            + self.right_content_width
    }
}

/// Expand tabs to spaces, given that the text starts at display column `start_column`.
///
/// Returns the expanded text and the display column after it.
fn expand_tabs(text: &str, tab_width: usize, start_column: usize) -> (Cow<'_, str>, usize) {
    let tab_width = tab_width.max(1);

    if !text.contains('\t') {
        return (Cow::Borrowed(text), start_column + measure_text_width(text));
    }

    let mut result = String::with_capacity(text.len());
    let mut column = start_column;

    for grapheme in text.graphemes(true) {
        if grapheme == "\t" {
            let spaces_needed = tab_width - (column % tab_width);
            result.extend(std::iter::repeat_n(' ', spaces_needed));
            column += spaces_needed;
        } else {
            result.push_str(grapheme);
            column += measure_text_width(grapheme);
        }
    }
    (Cow::Owned(result), column)
}

/// Truncate a string to fit within a maximum display width.
///
/// Returns the truncated string slice and its actual display width. Graphemes are never split.
fn truncate_to_display_width(text: &str, max_width: usize) -> (&str, usize) {
    if max_width == 0 {
        return ("", 0);
    }

    let text_width = measure_text_width(text);
    if text_width <= max_width {
        return (text, text_width);
    }

    let mut current_width = 0;
    let mut last_valid_byte_pos = 0;

    for (byte_pos, grapheme) in text.grapheme_indices(true) {
        let grapheme_width = measure_text_width(grapheme);
        if current_width + grapheme_width > max_width {
            break;
        }
        current_width += grapheme_width;
        last_valid_byte_pos = byte_pos + grapheme.len();
    }

    (&text[..last_valid_byte_pos], current_width)
}

/// A piece of text within a visual row, with the category used to style it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece<'a> {
    category: RunCategory,
    text: Cow<'a, str>,
}

impl<'a> Piece<'a> {
    fn unchanged(text: impl Into<Cow<'a, str>>) -> Self {
        Piece {
            category: RunCategory::Unchanged,
            text: text.into(),
        }
    }
}

/// A single terminal row on one side.
///
/// A projected line can take more than one row, e.g. a labelled instruction puts its label on a
/// row of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VisualRow<'a> {
    address: Option<u64>,
    category: Category,
    pieces: Vec<Piece<'a>>,
}

impl VisualRow<'_> {
    /// An empty row used to pad a side with fewer rows than the other.
    fn filler(category: Category) -> Self {
        VisualRow {
            address: None,
            category,
            pieces: Vec::new(),
        }
    }
}

/// Lay out a projected line into the rows it occupies on screen.
fn visual_rows(entry: &ColumnLine) -> Vec<VisualRow<'_>> {
    let ColumnLine::Line(line) = entry else {
        return vec![VisualRow::filler(Category::Blank)];
    };
    let runs = line
        .changes
        .as_ref()
        .map(|changes| changes.text_runs.as_slice())
        .unwrap_or_default();
    let segments = compose(&line.text, runs).into_iter().map(|segment| Piece {
        category: segment.category,
        text: Cow::Borrowed(segment.text),
    });
    let row = |pieces| VisualRow {
        address: Some(line.address),
        category: line.category,
        pieces,
    };

    match line.kind {
        LineKind::Code => {
            let mut rows = Vec::with_capacity(2);
            if let LabelState::Named(name) = line.label_state() {
                rows.push(row(vec![Piece::unchanged(format!("{name}:"))]));
            }
            rows.push(row(
                std::iter::once(Piece::unchanged(CODE_INDENT)).chain(segments).collect(),
            ));
            rows
        }
        LineKind::Data => {
            let prefix = match line.label_state() {
                LabelState::Named(name) => Some(Piece::unchanged(format!("{name}:\t"))),
                LabelState::Empty | LabelState::Absent => None,
            };
            vec![row(prefix.into_iter().chain(segments).collect())]
        }
        LineKind::Padding => vec![row(segments.collect())],
    }
}

/// A side-by-side renderer for disassembly diffs.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct SideBySide {
    /// Styling for lines that are the same on both sides.
    pub plain: LineStyle,
    /// Styling for lines that only exist in the rebuilt binary.
    pub inserted: LineStyle,
    /// Styling for lines that only exist in the original binary.
    pub deleted: LineStyle,
    /// Background for blank placeholders.
    #[serde(with = "opt_color_def", default = "default_option")]
    pub blank_background: Option<Color>,
    /// Foreground color for addresses in the gutter.
    #[serde(with = "ColorDef")]
    pub gutter: Color,
    /// Whether to print a header with the source of the updates.
    pub show_header: bool,
    /// The width of a tab stop.
    pub tab_width: usize,
}

/// Text style options for one category of line.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct LineStyle {
    /// Foreground color for regular text.
    #[serde(with = "ColorDef")]
    pub foreground: Color,
    /// Background color for the entire line.
    #[serde(with = "opt_color_def", default = "default_option")]
    pub background: Option<Color>,
    /// Foreground color for changed portions of the line.
    #[serde(with = "ColorDef")]
    pub emphasis_foreground: Color,
    /// Background color for changed portions of the line.
    #[serde(with = "opt_color_def", default = "default_option")]
    pub emphasis_background: Option<Color>,
    /// Whether to bold changed portions of the line.
    pub bold: bool,
}

impl Default for SideBySide {
    fn default() -> Self {
        SideBySide {
            plain: LineStyle {
                foreground: Color::White,
                background: None,
                emphasis_foreground: Color::Yellow,
                emphasis_background: Some(Color::Color256(58)),
                bold: true,
            },
            inserted: LineStyle {
                foreground: Color::Green,
                background: Some(Color::Color256(22)),
                emphasis_foreground: Color::White,
                emphasis_background: Some(Color::Color256(28)),
                bold: true,
            },
            deleted: LineStyle {
                foreground: Color::Red,
                background: Some(Color::Color256(52)),
                emphasis_foreground: Color::White,
                emphasis_background: Some(Color::Color256(88)),
                bold: true,
            },
            blank_background: Some(Color::Color256(236)),
            gutter: Color::Color256(240),
            show_header: true,
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }
}

/// Resolved styles for one category of line.
struct LineFormatter {
    regular: Style,
    emphasis: Style,
}

impl LineFormatter {
    fn from_style(style: &LineStyle) -> Self {
        let mut regular = Style::new().fg(style.foreground);
        if let Some(bg) = style.background {
            regular = regular.bg(bg);
        }

        let mut emphasis = Style::new().fg(style.emphasis_foreground);
        if let Some(bg) = style.emphasis_background.or(style.background) {
            emphasis = emphasis.bg(bg);
        }
        if style.bold {
            emphasis = emphasis.bold();
        }
        LineFormatter { regular, emphasis }
    }
}

/// All resolved styles for a render.
struct Formatters {
    plain: LineFormatter,
    inserted: LineFormatter,
    deleted: LineFormatter,
    blank: Style,
    gutter: Style,
}

impl Formatters {
    fn line(&self, category: Category) -> Option<&LineFormatter> {
        match category {
            Category::Plain => Some(&self.plain),
            Category::Inserted => Some(&self.inserted),
            Category::Deleted => Some(&self.deleted),
            Category::Blank => None,
        }
    }

    /// The style for a piece of text on a line of the given category.
    ///
    /// Inserted and deleted text inside an otherwise plain line borrows the emphasis of inserted
    /// and deleted lines.
    fn piece(&self, line: Category, piece: RunCategory) -> &Style {
        let Some(formatter) = self.line(line) else {
            return &self.blank;
        };
        match piece {
            RunCategory::Unchanged => &formatter.regular,
            RunCategory::Changed => &formatter.emphasis,
            RunCategory::Inserted => &self.inserted.emphasis,
            RunCategory::Deleted => &self.deleted.emphasis,
        }
    }

    fn fill(&self, category: Category) -> &Style {
        self.line(category).map_or(&self.blank, |f| &f.regular)
    }
}

impl Renderer for SideBySide {
    #[time("info", "side_by_side::{}")]
    fn render(
        &self,
        writer: &mut dyn Write,
        data: &DisplayData,
        term_info: Option<&Term>,
    ) -> Result<()> {
        let term_width = term_info
            .and_then(|t| t.size_checked())
            .map(|(_, w)| w as usize)
            .unwrap_or(DEFAULT_TERM_WIDTH);
        let layout = Layout::calculate(term_width);
        let formatters = self.formatters();

        if self.show_header {
            self.print_header(writer, data.source, term_width)?;
        }
        self.print_status(writer, &data.status)?;

        let Some(columns) = data.columns else {
            writeln!(writer, "{}", Style::new().dim().apply_to("No diff received yet"))?;
            return Ok(());
        };
        debug!("Rendering {} rows", columns.len());
        self.print_column_titles(writer, &layout, &formatters)?;

        for (left, right) in columns.rows() {
            let left_rows = visual_rows(left);
            let right_rows = visual_rows(right);

            for i in 0..max(left_rows.len(), right_rows.len()) {
                let left_row = left_rows
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| VisualRow::filler(left.category()));
                let right_row = right_rows
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| VisualRow::filler(right.category()));
                writeln!(
                    writer,
                    "{} {} {}",
                    self.format_side(&left_row, &formatters, layout.left_content_width),
                    formatters.gutter.apply_to(COLUMN_SEPARATOR),
                    self.format_side(&right_row, &formatters, layout.right_content_width),
                )?;
            }
        }
        Ok(())
    }
}

impl SideBySide {
    fn formatters(&self) -> Formatters {
        let mut blank = Style::new();
        if let Some(bg) = self.blank_background {
            blank = blank.bg(bg);
        }
        Formatters {
            plain: LineFormatter::from_style(&self.plain),
            inserted: LineFormatter::from_style(&self.inserted),
            deleted: LineFormatter::from_style(&self.deleted),
            blank,
            gutter: Style::new().fg(self.gutter),
        }
    }

    /// Print the header with decorations.
    fn print_header(
        &self,
        writer: &mut dyn Write,
        source: &str,
        term_width: usize,
    ) -> std::io::Result<()> {
        let header_style = Style::new().fg(Color::Blue).bold();
        let decoration_style = Style::new().fg(Color::Blue);
        let rule: String = HORIZONTAL_LINE.to_string().repeat(term_width);

        writeln!(writer, "{}", decoration_style.apply_to(&rule))?;
        writeln!(
            writer,
            "{} {}",
            decoration_style.apply_to(HEADER_LEFT),
            header_style.apply_to(source)
        )?;
        writeln!(writer, "{}", decoration_style.apply_to(&rule))?;
        Ok(())
    }

    /// Print the build status, if there's anything to report.
    fn print_status(&self, writer: &mut dyn Write, status: &Status) -> std::io::Result<()> {
        match status {
            Status::Idle => (),
            Status::Building => {
                writeln!(writer, "{}", Style::new().cyan().apply_to("Building..."))?;
            }
            Status::Matched => {
                writeln!(writer, "{}", Style::new().green().bold().apply_to("Match"))?;
            }
            Status::BuildError(output) => {
                writeln!(writer, "{}", Style::new().red().bold().apply_to("Build error"))?;
                for line in output.lines() {
                    writeln!(writer, "{}", Style::new().red().apply_to(line))?;
                }
            }
            Status::InvalidDiff(reason) => {
                writeln!(writer, "{}", Style::new().red().bold().apply_to("Invalid diff"))?;
                writeln!(writer, "{}", Style::new().red().apply_to(reason))?;
            }
        }
        Ok(())
    }

    fn print_column_titles(
        &self,
        writer: &mut dyn Write,
        layout: &Layout,
        formatters: &Formatters,
    ) -> std::io::Result<()> {
        let title = |name: &str, width: usize| {
            format!(
                "{:gutter$} {} {}",
                "",
                formatters.gutter.apply_to(GUTTER_SEPARATOR),
                Style::new().bold().apply_to(format!("{name:<width$}")),
                gutter = ADDRESS_WIDTH,
            )
        };
        writeln!(
            writer,
            "{} {} {}",
            title("original", layout.left_content_width),
            formatters.gutter.apply_to(COLUMN_SEPARATOR),
            title("rebuilt", layout.right_content_width),
        )
    }

    /// Format the gutter and content of one side of a row, padded to `width`.
    fn format_side(&self, row: &VisualRow, formatters: &Formatters, width: usize) -> String {
        let gutter = match row.address {
            Some(address) => format_address(address),
            None => " ".repeat(ADDRESS_WIDTH),
        };
        format!(
            "{} {} {}",
            formatters.gutter.apply_to(gutter),
            formatters.gutter.apply_to(GUTTER_SEPARATOR),
            self.format_content(row, formatters, width)
        )
    }

    /// Format a row's content with emphasis, truncating or padding it to `width`.
    fn format_content(&self, row: &VisualRow, formatters: &Formatters, width: usize) -> String {
        let mut result = String::new();
        let mut column = 0;

        for piece in &row.pieces {
            if column >= width {
                break;
            }
            let (expanded, _) = expand_tabs(&piece.text, self.tab_width, column);
            let (truncated, piece_width) = truncate_to_display_width(&expanded, width - column);
            if !truncated.is_empty() {
                let style = formatters.piece(row.category, piece.category);
                result.push_str(&style.apply_to(truncated).to_string());
                column += piece_width;
            }
        }

        if column < width {
            let fill = " ".repeat(width - column);
            result.push_str(&formatters.fill(row.category).apply_to(fill).to_string());
        }
        result
    }
}
