//! Markdown rendering: headers and aligned tables.
//!
//! # Example
//!
//! ```
//! use shmake::markdown::{Align, Table};
//!
//! let table = Table::new(["Header 1", "Header 2"])
//!     .aligns([Align::Left, Align::Right])
//!     .row(["1", "2"]);
//!
//! assert_eq!(
//!     table.render(),
//!     "| Header 1 | Header 2 |\n| -------- | -------: |\n| 1        | 2        |\n"
//! );
//! ```

/// Column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
}

/// Header level, `#` through `####`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderLevel {
    #[default]
    H1,
    H2,
    H3,
    H4,
}

impl HeaderLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::H1 => "#",
            Self::H2 => "##",
            Self::H3 => "###",
            Self::H4 => "####",
        }
    }
}

/// A header line, including its trailing newline.
pub fn header(text: &str, level: HeaderLevel) -> String {
    format!("{} {}\n", level.prefix(), text)
}

pub fn h1(text: &str) -> String {
    header(text, HeaderLevel::H1)
}

pub fn h2(text: &str) -> String {
    header(text, HeaderLevel::H2)
}

pub fn h3(text: &str) -> String {
    header(text, HeaderLevel::H3)
}

pub fn h4(text: &str) -> String {
    header(text, HeaderLevel::H4)
}

/// Anything usable as a table cell. `None` renders as an empty cell.
pub trait IntoCell {
    fn into_cell(self) -> Option<String>;
}

impl IntoCell for &str {
    fn into_cell(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoCell for String {
    fn into_cell(self) -> Option<String> {
        Some(self)
    }
}

impl IntoCell for &String {
    fn into_cell(self) -> Option<String> {
        Some(self.clone())
    }
}

impl<T: IntoCell> IntoCell for Option<T> {
    fn into_cell(self) -> Option<String> {
        self.and_then(IntoCell::into_cell)
    }
}

/// A markdown table.
///
/// Columns are as wide as their widest cell, measured in UTF-8 bytes;
/// cells are padded to that width in characters. Alignments beyond the given
/// ones default to [`Align::Left`]. Rows may be shorter than the header
/// (missing cells are simply not rendered) or longer (extra cells keep
/// their natural width).
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<Option<String>>,
    aligns: Vec<Align>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create a table with the given headers.
    pub fn new<I, C>(headers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoCell,
    {
        Self {
            headers: headers.into_iter().map(IntoCell::into_cell).collect(),
            aligns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set per-column alignment.
    pub fn aligns(mut self, aligns: impl IntoIterator<Item = Align>) -> Self {
        self.aligns = aligns.into_iter().collect();
        self
    }

    /// Append a row.
    pub fn row<I, C>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoCell,
    {
        self.add_row(row);
        self
    }

    /// Append a row in place.
    pub fn add_row<I, C>(&mut self, row: I)
    where
        I: IntoIterator<Item = C>,
        C: IntoCell,
    {
        self.rows
            .push(row.into_iter().map(IntoCell::into_cell).collect());
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| escape(cell).len())
                    .fold(escape(&self.headers[i]).len(), usize::max)
            })
            .collect()
    }

    /// Render the table, one `\n`-terminated line per row.
    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let mut output = String::new();

        output.push('|');
        for (header, width) in self.headers.iter().zip(&widths) {
            push_cell(&mut output, &escape(header), *width);
        }
        output.push('\n');

        output.push('|');
        for (i, width) in widths.iter().enumerate() {
            let align = self.aligns.get(i).copied().unwrap_or_default();
            let dashes = "-".repeat(width.saturating_sub(2));
            let rule = match align {
                Align::Left => format!("-{}-", dashes),
                Align::Right => format!("-{}:", dashes),
                Align::Center => format!(":{}:", dashes),
            };
            output.push_str(&format!(" {} |", rule));
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, cell) in row.iter().enumerate() {
                let text = escape(cell);
                let width = widths.get(i).copied().unwrap_or(0);
                push_cell(&mut output, &text, width);
            }
            output.push('\n');
        }

        output
    }
}

fn escape(cell: &Option<String>) -> String {
    cell.as_deref()
        .map(|s| s.replace('|', "\\|"))
        .unwrap_or_default()
}

// Widths are UTF-8 byte lengths but padding counts characters, so a
// non-ASCII cell comes out wider than its column.
fn push_cell(output: &mut String, text: &str, width: usize) {
    let padding = width.saturating_sub(text.chars().count());
    output.push(' ');
    output.push_str(text);
    output.push_str(&" ".repeat(padding));
    output.push_str(" |");
}
