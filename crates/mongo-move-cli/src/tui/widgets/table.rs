//! Paginated, filterable table with a highlighted row.
//!
//! Rows carry a `key` chosen by the owner (a pool or list index). The table
//! never interprets it; selecting a row just reports the key back.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

/// Smallest page size accepted by [`SelectableTable::set_page_size`].
pub const MIN_PAGE_SIZE: usize = 1;

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub key: usize,
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn new(key: usize, cells: Vec<String>) -> Self {
        Self { key, cells }
    }
}

/// Table state: rows, filter, cursor and page size.
#[derive(Debug, Clone)]
pub struct SelectableTable {
    title: String,
    headers: Vec<&'static str>,
    rows: Vec<TableRow>,
    filter: String,
    /// Index into the filtered rows.
    cursor: usize,
    page_size: usize,
    pub focused: bool,
    pub filtering: bool,
}

impl SelectableTable {
    pub fn new(title: impl Into<String>, headers: Vec<&'static str>, page_size: usize) -> Self {
        Self {
            title: title.into(),
            headers,
            rows: Vec::new(),
            filter: String::new(),
            cursor: 0,
            page_size: page_size.max(MIN_PAGE_SIZE),
            focused: false,
            filtering: false,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_headers(&mut self, headers: Vec<&'static str>) {
        self.headers = headers;
    }

    /// Replace the rows, keeping the cursor in range.
    pub fn set_rows(&mut self, rows: Vec<TableRow>) {
        self.rows = rows;
        self.clamp_cursor();
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Rows matching the filter (case-insensitive match on the first cell).
    pub fn visible(&self) -> Vec<&TableRow> {
        if self.filter.is_empty() {
            return self.rows.iter().collect();
        }
        let needle = self.filter.to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                row.cells
                    .first()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Key of the highlighted row.
    pub fn selected_key(&self) -> Option<usize> {
        self.visible().get(self.cursor).map(|row| row.key)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.visible().len() {
            self.cursor += 1;
        }
    }

    pub fn next_page(&mut self) {
        if self.page() + 1 < self.page_count() {
            self.cursor = (self.page() + 1) * self.page_size;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page() > 0 {
            self.cursor = (self.page() - 1) * self.page_size;
        }
    }

    /// Zero-based page of the cursor.
    pub fn page(&self) -> usize {
        self.cursor / self.page_size
    }

    /// Number of pages; an empty table still has one.
    pub fn page_count(&self) -> usize {
        self.visible().len().div_ceil(self.page_size).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(MIN_PAGE_SIZE);
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.cursor = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.clamp_cursor();
    }

    /// Drop the filter. Returns false when there was none.
    pub fn clear_filter(&mut self) -> bool {
        self.filtering = false;
        if self.filter.is_empty() {
            return false;
        }
        self.filter.clear();
        self.clamp_cursor();
        true
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }

    /// Draw the current page.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let visible = self.visible();
        let start = self.page() * self.page_size;
        let end = (start + self.page_size).min(visible.len());
        let highlight = Style::default()
            .bg(if self.focused { Color::Blue } else { Color::DarkGray })
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);

        let rows: Vec<Row> = visible
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells = row.cells.iter().map(|c| Cell::from(c.as_str()));
                let style = if start + i == self.cursor {
                    highlight
                } else {
                    Style::default()
                };
                Row::new(cells).style(style)
            })
            .collect();

        let columns = self.headers.len().max(1) as u32;
        let widths = vec![Constraint::Ratio(1, columns); columns as usize];

        let mut footer = format!(" Page {}/{} ", self.page() + 1, self.page_count());
        if self.filtering || !self.filter.is_empty() {
            footer.push_str(&format!("| /{} ", self.filter));
        }

        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let table = Table::new(rows, widths)
            .header(
                Row::new(self.headers.iter().copied())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style)
                    .title(format!(" {} ", self.title))
                    .title_bottom(Line::from(footer)),
            );

        frame.render_widget(table, area);
    }
}
