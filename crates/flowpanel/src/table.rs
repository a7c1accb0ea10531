use common::types::Month;

/// In-memory table produced by the loader: canonical headers plus string
/// cells, with the MONTH column (when present) parsed out per row.
///
/// Cells stay as strings until a dataset schema coerces them; the table layer
/// carries no numeric semantics of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub month: Option<Month>,
    pub cells: Vec<String>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Vec<String> {
        &mut self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Canonical column names absent from this table.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| (*c).to_string())
            .collect()
    }

    /// Cell text by row and column index; short rows read as empty.
    pub fn cell<'a>(&'a self, row: &'a Row, col: usize) -> &'a str {
        row.cells.get(col).map_or("", String::as_str)
    }

    /// Stable ascending sort by parsed month. Rows without a month keep
    /// their relative order at the front.
    pub fn sort_by_month(&mut self) {
        self.rows.sort_by_key(|r| r.month);
    }
}
