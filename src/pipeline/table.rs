//! In-memory CSV table: ordered headers, ordered rows of raw cell text.

use crate::error::{Result, ScraperError};
use std::collections::HashSet;
use std::path::Path;

/// Stand-in source name for tables not read from a file.
const IN_MEMORY_SOURCE: &str = "<in-memory table>";

fn check_unique_headers(headers: &[String], source: &Path) -> Result<()> {
    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(ScraperError::DuplicateColumn {
                column: header.clone(),
                path: source.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// A cell interpreted the way the transform sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Empty,
    Number(f64),
    Text(&'a str),
}

impl<'a> Cell<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct StatRow<'a> {
    table: &'a StatTable,
    index: usize,
}

impl<'a> StatRow<'a> {
    pub fn raw(&self, column: &str) -> Option<&'a str> {
        let col = self.table.column_index(column)?;
        Some(self.table.rows[self.index][col].as_str())
    }

    pub fn get(&self, column: &str) -> Option<Cell<'a>> {
        self.raw(column).map(Cell::parse)
    }
}

impl StatTable {
    /// Build a table; headers must be unique and every row must have one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        Self::build(headers, rows, Path::new(IN_MEMORY_SOURCE))
    }

    fn build(headers: Vec<String>, rows: Vec<Vec<String>>, source: &Path) -> Result<Self> {
        check_unique_headers(&headers, source)?;
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
            return Err(ScraperError::InvalidValue {
                column: "<row width>".into(),
                row: i,
                value: format!("{} cells for {} headers", row.len(), headers.len()),
            });
        }
        Ok(Self { headers, rows })
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Self::read_from(reader, Path::new(IN_MEMORY_SOURCE))
    }

    fn read_from<R: std::io::Read>(reader: R, source: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::build(headers, rows, source)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScraperError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::read_from(std::fs::File::open(path)?, path)
    }

    pub fn write_to<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        self.write_to(std::fs::File::create(path)?)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn row(&self, index: usize) -> Option<StatRow<'_>> {
        (index < self.rows.len()).then_some(StatRow { table: self, index })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = StatRow<'_>> {
        (0..self.rows.len()).map(move |index| StatRow { table: self, index })
    }

    /// Interpreted cells of one column, top to bottom.
    pub fn column_cells(&self, col: usize) -> impl Iterator<Item = Cell<'_>> {
        self.rows.iter().map(move |r| Cell::parse(&r[col]))
    }

    /// Numeric when every non-empty cell is a number and at least one is present.
    pub fn is_numeric_column(&self, col: usize) -> bool {
        let mut any = false;
        for cell in self.column_cells(col) {
            match cell {
                Cell::Number(_) => any = true,
                Cell::Empty => {}
                Cell::Text(_) => return false,
            }
        }
        any
    }

    /// Keep only the named columns, in the given order. Unknown names are ignored.
    pub fn select_columns(&self, columns: &[&str]) -> Self {
        let indices: Vec<usize> = columns.iter().filter_map(|c| self.column_index(c)).collect();
        Self {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Drop columns by name; returns the names that were actually present.
    pub fn drop_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Vec<String> {
        let doomed: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| columns.iter().any(|c| c.as_ref() == h.as_str()))
            .map(|(i, _)| i)
            .collect();
        let removed = doomed.iter().map(|&i| self.headers[i].clone()).collect();
        let keep = |i: &usize| !doomed.contains(i);
        let keep_indices: Vec<usize> = (0..self.headers.len()).filter(keep).collect();
        *self = Self {
            headers: keep_indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep_indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        };
        removed
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Stable sort by the raw text of one column.
    pub fn sort_by_column(&mut self, col: usize) {
        self.rows.sort_by(|a, b| a[col].cmp(&b[col]));
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<String>] {
        &mut self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}Name,Team,PA,AVG\n\"Doe, J\",SEA,50,.250\nSmith,NYY,,x\n";

    #[test]
    fn test_reads_headers_without_bom_and_quoted_fields() {
        let table = StatTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["Name", "Team", "PA", "AVG"]);
        assert_eq!(table.row(0).unwrap().raw("Name"), Some("Doe, J"));
        assert_eq!(table.row(0).unwrap().get("AVG"), Some(Cell::Number(0.25)));
        assert_eq!(table.row(1).unwrap().get("PA"), Some(Cell::Empty));
    }

    #[test]
    fn test_numeric_column_detection() {
        let table = StatTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(table.is_numeric_column(2));
        assert!(!table.is_numeric_column(3));
        assert!(!table.is_numeric_column(0));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = StatTable::from_reader("a,b\n1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ScraperError::Csv(_)));
    }

    #[test]
    fn test_repeated_header_rejected_with_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Hitting_2025-03-01_to_2025-04-17.csv");
        std::fs::write(&path, "Team,Name,PA,HR,HR\nSEA,A,20,1,100\nNYY,B,30,2,200\n").unwrap();

        let err = StatTable::from_csv_path(&path).unwrap_err();
        match err {
            ScraperError::DuplicateColumn { column, path: source } => {
                assert_eq!(column, "HR");
                assert_eq!(source, path);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_repeated_header() {
        let headers = vec!["Team".to_string(), "Team".to_string()];
        let err = StatTable::new(headers, vec![]).unwrap_err();
        assert!(matches!(err, ScraperError::DuplicateColumn { ref column, .. } if column == "Team"));
    }

    #[test]
    fn test_drop_columns_reports_only_present() {
        let mut table = StatTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let removed = table.drop_columns(&["AVG", "PlayerId"]);
        assert_eq!(removed, vec!["AVG".to_string()]);
        assert_eq!(table.headers(), ["Name", "Team", "PA"]);
        assert_eq!(table.rows()[0].len(), 3);
    }

    #[test]
    fn test_write_quotes_fields_with_commas() {
        let table = StatTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        table.select_columns(&["Team", "Name"]).write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Team,Name\nSEA,\"Doe, J\"\nNYY,Smith\n"
        );
    }
}
