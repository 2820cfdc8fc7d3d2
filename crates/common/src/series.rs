use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::fill::{fill_missing, FillPolicy};
use crate::{Column, Error, Result};

#[derive(Debug)]
struct SeriesStore {
    index: Vec<DateTime<Utc>>,
    close: Vec<f64>,
    others: BTreeMap<Column, Vec<f64>>,
}

/// Immutable, timestamp-indexed OHLCV table.
///
/// Storage is shared behind an `Arc`; each handle carries its own length, so
/// [`TimeSeries::prefix`] hands out an independent view of the first `n` rows
/// without copying and without any way to reach rows past `n`.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    store: Arc<SeriesStore>,
    len: usize,
}

impl TimeSeries {
    /// Build a series from column names (case-insensitive) and values.
    ///
    /// Fails with `InvalidInputType` when the index is empty, unsorted or has
    /// duplicates, when a column is unknown, repeated or of the wrong length,
    /// when `close` is missing, or when any value is not finite.
    pub fn new(index: Vec<DateTime<Utc>>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut by_column = BTreeMap::new();
        for (name, values) in columns {
            let column = Column::parse(&name).ok_or_else(|| {
                Error::InvalidInputType(format!("unknown input column '{name}'"))
            })?;
            if by_column.insert(column, values).is_some() {
                return Err(Error::InvalidInputType(format!(
                    "column '{column}' given more than once"
                )));
            }
        }
        Self::from_columns(index, by_column)
    }

    pub fn from_columns(
        index: Vec<DateTime<Utc>>,
        mut columns: BTreeMap<Column, Vec<f64>>,
    ) -> Result<Self> {
        if index.is_empty() {
            return Err(Error::InvalidInputType("input series is empty".into()));
        }
        if let Some(pos) = index.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInputType(format!(
                "index must be strictly increasing (violated at row {})",
                pos + 1
            )));
        }

        let close = columns
            .remove(&Column::Close)
            .ok_or_else(|| Error::InvalidInputType("required column 'close' is missing".into()))?;
        check_column(Column::Close, &close, index.len())?;
        for (column, values) in &columns {
            check_column(*column, values, index.len())?;
        }

        let len = index.len();
        Ok(Self {
            store: Arc::new(SeriesStore {
                index,
                close,
                others: columns,
            }),
            len,
        })
    }

    /// Series on a daily index starting at the Unix epoch, for synthetic data.
    pub fn daily(columns: Vec<(Column, Vec<f64>)>) -> Result<Self> {
        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let index = (0..len).map(|i| start + Duration::days(i as i64)).collect();
        Self::from_columns(index, columns.into_iter().collect())
    }

    /// Read a CSV table: first column is the timestamp, remaining headers are
    /// OHLCV names in any case. Unknown columns are ignored, rows are sorted by
    /// timestamp and empty cells go through `fill`.
    pub fn from_csv_reader<R: Read>(reader: R, fill: FillPolicy) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();

        let mapped: Vec<(usize, Column)> = headers
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, h)| Column::parse(h).map(|c| (i, c)))
            .collect();

        let mut rows: Vec<(DateTime<Utc>, Vec<Option<f64>>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let stamp = record
                .get(0)
                .ok_or_else(|| Error::InvalidInputType("row without timestamp".into()))?;
            let stamp = parse_timestamp(stamp)?;
            let mut values = Vec::with_capacity(mapped.len());
            for (i, column) in &mapped {
                let cell = record.get(*i).unwrap_or("");
                if cell.is_empty() {
                    values.push(None);
                } else {
                    let v = cell.parse::<f64>().map_err(|_| {
                        Error::InvalidInputType(format!("'{cell}' in column '{column}' is not a number"))
                    })?;
                    values.push(if v.is_finite() { Some(v) } else { None });
                }
            }
            rows.push((stamp, values));
        }

        rows.sort_by_key(|(stamp, _)| *stamp);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::InvalidInputType(format!("duplicate timestamp {}", w[0].0)));
        }

        let index: Vec<DateTime<Utc>> = rows.iter().map(|(stamp, _)| *stamp).collect();
        let mut columns = BTreeMap::new();
        for (pos, (_, column)) in mapped.iter().enumerate() {
            let raw: Vec<Option<f64>> = rows.iter().map(|(_, v)| v[pos]).collect();
            let filled = fill_missing(&raw, fill, column.as_str())?;
            if columns.insert(*column, filled).is_some() {
                return Err(Error::InvalidInputType(format!(
                    "column '{column}' given more than once"
                )));
            }
        }

        debug!(rows = index.len(), columns = columns.len(), "Loaded input series");
        Self::from_columns(index, columns)
    }

    pub fn from_csv_path(path: impl AsRef<Path>, fill: FillPolicy) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(file, fill)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.store.index[..self.len]
    }

    pub fn close(&self) -> &[f64] {
        &self.store.close[..self.len]
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        match column {
            Column::Close => Some(self.close()),
            other => self.store.others.get(&other).map(|v| &v[..self.len]),
        }
    }

    pub fn has(&self, column: Column) -> bool {
        self.column(column).is_some()
    }

    /// Like [`TimeSeries::column`] but fails with `InvalidInputType` naming
    /// the consumer that needed the column.
    pub fn require(&self, column: Column, consumer: &str) -> Result<&[f64]> {
        self.column(column).ok_or_else(|| {
            Error::InvalidInputType(format!("{consumer} requires input column '{column}'"))
        })
    }

    /// View of the first `n` rows (clamped to the current length).
    pub fn prefix(&self, n: usize) -> TimeSeries {
        TimeSeries {
            store: Arc::clone(&self.store),
            len: n.min(self.len),
        }
    }

    /// True when both handles view the same backing storage.
    pub fn shares_storage(&self, other: &TimeSeries) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

fn check_column(column: Column, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(Error::InvalidInputType(format!(
            "column '{column}' has {} values, index has {expected}",
            values.len()
        )));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidInputType(format!(
            "column '{column}' has a missing or non-finite value at row {pos}; fill gaps before construction"
        )));
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc());
    }
    Err(Error::InvalidInputType(format!("unparseable timestamp '{raw}'")))
}
