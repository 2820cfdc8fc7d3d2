use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use common::{Error, Label, Result};

const DATE_HEADER: &str = "date";
const LABEL_HEADER: &str = "labels";

/// Aligned feature matrix and label vector.
///
/// `rows[i]` has one value per entry of `feature_names` and is labelled
/// `labels[i]`; `index[i]` is the timestamp of the source row.
#[derive(Debug, Clone, PartialEq)]
pub struct MlData {
    pub index: Vec<DateTime<Utc>>,
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl MlData {
    pub fn new(
        index: Vec<DateTime<Utc>>,
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        labels: Vec<Label>,
    ) -> Result<Self> {
        if index.len() != rows.len() || rows.len() != labels.len() {
            return Err(Error::InvalidInputType(format!(
                "index, rows and labels differ in length ({}, {}, {})",
                index.len(),
                rows.len(),
                labels.len()
            )));
        }
        if let Some(pos) = rows.iter().position(|r| r.len() != feature_names.len()) {
            return Err(Error::InvalidInputType(format!(
                "row {pos} has {} values for {} features",
                rows[pos].len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            index,
            feature_names,
            rows,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one feature across all rows.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let pos = self.feature_names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r[pos]).collect())
    }

    /// Chronological hold-out split: the last `test_fraction` of the rows
    /// (rounded up) becomes the test set. Nothing is shuffled.
    pub fn split(&self, test_fraction: f64) -> Result<(MlData, MlData)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Error::invalid_value(
                "split",
                "test_fraction",
                test_fraction,
                "a fraction in (0, 1)",
            ));
        }
        let n = self.len();
        let test_len = (n as f64 * test_fraction).ceil() as usize;
        if n < 2 || test_len >= n {
            return Err(Error::InsufficientHistory {
                what: "train/test split".into(),
                required: 2,
                available: n,
            });
        }
        let cut = n - test_len;
        Ok((self.slice(0, cut), self.slice(cut, n)))
    }

    fn slice(&self, from: usize, to: usize) -> MlData {
        MlData {
            index: self.index[from..to].to_vec(),
            feature_names: self.feature_names.clone(),
            rows: self.rows[from..to].to_vec(),
            labels: self.labels[from..to].to_vec(),
        }
    }

    /// Header `date,<features...>,labels`; one line per row, timestamps in
    /// RFC 3339 and labels as their integer codes.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.feature_names.len() + 2);
        header.push(DATE_HEADER.to_string());
        header.extend(self.feature_names.iter().cloned());
        header.push(LABEL_HEADER.to_string());
        wtr.write_record(&header)?;

        for ((stamp, row), label) in self.index.iter().zip(&self.rows).zip(&self.labels) {
            let mut record = Vec::with_capacity(row.len() + 2);
            record.push(stamp.to_rfc3339());
            record.extend(row.iter().map(|v| v.to_string()));
            record.push(label.code().to_string());
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_csv(file)?;
        debug!(path = %path.as_ref().display(), rows = self.len(), "Saved ML data");
        Ok(())
    }

    /// Inverse of [`MlData::write_csv`].
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if header.len() < 2
            || !header[0].eq_ignore_ascii_case(DATE_HEADER)
            || !header[header.len() - 1].eq_ignore_ascii_case(LABEL_HEADER)
        {
            return Err(Error::InvalidInputType(format!(
                "ML data header must be '{DATE_HEADER},<features...>,{LABEL_HEADER}'"
            )));
        }
        let feature_names = header[1..header.len() - 1].to_vec();

        let mut index = Vec::new();
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or("");

            let stamp = DateTime::parse_from_rfc3339(cell(0))
                .map_err(|_| {
                    Error::InvalidInputType(format!("row {line}: bad timestamp '{}'", cell(0)))
                })?
                .with_timezone(&Utc);

            let row = (1..=feature_names.len())
                .map(|i| {
                    cell(i).parse::<f64>().map_err(|_| {
                        Error::InvalidInputType(format!(
                            "row {line}: '{}' in column '{}' is not a number",
                            cell(i),
                            header[i]
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let raw_label = cell(header.len() - 1);
            let label = raw_label
                .parse::<u8>()
                .ok()
                .and_then(Label::from_code)
                .ok_or_else(|| {
                    Error::InvalidInputType(format!("row {line}: invalid label '{raw_label}'"))
                })?;

            index.push(stamp);
            rows.push(row);
            labels.push(label);
        }

        Self::new(index, feature_names, rows, labels)
    }

    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_csv(file)
    }
}
