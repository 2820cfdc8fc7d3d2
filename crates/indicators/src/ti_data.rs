use std::sync::Arc;

/// Values computed by an indicator, one or more named columns indexed like the
/// indicator's input. Warm-up rows hold `NaN`.
///
/// Like `TimeSeries`, storage is shared and [`TiData::prefix`] is a cheap
/// length-limited view.
#[derive(Debug, Clone)]
pub struct TiData {
    columns: Arc<Vec<(&'static str, Vec<f64>)>>,
    len: usize,
}

impl TiData {
    /// All columns must have the same length.
    pub fn new(columns: Vec<(&'static str, Vec<f64>)>) -> Self {
        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|(_, v)| v.len() == len));
        Self {
            columns: Arc::new(columns),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| &v[..self.len])
    }

    /// Last `k` values of a column, or `None` when fewer than `k` rows exist.
    pub fn tail(&self, name: &str, k: usize) -> Option<&[f64]> {
        let column = self.column(name)?;
        column.len().checked_sub(k).map(|start| &column[start..])
    }

    pub fn last(&self, name: &str) -> Option<f64> {
        self.tail(name, 1).map(|v| v[0])
    }

    pub fn prefix(&self, n: usize) -> TiData {
        TiData {
            columns: Arc::clone(&self.columns),
            len: n.min(self.len),
        }
    }

    /// First row at which every column holds a finite value.
    pub fn first_complete_row(&self) -> Option<usize> {
        (0..self.len).find(|&i| self.columns.iter().all(|(_, v)| v[i].is_finite()))
    }

    /// Bit-level equality, treating identical `NaN` payloads as equal.
    pub fn bit_eq(&self, other: &TiData) -> bool {
        self.len == other.len
            && self.names().eq(other.names())
            && self.names().all(|name| {
                let a = self.column(name).unwrap_or(&[]);
                let b = other.column(name).unwrap_or(&[]);
                a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            })
    }
}
