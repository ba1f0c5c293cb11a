//! Query records: the raw input to an explainer.

use chrono::NaiveDate;

/// One (catchment, time window) query as an ordered name -> value mapping.
///
/// Numeric columns and date columns live side by side; explainers read the
/// numeric features directly and derive `year` / `day_of_year` from the date
/// columns during assembly. Insertion order is preserved, but explainers
/// realign columns into their own canonical row order, so callers may insert
/// in any order. Inserting an existing name overwrites its value.
#[derive(Debug, Clone, Default)]
pub struct QueryRecord {
    values: Vec<(String, f64)>,
    dates: Vec<(String, NaiveDate)>,
}

impl QueryRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a numeric column.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    /// Set a date column.
    pub fn insert_date(&mut self, name: impl Into<String>, date: NaiveDate) {
        let name = name.into();
        match self.dates.iter_mut().find(|(n, _)| *n == name) {
            Some((_, d)) => *d = date,
            None => self.dates.push((name, date)),
        }
    }

    /// Set a numeric column (builder form).
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a date column (builder form).
    pub fn with_date(mut self, name: impl Into<String>, date: NaiveDate) -> Self {
        self.insert_date(name, date);
        self
    }

    /// Numeric value by column name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Date value by column name.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.dates.iter().find(|(n, _)| n == name).map(|(_, d)| *d)
    }

    /// Required numeric columns absent from this record.
    pub fn missing_values<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|name| self.value(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Required date columns absent from this record.
    pub fn missing_dates<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|name| self.date(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Number of columns (numeric plus date).
    pub fn len(&self) -> usize {
        self.values.len() + self.dates.len()
    }

    /// True when no column has been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.dates.is_empty()
    }
}
