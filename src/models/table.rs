//! Time-indexed column tables and their outer-join union.
//!
//! A [`TimeTable`] holds one row per timestamp (sorted, unique) and one column per
//! key. Union takes the set union of row timestamps and of column keys; any cell a
//! source table does not define is left missing (NaN for numeric cells), never invented.

use crate::error::{ProcessingError, Result};
use crate::utils::constants::SENTINEL_THRESHOLD;
use crate::utils::time::{format_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How a union resolves two different non-missing values for the same cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail with an integrity error
    #[default]
    Reject,
    /// Keep the value from the later table
    PreferLast,
}

/// A table cell type with a distinguished "missing" value
pub trait CellValue: Clone + fmt::Debug {
    fn missing() -> Self;

    fn is_missing(&self) -> bool;

    /// Equality where two missing values compare equal
    fn same_as(&self, other: &Self) -> bool;
}

impl CellValue for f64 {
    fn missing() -> Self {
        f64::NAN
    }

    fn is_missing(&self) -> bool {
        self.is_nan()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }
}

impl<T: Clone + PartialEq + fmt::Debug> CellValue for Option<T> {
    fn missing() -> Self {
        None
    }

    fn is_missing(&self) -> bool {
        self.is_none()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

#[derive(Debug, Clone)]
pub struct TimeTable<K, V = f64> {
    index: Vec<Timestamp>,
    columns: BTreeMap<K, Vec<V>>,
}

impl<K, V> TimeTable<K, V>
where
    K: Ord + Copy + fmt::Display,
    V: CellValue,
{
    /// A table with no rows and the given columns
    pub fn empty(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            index: Vec::new(),
            columns: keys.into_iter().map(|key| (key, Vec::new())).collect(),
        }
    }

    /// Build a table from a timestamp axis and equally long columns.
    ///
    /// Rows are reordered by timestamp if needed; repeated timestamps are rejected.
    pub fn from_columns(index: Vec<Timestamp>, columns: BTreeMap<K, Vec<V>>) -> Result<Self> {
        for (key, values) in &columns {
            if values.len() != index.len() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Column {} has {} values, expected {}",
                    key,
                    values.len(),
                    index.len()
                )));
            }
        }

        if index.windows(2).all(|pair| pair[0] < pair[1]) {
            return Ok(Self { index, columns });
        }

        let mut order: Vec<usize> = (0..index.len()).collect();
        order.sort_by_key(|&row| index[row]);

        if let Some(pair) = order.windows(2).find(|pair| index[pair[0]] == index[pair[1]]) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Duplicate timestamp {}",
                format_timestamp(&index[pair[0]])
            )));
        }

        let sorted_index = order.iter().map(|&row| index[row]).collect();
        let sorted_columns = columns
            .into_iter()
            .map(|(key, values)| {
                let reordered = order.iter().map(|&row| values[row].clone()).collect();
                (key, reordered)
            })
            .collect();

        Ok(Self {
            index: sorted_index,
            columns: sorted_columns,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.columns.keys().copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, key: &K) -> Option<&[V]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.columns.iter().map(|(key, values)| (key, values.as_slice()))
    }

    pub fn row_position(&self, timestamp: &Timestamp) -> Option<usize> {
        self.index.binary_search(timestamp).ok()
    }

    pub fn get(&self, timestamp: &Timestamp, key: &K) -> Option<&V> {
        let row = self.row_position(timestamp)?;
        self.columns.get(key).and_then(|values| values.get(row))
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.index.last().copied()
    }

    pub fn missing_cells(&self) -> usize {
        self.columns
            .values()
            .map(|values| values.iter().filter(|value| value.is_missing()).count())
            .sum()
    }

    /// Rows with `from <= timestamp <= to`; an absent bound is open
    pub fn slice(&self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        let start = from.map_or(0, |bound| self.index.partition_point(|ts| *ts < bound));
        let end = to.map_or(self.index.len(), |bound| {
            self.index.partition_point(|ts| *ts <= bound)
        });

        if end <= start {
            return Self::empty(self.keys());
        }

        Self {
            index: self.index[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(key, values)| (*key, values[start..end].to_vec()))
                .collect(),
        }
    }

    /// Outer-join union of two tables
    pub fn union(&self, other: &Self, policy: ConflictPolicy) -> Result<Self> {
        Self::union_all([self, other], policy)
    }

    /// Outer-join union of any number of tables, applied left to right
    pub fn union_all<'a, I>(tables: I, policy: ConflictPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        let tables: Vec<&Self> = tables.into_iter().collect();

        let mut index: Vec<Timestamp> = tables
            .iter()
            .flat_map(|table| table.index.iter().copied())
            .collect();
        index.sort_unstable();
        index.dedup();

        let keys: BTreeSet<K> = tables.iter().flat_map(|table| table.keys()).collect();
        let mut columns: BTreeMap<K, Vec<V>> = keys
            .into_iter()
            .map(|key| (key, vec![V::missing(); index.len()]))
            .collect();

        for table in tables {
            // Both axes are sorted, so each source row maps to one merged row
            let rows: Vec<usize> = table
                .index
                .iter()
                .map(|ts| index.partition_point(|merged| merged < ts))
                .collect();

            for (key, values) in &table.columns {
                let target = columns
                    .entry(*key)
                    .or_insert_with(|| vec![V::missing(); index.len()]);

                for (&row, value) in rows.iter().zip(values) {
                    if value.is_missing() {
                        continue;
                    }

                    let cell = &mut target[row];
                    if cell.is_missing() || cell.same_as(value) {
                        *cell = value.clone();
                        continue;
                    }

                    match policy {
                        ConflictPolicy::PreferLast => *cell = value.clone(),
                        ConflictPolicy::Reject => {
                            return Err(ProcessingError::Integrity(format!(
                                "Conflicting values for column {} at {}: {:?} vs {:?}",
                                key,
                                format_timestamp(&index[row]),
                                cell,
                                value
                            )))
                        }
                    }
                }
            }
        }

        Ok(Self { index, columns })
    }
}

impl<K> TimeTable<K, f64>
where
    K: Ord + Copy + fmt::Display,
{
    /// Replace every value at or above the sentinel threshold with NaN
    pub fn sanitize_sentinels(mut self) -> Self {
        for values in self.columns.values_mut() {
            for value in values.iter_mut() {
                if *value >= SENTINEL_THRESHOLD {
                    *value = f64::NAN;
                }
            }
        }
        self
    }

    pub fn count_where(&self, predicate: impl Fn(f64) -> bool) -> usize {
        self.columns
            .values()
            .map(|values| values.iter().filter(|value| predicate(**value)).count())
            .sum()
    }
}

impl<K, V> PartialEq for TimeTable<K, V>
where
    K: Ord,
    V: CellValue,
{
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|((key_a, values_a), (key_b, values_b))| {
                    key_a == key_b
                        && values_a.len() == values_b.len()
                        && values_a.iter().zip(values_b).all(|(a, b)| a.same_as(b))
                })
    }
}
