use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::{IdKind, ScheduleIndex, task_column};
use crate::task::{FieldValue, Task, columns};
use chrono::TimeDelta;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_NATURAL_KEY: [&str; 3] = [columns::TASK_CODE, columns::TASK_NAME, columns::TASK_TYPE];

/// Suffix appended to snapshot-B columns in [`ComparisonResult::to_dataframe`].
pub const OTHER_SUFFIX: &str = "_other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    Inner,
    #[default]
    Left,
}

impl JoinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::Inner => "inner",
            JoinMode::Left => "left",
        }
    }
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinMode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinMode::Inner),
            "left" => Ok(JoinMode::Left),
            other => Err(ScheduleError::InvalidData(format!(
                "unknown join mode '{other}' (expected inner or left)"
            ))),
        }
    }
}

/// One output row: a snapshot-A task and, when matched, its snapshot-B counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub current: Task,
    pub other: Option<Task>,
    pub start_diff: Option<TimeDelta>,
    pub end_diff: Option<TimeDelta>,
}

impl ComparisonRow {
    fn matched(current: Task, other: Task) -> Self {
        let start_diff = Some(current.start_date - other.start_date);
        let end_diff = Some(current.end_date - other.end_date);
        Self {
            current,
            other: Some(other),
            start_diff,
            end_diff,
        }
    }

    fn unmatched(current: Task) -> Self {
        Self {
            current,
            other: None,
            start_diff: None,
            end_diff: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.other.is_some()
    }

    /// Matched and moved at either end.
    pub fn is_shifted(&self) -> bool {
        let moved = |diff: Option<TimeDelta>| diff.is_some_and(|d| d != TimeDelta::zero());
        moved(self.start_diff) || moved(self.end_diff)
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    natural_key: Vec<String>,
    join: JoinMode,
    current_kind: IdKind,
    other_kind: IdKind,
    rows: Vec<ComparisonRow>,
}

impl ComparisonResult {
    pub fn natural_key(&self) -> &[String] {
        &self.natural_key
    }

    pub fn join(&self) -> JoinMode {
        self.join
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn shifted(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|row| row.is_shifted())
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|row| !row.is_matched())
    }

    /// A copy holding only the rows that moved.
    pub fn only_shifted(&self) -> Self {
        Self {
            natural_key: self.natural_key.clone(),
            join: self.join,
            current_kind: self.current_kind,
            other_kind: self.other_kind,
            rows: self.shifted().cloned().collect(),
        }
    }

    /// Key columns, then the remaining snapshot-A columns, the remaining
    /// snapshot-B columns suffixed `_other`, and finally `start_diff` / `end_diff`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let current: Vec<Option<&Task>> = self.rows.iter().map(|r| Some(&r.current)).collect();
        let other: Vec<Option<&Task>> = self.rows.iter().map(|r| r.other.as_ref()).collect();
        let key: HashSet<&str> = self.natural_key.iter().map(String::as_str).collect();

        let mut cols: Vec<Column> = Vec::new();
        for field in &self.natural_key {
            cols.push(task_column(field, field, &current, self.current_kind)?);
        }
        for field in columns::ALL.iter().filter(|f| !key.contains(*f)) {
            cols.push(task_column(field, field, &current, self.current_kind)?);
        }
        for field in columns::ALL.iter().filter(|f| !key.contains(*f)) {
            let name = format!("{field}{OTHER_SUFFIX}");
            cols.push(task_column(field, &name, &other, self.other_kind)?);
        }
        cols.push(duration_column("start_diff", self.rows.iter().map(|r| r.start_diff))?);
        cols.push(duration_column("end_diff", self.rows.iter().map(|r| r.end_diff))?);

        DataFrame::new(cols)
    }
}

fn duration_column(
    name: &str,
    diffs: impl Iterator<Item = Option<TimeDelta>>,
) -> PolarsResult<Column> {
    let values: Vec<Option<i64>> = diffs.map(|d| d.map(|d| d.num_milliseconds())).collect();
    Ok(Series::new(name.into(), values)
        .cast(&DataType::Duration(TimeUnit::Milliseconds))?
        .into_column())
}

/// Joins two snapshots on a natural key and reports per-task date deltas.
#[derive(Debug, Clone)]
pub struct ScheduleComparator {
    natural_key: Vec<String>,
}

impl Default for ScheduleComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleComparator {
    pub fn new() -> Self {
        Self::with_natural_key(DEFAULT_NATURAL_KEY)
    }

    /// Repeated fields are dropped; the first occurrence keeps its position.
    /// Id fields (`task_id`, `predecessors`, `successors`) match on their text
    /// form, so snapshots loaded with different id column types still join.
    pub fn with_natural_key<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut natural_key: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !natural_key.contains(&field) {
                natural_key.push(field);
            }
        }
        Self { natural_key }
    }

    pub fn natural_key(&self) -> &[String] {
        &self.natural_key
    }

    pub fn compare(
        &self,
        a: &ScheduleIndex,
        b: &ScheduleIndex,
        join: JoinMode,
    ) -> ScheduleResult<ComparisonResult> {
        if self.natural_key.is_empty() {
            return Err(ScheduleError::EmptyNaturalKey);
        }
        for field in &self.natural_key {
            for (snapshot, index) in [('a', a), ('b', b)] {
                if !index.has_column(field) {
                    return Err(ScheduleError::NoCommonKey {
                        field: field.clone(),
                        snapshot,
                    });
                }
            }
        }

        let other_tasks = b.tasks()?;
        let mut other_by_key: HashMap<Vec<FieldValue>, Vec<usize>> =
            HashMap::with_capacity(other_tasks.len());
        for (row, task) in other_tasks.iter().enumerate() {
            other_by_key.entry(self.key_of(task)).or_default().push(row);
        }

        let mut rows = Vec::with_capacity(a.len());
        for task in a.tasks()? {
            match other_by_key.get(&self.key_of(&task)) {
                Some(matches) => {
                    for &row in matches {
                        rows.push(ComparisonRow::matched(task.clone(), other_tasks[row].clone()));
                    }
                }
                None if join == JoinMode::Left => rows.push(ComparisonRow::unmatched(task)),
                None => {}
            }
        }

        rows.sort_by_key(|row| row.current.end_date);

        debug!(
            join = join.as_str(),
            current = a.len(),
            other = b.len(),
            rows = rows.len(),
            "compared schedule snapshots"
        );

        Ok(ComparisonResult {
            natural_key: self.natural_key.clone(),
            join,
            current_kind: a.id_kind(),
            other_kind: b.id_kind(),
            rows,
        })
    }

    fn key_of(&self, task: &Task) -> Vec<FieldValue> {
        self.natural_key
            .iter()
            .filter_map(|field| task.field(field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_mode_parses_case_insensitively() {
        assert_eq!("INNER".parse::<JoinMode>().unwrap(), JoinMode::Inner);
        assert_eq!(" left ".parse::<JoinMode>().unwrap(), JoinMode::Left);
        assert!("outer".parse::<JoinMode>().is_err());
    }

    #[test]
    fn natural_key_drops_repeats() {
        let comparator = ScheduleComparator::with_natural_key(["task_code", "task_name", "task_code"]);
        assert_eq!(comparator.natural_key(), &["task_code", "task_name"]);
    }
}
