//! Read-only filters and precedence traversals over a [`ScheduleIndex`].
//!
//! Every operation returns a [`TaskSubset`]: a borrow of the parent index plus
//! ascending row numbers. Subsets therefore keep the parent's end-date order
//! and cannot mutate it.

use crate::error::ScheduleResult;
use crate::graph::Direction;
use crate::schedule::ScheduleIndex;
use crate::task::{self, Task, TaskId, TaskType, columns};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::{HashSet, VecDeque};

/// Row predicates. Each `Some` narrows the result; `None` means "not filtered".
///
/// Date bounds are inclusive. `task_types` matches any of its members, and
/// an empty set matches nothing. `name_contains` is a case-insensitive
/// substring test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub min_start: Option<NaiveDateTime>,
    pub max_start: Option<NaiveDateTime>,
    pub min_end: Option<NaiveDateTime>,
    pub max_end: Option<NaiveDateTime>,
    pub task_types: Option<HashSet<TaskType>>,
    pub name_contains: Option<String>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_start(mut self, at: NaiveDateTime) -> Self {
        self.min_start = Some(at);
        self
    }

    pub fn max_start(mut self, at: NaiveDateTime) -> Self {
        self.max_start = Some(at);
        self
    }

    pub fn min_end(mut self, at: NaiveDateTime) -> Self {
        self.min_end = Some(at);
        self
    }

    pub fn max_end(mut self, at: NaiveDateTime) -> Self {
        self.max_end = Some(at);
        self
    }

    pub fn task_types(mut self, types: impl IntoIterator<Item = TaskType>) -> Self {
        self.task_types = Some(types.into_iter().collect());
        self
    }

    pub fn name_contains(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_start.is_none()
            && self.max_start.is_none()
            && self.min_end.is_none()
            && self.max_end.is_none()
            && self.task_types.is_none()
            && self.name_contains.is_none()
    }
}

fn within(value: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    match value {
        Some(v) => min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m),
        None => min.is_none() && max.is_none(),
    }
}

fn matching_rows(
    index: &ScheduleIndex,
    candidates: impl Iterator<Item = usize>,
    filter: &TaskFilter,
) -> ScheduleResult<Vec<usize>> {
    if filter.is_empty() {
        return Ok(candidates.collect());
    }

    let df = index.dataframe();
    let starts = df.column(columns::START_DATE)?.datetime()?;
    let ends = df.column(columns::END_DATE)?.datetime()?;
    let types = df.column(columns::TASK_TYPE)?.str()?;
    let names = df.column(columns::TASK_NAME)?.str()?;

    let min_start = filter.min_start.map(task::timestamp_to_millis);
    let max_start = filter.max_start.map(task::timestamp_to_millis);
    let min_end = filter.min_end.map(task::timestamp_to_millis);
    let max_end = filter.max_end.map(task::timestamp_to_millis);
    let type_names: Option<HashSet<&'static str>> = filter
        .task_types
        .as_ref()
        .map(|set| set.iter().map(TaskType::as_str).collect());
    let needle = filter.name_contains.as_ref().map(|s| s.to_lowercase());

    Ok(candidates
        .filter(|&row| {
            within(starts.get(row), min_start, max_start)
                && within(ends.get(row), min_end, max_end)
                && type_names
                    .as_ref()
                    .is_none_or(|set| types.get(row).is_some_and(|t| set.contains(t)))
                && needle.as_ref().is_none_or(|needle| {
                    names
                        .get(row)
                        .is_some_and(|name| name.to_lowercase().contains(needle.as_str()))
                })
        })
        .collect())
}

/// Query engine over one schedule index. All methods are pure reads.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleQuery<'a> {
    index: &'a ScheduleIndex,
}

impl<'a> ScheduleQuery<'a> {
    pub fn new(index: &'a ScheduleIndex) -> Self {
        Self { index }
    }

    pub fn all(&self) -> TaskSubset<'a> {
        TaskSubset::new(self.index, (0..self.index.len()).collect())
    }

    pub fn filter(&self, filter: &TaskFilter) -> ScheduleResult<TaskSubset<'a>> {
        let rows = matching_rows(self.index, 0..self.index.len(), filter)?;
        Ok(TaskSubset::new(self.index, rows))
    }

    /// Rows whose code is in `task_codes`. Unknown codes are ignored.
    pub fn select<I, S>(&self, task_codes: I) -> TaskSubset<'a>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = task_codes
            .into_iter()
            .filter_map(|code| self.index.row_of_code(code.as_ref()))
            .collect();
        TaskSubset::from_unordered(self.index, rows)
    }

    pub fn successors_of(&self, task_code: &str) -> ScheduleResult<TaskSubset<'a>> {
        self.neighbours(task_code, Direction::Successors)
    }

    pub fn predecessors_of(&self, task_code: &str) -> ScheduleResult<TaskSubset<'a>> {
        self.neighbours(task_code, Direction::Predecessors)
    }

    /// Every task reachable downstream within `depth` hops, origin excluded.
    pub fn successors_within(&self, task_code: &str, depth: usize) -> ScheduleResult<TaskSubset<'a>> {
        self.traverse(task_code, Direction::Successors, depth)
    }

    /// Every task reachable upstream within `depth` hops, origin excluded.
    pub fn predecessors_within(&self, task_code: &str, depth: usize) -> ScheduleResult<TaskSubset<'a>> {
        self.traverse(task_code, Direction::Predecessors, depth)
    }

    fn neighbours(&self, task_code: &str, direction: Direction) -> ScheduleResult<TaskSubset<'a>> {
        let row = self.index.require_row(task_code)?;
        let rows = self.neighbour_rows(row, direction)?;
        Ok(TaskSubset::from_unordered(self.index, rows))
    }

    fn neighbour_rows(&self, row: usize, direction: Direction) -> ScheduleResult<Vec<usize>> {
        let column = match direction {
            Direction::Predecessors => columns::PREDECESSORS,
            Direction::Successors => columns::SUCCESSORS,
        };
        // Ids that name no task of this snapshot are dropped.
        Ok(self
            .index
            .related_ids(row, column)?
            .iter()
            .filter_map(|id: &TaskId| self.index.row_of_id(id))
            .collect())
    }

    fn traverse(
        &self,
        task_code: &str,
        direction: Direction,
        depth: usize,
    ) -> ScheduleResult<TaskSubset<'a>> {
        let origin = self.index.require_row(task_code)?;
        let mut visited: HashSet<usize> = HashSet::from([origin]);
        let mut found = Vec::new();
        let mut queue = VecDeque::from([(origin, 0usize)]);

        while let Some((row, level)) = queue.pop_front() {
            if level == depth {
                continue;
            }
            for next in self.neighbour_rows(row, direction)? {
                if visited.insert(next) {
                    found.push(next);
                    queue.push_back((next, level + 1));
                }
            }
        }

        Ok(TaskSubset::from_unordered(self.index, found))
    }
}

/// Arena view over a [`ScheduleIndex`]: ascending row numbers into the parent table.
#[derive(Debug, Clone)]
pub struct TaskSubset<'a> {
    index: &'a ScheduleIndex,
    rows: Vec<usize>,
}

impl<'a> TaskSubset<'a> {
    fn new(index: &'a ScheduleIndex, rows: Vec<usize>) -> Self {
        Self { index, rows }
    }

    fn from_unordered(index: &'a ScheduleIndex, mut rows: Vec<usize>) -> Self {
        rows.sort_unstable();
        rows.dedup();
        Self::new(index, rows)
    }

    pub fn index(&self) -> &'a ScheduleIndex {
        self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn codes(&self) -> ScheduleResult<Vec<String>> {
        let codes = self.index.dataframe().column(columns::TASK_CODE)?.str()?;
        Ok(self
            .rows
            .iter()
            .filter_map(|&row| codes.get(row).map(str::to_owned))
            .collect())
    }

    pub fn contains_code(&self, task_code: &str) -> bool {
        self.index
            .row_of_code(task_code)
            .is_some_and(|row| self.rows.binary_search(&row).is_ok())
    }

    pub fn tasks(&self) -> ScheduleResult<Vec<Task>> {
        self.rows.iter().map(|&row| self.index.task_at(row)).collect()
    }

    /// Narrow this subset further.
    pub fn filter(&self, filter: &TaskFilter) -> ScheduleResult<TaskSubset<'a>> {
        let rows = matching_rows(self.index, self.rows.iter().copied(), filter)?;
        Ok(Self::new(self.index, rows))
    }

    /// Materialize the subset as an independent DataFrame.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let idx: Vec<IdxSize> = self.rows.iter().map(|&row| row as IdxSize).collect();
        let idx = IdxCa::from_vec(PlSmallStr::from_static("rows"), idx);
        self.index.dataframe().take(&idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_treats_bounds_as_inclusive() {
        assert!(within(Some(5), Some(5), Some(5)));
        assert!(!within(Some(4), Some(5), None));
        assert!(!within(Some(6), None, Some(5)));
        assert!(within(Some(6), None, None));
        assert!(!within(None, Some(1), None));
    }

    #[test]
    fn empty_filter_reports_empty() {
        assert!(TaskFilter::new().is_empty());
        assert!(!TaskFilter::new().name_contains("").is_empty());
    }
}
