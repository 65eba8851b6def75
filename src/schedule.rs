use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::PrecedenceIndex;
use crate::query::ScheduleQuery;
use crate::task::{self, ActivityRecord, PrecedenceEdge, Task, TaskId, columns};
use polars::prelude::PlSmallStr;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Storage type of the `task_id` column, taken from the first record of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Integer,
    Text,
}

impl IdKind {
    fn infer(id: &TaskId) -> Self {
        match id {
            TaskId::Int(_) => IdKind::Integer,
            TaskId::Text(_) => IdKind::Text,
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            IdKind::Integer => DataType::Int64,
            IdKind::Text => DataType::String,
        }
    }

    /// Convert `id` to this storage type. Text that is not an integer cannot live
    /// in an integer column and yields `None`.
    pub fn coerce(&self, id: &TaskId) -> Option<TaskId> {
        match (self, id) {
            (IdKind::Integer, TaskId::Int(v)) => Some(TaskId::Int(*v)),
            (IdKind::Integer, TaskId::Text(s)) => s.trim().parse::<i64>().ok().map(TaskId::Int),
            (IdKind::Text, TaskId::Text(s)) => Some(TaskId::Text(s.clone())),
            (IdKind::Text, TaskId::Int(v)) => Some(TaskId::Text(v.to_string())),
        }
    }
}

/// Immutable, indexed task table for one schedule snapshot.
///
/// Rows are ordered by `end_date` ascending. Lookups go through the
/// `task_code` and `task_id` hash indices and never depend on row order.
#[derive(Debug, Clone)]
pub struct ScheduleIndex {
    df: DataFrame,
    id_kind: IdKind,
    code_index: HashMap<String, usize>,
    id_index: HashMap<TaskId, usize>,
}

impl ScheduleIndex {
    pub fn build(records: &[ActivityRecord], edges: &[PrecedenceEdge]) -> ScheduleResult<Self> {
        let first = records.first().ok_or(ScheduleError::EmptySchedule)?;

        let mut seen_codes: HashSet<&str> = HashSet::with_capacity(records.len());
        for record in records {
            if !seen_codes.insert(record.task_code.as_str()) {
                return Err(ScheduleError::DuplicateTaskCode {
                    code: record.task_code.clone(),
                });
            }
        }

        let id_kind = IdKind::infer(&first.task_id);

        // Edges whose endpoints cannot be stored in the id column can never match a row.
        let edges: Vec<PrecedenceEdge> = edges
            .iter()
            .filter_map(|edge| {
                Some(PrecedenceEdge {
                    predecessor_task_id: id_kind.coerce(&edge.predecessor_task_id)?,
                    successor_task_id: id_kind.coerce(&edge.successor_task_id)?,
                })
            })
            .collect();
        let precedence = PrecedenceIndex::from_edges(&edges);

        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let task_id = id_kind.coerce(&record.task_id).ok_or_else(|| {
                ScheduleError::InvalidData(format!(
                    "task '{}' has id '{}' that does not fit the {:?} id column inferred from the first record",
                    record.task_code, record.task_id, id_kind
                ))
            })?;
            let predecessors = precedence.predecessors_of(&task_id).to_vec();
            let successors = precedence.successors_of(&task_id).to_vec();
            let mut task = Task::from_record(record, predecessors, successors);
            task.task_id = task_id;
            tasks.push(task);
        }

        // Vec::sort_by_key is stable: equal end dates keep load order.
        tasks.sort_by_key(|t| t.end_date);

        let mut code_index = HashMap::with_capacity(tasks.len());
        let mut id_index = HashMap::with_capacity(tasks.len());
        for (row, task) in tasks.iter().enumerate() {
            code_index.insert(task.task_code.clone(), row);
            id_index.entry(task.task_id.clone()).or_insert(row);
        }

        let rows: Vec<Option<&Task>> = tasks.iter().map(Some).collect();
        let df = tasks_to_dataframe(&rows, id_kind)?;

        debug!(
            tasks = df.height(),
            edges = precedence.edge_count(),
            "built schedule index"
        );

        Ok(Self {
            df,
            id_kind,
            code_index,
            id_index,
        })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn id_kind(&self) -> IdKind {
        self.id_kind
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    pub fn contains_code(&self, task_code: &str) -> bool {
        self.code_index.contains_key(task_code)
    }

    pub fn row_of_code(&self, task_code: &str) -> Option<usize> {
        self.code_index.get(task_code).copied()
    }

    pub fn row_of_id(&self, task_id: &TaskId) -> Option<usize> {
        self.id_index.get(task_id).copied()
    }

    pub(crate) fn require_row(&self, task_code: &str) -> ScheduleResult<usize> {
        self.row_of_code(task_code)
            .ok_or_else(|| ScheduleError::UnknownTaskCode {
                code: task_code.to_string(),
            })
    }

    pub fn task(&self, task_code: &str) -> ScheduleResult<Task> {
        let row = self.require_row(task_code)?;
        self.task_at(row)
    }

    pub fn task_at(&self, row_idx: usize) -> ScheduleResult<Task> {
        Ok(Task::from_dataframe_row(&self.df, row_idx)?)
    }

    /// All rows in end-date order.
    pub fn tasks(&self) -> ScheduleResult<Vec<Task>> {
        (0..self.df.height()).map(|row| self.task_at(row)).collect()
    }

    pub(crate) fn related_ids(&self, row_idx: usize, column: &str) -> ScheduleResult<Vec<TaskId>> {
        Ok(task::ids_at(self.df.column(column)?, row_idx)?)
    }

    pub fn query(&self) -> ScheduleQuery<'_> {
        ScheduleQuery::new(self)
    }
}

/// Build one typed column from task rows. `None` rows become nulls.
pub(crate) fn task_column(
    field: &str,
    name: &str,
    rows: &[Option<&Task>],
    id_kind: IdKind,
) -> PolarsResult<Column> {
    let name = PlSmallStr::from(name);
    let series = match field {
        columns::TASK_ID => id_series(name, rows.iter().map(|t| t.map(|t| &t.task_id)), id_kind),
        columns::TASK_CODE => {
            let values: Vec<Option<&str>> = rows.iter().map(|t| t.map(|t| t.task_code.as_str())).collect();
            Series::new(name, values)
        }
        columns::TASK_NAME => {
            let values: Vec<Option<&str>> = rows.iter().map(|t| t.map(|t| t.task_name.as_str())).collect();
            Series::new(name, values)
        }
        columns::TASK_TYPE => {
            let values: Vec<Option<&str>> = rows.iter().map(|t| t.map(|t| t.task_type.as_str())).collect();
            Series::new(name, values)
        }
        columns::START_DATE => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|t| t.map(|t| task::timestamp_to_millis(t.start_date)))
                .collect();
            Series::new(name, values).cast(&timestamp_dtype())?
        }
        columns::END_DATE => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|t| t.map(|t| task::timestamp_to_millis(t.end_date)))
                .collect();
            Series::new(name, values).cast(&timestamp_dtype())?
        }
        columns::PREDECESSORS => id_list_series(
            name,
            rows.iter().map(|t| t.map(|t| t.predecessors.as_slice())),
            id_kind,
        )?,
        columns::SUCCESSORS => id_list_series(
            name,
            rows.iter().map(|t| t.map(|t| t.successors.as_slice())),
            id_kind,
        )?,
        other => {
            return Err(PolarsError::ColumnNotFound(
                format!("no task column named '{other}'").into(),
            ));
        }
    };
    Ok(series.into_column())
}

pub(crate) fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

fn tasks_to_dataframe(rows: &[Option<&Task>], id_kind: IdKind) -> PolarsResult<DataFrame> {
    let mut cols: Vec<Column> = Vec::with_capacity(columns::ALL.len());
    for field in columns::ALL {
        cols.push(task_column(field, field, rows, id_kind)?);
    }
    DataFrame::new(cols)
}

fn id_series<'a>(
    name: PlSmallStr,
    ids: impl Iterator<Item = Option<&'a TaskId>>,
    id_kind: IdKind,
) -> Series {
    match id_kind {
        IdKind::Integer => {
            let values: Vec<Option<i64>> = ids
                .map(|id| match id {
                    Some(TaskId::Int(v)) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
        IdKind::Text => {
            let values: Vec<Option<&str>> = ids
                .map(|id| match id {
                    Some(TaskId::Text(s)) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            Series::new(name, values)
        }
    }
}

fn id_list_series<'a>(
    name: PlSmallStr,
    lists: impl Iterator<Item = Option<&'a [TaskId]>>,
    id_kind: IdKind,
) -> PolarsResult<Series> {
    let list = lists
        .map(|ids| {
            ids.map(|ids| id_series(PlSmallStr::from_static(""), ids.iter().map(Some), id_kind))
        })
        .collect::<ListChunked>()
        .into_series()
        .with_name(name);
    list.cast(&DataType::List(Box::new(id_kind.dtype())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn record(id: impl Into<TaskId>, code: &str, end: NaiveDateTime) -> ActivityRecord {
        ActivityRecord::new(id, code, format!("Task {code}"), crate::TaskType::TaskDependent, ts(1, 1), end)
    }

    #[test]
    fn built_frame_contains_expected_columns() {
        let index = ScheduleIndex::build(&[record(1, "A100", ts(1, 5))], &[]).unwrap();
        let df = index.dataframe();
        for name in columns::ALL {
            assert!(index.has_column(name), "missing column {name}");
        }
        assert_eq!(df.column(columns::TASK_ID).unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column(columns::END_DATE).unwrap().dtype(), &timestamp_dtype());
        assert_eq!(
            df.column(columns::SUCCESSORS).unwrap().dtype(),
            &DataType::List(Box::new(DataType::Int64))
        );
    }

    #[test]
    fn rows_sorted_by_end_date_and_ties_keep_load_order() {
        let records = vec![
            record(1, "C", ts(3, 1)),
            record(2, "A", ts(1, 1)),
            record(3, "B1", ts(2, 1)),
            record(4, "B2", ts(2, 1)),
        ];
        let index = ScheduleIndex::build(&records, &[]).unwrap();
        let codes: Vec<String> = index
            .tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.task_code)
            .collect();
        assert_eq!(codes, vec!["A", "B1", "B2", "C"]);
        assert_eq!(index.row_of_code("C"), Some(3));
    }

    #[test]
    fn id_column_type_follows_first_record() {
        let records = vec![record("X-1", "A", ts(1, 2)), record(7, "B", ts(1, 3))];
        let index = ScheduleIndex::build(&records, &[PrecedenceEdge::new("X-1", 7)]).unwrap();

        assert_eq!(index.id_kind(), IdKind::Text);
        let b = index.task("B").unwrap();
        assert_eq!(b.task_id, TaskId::Text("7".into()));
        assert_eq!(b.predecessors, vec![TaskId::Text("X-1".into())]);
    }

    #[test]
    fn integer_column_rejects_non_numeric_ids() {
        let records = vec![record(1, "A", ts(1, 2)), record("abc", "B", ts(1, 3))];
        let err = ScheduleIndex::build(&records, &[]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidData(_)));
    }

    #[test]
    fn index_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScheduleIndex>();
    }
}
