use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::DataType;
use schedule_lens::task::columns;
use schedule_lens::{
    ActivityRecord, IdKind, PrecedenceEdge, ScheduleError, ScheduleIndex, TaskId, TaskType,
};

fn ts(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, d)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn activity(id: impl Into<TaskId>, code: &str, start: NaiveDateTime, end: NaiveDateTime) -> ActivityRecord {
    ActivityRecord::new(id, code, format!("Activity {code}"), TaskType::TaskDependent, start, end)
}

fn sample_records() -> Vec<ActivityRecord> {
    vec![
        activity(1, "A100", ts(1, 1), ts(1, 5)),
        activity(2, "A200", ts(1, 6), ts(1, 12)),
        activity(3, "A300", ts(1, 6), ts(1, 9)),
        activity(4, "A400", ts(1, 13), ts(1, 20)),
    ]
}

fn sample_edges() -> Vec<PrecedenceEdge> {
    vec![
        PrecedenceEdge::new(1, 2),
        PrecedenceEdge::new(1, 3),
        PrecedenceEdge::new(2, 4),
        PrecedenceEdge::new(3, 4),
    ]
}

#[test]
fn build_keeps_one_row_per_record() {
    let records = sample_records();
    let index = ScheduleIndex::build(&records, &sample_edges()).unwrap();
    assert_eq!(index.len(), records.len());
    assert_eq!(index.dataframe().height(), records.len());
    for record in &records {
        assert!(index.contains_code(&record.task_code));
    }
}

#[test]
fn rows_are_ordered_by_end_date() {
    let index = ScheduleIndex::build(&sample_records(), &sample_edges()).unwrap();
    let codes: Vec<String> = index.tasks().unwrap().into_iter().map(|t| t.task_code).collect();
    assert_eq!(codes, ["A100", "A300", "A200", "A400"]);

    let ends = index.dataframe().column(columns::END_DATE).unwrap();
    assert!(matches!(ends.dtype(), DataType::Datetime(_, _)));
}

#[test]
fn empty_input_is_rejected() {
    let err = ScheduleIndex::build(&[], &[]).unwrap_err();
    assert!(matches!(err, ScheduleError::EmptySchedule));
}

#[test]
fn duplicate_codes_are_rejected() {
    let mut records = sample_records();
    records.push(activity(9, "A200", ts(2, 1), ts(2, 2)));
    let err = ScheduleIndex::build(&records, &[]).unwrap_err();
    match err {
        ScheduleError::DuplicateTaskCode { code } => assert_eq!(code, "A200"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn relations_are_attached_to_each_task() {
    let index = ScheduleIndex::build(&sample_records(), &sample_edges()).unwrap();

    let a100 = index.task("A100").unwrap();
    assert!(a100.predecessors.is_empty());
    assert_eq!(a100.successors, vec![TaskId::Int(2), TaskId::Int(3)]);

    let a400 = index.task("A400").unwrap();
    assert_eq!(a400.predecessors, vec![TaskId::Int(2), TaskId::Int(3)]);
    assert!(a400.successors.is_empty());
}

#[test]
fn duplicate_and_dangling_edges_are_ignored() {
    let mut edges = sample_edges();
    edges.push(PrecedenceEdge::new(1, 2));
    edges.push(PrecedenceEdge::new(4, 99));

    let index = ScheduleIndex::build(&sample_records(), &edges).unwrap();
    assert_eq!(index.task("A100").unwrap().successors, vec![TaskId::Int(2), TaskId::Int(3)]);
    // 99 is kept on the task row but resolves to nothing in queries.
    assert_eq!(index.task("A400").unwrap().successors, vec![TaskId::Int(99)]);
    assert!(index.query().successors_of("A400").unwrap().is_empty());
}

#[test]
fn text_ids_are_inferred_from_first_record() {
    let records = vec![
        activity("X-1", "A100", ts(1, 1), ts(1, 2)),
        activity(7, "A200", ts(1, 3), ts(1, 4)),
    ];
    let edges = vec![PrecedenceEdge::new("X-1", 7)];
    let index = ScheduleIndex::build(&records, &edges).unwrap();

    assert_eq!(index.id_kind(), IdKind::Text);
    assert_eq!(
        index.dataframe().column(columns::TASK_ID).unwrap().dtype(),
        &DataType::String
    );
    let a200 = index.task("A200").unwrap();
    assert_eq!(a200.task_id, TaskId::Text("7".into()));
    assert_eq!(a200.predecessors, vec![TaskId::Text("X-1".into())]);
}

#[test]
fn unknown_code_lookup_fails() {
    let index = ScheduleIndex::build(&sample_records(), &[]).unwrap();
    assert!(matches!(
        index.task("Z999"),
        Err(ScheduleError::UnknownTaskCode { .. })
    ));
}

#[test]
fn task_round_trips_through_the_frame() {
    let index = ScheduleIndex::build(&sample_records(), &sample_edges()).unwrap();
    let a300 = index.task("A300").unwrap();
    assert_eq!(a300.task_name, "Activity A300");
    assert_eq!(a300.task_type, TaskType::TaskDependent);
    assert_eq!(a300.start_date, ts(1, 6));
    assert_eq!(a300.end_date, ts(1, 9));
    assert_eq!(a300.duration(), chrono::TimeDelta::days(3));
}
