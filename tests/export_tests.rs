use chrono::{NaiveDate, NaiveDateTime};
use schedule_lens::export::{save_comparison_to_csv, save_subset_to_csv, write_subset_csv};
use schedule_lens::{
    ActivityRecord, JoinMode, PrecedenceEdge, ScheduleComparator, ScheduleIndex, TaskFilter,
    TaskType,
};
use std::fs;
use tempfile::NamedTempFile;

fn day(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn snapshot(shift: i64) -> ScheduleIndex {
    let offset = chrono::TimeDelta::days(shift);
    ScheduleIndex::build(
        &[
            ActivityRecord::new(1, "A100", "Design", TaskType::TaskDependent, day(1, 1), day(1, 5) + offset),
            ActivityRecord::new(2, "A200", "Build", TaskType::TaskDependent, day(1, 6), day(1, 9)),
        ],
        &[PrecedenceEdge::new(1, 2)],
    )
    .unwrap()
}

#[test]
fn subset_csv_has_header_and_one_line_per_task() {
    let index = snapshot(0);
    let mut buf = Vec::new();
    write_subset_csv(&index.query().all(), &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "task_id,task_code,task_name,task_type,start_date,end_date,predecessors,successors"
    );
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "1,A100,Design,TT_Task,2024-01-01 00:00:00,2024-01-05 00:00:00,,2");
}

#[test]
fn filtered_subset_is_written_to_file() {
    let index = snapshot(0);
    let subset = index
        .query()
        .filter(&TaskFilter::new().name_contains("build"))
        .unwrap();
    let tmp = NamedTempFile::new().unwrap();
    save_subset_to_csv(&subset, tmp.path()).unwrap();

    let text = fs::read_to_string(tmp.path()).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("A200"));
}

#[test]
fn comparison_csv_reports_minutes() {
    let (a, b) = (snapshot(2), snapshot(0));
    let result = ScheduleComparator::new().compare(&a, &b, JoinMode::Left).unwrap();
    let tmp = NamedTempFile::new().unwrap();
    save_comparison_to_csv(&result, tmp.path()).unwrap();

    let text = fs::read_to_string(tmp.path()).unwrap();
    assert!(text.starts_with("task_code,task_name,task_type,start_date,end_date,task_code_other"));
    let a100 = text.lines().find(|l| l.starts_with("A100")).unwrap();
    assert!(a100.ends_with(",0,2880"), "{a100}");
}
