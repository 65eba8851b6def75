use chrono::{NaiveDate, NaiveDateTime};
use schedule_lens::source::save_projects_to_json;
use schedule_lens::{
    ActivityRecord, InMemorySource, JsonProjectFile, PrecedenceEdge, ProjectData, ScheduleError,
    ScheduleSource, TaskId, TaskType, XerFile, open_source,
};
use std::fs;
use tempfile::tempdir;

fn day(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, d)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn sample_project() -> ProjectData {
    ProjectData::new(
        vec![
            ActivityRecord::new(1, "A100", "Mobilise", TaskType::TaskDependent, day(1, 1), day(1, 5)),
            ActivityRecord::new(2, "A200", "Excavate", TaskType::TaskDependent, day(1, 6), day(1, 9)),
        ],
        vec![PrecedenceEdge::new(1, 2)],
    )
}

const XER: &str = "ERMHDR\t19.12\t2024-03-01\tProject\tadmin\n\
%T\tPROJECT\n\
%F\tproj_id\tproj_short_name\tplan_start_date\n\
%R\t100\tPLANT-A\t2024-01-01 08:00\n\
%R\t200\tPLANT-B\t2024-01-01 08:00\n\
%T\tTASK\n\
%F\ttask_id\tproj_id\twbs_id\ttask_code\ttask_name\ttask_type\tact_start_date\tact_end_date\ttarget_start_date\ttarget_end_date\n\
%R\t1001\t100\t1\tA100\tMobilise\tTT_Task\t2024-01-01 08:00\t2024-01-05 17:00\t2024-01-01 08:00\t2024-01-05 17:00\n\
%R\t1002\t100\t1\tA200\tExcavate\tTT_Task\t\t\t2024-01-08 08:00\t2024-01-12 17:00\n\
%R\t1003\t100\t1\tM300\tFoundations done\tTT_FinMile\t\t\t2024-01-12 17:00\t2024-01-12 17:00\n\
%R\t2001\t200\t2\tB100\tSurvey\tTT_Task\t\t\t2024-02-01 08:00\t2024-02-02 17:00\n\
%T\tTASKPRED\n\
%F\ttask_pred_id\ttask_id\tpred_task_id\tproj_id\tpred_proj_id\tpred_type\n\
%R\t1\t1002\t1001\t100\t100\tPR_FS\n\
%R\t2\t1003\t1002\t100\t100\tPR_FS\n\
%E\n";

#[test]
fn in_memory_source_lists_and_loads() {
    let source = InMemorySource::new()
        .with_project("Zeta", sample_project())
        .with_project("Alpha", sample_project());
    assert_eq!(source.list_project_names().unwrap(), ["Alpha", "Zeta"]);

    let index = source.load_index("Alpha").unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(
        index.query().successors_of("A100").unwrap().codes().unwrap(),
        ["A200"]
    );
}

#[test]
fn missing_project_is_reported() {
    let source = InMemorySource::new().with_project("Alpha", sample_project());
    match source.load_project("Beta") {
        Err(ScheduleError::ProjectNotFound { project }) => assert_eq!(project, "Beta"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn json_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.json");
    let project = sample_project();
    save_projects_to_json(&[("PLANT", &project)], &path).unwrap();

    let file = JsonProjectFile::open(&path).unwrap();
    assert_eq!(file.list_project_names().unwrap(), ["PLANT"]);
    assert_eq!(file.load_project("PLANT").unwrap(), project);
    assert!(file.load_project("OTHER").is_err());
}

#[test]
fn json_relationships_are_optional() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bare.json");
    fs::write(
        &path,
        r#"{"projects": [{"name": "P", "activities": [
            {"task_id": "X1", "task_code": "A1", "task_name": "One", "task_type": "TT_Mile",
             "start_date": "2024-01-01T08:00:00", "end_date": "2024-01-01T08:00:00"}
        ]}]}"#,
    )
    .unwrap();

    let data = JsonProjectFile::open(&path).unwrap().load_project("P").unwrap();
    assert!(data.relationships.is_empty());
    assert_eq!(data.activities[0].task_id, TaskId::Text("X1".into()));
    assert_eq!(data.activities[0].task_type, TaskType::StartMilestone);
}

#[test]
fn xer_projects_are_split_by_proj_id() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.xer");
    fs::write(&path, XER).unwrap();

    let xer = XerFile::open(&path).unwrap();
    assert_eq!(xer.list_project_names().unwrap(), ["PLANT-A", "PLANT-B"]);

    let a = xer.load_project("PLANT-A").unwrap();
    assert_eq!(a.activities.len(), 3);
    assert_eq!(a.relationships.len(), 2);
    let b = xer.load_project("PLANT-B").unwrap();
    assert_eq!(b.activities.len(), 1);
    assert!(b.relationships.is_empty());

    assert!(matches!(
        xer.load_project("PLANT-C"),
        Err(ScheduleError::ProjectNotFound { .. })
    ));
}

#[test]
fn xer_index_resolves_relationships_and_dates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.xer");
    fs::write(&path, XER).unwrap();

    let index = open_source(&path).unwrap().load_index("PLANT-A").unwrap();
    let q = index.query();
    assert_eq!(q.successors_of("A100").unwrap().codes().unwrap(), ["A200"]);
    assert_eq!(q.predecessors_of("M300").unwrap().codes().unwrap(), ["A200"]);

    let a200 = index.task("A200").unwrap();
    assert_eq!(a200.task_id, TaskId::Int(1002));
    assert_eq!(
        a200.start_date,
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap().and_hms_opt(8, 0, 0).unwrap()
    );
    assert_eq!(index.task("M300").unwrap().task_type, TaskType::FinishMilestone);
}

#[test]
fn unknown_extension_is_unsupported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.mpp");
    fs::write(&path, b"binary").unwrap();
    assert!(matches!(
        open_source(&path),
        Err(ScheduleError::UnsupportedSource { .. })
    ));
}
