pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod logging;
pub mod query;
pub mod schedule;
pub mod source;
pub mod task;

pub use compare::{ComparisonResult, ComparisonRow, JoinMode, ScheduleComparator};
pub use config::Settings;
pub use error::{ScheduleError, ScheduleResult};
pub use query::{ScheduleQuery, TaskFilter, TaskSubset};
pub use schedule::{IdKind, ScheduleIndex};
pub use source::{InMemorySource, JsonProjectFile, ProjectData, ScheduleSource, XerFile, open_source};
pub use task::{ActivityRecord, PrecedenceEdge, Task, TaskId, TaskType};
