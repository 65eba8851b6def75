use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use polars::prelude::{AnyValue, DataFrame};
use schedule_lens::export::{save_comparison_to_csv, save_subset_to_csv};
use schedule_lens::task::parse_timestamp;
use schedule_lens::{
    JoinMode, ScheduleComparator, ScheduleIndex, ScheduleSource, Settings, TaskFilter, TaskSubset,
    TaskType, logging, open_source,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Index, filter and diff project schedule snapshots")]
struct Cli {
    /// Settings file (defaults to ./schedule-lens.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the projects in a schedule file with their activity counts
    Projects {
        /// .xer or .json schedule file
        file: PathBuf,
    },

    /// Show a project's tasks, optionally filtered
    Tasks {
        file: PathBuf,
        project: String,

        #[arg(long, value_parser = parse_datetime_arg)]
        min_start: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime_arg)]
        max_start: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime_arg)]
        min_end: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime_arg)]
        max_end: Option<NaiveDateTime>,

        /// Task types to keep, e.g. TT_Task,TT_Mile
        #[arg(long = "type", value_delimiter = ',', value_parser = parse_task_type_arg)]
        task_types: Vec<TaskType>,

        /// Case-insensitive substring of the task name
        #[arg(long)]
        name: Option<String>,

        /// Write the result to a CSV file instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show the tasks that follow a task
    Successors {
        file: PathBuf,
        project: String,
        task_code: String,

        /// Number of hops to follow
        #[arg(long, default_value_t = 1)]
        depth: usize,
    },

    /// Show the tasks that precede a task
    Predecessors {
        file: PathBuf,
        project: String,
        task_code: String,

        #[arg(long, default_value_t = 1)]
        depth: usize,
    },

    /// Compare two snapshots of a schedule
    Compare {
        file: PathBuf,
        project: String,

        /// Snapshot to compare against
        #[arg(long)]
        project_b: String,

        /// File holding the second snapshot (defaults to FILE)
        #[arg(long)]
        file_b: Option<PathBuf>,

        /// inner or left (overrides config)
        #[arg(long, value_parser = parse_join_arg)]
        how: Option<JoinMode>,

        /// Natural key fields (overrides config)
        #[arg(long, value_delimiter = ',')]
        key: Vec<String>,

        /// Only keep tasks whose dates moved
        #[arg(long)]
        shifted_only: bool,

        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn parse_datetime_arg(s: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(s).ok_or_else(|| format!("invalid timestamp '{s}' (expected YYYY-MM-DD[ HH:MM[:SS]])"))
}

fn parse_task_type_arg(s: &str) -> Result<TaskType, String> {
    s.parse().map_err(|e: schedule_lens::ScheduleError| e.to_string())
}

fn parse_join_arg(s: &str) -> Result<JoinMode, String> {
    s.parse().map_err(|e: schedule_lens::ScheduleError| e.to_string())
}

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::List(inner) => (0..inner.len())
            .filter_map(|i| inner.get(i).ok())
            .map(|v| cell_text(&v))
            .collect::<Vec<_>>()
            .join(","),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame, max_rows: usize) -> String {
    let shown = df.height().min(max_rows);
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(shown);
    for row_idx in 0..shown {
        cells.push(
            columns
                .iter()
                .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect(),
        );
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    for row in &cells {
        for (ci, s) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(s.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let push_row = |out: &mut String, row: &[String]| {
        out.push('|');
        for (ci, s) in row.iter().enumerate() {
            out.push(' ');
            out.push_str(s);
            out.push_str(&" ".repeat(widths[ci].saturating_sub(s.chars().count())));
            out.push_str(" |");
        }
        out.push('\n');
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &col_names);
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        push_row(&mut out, row);
    }
    out.push_str(&sep);
    out.push('\n');
    if df.height() > shown {
        out.push_str(&format!("... {} more rows\n", df.height() - shown));
    }
    out
}

fn load_index(source: &(dyn ScheduleSource + Send + Sync), project: &str) -> Result<ScheduleIndex> {
    let started = Instant::now();
    let index = source
        .load_index(project)
        .with_context(|| format!("loading project '{project}'"))?;
    info!(
        project,
        tasks = index.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built schedule index"
    );
    Ok(index)
}

fn open(file: &Path) -> Result<Box<dyn ScheduleSource + Send + Sync>> {
    open_source(file).with_context(|| format!("opening {}", file.display()))
}

fn print_subset(subset: &TaskSubset<'_>, settings: &Settings) -> Result<()> {
    let df = subset.to_dataframe()?;
    print!("{}", render_df_as_text_table(&df, settings.display.max_rows));
    println!("{} tasks", subset.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("loading settings")?;
    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Projects { file } => {
            let source = open(&file)?;
            for name in source.list_project_names()? {
                let project = source.load_project(&name)?;
                println!("{name}\t{}", project.activities.len());
            }
        }
        Commands::Tasks {
            file,
            project,
            min_start,
            max_start,
            min_end,
            max_end,
            task_types,
            name,
            csv,
        } => {
            let source = open(&file)?;
            let index = load_index(source.as_ref(), &project)?;
            let filter = TaskFilter {
                min_start,
                max_start,
                min_end,
                max_end,
                task_types: (!task_types.is_empty()).then(|| task_types.into_iter().collect()),
                name_contains: name,
            };
            let started = Instant::now();
            let subset = index.query().filter(&filter)?;
            info!(
                rows = subset.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "filtered tasks"
            );
            match csv {
                Some(path) => {
                    save_subset_to_csv(&subset, &path)?;
                    println!("wrote {} tasks to {}", subset.len(), path.display());
                }
                None => print_subset(&subset, &settings)?,
            }
        }
        Commands::Successors {
            file,
            project,
            task_code,
            depth,
        } => {
            let source = open(&file)?;
            let index = load_index(source.as_ref(), &project)?;
            let subset = index.query().successors_within(&task_code, depth)?;
            print_subset(&subset, &settings)?;
        }
        Commands::Predecessors {
            file,
            project,
            task_code,
            depth,
        } => {
            let source = open(&file)?;
            let index = load_index(source.as_ref(), &project)?;
            let subset = index.query().predecessors_within(&task_code, depth)?;
            print_subset(&subset, &settings)?;
        }
        Commands::Compare {
            file,
            project,
            project_b,
            file_b,
            how,
            key,
            shifted_only,
            csv,
        } => {
            let source_a = open(&file)?;
            let source_b = match &file_b {
                Some(path) => Some(open(path)?),
                None => None,
            };
            let source_b = source_b.as_deref().unwrap_or(source_a.as_ref());

            let (a, b) = rayon::join(
                || load_index(source_a.as_ref(), &project),
                || load_index(source_b, &project_b),
            );
            let (a, b) = (a?, b?);

            let natural_key = if key.is_empty() {
                settings.compare.natural_key.clone()
            } else {
                key
            };
            let join = how.unwrap_or(settings.compare.join);

            let started = Instant::now();
            let mut result = ScheduleComparator::with_natural_key(natural_key).compare(&a, &b, join)?;
            info!(
                rows = result.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "compared snapshots"
            );
            if shifted_only {
                result = result.only_shifted();
            }

            match csv {
                Some(path) => {
                    save_comparison_to_csv(&result, &path)?;
                    println!("wrote {} rows to {}", result.len(), path.display());
                }
                None => {
                    let df = result.to_dataframe()?;
                    print!("{}", render_df_as_text_table(&df, settings.display.max_rows));
                    println!(
                        "{} rows, {} shifted, {} unmatched",
                        result.len(),
                        result.shifted().count(),
                        result.unmatched().count()
                    );
                }
            }
        }
    }

    Ok(())
}
