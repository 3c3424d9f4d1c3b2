//! Export and import codec.
//!
//! Two formats:
//! - JSON: the snapshot layout, pretty-printed
//! - CSV: `ID,Title,Description,Status,Priority,Created At,Due Date`, every
//!   field quoted, timestamps at minute precision (`2024-03-01 09:30`)
//!
//! Decoding is all or nothing: the first malformed row fails the whole
//! batch with `Error::Import` naming the row.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{Error, Result};
use crate::lock;
use crate::task::{self, Task, TaskPriority, TaskStatus, UNASSIGNED_ID};

pub const CSV_HEADER: [&str; 7] = [
    "ID",
    "Title",
    "Description",
    "Status",
    "Priority",
    "Created At",
    "Due Date",
];

/// Timestamp layout in CSV cells
pub const CSV_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const CSV_TIME_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// Columns a CSV row needs: id, title, description, status
const CSV_MIN_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFormat {
    Json,
    Csv,
}

impl TransferFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TransferFormat::Json => "json",
            TransferFormat::Csv => "csv",
        }
    }

    /// Pick the format from the file extension (`.json` / `.csv`)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse().map_err(|_| {
            Error::InvalidArgument(format!(
                "unsupported file type: {} (expected .json or .csv)",
                path.display()
            ))
        })
    }
}

impl fmt::Display for TransferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TransferFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(TransferFormat::Json),
            "csv" => Ok(TransferFormat::Csv),
            other => Err(Error::InvalidArgument(format!(
                "unknown format '{other}' (expected json|csv)"
            ))),
        }
    }
}

pub fn encode(format: TransferFormat, tasks: &[Task]) -> Result<Vec<u8>> {
    match format {
        TransferFormat::Json => Ok(serde_json::to_vec_pretty(tasks)?),
        TransferFormat::Csv => encode_csv(tasks),
    }
}

/// Decode a batch; CSV rows without a creation time are stamped now
pub fn decode(format: TransferFormat, bytes: &[u8]) -> Result<Vec<Task>> {
    decode_at(format, bytes, task::now())
}

pub fn decode_at(format: TransferFormat, bytes: &[u8], now: NaiveDateTime) -> Result<Vec<Task>> {
    match format {
        TransferFormat::Json => serde_json::from_slice(bytes).map_err(|err| {
            Error::Import(format!("invalid JSON at line {}: {err}", err.line()))
        }),
        TransferFormat::Csv => decode_csv(bytes, now),
    }
}

/// Encode `tasks` into `path`, replacing it atomically
pub fn export_file(path: &Path, format: TransferFormat, tasks: &[Task]) -> Result<()> {
    lock::write_atomic(path, &encode(format, tasks)?)
}

/// Decode the batch stored at `path`
pub fn import_file(path: &Path, format: TransferFormat) -> Result<Vec<Task>> {
    let bytes = fs::read(path).map_err(|err| Error::storage_io(path, err))?;
    decode(format, &bytes)
}

fn encode_csv(tasks: &[Task]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(io::Error::from)?;
    for task in tasks {
        let row = [
            task.id.to_string(),
            task.title.clone(),
            task.description.clone().unwrap_or_default(),
            task.status.as_str().to_string(),
            task.priority.as_str().to_string(),
            task.created_at.format(CSV_TIME_FORMAT).to_string(),
            task.due_date
                .map(|due| due.format(CSV_TIME_FORMAT).to_string())
                .unwrap_or_default(),
        ];
        writer.write_record(&row).map_err(io::Error::from)?;
    }

    writer
        .into_inner()
        .map_err(|err| Error::Io(io::Error::new(err.error().kind(), err.to_string())))
}

fn decode_csv(bytes: &[u8], now: NaiveDateTime) -> Result<Vec<Task>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut tasks = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // Header is line 1.
        let row = index + 2;
        let record = record.map_err(|err| Error::Import(format!("row {row}: {err}")))?;
        tasks.push(parse_row(&record, row, now)?);
    }
    Ok(tasks)
}

fn parse_row(record: &StringRecord, row: usize, now: NaiveDateTime) -> Result<Task> {
    if record.len() < CSV_MIN_COLUMNS {
        return Err(Error::Import(format!(
            "row {row}: expected at least {CSV_MIN_COLUMNS} columns, found {}",
            record.len()
        )));
    }
    let cell = |column: usize| record.get(column).map(str::trim).unwrap_or_default();

    // Imports are renumbered, so an id that does not parse is just dropped.
    let id = cell(0).parse().unwrap_or(UNASSIGNED_ID);

    let description = record
        .get(2)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let status: TaskStatus = cell(3)
        .parse()
        .map_err(|err| Error::Import(format!("row {row}: {err}")))?;

    let priority = match cell(4) {
        "" => TaskPriority::default(),
        raw => raw
            .parse()
            .map_err(|err| Error::Import(format!("row {row}: {err}")))?,
    };

    let created_at = parse_cell_time(cell(5), row, "Created At")?.unwrap_or(now);
    let due_date = parse_cell_time(cell(6), row, "Due Date")?;

    Ok(Task {
        id,
        title: record.get(1).unwrap_or_default().to_string(),
        description,
        status,
        priority,
        created_at,
        updated_at: created_at,
        due_date,
        completed_at: None,
    })
}

fn parse_cell_time(raw: &str, row: usize, column: &str) -> Result<Option<NaiveDateTime>> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(raw, CSV_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, CSV_TIME_FORMAT_SECONDS))
        .map(Some)
        .map_err(|_| Error::Import(format!("row {row}: invalid {column} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn sample() -> Vec<Task> {
        let mut first = Task::from_draft(
            1,
            TaskDraft::new("Write spec")
                .description("covers \"store\", analytics")
                .priority(TaskPriority::High)
                .due(at(9, 17, 0)),
            at(1, 9, 30),
        );
        first.status = TaskStatus::InProgress;
        let second = Task::from_draft(2, TaskDraft::new("Ship it"), at(2, 10, 5));
        vec![first, second]
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            TransferFormat::from_path(Path::new("out/tasks.JSON")).unwrap(),
            TransferFormat::Json
        );
        assert_eq!(
            TransferFormat::from_path(Path::new("tasks.csv")).unwrap(),
            TransferFormat::Csv
        );
        assert!(matches!(
            TransferFormat::from_path(Path::new("tasks.xlsx")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(TransferFormat::from_path(Path::new("tasks")).is_err());
    }

    #[test]
    fn json_round_trip_keeps_every_field() {
        let mut tasks = sample();
        tasks[1].transition(TaskStatus::Completed, at(3, 8, 0));

        let bytes = encode(TransferFormat::Json, &tasks).unwrap();
        assert!(String::from_utf8(bytes.clone()).unwrap().contains("\n  {"));

        let decoded = decode(TransferFormat::Json, &bytes).unwrap();
        assert_eq!(decoded, tasks);
    }

    #[test]
    fn csv_quotes_every_field() {
        let bytes = encode(TransferFormat::Csv, &sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            r#""ID","Title","Description","Status","Priority","Created At","Due Date""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""1","Write spec","covers ""store"", analytics","IN_PROGRESS","HIGH","2024-03-01 09:30","2024-03-09 17:00""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""2","Ship it","","PENDING","MEDIUM","2024-03-02 10:05","""#
        );
    }

    #[test]
    fn csv_round_trip_at_minute_precision() {
        let tasks = sample();
        let bytes = encode(TransferFormat::Csv, &tasks).unwrap();
        let decoded = decode(TransferFormat::Csv, &bytes).unwrap();
        assert_eq!(decoded, tasks);
    }

    #[test]
    fn csv_round_trip_keeps_description_whitespace() {
        let tasks = vec![Task::from_draft(
            1,
            TaskDraft::new("Checklist").description("  - step one\n  - step two\n"),
            at(3, 14, 45),
        )];
        let bytes = encode(TransferFormat::Csv, &tasks).unwrap();
        let decoded = decode(TransferFormat::Csv, &bytes).unwrap();
        assert_eq!(decoded, tasks);
    }

    #[test]
    fn csv_unparsable_ids_are_left_unassigned() {
        let csv = "ID,Title,Description,Status\nabc,First,,PENDING\n-4,Second,,PENDING\n 7 ,Third,,PENDING\n";
        let tasks = decode(TransferFormat::Csv, csv.as_bytes()).unwrap();
        let ids: Vec<u64> = tasks.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![UNASSIGNED_ID, UNASSIGNED_ID, 7]);
    }

    #[test]
    fn csv_optional_columns_fall_back_to_defaults() {
        let csv = "ID,Title,Description,Status\n,Bare,,COMPLETED\n";
        let now = at(5, 12, 0);

        let tasks = decode_at(TransferFormat::Csv, csv.as_bytes(), now).unwrap();

        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, UNASSIGNED_ID);
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn csv_invalid_status_names_the_row() {
        let csv = "ID,Title,Description,Status\n1,Good,,PENDING\n2,Bad,,FINISHED\n";
        let err = decode(TransferFormat::Csv, csv.as_bytes()).unwrap_err();
        match err {
            Error::Import(message) => {
                assert!(message.contains("row 3"), "{message}");
                assert!(message.contains("FINISHED"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_short_rows_are_rejected() {
        let csv = "ID,Title,Description,Status\n1,Only,three\n";
        let err = decode(TransferFormat::Csv, csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(message) if message.contains("row 2")));
    }

    #[test]
    fn csv_bad_timestamp_is_rejected() {
        let csv = "ID,Title,Description,Status,Priority,Created At\n1,T,,PENDING,LOW,March 1st\n";
        let err = decode(TransferFormat::Csv, csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(message) if message.contains("Created At")));
    }

    #[test]
    fn malformed_json_is_an_import_error() {
        let err = decode(TransferFormat::Json, b"[{\"title\": ").unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn export_and_import_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("backup.csv");

        let format = TransferFormat::from_path(&path).unwrap();
        export_file(&path, format, &sample()).unwrap();

        let tasks = import_file(&path, format).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Write spec");
    }
}
