//! Append-only CSV log of weekly summaries.
//!
//! The log is the single source of truth: every processed update becomes one
//! row, rows are never edited, and all history queries re-read the file.
//! The only full rewrite is the one-shot header migration in
//! [`AppendLog::migrate_schema`].

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::error::Result;
use crate::fields::ActivityType;
use crate::task::WeeklyTaskSummary;

/// Current column set, in file order.
pub const LOG_COLUMNS: [&str; 8] = [
    "timestamp",
    "id",
    "project",
    "context",
    "activity_type",
    "input_excerpt",
    "generated_tasks",
    "overlooked_tasks",
];

/// One raw row of the log, every cell as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: String,
    pub id: String,
    pub project: String,
    pub context: String,
    pub activity_type: String,
    pub input_excerpt: String,
    pub generated_tasks: String,
    pub overlooked_tasks: String,
}

impl LogRow {
    /// Encode a summary. Absent project/context become empty cells.
    pub fn from_summary(summary: &WeeklyTaskSummary) -> Result<Self> {
        Ok(LogRow {
            timestamp: summary.created_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            id: summary.id.clone(),
            project: summary.project.clone().unwrap_or_default(),
            context: summary.context.clone().unwrap_or_default(),
            activity_type: summary.activity_type.as_str().to_string(),
            input_excerpt: summary.input_excerpt.clone(),
            generated_tasks: serde_json::to_string(&summary.generated_tasks)?,
            overlooked_tasks: serde_json::to_string(&summary.overlooked_tasks)?,
        })
    }

    /// Map a record onto the current columns using the header it was read
    /// under. Columns the header lacks come back empty.
    pub fn from_record(header: &[String], fields: &[String]) -> Self {
        let get = |column: &str| {
            header
                .iter()
                .position(|h| h == column)
                .and_then(|i| fields.get(i))
                .cloned()
                .unwrap_or_default()
        };
        LogRow {
            timestamp: get("timestamp"),
            id: get("id"),
            project: get("project"),
            context: get("context"),
            activity_type: get("activity_type"),
            input_excerpt: get("input_excerpt"),
            generated_tasks: get("generated_tasks"),
            overlooked_tasks: get("overlooked_tasks"),
        }
    }

    /// Cells in `LOG_COLUMNS` order.
    pub fn fields(&self) -> [&str; 8] {
        [
            self.timestamp.as_str(),
            self.id.as_str(),
            self.project.as_str(),
            self.context.as_str(),
            self.activity_type.as_str(),
            self.input_excerpt.as_str(),
            self.generated_tasks.as_str(),
            self.overlooked_tasks.as_str(),
        ]
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Decode into a summary, or `None` when the row is malformed.
    ///
    /// An unknown or empty activity type falls back to the default instead of
    /// rejecting the row.
    pub fn to_summary(&self) -> Option<WeeklyTaskSummary> {
        if self.id.is_empty() {
            return None;
        }
        let created_at = self.created_at()?;
        let generated_tasks = decode_tasks(&self.generated_tasks)?;
        let overlooked_tasks = decode_tasks(&self.overlooked_tasks)?;
        Some(WeeklyTaskSummary {
            id: self.id.clone(),
            created_at,
            project: Some(self.project.clone()).filter(|p| !p.is_empty()),
            context: Some(self.context.clone()).filter(|c| !c.is_empty()),
            activity_type: ActivityType::parse(&self.activity_type).unwrap_or_default(),
            input_excerpt: self.input_excerpt.clone(),
            generated_tasks,
            overlooked_tasks,
        })
    }
}

/// Accepts RFC 3339 (including a `Z` suffix) or a naive ISO timestamp, read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn decode_tasks(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    serde_json::from_str(raw).ok()
}

/// Handle to the on-disk log.
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    /// Open the log at `path`, creating or upgrading the file as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let log = AppendLog { path: path.into() };
        log.ensure_schema()?;
        log.migrate_schema()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with just the header when it does not exist.
    pub fn ensure_schema(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut f = File::create(&self.path)?;
        f.write_all(encode_record(&LOG_COLUMNS).as_bytes())?;
        f.flush()?;
        Ok(())
    }

    /// Rewrite the file under the current header if it was written under a
    /// different one. Returns whether a rewrite happened.
    ///
    /// Rows keep their cells by column name; a missing or empty
    /// `activity_type` is backfilled with the default. A backup copy is taken
    /// first.
    pub fn migrate_schema(&self) -> Result<bool> {
        let content = read_text(&self.path)?;
        let mut records = parse_records(&content).into_iter();
        let header = records.next().unwrap_or_default();
        if header.iter().map(String::as_str).eq(LOG_COLUMNS) {
            return Ok(false);
        }

        if !content.is_empty() {
            let backup = create_backup(&self.path)?;
            info!(backup = %backup.display(), "backed up log before migration");
        }

        let mut out = encode_record(&LOG_COLUMNS);
        let mut migrated = 0usize;
        for fields in records {
            let mut row = LogRow::from_record(&header, &fields);
            if row.activity_type.trim().is_empty() {
                row.activity_type = ActivityType::default().as_str().to_string();
            }
            out.push_str(&encode_record(&row.fields()));
            migrated += 1;
        }

        let tmp = self.path.with_extension("csv.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(out.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), rows = migrated, "migrated log to current columns");
        Ok(true)
    }

    /// Append one summary as a single write at the end of the file.
    ///
    /// A last row left without its line break gets one first, so the new row
    /// never merges into it.
    pub fn append(&self, summary: &WeeklyTaskSummary) -> Result<()> {
        self.ensure_schema()?;
        let row = LogRow::from_summary(summary)?;
        let mut f = OpenOptions::new().read(true).append(true).open(&self.path)?;

        let mut line = String::new();
        if f.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            f.seek(SeekFrom::End(-1))?;
            f.read_exact(&mut last)?;
            if !matches!(last[0], b'\n' | b'\r') {
                warn!(path = %self.path.display(), "log did not end with a line break");
                line.push_str("\r\n");
            }
        }
        line.push_str(&encode_record(&row.fields()));
        f.write_all(line.as_bytes())?;
        f.flush()?;
        Ok(())
    }

    /// Every data row in file order. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<LogRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = read_text(&self.path)?;
        let mut records = parse_records(&content).into_iter();
        let Some(header) = records.next() else {
            return Ok(Vec::new());
        };
        Ok(records.map(|fields| LogRow::from_record(&header, &fields)).collect())
    }

    /// Decodable summaries in file order; malformed rows are logged and skipped.
    pub fn read_summaries(&self) -> Result<Vec<WeeklyTaskSummary>> {
        let rows = self.read_all()?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.to_summary() {
                Some(summary) => out.push(summary),
                None => warn!(id = %row.id, timestamp = %row.timestamp, "skipping malformed log row"),
            }
        }
        Ok(out)
    }
}

/// File contents as text. Bytes that are not UTF-8 (a log re-saved in a
/// legacy code page, say) become U+FFFD instead of failing the whole read.
fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(path = %path.display(), "log contains invalid UTF-8; replacing bad bytes");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Copy the log into a `backup/` directory next to it with a timestamped name.
pub fn create_backup(log_path: &Path) -> Result<PathBuf> {
    let parent_dir = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.3f");
    let file_name = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("weekly_tasks_log.csv");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
    fs::copy(log_path, &backup_path)?;
    Ok(backup_path)
}

/// Quote a cell when it holds a delimiter, quote or line break.
pub fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// One CSV line, including the trailing newline.
pub fn encode_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_csv(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// Parse CSV text into records. Quoted cells may contain commas, doubled
/// quotes and line breaks. Blank lines are skipped.
pub fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // Distinguishes an empty line from a record holding one empty quoted cell.
    let mut touched = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                touched = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                touched = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if touched || !field.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                touched = false;
            }
            _ => field.push(ch),
        }
    }
    if touched || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample(id: &str) -> WeeklyTaskSummary {
        WeeklyTaskSummary {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 8, 9, 30, 0).unwrap(),
            project: Some("Atlas, \"core\"".into()),
            context: None,
            activity_type: ActivityType::EngineeringDelivery,
            input_excerpt: "Line one.\nLine two, with comma.".into(),
            generated_tasks: vec!["Lead the rollout.".into(), "Drive \"quoted\" work.".into()],
            overlooked_tasks: vec!["Ensure follow-up on legal.".into()],
        }
    }

    fn header_line() -> String {
        LOG_COLUMNS.join(",")
    }

    #[test]
    fn test_open_creates_header_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("log.csv");
        let log = AppendLog::open(&path).unwrap();
        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, format!("{}\r\n", header_line()));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_row_round_trip() {
        let dir = tempdir().unwrap();
        let log = AppendLog::open(dir.path().join("log.csv")).unwrap();
        let summary = sample("one");
        log.append(&summary).unwrap();

        let back = log.read_summaries().unwrap();
        assert_eq!(back, vec![summary]);
    }

    #[test]
    fn test_append_does_not_touch_existing_rows() {
        let dir = tempdir().unwrap();
        let log = AppendLog::open(dir.path().join("log.csv")).unwrap();
        log.append(&sample("one")).unwrap();
        let before = fs::read_to_string(log.path()).unwrap();
        log.append(&sample("two")).unwrap();
        let after = fs::read_to_string(log.path()).unwrap();
        assert!(after.starts_with(&before));
        let ids: Vec<_> = log.read_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let good = encode_record(&LogRow::from_summary(&sample("good")).unwrap().fields());
        let content = format!(
            "{}\r\nnot-a-date,bad1,,,,x,[],[]\r\n2025-01-08T09:00:00+00:00,bad2,,,,x,[oops,[]\r\n{good}",
            header_line()
        );
        fs::write(&path, content).unwrap();
        let log = AppendLog::open(&path).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 3);
        let ids: Vec<_> = log.read_summaries().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn test_unknown_activity_defaults() {
        let row = LogRow {
            timestamp: "2025-01-08T09:00:00Z".into(),
            id: "x".into(),
            activity_type: "space_travel".into(),
            generated_tasks: "[]".into(),
            overlooked_tasks: "[]".into(),
            ..LogRow::default()
        };
        let summary = row.to_summary().unwrap();
        assert_eq!(summary.activity_type, ActivityType::CampaignExecution);
        assert_eq!(summary.project, None);
    }

    #[test]
    fn test_migrates_legacy_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let legacy = "timestamp,id,project,context,input_excerpt,generated_tasks,overlooked_tasks\n\
2024-11-04T10:00:00.000000+00:00,legacy-1,Atlas,sync,Old text,\"[\"\"Lead it.\"\"]\",[]\n";
        fs::write(&path, legacy).unwrap();

        let log = AppendLog::open(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&header_line()));
        let rows = log.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].activity_type, "campaign_execution");
        assert_eq!(rows[0].project, "Atlas");
        assert_eq!(rows[0].generated_tasks, r#"["Lead it."]"#);

        let backups: Vec<_> = fs::read_dir(dir.path().join("backup")).unwrap().collect();
        assert_eq!(backups.len(), 1);
        // Second open is a no-op.
        assert!(!log.migrate_schema().unwrap());
    }

    #[test]
    fn test_empty_file_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "").unwrap();
        AppendLog::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\r\n", header_line()));
        assert!(!dir.path().join("backup").exists());
    }

    #[test]
    fn test_append_repairs_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let log = AppendLog::open(&path).unwrap();
        log.append(&sample("one")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.trim_end_matches(['\r', '\n'])).unwrap();

        log.append(&sample("two")).unwrap();
        let ids: Vec<_> = log.read_summaries().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["one", "two"]);
        assert!(fs::read_to_string(&path).unwrap().ends_with("\r\n"));
    }

    #[test]
    fn test_non_utf8_bytes_do_not_fail_the_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut content = format!("{}\r\n", header_line()).into_bytes();
        content.extend_from_slice(b"2025-01-08T09:00:00+00:00,cp1252,Caf\xe9,,ops_compliance,x,[],[]\r\n");
        fs::write(&path, content).unwrap();

        let log = AppendLog::open(&path).unwrap();
        log.append(&sample("utf8")).unwrap();
        let summaries = log.read_summaries().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].project.as_deref(), Some("Caf\u{FFFD}"));
        assert_eq!(summaries[1].id, "utf8");
    }

    #[test]
    fn test_parse_records_quoting() {
        let records = parse_records("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\r\n\"multi\nline\",,\"\"\n");
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b,c".into(), "say \"hi\"".into()],
                vec!["multi\nline".to_string(), "".into(), "".into()],
            ]
        );
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 8, 9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-08T09:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-08T09:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-08T09:00:00.000000"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-08"), None);
    }
}
