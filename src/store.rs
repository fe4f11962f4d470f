use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::{FlowError, FlowResult};
use crate::record::{SessionRecord, TIMESTAMP_FORMAT};

/// Ordered session history backed by a JSON file that is rewritten on
/// every change.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: Vec<SessionRecord>,
}

impl RecordStore {
    /// Empty store bound to `path`; nothing is read yet
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
        }
    }

    /// Bind to `path` and load whatever history is already there
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let mut store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory history with the file contents.
    ///
    /// A missing file means empty history. A file that is not a JSON array
    /// is logged and ignored; inside an array, entries that fail to parse
    /// are skipped and the rest are kept. Returns the number loaded.
    pub fn load(&mut self) -> usize {
        self.records = match read_records(&self.path) {
            Ok(records) => records,
            Err(e) => {
                warn!("starting with empty history: {}", e);
                Vec::new()
            }
        };
        debug!(
            "loaded {} records from {}",
            self.records.len(),
            self.path.display()
        );
        self.records.len()
    }

    pub fn append(&mut self, record: SessionRecord) -> FlowResult<()> {
        info!(
            "recording '{}' ({}s work, {}s break)",
            record.task_name, record.work_duration, record.break_duration
        );
        self.records.push(record);
        self.save()
    }

    /// Serialize the full history, overwriting the file
    pub fn save(&self) -> FlowResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| persistence(&self.path, e))?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.records)?;
        fs::write(&self.path, data).map_err(|e| persistence(&self.path, e))
    }

    /// Drop all history and remove the backing file
    pub fn clear(&mut self) -> FlowResult<()> {
        self.records.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared history at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence(&self.path, e)),
        }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// History in display order
    pub fn newest_first(&self) -> impl Iterator<Item = &SessionRecord> {
        self.records.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_work_seconds(&self) -> u64 {
        self.records.iter().map(|r| r.work_duration).sum()
    }

    pub fn total_break_seconds(&self) -> u64 {
        self.records.iter().map(|r| r.break_duration).sum()
    }

    /// Tab-separated table of the history, oldest first
    pub fn export_tsv<W: Write>(&self, writer: W) -> FlowResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        wtr.write_record(["Task", "Start", "End", "Work", "Break"])?;

        for r in &self.records {
            wtr.write_record(&[
                r.task_name.clone(),
                r.start_time.format(TIMESTAMP_FORMAT).to_string(),
                r.end_time.format(TIMESTAMP_FORMAT).to_string(),
                r.work_display(),
                r.break_display(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P) -> FlowResult<()> {
        let file = fs::File::create(path.as_ref())?;
        self.export_tsv(file)?;
        info!("exported {} records to {}", self.len(), path.as_ref().display());
        Ok(())
    }
}

fn persistence(path: &Path, e: io::Error) -> FlowError {
    FlowError::Persistence(format!("{}: {}", path.display(), e))
}

fn read_records(path: &Path) -> FlowResult<Vec<SessionRecord>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(persistence(path, e)),
    };

    let values: Vec<serde_json::Value> = serde_json::from_slice(&bytes).map_err(|e| {
        FlowError::Persistence(format!("{} is not a record list: {}", path.display(), e))
    })?;

    let mut records = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<SessionRecord>(value) {
            Ok(rec) => records.push(rec),
            Err(e) => warn!("skipping malformed record #{} in {}: {}", idx, path.display(), e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::tempdir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sample() -> Vec<SessionRecord> {
        vec![
            SessionRecord::new("email", at(8, 0), at(8, 20)).with_break(180),
            SessionRecord::new("deep work", at(9, 0), at(10, 40)).with_break(1200),
            SessionRecord::new("review", at(11, 0), at(11, 30)),
        ]
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("none.json"));
        assert!(store.is_empty());
        assert_eq!(store.total_work_seconds(), 0);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let mut store = RecordStore::new(&path);
        for r in sample() {
            store.append(r).unwrap();
        }

        let reloaded = RecordStore::open(&path);
        assert_eq!(reloaded.records(), sample().as_slice());
    }

    #[test]
    fn test_append_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("sessions.json");
        let mut store = RecordStore::new(&path);
        store.append(sample().remove(0)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_totals() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("s.json"));
        for r in sample() {
            store.append(r).unwrap();
        }
        assert_eq!(store.total_work_seconds(), (20 + 100 + 30) * 60);
        assert_eq!(store.total_break_seconds(), 180 + 1200);
    }

    #[test]
    fn test_newest_first() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("s.json"));
        for r in sample() {
            store.append(r).unwrap();
        }
        let names: Vec<&str> = store.newest_first().map(|r| r.task_name.as_str()).collect();
        assert_eq!(names, vec!["review", "deep work", "email"]);
    }

    #[test]
    fn test_corrupt_file_is_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, "{ definitely not a list").unwrap();
        let store = RecordStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_good_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(
            &path,
            r#"[
                {"task_name":"ok","start_time":"2024-05-02 08:00:00","end_time":"2024-05-02 08:10:00","work_seconds":600,"break_seconds":0},
                {"task":"legacy","start":"08:00","end":"08:10","duration":"0:10:00","work_sec":600},
                {"task_name":"also ok","start_time":"2024-05-02 09:00:00","end_time":"2024-05-02 09:05:00","work_seconds":300}
            ]"#,
        )
        .unwrap();
        let store = RecordStore::open(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1].task_name, "also ok");
        assert_eq!(store.records()[1].break_duration, 0);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.json");
        let mut store = RecordStore::new(&path);
        store.append(sample().remove(0)).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
        assert!(RecordStore::open(&path).is_empty());
    }

    #[test]
    fn test_clear_without_file() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("s.json"));
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_export_tsv() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("s.json"));
        for r in sample() {
            store.append(r).unwrap();
        }
        let mut out = Vec::new();
        store.export_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Task\tStart\tEnd\tWork\tBreak");
        assert_eq!(
            lines[1],
            "email\t2024-05-02 08:00:00\t2024-05-02 08:20:00\t0:20:00\t0:03:00"
        );
        assert_eq!(lines[3], "review\t2024-05-02 11:00:00\t2024-05-02 11:30:00\t0:30:00\t-");
        assert_eq!(lines.len(), 4);
    }
}
