use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::util::format_hms;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed focus session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub task_name: String,
    #[serde(with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end_time: NaiveDateTime,
    #[serde(rename = "work_seconds")]
    pub work_duration: u64,
    #[serde(rename = "break_seconds", default)]
    pub break_duration: u64,
}

impl SessionRecord {
    /// Build a record whose work duration is derived from its timestamps.
    /// An end before the start is clamped to the start.
    pub fn new(task_name: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let end_time = end.max(start);
        let work_duration = (end_time - start).num_seconds().max(0) as u64;
        Self {
            task_name: task_name.into(),
            start_time: start,
            end_time,
            work_duration,
            break_duration: 0,
        }
    }

    pub fn with_break(mut self, break_seconds: u64) -> Self {
        self.break_duration = break_seconds;
        self
    }

    pub fn work_display(&self) -> String {
        format_hms(self.work_duration)
    }

    pub fn break_display(&self) -> String {
        if self.break_duration == 0 {
            "-".to_string()
        } else {
            format_hms(self.break_duration)
        }
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
