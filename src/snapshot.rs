use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Snapshot name format, e.g. `20240131235959`.
const NAME_FORMAT: &str = "%Y%m%d%H%M%S";

/// State reported by the snapshot repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    Success,
    Failed,
    Partial,
    InProgress,
    Incompatible,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SnapshotState::Success => "SUCCESS",
            SnapshotState::Failed => "FAILED",
            SnapshotState::Partial => "PARTIAL",
            SnapshotState::InProgress => "IN_PROGRESS",
            SnapshotState::Incompatible => "INCOMPATIBLE",
            SnapshotState::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// A single entry of `GET /_snapshot/{repository}/_all`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "snapshot")]
    pub name: String,
    pub state: SnapshotState,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_in_progress(&self) -> bool {
        self.state == SnapshotState::InProgress
    }

    /// Completion time used for ordering and aging.
    /// A settled snapshot without an end time counts as the oldest possible one.
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end_time {
            Some(end_time) => write!(
                f,
                "{} (finished at {} with {})",
                self.name,
                end_time.to_rfc3339(),
                self.state
            ),
            None => write!(f, "{} ({})", self.name, self.state),
        }
    }
}

/// Response body of the list endpoint.
#[derive(Debug, Deserialize)]
pub struct SnapshotList {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotList {
    /// Drops in-progress entries and orders the rest by completion time, oldest first.
    pub fn into_settled(self) -> Vec<Snapshot> {
        let mut snapshots: Vec<Snapshot> = self
            .snapshots
            .into_iter()
            .filter(|s| !s.is_in_progress())
            .collect();
        snapshots.sort_by_key(Snapshot::completed_at);
        snapshots
    }
}

/// Generate a snapshot name from a UTC timestamp.
pub fn snapshot_name(now: DateTime<Utc>) -> String {
    now.format(NAME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(body: &str) -> SnapshotList {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_snapshot_name_format() {
        let ts = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(snapshot_name(ts), "20230102030405");
    }

    #[test]
    fn test_decode_elasticsearch_response() {
        let list = parse(
            r#"{"snapshots":[
                {"snapshot":"20230101000000","uuid":"x","state":"SUCCESS","end_time":"2023-01-01T00:10:00.000Z","indices":[]},
                {"snapshot":"20230102000000","state":"IN_PROGRESS","end_time":null}
            ]}"#,
        );
        assert_eq!(list.snapshots.len(), 2);
        assert_eq!(list.snapshots[0].name, "20230101000000");
        assert_eq!(list.snapshots[0].state, SnapshotState::Success);
        assert_eq!(
            list.snapshots[0].end_time,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 10, 0).unwrap())
        );
        assert!(list.snapshots[1].is_in_progress());
        assert_eq!(list.snapshots[1].end_time, None);
    }

    #[test]
    fn test_unrecognized_state_decodes_as_unknown() {
        let list = parse(r#"{"snapshots":[{"snapshot":"a","state":"SOMETHING_NEW"}]}"#);
        assert_eq!(list.snapshots[0].state, SnapshotState::Unknown);
    }

    #[test]
    fn test_into_settled_filters_and_sorts() {
        let list = parse(
            r#"{"snapshots":[
                {"snapshot":"c","state":"SUCCESS","end_time":"2023-01-03T00:00:00Z"},
                {"snapshot":"running","state":"IN_PROGRESS"},
                {"snapshot":"a","state":"FAILED","end_time":"2023-01-01T00:00:00Z"},
                {"snapshot":"running-2","state":"IN_PROGRESS"},
                {"snapshot":"b","state":"PARTIAL","end_time":"2023-01-02T00:00:00Z"}
            ]}"#,
        );
        let names: Vec<_> = list.into_settled().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_end_time_sorts_first() {
        let list = parse(
            r#"{"snapshots":[
                {"snapshot":"dated","state":"SUCCESS","end_time":"2023-01-03T00:00:00Z"},
                {"snapshot":"undated","state":"FAILED"}
            ]}"#,
        );
        let settled = list.into_settled();
        assert_eq!(settled[0].name, "undated");
        assert_eq!(settled[0].completed_at(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_empty_body_has_no_snapshots() {
        assert!(parse("{}").into_settled().is_empty());
    }

    #[test]
    fn test_display() {
        let snapshot = Snapshot {
            name: "20230101000000".to_string(),
            state: SnapshotState::Success,
            end_time: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
        };
        assert_eq!(
            snapshot.to_string(),
            "20230101000000 (finished at 2023-01-01T00:00:00+00:00 with SUCCESS)"
        );
    }
}
