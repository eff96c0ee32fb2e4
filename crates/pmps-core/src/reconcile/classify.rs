//! Classification of one file name from its two optional records

use chrono::{DateTime, Utc};
use pmps_fs::truncate_to_seconds;
use serde::{Deserialize, Serialize};

use crate::model::{Classification, ContentState, FileRecord};

/// Which side wins when contents differ but timestamps cannot decide.
///
/// The default favours the local directory, which is the source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    #[default]
    #[serde(rename = "local")]
    PreferLocal,
    #[serde(rename = "remote")]
    PreferRemote,
}

impl TieBreak {
    fn winner(self) -> Classification {
        match self {
            TieBreak::PreferLocal => Classification::LocalNewer,
            TieBreak::PreferRemote => Classification::RemoteNewer,
        }
    }
}

fn seconds(time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    time.map(truncate_to_seconds)
}

/// Whether two readable records describe the same content.
///
/// Full digests decide when both sides have one. Otherwise the records only
/// match on equal size plus equal, known timestamps.
fn same_content(local: &FileRecord, remote: &FileRecord) -> bool {
    match (&local.content, &remote.content) {
        (ContentState::Digest(l), ContentState::Digest(r)) => l == r && local.size == remote.size,
        _ => {
            local.size == remote.size
                && matches!(
                    (seconds(local.modified_at), seconds(remote.modified_at)),
                    (Some(l), Some(r)) if l == r
                )
        }
    }
}

/// Classify a file name from what each side holds.
///
/// Pure: the same inputs always give the same answer.
pub fn classify(local: Option<&FileRecord>, remote: Option<&FileRecord>, tie_break: TieBreak) -> Classification {
    let (local, remote) = match (local, remote) {
        (Some(local), Some(remote)) => (local, remote),
        (Some(local), None) if !local.is_unreadable() => return Classification::LocalMissing,
        (None, Some(remote)) if !remote.is_unreadable() => return Classification::RemoteMissing,
        _ => return Classification::Unreadable,
    };

    if local.is_unreadable() || remote.is_unreadable() {
        return Classification::Unreadable;
    }
    if same_content(local, remote) {
        return Classification::Identical;
    }

    match (seconds(local.modified_at), seconds(remote.modified_at)) {
        (Some(l), Some(r)) if l > r => Classification::LocalNewer,
        (Some(l), Some(r)) if l < r => Classification::RemoteNewer,
        _ => tie_break.winner(),
    }
}
