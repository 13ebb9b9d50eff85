use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an intervention stands.
///
/// `planned → in_progress → completed → invoiced` is the usual flow, but any
/// status may be set at any time; no transition table is enforced.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Invoiced,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intervention status `{0}`")]
pub struct UnknownStatus(pub String);

impl InterventionStatus {
    pub const ALL: [InterventionStatus; 4] = [
        Self::Planned,
        Self::InProgress,
        Self::Completed,
        Self::Invoiced,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Invoiced => "invoiced",
        }
    }

    /// Work is finished (completed or already invoiced).
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Invoiced)
    }

    /// Work still to be done (planned or in progress).
    pub const fn is_pending(self) -> bool {
        !self.is_closed()
    }
}

impl fmt::Display for InterventionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterventionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        for status in InterventionStatus::ALL {
            assert_eq!(status.as_str().parse::<InterventionStatus>(), Ok(status));
        }
        assert!("done".parse::<InterventionStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&InterventionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn closed_and_pending_partition_statuses() {
        let closed: Vec<_> = InterventionStatus::ALL
            .into_iter()
            .filter(|s| s.is_closed())
            .collect();
        assert_eq!(
            closed,
            vec![InterventionStatus::Completed, InterventionStatus::Invoiced]
        );
        assert!(InterventionStatus::Planned.is_pending());
    }
}
