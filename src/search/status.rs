//! Course status tokens for discovery queries

use crate::search::query::{ConstraintMap, DateRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

/// Reserved field key carrying the status value
pub const STATUS_FIELD: &str = "estatus";

/// Token marking invitation-only courses
pub const INVITATION_ONLY: &str = "invitation_only";

/// Lifecycle phase of a course run relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoursePhase {
    /// Started and not yet ended
    Ongoing,
    /// Not yet started
    Upcoming,
    /// Already ended
    Finished,
}

impl CoursePhase {
    /// Write the `start`/`end` constraints for this phase
    pub fn apply(self, fields: &mut ConstraintMap, now: DateTime<Utc>) {
        match self {
            CoursePhase::Ongoing => {
                fields.set("start", DateRange::until(now));
                fields.set("end", DateRange::since(now));
            }
            CoursePhase::Upcoming => {
                fields.set("start", DateRange::since(now));
            }
            CoursePhase::Finished => {
                fields.set("end", DateRange::until(now));
            }
        }
    }
}

/// Parsed status value: an optional phase plus the invitation-only modifier.
///
/// The raw value is split on whitespace. The first phase token wins and
/// repeats of it are ignored; any token that is neither a phase nor
/// `invitation_only` (including a different second phase) lands in
/// `unrecognized`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    pub phase: Option<CoursePhase>,
    pub invitation_only: bool,
    pub unrecognized: Vec<String>,
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Self {
        let mut status = StatusFilter::default();

        for token in raw.split_whitespace() {
            if token == INVITATION_ONLY {
                status.invitation_only = true;
                continue;
            }

            match (CoursePhase::from_str(token), status.phase) {
                (Ok(phase), None) => status.phase = Some(phase),
                (Ok(phase), Some(current)) if phase == current => {}
                _ => status.unrecognized.push(token.to_string()),
            }
        }

        if status.is_empty() && status.unrecognized.is_empty() {
            // blank value
            status.unrecognized.push(raw.to_string());
        }

        status
    }

    /// Nothing recognized at all
    pub fn is_empty(&self) -> bool {
        self.phase.is_none() && !self.invitation_only
    }

    pub fn has_unrecognized(&self) -> bool {
        !self.unrecognized.is_empty()
    }

    /// Write the status-derived field constraints
    pub fn apply(&self, fields: &mut ConstraintMap, now: DateTime<Utc>) {
        if let Some(phase) = self.phase {
            phase.apply(fields, now);
        }
        if self.invitation_only {
            fields.set(INVITATION_ONLY, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::FieldValue;

    #[test]
    fn test_parse_single_phase() {
        let status = StatusFilter::parse("upcoming");
        assert_eq!(status.phase, Some(CoursePhase::Upcoming));
        assert!(!status.invitation_only);
        assert!(!status.has_unrecognized());
    }

    #[test]
    fn test_parse_phase_with_invitation_only() {
        let status = StatusFilter::parse("ongoing  invitation_only");
        assert_eq!(status.phase, Some(CoursePhase::Ongoing));
        assert!(status.invitation_only);
    }

    #[test]
    fn test_parse_invitation_only_alone() {
        let status = StatusFilter::parse("invitation_only");
        assert_eq!(status.phase, None);
        assert!(status.invitation_only);
    }

    #[test]
    fn test_parse_unrecognized() {
        let status = StatusFilter::parse("ongoinggg");
        assert!(status.is_empty());
        assert_eq!(status.unrecognized, vec!["ongoinggg".to_string()]);

        let conflicting = StatusFilter::parse("ongoing finished");
        assert_eq!(conflicting.phase, Some(CoursePhase::Ongoing));
        assert_eq!(conflicting.unrecognized, vec!["finished".to_string()]);

        assert!(StatusFilter::parse("   ").has_unrecognized());

        let repeated = StatusFilter::parse("ongoing ongoing");
        assert_eq!(repeated.phase, Some(CoursePhase::Ongoing));
        assert!(!repeated.has_unrecognized());
    }

    #[test]
    fn test_apply_finished() {
        let now = Utc::now();
        let mut fields = ConstraintMap::new();
        StatusFilter::parse("finished").apply(&mut fields, now);

        assert_eq!(fields.get("end"), Some(&FieldValue::Range(DateRange::until(now))));
        assert!(!fields.contains_key("start"));
        assert!(!fields.contains_key(INVITATION_ONLY));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(CoursePhase::Ongoing.to_string(), "ongoing");
        assert_eq!(CoursePhase::Finished.as_ref(), "finished");
    }
}
