//! Current on-call assignment for a schedule.

use chrono::{DateTime, FixedOffset};

/// Rendering pattern for the label timestamps, e.g. `01/02/2024 09:00AM`.
const LABEL_TIME_FORMAT: &str = "%m/%d/%Y %I:%M%p";

/// The person currently on call per a schedule, with the validity window.
///
/// Produced by the schedule resolver; `person` is `None` when the upstream
/// entry carries no user summary, in which case no topic update is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnCallAssignment {
    /// Display name of the on-call person, if any.
    pub person: Option<String>,
    /// Start of the on-call window.
    pub start: DateTime<FixedOffset>,
    /// End of the on-call window.
    pub end: DateTime<FixedOffset>,
}

impl OnCallAssignment {
    /// Render the managed topic label for this assignment.
    ///
    /// The label is a pure function of (person, start, end) and never
    /// contains the `|` delimiter the topic codec splits on. Returns `None`
    /// when no person is assigned.
    #[must_use]
    pub fn topic_label(&self) -> Option<String> {
        let person = self.person.as_deref()?;
        Some(format!(
            "{person} is on-call from {} to {}",
            self.start.format(LABEL_TIME_FORMAT),
            self.end.format(LABEL_TIME_FORMAT)
        ))
    }
}
