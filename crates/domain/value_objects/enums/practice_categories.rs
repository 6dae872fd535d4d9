use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PracticeCategory {
    Exam,
    Interview,
    Subscription,
}

impl PracticeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeCategory::Exam => "EXAM",
            PracticeCategory::Interview => "INTERVIEW",
            PracticeCategory::Subscription => "SUBSCRIPTION",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXAM" => Some(PracticeCategory::Exam),
            "INTERVIEW" => Some(PracticeCategory::Interview),
            "SUBSCRIPTION" => Some(PracticeCategory::Subscription),
            _ => None,
        }
    }

    /// Whether a plan of this category can be booked by a session of `session_category`.
    /// Subscriptions bundle live interviews, so they serve interview sessions too.
    pub fn serves(&self, session_category: PracticeCategory) -> bool {
        match self {
            PracticeCategory::Subscription => session_category == PracticeCategory::Interview,
            plan_category => *plan_category == session_category,
        }
    }
}

impl Display for PracticeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_plans_serve_interview_sessions_only() {
        assert!(PracticeCategory::Subscription.serves(PracticeCategory::Interview));
        assert!(!PracticeCategory::Subscription.serves(PracticeCategory::Exam));
        assert!(PracticeCategory::Exam.serves(PracticeCategory::Exam));
        assert!(!PracticeCategory::Interview.serves(PracticeCategory::Exam));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            PracticeCategory::from_str(" interview "),
            Some(PracticeCategory::Interview)
        );
        assert_eq!(PracticeCategory::from_str("panel"), None);
    }
}
