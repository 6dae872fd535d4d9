use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::practice_categories::PracticeCategory;

/// Why the candidate is booking a practice session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Purpose {
    #[serde(rename = "Job Interview", alias = "Job")]
    JobInterview,
    #[serde(rename = "Recruitment Test", alias = "Test")]
    RecruitmentTest,
    #[serde(rename = "Exam")]
    Exam,
    #[serde(rename = "Promotion")]
    Promotion,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::JobInterview => "Job Interview",
            Purpose::RecruitmentTest => "Recruitment Test",
            Purpose::Exam => "Exam",
            Purpose::Promotion => "Promotion",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "Job Interview" | "Job" => Some(Purpose::JobInterview),
            "Recruitment Test" | "Test" => Some(Purpose::RecruitmentTest),
            "Exam" => Some(Purpose::Exam),
            "Promotion" => Some(Purpose::Promotion),
            _ => None,
        }
    }

    /// Job interviews and promotion panels are interview-type requests; everything else is an exam.
    pub fn category(&self) -> PracticeCategory {
        match self {
            Purpose::JobInterview | Purpose::Promotion => PracticeCategory::Interview,
            Purpose::RecruitmentTest | Purpose::Exam => PracticeCategory::Exam,
        }
    }
}

impl Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_short_values_are_accepted() {
        assert_eq!(Purpose::from_str("Job"), Some(Purpose::JobInterview));
        assert_eq!(Purpose::from_str("Test"), Some(Purpose::RecruitmentTest));
        assert_eq!(Purpose::from_str("Vacation"), None);
    }

    #[test]
    fn derives_category_from_purpose() {
        assert_eq!(Purpose::JobInterview.category(), PracticeCategory::Interview);
        assert_eq!(Purpose::Promotion.category(), PracticeCategory::Interview);
        assert_eq!(Purpose::Exam.category(), PracticeCategory::Exam);
        assert_eq!(Purpose::RecruitmentTest.category(), PracticeCategory::Exam);
    }

    #[test]
    fn deserializes_display_names() {
        let purpose: Purpose = serde_json::from_str("\"Job Interview\"").unwrap();
        assert_eq!(purpose, Purpose::JobInterview);
        let purpose: Purpose = serde_json::from_str("\"Test\"").unwrap();
        assert_eq!(purpose, Purpose::RecruitmentTest);
    }
}
