use chrono::{DateTime, Utc};

/// A single bedtime story, already normalized: tag names and images are
/// attached, and any locale override has been folded into the text fields.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Story {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<StoryImage>,
    pub reading_time: i32,
    pub age_group: AgeGroup,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StoryImage {
    pub id: i32,
    pub src: String,
    pub alt: String,
    /// Character offset into the story body at which the image occurs.
    pub position: i32,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub storage_path: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Tag {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub color: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Locale {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "3-5")]
    Preschool,
    #[serde(rename = "6-8")]
    EarlyReader,
    #[serde(rename = "9-12")]
    MiddleGrade,
    #[serde(rename = "unknown")]
    Unknown,
}

impl AgeGroup {
    /// Parses the stored column value, treating anything unrecognized as
    /// `Unknown` rather than failing the whole row.
    pub fn from_column(value: &str) -> Self {
        serde_plain::from_str(value).unwrap_or(AgeGroup::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Preschool => "3-5",
            AgeGroup::EarlyReader => "6-8",
            AgeGroup::MiddleGrade => "9-12",
            AgeGroup::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::AgeGroup;

    #[test]
    fn age_group_parses_known_columns() {
        assert_eq!(AgeGroup::from_column("3-5"), AgeGroup::Preschool);
        assert_eq!(AgeGroup::from_column("6-8"), AgeGroup::EarlyReader);
        assert_eq!(AgeGroup::from_column("9-12"), AgeGroup::MiddleGrade);
    }

    #[test]
    fn age_group_tolerates_malformed_columns() {
        assert_eq!(AgeGroup::from_column(""), AgeGroup::Unknown);
        assert_eq!(AgeGroup::from_column("13+"), AgeGroup::Unknown);
    }
}
