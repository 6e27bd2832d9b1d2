use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// What the workflow needs to know about a student when they apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: UserId,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub mentor_id: Option<UserId>,
}

/// Read-only lookup of student/mentor/department relations.
pub trait StudentDirectory: Send + Sync {
    fn lookup(&self, student_id: &UserId) -> Result<Option<StudentProfile>, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("unable to read directory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Directory backed by a fixed set of profiles, typically loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct StaticStudentDirectory {
    profiles: HashMap<UserId, StudentProfile>,
}

impl StaticStudentDirectory {
    pub fn from_profiles(profiles: impl IntoIterator<Item = StudentProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.student_id.clone(), profile))
            .collect();
        Self { profiles }
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let profiles: Vec<StudentProfile> = serde_json::from_str(raw)?;
        Ok(Self::from_profiles(profiles))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl StudentDirectory for StaticStudentDirectory {
    fn lookup(&self, student_id: &UserId) -> Result<Option<StudentProfile>, DirectoryError> {
        Ok(self.profiles.get(student_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profiles_with_optional_fields() {
        let directory = StaticStudentDirectory::from_json(
            r#"[
                {"studentId": "stu-1", "department": "CSE", "mentorId": "fac-1"},
                {"studentId": "stu-2"}
            ]"#,
        )
        .expect("directory parses");

        assert_eq!(directory.len(), 2);
        let first = directory
            .lookup(&UserId::new("stu-1"))
            .expect("lookup succeeds")
            .expect("profile present");
        assert_eq!(first.department.as_deref(), Some("CSE"));
        assert_eq!(first.mentor_id, Some(UserId::new("fac-1")));

        let second = directory
            .lookup(&UserId::new("stu-2"))
            .expect("lookup succeeds")
            .expect("profile present");
        assert!(second.mentor_id.is_none());
        assert!(directory
            .lookup(&UserId::new("stu-3"))
            .expect("lookup succeeds")
            .is_none());
    }

    #[test]
    fn surfaces_parse_errors() {
        match StaticStudentDirectory::from_json("{not json") {
            Err(DirectoryError::Parse(_)) => {}
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
