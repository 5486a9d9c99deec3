use serde::{Deserialize, Serialize};

// ==================================================================================================
// Wire Models
// ==================================================================================================

/// Subset of `GET /v2/me`
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub id: u64,
    pub login: String,
}

/// One element of `GET /v2/users/{login}/projects_users`
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectUser {
    #[serde(default)]
    pub final_mark: Option<i64>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(rename = "validated?", default)]
    pub validated: Option<bool>,
    #[serde(default)]
    pub cursus_ids: Vec<u32>,
    pub project: ProjectRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub name: String,
}

/// Lifecycle state of a project subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Finished,
    InProgress,
    WaitingForCorrection,
    SearchingAGroup,
    CreatingGroup,
    Parent,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    /// Wire name, as shown in generated markup
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Finished => "finished",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::WaitingForCorrection => "waiting_for_correction",
            ProjectStatus::SearchingAGroup => "searching_a_group",
            ProjectStatus::CreatingGroup => "creating_group",
            ProjectStatus::Parent => "parent",
            ProjectStatus::Unknown => "unknown",
        }
    }
}

// ==================================================================================================
// Domain Model
// ==================================================================================================

/// A project completion record, as fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub name: String,
    pub mark: Option<i64>,
    pub validated: Option<bool>,
    pub status: ProjectStatus,
    pub cursus_ids: Vec<u32>,
}

impl ProjectRecord {
    pub fn new(name: impl Into<String>, mark: Option<i64>, cursus_ids: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            mark,
            validated: None,
            status: ProjectStatus::Unknown,
            cursus_ids,
        }
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark with null treated as zero
    pub fn mark_or_zero(&self) -> i64 {
        self.mark.unwrap_or(0)
    }

    pub fn in_cursus(&self, cursus_id: u32) -> bool {
        self.cursus_ids.contains(&cursus_id)
    }
}

impl From<ProjectUser> for ProjectRecord {
    fn from(pu: ProjectUser) -> Self {
        Self {
            name: pu.project.name,
            mark: pu.final_mark,
            validated: pu.validated,
            status: pu.status,
            cursus_ids: pu.cursus_ids,
        }
    }
}
