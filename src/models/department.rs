use serde::{Deserialize, Serialize};

use crate::models::employee::EmployeeRef;
use crate::models::entity::{deserialize_id, Entity, RecordStatus, Toggleable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DepartmentDraft {
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
}

impl DepartmentDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into().trim().to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DepartmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl Entity for Department {
    type Draft = DepartmentDraft;
    type Patch = DepartmentPatch;

    const COLLECTION: &'static str = "departments";
    const LABEL: &'static str = "Department";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_draft(id: String, draft: &DepartmentDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            status: draft.status,
        }
    }

    fn apply_patch(&mut self, patch: &DepartmentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    // Employees carry the department primary key
    fn is_referenced_by(&self, employee: &EmployeeRef) -> bool {
        employee.department.as_deref() == Some(self.id.as_str())
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.description.as_deref().unwrap_or_default()).to_lowercase()
    }
}

impl Toggleable for Department {
    fn status_toggle_patch(&self) -> DepartmentPatch {
        DepartmentPatch {
            status: Some(self.status.toggled()),
            ..DepartmentPatch::default()
        }
    }
}
