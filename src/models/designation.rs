use serde::{Deserialize, Serialize};

use crate::models::employee::{matches_key, EmployeeRef};
use crate::models::entity::{deserialize_id, Entity, RecordStatus, Toggleable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Designation {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DesignationDraft {
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
}

impl DesignationDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DesignationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl Entity for Designation {
    type Draft = DesignationDraft;
    type Patch = DesignationPatch;

    const COLLECTION: &'static str = "designations";
    const LABEL: &'static str = "Designation";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_draft(id: String, draft: &DesignationDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            status: draft.status,
        }
    }

    fn apply_patch(&mut self, patch: &DesignationPatch) {
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

    fn is_referenced_by(&self, employee: &EmployeeRef) -> bool {
        matches_key(employee.designation.as_deref(), &self.id, &self.name)
    }
}

impl Toggleable for Designation {
    fn status_toggle_patch(&self) -> DesignationPatch {
        DesignationPatch {
            status: Some(self.status.toggled()),
            ..DesignationPatch::default()
        }
    }
}
