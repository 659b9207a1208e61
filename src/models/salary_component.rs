use serde::{Deserialize, Serialize};

use crate::models::employee::EmployeeRef;
use crate::models::entity::{deserialize_id, deserialize_optional_amount, Entity, RecordStatus, Toggleable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    #[default]
    Earning,
    Deduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationType {
    #[default]
    Fixed,
    /// Percentage of basic
    Percentage,
    /// Percentage of CTC
    PercentageCtc,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryComponent {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub component_type: ComponentType,
    #[serde(default)]
    pub calculation_type: CalculationType,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub value: Option<f64>,
    #[serde(default)]
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SalaryComponentDraft {
    pub name: String,
    pub component_type: ComponentType,
    pub calculation_type: CalculationType,
    pub value: Option<f64>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SalaryComponentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_type: Option<CalculationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl Entity for SalaryComponent {
    type Draft = SalaryComponentDraft;
    type Patch = SalaryComponentPatch;

    const COLLECTION: &'static str = "salary-components";
    const LABEL: &'static str = "Salary component";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_draft(id: String, draft: &SalaryComponentDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            component_type: draft.component_type,
            calculation_type: draft.calculation_type,
            value: draft.value,
            status: draft.status,
        }
    }

    fn apply_patch(&mut self, patch: &SalaryComponentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(calculation_type) = patch.calculation_type {
            self.calculation_type = calculation_type;
        }
        if let Some(value) = patch.value {
            self.value = Some(value);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    fn is_referenced_by(&self, employee: &EmployeeRef) -> bool {
        employee.salary_components.iter().any(|id| id == &self.id)
    }
}

impl Toggleable for SalaryComponent {
    fn status_toggle_patch(&self) -> SalaryComponentPatch {
        SalaryComponentPatch {
            status: Some(self.status.toggled()),
            ..SalaryComponentPatch::default()
        }
    }
}
