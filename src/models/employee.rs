use serde::{Deserialize, Serialize};

use crate::models::entity::{deserialize_id, deserialize_id_list, deserialize_optional_id};

/// The slice of an employee record the delete guards need.
/// Department is a foreign key id; designation and work location are stored
/// by name on the employee record, so those two compare by id or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmployeeRef {
    #[serde(alias = "employee_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub work_location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub salary_components: Vec<String>,
}

impl EmployeeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn in_department(mut self, department_id: impl Into<String>) -> Self {
        self.department = Some(department_id.into());
        self
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = Some(designation.into());
        self
    }

    pub fn at_location(mut self, work_location: impl Into<String>) -> Self {
        self.work_location = Some(work_location.into());
        self
    }

    pub fn with_salary_component(mut self, component_id: impl Into<String>) -> Self {
        self.salary_components.push(component_id.into());
        self
    }
}

/// True when `reference` points at the entity by id, or by name (case-insensitive)
pub(crate) fn matches_key(reference: Option<&str>, id: &str, name: &str) -> bool {
    match reference.map(str::trim) {
        Some(value) if !value.is_empty() => value == id || value.eq_ignore_ascii_case(name.trim()),
        _ => false,
    }
}
