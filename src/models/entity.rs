// ============================================================================
// ENTITY - Contract shared by the settings collections
// ============================================================================
// Departments, designations, work locations and salary components all go
// through the same list view model; this trait is the only thing that varies.
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;

use crate::models::employee::EmployeeRef;

pub trait Entity: Clone + PartialEq + Debug + Serialize + DeserializeOwned + 'static {
    /// Body of the create call
    type Draft: Serialize + Clone + Debug + 'static;
    /// Body of the partial update call
    type Patch: Serialize + Clone + Debug + 'static;

    /// Collection segment under the API base, e.g. `departments`
    const COLLECTION: &'static str;
    const LABEL: &'static str;

    fn id(&self) -> &str;
    fn name(&self) -> &str;

    /// Local stand-in used while the create call is in flight
    fn from_draft(id: String, draft: &Self::Draft) -> Self;
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Reference-guard predicate
    fn is_referenced_by(&self, employee: &EmployeeRef) -> bool;

    /// Reason this entity can never be deleted, independent of references
    fn deletion_blocker(&self) -> Option<String> {
        None
    }

    /// Lower-cased text matched by list search
    fn search_text(&self) -> String {
        self.name().to_lowercase()
    }

    /// Collection-wide invariants to re-apply after `changed_id` was touched
    fn normalize(_items: &mut [Self], _changed_id: &str) {}
}

/// Entities with an Active/Inactive switch
pub trait Toggleable: Entity {
    fn status_toggle_patch(&self) -> Self::Patch;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    Inactive,
    // Anything the server sends other than "Inactive" is shown as active
    #[default]
    #[serde(other)]
    Active,
}

impl RecordStatus {
    pub fn toggled(self) -> Self {
        match self {
            RecordStatus::Active => RecordStatus::Inactive,
            RecordStatus::Inactive => RecordStatus::Active,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Server ids arrive as integers (Django AutoField) or strings (employee_id)
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

pub fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawId>>::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().map(String::from).collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Decimal fields come back from DRF as strings ("12.50")
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawAmount::Number(value)) => Ok(Some(value)),
        Some(RawAmount::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawAmount::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
