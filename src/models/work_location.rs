use serde::{Deserialize, Serialize};

use crate::models::employee::{matches_key, EmployeeRef};
use crate::models::entity::{deserialize_id, Entity};

/// Office or branch. Exactly one location may be the organisation's filing address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLocation {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_filing_address: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct WorkLocationDraft {
    pub name: String,
    pub address: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_filing_address: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct WorkLocationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_filing_address: Option<bool>,
}

impl Entity for WorkLocation {
    type Draft = WorkLocationDraft;
    type Patch = WorkLocationPatch;

    const COLLECTION: &'static str = "work-locations";
    const LABEL: &'static str = "Work location";

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_draft(id: String, draft: &WorkLocationDraft) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            address: draft.address.clone(),
            address2: draft.address2.clone(),
            city: draft.city.clone(),
            state: draft.state.clone(),
            pincode: draft.pincode.clone(),
            is_filing_address: draft.is_filing_address,
        }
    }

    fn apply_patch(&mut self, patch: &WorkLocationPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(address) = &patch.address {
            self.address = address.clone();
        }
        if let Some(address2) = &patch.address2 {
            self.address2 = Some(address2.clone());
        }
        if let Some(city) = &patch.city {
            self.city = city.clone();
        }
        if let Some(state) = &patch.state {
            self.state = state.clone();
        }
        if let Some(pincode) = &patch.pincode {
            self.pincode = pincode.clone();
        }
        if let Some(flag) = patch.is_filing_address {
            self.is_filing_address = flag;
        }
    }

    fn is_referenced_by(&self, employee: &EmployeeRef) -> bool {
        matches_key(employee.work_location.as_deref(), &self.id, &self.name)
    }

    fn deletion_blocker(&self) -> Option<String> {
        self.is_filing_address.then(|| {
            format!(
                "'{}' is the organisation's filing address and cannot be deleted. Mark another location as the filing address first.",
                self.name
            )
        })
    }

    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.name, self.city, self.state, self.pincode).to_lowercase()
    }

    // A new filing address takes the flag away from every other location
    fn normalize(items: &mut [Self], changed_id: &str) {
        let changed_is_filing = items
            .iter()
            .any(|location| location.id == changed_id && location.is_filing_address);
        if !changed_is_filing {
            return;
        }
        for location in items.iter_mut().filter(|location| location.id != changed_id) {
            location.is_filing_address = false;
        }
    }
}
