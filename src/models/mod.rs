pub mod auth;
pub mod department;
pub mod designation;
pub mod employee;
pub mod entity;
pub mod page;
pub mod salary_component;
pub mod session;
pub mod work_location;

pub use auth::{Credential, FederatedCallback, FederatedRedirect, LoginResponse, NewAccount};
pub use department::{Department, DepartmentDraft, DepartmentPatch};
pub use designation::{Designation, DesignationDraft, DesignationPatch};
pub use employee::EmployeeRef;
pub use entity::{Entity, RecordStatus, Toggleable};
pub use page::{ListEnvelope, Page};
pub use salary_component::{CalculationType, ComponentType, SalaryComponent, SalaryComponentDraft, SalaryComponentPatch};
pub use session::{IdentityProvider, Session};
pub use work_location::{WorkLocation, WorkLocationDraft, WorkLocationPatch};
