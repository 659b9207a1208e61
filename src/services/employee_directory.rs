// ============================================================================
// EMPLOYEE DIRECTORY - Employee references used by the delete guards
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::ApiError;
use crate::models::employee::EmployeeRef;
use crate::services::api_client::ApiClient;
use crate::utils::constants::EMPLOYEES_PATH;

/// Shared by every list view model; the employee pages own the full records
#[derive(Clone, Default)]
pub struct EmployeeDirectory {
    employees: Rc<RefCell<Vec<EmployeeRef>>>,
}

impl EmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: Vec<EmployeeRef>) -> Self {
        let directory = Self::new();
        directory.replace(employees);
        directory
    }

    pub fn replace(&self, employees: Vec<EmployeeRef>) {
        *self.employees.borrow_mut() = employees;
    }

    /// Adds or replaces the reference with the same id
    pub fn upsert(&self, employee: EmployeeRef) {
        let mut employees = self.employees.borrow_mut();
        match employees.iter_mut().find(|existing| existing.id == employee.id) {
            Some(existing) => *existing = employee,
            None => employees.push(employee),
        }
    }

    pub fn remove(&self, id: &str) {
        self.employees.borrow_mut().retain(|employee| employee.id != id);
    }

    pub fn len(&self) -> usize {
        self.employees.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.borrow().is_empty()
    }

    pub fn reference_count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&EmployeeRef) -> bool,
    {
        self.employees.borrow().iter().filter(|employee| predicate(employee)).count()
    }

    /// Replaces the directory with the server's employee list
    pub async fn load(&self, api: &ApiClient) -> Result<usize, ApiError> {
        log::info!("👥 Loading employee references");
        let employees: Vec<EmployeeRef> = api.get_all(EMPLOYEES_PATH).await?;
        let count = employees.len();
        self.replace(employees);
        log::info!("✅ {} employee references loaded", count);
        Ok(count)
    }
}
