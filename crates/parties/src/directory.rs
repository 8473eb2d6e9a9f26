use std::path::Path;
use std::sync::Arc;

use dispensary_core::DomainResult;

use crate::{Employee, FileRepository, InMemoryRepository, Patient, Repository, Supplier};

pub const PATIENTS_FILE: &str = "patients.json";
pub const EMPLOYEES_FILE: &str = "employees.json";
pub const SUPPLIERS_FILE: &str = "suppliers.json";

/// The three party collections the dispensing core resolves ids against.
#[derive(Clone)]
pub struct Directory {
    pub patients: Arc<dyn Repository<Patient>>,
    pub employees: Arc<dyn Repository<Employee>>,
    pub suppliers: Arc<dyn Repository<Supplier>>,
}

impl Directory {
    pub fn new(
        patients: Arc<dyn Repository<Patient>>,
        employees: Arc<dyn Repository<Employee>>,
        suppliers: Arc<dyn Repository<Supplier>>,
    ) -> Self {
        Self {
            patients,
            employees,
            suppliers,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
        )
    }
}

impl Directory {
    /// Open the three collections as JSON files inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> DomainResult<Self> {
        let dir = dir.as_ref();
        Ok(Self::new(
            Arc::new(FileRepository::<Patient>::open(dir.join(PATIENTS_FILE))?),
            Arc::new(FileRepository::<Employee>::open(dir.join(EMPLOYEES_FILE))?),
            Arc::new(FileRepository::<Supplier>::open(dir.join(SUPPLIERS_FILE))?),
        ))
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl core::fmt::Debug for Directory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Directory")
            .field("patients", &self.patients.list().map(|l| l.len()).ok())
            .field("employees", &self.employees.list().map(|l| l.len()).ok())
            .field("suppliers", &self.suppliers.list().map(|l| l.len()).ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opened_directory_reloads_every_collection() {
        let dir = tempfile::tempdir().unwrap();

        let (patient, employee, supplier) = {
            let directory = Directory::open(dir.path()).unwrap();
            (
                directory
                    .patients
                    .create(Patient::new("Maria Souza", "555", "898001", "123.456.789-00"))
                    .unwrap(),
                directory
                    .employees
                    .create(Employee::new("Carla Dias", "555-0101", "111.222.333-44"))
                    .unwrap(),
                directory
                    .suppliers
                    .create(Supplier::new("Northwind Pharma", "555-0300", "TAX-88-12"))
                    .unwrap(),
            )
        };

        let reopened = Directory::open(dir.path()).unwrap();
        assert_eq!(reopened.patients.get(&patient.id).unwrap(), Some(patient));
        assert_eq!(reopened.employees.get(&employee.id).unwrap(), Some(employee));
        assert_eq!(reopened.suppliers.get(&supplier.id).unwrap(), Some(supplier));
    }
}
