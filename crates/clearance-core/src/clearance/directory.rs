use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{ClearanceType, ClearanceTypeId, Resident, ResidentId, UserId};
use super::store::StoreError;

/// Read-mostly lookups the workflow consults but does not own: the resident
/// register and the clearance-type catalog.
pub trait Directory: Send + Sync {
    fn resident(&self, id: ResidentId) -> Result<Option<Resident>, StoreError>;
    fn resident_by_user(&self, user: &UserId) -> Result<Option<Resident>, StoreError>;
    fn clearance_type(&self, id: ClearanceTypeId) -> Result<Option<ClearanceType>, StoreError>;
}

/// In-memory directory seeded at startup; a SQL adapter satisfies the same
/// trait against the registration tables.
#[derive(Default)]
pub struct InMemoryDirectory {
    residents: Mutex<HashMap<i64, Resident>>,
    types: Mutex<HashMap<i64, ClearanceType>>,
}

impl InMemoryDirectory {
    pub fn with_seed(
        residents: impl IntoIterator<Item = Resident>,
        types: impl IntoIterator<Item = ClearanceType>,
    ) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.residents.lock().expect("directory mutex poisoned");
            for resident in residents {
                guard.insert(resident.id.0, resident);
            }
        }
        {
            let mut guard = directory.types.lock().expect("directory mutex poisoned");
            for clearance_type in types {
                guard.insert(clearance_type.id.0, clearance_type);
            }
        }
        directory
    }
}

impl Directory for InMemoryDirectory {
    fn resident(&self, id: ResidentId) -> Result<Option<Resident>, StoreError> {
        let guard = self.residents.lock().expect("directory mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn resident_by_user(&self, user: &UserId) -> Result<Option<Resident>, StoreError> {
        let guard = self.residents.lock().expect("directory mutex poisoned");
        Ok(guard
            .values()
            .find(|resident| &resident.user_id == user)
            .cloned())
    }

    fn clearance_type(&self, id: ClearanceTypeId) -> Result<Option<ClearanceType>, StoreError> {
        let guard = self.types.lock().expect("directory mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }
}
