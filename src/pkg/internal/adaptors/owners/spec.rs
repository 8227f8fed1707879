use serde::{Deserialize, Serialize};

use crate::prelude::Error;

/// The entity type that files and profile images hang off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Candidate,
    Employee,
}

impl Owner {
    pub fn label(&self) -> &'static str {
        match self {
            Owner::Candidate => "candidate",
            Owner::Employee => "employee",
        }
    }

    /// Entity table; also the top-level prefix of this owner's blob keys.
    pub fn table(&self) -> &'static str {
        match self {
            Owner::Candidate => "candidates",
            Owner::Employee => "employees",
        }
    }

    pub fn files_table(&self) -> &'static str {
        match self {
            Owner::Candidate => "candidate_files",
            Owner::Employee => "employee_files",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            Owner::Candidate => "candidate_id",
            Owner::Employee => "employee_id",
        }
    }

    pub fn not_found(&self, id: &str) -> Error {
        Error::not_found(self.label(), id)
    }
}
