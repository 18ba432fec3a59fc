//! Staff recruitment requests
use super::error::{WorkflowError, check_required};
use super::history::History;
use super::registry::{Workflow, WorkflowKind};
use super::role::{Role, StaffRef};
use std::fmt;

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HrStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Hired,
    #[n(4)]
    Fulfilled,
}

/// Status a request lands in once staff has been assigned to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HrCompletion {
    #[default]
    Hired,
    Fulfilled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrRequest {
    id: u64,
    pub request_type: String, // the position being staffed
    pub created_by: Role,
    pub hired_staff: Vec<StaffRef>,
    history: History<HrStatus>,
}

impl fmt::Display for HrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HrStatus::Pending => "Pending",
            HrStatus::Approved => "Approved",
            HrStatus::Rejected => "Rejected",
            HrStatus::Hired => "Hired",
            HrStatus::Fulfilled => "Fulfilled",
        };
        f.write_str(label)
    }
}

impl From<HrCompletion> for HrStatus {
    fn from(value: HrCompletion) -> Self {
        match value {
            HrCompletion::Hired => HrStatus::Hired,
            HrCompletion::Fulfilled => HrStatus::Fulfilled,
        }
    }
}

impl HrRequest {
    pub fn new(id: u64, request_type: &str, created_by: Role) -> Result<Self, WorkflowError> {
        check_required("request_type", request_type)?;

        Ok(Self {
            id,
            request_type: request_type.to_string(),
            created_by,
            hired_staff: vec![],
            history: History::open(created_by, HrStatus::Pending)?,
        })
    }

    fn illegal(&self, reason: &'static str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            kind: Self::KIND,
            id: self.id,
            status: self.status().to_string(),
            reason,
        }
    }

    pub fn approve(&mut self, role: Role) -> Result<(), WorkflowError> {
        if self.status() != HrStatus::Pending {
            return Err(self.illegal("only pending requests can be approved"));
        }
        self.history.append(role, HrStatus::Approved, "")
    }

    pub fn reject(&mut self, role: Role) -> Result<(), WorkflowError> {
        if self.status() != HrStatus::Pending {
            return Err(self.illegal("only pending requests can be rejected"));
        }
        self.history.append(role, HrStatus::Rejected, "")
    }

    pub fn assign_staff(
        &mut self,
        role: Role,
        staff: StaffRef,
        completion: HrCompletion,
    ) -> Result<(), WorkflowError> {
        if self.status() != HrStatus::Approved {
            return Err(self.illegal("request must be approved before staff assignment"));
        }

        let comment = format!("assigned {}", staff.name);
        let record = self.history.prepare(role, completion.into(), &comment)?;

        self.hired_staff.push(staff);
        self.history.commit(record);

        Ok(())
    }
}

impl Workflow for HrRequest {
    type Status = HrStatus;
    const KIND: WorkflowKind = WorkflowKind::HrRequest;

    fn id(&self) -> u64 {
        self.id
    }
    fn history(&self) -> &History<HrStatus> {
        &self.history
    }
    fn headline(&self) -> String {
        self.request_type.clone()
    }
}
