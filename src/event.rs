//! Event applications and the review chain they pass through
//!
//! Three roles review an application in turn. Who may act next is read from the
//! application's status and history, there is no "current owner" field.
use super::error::{ValidationError, WorkflowError, check_amount, check_required};
use super::history::{History, TimeStamp};
use super::registry::{Workflow, WorkflowKind};
use super::role::Role;
use chrono::Utc;
use std::fmt;

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    #[n(0)]
    PendingReview,
    #[n(1)]
    Forwarded,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
}

/// Role assignment for each stage of the review chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalChain {
    /// first reviewer, may act at any point
    pub forwarding: Role,
    /// may act only while the application is forwarded
    pub budget_approval: Role,
    /// may act once the budget approver appears anywhere in history
    pub final_approval: Role,
}

/// Client supplied details of an event
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub client_name: String,
    pub event_type: String,
    pub start_date: TimeStamp<Utc>,
    pub end_date: TimeStamp<Utc>,
    pub budget: f64,
    pub preferences: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventApplication {
    id: u64,
    pub details: EventDetails,
    pub created_by: Role,
    comment: Option<String>,
    history: History<EventStatus>,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::PendingReview => f.write_str("Pending Review"),
            EventStatus::Forwarded => f.write_str("Forwarded"),
            EventStatus::Approved => f.write_str("Approved"),
            EventStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

impl EventStatus {
    /// Values a reviewer may hand down. `PendingReview` is only ever an initial status.
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            EventStatus::Forwarded | EventStatus::Approved | EventStatus::Rejected
        )
    }
}

impl Default for ApprovalChain {
    fn default() -> Self {
        Self {
            forwarding: Role::CustomerServiceManager,
            budget_approval: Role::FinancialManager,
            final_approval: Role::AdministrationManager,
        }
    }
}

impl EventDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required("client_name", &self.client_name)?;
        check_required("event_type", &self.event_type)?;
        check_amount(self.budget, false)?;
        if self.start_date > self.end_date {
            return Err(ValidationError::InvalidDates);
        }
        Ok(())
    }
}

impl ApprovalChain {
    /// Ordering check for a decision by `role` on `application`.
    ///
    /// The budget approver needs the application to be forwarded right now. The final
    /// approver only needs the budget approver to have acted at some point, even if the
    /// status has moved on since.
    pub fn check_order(
        &self,
        application: &EventApplication,
        role: Role,
    ) -> Result<(), WorkflowError> {
        let violation = |reason| WorkflowError::OrderingViolation {
            kind: WorkflowKind::EventApplication,
            id: application.id,
            role,
            reason,
        };

        if role == self.forwarding {
            Ok(())
        } else if role == self.budget_approval {
            if application.status() != EventStatus::Forwarded {
                return Err(violation("the application has not been forwarded"));
            }
            Ok(())
        } else if role == self.final_approval {
            if !application.history.authored_by(self.budget_approval) {
                return Err(violation("the budget has not been reviewed yet"));
            }
            Ok(())
        } else {
            Err(violation("the role has no stage in the review chain"))
        }
    }
}

impl EventApplication {
    pub fn new(id: u64, details: EventDetails, created_by: Role) -> Result<Self, WorkflowError> {
        details.validate()?;

        Ok(Self {
            id,
            details,
            created_by,
            comment: None,
            history: History::open(created_by, EventStatus::PendingReview)?,
        })
    }

    /// The budget approver's latest non-empty comment
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Apply a reviewer's decision.
    ///
    /// Checks run in order: terminal status, chain ordering, decision value. Nothing is
    /// changed unless all of them pass.
    pub fn review(
        &mut self,
        chain: &ApprovalChain,
        role: Role,
        decision: EventStatus,
        comment: &str,
    ) -> Result<(), WorkflowError> {
        let illegal = |reason| WorkflowError::IllegalTransition {
            kind: Self::KIND,
            id: self.id,
            status: self.status().to_string(),
            reason,
        };
        match self.status() {
            EventStatus::Rejected => return Err(illegal("no further action after rejection")),
            EventStatus::Approved => return Err(illegal("no further action after approval")),
            EventStatus::PendingReview | EventStatus::Forwarded => {}
        }

        chain.check_order(self, role)?;

        if !decision.is_decision() {
            return Err(WorkflowError::InvalidDecision {
                kind: Self::KIND,
                id: self.id,
                decision: decision.to_string(),
            });
        }

        let record = self.history.prepare(role, decision, comment)?;
        if role == chain.budget_approval && !comment.is_empty() {
            self.comment = Some(comment.to_string());
        }
        self.history.commit(record);

        Ok(())
    }
}

impl Workflow for EventApplication {
    type Status = EventStatus;
    const KIND: WorkflowKind = WorkflowKind::EventApplication;

    fn id(&self) -> u64 {
        self.id
    }
    fn history(&self) -> &History<EventStatus> {
        &self.history
    }
    fn headline(&self) -> String {
        format!("{} - {}", self.details.client_name, self.details.event_type)
    }
}
