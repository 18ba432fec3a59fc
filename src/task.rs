//! Department task distribution
use super::error::{ValidationError, WorkflowError, check_positive_amount, check_required};
use super::history::{History, TimeStamp};
use super::registry::{Workflow, WorkflowKind};
use super::role::{Actor, Department, Role, StaffRef};
use chrono::Utc;
use std::fmt;

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    #[n(0)]
    Open,
    #[n(1)]
    InProgress,
    #[n(2)]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskComment {
    pub worker: String,
    pub comment: String,
    pub timestamp: TimeStamp<Utc>,
}

/// A worker asking for more money than the task was planned with
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBudgetRequest {
    pub worker: String,
    pub amount: f64,
    pub reason: String,
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: u64,
    pub event_id: u64,
    pub title: String,
    pub description: String,
    pub department: Department,
    pub assigned: Vec<StaffRef>,
    pub comments: Vec<TaskComment>,
    pub budget_requests: Vec<TaskBudgetRequest>,
    history: History<TaskStatus>,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Open => f.write_str("Open"),
            TaskStatus::InProgress => f.write_str("In Progress"),
            TaskStatus::Closed => f.write_str("Closed"),
        }
    }
}

fn outside(actor: &Actor, department: Department) -> WorkflowError {
    WorkflowError::OutsideDepartment {
        actor: actor.name.clone(),
        department,
    }
}

impl Task {
    /// A new open task in the manager's own department
    pub fn new(
        id: u64,
        manager: &Actor,
        event_id: u64,
        title: &str,
        description: &str,
    ) -> Result<Self, WorkflowError> {
        check_required("title", title)?;
        let department = manager
            .department
            .ok_or(ValidationError::MissingField("department"))?;

        Ok(Self {
            id,
            event_id,
            title: title.to_string(),
            description: description.to_string(),
            department,
            assigned: vec![],
            comments: vec![],
            budget_requests: vec![],
            history: History::open(manager.role(), TaskStatus::Open)?,
        })
    }

    /// Managers only see and steer tasks of their own department
    pub fn check_manager(&self, manager: &Actor) -> Result<(), WorkflowError> {
        if manager.department != Some(self.department) {
            return Err(outside(manager, self.department));
        }
        Ok(())
    }

    fn check_assigned(&self, worker: &Actor) -> Result<(), WorkflowError> {
        if !self.assigned.iter().any(|staff| staff.actor_id == worker.id) {
            return Err(WorkflowError::NotAssigned {
                actor: worker.name.clone(),
                task_id: self.id,
            });
        }
        Ok(())
    }

    fn illegal(&self, reason: &'static str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            kind: Self::KIND,
            id: self.id,
            status: self.status().to_string(),
            reason,
        }
    }

    fn check_open(&self) -> Result<(), WorkflowError> {
        if self.status() == TaskStatus::Closed {
            return Err(self.illegal("task is closed"));
        }
        Ok(())
    }

    /// Assign every worker or none of them. Newly assigned workers are recorded in the
    /// task history under the current status.
    pub fn assign(&mut self, manager: &Actor, workers: &[Actor]) -> Result<(), WorkflowError> {
        self.check_manager(manager)?;
        self.check_open()?;
        if let Some(stranger) = workers
            .iter()
            .find(|worker| worker.department != Some(self.department))
        {
            return Err(ValidationError::DepartmentMismatch {
                worker: stranger.name.clone(),
                department: self.department,
            }
            .into());
        }

        let mut fresh: Vec<StaffRef> = vec![];
        for worker in workers {
            let known = self
                .assigned
                .iter()
                .chain(fresh.iter())
                .any(|staff| staff.actor_id == worker.id);
            if !known {
                fresh.push(worker.staff_ref());
            }
        }
        if fresh.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = fresh.iter().map(|staff| staff.name.as_str()).collect();
        let comment = format!("assigned {}", names.join(", "));
        let record = self.history.prepare(manager.role(), self.status(), &comment)?;

        self.assigned.extend(fresh);
        self.history.commit(record);
        Ok(())
    }

    pub fn change_status(
        &mut self,
        manager: &Actor,
        status: TaskStatus,
    ) -> Result<(), WorkflowError> {
        self.check_manager(manager)?;
        if self.status() == TaskStatus::Closed {
            return Err(self.illegal("closed tasks cannot be reopened"));
        }
        if self.status() == status {
            return Err(self.illegal("cannot update task to same status"));
        }

        self.history.append(manager.role(), status, "")
    }

    pub fn add_comment(&mut self, worker: &Actor, comment: &str) -> Result<(), WorkflowError> {
        self.check_open()?;
        self.check_assigned(worker)?;
        check_required("comment", comment)?;

        self.comments.push(TaskComment {
            worker: worker.name.clone(),
            comment: comment.to_string(),
            timestamp: TimeStamp::new(),
        });
        Ok(())
    }

    pub fn add_budget_request(
        &mut self,
        worker: &Actor,
        amount: f64,
        reason: &str,
    ) -> Result<(), WorkflowError> {
        self.check_open()?;
        self.check_assigned(worker)?;
        let amount = check_positive_amount(amount)?;
        check_required("reason", reason)?;

        self.budget_requests.push(TaskBudgetRequest {
            worker: worker.name.clone(),
            amount,
            reason: reason.to_string(),
            timestamp: TimeStamp::new(),
        });
        Ok(())
    }

    pub fn created_by(&self) -> Option<Role> {
        self.history.records().first().map(|record| record.role)
    }
}

impl Workflow for Task {
    type Status = TaskStatus;
    const KIND: WorkflowKind = WorkflowKind::Task;

    fn id(&self) -> u64 {
        self.id
    }
    fn history(&self) -> &History<TaskStatus> {
        &self.history
    }
    fn headline(&self) -> String {
        format!("EID {} - {}", self.event_id, self.title)
    }
}
