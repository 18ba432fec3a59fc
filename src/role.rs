//! Roles, actions, actors and the permission table that gates every mutation
use super::error::WorkflowError;
use bech32::Bech32m;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    #[n(0)]
    HrManager,
    #[n(1)]
    HrWorker,
    #[n(2)]
    FinancialManager,
    #[n(3)]
    CustomerServiceWorker,
    #[n(4)]
    CustomerServiceManager,
    #[n(5)]
    AdministrationManager,
    #[n(6)]
    Manager,
    #[n(7)]
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    CreateHrRequest,
    ApproveHrRequest,
    RejectHrRequest,
    AssignStaff,
    CreateBudgetRequest,
    OpenNegotiation,
    ApproveBudget,
    RejectBudget,
    CounterOffer,
    CreateEventApplication,
    ReviewEventApplication,
    CreateTask,
    AssignTask,
    ChangeTaskStatus,
    ReviewTaskFeedback,
    CommentOnTask,
    RequestTaskBudget,
}

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Department {
    #[n(0)]
    Production,
    #[n(1)]
    Services,
}

/// Outcome of a permission lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied,
}

/// An employee as seen by the engine. The role is fixed for the actor's lifetime,
/// department and duty only matter for task distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String, // bech32 encoded uuid7, hrp "actor_"
    pub name: String,
    role: Role,
    pub department: Option<Department>,
    pub duty: Option<String>,
}

/// A reference to an actor kept on a workflow instance (hired staff, assigned workers)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffRef {
    pub actor_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    grants: HashMap<Role, HashSet<Action>>,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::HrManager,
        Role::HrWorker,
        Role::FinancialManager,
        Role::CustomerServiceWorker,
        Role::CustomerServiceManager,
        Role::AdministrationManager,
        Role::Manager,
        Role::Worker,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Role::HrManager => "Human Resources Manager",
            Role::HrWorker => "Human Resources Agent",
            Role::FinancialManager => "Financial Manager",
            Role::CustomerServiceWorker => "Customer Service Officer",
            Role::CustomerServiceManager => "Senior Customer Service Officer",
            Role::AdministrationManager => "Administration Department Manager",
            Role::Manager => "Manager",
            Role::Worker => "Staff Member",
        }
    }
}

impl Action {
    pub const ALL: [Action; 17] = [
        Action::CreateHrRequest,
        Action::ApproveHrRequest,
        Action::RejectHrRequest,
        Action::AssignStaff,
        Action::CreateBudgetRequest,
        Action::OpenNegotiation,
        Action::ApproveBudget,
        Action::RejectBudget,
        Action::CounterOffer,
        Action::CreateEventApplication,
        Action::ReviewEventApplication,
        Action::CreateTask,
        Action::AssignTask,
        Action::ChangeTaskStatus,
        Action::ReviewTaskFeedback,
        Action::CommentOnTask,
        Action::RequestTaskBudget,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateHrRequest => "create_hr_request",
            Action::ApproveHrRequest => "approve_hr_request",
            Action::RejectHrRequest => "reject_hr_request",
            Action::AssignStaff => "assign_staff",
            Action::CreateBudgetRequest => "create_budget_request",
            Action::OpenNegotiation => "open_negotiation",
            Action::ApproveBudget => "approve_budget",
            Action::RejectBudget => "reject_budget",
            Action::CounterOffer => "counter_offer",
            Action::CreateEventApplication => "create_event_application",
            Action::ReviewEventApplication => "review_event_application",
            Action::CreateTask => "create_task",
            Action::AssignTask => "assign_task",
            Action::ChangeTaskStatus => "change_task_status",
            Action::ReviewTaskFeedback => "review_task_feedback",
            Action::CommentOnTask => "comment_on_task",
            Action::RequestTaskBudget => "request_task_budget",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Department::Production => f.write_str("Production"),
            Department::Services => f.write_str("Services"),
        }
    }
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        *self == Verdict::Allowed
    }
}

impl Actor {
    /// Register a new actor with a freshly generated identifier
    pub fn new(name: &str, role: Role) -> anyhow::Result<Self> {
        Ok(Self {
            id: new_actor_id()?,
            name: name.to_string(),
            role,
            department: None,
            duty: None,
        })
    }
    pub fn in_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }
    pub fn with_duty(mut self, duty: &str) -> Self {
        self.duty = Some(duty.to_string());
        self
    }
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn staff_ref(&self) -> StaffRef {
        StaffRef {
            actor_id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

// construct a unique actor id then encode using bech32m
fn new_actor_id() -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse("actor_")?;
    Ok(bech32::encode::<Bech32m>(hrp, uuid7::uuid7().as_bytes())?)
}

impl PermissionTable {
    /// A table with no grants at all, every check is denied
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// The organization's standard role assignments
    pub fn standard() -> Self {
        Self::empty()
            .grant(Role::HrManager, Action::ApproveHrRequest)
            .grant(Role::HrManager, Action::RejectHrRequest)
            .grant(Role::HrManager, Action::AssignStaff)
            .grant(Role::HrWorker, Action::AssignStaff)
            .grant(Role::FinancialManager, Action::OpenNegotiation)
            .grant(Role::FinancialManager, Action::ApproveBudget)
            .grant(Role::FinancialManager, Action::RejectBudget)
            .grant(Role::FinancialManager, Action::CounterOffer)
            .grant(Role::FinancialManager, Action::ReviewEventApplication)
            .grant(Role::CustomerServiceWorker, Action::CreateEventApplication)
            .grant(Role::CustomerServiceManager, Action::CreateEventApplication)
            .grant(Role::CustomerServiceManager, Action::ReviewEventApplication)
            .grant(Role::AdministrationManager, Action::ReviewEventApplication)
            .grant(Role::Manager, Action::CreateHrRequest)
            .grant(Role::Manager, Action::CreateBudgetRequest)
            .grant(Role::Manager, Action::CreateTask)
            .grant(Role::Manager, Action::AssignTask)
            .grant(Role::Manager, Action::ChangeTaskStatus)
            .grant(Role::Manager, Action::ReviewTaskFeedback)
            .grant(Role::Worker, Action::CommentOnTask)
            .grant(Role::Worker, Action::RequestTaskBudget)
    }

    pub fn grant(mut self, role: Role, action: Action) -> Self {
        self.grants.entry(role).or_default().insert(action);
        self
    }

    pub fn revoke(mut self, role: Role, action: Action) -> Self {
        if let Some(actions) = self.grants.get_mut(&role) {
            actions.remove(&action);
        }
        self
    }

    pub fn check(&self, role: Role, action: Action) -> Verdict {
        match self.grants.get(&role) {
            Some(actions) if actions.contains(&action) => Verdict::Allowed,
            _ => Verdict::Denied,
        }
    }

    /// Same lookup as [`PermissionTable::check`] but shaped for `?` at the top of a service call
    pub fn require(&self, role: Role, action: Action) -> Result<(), WorkflowError> {
        match self.check(role, action) {
            Verdict::Allowed => Ok(()),
            Verdict::Denied => Err(WorkflowError::PermissionDenied { role, action }),
        }
    }

    /// Roles that may invoke `action`
    pub fn holders(&self, action: Action) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .grants
            .iter()
            .filter(|(_, actions)| actions.contains(&action))
            .map(|(role, _)| *role)
            .collect();
        roles.sort();
        roles
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_a_holder() {
        let table = PermissionTable::standard();

        for action in Action::ALL {
            assert!(
                !table.holders(action).is_empty(),
                "{action} is not granted to any role"
            );
        }
    }

    #[test]
    fn review_is_held_by_the_three_chain_roles() {
        let table = PermissionTable::standard();

        assert_eq!(
            table.holders(Action::ReviewEventApplication),
            vec![
                Role::FinancialManager,
                Role::CustomerServiceManager,
                Role::AdministrationManager
            ]
        );
    }

    #[test]
    fn absent_role_is_denied() {
        let table = PermissionTable::empty().grant(Role::HrManager, Action::ApproveHrRequest);

        for role in Role::ALL {
            for action in Action::ALL {
                let expected = role == Role::HrManager && action == Action::ApproveHrRequest;
                assert_eq!(table.check(role, action).is_allowed(), expected);
            }
        }
    }

    #[test]
    fn revoke_removes_a_single_grant() {
        let table = PermissionTable::standard().revoke(Role::HrWorker, Action::AssignStaff);

        assert_eq!(table.check(Role::HrWorker, Action::AssignStaff), Verdict::Denied);
        assert_eq!(table.check(Role::HrManager, Action::AssignStaff), Verdict::Allowed);
    }

    #[test]
    fn require_reports_role_and_action() {
        let err = PermissionTable::standard()
            .require(Role::Worker, Action::ApproveBudget)
            .unwrap_err();

        assert_eq!(
            err,
            WorkflowError::PermissionDenied {
                role: Role::Worker,
                action: Action::ApproveBudget
            }
        );
        assert_eq!(
            err.to_string(),
            "role 'Staff Member' is not allowed to perform 'approve_budget'"
        );
    }

    #[test]
    fn actor_ids_are_bech32_and_unique() {
        let a = Actor::new("Alice", Role::Manager).unwrap();
        let b = Actor::new("Bob", Role::Worker)
            .unwrap()
            .in_department(Department::Services)
            .with_duty("Photographer");

        assert!(a.id.starts_with("actor_1"));
        assert_ne!(a.id, b.id);
        assert_eq!(b.role(), Role::Worker);
        assert_eq!(b.duty.as_deref(), Some("Photographer"));
    }
}
