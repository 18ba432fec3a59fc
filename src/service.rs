//! Service layer API for workflow operations
//!
//! Every mutating call runs the same pipeline: permission guard, lookup, state machine
//! legality, chain ordering, then the status change and its history record. The whole
//! pipeline runs under the instance's lock, so a failed call leaves nothing behind and
//! concurrent calls on one instance apply one after the other.
use super::budget::{BudgetRequest, Negotiation};
use super::config::EngineConfig;
use super::error::WorkflowError;
use super::event::{EventApplication, EventDetails, EventStatus};
use super::hr::HrRequest;
use super::registry::{Registry, Summary, Workflow, WorkflowKind};
use super::role::{Action, Actor, Role};
use super::task::{Task, TaskBudgetRequest, TaskComment, TaskStatus};
use tracing::{debug, warn};

pub struct WorkflowService {
    config: EngineConfig,
    hr_requests: Registry<HrRequest>,
    budget_requests: Registry<BudgetRequest>,
    negotiations: Registry<Negotiation>,
    applications: Registry<EventApplication>,
    tasks: Registry<Task>,
}

// log the outcome of an operation on a single instance and pass it through
fn traced<T: Workflow>(
    op: &'static str,
    result: Result<T, WorkflowError>,
) -> Result<T, WorkflowError> {
    let kind = T::KIND;
    match &result {
        Ok(instance) => debug!(
            op,
            kind = %kind,
            id = instance.id(),
            status = %instance.status(),
            "workflow updated"
        ),
        Err(err) => debug!(op, kind = %kind, error = %err, "workflow operation refused"),
    }
    result
}

impl WorkflowService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            hr_requests: Registry::new(),
            budget_requests: Registry::new(),
            negotiations: Registry::new(),
            applications: Registry::new(),
            tasks: Registry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Permission check that runs ahead of everything else
    fn guard(&self, role: Role, action: Action) -> Result<(), WorkflowError> {
        self.config.permissions.require(role, action).inspect_err(|_| {
            warn!(role = %role, action = %action, "permission denied");
        })
    }

    /// Summaries of every instance of `kind` in creation order
    pub fn list(&self, kind: WorkflowKind) -> Vec<Summary> {
        match kind {
            WorkflowKind::HrRequest => summaries(&self.hr_requests),
            WorkflowKind::BudgetRequest => summaries(&self.budget_requests),
            WorkflowKind::Negotiation => summaries(&self.negotiations),
            WorkflowKind::EventApplication => summaries(&self.applications),
            WorkflowKind::Task => summaries(&self.tasks),
        }
    }

    // --- HR requests ---

    pub fn create_hr_request(
        &self,
        role: Role,
        request_type: &str,
    ) -> Result<HrRequest, WorkflowError> {
        self.guard(role, Action::CreateHrRequest)?;
        traced(
            "create_hr_request",
            self.hr_requests
                .insert_with(|id| HrRequest::new(id, request_type, role)),
        )
    }

    pub fn approve_hr_request(&self, id: u64, role: Role) -> Result<HrRequest, WorkflowError> {
        self.guard(role, Action::ApproveHrRequest)?;
        traced(
            "approve_hr_request",
            self.hr_requests.update(id, |request| request.approve(role)),
        )
    }

    pub fn reject_hr_request(&self, id: u64, role: Role) -> Result<HrRequest, WorkflowError> {
        self.guard(role, Action::RejectHrRequest)?;
        traced(
            "reject_hr_request",
            self.hr_requests.update(id, |request| request.reject(role)),
        )
    }

    pub fn assign_staff(
        &self,
        id: u64,
        role: Role,
        staff: &Actor,
    ) -> Result<HrRequest, WorkflowError> {
        self.guard(role, Action::AssignStaff)?;
        let completion = self.config.hr_completion;
        traced(
            "assign_staff",
            self.hr_requests.update(id, |request| {
                request.assign_staff(role, staff.staff_ref(), completion)
            }),
        )
    }

    pub fn hr_request(&self, id: u64) -> Result<HrRequest, WorkflowError> {
        self.hr_requests.get(id)
    }

    pub fn hr_requests(&self) -> Vec<HrRequest> {
        self.hr_requests.list()
    }

    // --- Budget requests and negotiations ---

    pub fn create_budget_request(
        &self,
        role: Role,
        event_id: u64,
        amount: f64,
        reason: &str,
    ) -> Result<BudgetRequest, WorkflowError> {
        self.guard(role, Action::CreateBudgetRequest)?;
        traced(
            "create_budget_request",
            self.budget_requests
                .insert_with(|id| BudgetRequest::new(id, event_id, amount, reason, role)),
        )
    }

    /// Start negotiating a pending budget request. A request can be negotiated once.
    pub fn open_negotiation(
        &self,
        role: Role,
        request_id: u64,
    ) -> Result<Negotiation, WorkflowError> {
        self.guard(role, Action::OpenNegotiation)?;

        // request lock first, then the negotiation map
        let request = self.budget_requests.handle(request_id)?;
        let mut request = request.lock();
        traced(
            "open_negotiation",
            self.negotiations
                .insert_with(|id| Negotiation::open(id, &mut *request, role)),
        )
    }

    /// Lock a negotiation and then its request and apply `step` to both
    fn negotiate<F>(
        &self,
        op: &'static str,
        id: u64,
        role: Role,
        action: Action,
        step: F,
    ) -> Result<Negotiation, WorkflowError>
    where
        F: FnOnce(&mut Negotiation, &mut BudgetRequest) -> Result<(), WorkflowError>,
    {
        self.guard(role, action)?;
        traced(op, self.with_negotiation(id, step))
    }

    fn with_negotiation<F>(&self, id: u64, step: F) -> Result<Negotiation, WorkflowError>
    where
        F: FnOnce(&mut Negotiation, &mut BudgetRequest) -> Result<(), WorkflowError>,
    {
        let negotiation = self.negotiations.handle(id)?;
        let mut negotiation = negotiation.lock();
        let request = self.budget_requests.handle(negotiation.request_id())?;
        let mut request = request.lock();

        step(&mut *negotiation, &mut *request)?;
        Ok(negotiation.clone())
    }

    pub fn approve_budget(&self, id: u64, role: Role) -> Result<Negotiation, WorkflowError> {
        self.negotiate("approve_budget", id, role, Action::ApproveBudget, |negotiation, request| {
            negotiation.approve(role, request)
        })
    }

    pub fn reject_budget(&self, id: u64, role: Role) -> Result<Negotiation, WorkflowError> {
        self.negotiate("reject_budget", id, role, Action::RejectBudget, |negotiation, request| {
            negotiation.reject(role, request)
        })
    }

    pub fn counter_offer(
        &self,
        id: u64,
        role: Role,
        amount: f64,
    ) -> Result<Negotiation, WorkflowError> {
        let allow_negative = self.config.allow_negative_counter_offers;
        self.negotiate("counter_offer", id, role, Action::CounterOffer, |negotiation, request| {
            negotiation.counter_offer(role, request, amount, allow_negative)
        })
    }

    pub fn budget_request(&self, id: u64) -> Result<BudgetRequest, WorkflowError> {
        self.budget_requests.get(id)
    }

    pub fn budget_requests(&self) -> Vec<BudgetRequest> {
        self.budget_requests.list()
    }

    pub fn negotiation(&self, id: u64) -> Result<Negotiation, WorkflowError> {
        self.negotiations.get(id)
    }

    pub fn negotiations(&self) -> Vec<Negotiation> {
        self.negotiations.list()
    }

    // --- Event applications ---

    pub fn create_event_application(
        &self,
        role: Role,
        details: EventDetails,
    ) -> Result<EventApplication, WorkflowError> {
        self.guard(role, Action::CreateEventApplication)?;
        traced(
            "create_event_application",
            self.applications
                .insert_with(|id| EventApplication::new(id, details, role)),
        )
    }

    /// Submit a reviewer's decision on an event application
    pub fn review(
        &self,
        id: u64,
        role: Role,
        decision: EventStatus,
        comment: &str,
    ) -> Result<EventApplication, WorkflowError> {
        self.guard(role, Action::ReviewEventApplication)?;
        let chain = self.config.chain;
        traced(
            "review",
            self.applications
                .update(id, |application| application.review(&chain, role, decision, comment)),
        )
    }

    pub fn event_application(&self, id: u64) -> Result<EventApplication, WorkflowError> {
        self.applications.get(id)
    }

    pub fn event_applications(&self) -> Vec<EventApplication> {
        self.applications.list()
    }

    // --- Tasks ---

    pub fn create_task(
        &self,
        manager: &Actor,
        event_id: u64,
        title: &str,
        description: &str,
    ) -> Result<Task, WorkflowError> {
        self.guard(manager.role(), Action::CreateTask)?;
        traced(
            "create_task",
            self.tasks
                .insert_with(|id| Task::new(id, manager, event_id, title, description)),
        )
    }

    pub fn assign_task(
        &self,
        manager: &Actor,
        id: u64,
        workers: &[Actor],
    ) -> Result<Task, WorkflowError> {
        self.guard(manager.role(), Action::AssignTask)?;
        traced(
            "assign_task",
            self.tasks.update(id, |task| task.assign(manager, workers)),
        )
    }

    pub fn change_task_status(
        &self,
        manager: &Actor,
        id: u64,
        status: TaskStatus,
    ) -> Result<Task, WorkflowError> {
        self.guard(manager.role(), Action::ChangeTaskStatus)?;
        traced(
            "change_task_status",
            self.tasks.update(id, |task| task.change_status(manager, status)),
        )
    }

    pub fn comment_on_task(
        &self,
        worker: &Actor,
        id: u64,
        comment: &str,
    ) -> Result<Task, WorkflowError> {
        self.guard(worker.role(), Action::CommentOnTask)?;
        traced(
            "comment_on_task",
            self.tasks.update(id, |task| task.add_comment(worker, comment)),
        )
    }

    pub fn request_task_budget(
        &self,
        worker: &Actor,
        id: u64,
        amount: f64,
        reason: &str,
    ) -> Result<Task, WorkflowError> {
        self.guard(worker.role(), Action::RequestTaskBudget)?;
        traced(
            "request_task_budget",
            self.tasks
                .update(id, |task| task.add_budget_request(worker, amount, reason)),
        )
    }

    /// Worker comments on a task, for a manager of the task's department
    pub fn task_feedback(
        &self,
        manager: &Actor,
        id: u64,
    ) -> Result<Vec<TaskComment>, WorkflowError> {
        self.guard(manager.role(), Action::ReviewTaskFeedback)?;
        let task = self.tasks.get(id)?;
        task.check_manager(manager)?;
        Ok(task.comments)
    }

    pub fn task_budget_requests(
        &self,
        manager: &Actor,
        id: u64,
    ) -> Result<Vec<TaskBudgetRequest>, WorkflowError> {
        self.guard(manager.role(), Action::ReviewTaskFeedback)?;
        let task = self.tasks.get(id)?;
        task.check_manager(manager)?;
        Ok(task.budget_requests)
    }

    /// Tasks the worker is assigned to
    pub fn worker_tasks(&self, worker: &Actor) -> Vec<Task> {
        self.tasks
            .list()
            .into_iter()
            .filter(|task| task.assigned.iter().any(|staff| staff.actor_id == worker.id))
            .collect()
    }

    /// Tasks of the manager's department
    pub fn manager_tasks(&self, manager: &Actor) -> Result<Vec<Task>, WorkflowError> {
        self.guard(manager.role(), Action::ReviewTaskFeedback)?;
        Ok(self
            .tasks
            .list()
            .into_iter()
            .filter(|task| manager.department == Some(task.department))
            .collect())
    }

    pub fn task(&self, id: u64) -> Result<Task, WorkflowError> {
        self.tasks.get(id)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.list()
    }
}

impl Default for WorkflowService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn summaries<T: Workflow>(registry: &Registry<T>) -> Vec<Summary> {
    registry.list().iter().map(Workflow::summary).collect()
}
