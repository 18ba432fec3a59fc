//! Budget requests and the negotiations that settle them
//!
//! A request is created pending and is then handed to a negotiation. From that point on
//! the negotiation is the only thing that changes the request's amount or status.
use super::error::{WorkflowError, check_amount, check_required};
use super::history::History;
use super::registry::{Workflow, WorkflowKind};
use super::role::Role;
use std::fmt;

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    CounterOffer,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRequest {
    id: u64,
    pub event_id: u64,
    amount: f64,
    pub reason: String,
    negotiation_id: Option<u64>,
    history: History<BudgetStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    id: u64,
    request_id: u64,
    history: History<NegotiationStatus>,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::Pending => f.write_str("Pending"),
            BudgetStatus::Approved => f.write_str("Approved"),
            BudgetStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationStatus::Pending => f.write_str("Pending"),
            NegotiationStatus::CounterOffer => f.write_str("Counter Offer"),
            NegotiationStatus::Approved => f.write_str("Approved"),
            NegotiationStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

impl NegotiationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationStatus::Approved | NegotiationStatus::Rejected)
    }
}

impl BudgetRequest {
    pub fn new(
        id: u64,
        event_id: u64,
        amount: f64,
        reason: &str,
        created_by: Role,
    ) -> Result<Self, WorkflowError> {
        let amount = check_amount(amount, false)?;
        check_required("reason", reason)?;

        Ok(Self {
            id,
            event_id,
            amount,
            reason: reason.to_string(),
            negotiation_id: None,
            history: History::open(created_by, BudgetStatus::Pending)?,
        })
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The negotiation that owns this request, if one has been opened
    pub fn negotiation_id(&self) -> Option<u64> {
        self.negotiation_id
    }

    fn illegal(&self, reason: &'static str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            kind: Self::KIND,
            id: self.id,
            status: self.status().to_string(),
            reason,
        }
    }

    /// Hand the request over to a negotiation
    pub(crate) fn bind(&mut self, negotiation_id: u64) -> Result<(), WorkflowError> {
        if self.negotiation_id.is_some() {
            return Err(self.illegal("request is already under negotiation"));
        }
        if self.status() != BudgetStatus::Pending {
            return Err(self.illegal("only pending requests can be negotiated"));
        }
        self.negotiation_id = Some(negotiation_id);
        Ok(())
    }
}

impl Negotiation {
    /// Open a negotiation over `request`, binding the request to it
    pub fn open(
        id: u64,
        request: &mut BudgetRequest,
        opened_by: Role,
    ) -> Result<Self, WorkflowError> {
        let history = History::open(opened_by, NegotiationStatus::Pending)?;
        request.bind(id)?;

        Ok(Self {
            id,
            request_id: request.id,
            history,
        })
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    fn illegal(&self, reason: &'static str) -> WorkflowError {
        WorkflowError::IllegalTransition {
            kind: Self::KIND,
            id: self.id,
            status: self.status().to_string(),
            reason,
        }
    }

    fn check_linked(&self, request: &BudgetRequest) -> Result<(), WorkflowError> {
        if request.negotiation_id != Some(self.id) {
            return Err(self.illegal("request is not bound to this negotiation"));
        }
        Ok(())
    }

    /// Settle on the current amount. The linked request is approved along with it.
    pub fn approve(
        &mut self,
        role: Role,
        request: &mut BudgetRequest,
    ) -> Result<(), WorkflowError> {
        self.check_linked(request)?;
        match self.status() {
            NegotiationStatus::Rejected => {
                return Err(self.illegal("cannot approve a rejected negotiation"));
            }
            NegotiationStatus::Approved => {
                return Err(self.illegal("negotiation is already approved"));
            }
            NegotiationStatus::Pending | NegotiationStatus::CounterOffer => {}
        }

        self.settle(role, request, NegotiationStatus::Approved, BudgetStatus::Approved)
    }

    pub fn reject(&mut self, role: Role, request: &mut BudgetRequest) -> Result<(), WorkflowError> {
        self.check_linked(request)?;
        match self.status() {
            NegotiationStatus::Approved => {
                return Err(self.illegal("cannot reject an already approved negotiation"));
            }
            NegotiationStatus::Rejected => {
                return Err(self.illegal("negotiation is already rejected"));
            }
            NegotiationStatus::Pending | NegotiationStatus::CounterOffer => {}
        }

        self.settle(role, request, NegotiationStatus::Rejected, BudgetStatus::Rejected)
    }

    fn settle(
        &mut self,
        role: Role,
        request: &mut BudgetRequest,
        outcome: NegotiationStatus,
        request_outcome: BudgetStatus,
    ) -> Result<(), WorkflowError> {
        let comment = format!("settled at {}", request.amount);
        let record = self.history.prepare(role, outcome, &comment)?;
        let request_record = request.history.prepare(
            role,
            request_outcome,
            &format!("negotiation #{} {}", self.id, outcome),
        )?;

        self.history.commit(record);
        request.history.commit(request_record);
        Ok(())
    }

    /// Propose `amount` in place of the request's current amount.
    ///
    /// Only the negotiation's history records the offer, the request keeps no trail of
    /// earlier amounts.
    pub fn counter_offer(
        &mut self,
        role: Role,
        request: &mut BudgetRequest,
        amount: f64,
        allow_negative: bool,
    ) -> Result<(), WorkflowError> {
        self.check_linked(request)?;
        if self.status().is_terminal() {
            return Err(self.illegal("cannot counter offer after approval/rejection"));
        }
        let amount = check_amount(amount, allow_negative)?;

        let comment = format!("counter offer {} -> {}", request.amount, amount);
        let record = self
            .history
            .prepare(role, NegotiationStatus::CounterOffer, &comment)?;

        request.amount = amount;
        self.history.commit(record);
        Ok(())
    }
}

impl Workflow for BudgetRequest {
    type Status = BudgetStatus;
    const KIND: WorkflowKind = WorkflowKind::BudgetRequest;

    fn id(&self) -> u64 {
        self.id
    }
    fn history(&self) -> &History<BudgetStatus> {
        &self.history
    }
    fn headline(&self) -> String {
        format!("event {} - {} ({:.2})", self.event_id, self.reason, self.amount)
    }
}

impl Workflow for Negotiation {
    type Status = NegotiationStatus;
    const KIND: WorkflowKind = WorkflowKind::Negotiation;

    fn id(&self) -> u64 {
        self.id
    }
    fn history(&self) -> &History<NegotiationStatus> {
        &self.history
    }
    fn headline(&self) -> String {
        format!("budget request #{}", self.request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FM: Role = Role::FinancialManager;

    fn negotiation() -> (Negotiation, BudgetRequest) {
        let mut request =
            BudgetRequest::new(1, 42, 5_000.0, "Stage lighting", Role::Manager).unwrap();
        let negotiation = Negotiation::open(1, &mut request, FM).unwrap();
        (negotiation, request)
    }

    #[test]
    fn open_binds_the_request() {
        let (negotiation, request) = negotiation();

        assert_eq!(negotiation.status(), NegotiationStatus::Pending);
        assert_eq!(negotiation.request_id(), 1);
        assert_eq!(request.negotiation_id(), Some(1));
    }

    #[test]
    fn request_can_only_be_negotiated_once() {
        let (_, mut request) = negotiation();

        let err = Negotiation::open(2, &mut request, FM).unwrap_err();

        assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
        assert_eq!(request.negotiation_id(), Some(1));
    }

    #[test]
    fn counter_offer_amends_the_request_amount() {
        let (mut negotiation, mut request) = negotiation();

        negotiation.counter_offer(FM, &mut request, 4_000.0, false).unwrap();
        negotiation.counter_offer(FM, &mut request, 3_500.0, false).unwrap();

        assert_eq!(negotiation.status(), NegotiationStatus::CounterOffer);
        assert_eq!(request.amount(), 3_500.0);
        assert_eq!(request.status(), BudgetStatus::Pending);
        assert_eq!(request.history().len(), 1);
        assert_eq!(negotiation.history().len(), 3);
    }

    #[test]
    fn approve_cascades_to_the_request() {
        let (mut negotiation, mut request) = negotiation();
        negotiation.counter_offer(FM, &mut request, 4_000.0, false).unwrap();

        negotiation.approve(FM, &mut request).unwrap();

        assert_eq!(negotiation.status(), NegotiationStatus::Approved);
        assert_eq!(request.status(), BudgetStatus::Approved);
        assert_eq!(request.amount(), 4_000.0);
    }

    #[test]
    fn reject_cascades_to_the_request() {
        let (mut negotiation, mut request) = negotiation();

        negotiation.reject(FM, &mut request).unwrap();

        assert_eq!(negotiation.status(), NegotiationStatus::Rejected);
        assert_eq!(request.status(), BudgetStatus::Rejected);
    }

    #[test]
    fn terminal_states_refuse_everything() {
        let (mut approved, mut approved_request) = negotiation();
        approved.approve(FM, &mut approved_request).unwrap();

        assert!(approved.reject(FM, &mut approved_request).is_err());
        assert!(approved.approve(FM, &mut approved_request).is_err());
        assert!(approved.counter_offer(FM, &mut approved_request, 1.0, false).is_err());
        assert_eq!(approved.history().len(), 2);

        let (mut rejected, mut rejected_request) = negotiation();
        rejected.reject(FM, &mut rejected_request).unwrap();

        let err = rejected.approve(FM, &mut rejected_request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "negotiation #1 is Rejected: cannot approve a rejected negotiation"
        );
        assert!(rejected.reject(FM, &mut rejected_request).is_err());
        assert_eq!(rejected_request.status(), BudgetStatus::Rejected);
    }

    #[test]
    fn counter_offer_refuses_bad_amounts_without_side_effects() {
        let (mut negotiation, mut request) = negotiation();

        let err = negotiation
            .counter_offer(FM, &mut request, f64::NAN, true)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let err = negotiation
            .counter_offer(FM, &mut request, -1.0, false)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        assert_eq!(request.amount(), 5_000.0);
        assert_eq!(negotiation.status(), NegotiationStatus::Pending);

        negotiation.counter_offer(FM, &mut request, -1.0, true).unwrap();
        assert_eq!(request.amount(), -1.0);
    }

    #[test]
    fn foreign_request_is_refused() {
        let (mut negotiation, _) = negotiation();
        let mut other = BudgetRequest::new(2, 42, 100.0, "Catering", Role::Manager).unwrap();

        assert!(negotiation.approve(FM, &mut other).is_err());
        assert_eq!(other.status(), BudgetStatus::Pending);
    }
}
