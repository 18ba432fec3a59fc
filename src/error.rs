use super::registry::WorkflowKind;
use super::role::{Action, Department, Role};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("role '{role}' is not allowed to perform '{action}'")]
    PermissionDenied { role: Role, action: Action },
    #[error("{kind} #{id} is {status}: {reason}")]
    IllegalTransition {
        kind: WorkflowKind,
        id: u64,
        status: String,
        reason: &'static str,
    },
    #[error("{kind} #{id}: {role} acted out of order, {reason}")]
    OrderingViolation {
        kind: WorkflowKind,
        id: u64,
        role: Role,
        reason: &'static str,
    },
    #[error("{kind} #{id}: invalid decision '{decision}'")]
    InvalidDecision {
        kind: WorkflowKind,
        id: u64,
        decision: String,
    },
    #[error("no {kind} found with ID {id}")]
    NotFound { kind: WorkflowKind, id: u64 },
    #[error("{actor} cannot act on work outside the {department} department")]
    OutsideDepartment {
        actor: String,
        department: Department,
    },
    #[error("{actor} is not assigned to task #{task_id}")]
    NotAssigned { actor: String, task_id: u64 },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to encode history record: {0}")]
    Encoding(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("amount must be a finite number, got {0}")]
    NonFiniteAmount(f64),
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(f64),
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(f64),
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("Start Date <= End Date failed")]
    InvalidDates,
    #[error("{worker} is not in the {department} department")]
    DepartmentMismatch {
        worker: String,
        department: Department,
    },
}

/// Amounts arrive as floats from the front end, anything non-finite is refused outright
pub fn check_amount(amount: f64, allow_negative: bool) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NonFiniteAmount(amount));
    }
    if !allow_negative && amount < 0.0 {
        return Err(ValidationError::NegativeAmount(amount));
    }
    Ok(amount)
}

pub fn check_positive_amount(amount: f64) -> Result<f64, ValidationError> {
    let amount = check_amount(amount, false)?;
    if amount == 0.0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

pub fn check_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_amounts_are_refused() {
        assert!(matches!(
            check_amount(f64::NAN, true),
            Err(ValidationError::NonFiniteAmount(_))
        ));
        assert_eq!(
            check_amount(f64::INFINITY, true),
            Err(ValidationError::NonFiniteAmount(f64::INFINITY))
        );
    }

    #[test]
    fn negative_amounts_depend_on_policy() {
        assert_eq!(
            check_amount(-10.0, false),
            Err(ValidationError::NegativeAmount(-10.0))
        );
        assert_eq!(check_amount(-10.0, true), Ok(-10.0));
    }

    #[test]
    fn zero_is_not_positive() {
        assert_eq!(
            check_positive_amount(0.0),
            Err(ValidationError::NonPositiveAmount(0.0))
        );
        assert_eq!(check_positive_amount(12.5), Ok(12.5));
    }

    #[test]
    fn blank_fields_are_missing() {
        assert_eq!(
            check_required("client_name", "   "),
            Err(ValidationError::MissingField("client_name"))
        );
        assert!(check_required("client_name", "TestCorp").is_ok());
    }
}
