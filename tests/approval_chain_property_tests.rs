//! Property-based tests for the event application review chain
//!
//! Random review sequences from every role with every status value are replayed
//! through the service. Whatever the sequence, the status must mirror the last history
//! record, refusals must leave no trace and the chain order must hold for every decision
//! that was accepted.

use approval_workflow::{
    WorkflowError, WorkflowService,
    event::{EventDetails, EventStatus},
    history::TimeStamp,
    registry::Workflow,
    role::Role,
};
use proptest::prelude::*;

// These property tests cover:
//
// 1. Status always equals the status of the newest record
// 2. Refused reviews leave status and history untouched
// 3. Accepted budget decisions only happen on forwarded applications
// 4. Accepted final decisions only happen after a budget review
// 5. Approved and Rejected are terminal
// 6. The hash chain verifies after every step

#[derive(Debug, Clone)]
struct Review {
    role: Role,
    decision: EventStatus,
    comment: &'static str,
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

/// Weighted towards the reviewing roles so that sequences get deep into the chain
fn reviewer_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        3 => Just(Role::CustomerServiceManager),
        3 => Just(Role::FinancialManager),
        3 => Just(Role::AdministrationManager),
        1 => role_strategy(),
    ]
}

fn decision_strategy() -> impl Strategy<Value = EventStatus> {
    prop_oneof![
        3 => Just(EventStatus::Forwarded),
        2 => Just(EventStatus::Approved),
        1 => Just(EventStatus::Rejected),
        1 => Just(EventStatus::PendingReview),
    ]
}

fn review_strategy() -> impl Strategy<Value = Review> {
    (
        reviewer_strategy(),
        decision_strategy(),
        prop::sample::select(vec!["", "Budget OK", "Too expensive"]),
    )
        .prop_map(|(role, decision, comment)| Review {
            role,
            decision,
            comment,
        })
}

fn details() -> EventDetails {
    EventDetails {
        client_name: "TestCorp".to_string(),
        event_type: "Conference".to_string(),
        start_date: TimeStamp::new_with(2025, 10, 1, 9, 0, 0).unwrap(),
        end_date: TimeStamp::new_with(2025, 10, 3, 18, 0, 0).unwrap(),
        budget: 5_000.0,
        preferences: String::new(),
    }
}

proptest! {
    /// Property: every step keeps status and history consistent, and refusals change nothing
    #[test]
    fn status_mirrors_history(reviews in prop::collection::vec(review_strategy(), 0..24)) {
        let service = WorkflowService::default();
        let app = service
            .create_event_application(Role::CustomerServiceWorker, details())
            .unwrap();
        let mut accepted = 0;

        for review in reviews {
            let before = service.event_application(app.id()).unwrap();
            let result = service.review(app.id(), review.role, review.decision, review.comment);
            let after = service.event_application(app.id()).unwrap();

            match result {
                Ok(returned) => {
                    accepted += 1;
                    prop_assert_eq!(
                        &returned,
                        &after,
                        "returned state differs from the stored one"
                    );
                    prop_assert_eq!(after.status(), review.decision);
                    prop_assert_eq!(after.history().len(), before.history().len() + 1);
                }
                Err(_) => {
                    prop_assert_eq!(&before, &after, "a refused review changed the application");
                }
            }

            let latest = after.history().latest().unwrap();
            prop_assert_eq!(
                latest.status,
                after.status(),
                "status does not mirror the newest record"
            );
            prop_assert!(after.history().verify(), "hash chain is broken");
        }

        let app = service.event_application(app.id()).unwrap();
        prop_assert_eq!(app.history().len(), 1 + accepted);
    }

    /// Property: accepted decisions respect the chain order
    #[test]
    fn chain_order_holds(reviews in prop::collection::vec(review_strategy(), 0..24)) {
        let service = WorkflowService::default();
        let app = service
            .create_event_application(Role::CustomerServiceWorker, details())
            .unwrap();

        for review in reviews {
            let before = service.event_application(app.id()).unwrap();
            if service
                .review(app.id(), review.role, review.decision, review.comment)
                .is_err()
            {
                continue;
            }

            match review.role {
                Role::FinancialManager => {
                    prop_assert_eq!(before.status(), EventStatus::Forwarded);
                }
                Role::AdministrationManager => {
                    prop_assert!(
                        before.history().authored_by(Role::FinancialManager),
                        "final decision before any budget review"
                    );
                }
                Role::CustomerServiceManager => {}
                other => prop_assert!(false, "{} has no stage but was accepted", other),
            }
        }
    }

    /// Property: once approved or rejected, every further review is refused as illegal
    #[test]
    fn decisions_are_terminal(reviews in prop::collection::vec(review_strategy(), 0..24)) {
        let service = WorkflowService::default();
        let app = service
            .create_event_application(Role::CustomerServiceWorker, details())
            .unwrap();

        for review in reviews {
            let before = service.event_application(app.id()).unwrap().status();
            let result = service.review(app.id(), review.role, review.decision, review.comment);

            if matches!(before, EventStatus::Approved | EventStatus::Rejected) {
                match result {
                    Err(WorkflowError::IllegalTransition { .. })
                    | Err(WorkflowError::PermissionDenied { .. }) => {}
                    other => prop_assert!(false, "terminal application accepted {:?}", other),
                }
            }
        }
    }

    /// Property: the live comment is the budget reviewer's latest non-empty comment
    #[test]
    fn comment_tracks_budget_reviewer(reviews in prop::collection::vec(review_strategy(), 0..24)) {
        let service = WorkflowService::default();
        let app = service
            .create_event_application(Role::CustomerServiceWorker, details())
            .unwrap();

        for review in reviews {
            let _ = service.review(app.id(), review.role, review.decision, review.comment);
        }

        let app = service.event_application(app.id()).unwrap();
        let expected = app
            .history()
            .records()
            .iter()
            .rev()
            .find(|record| record.role == Role::FinancialManager && !record.comment.is_empty())
            .map(|record| record.comment.as_str());
        prop_assert_eq!(app.comment(), expected);
    }

    /// Property: record timestamps never go backwards
    #[test]
    fn timestamps_are_ordered(reviews in prop::collection::vec(review_strategy(), 0..16)) {
        let service = WorkflowService::default();
        let app = service
            .create_event_application(Role::CustomerServiceWorker, details())
            .unwrap();

        for review in reviews {
            let _ = service.review(app.id(), review.role, review.decision, review.comment);
        }

        let app = service.event_application(app.id()).unwrap();
        let records = app.history().records();
        for pair in records.windows(2) {
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            prop_assert_eq!(pair[1].prev_hash.as_deref(), Some(pair[0].hash.as_str()));
        }
    }
}
