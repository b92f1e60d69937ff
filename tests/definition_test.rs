mod common;

use common::{Harness, ScriptedPartner, card_payment, merchant, redirect};
use payflow::application::actions::{StepBox, Terminate};
use payflow::application::orchestrator::{OrchestratorConfig, PaymentOrchestrator};
use payflow::application::registry::{ActionRegistry, Collaborators};
use payflow::domain::context::RequestMeta;
use payflow::error::PaymentError;
use payflow::infrastructure::fraud::FixedFraudScorer;
use payflow::infrastructure::in_memory::{
    InMemoryMerchantStore, InMemoryTokenVault, RecordingEventPublisher,
};
use payflow::workflow::definition::{ActionName, WorkflowAction, WorkflowDefinition, WorkflowEdge};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn looping_definition() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "looping".to_string(),
        actions: vec![
            WorkflowAction {
                name: ActionName::InitiatePayment,
                next: vec![WorkflowEdge::always(ActionName::Authorize)],
            },
            WorkflowAction {
                name: ActionName::Authorize,
                next: vec![WorkflowEdge::always(ActionName::Authorize)],
            },
        ],
    }
}

#[tokio::test]
async fn test_loop_guard_aborts_runaway_workflow() {
    let harness = Harness::with_definition(ScriptedPartner::new(), merchant(), 10, looping_definition())
        .await
        .unwrap();

    let outcome = harness
        .orchestrator
        .execute_payment(card_payment(dec!(10)), RequestMeta::new())
        .await;

    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(PaymentError::LoopGuard { steps: 100 })));
    let ctx = outcome.context.as_ref().unwrap();
    assert_eq!(ctx.executed.len(), 100);
    assert!(!ctx.executed.contains(&ActionName::Terminate));
    assert_eq!(harness.partner.count("authorize"), 99);
}

#[tokio::test]
async fn test_unknown_edge_target_is_rejected_at_startup() {
    let json = r#"{
        "name": "broken",
        "actions": [
            {"name": "InitiatePayment", "next": [{"targetActionName": "Teleport"}]}
        ]
    }"#;
    let definition = WorkflowDefinition::from_json(json).unwrap();

    let err = Harness::with_definition(ScriptedPartner::new(), merchant(), 10, definition)
        .await
        .err()
        .unwrap();

    assert!(matches!(&err, PaymentError::UnknownAction(name) if name == "Teleport"));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_edge_to_missing_node_is_rejected_at_startup() {
    let definition = WorkflowDefinition {
        name: "partial".to_string(),
        actions: vec![WorkflowAction {
            name: ActionName::InitiatePayment,
            next: vec![WorkflowEdge::always(ActionName::Capture)],
        }],
    };

    let err = Harness::with_definition(ScriptedPartner::new(), merchant(), 10, definition)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, PaymentError::MissingWorkflowNode(ActionName::Capture)));
}

#[tokio::test]
async fn test_unregistered_action_is_rejected_at_startup() {
    let collaborators = Collaborators {
        partner: Arc::new(ScriptedPartner::new()),
        merchants: Arc::new(InMemoryMerchantStore::new()),
        token_vault: Arc::new(InMemoryTokenVault::new()),
        events: Arc::new(RecordingEventPublisher::new()),
        fraud_scorer: Arc::new(FixedFraudScorer(0)),
        redirect: Arc::new(redirect()),
    };
    let mut registry = ActionRegistry::new(collaborators);
    registry.register(
        ActionName::Terminate,
        Box::new(|_: &Collaborators| Box::new(Terminate) as StepBox),
    );

    let err = PaymentOrchestrator::new(registry, WorkflowDefinition::payment(), OrchestratorConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PaymentError::ActionNotRegistered(ActionName::InitiatePayment)));
}

#[tokio::test]
async fn test_definition_survives_json_round_trip() {
    let standard = WorkflowDefinition::payment();
    let json = serde_json::to_string(&standard).unwrap();
    let loaded = WorkflowDefinition::from_json(&json).unwrap();
    assert_eq!(loaded, standard);

    let harness = Harness::with_definition(ScriptedPartner::new(), merchant(), 10, loaded)
        .await
        .unwrap();
    let outcome = harness
        .orchestrator
        .execute_payment(card_payment(dec!(10)), RequestMeta::new())
        .await;
    assert_eq!(
        outcome.context.unwrap().executed,
        vec![
            ActionName::InitiatePayment,
            ActionName::Authorize,
            ActionName::Capture,
            ActionName::Terminate
        ]
    );
}
