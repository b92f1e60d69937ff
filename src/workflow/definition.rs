//! The payment state machine, described as data.
//!
//! Each node lists candidate next actions in order; the first edge whose
//! condition holds wins. When nothing matches the run ends at `Terminate`.

use crate::error::{PaymentError, Result};
use crate::workflow::condition::{Condition, Operator, evaluate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionName {
    InitiatePayment,
    FraudScore,
    Authenticate,
    Authorize,
    Capture,
    Void,
    Refund,
    ConfirmPayment,
    Terminate,
}

impl ActionName {
    pub const ALL: [ActionName; 9] = [
        ActionName::InitiatePayment,
        ActionName::FraudScore,
        ActionName::Authenticate,
        ActionName::Authorize,
        ActionName::Capture,
        ActionName::Void,
        ActionName::Refund,
        ActionName::ConfirmPayment,
        ActionName::Terminate,
    ];

    /// Name as written in workflow definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::InitiatePayment => "InitiatePayment",
            ActionName::FraudScore => "FraudScore",
            ActionName::Authenticate => "Authenticate",
            ActionName::Authorize => "Authorize",
            ActionName::Capture => "Capture",
            ActionName::Void => "Void",
            ActionName::Refund => "Refund",
            ActionName::ConfirmPayment => "ConfirmPayment",
            ActionName::Terminate => "Terminate",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        ActionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PaymentError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    /// Kept as text so a definition loaded from JSON can be checked for
    /// targets this build does not know.
    pub target_action_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl WorkflowEdge {
    /// Edge taken when `condition` holds.
    pub fn to(target: ActionName, condition: Condition) -> Self {
        Self {
            target_action_name: target.to_string(),
            condition: Some(condition),
        }
    }

    /// Unconditional edge.
    pub fn always(target: ActionName) -> Self {
        Self {
            target_action_name: target.to_string(),
            condition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAction {
    pub name: ActionName,
    #[serde(default)]
    pub next: Vec<WorkflowEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub actions: Vec<WorkflowAction>,
}

impl WorkflowDefinition {
    /// Parses a definition. Call [`WorkflowDefinition::validate`] before use.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The node of `name`, if the graph has one.
    pub fn node(&self, name: ActionName) -> Option<&WorkflowAction> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Checks that every edge points at a known action that has a node.
    pub fn validate(&self) -> Result<()> {
        for action in &self.actions {
            for edge in &action.next {
                let target: ActionName = edge.target_action_name.parse()?;
                if target != ActionName::Terminate && self.node(target).is_none() {
                    return Err(PaymentError::MissingWorkflowNode(target));
                }
            }
        }
        Ok(())
    }

    /// Picks the action to run after `current` given the context's JSON form.
    pub fn next_action(&self, current: ActionName, context: &Value) -> Result<ActionName> {
        let node = self
            .node(current)
            .ok_or(PaymentError::MissingWorkflowNode(current))?;

        for edge in &node.next {
            if evaluate(edge.condition.as_ref(), context) {
                return edge.target_action_name.parse();
            }
        }

        warn!(action = %current, "no transition matched, terminating workflow");
        Ok(ActionName::Terminate)
    }

    /// The standard payment workflow.
    pub fn payment() -> Self {
        use ActionName::*;

        let advice_is = |advice: &str| Condition::property("fraud.advice", Operator::Equals, json!(advice));
        let advice_passed = || {
            Condition::property(
                "fraud.advice",
                Operator::In,
                json!(["APPROVE", "CHALLENGE"]),
            )
        };
        let status_is = |status: &str| Condition::property("payment.status", Operator::Equals, json!(status));
        let flag = |path: &str, value: bool| Condition::property(path, Operator::Equals, json!(value));
        let auto_capture = || {
            Condition::property(
                "payment.captureMethod",
                Operator::In,
                json!(["AUTOMATIC", "DELAYED"]),
            )
        };
        let below_ceiling = |attempts: &str, ceiling: &str| {
            Condition::compare_paths(attempts, Operator::LessThan, format!("config.{}", ceiling))
        };

        let actions = vec![
            WorkflowAction {
                name: InitiatePayment,
                next: vec![
                    WorkflowEdge::to(FraudScore, flag("fraud.requirePreAuthentication", true)),
                    WorkflowEdge::to(Authenticate, flag("authentication.skip", false)),
                    WorkflowEdge::always(Authorize),
                ],
            },
            WorkflowAction {
                name: FraudScore,
                next: vec![
                    WorkflowEdge::to(
                        Authenticate,
                        Condition::and(vec![
                            Condition::or(vec![
                                advice_is("CHALLENGE"),
                                Condition::and(vec![
                                    advice_is("APPROVE"),
                                    flag("authentication.skip", false),
                                ]),
                            ]),
                            flag("authentication.done", false),
                            status_is("INITIATED"),
                        ]),
                    ),
                    WorkflowEdge::to(
                        Authorize,
                        Condition::and(vec![
                            Condition::or(vec![
                                flag("authentication.skip", true),
                                flag("authentication.done", true),
                            ]),
                            advice_passed(),
                            status_is("INITIATED"),
                        ]),
                    ),
                    WorkflowEdge::to(
                        Capture,
                        Condition::and(vec![advice_passed(), status_is("AUTHORIZED"), auto_capture()]),
                    ),
                    WorkflowEdge::to(
                        Void,
                        Condition::and(vec![advice_is("REJECT"), status_is("AUTHORIZED")]),
                    ),
                    WorkflowEdge::to(
                        Refund,
                        Condition::and(vec![advice_is("REJECT"), status_is("CAPTURED")]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: Authenticate,
                next: vec![
                    WorkflowEdge::to(
                        FraudScore,
                        Condition::and(vec![
                            flag("fraud.requirePostAuthorization", true),
                            flag("authentication.done", true),
                        ]),
                    ),
                    WorkflowEdge::to(
                        Authorize,
                        Condition::and(vec![
                            flag("fraud.requirePostAuthorization", false),
                            flag("authentication.done", true),
                        ]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: Authorize,
                next: vec![
                    WorkflowEdge::to(
                        Authorize,
                        Condition::and(vec![
                            status_is("REFUSED"),
                            below_ceiling("authorizeAttempts", "maxAuthorizeAttempts"),
                        ]),
                    ),
                    WorkflowEdge::to(
                        FraudScore,
                        Condition::and(vec![
                            status_is("AUTHORIZED"),
                            flag("fraud.requirePostAuthorization", true),
                        ]),
                    ),
                    WorkflowEdge::to(
                        Capture,
                        Condition::and(vec![status_is("AUTHORIZED"), auto_capture()]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: Capture,
                next: vec![
                    WorkflowEdge::to(
                        Capture,
                        Condition::and(vec![
                            Condition::property("capture.status", Operator::Equals, json!("CAPTURE_FAILED")),
                            below_ceiling("captureAttempts", "maxCaptureAttempts"),
                        ]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: Void,
                next: vec![
                    WorkflowEdge::to(
                        Void,
                        Condition::and(vec![
                            Condition::property("payment.status", Operator::NotEquals, json!("VOIDED")),
                            Condition::property("void.status", Operator::Equals, json!("FAILED")),
                            below_ceiling("voidAttempts", "maxVoidAttempts"),
                        ]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: Refund,
                next: vec![
                    WorkflowEdge::to(
                        Refund,
                        Condition::and(vec![
                            Condition::property("refund.status", Operator::Equals, json!("REFUND_FAILED")),
                            below_ceiling("refundAttempts", "maxRefundAttempts"),
                        ]),
                    ),
                    WorkflowEdge::always(Terminate),
                ],
            },
            WorkflowAction {
                name: ConfirmPayment,
                next: vec![WorkflowEdge::always(Authorize)],
            },
            WorkflowAction {
                name: Terminate,
                next: Vec::new(),
            },
        ];

        Self {
            name: "payment".to_string(),
            actions,
        }
    }
}
