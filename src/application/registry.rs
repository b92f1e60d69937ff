use crate::application::actions::{
    Authenticate, Authorize, Capture, ConfirmPayment, FraudScore, InitiatePayment, Refund, StepBox,
    Terminate, Void,
};
use crate::domain::ports::{
    EventPublisherRef, FraudScorerRef, MerchantLookupRef, PartnerCommunicatorRef, TokenVaultRef,
};
use crate::error::{PaymentError, Result};
use crate::infrastructure::redirect::RedirectWrapper;
use crate::workflow::definition::ActionName;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles to the outside services, built once at startup and shared
/// read-only by every execution.
#[derive(Clone)]
pub struct Collaborators {
    pub partner: PartnerCommunicatorRef,
    pub merchants: MerchantLookupRef,
    pub token_vault: TokenVaultRef,
    pub events: EventPublisherRef,
    pub fraud_scorer: FraudScorerRef,
    pub redirect: Arc<RedirectWrapper>,
}

/// Builds a fresh step instance from the shared collaborators.
pub type StepFactory = Box<dyn Fn(&Collaborators) -> StepBox + Send + Sync>;

/// Lookup from action name to step factory.
///
/// Populated before the orchestrator starts serving and never modified
/// afterwards, so concurrent executions read it without locking.
pub struct ActionRegistry {
    collaborators: Collaborators,
    factories: HashMap<ActionName, StepFactory>,
}

impl ActionRegistry {
    /// Creates a registry with no actions registered.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the standard step for every action.
    pub fn with_default_actions(collaborators: Collaborators) -> Self {
        let mut registry = Self::new(collaborators);
        for name in ActionName::ALL {
            registry.register(name, default_factory(name));
        }
        registry
    }

    /// Registers `factory` under `name`, replacing any previous factory.
    pub fn register(&mut self, name: ActionName, factory: StepFactory) {
        self.factories.insert(name, factory);
    }

    /// Whether a factory exists for `name`.
    pub fn is_registered(&self, name: ActionName) -> bool {
        self.factories.contains_key(&name)
    }

    /// Returns a new instance of the step registered under `name`.
    pub fn get_action(&self, name: ActionName) -> Result<StepBox> {
        let factory = self
            .factories
            .get(&name)
            .ok_or(PaymentError::ActionNotRegistered(name))?;
        Ok(factory(&self.collaborators))
    }

    /// Shared collaborator handles passed to every factory.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }
}

fn default_factory(name: ActionName) -> StepFactory {
    match name {
        ActionName::InitiatePayment => Box::new(|c: &Collaborators| {
            Box::new(InitiatePayment::new(c.token_vault.clone(), c.events.clone())) as StepBox
        }),
        ActionName::FraudScore => {
            Box::new(|c: &Collaborators| Box::new(FraudScore::new(c.fraud_scorer.clone())) as StepBox)
        }
        ActionName::Authenticate => Box::new(|c: &Collaborators| {
            Box::new(Authenticate::new(
                c.partner.clone(),
                c.events.clone(),
                c.redirect.clone(),
            )) as StepBox
        }),
        ActionName::Authorize => Box::new(|c: &Collaborators| {
            Box::new(Authorize::new(
                c.partner.clone(),
                c.events.clone(),
                c.redirect.clone(),
            )) as StepBox
        }),
        ActionName::Capture => Box::new(|c: &Collaborators| {
            Box::new(Capture::new(c.partner.clone(), c.events.clone())) as StepBox
        }),
        ActionName::Void => {
            Box::new(|c: &Collaborators| Box::new(Void::new(c.partner.clone(), c.events.clone())) as StepBox)
        }
        ActionName::Refund => Box::new(|c: &Collaborators| {
            Box::new(Refund::new(c.partner.clone(), c.events.clone())) as StepBox
        }),
        ActionName::ConfirmPayment => {
            Box::new(|c: &Collaborators| Box::new(ConfirmPayment::new(c.partner.clone())) as StepBox)
        }
        ActionName::Terminate => Box::new(|_: &Collaborators| Box::new(Terminate) as StepBox),
    }
}
