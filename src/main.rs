use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payflow::application::orchestrator::{OrchestratorConfig, PaymentOrchestrator};
use payflow::application::registry::{ActionRegistry, Collaborators};
use payflow::domain::context::RequestMeta;
use payflow::domain::merchant::{Merchant, PartnerConfig};
use payflow::infrastructure::fraud::RandomFraudScorer;
use payflow::infrastructure::in_memory::{
    InMemoryMerchantStore, InMemoryTokenVault, RecordingEventPublisher,
};
use payflow::infrastructure::redirect::RedirectWrapper;
use payflow::infrastructure::simulated_partner::SimulatedPartner;
use payflow::interfaces::csv::outcome_writer::OutcomeWriter;
use payflow::interfaces::csv::payment_reader::PaymentReader;
use payflow::workflow::definition::WorkflowDefinition;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payments CSV file
    input: PathBuf,

    /// JSON file with the merchant directory. Defaults to a single `demo` merchant.
    #[arg(long, env = "PAYFLOW_MERCHANTS")]
    merchants: Option<PathBuf>,

    /// Secret used to encrypt partner redirect payloads.
    #[arg(long, env = "PAYFLOW_REDIRECT_SECRET", default_value = "payflow-dev-secret")]
    redirect_secret: String,

    /// Public base URL for checkout redirects and shopper return URLs.
    #[arg(long, env = "PAYFLOW_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// Probability that the simulated partner accepts a capture.
    #[arg(
        long,
        env = "PAYFLOW_CAPTURE_SUCCESS_RATE",
        default_value_t = 0.9,
        value_parser = parse_rate
    )]
    capture_success_rate: f64,

    /// JSON file with a custom workflow definition.
    #[arg(long)]
    workflow: Option<PathBuf>,
}

/// Parses a probability, rejecting NaN, infinities and values outside 0..=1.
fn parse_rate(value: &str) -> std::result::Result<f64, String> {
    let rate: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{} is not a probability between 0 and 1", value))
    }
}

fn demo_merchant() -> Merchant {
    Merchant::new("demo", "Demo Shop", PartnerConfig::new("simulated"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let merchants = match &cli.merchants {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            serde_json::from_reader::<_, Vec<Merchant>>(file).into_diagnostic()?
        }
        None => vec![demo_merchant()],
    };
    info!(count = merchants.len(), "merchant directory loaded");

    let definition = match &cli.workflow {
        Some(path) => WorkflowDefinition::from_json(&fs::read_to_string(path).into_diagnostic()?)?,
        None => WorkflowDefinition::payment(),
    };

    let collaborators = Collaborators {
        partner: Arc::new(SimulatedPartner::new(cli.capture_success_rate)),
        merchants: Arc::new(InMemoryMerchantStore::with_merchants(merchants).await),
        token_vault: Arc::new(InMemoryTokenVault::new()),
        events: Arc::new(RecordingEventPublisher::new()),
        fraud_scorer: Arc::new(RandomFraudScorer),
        redirect: Arc::new(RedirectWrapper::new(
            &cli.redirect_secret,
            cli.base_url.clone(),
            cli.base_url,
        )),
    };
    let orchestrator = PaymentOrchestrator::new(
        ActionRegistry::with_default_actions(collaborators),
        definition,
        OrchestratorConfig::default(),
    )?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = PaymentReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for (line, payment) in reader.payments().enumerate() {
        match payment {
            Ok(payment) => {
                let reference = payment.reference.clone().unwrap_or_default();
                let outcome = orchestrator.execute_payment(payment, RequestMeta::new()).await;
                writer.write_outcome(&reference, &outcome)?;
            }
            Err(e) => {
                warn!(row = line + 1, error = %e, "skipping unreadable payment row");
                writer.write_rejected(&format!("row {}", line + 1), &e)?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}
