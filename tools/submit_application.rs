//! Sample Application Submitter
//!
//! Generates loan applications, submits them to the service over NATS
//! request/reply and prints the returned reports.

use loan_approval_service::types::application::{CreditHistory, LoanApplication, PropertyArea};
use loan_approval_service::types::DecisionError;
use loan_approval_service::LoanDecision;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Random application generator
struct ApplicationGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl ApplicationGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    fn generate(&mut self) -> LoanApplication {
        self.counter += 1;

        let credit_history = if self.rng.gen_bool(0.8) {
            CreditHistory::Good
        } else {
            CreditHistory::Bad
        };
        let property_area = match self.rng.gen_range(0..3) {
            0 => PropertyArea::Urban,
            1 => PropertyArea::Semiurban,
            _ => PropertyArea::Rural,
        };

        LoanApplication::new(
            credit_history,
            property_area,
            self.rng.gen_range(7.0..11.0),
            self.rng.gen_range(3.5..6.5),
        )
        .with_id(format!("app_{:08}", self.counter))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_application=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("loan.applications");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(5);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let mut generator = ApplicationGenerator::new();

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Printing sample applications only.");
            for _ in 0..count {
                let json = serde_json::to_string_pretty(&generator.generate())?;
                println!("{}", json);
            }
            return Ok(());
        }
    };

    for _ in 0..count {
        let application = generator.generate();
        let payload = serde_json::to_vec(&application)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let decision: LoanDecision = match serde_json::from_slice(&reply.payload) {
                    Ok(decision) => decision,
                    Err(_) => {
                        let error: DecisionError = serde_json::from_slice(&reply.payload)?;
                        warn!(
                            application_id = ?application.application_id,
                            error = %error.error,
                            "Application was not decided"
                        );
                        continue;
                    }
                };
                println!(
                    "{} (credit={:?}, area={:?}, income_log={:.2}, loan_log={:.2})\n{}",
                    application.application_id.as_deref().unwrap_or("-"),
                    application.credit_history,
                    application.property_area,
                    application.total_income_log,
                    application.loan_amount_log,
                    decision.message
                );
            }
            Err(e) => warn!(error = %e, "Request failed"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
