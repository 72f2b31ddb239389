//! Loan Approval Service - Main Entry Point
//!
//! Loads the classifier, then answers loan applications received over NATS
//! one at a time.

use anyhow::Result;
use futures::StreamExt;
use loan_approval_service::{
    config::{AppConfig, LogFormat, LoggingConfig},
    consumer::{decode_application, ApplicationConsumer},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{ModelLoader, ModelState, PredictionService},
    producer::DecisionProducer,
    report::MODEL_UNAVAILABLE_MESSAGE,
    types::DecisionError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("loan_approval_service={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_tracing(&config.logging)?;
    info!("Starting Loan Approval Service");

    // Resolve the model before accepting any application
    let loader = ModelLoader::from_config(&config.model);
    let classifier = match loader.load()? {
        ModelState::Ready(classifier) => classifier,
        ModelState::Unavailable { searched } => {
            error!(searched = ?searched, "{}", MODEL_UNAVAILABLE_MESSAGE);
            anyhow::bail!("no model file found in {} candidate location(s)", searched.len());
        }
    };
    let service = PredictionService::new(classifier);
    info!(
        features = service.extractor().feature_count(),
        "Prediction service ready"
    );

    let metrics = Arc::new(ServiceMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
    let producer = DecisionProducer::new(client.clone(), &config.nats.decision_subject);

    // Start metrics reporter (prints summary every 60 seconds)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 60);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;
    info!(
        subject = consumer.subject(),
        fallback_subject = producer.subject(),
        "Waiting for applications"
    );

    while let Some(message) = subscription.next().await {
        let start_time = Instant::now();

        let application = match decode_application(&message.payload) {
            Ok(application) => application,
            Err(e) => {
                metrics.record_malformed();
                warn!(error = %e, "Failed to deserialize application");
                let reply = DecisionError::new(None, format!("{:#}", e));
                if let Err(e) = producer.respond_error(message.reply.clone(), &reply).await {
                    error!(error = %e, "Failed to publish error reply");
                }
                continue;
            }
        };

        let result = match service.predict(&application) {
            Ok(result) => result,
            Err(e) => {
                metrics.record_failure();
                error!(
                    application_id = ?application.application_id,
                    error = %e,
                    "Prediction failed"
                );
                let reply = DecisionError::new(application.application_id.clone(), "Prediction failed");
                if let Err(e) = producer.respond_error(message.reply.clone(), &reply).await {
                    error!(error = %e, "Failed to publish error reply");
                }
                continue;
            }
        };

        let processing_time = start_time.elapsed();
        metrics.record_decision(processing_time, &result);

        let decision = result.to_decision(application.application_id.clone());
        if let Err(e) = producer.respond(message.reply.clone(), &decision).await {
            error!(
                decision_id = %decision.decision_id,
                error = %e,
                "Failed to publish loan decision"
            );
        } else {
            debug!(
                decision_id = %decision.decision_id,
                status = ?decision.status,
                p_approve = decision.probabilities.map(|p| p.approve),
                processing_time_us = processing_time.as_micros() as u64,
                "Application processed"
            );
        }
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
