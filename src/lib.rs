/// ChatOps relay - turns infrastructure workflow output into chat messages.
///
/// A single Lambda sits between a Telegram bot and a GitHub Actions workflow:
/// 1. Chat commands (`/status`, `/destroy`, `/confirm_destroy`) trigger the
///    workflow through `repository_dispatch`
/// 2. The workflow calls back with its raw Terraform output, which is routed by
///    size to an AI summary, a simple code-block formatter or passed through,
///    then rendered for Telegram and delivered
///
/// # Architecture
///
/// The system uses:
/// - AWS Lambda behind API Gateway for serverless execution
/// - SSM Parameter Store for secrets
/// - An OpenAI-compatible Responses endpoint for summaries
/// - The Telegram Bot API for delivery
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use chatops_relay::core::config::RelayConfig;
/// use chatops_relay::core::models::{CommandKind, RawOutput};
/// use chatops_relay::pipeline::Dispatcher;
///
/// #[tokio::main]
/// async fn main() {
///     chatops_relay::setup_logging();
///
///     let config = RelayConfig::default();
///     let output = RawOutput::new("No changes.", CommandKind::Status, "123456789");
///     let outcome = Dispatcher::new(&config, None).process(&output).await;
///     println!("{:?}: {}", outcome.route, outcome.message.text);
/// }
/// ```
// Module declarations
pub mod ai;
pub mod api;
pub mod clients;
pub mod core;
pub mod errors;
pub mod pipeline;
pub mod processing;
pub mod telegram;
pub mod utils;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration. Calling it more than once is harmless.
///
/// # Example
///
/// ```
/// // Initialize structured logging at the start of your Lambda handler
/// chatops_relay::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
