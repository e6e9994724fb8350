mod common;

use std::time::Duration;

use chatops_relay::core::config::RelayConfig;
use chatops_relay::core::models::{CommandKind, CompletionStatus, RawOutput, ResourceAction};
use chatops_relay::errors::SummarizerError;
use chatops_relay::pipeline::{Dispatcher, Route, decide_route};
use chatops_relay::processing::simple_formatter;
use chatops_relay::telegram::render;
use common::{ScriptedSummarizer, ai_config, padded_resource_block};

const DESTROY_RUN: &str = "aws_instance.web: Destroying... [id=i-0abc]\n\
aws_instance.web: Destruction complete after 31s\n\
aws_s3_bucket.logs: Destroying... [id=logs]\n\
aws_s3_bucket.logs: Destruction complete after 2s\n\
aws_vpc.main: Destroying... [id=vpc-1]\n\
aws_vpc.main: Destruction complete after 1s\n\
\n\
Destroy complete! Resources: 3 destroyed.\n";

fn simple_rendering(raw: &str, config: &RelayConfig) -> chatops_relay::core::models::RenderedMessage {
    render(
        &simple_formatter::format(raw, config.simple_format_max_chars),
        config.message_format,
        config.max_message_length,
    )
}

#[test]
fn test_ai_threshold_is_exclusive() {
    let config = ai_config();
    let route_for = |len: usize| {
        decide_route(
            &RawOutput::new("x".repeat(len), CommandKind::Status, "1"),
            &config,
        )
    };

    assert_eq!(route_for(4999), Route::Simple);
    assert_eq!(route_for(5000), Route::Simple);
    assert_eq!(route_for(5001), Route::Ai);
}

#[test]
fn test_simple_threshold_is_exclusive() {
    let config = RelayConfig::default();
    let route_for = |len: usize| {
        decide_route(
            &RawOutput::new("x".repeat(len), CommandKind::Status, "1"),
            &config,
        )
    };

    assert_eq!(route_for(3499), Route::PassThrough);
    assert_eq!(route_for(3500), Route::PassThrough);
    assert_eq!(route_for(3501), Route::Simple);
}

#[test]
fn test_thresholds_count_characters_not_bytes() {
    let config = ai_config();
    // 5000 three-byte characters is still exactly at the threshold.
    let output = RawOutput::new("─".repeat(5000), CommandKind::Status, "1");
    assert_eq!(decide_route(&output, &config), Route::Simple);
}

#[test]
fn test_ai_disabled_never_routes_to_ai() {
    let config = RelayConfig::default();
    let output = RawOutput::new("x".repeat(50_000), CommandKind::ConfirmDestroy, "1");
    assert_eq!(decide_route(&output, &config), Route::Simple);
}

#[test]
fn test_confirm_destroy_policy_default_respects_threshold() {
    let config = ai_config();
    let output = RawOutput::new(DESTROY_RUN, CommandKind::ConfirmDestroy, "1");
    assert_eq!(decide_route(&output, &config), Route::PassThrough);
}

#[test]
fn test_confirm_destroy_policy_bypass_always_uses_ai() {
    let config = RelayConfig {
        confirm_destroy_bypass_threshold: true,
        ..ai_config()
    };
    let output = RawOutput::new(DESTROY_RUN, CommandKind::ConfirmDestroy, "1");
    assert_eq!(decide_route(&output, &config), Route::Ai);

    // Only confirm_destroy is affected.
    let output = RawOutput::new(DESTROY_RUN, CommandKind::Destroy, "1");
    assert_eq!(decide_route(&output, &config), Route::PassThrough);

    // And never when AI is off.
    let config = RelayConfig {
        ai_enabled: false,
        ..config
    };
    let output = RawOutput::new(DESTROY_RUN, CommandKind::ConfirmDestroy, "1");
    assert_eq!(decide_route(&output, &config), Route::PassThrough);
}

#[tokio::test]
async fn test_status_short_passes_through() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::succeeding("unused");
    let raw = "Resource: aws_instance.a (created)\n";
    let output = RawOutput::new(raw, CommandKind::Status, "123");

    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert_eq!(outcome.route, Route::PassThrough);
    assert!(outcome.message.text.contains("Resource: aws_instance.a (created)"));
    assert!(!outcome.message.truncated);
    assert!(outcome.summary.is_none());
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn test_destroy_duplicate_plan_is_summarized_once() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::succeeding("- 1 `aws_instance` would be destroyed");
    let block = padded_resource_block("Resource: aws_instance.x (will be destroyed)", 3000);
    let raw = block.repeat(2);
    assert_eq!(raw.chars().count(), 6000);

    let sections = chatops_relay::processing::normalize(&raw);
    assert_eq!(sections.len(), 1);

    let output = RawOutput::new(raw, CommandKind::Destroy, "123");
    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert_eq!(outcome.route, Route::Ai);
    assert!(outcome.fallback.is_none());
    assert_eq!(summarizer.calls(), 1);
    let summary = outcome.summary.expect("summary on AI success");
    assert_eq!(summary.count(ResourceAction::Destroy), 1);
    assert!(outcome.message.text.contains("Destroy plan"));
    assert!(outcome.message.text.contains("would be destroyed"));
}

#[tokio::test]
async fn test_prompt_uses_command_template_and_stays_bounded() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::succeeding("ok");
    let raw: String = (0..400)
        .map(|i| format!("Resource: aws_instance.n{i} (will be destroyed)\n  ami = \"ami-1\"\n"))
        .collect();
    let output = RawOutput::new(raw, CommandKind::Destroy, "1");

    Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    let prompts = summarizer.prompts.lock().unwrap();
    let template = chatops_relay::ai::prompt_builder::template_for(CommandKind::Destroy);
    assert!(prompts[0].starts_with(template));
    assert!(prompts[0].chars().count() <= template.chars().count() + config.prompt_max_chars);
}

#[tokio::test]
async fn test_confirm_destroy_ai_failure_falls_back_to_simple() {
    let config = RelayConfig {
        confirm_destroy_bypass_threshold: true,
        ..ai_config()
    };
    let summarizer = ScriptedSummarizer::failing(SummarizerError::ServiceUnavailable(
        "status 503".to_string(),
    ));
    let output = RawOutput::new(DESTROY_RUN, CommandKind::ConfirmDestroy, "123");

    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert_eq!(outcome.route, Route::Ai);
    assert_eq!(outcome.effective_route(), Route::Simple);
    assert!(outcome.summary.is_none());
    assert!(outcome.message.text.contains("Destroy complete"));
    assert_eq!(outcome.message, simple_rendering(DESTROY_RUN, &config));
}

#[tokio::test]
async fn test_long_confirm_destroy_failure_keeps_result_line() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::failing(SummarizerError::ServiceUnavailable(
        "connection reset".to_string(),
    ));
    let mut raw = String::from("Destroy complete! Resources: 3 destroyed.\n");
    raw.push_str(&"aws_instance.web: Still destroying... [10s elapsed]\n".repeat(120));
    assert!(raw.chars().count() > config.ai_threshold);

    let output = RawOutput::new(raw.clone(), CommandKind::ConfirmDestroy, "123");
    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert!(outcome.fallback.is_some());
    assert!(outcome.message.text.contains("Destroy complete"));
    assert!(outcome.message.text.chars().count() <= config.max_message_length);
}

#[tokio::test]
async fn test_every_summarizer_error_falls_back_to_simple_rendering() {
    let config = ai_config();
    let raw = padded_resource_block("Resource: aws_db_instance.main (will be destroyed)", 6000);

    let errors = [
        SummarizerError::ServiceUnavailable("status 500".to_string()),
        SummarizerError::InvalidResponse("no output text".to_string()),
        SummarizerError::BudgetExceeded("max_output_tokens".to_string()),
    ];

    for error in errors {
        let summarizer = ScriptedSummarizer::failing(error.clone());
        let output = RawOutput::new(raw.clone(), CommandKind::Destroy, "1");
        let outcome = Dispatcher::new(&config, Some(&summarizer))
            .process(&output)
            .await;

        assert_eq!(outcome.fallback, Some(error));
        assert!(outcome.summary.is_none());
        assert_eq!(outcome.message, simple_rendering(&raw, &config));
    }
}

#[tokio::test(start_paused = true)]
async fn test_summarizer_timeout_falls_back() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::hanging(Duration::from_secs(60));
    let raw = "x".repeat(6000);
    let output = RawOutput::new(raw.clone(), CommandKind::Status, "1");

    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert!(matches!(
        outcome.fallback,
        Some(SummarizerError::ServiceUnavailable(_))
    ));
    assert_eq!(outcome.message, simple_rendering(&raw, &config));
}

#[tokio::test]
async fn test_missing_summarizer_falls_back() {
    let config = ai_config();
    let raw = "x".repeat(6000);
    let output = RawOutput::new(raw.clone(), CommandKind::Status, "1");

    let outcome = Dispatcher::new(&config, None).process(&output).await;

    assert_eq!(outcome.route, Route::Ai);
    assert!(matches!(
        outcome.fallback,
        Some(SummarizerError::ServiceUnavailable(_))
    ));
    assert_eq!(outcome.message, simple_rendering(&raw, &config));
}

#[tokio::test]
async fn test_confirm_destroy_ai_success_reports_actual_result() {
    let config = RelayConfig {
        confirm_destroy_bypass_threshold: true,
        ..ai_config()
    };
    let summarizer = ScriptedSummarizer::succeeding("All 3 resources were destroyed.");
    let output = RawOutput::new(DESTROY_RUN, CommandKind::ConfirmDestroy, "1");

    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    let summary = outcome.summary.expect("summary on AI success");
    assert_eq!(summary.completion_status, CompletionStatus::Success);
    assert_eq!(summary.count(ResourceAction::Destroy), 3);
    assert!(outcome.message.text.contains("Destroy result"));
    assert!(outcome.message.text.contains("All 3 resources were destroyed."));
}

#[tokio::test]
async fn test_ai_disabled_long_output_uses_simple_formatter() {
    let config = RelayConfig::default();
    let summarizer = ScriptedSummarizer::succeeding("unused");
    let raw = "y".repeat(8000);
    let output = RawOutput::new(raw.clone(), CommandKind::Status, "1");

    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert_eq!(outcome.route, Route::Simple);
    assert!(outcome.fallback.is_none());
    assert_eq!(summarizer.calls(), 0);
    assert_eq!(outcome.message, simple_rendering(&raw, &config));
    assert!(outcome.message.text.contains("(output truncated)"));
}

#[tokio::test]
async fn test_unstructured_output_reaches_the_prompt() {
    let config = ai_config();
    let summarizer = ScriptedSummarizer::succeeding("Terraform initialised, nothing else ran.");
    let raw = "Terraform has been successfully initialized!\n".repeat(130);
    assert!(raw.chars().count() > config.ai_threshold);

    let output = RawOutput::new(raw, CommandKind::Status, "1");
    let outcome = Dispatcher::new(&config, Some(&summarizer))
        .process(&output)
        .await;

    assert!(outcome.fallback.is_none());
    let prompts = summarizer.prompts.lock().unwrap();
    let template = chatops_relay::ai::prompt_builder::template_for(CommandKind::Status);
    let listed = &prompts[0][template.len()..];
    assert!(listed.starts_with("Terraform has been successfully initialized!"));
    assert!(!listed.contains("omitted"));
    assert!(prompts[0].chars().count() <= template.chars().count() + config.prompt_max_chars);
}
