use chatops_relay::core::models::{CommandKind, CompletionStatus, ResourceAction};
use chatops_relay::processing::{extract, normalize};

#[test]
fn test_status_counts_resources_by_type() {
    let raw = "Resource: aws_instance.web (created)\n\
               Resource: aws_instance.api (created)\n\
               Resource: aws_s3_bucket.logs (created)\n";
    let summary = extract(&normalize(raw), CommandKind::Status);

    assert_eq!(summary.count(ResourceAction::Create), 3);
    assert_eq!(summary.total_resources(), 3);
    assert_eq!(summary.resource_types.get("aws_instance"), Some(&2));
    assert_eq!(summary.resource_types.get("aws_s3_bucket"), Some(&1));
    assert_eq!(summary.completion_status, CompletionStatus::Unknown);
}

#[test]
fn test_destroy_plan_counts_planned_destroys() {
    let raw = "  # aws_instance.web will be destroyed\n\
               - resource \"aws_instance\" \"web\" {}\n\
               # module.db.aws_db_instance.main will be destroyed\n\
               # aws_security_group.sg will be updated in-place\n\
               Plan: 0 to add, 1 to change, 2 to destroy.\n";
    let summary = extract(&normalize(raw), CommandKind::Destroy);

    assert_eq!(summary.count(ResourceAction::Destroy), 2);
    assert_eq!(summary.count(ResourceAction::Update), 1);
    assert_eq!(summary.resource_types.get("aws_db_instance"), Some(&1));
}

#[test]
fn test_confirm_destroy_success() {
    let raw = "aws_instance.web: Destroying... [id=i-1]\n\
               aws_instance.web: Destruction complete after 3s\n\
               aws_vpc.main: Destroying... [id=vpc-1]\n\
               aws_vpc.main: Destruction complete after 1s\n\
               \n\
               Destroy complete! Resources: 2 destroyed.\n";
    let summary = extract(&normalize(raw), CommandKind::ConfirmDestroy);

    assert_eq!(summary.completion_status, CompletionStatus::Success);
    assert_eq!(summary.count(ResourceAction::Destroy), 2);
    assert_eq!(summary.resource_types.get("aws_vpc"), Some(&1));
}

#[test]
fn test_confirm_destroy_failure() {
    let raw = "aws_vpc.main: Destroying... [id=vpc-1]\n\
               Error: Error destroying VPC: DependencyViolation\n";
    let summary = extract(&normalize(raw), CommandKind::ConfirmDestroy);

    assert_eq!(summary.completion_status, CompletionStatus::Failed);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("DependencyViolation"));
    assert_eq!(summary.count(ResourceAction::Destroy), 0);
}

#[test]
fn test_confirm_destroy_partial_when_both_markers_present() {
    let raw = "aws_instance.web: Destruction complete after 3s\n\
               Error: Error destroying VPC: DependencyViolation\n\
               Destroy complete! Resources: 1 destroyed.\n";
    let summary = extract(&normalize(raw), CommandKind::ConfirmDestroy);
    assert_eq!(summary.completion_status, CompletionStatus::Partial);
}

#[test]
fn test_confirm_destroy_ignores_plan_sections() {
    let raw = "  # aws_instance.web will be destroyed\n\
               # aws_instance.api will be destroyed\n";
    let summary = extract(&normalize(raw), CommandKind::ConfirmDestroy);
    assert_eq!(summary.count(ResourceAction::Destroy), 0);
    assert_eq!(summary.completion_status, CompletionStatus::Unknown);
}

#[test]
fn test_errors_and_warnings_are_first_lines_verbatim() {
    let raw = "Warning: Argument is deprecated\n  with aws_s3_bucket.logs\n\
               Error: Invalid provider configuration\n  on main.tf line 1\n";
    for kind in [CommandKind::Status, CommandKind::Destroy, CommandKind::ConfirmDestroy] {
        let summary = extract(&normalize(raw), kind);
        assert_eq!(summary.warnings, vec!["Warning: Argument is deprecated"]);
        assert_eq!(summary.errors, vec!["Error: Invalid provider configuration"]);
    }
}

#[test]
fn test_empty_input_is_not_an_error() {
    let summary = extract(&normalize(""), CommandKind::ConfirmDestroy);
    assert_eq!(summary.total_resources(), 0);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.completion_status, CompletionStatus::Unknown);
}
