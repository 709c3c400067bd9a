//! Test: Task lookup across pipelines
//!
//! - Earliest registered pipeline wins
//! - Listing preserves duplicates and registration order
//! - Misses are a valid result, not an error

use crate::helpers::*;
use pipegen::PipelineError;

fn build_and_deploy() -> TestProject {
    let mut project = TestProject::new();
    project.add_generated("build", &unit_job_document("build"));
    project.add_generated("deploy", &unit_job_document("deploy"));
    project
}

#[test]
fn test_find_task_prefers_first_pipeline() {
    let project = build_and_deploy();

    let found = project
        .registry
        .locator()
        .find_task("unit/run-tests")
        .unwrap()
        .expect("Task should be found");

    assert_eq!(found.pipeline, "build");
    assert_eq!(found.job, "unit");
    assert_eq!(found.step.task.as_deref(), Some("run-tests"));
    let config = found.step.config.expect("Step should carry config");
    assert_eq!(config["params"]["SOURCE"].as_str(), Some("build"));
}

#[test]
fn test_list_tasks_preserves_duplicates() {
    let project = build_and_deploy();
    let tasks = project.registry.locator().list_tasks().unwrap();
    assert_eq!(tasks, vec!["unit/run-tests", "unit/run-tests"]);
}

#[test]
fn test_task_only_in_later_pipeline() {
    let mut project = TestProject::new();
    project.add_generated("build", &unit_job_document("build"));
    project.add_generated(
        "deploy",
        "jobs:\n- name: ship\n  plan:\n  - task: push\n    config: {platform: linux}\n",
    );

    let found = project
        .registry
        .locator()
        .find_task("ship/push")
        .unwrap()
        .expect("Task should be found");
    assert_eq!(found.pipeline, "deploy");
}

#[test]
fn test_unknown_task_is_not_found() {
    let project = build_and_deploy();
    let locator = project.registry.locator();

    assert_eq!(locator.find_task("unit/nope").unwrap(), None);
    assert_eq!(locator.find_task("nope/run-tests").unwrap(), None);
    assert_eq!(locator.find_task("run-tests").unwrap(), None);
}

#[test]
fn test_lookup_fails_on_ungenerated_pipeline() {
    let mut project = TestProject::new();
    project.add_pipeline("build", "jobs: []\n", Default::default());

    let err = project.registry.locator().find_task("unit/run-tests").unwrap_err();
    assert!(matches!(err, PipelineError::DocumentLoad { .. }));
}

#[test]
fn test_lookup_after_generate() {
    let mut project = TestProject::new();
    project.add_pipeline(
        "build",
        r#"jobs:
{% for job in ["unit", "integration"] %}
- name: {{ job }}
  plan:
  - task: run-tests
{% endfor %}
"#,
        Default::default(),
    );
    project.registry.generate_all().unwrap();

    let tasks = project.registry.locator().list_tasks().unwrap();
    assert_eq!(tasks, vec!["unit/run-tests", "integration/run-tests"]);
    assert!(project
        .registry
        .locator()
        .find_task("integration/run-tests")
        .unwrap()
        .is_some());
}
