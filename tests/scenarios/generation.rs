//! Test: Template generation
//!
//! - Output lands only at the declared generated path
//! - Repeated generation is byte-identical
//! - Expansion failures surface and leave earlier output alone

use crate::helpers::*;
use pipegen::{PipelineError, PipelineOptions};
use std::collections::BTreeMap;

const TEMPLATE: &str = r#"# {{ project.name }} / {{ pipeline.name }}
jobs:
{% for ruby in vars.rubies %}
- name: ruby-{{ ruby }}
  plan:
  - task: run-tests
    config:
      platform: linux
      image_resource:
        type: registry-image
        source: {repository: "ruby", tag: "{{ ruby }}"}
{% endfor %}
"#;

fn project_with_rubies() -> TestProject {
    let mut project = TestProject::new();
    let mut vars = BTreeMap::new();
    vars.insert(
        "rubies".to_string(),
        serde_yaml::from_str("[\"3.2\", \"3.3\"]").unwrap(),
    );
    project.registry = project.registry.clone().with_variables(vars);
    project
}

#[test]
fn test_generate_writes_only_generated_path() {
    let mut project = project_with_rubies();
    let generated = project.add_pipeline("build", TEMPLATE, PipelineOptions::default());

    let written = project.registry.generate_all().unwrap();
    assert_eq!(written, vec![generated.clone()]);
    assert_eq!(list_dir(project.path()), vec!["build.yml", "build.yml.generated"]);

    let content = project.read(&generated);
    assert!(content.starts_with("# myproject / build\n"));
    assert!(content.contains("- name: ruby-3.2\n"));
    assert!(content.contains("tag: \"3.3\""));
}

#[test]
fn test_generate_is_idempotent() {
    let mut project = project_with_rubies();
    let generated = project.add_pipeline("build", TEMPLATE, PipelineOptions::default());

    project.registry.generate_all().unwrap();
    let first = std::fs::read(&generated).unwrap();
    project.registry.generate_all().unwrap();
    let second = std::fs::read(&generated).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_expansion_error_keeps_previous_output() {
    let mut project = TestProject::new();
    let generated = project.add_pipeline("build", "jobs: []\n", PipelineOptions::default());
    project.registry.generate_all().unwrap();

    std::fs::write(project.path().join("build.yml"), "jobs: {{ undefined_thing }}\n").unwrap();
    let err = project.registry.generate_all().unwrap_err();

    assert!(matches!(err, PipelineError::TemplateExpansion { .. }));
    assert_eq!(project.read(&generated), "jobs: []\n");
}

#[test]
fn test_missing_template() {
    let mut project = TestProject::new();
    project.add_pipeline("build", "jobs: []\n", PipelineOptions::default());
    std::fs::remove_file(project.path().join("build.yml")).unwrap();

    let err = project.registry.generate_all().unwrap_err();
    assert!(matches!(err, PipelineError::TemplateNotFound(_)));
    assert_eq!(list_dir(project.path()), Vec::<String>::new());
}

#[test]
fn test_helper_files_resolve_next_to_template() {
    let mut project = TestProject::new();
    std::fs::create_dir(project.path().join("tasks")).unwrap();
    std::fs::write(
        project.path().join("tasks/unit.yml"),
        "platform: linux\nrun: {path: make}\n",
    )
    .unwrap();
    std::fs::write(
        project.path().join("macros.j2"),
        "{% macro job(name) %}- name: {{ name }}\n  plan: []\n{% endmacro %}",
    )
    .unwrap();

    let generated = project.add_pipeline(
        "build",
        r#"{% import "macros.j2" as m %}
jobs:
{{ m.job("unit") }}
# {{ read_file("tasks/unit.yml") | length }}
"#,
        PipelineOptions::default(),
    );
    project.registry.generate_all().unwrap();

    let content = project.read(&generated);
    assert!(content.contains("- name: unit"));
}

#[test]
fn test_distinct_pipelines_generate_concurrently() {
    let mut project = TestProject::new();
    let names = ["a", "b", "c", "d"];
    for name in names {
        project.add_pipeline(
            name,
            "jobs:\n- name: {{ pipeline.name }}\n  plan:\n  - task: t\n",
            PipelineOptions::default(),
        );
    }

    std::thread::scope(|scope| {
        for pipeline in project.registry.pipelines() {
            let registry = &project.registry;
            scope.spawn(move || registry.generate(pipeline).unwrap());
        }
    });

    let tasks = project.registry.locator().list_tasks().unwrap();
    assert_eq!(tasks, vec!["a/t", "b/t", "c/t", "d/t"]);
}
