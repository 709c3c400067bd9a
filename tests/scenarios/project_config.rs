//! Test: Project file to generated pipelines
//!
//! - Declared pipelines register in file order
//! - Overlay settings and variables flow from the project file
//! - `init` bootstraps a project that generates cleanly

use pipegen::core::workspace::{self, InitAction};
use pipegen::ProjectConfig;

fn write_config(root: &std::path::Path, body: &str) -> ProjectConfig {
    let yaml = format!("project: myproject\ndirectory: {}\n{}", root.join("ci").display(), body);
    let path = root.join("pipegen.yml");
    std::fs::write(&path, yaml).unwrap();
    ProjectConfig::from_file(&path).unwrap()
}

#[test]
fn test_project_file_drives_generation() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("ci")).unwrap();
    std::fs::write(
        root.path().join("ci/build.yml"),
        r#"jobs:
{% for ruby in vars.rubies %}
- name: ruby-{{ ruby }}
  plan:
  - task: test
{% endfor %}
"#,
    )
    .unwrap();
    std::fs::write(
        root.path().join("ci/deploy.yml"),
        "jobs:\n- name: ship\n  plan:\n  - task: push-to-{{ project.fly_target }}\n",
    )
    .unwrap();

    let config = write_config(
        root.path(),
        r#"fly_target: prod
variables:
  rubies: ["3.2", "3.3"]
pipelines:
  - name: build
    template: build.yml
  - name: deploy
    template: deploy.yml
    generated: out/deploy.yml
"#,
    );
    std::fs::create_dir(root.path().join("ci/out")).unwrap();

    let registry = config.to_registry().unwrap();
    let written = registry.generate_all().unwrap();
    assert_eq!(
        written,
        vec![
            root.path().join("ci/build.yml.generated"),
            root.path().join("ci/out/deploy.yml"),
        ]
    );

    let tasks = registry.locator().list_tasks().unwrap();
    assert_eq!(tasks, vec!["ruby-3.2/test", "ruby-3.3/test", "ship/push-to-prod"]);
}

#[test]
fn test_project_file_overlay_settings() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("ci")).unwrap();
    std::fs::write(root.path().join("ci/build.yml"), "jobs: []\n").unwrap();
    let script = root.path().join("fake-ytt.sh");
    std::fs::write(&script, "echo 'jobs: [] # overlaid'\n").unwrap();

    let config = write_config(
        root.path(),
        &format!(
            r#"overlay:
  program: sh
  args: ["{}"]
  timeout_secs: 5
pipelines:
  - name: build
    template: build.yml
    ytt: true
"#,
            script.display()
        ),
    );

    let registry = config.to_registry().unwrap();
    registry.generate_all().unwrap();

    assert_eq!(
        std::fs::read_to_string(root.path().join("ci/build.yml.generated")).unwrap(),
        "jobs: [] # overlaid\n"
    );
}

#[test]
fn test_clean_removes_generated_documents() {
    let root = tempfile::tempdir().unwrap();
    let config = write_config(root.path(), "");
    workspace::init(&config, root.path()).unwrap();

    let registry = config.to_registry().unwrap();
    registry.generate_all().unwrap();
    assert!(root.path().join("ci/myproject.yml.generated").exists());

    let removed = registry.clean().unwrap();
    assert_eq!(removed, vec![root.path().join("ci/myproject.yml.generated")]);
    assert!(root.path().join("ci/myproject.yml").exists());
    assert!(registry.clean().unwrap().is_empty());
}

#[test]
fn test_init_then_generate_empty_project() {
    let root = tempfile::tempdir().unwrap();
    let config = write_config(root.path(), "");

    let actions = workspace::init(&config, root.path()).unwrap();
    assert!(actions.contains(&InitAction::CreatedTemplate(root.path().join("ci/myproject.yml"))));
    assert!(root.path().join("ci/tasks").is_dir());

    let registry = config.to_registry().unwrap();
    registry.generate_all().unwrap();

    assert_eq!(
        std::fs::read_to_string(root.path().join("ci/myproject.yml.generated")).unwrap(),
        ""
    );
    assert!(registry.locator().list_tasks().unwrap().is_empty());
}
