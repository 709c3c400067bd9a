//! Test: Overlay stage composition
//!
//! - The overlay tool only ever sees expanded text
//! - Secondary inputs precede the primary input
//! - Empty templates still go through both stages

use crate::helpers::*;
use pipegen::{OverlayConfig, PipelineError, PipelineOptions};

/// Logs its argument list, copies the primary input to `primary.log`,
/// then prints the primary input with the overlay marker resolved
const RECORDING_OVERLAY: &str = r#"dir=$(dirname "$0")
echo "$@" > "$dir/args.log"
for last; do :; done
cp "$last" "$dir/primary.log"
sed 's/#@overlay-marker/overlaid: true/' "$last"
"#;

#[test]
fn test_overlay_receives_expanded_text() {
    let mut project = TestProject::new().with_overlay_script(RECORDING_OVERLAY);
    let generated = project.add_pipeline(
        "build",
        "{{ \"#@overlay-marker\" }}\njobs: []\n",
        PipelineOptions::default().with_overlay(OverlayConfig::DefaultLocation),
    );

    project.registry.generate_all().unwrap();

    let primary = project.read(&project.path().join("primary.log"));
    assert_eq!(primary, "#@overlay-marker\njobs: []\n");
    assert!(!primary.contains("{{"));
    assert_eq!(project.read(&generated), "overlaid: true\njobs: []\n");
}

#[test]
fn test_secondary_inputs_precede_primary() {
    let mut project = TestProject::new().with_overlay_script(RECORDING_OVERLAY);
    std::fs::write(project.path().join("ytt.yml"), "#@data/values\n---\n").unwrap();
    std::fs::create_dir(project.path().join("ytt")).unwrap();
    std::fs::write(project.path().join("ytt/b.yml"), "").unwrap();
    std::fs::write(project.path().join("ytt/a.yml"), "").unwrap();

    project.add_pipeline(
        "build",
        "jobs: []\n",
        PipelineOptions::default().with_overlay(OverlayConfig::DefaultLocation),
    );
    project.registry.generate_all().unwrap();

    let args = project.read(&project.path().join("args.log"));
    let args: Vec<&str> = args.split_whitespace().collect();
    let dir = project.path().display().to_string();

    assert_eq!(args.len(), 8);
    let expected = vec![
        "-f".to_string(),
        format!("{}/ytt.yml", dir),
        "-f".to_string(),
        format!("{}/ytt/a.yml", dir),
        "-f".to_string(),
        format!("{}/ytt/b.yml", dir),
    ];
    assert_eq!(&args[..6], expected.as_slice());
    assert_eq!(args[6], "-f");
    assert!(args[7].ends_with(".yml"));
    assert!(!args[7].starts_with(&dir));
}

#[test]
fn test_explicit_overlay_file() {
    let mut project = TestProject::new().with_overlay_script(RECORDING_OVERLAY);
    let overlay_file = project.path().join("custom-overlay.yml");
    std::fs::write(&overlay_file, "").unwrap();

    project.add_pipeline(
        "build",
        "jobs: []\n",
        PipelineOptions::default().with_overlay(OverlayConfig::ExplicitPath(overlay_file.clone())),
    );
    project.registry.generate_all().unwrap();

    let args = project.read(&project.path().join("args.log"));
    let args: Vec<&str> = args.split_whitespace().collect();
    assert_eq!(args.len(), 4);
    assert_eq!(args[1], overlay_file.display().to_string());
}

#[test]
fn test_empty_template_still_overlaid() {
    let mut project = TestProject::new().with_overlay_script(RECORDING_OVERLAY);
    let generated = project.add_pipeline(
        "build",
        "",
        PipelineOptions::default().with_overlay(OverlayConfig::DefaultLocation),
    );

    project.registry.generate_all().unwrap();

    assert!(project.path().join("args.log").exists());
    assert_eq!(project.read(&project.path().join("primary.log")), "");
    assert_eq!(project.read(&generated), "");
}

#[test]
fn test_disabled_overlay_never_runs_tool() {
    let mut project = TestProject::new().with_overlay_script(RECORDING_OVERLAY);
    let generated = project.add_pipeline("build", "jobs: []\n", PipelineOptions::default());

    project.registry.generate_all().unwrap();

    assert!(!project.path().join("args.log").exists());
    assert_eq!(project.read(&generated), "jobs: []\n");
}

#[test]
fn test_overlay_timeout_is_fatal() {
    let mut project = TestProject::new();
    let overlay = fake_overlay(project.path(), "sleep 5\n")
        .with_timeout(std::time::Duration::from_millis(200));
    project.registry = project.registry.clone().with_overlay(overlay);
    project.add_pipeline(
        "build",
        "jobs: []\n",
        PipelineOptions::default().with_overlay(OverlayConfig::DefaultLocation),
    );

    let err = project.registry.generate_all().unwrap_err();
    assert!(matches!(err, PipelineError::OverlayTimeout { .. }));
    assert!(err.to_string().ends_with("timed out after 200ms"));
}
