//! CLI output formatting

use crate::core::TaskMatch;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Announce an external command before it runs
pub fn running(message: &str) {
    println!("{} {}", style("RUNNING:").bold().red(), message);
}

/// Print an informational note
pub fn note(message: &str) {
    println!("{} {}", style("NOTE:").bold().green(), message);
}

/// Format a task list for display, sorted
pub fn format_task_list(project: &str, tasks: &[String]) -> String {
    let mut sorted = tasks.to_vec();
    sorted.sort();

    let mut out = format!("Available Concourse tasks for {} are:", style(project).bold());
    for task in &sorted {
        out.push_str(&format!("\n * {}", style(task).cyan()));
    }
    out
}

/// Format a located task and its step as YAML
pub fn format_task_match(found: &TaskMatch) -> Result<String, serde_yaml::Error> {
    let step = serde_yaml::to_string(&found.step)?;
    Ok(format!(
        "{} {}/{} {}\n{}",
        INFO,
        style(&found.job).bold(),
        style(found.step.task.as_deref().unwrap_or_default()).bold(),
        style(format!("(pipeline {})", found.pipeline)).dim(),
        step.trim_end()
    ))
}
