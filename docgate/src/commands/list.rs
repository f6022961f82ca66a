//! `docgate list`: show the checklist without running it.

use super::{ListArgs, load_config};
use anyhow::Result;
use colored::Colorize;
use docgate_common::{Checklist, Requirement, sphinx_checklist};

pub fn run(args: &ListArgs) -> Result<u8> {
    let config = load_config(&args.project, true)?;
    let checklist = sphinx_checklist(&config).filter_groups(&args.groups);

    if args.json {
        let checks: Vec<_> = checklist.iter().collect();
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        print!("{}", render(&checklist));
    }
    Ok(0)
}

fn render(checklist: &Checklist) -> String {
    let mut out = String::new();
    for group in checklist.groups() {
        out.push_str(&format!("{}\n", group.bold()));
        for check in checklist.iter().filter(|c| c.group == group) {
            let mut tags = Vec::new();
            match check.requirement {
                Requirement::Optional => tags.push("optional".yellow().to_string()),
                Requirement::WhenPresent => tags.push("if present".cyan().to_string()),
                Requirement::Required => {}
            }
            if check.disabled.is_some() {
                tags.push("disabled".dimmed().to_string());
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", tags.join(", "))
            };
            out.push_str(&format!("  {}{tags}  {}\n", check.id, check.title));
            out.push_str(&format!("      {}\n", check.expectation.describe().dimmed()));
        }
        out.push('\n');
    }
    out.push_str(&format!("{} checks\n", checklist.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_common::GateConfig;

    #[test]
    fn test_render_marks_optional_and_disabled() {
        colored::control::set_override(false);
        let text = render(&sphinx_checklist(&GateConfig::default()));
        assert!(text.contains("  static.images [optional]  images are non-empty files"));
        assert!(text.contains("  build.builder.latex [disabled]"));
        assert!(text.contains("  search.form [if present]  search page has a query form"));
        assert!(text.contains("  search.page  search page exists"));
        assert!(text.contains("      <docs>/api.rst contains /API Reference/"));
    }
}
