//! Prompt pack builder for the external planner.
//!
//! The planner gets one deterministic text document per request. Sections
//! are assembled from a template, then squeezed under a byte budget by
//! dropping the least critical sections first; the zone list goes last
//! because it is the planner's entire action space.

use anyhow::Result;
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::zone::Zone;
use crate::io::planner::PlanRequest;
use crate::step::TaskStep;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        Self { env }
    }

    fn render_planner(&self, request: &PlanRequest) -> Result<String> {
        let zones: Vec<String> = request.zones.iter().map(zone_line).collect();
        let completed: Vec<String> = request.completed.iter().map(step_line).collect();
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            task => request.task.trim(),
            completed => completed,
            zones => zones,
        })?;
        Ok(rendered)
    }
}

/// One zone as a single prompt row.
fn zone_line(zone: &Zone) -> String {
    let label = if zone.label.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", zone.label)
    };
    format!(
        "{} [{}]{} at ({}, {}) {}x{} state={}",
        zone.id,
        zone.kind.as_str(),
        label,
        zone.bounds.x,
        zone.bounds.y,
        zone.bounds.width,
        zone.bounds.height,
        zone.state.as_str()
    )
}

fn step_line(step: &TaskStep) -> String {
    if step.description.is_empty() {
        format!("{} on {}", step.action, step.zone_id)
    } else {
        format!("{} on {}: {}", step.action, step.zone_id, step.description)
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    content: String,
}

/// Split rendered output on `<!-- section:KEY required|droppable -->`
/// markers.
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    use std::sync::LazyLock;
    static SECTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").unwrap()
    });

    let mut sections = Vec::new();
    let matches: Vec<_> = SECTION_RE.captures_iter(rendered).collect();

    for (i, caps) in matches.iter().enumerate() {
        let key = caps.get(1).unwrap().as_str().to_string();
        let required = caps.get(2).unwrap().as_str() == "required";
        let start = caps.get(0).unwrap().end();
        let end = matches
            .get(i + 1)
            .map(|m| m.get(0).unwrap().start())
            .unwrap_or(rendered.len());

        let content = rendered[start..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key,
                required,
                content,
            });
        }
    }

    sections
}

/// Drop droppable sections until the pack fits, then truncate the last one.
///
/// Drop order: history -> zones.
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    for key in ["history", "zones"] {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            let dropped_len = sections[idx].content.len();
            debug!(
                section = key,
                bytes_dropped = dropped_len,
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    if total_len(sections) > budget && !sections.is_empty() {
        let other_len: usize = sections
            .iter()
            .take(sections.len() - 1)
            .map(|s| s.content.len())
            .sum();
        let allowed = budget.saturating_sub(other_len);
        let last = sections.last_mut().unwrap();
        let before_len = last.content.len();
        if last.content.len() > allowed {
            if allowed > 12 {
                last.content.truncate(allowed - 12);
                last.content.push_str("\n[truncated]");
            } else {
                last.content.truncate(allowed);
            }
            debug!(
                section = last.key,
                before_len,
                after_len = last.content.len(),
                "truncated section for budget"
            );
        }
    }
}

fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds planner prompts within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build_planner(&self, request: &PlanRequest) -> PromptPack {
        let engine = PromptEngine::new();
        let rendered = engine
            .render_planner(request)
            .expect("planner template rendering should not fail");

        let mut sections = parse_sections(&rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);

        PromptPack {
            content: render_sections(&sections),
        }
    }
}

/// A rendered prompt ready to feed to the planner command.
#[derive(Debug, Clone)]
pub struct PromptPack {
    content: String,
}

impl PromptPack {
    pub fn render(&self) -> String {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use crate::core::zone::{ZoneKind, ZoneState};
    use crate::test_support::{step, zone};

    fn request() -> PlanRequest {
        let mut completed = step("btn_file", "click");
        completed.description = "open the file menu".to_string();
        PlanRequest {
            task: "save the document".to_string(),
            zones: vec![
                zone("btn_file", 0, 0, 60, 20).with_label("File"),
                zone("menu_save", 0, 20, 120, 20).with_label("Save"),
            ],
            completed: vec![completed],
        }
    }

    #[test]
    fn sections_render_in_stable_order() {
        let pack = PromptBuilder::new(100_000).build_planner(&request());
        let content = pack.render();

        let contract = content.find("### Planner Contract").expect("contract");
        let task = content.find("### Task").expect("task");
        let history = content.find("### Completed Steps").expect("history");
        let zones = content.find("### Zones").expect("zones");
        assert!(contract < task, "contract before task");
        assert!(task < history, "task before history");
        assert!(history < zones, "history before zones");

        assert!(content.contains("<contract>"));
        assert!(content.contains("</contract>"));
        assert!(content.contains("<task>"));
        assert!(content.contains("save the document"));
        assert!(content.contains("- click on btn_file: open the file menu"));
    }

    #[test]
    fn zone_rows_carry_geometry_and_state() {
        let mut z = zone("btn_ok", 100, 100, 200, 100).with_label("OK");
        z.state = ZoneState::Enabled;
        assert_eq!(
            zone_line(&z),
            "btn_ok [button] \"OK\" at (100, 100) 200x100 state=enabled"
        );

        let unlabeled = Zone::new("blob", Rect::new(0, 0, 5, 5), ZoneKind::Unknown);
        assert_eq!(
            zone_line(&unlabeled),
            "blob [unknown] at (0, 0) 5x5 state=enabled"
        );
    }

    #[test]
    fn budget_drops_history_before_zones() {
        let mut big = request();
        big.completed = (0..100).map(|i| step(format!("z{i}"), "click")).collect();

        let full = PromptBuilder::new(100_000).build_planner(&big).render();
        assert!(full.contains("### Completed Steps"));

        let squeezed = PromptBuilder::new(full.len() - 100)
            .build_planner(&big)
            .render();
        assert!(!squeezed.contains("### Completed Steps"), "history dropped");
        assert!(squeezed.contains("### Zones"), "zones survive");
        assert!(squeezed.contains("### Planner Contract"));
        assert!(squeezed.contains("### Task"));
    }

    #[test]
    fn empty_optional_sections_are_omitted() {
        let bare = PlanRequest {
            task: "wait".to_string(),
            zones: Vec::new(),
            completed: Vec::new(),
        };
        let content = PromptBuilder::new(100_000).build_planner(&bare).render();
        assert!(!content.contains("### Completed Steps"));
        assert!(!content.contains("### Zones"));
        assert!(content.contains("### Task"));
    }
}
