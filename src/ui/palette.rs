use crate::types::StepType;
use anyhow::{bail, Result};
use ratatui::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepStyle {
    pub icon: &'static str,
    pub label: &'static str,
    pub color: Color,
}

const fn style(icon: &'static str, label: &'static str, color: Color) -> StepStyle {
    StepStyle { icon, label, color }
}

// Only fills array slots that the coverage check has already proven set.
const UNSET: StepStyle = style("", "", Color::Reset);

pub const STANDARD_STYLES: &[(StepType, StepStyle)] = &[
    (StepType::Thinking, style("◆", "Thinking", Color::Magenta)),
    (StepType::CodeExecution, style("▶", "Code", Color::Green)),
    (StepType::ToolCallStart, style("⚙", "Tool call", Color::Yellow)),
    (StepType::ToolCallEnd, style("✓", "Tool result", Color::Yellow)),
    (StepType::ModuleStart, style("▣", "Module", Color::Blue)),
    (StepType::ModuleEnd, style("□", "Module done", Color::Blue)),
    (StepType::LmCallStart, style("◇", "LM call", Color::Cyan)),
    (StepType::LmCallEnd, style("◈", "LM decision", Color::Cyan)),
    (StepType::LlmCall, style("◇", "LLM call", Color::Cyan)),
    (StepType::SubLlmCall, style("↳", "Sub-LLM call", Color::LightCyan)),
    (StepType::Complete, style("●", "Complete", Color::LightGreen)),
    (StepType::Error, style("✗", "Error", Color::Red)),
];

/// Icon, label and color for every step type.
///
/// Construction fails unless every `StepType` has an entry, so lookup is a
/// plain index with no default.
#[derive(Clone, Debug)]
pub struct StepPalette {
    styles: [StepStyle; StepType::ALL.len()],
}

impl StepPalette {
    pub fn standard() -> Result<Self> {
        Self::from_entries(STANDARD_STYLES)
    }

    /// Later entries for the same step type replace earlier ones.
    pub fn from_entries(entries: &[(StepType, StepStyle)]) -> Result<Self> {
        let mut slots: [Option<StepStyle>; StepType::ALL.len()] = [None; StepType::ALL.len()];
        for (kind, style) in entries {
            slots[*kind as usize] = Some(*style);
        }

        let missing: Vec<&str> = StepType::ALL
            .iter()
            .filter(|kind| slots[**kind as usize].is_none())
            .map(|kind| kind.wire_name())
            .collect();
        if !missing.is_empty() {
            bail!("step palette has no entry for: {}", missing.join(", "));
        }

        let styles = slots.map(|slot| slot.unwrap_or(UNSET));
        Ok(Self { styles })
    }

    pub fn style(&self, kind: StepType) -> StepStyle {
        self.styles[kind as usize]
    }
}
