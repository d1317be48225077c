use crate::state::TreeNode;
use crate::types::Step;
use crate::ui::palette::StepPalette;
use crate::ui::text::{
    cursor_row_col, display_width, truncate_with_ellipsis, wrap_input_lines,
};
use crate::util::preview;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const MAX_CONTENT_ROWS: usize = 12;
const MAX_OUTPUT_ROWS: usize = 8;
const ARGS_PREVIEW_CHARS: usize = 48;

const BRANCH: &str = "├─ ";
const LAST_BRANCH: &str = "└─ ";
const GUIDE: &str = "│  ";
const BLANK_GUIDE: &str = "   ";
const BODY_INDENT: &str = "  ";

/// Steps in arrival order, followed by the final answer when present.
pub fn timeline_lines(
    steps: &[Step],
    final_answer: Option<&str>,
    palette: &StepPalette,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        lines.push(step_header(step, index, palette, ""));
        push_step_body(&mut lines, step, BODY_INDENT, width);
    }
    push_final_answer(&mut lines, final_answer, width);
    lines
}

/// The call forest drawn with box guides, followed by the final answer when
/// present.
pub fn tree_lines(
    forest: &[TreeNode<'_>],
    final_answer: Option<&str>,
    palette: &StepPalette,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    // Explicit stack of (node, guide above it, branch into it), popped in
    // draw order, so nesting depth never grows the call stack.
    let mut pending: Vec<(&TreeNode<'_>, String, &str)> = forest
        .iter()
        .rev()
        .map(|root| (root, String::new(), ""))
        .collect();
    while let Some((node, guide, branch)) = pending.pop() {
        lines.push(step_header(
            node.step,
            node.index,
            palette,
            &format!("{guide}{branch}"),
        ));

        let nested = if branch.is_empty() {
            guide
        } else if branch == LAST_BRANCH {
            format!("{guide}{BLANK_GUIDE}")
        } else {
            format!("{guide}{GUIDE}")
        };
        push_step_body(&mut lines, node.step, &format!("{nested}{BODY_INDENT}"), width);

        let count = node.children.len();
        for (position, child) in node.children.iter().enumerate().rev() {
            let branch = if position + 1 == count { LAST_BRANCH } else { BRANCH };
            pending.push((child, nested.clone(), branch));
        }
    }
    push_final_answer(&mut lines, final_answer, width);
    lines
}

/// Plain-text header for a step: icon, label, id, then the metadata summary.
pub fn step_header_text(step: &Step, index: usize, palette: &StepPalette) -> String {
    let style = palette.style(step.kind);
    let mut text = format!("{} {} {}", style.icon, style.label, step_tag(step, index));
    let summary = metadata_summary(step);
    if !summary.is_empty() {
        text.push_str("  ");
        text.push_str(&summary);
    }
    text
}

fn step_header(step: &Step, index: usize, palette: &StepPalette, prefix: &str) -> Line<'static> {
    let style = palette.style(step.kind);
    let mut spans = vec![
        Span::styled(prefix.to_string(), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} {}", style.icon, style.label),
            Style::default().fg(style.color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {}", step_tag(step, index)),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let summary = metadata_summary(step);
    if !summary.is_empty() {
        spans.push(Span::styled(
            format!("  {summary}"),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn step_tag(step: &Step, index: usize) -> String {
    match step.id {
        Some(id) => format!("#{id}"),
        None => format!("@{index}"),
    }
}

/// Model, tool, module, timing, tokens, cost and argument preview, joined by " · ".
pub fn metadata_summary(step: &Step) -> String {
    let mut parts = Vec::new();
    if let Some(model) = step.model() {
        parts.push(model.to_string());
    }
    if let Some(tool) = step.tool_name() {
        parts.push(format!("tool {tool}"));
    }
    if let Some(module) = step.module_name() {
        parts.push(format!("module {module}"));
    }
    if let Some(secs) = step.elapsed_secs() {
        parts.push(format!("{secs:.2}s"));
    }
    if let Some(tokens) = step.tokens() {
        parts.push(format!("{tokens} tok"));
    }
    if let Some(cost) = step.cost() {
        parts.push(format!("${cost:.4}"));
    }
    if let Some(args) = step.args().filter(|args| !args.trim().is_empty()) {
        parts.push(format!("args {}", preview(args, ARGS_PREVIEW_CHARS)));
    }
    parts.join(" · ")
}

fn push_step_body(lines: &mut Vec<Line<'static>>, step: &Step, prefix: &str, width: usize) {
    if let Some(content) = step.content.as_deref().filter(|text| !text.trim().is_empty()) {
        push_block(
            lines,
            content,
            prefix,
            width,
            MAX_CONTENT_ROWS,
            Style::default().fg(Color::White),
        );
    }
    if let Some(output) = step.output.as_deref().filter(|text| !text.trim().is_empty()) {
        push_block(
            lines,
            output,
            &format!("{prefix}→ "),
            width,
            MAX_OUTPUT_ROWS,
            Style::default().fg(Color::Gray),
        );
    }
}

fn push_block(
    lines: &mut Vec<Line<'static>>,
    text: &str,
    prefix: &str,
    width: usize,
    max_rows: usize,
    style: Style,
) {
    let available = width.saturating_sub(display_width(prefix)).max(8);
    let rows = wrap_input_lines(text.trim_end(), available);
    let hidden = rows.len().saturating_sub(max_rows);
    for row in rows.into_iter().take(max_rows) {
        lines.push(Line::from(vec![
            Span::styled(prefix.to_string(), Style::default().fg(Color::DarkGray)),
            Span::styled(row, style),
        ]));
    }
    if hidden > 0 {
        lines.push(Line::styled(
            format!("{prefix}… {hidden} more lines"),
            Style::default().fg(Color::DarkGray),
        ));
    }
}

fn push_final_answer(lines: &mut Vec<Line<'static>>, final_answer: Option<&str>, width: usize) {
    let Some(answer) = final_answer else {
        return;
    };
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines.push(Line::styled(
        "━━ Final answer",
        Style::default()
            .fg(Color::LightGreen)
            .add_modifier(Modifier::BOLD),
    ));
    for row in wrap_input_lines(answer.trim_end(), width.max(8)) {
        lines.push(Line::styled(row, Style::default().fg(Color::White)));
    }
}

/// Furthest the body can scroll up inside a viewport of `height` rows.
pub fn max_scroll_offset(total_lines: usize, height: usize) -> usize {
    total_lines.saturating_sub(height)
}

/// Draws pre-wrapped body lines, `from_bottom` rows above the tail.
pub fn render_trajectory(
    frame: &mut Frame<'_>,
    area: Rect,
    lines: Vec<Line<'static>>,
    from_bottom: usize,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let height = area.height as usize;
    let max_offset = max_scroll_offset(lines.len(), height);
    let top = max_offset - from_bottom.min(max_offset);
    let top = u16::try_from(top).unwrap_or(u16::MAX);

    frame.render_widget(Paragraph::new(lines).scroll((top, 0)), area);
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_with_ellipsis(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

pub fn render_notice(frame: &mut Frame<'_>, area: Rect, notice: Option<&str>) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let Some(notice) = notice else {
        return;
    };

    let text = truncate_with_ellipsis(notice, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
        area,
    );
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_input_lines(input, width).len().max(1)
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_input_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let mut rendered = Vec::with_capacity(visible_rows);
    for offset in 0..visible_rows {
        let row_index = window_start + offset;
        let prefix = if row_index == 0 { "> " } else { "  " };
        let line = lines.get(row_index).cloned().unwrap_or_default();
        rendered.push(Line::from(format!("{prefix}{line}")));
    }

    frame.render_widget(
        Paragraph::new(rendered).style(
            Style::default()
                .fg(Color::Gray)
                .bg(Color::Rgb(24, 24, 24)),
        ),
        area,
    );

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}
