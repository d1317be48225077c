use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Cuts `text` to at most `max_width` columns, ending in "..." when cut.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let max_width = max_width.max(1);
    if display_width(text) <= max_width {
        return text.to_string();
    }
    if max_width < 4 {
        return take_columns(text, max_width);
    }
    let mut out = take_columns(text, max_width - 3);
    out.push_str("...");
    out
}

fn take_columns(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Hard-wraps input text at `width` columns, honoring explicit newlines.
pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut current_width = 0usize;
    for ch in input.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                lines.push(String::new());
                current_width = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if current_width + ch_width > width && current_width > 0 {
                    lines.push(String::new());
                    current_width = 0;
                }
                if let Some(line) = lines.last_mut() {
                    line.push(ch);
                }
                current_width += ch_width;
            }
        }
    }
    lines
}

/// Row and column of the cursor inside `wrap_input_lines(input, width)`.
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut cursor_byte = cursor_byte.min(input.len());
    while cursor_byte > 0 && !input.is_char_boundary(cursor_byte) {
        cursor_byte -= 1;
    }

    let (mut row, mut col) = (0usize, 0usize);
    for ch in input[..cursor_byte].chars() {
        match ch {
            '\r' => {}
            '\n' => {
                row += 1;
                col = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if col + ch_width > width && col > 0 {
                    row += 1;
                    col = 0;
                }
                col += ch_width;
            }
        }
    }
    if col >= width {
        row += 1;
        col = 0;
    }
    (row, col)
}
