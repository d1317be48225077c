use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub trajectory: Rect,
    pub notice: Rect,
    pub input: Rect,
}

pub fn split_screen_layout(area: Rect, input_rows: u16) -> ScreenLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows.max(1)),
        ])
        .split(area);

    ScreenLayout {
        header: chunks[0],
        trajectory: chunks[1],
        notice: chunks[2],
        input: chunks[3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_splits_into_four_panes() {
        let area = Rect::new(0, 0, 80, 20);
        let panes = split_screen_layout(area, 3);

        assert_eq!(panes.header.height, 1);
        assert_eq!(panes.trajectory.height, 15);
        assert_eq!(panes.notice.height, 1);
        assert_eq!(panes.input.height, 3);
        assert_eq!(panes.trajectory.y, 1);
        assert_eq!(panes.notice.y, 16);
        assert_eq!(panes.input.y, 17);
    }

    #[test]
    fn zero_input_rows_still_reserve_one_line() {
        let panes = split_screen_layout(Rect::new(0, 0, 40, 10), 0);
        assert_eq!(panes.input.height, 1);
        assert_eq!(panes.trajectory.height, 7);
    }
}
