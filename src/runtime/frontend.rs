use super::mode::RuntimeMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp(usize),
    PageDown(usize),
    Home,
    End,
}

impl ScrollAction {
    /// New distance from the bottom of the body, clamped to `max_offset`.
    pub fn apply(self, from_bottom: usize, max_offset: usize) -> usize {
        let next = match self {
            Self::LineUp => from_bottom.saturating_add(1),
            Self::LineDown => from_bottom.saturating_sub(1),
            Self::PageUp(rows) => from_bottom.saturating_add(rows.max(1)),
            Self::PageDown(rows) => from_bottom.saturating_sub(rows.max(1)),
            Self::Home => max_offset,
            Self::End => 0,
        };
        next.min(max_offset)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserInputEvent {
    Text(String),
    Interrupt,
    /// `max_offset` is how far the last rendered body could scroll up.
    Scroll {
        action: ScrollAction,
        max_offset: usize,
    },
    ToggleView,
}

pub trait FrontendAdapter<M: RuntimeMode> {
    fn poll_user_input(&mut self, mode: &M) -> Option<UserInputEvent>;
    fn render(&mut self, mode: &M);
    fn should_quit(&self) -> bool;
}
