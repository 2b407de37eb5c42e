// View scroller
// Keeps the message viewport following the most recent message. The list
// selection drives ratatui's scroll offset; it is drawn without highlight.

use log::debug;
use ratatui::widgets::ListState;

#[derive(Debug, Default)]
pub struct ViewScroller {
    /// `None` until the list has been painted once
    state: Option<ListState>,
    target: Option<usize>,
    rendered_count: usize,
}

impl ViewScroller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook the scroller up to the rendered list. Called on first paint.
    pub fn attach(&mut self) {
        if self.state.is_none() {
            debug!("Scroller attached with {} messages", self.rendered_count);
            self.state = Some(ListState::default());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state.is_some()
    }

    /// Record the number of rendered messages, scrolling when it changed
    pub fn on_list_changed(&mut self, count: usize) {
        if count != self.rendered_count {
            self.rendered_count = count;
            self.scroll_to_latest();
        }
    }

    /// Bring the last rendered message into view
    pub fn scroll_to_latest(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if self.rendered_count == 0 {
            self.target = None;
            state.select(None);
            return;
        }

        let last = self.rendered_count - 1;
        self.target = Some(last);
        if state.selected().map_or(true, |s| s > last) {
            // Start the motion from the top on first content
            state.select(Some(0));
        }
    }

    /// Advance one animation step toward the target.
    ///
    /// Moves a quarter of the remaining distance (at least one row) and
    /// returns whether the selection changed.
    pub fn tick(&mut self) -> bool {
        let (Some(state), Some(target)) = (self.state.as_mut(), self.target) else {
            return false;
        };
        let current = state.selected().unwrap_or(0);
        if current == target {
            return false;
        }

        let distance = current.abs_diff(target);
        let step = (distance / 4).max(1);
        let next = if current < target { current + step } else { current - step };
        state.select(Some(next));
        true
    }

    /// Whether the viewport has reached the latest message
    pub fn is_settled(&self) -> bool {
        match (&self.state, self.target) {
            (Some(state), Some(target)) => state.selected() == Some(target),
            _ => true,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.as_ref().and_then(|s| s.selected())
    }

    pub fn state_mut(&mut self) -> Option<&mut ListState> {
        self.state.as_mut()
    }
}
