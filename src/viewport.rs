use std::ops::Range;

/// Selection cursor and scroll window over the process table.
///
/// Every mutation ends in [`Viewport::reconcile`], which restores:
/// `selected < len` (when non-empty), `scroll <= selected < scroll + height`
/// and `scroll + height <= len` whenever the table fills the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    selected: usize,
    scroll: usize,
    len: usize,
    height: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self {
            selected: 0,
            scroll: 0,
            len: 0,
            height: height.max(1),
        }
    }

    /// Cursor position, `None` while the table is empty.
    pub fn selected(&self) -> Option<usize> {
        (self.len > 0).then_some(self.selected)
    }

    /// Rows currently on screen.
    pub fn window(&self) -> Range<usize> {
        let end = (self.scroll + self.height).min(self.len);
        self.scroll.min(end)..end
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.reconcile();
    }

    pub fn move_down(&mut self) {
        self.selected = (self.selected + 1).min(self.last());
        self.reconcile();
    }

    pub fn page_up(&mut self, step: usize) {
        self.selected = self.selected.saturating_sub(step.max(1));
        self.reconcile();
    }

    pub fn page_down(&mut self, step: usize) {
        self.selected = (self.selected + step.max(1)).min(self.last());
        self.reconcile();
    }

    pub fn home(&mut self) {
        self.selected = 0;
        self.reconcile();
    }

    pub fn end(&mut self) {
        self.selected = self.last();
        self.reconcile();
    }

    /// The table was rebuilt with `len` rows.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.reconcile();
    }

    /// The table area now fits `height` rows.
    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.reconcile();
    }

    fn last(&self) -> usize {
        self.len.saturating_sub(1)
    }

    fn reconcile(&mut self) {
        if self.len == 0 {
            self.selected = 0;
            self.scroll = 0;
            return;
        }
        self.selected = self.selected.min(self.last());
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.height {
            self.scroll = self.selected + 1 - self.height;
        }
        self.scroll = self.scroll.min(self.len.saturating_sub(self.height));
    }
}
