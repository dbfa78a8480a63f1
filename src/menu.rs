//! Ordered, indexed, doubly-linked list used by every browsable view.
//!
//! A `Menu` keeps three cursors besides its entries: the *selected* entry
//! (the cursor), the *active* entry (the one currently playing) and the
//! *top* entry (the first visible row). Every entry carries a 0-based index
//! that is kept contiguous across inserts, removals and moves so viewport
//! math never needs to walk the list.
//!
//! The menu performs no locking of its own; the owning view wraps it in a
//! mutex.

/// Handle to an entry. Stale handles (of removed entries) are detected by
/// their generation and treated as absent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    slot: usize,
    generation: u64,
}

/// How far to scroll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scroll {
    Line,
    HalfPage,
    Page,
}

/// Result of a search.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A match was found and selected. `wrapped` is set when the scan passed
    /// the end (or the beginning, searching backward) of the menu.
    Found { id: EntryId, wrapped: bool },
    NotFound,
}

#[derive(Debug)]
struct Node<T> {
    data: T,
    index: usize,
    prev: Option<EntryId>,
    next: Option<EntryId>,
    generation: u64,
}

#[derive(Debug)]
pub struct Menu<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    generation: u64,
    first: Option<EntryId>,
    last: Option<EntryId>,
    len: usize,
    top: Option<EntryId>,
    selected: Option<EntryId>,
    active: Option<EntryId>,
    rows: usize,
}

impl<T> Default for Menu<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Menu<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            generation: 0,
            first: None,
            last: None,
            len: 0,
            top: None,
            selected: None,
            active: None,
            rows: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, id: EntryId) -> Option<&Node<T>> {
        self.slots
            .get(id.slot)
            .and_then(Option::as_ref)
            .filter(|n| n.generation == id.generation)
    }

    fn node_mut(&mut self, id: EntryId) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(id.slot)
            .and_then(Option::as_mut)
            .filter(|n| n.generation == id.generation)
    }

    // Only called with handles already known to be live.
    fn live(&mut self, id: EntryId) -> &mut Node<T> {
        self.node_mut(id).expect("menu entry handle is live")
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.node(id).is_some()
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.node(id).map(|n| &n.data)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut T> {
        self.node_mut(id).map(|n| &mut n.data)
    }

    pub fn index(&self, id: EntryId) -> Option<usize> {
        self.node(id).map(|n| n.index)
    }

    pub fn first(&self) -> Option<EntryId> {
        self.first
    }

    pub fn last(&self) -> Option<EntryId> {
        self.last
    }

    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.node(id).and_then(|n| n.next)
    }

    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.node(id).and_then(|n| n.prev)
    }

    pub fn top(&self) -> Option<EntryId> {
        self.top
    }

    pub fn selected(&self) -> Option<EntryId> {
        self.selected
    }

    pub fn active(&self) -> Option<EntryId> {
        self.active
    }

    /// Entry at position `index`, walking from whichever end is closer.
    pub fn nth(&self, index: usize) -> Option<EntryId> {
        if index >= self.len {
            return None;
        }
        if index < self.len / 2 {
            let mut cur = self.first;
            while let Some(id) = cur {
                if self.index(id) == Some(index) {
                    return Some(id);
                }
                cur = self.next(id);
            }
        } else {
            let mut cur = self.last;
            while let Some(id) = cur {
                if self.index(id) == Some(index) {
                    return Some(id);
                }
                cur = self.prev(id);
            }
        }
        None
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            menu: self,
            cur: self.first,
        }
    }

    fn alloc(&mut self, data: T, index: usize) -> EntryId {
        self.generation += 1;
        let node = Node {
            data,
            index,
            prev: None,
            next: None,
            generation: self.generation,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        EntryId {
            slot,
            generation: self.generation,
        }
    }

    /// Add `delta` (±1) to the index of `from` and every entry after it.
    fn shift_from(&mut self, from: Option<EntryId>, grow: bool) {
        let mut cur = from;
        while let Some(id) = cur {
            let node = self.live(id);
            if grow {
                node.index += 1;
            } else {
                node.index -= 1;
            }
            cur = node.next;
        }
    }

    fn inserted(&mut self, id: EntryId) {
        self.len += 1;
        if self.len == 1 {
            self.top = Some(id);
            self.selected = Some(id);
        }
    }

    pub fn append(&mut self, data: T) -> EntryId {
        match self.last {
            Some(last) => self.insert_after(last, data),
            None => {
                let id = self.alloc(data, 0);
                self.first = Some(id);
                self.last = Some(id);
                self.inserted(id);
                id
            }
        }
    }

    /// Insert before `anchor`; with a stale anchor the data is appended.
    pub fn insert_before(&mut self, anchor: EntryId, data: T) -> EntryId {
        let Some(anchor_node) = self.node(anchor) else {
            return self.append(data);
        };
        let index = anchor_node.index;
        let prev = anchor_node.prev;

        self.shift_from(Some(anchor), true);
        let id = self.alloc(data, index);
        {
            let node = self.live(id);
            node.prev = prev;
            node.next = Some(anchor);
        }
        self.live(anchor).prev = Some(id);
        match prev {
            Some(p) => self.live(p).next = Some(id),
            None => self.first = Some(id),
        }
        self.inserted(id);
        id
    }

    /// Insert after `anchor`; with a stale anchor the data is appended.
    pub fn insert_after(&mut self, anchor: EntryId, data: T) -> EntryId {
        let Some(anchor_node) = self.node(anchor) else {
            return self.append(data);
        };
        let index = anchor_node.index + 1;
        let next = anchor_node.next;

        self.shift_from(next, true);
        let id = self.alloc(data, index);
        {
            let node = self.live(id);
            node.prev = Some(anchor);
            node.next = next;
        }
        self.live(anchor).next = Some(id);
        match next {
            Some(n) => self.live(n).prev = Some(id),
            None => self.last = Some(id),
        }
        self.inserted(id);
        id
    }

    fn unlink(&mut self, id: EntryId) -> (Option<EntryId>, Option<EntryId>) {
        let node = self.live(id);
        let (prev, next) = (node.prev, node.next);
        node.prev = None;
        node.next = None;
        match prev {
            Some(p) => self.live(p).next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.live(n).prev = prev,
            None => self.last = prev,
        }
        (prev, next)
    }

    /// Remove an entry and hand back its data.
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        self.node(id)?;
        let (prev, next) = self.unlink(id);
        self.shift_from(next, false);
        self.len -= 1;

        if self.active == Some(id) {
            self.active = None;
        }
        if self.selected == Some(id) {
            self.selected = next.or(prev);
        }
        if self.top == Some(id) {
            self.top = next.or(prev);
        }

        let node = self.slots[id.slot].take().expect("menu entry handle is live");
        self.free.push(id.slot);
        Some(node.data)
    }

    /// Remove every entry, clearing all cursors.
    pub fn clear(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.first;
        while let Some(id) = cur {
            cur = self.next(id);
            if let Some(node) = self.slots[id.slot].take() {
                out.push(node.data);
            }
        }
        self.slots.clear();
        self.free.clear();
        self.first = None;
        self.last = None;
        self.len = 0;
        self.top = None;
        self.selected = None;
        self.active = None;
        out
    }

    /// Move `id` to just before `anchor`, renumbering the entries between
    /// the old and the new position.
    pub fn move_before(&mut self, anchor: EntryId, id: EntryId) {
        if anchor == id {
            return;
        }
        let (Some(old), Some(anchor_idx)) = (self.index(id), self.index(anchor)) else {
            return;
        };
        if old + 1 == anchor_idx {
            return;
        }

        let (_, old_next) = self.unlink(id);
        let anchor_prev = self.live(anchor).prev;
        {
            let node = self.live(id);
            node.prev = anchor_prev;
            node.next = Some(anchor);
        }
        self.live(anchor).prev = Some(id);
        match anchor_prev {
            Some(p) => self.live(p).next = Some(id),
            None => self.first = Some(id),
        }

        // Moving up: `id` now sits at `anchor_idx` and everything down to its
        // old slot shifts by one. Moving down: everything after its old slot
        // up to and including `id` itself shifts back.
        let (start, mut index, count) = if anchor_idx < old {
            (Some(id), anchor_idx, old - anchor_idx + 1)
        } else {
            (old_next, old, anchor_idx - old)
        };
        let mut cur = start;
        for _ in 0..count {
            let Some(cid) = cur else { break };
            let node = self.live(cid);
            node.index = index;
            index += 1;
            cur = node.next;
        }
    }

    /// Mark `id` as the playing entry, or clear the mark.
    pub fn set_active(&mut self, id: Option<EntryId>) {
        self.active = id.filter(|&i| self.contains(i));
    }

    pub fn select(&mut self, id: EntryId) {
        if self.contains(id) {
            self.selected = Some(id);
        }
    }

    pub fn select_first(&mut self) {
        self.selected = self.first;
    }

    pub fn select_last(&mut self) {
        self.selected = self.last;
    }

    pub fn select_next(&mut self) {
        if let Some(next) = self.selected.and_then(|s| self.next(s)) {
            self.selected = Some(next);
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(prev) = self.selected.and_then(|s| self.prev(s)) {
            self.selected = Some(prev);
        }
    }

    pub fn select_active(&mut self) {
        if let Some(active) = self.active {
            self.selected = Some(active);
        }
    }

    /// Scan forward from the selected entry for the next match, wrapping
    /// around once. The selected entry itself is tried last.
    pub fn search_next(&mut self, mut matches: impl FnMut(&T) -> bool) -> SearchOutcome {
        self.search(true, &mut matches)
    }

    /// Like [`Menu::search_next`], scanning backward.
    pub fn search_prev(&mut self, mut matches: impl FnMut(&T) -> bool) -> SearchOutcome {
        self.search(false, &mut matches)
    }

    fn search(&mut self, forward: bool, matches: &mut dyn FnMut(&T) -> bool) -> SearchOutcome {
        let Some(start) = self.selected else {
            return SearchOutcome::NotFound;
        };

        let step = |menu: &Self, id: EntryId| {
            if forward { menu.next(id) } else { menu.prev(id) }
        };
        let restart = if forward { self.first } else { self.last };

        let mut wrapped = false;
        let mut cur = step(self, start);
        loop {
            let id = match cur {
                Some(id) => id,
                None => {
                    wrapped = true;
                    match restart {
                        Some(id) => id,
                        None => return SearchOutcome::NotFound,
                    }
                }
            };
            if let Some(data) = self.get(id) {
                if matches(data) {
                    self.selected = Some(id);
                    return SearchOutcome::Found { id, wrapped };
                }
            }
            if id == start {
                return SearchOutcome::NotFound;
            }
            cur = step(self, id);
        }
    }

    /// Number of visible rows used for page-sized scrolling.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.rows = rows.max(1);
    }

    fn amount(&self, scroll: Scroll) -> usize {
        match scroll {
            Scroll::Line => 1,
            Scroll::HalfPage => (self.rows / 2).max(1),
            Scroll::Page => self.rows,
        }
    }

    fn max_top(&self) -> usize {
        self.len.saturating_sub(self.rows)
    }

    pub fn scroll_down(&mut self, scroll: Scroll) {
        let Some(top) = self.top.and_then(|t| self.index(t)) else {
            return;
        };
        let target = (top + self.amount(scroll)).min(self.max_top()).max(top);
        self.set_top_index(target);
    }

    pub fn scroll_up(&mut self, scroll: Scroll) {
        let Some(top) = self.top.and_then(|t| self.index(t)) else {
            return;
        };
        let target = top.saturating_sub(self.amount(scroll));
        self.set_top_index(target);
    }

    /// Move `top` and snap the selection back into the window.
    fn set_top_index(&mut self, top: usize) {
        self.top = self.nth(top);
        let Some(sel) = self.selected.and_then(|s| self.index(s)) else {
            return;
        };
        if sel < top {
            self.selected = self.top;
        } else if sel >= top + self.rows {
            let bottom = (top + self.rows - 1).min(self.len.saturating_sub(1));
            self.selected = self.nth(bottom);
        }
    }

    /// Fix up `top` for a window of `rows` rows and return the visible
    /// entries in order.
    pub fn render(&mut self, rows: usize) -> Vec<(EntryId, &T)> {
        self.set_rows(rows);
        let rows = self.rows;

        if let (Some(top), Some(sel)) = (
            self.top.and_then(|t| self.index(t)),
            self.selected.and_then(|s| self.index(s)),
        ) {
            let mut top = top;
            if sel < top {
                top = sel;
            } else if sel >= top + rows {
                top = sel + 1 - rows;
            }
            if top + rows > self.len {
                top = self.len.saturating_sub(rows);
            }
            self.top = self.nth(top);
        } else if self.top.is_none() {
            self.top = self.first;
        }

        let mut out = Vec::with_capacity(rows.min(self.len));
        let mut cur = self.top;
        while let Some(id) = cur {
            if out.len() == rows {
                break;
            }
            let node = self.node(id).expect("menu entry handle is live");
            out.push((id, &node.data));
            cur = node.next;
        }
        out
    }
}

pub struct Iter<'a, T> {
    menu: &'a Menu<T>,
    cur: Option<EntryId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (EntryId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self.menu.node(id)?;
        self.cur = node.next;
        Some((id, &node.data))
    }
}
