use tracing::{debug, trace, warn};

use crate::core::{TimeBarGeometry, TimeRange, Viewport};
use crate::interaction::timeline_geometry::{LabelMeasure, TimelineLayout, TimelineTuning};
use crate::interaction::{
    BubbleFade, CursorHint, EventOutcome, HandleSide, InteractionState, LabelEditRequest,
};
use crate::selection::ids::display_label;
use crate::selection::{
    SelectionId, SelectionSet, clamp_left_handle, clamp_new_selection_time, clamp_right_handle,
};

/// Inputs a timeline event needs besides the selections.
#[derive(Clone, Copy)]
pub struct TimelineFrame<'a> {
    /// Normalized sample times of the current dataset.
    pub times: &'a [f64],
    pub viewport: Viewport,
    pub measure: &'a dyn LabelMeasure,
}

/// Single-pointer gesture controller for the timeline track.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineController {
    tuning: TimelineTuning,
    split_guard: bool,
    state: InteractionState,
    hovered_handle: Option<(SelectionId, HandleSide)>,
    delete_target: Option<SelectionId>,
    /// Set once a handle drag has written a new edge.
    handle_moved: bool,
    bubbles: BubbleFade,
}

impl Default for TimelineController {
    fn default() -> Self {
        Self::new(TimelineTuning::default(), true)
    }
}

impl TimelineController {
    /// `split_guard` refuses splits that would leave a half without
    /// interior samples.
    #[must_use]
    pub fn new(tuning: TimelineTuning, split_guard: bool) -> Self {
        Self {
            tuning,
            split_guard,
            state: InteractionState::Idle,
            hovered_handle: None,
            delete_target: None,
            handle_moved: false,
            bubbles: BubbleFade::default(),
        }
    }

    #[must_use]
    pub fn tuning(&self) -> TimelineTuning {
        self.tuning
    }

    pub fn set_tuning(&mut self, tuning: TimelineTuning, split_guard: bool) {
        self.tuning = tuning;
        self.split_guard = split_guard;
    }

    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    #[must_use]
    pub fn hovered_handle(&self) -> Option<(SelectionId, HandleSide)> {
        self.hovered_handle
    }

    /// Selection whose control bubbles should be shown.
    #[must_use]
    pub fn delete_target(&self) -> Option<SelectionId> {
        self.delete_target
    }

    #[must_use]
    pub fn bubble_alpha(&self, id: SelectionId) -> f64 {
        self.bubbles.alpha(id)
    }

    /// New-selection candidate while one is being dragged out.
    #[must_use]
    pub fn candidate(&self) -> Option<TimeRange> {
        match self.state {
            InteractionState::CreatingSelection { candidate, .. } => candidate,
            _ => None,
        }
    }

    #[must_use]
    pub fn split_preview(&self) -> Option<(SelectionId, f64)> {
        match self.state {
            InteractionState::Splitting { id, preview } => preview.map(|t| (id, t)),
            _ => None,
        }
    }

    /// Merge envelope and the parts of it no selection covers yet.
    #[must_use]
    pub fn merge_preview(&self, selections: &SelectionSet) -> Option<(TimeRange, Vec<TimeRange>)> {
        match self.state {
            InteractionState::DraggingMerge {
                anchor_t,
                current_t,
                ..
            } => {
                let envelope = TimeRange::new(anchor_t, current_t);
                Some((envelope, selections.uncovered_gaps(envelope.t0, envelope.t1)))
            }
            _ => None,
        }
    }

    /// Advances the bubble fade one step. Returns `true` while animating.
    pub fn tick_bubbles(&mut self, selections: &SelectionSet) -> bool {
        self.drop_stale(selections);
        self.bubbles
            .tick(selections, self.delete_target, self.tuning.fade_rate)
    }

    /// Drops any gesture and hover state, e.g. before blocking I/O.
    /// Returns `true` when a handle drag had already moved an edge; those
    /// writes stay in place.
    pub fn cancel_gesture(&mut self) -> bool {
        if !self.state.is_idle() {
            debug!(state = ?self.state, "timeline gesture cancelled");
        }
        self.state = InteractionState::Idle;
        self.clear_hover();
        std::mem::take(&mut self.handle_moved)
    }

    /// Forgets everything, including bubble alphas. Used when the dataset or
    /// selection set is replaced.
    pub fn reset(&mut self) {
        self.cancel_gesture();
        self.bubbles.clear();
    }

    fn clear_hover(&mut self) {
        self.hovered_handle = None;
        self.delete_target = None;
    }

    fn drop_stale(&mut self, selections: &SelectionSet) {
        if let Some(id) = self.state.target().filter(|id| !selections.contains(*id)) {
            warn!(%id, state = ?self.state, "timeline gesture refers to a removed selection");
            self.state = InteractionState::Idle;
            self.handle_moved = false;
        }
        if self.hovered_handle.is_some_and(|(id, _)| !selections.contains(id)) {
            self.hovered_handle = None;
        }
        if self.delete_target.is_some_and(|id| !selections.contains(id)) {
            self.delete_target = None;
        }
    }

    fn layout(&self, frame: &TimelineFrame<'_>) -> Option<TimelineLayout> {
        let bar = TimeBarGeometry::from_times(frame.viewport, self.tuning.bar, frame.times)?;
        Some(TimelineLayout::new(bar, &self.tuning))
    }

    fn label_text(selections: &SelectionSet, id: SelectionId) -> String {
        selections
            .get(id)
            .map(|sel| sel.label.clone().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn pointer_down(
        &mut self,
        selections: &mut SelectionSet,
        frame: &TimelineFrame<'_>,
        x: f64,
        y: f64,
    ) -> EventOutcome {
        self.drop_stale(selections);
        let Some(layout) = self.layout(frame) else {
            return EventOutcome::none();
        };

        match self.state {
            InteractionState::EditingLabel { .. } => return EventOutcome::none(),
            InteractionState::Splitting { id, .. } => return self.finish_split(selections, frame, &layout, id, x),
            _ => {}
        }

        let threshold = self.tuning.visible_alpha;
        let ordered = selections.sorted_by_t0();

        for (pos, (id, sel)) in ordered.iter().enumerate() {
            if !self.bubbles.is_visible(*id, threshold) {
                continue;
            }
            let text = display_label(sel, pos);
            let rect = layout.label_rect(sel, &text, frame.measure);
            if rect.contains(x, y) {
                let id = *id;
                self.state = InteractionState::EditingLabel { id };
                self.hovered_handle = None;
                self.delete_target = Some(id);
                self.bubbles.show(id);
                debug!(%id, "label edit started");
                let mut outcome = EventOutcome::timeline(CursorHint::Default);
                outcome.label_edit = Some(LabelEditRequest {
                    id,
                    rect,
                    initial_text: Self::label_text(selections, id),
                });
                return outcome;
            }
        }

        for (id, sel) in &ordered {
            if self.bubbles.is_visible(*id, threshold) && layout.cluster(sel).hits_split(x, y) {
                self.state = InteractionState::Splitting {
                    id: *id,
                    preview: None,
                };
                self.delete_target = Some(*id);
                debug!(%id, "split mode entered");
                return EventOutcome::timeline(CursorHint::Split);
            }
        }

        if let Some(target) = self.delete_target {
            let hit = selections
                .get(target)
                .is_some_and(|sel| layout.cluster(sel).hits_delete(x, y));
            if hit {
                selections.delete(target);
                self.state = InteractionState::Idle;
                self.clear_hover();
                return EventOutcome::changed(CursorHint::Default);
            }
        }

        self.state = InteractionState::Idle;

        if let Some((id, side)) = self.handle_at(selections, &layout, x, y) {
            self.state = InteractionState::DraggingHandle { id, side };
            self.delete_target = None;
            self.handle_moved = false;
            trace!(%id, ?side, "handle drag started");
            return EventOutcome::timeline(CursorHint::Grabbing);
        }

        if layout.new_selection_zone_contains(x, y) {
            let t = layout.bar.pixel_to_time(x);
            if let Some(source) = selections.find_at(t) {
                self.state = InteractionState::DraggingMerge {
                    source,
                    anchor_t: t,
                    current_t: t,
                };
                self.delete_target = None;
                trace!(%source, t, "merge drag started");
                return EventOutcome::timeline(CursorHint::Move);
            }
            self.state = InteractionState::CreatingSelection {
                anchor_px: layout.bar.clamp_pixel(x),
                candidate: None,
            };
            self.delete_target = None;
            trace!(x, "new selection drag started");
            return EventOutcome::timeline(CursorHint::Crosshair);
        }

        self.delete_target = None;
        EventOutcome::timeline(CursorHint::Default)
    }

    /// The hovered handle wins when it still contains the point, otherwise
    /// the first handle hit in storage order.
    fn handle_at(
        &self,
        selections: &SelectionSet,
        layout: &TimelineLayout,
        x: f64,
        y: f64,
    ) -> Option<(SelectionId, HandleSide)> {
        let line = |id: SelectionId, side: HandleSide| {
            selections.get(id).map(|sel| {
                let (x0, x1) = layout.selection_pixels(sel);
                match side {
                    HandleSide::Left => x0,
                    HandleSide::Right => x1,
                }
            })
        };
        if let Some((id, side)) = self.hovered_handle {
            if line(id, side).is_some_and(|xl| layout.hits_handle(x, y, xl, side)) {
                return Some((id, side));
            }
        }
        selections.iter().find_map(|(id, sel)| {
            let (x0, x1) = layout.selection_pixels(sel);
            if layout.hits_handle(x, y, x0, HandleSide::Left) {
                Some((id, HandleSide::Left))
            } else if layout.hits_handle(x, y, x1, HandleSide::Right) {
                Some((id, HandleSide::Right))
            } else {
                None
            }
        })
    }

    fn finish_split(
        &mut self,
        selections: &mut SelectionSet,
        frame: &TimelineFrame<'_>,
        layout: &TimelineLayout,
        id: SelectionId,
        x: f64,
    ) -> EventOutcome {
        self.state = InteractionState::Idle;
        let Some(sel) = selections.get(id) else {
            return EventOutcome::timeline(CursorHint::Default);
        };
        let (x0, x1) = layout.selection_pixels(sel);
        if !(x > x0 && x < x1) {
            debug!(%id, "split mode cancelled");
            return EventOutcome::timeline(CursorHint::Default);
        }
        let t = layout.bar.pixel_to_time(x);
        let guard = self.split_guard.then_some(frame.times);
        match selections.split(id, t, guard) {
            Some(_) => {
                self.clear_hover();
                EventOutcome::changed(CursorHint::Default)
            }
            None => {
                debug!(%id, t, "split refused");
                EventOutcome::timeline(CursorHint::Default)
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        selections: &mut SelectionSet,
        frame: &TimelineFrame<'_>,
        x: f64,
        y: f64,
    ) -> EventOutcome {
        self.drop_stale(selections);
        let Some(layout) = self.layout(frame) else {
            return EventOutcome::none();
        };
        let clamped_x = layout.bar.clamp_pixel(x);

        match self.state {
            InteractionState::EditingLabel { id } => {
                self.hovered_handle = None;
                self.delete_target = Some(id);
                EventOutcome::timeline(CursorHint::Default)
            }
            InteractionState::Idle => self.hover(selections, frame, &layout, x, y),
            InteractionState::Splitting { id, .. } => {
                let preview = selections
                    .get(id)
                    .map(|sel| layout.bar.pixel_to_time(x).clamp(sel.t0, sel.t1));
                self.state = InteractionState::Splitting { id, preview };
                self.delete_target = Some(id);
                EventOutcome::timeline(CursorHint::Split)
            }
            InteractionState::DraggingHandle { id, side } => {
                self.clear_hover();
                let t = layout.bar.pixel_to_time(clamped_x);
                let before = selections.get(id).map(|sel| (sel.t0, sel.t1));
                let written = match side {
                    HandleSide::Left => {
                        let t0 = clamp_left_handle(selections, id, t);
                        selections.set_t0(id, t0)
                    }
                    HandleSide::Right => {
                        let t1 = clamp_right_handle(selections, id, t);
                        selections.set_t1(id, t1)
                    }
                };
                let after = selections.get(id).map(|sel| (sel.t0, sel.t1));
                if written && after != before {
                    self.handle_moved = true;
                }
                EventOutcome::both(CursorHint::Grabbing)
            }
            InteractionState::DraggingMerge {
                source, anchor_t, ..
            } => {
                self.clear_hover();
                self.state = InteractionState::DraggingMerge {
                    source,
                    anchor_t,
                    current_t: layout.bar.pixel_to_time(clamped_x),
                };
                EventOutcome::timeline(CursorHint::Move)
            }
            InteractionState::CreatingSelection { anchor_px, .. } => {
                self.clear_hover();
                let anchor = layout.bar.pixel_to_time(anchor_px);
                let current = layout.bar.pixel_to_time(clamped_x);
                let current = clamp_new_selection_time(selections, anchor, current);
                self.state = InteractionState::CreatingSelection {
                    anchor_px,
                    candidate: Some(TimeRange::new(anchor, current)),
                };
                EventOutcome::both(CursorHint::Crosshair)
            }
        }
    }

    /// Idle hover: the nearest handle within its region wins, otherwise the
    /// selection under the pointer by body, label box or delete bubble.
    fn hover(
        &mut self,
        selections: &SelectionSet,
        frame: &TimelineFrame<'_>,
        layout: &TimelineLayout,
        raw_x: f64,
        y: f64,
    ) -> EventOutcome {
        let x = layout.bar.clamp_pixel(raw_x);
        let side_len = layout.handles.side;
        let mut best: Option<(f64, SelectionId, HandleSide)> = None;
        let mut hovered: Option<SelectionId> = None;

        for (pos, (id, sel)) in selections.sorted_by_t0().into_iter().enumerate() {
            let (x0, x1) = layout.selection_pixels(sel);
            // Narrow selections: a handle tip reaching past the opposite edge
            // only counts from its own side.
            let allow_left = !(x0 + side_len > x1 && raw_x > x1);
            let allow_right = !(x1 - side_len < x0 && raw_x < x0);

            let candidates = [
                (allow_left, x0, HandleSide::Left),
                (allow_right, x1, HandleSide::Right),
            ];
            for (allowed, line, side) in candidates {
                if allowed && layout.hits_handle(x, y, line, side) {
                    let dist = (raw_x - line).abs();
                    if best.is_none_or(|(d, _, _)| dist < d) {
                        best = Some((dist, id, side));
                    }
                }
            }

            if layout.hovers_body(sel, raw_x, y) {
                hovered = Some(id);
            }
            if hovered.is_none() {
                let text = display_label(sel, pos);
                if layout.label_rect(sel, &text, frame.measure).contains(raw_x, y)
                    || layout.cluster(sel).hits_delete(raw_x, y)
                {
                    hovered = Some(id);
                }
            }
        }

        if let Some((_, id, side)) = best {
            self.hovered_handle = Some((id, side));
            self.delete_target = Some(id);
            return EventOutcome::timeline(CursorHint::Grab);
        }
        self.hovered_handle = None;
        self.delete_target = hovered;
        EventOutcome::timeline(CursorHint::Default)
    }

    pub fn pointer_up(&mut self, selections: &mut SelectionSet) -> EventOutcome {
        self.drop_stale(selections);
        let state = self.state;
        let outcome = match state {
            InteractionState::EditingLabel { .. } | InteractionState::Splitting { .. } => {
                return EventOutcome::none();
            }
            InteractionState::Idle => EventOutcome::timeline(CursorHint::Default),
            InteractionState::CreatingSelection { candidate, .. } => {
                match candidate.filter(|r| r.t1 > r.t0) {
                    Some(range) => {
                        selections.add_or_merge_range(range.t0, range.t1);
                        EventOutcome::changed(CursorHint::Default)
                    }
                    None => EventOutcome::both(CursorHint::Default),
                }
            }
            InteractionState::DraggingMerge {
                source,
                anchor_t,
                current_t,
            } => match selections.merge_by_envelope(anchor_t, current_t, Some(source)) {
                Some(_) => EventOutcome::changed(CursorHint::Default),
                None => EventOutcome::both(CursorHint::Default),
            },
            InteractionState::DraggingHandle { id, side } => {
                trace!(%id, ?side, moved = self.handle_moved, "handle drag finished");
                if std::mem::take(&mut self.handle_moved) {
                    selections.recompute_auto_ids();
                    EventOutcome::changed(CursorHint::Default)
                } else {
                    EventOutcome::both(CursorHint::Default)
                }
            }
        };
        self.state = InteractionState::Idle;
        self.clear_hover();
        outcome
    }

    /// Pointer left the canvas. An open label editor keeps its selection's
    /// controls pinned.
    pub fn pointer_leave(&mut self) -> EventOutcome {
        self.hovered_handle = None;
        match self.state {
            InteractionState::EditingLabel { id } => self.delete_target = Some(id),
            _ => self.delete_target = None,
        }
        EventOutcome::timeline(CursorHint::Default)
    }

    /// Escape cancels split mode and any drag that has not committed yet.
    pub fn escape(&mut self) -> EventOutcome {
        match self.state {
            InteractionState::Splitting { .. }
            | InteractionState::CreatingSelection { .. }
            | InteractionState::DraggingMerge { .. } => {
                debug!(state = ?self.state, "gesture cancelled by escape");
                self.state = InteractionState::Idle;
                EventOutcome::both(CursorHint::Default)
            }
            _ => EventOutcome::none(),
        }
    }

    /// Opens the label editor for `id` without a pointer press.
    pub fn begin_label_edit(
        &mut self,
        selections: &SelectionSet,
        frame: &TimelineFrame<'_>,
        id: SelectionId,
    ) -> Option<LabelEditRequest> {
        let layout = self.layout(frame)?;
        let (pos, (_, sel)) = selections
            .sorted_by_t0()
            .into_iter()
            .enumerate()
            .find(|(_, (sid, _))| *sid == id)?;
        let rect = layout.label_rect(sel, &display_label(sel, pos), frame.measure);
        self.state = InteractionState::EditingLabel { id };
        self.hovered_handle = None;
        self.delete_target = Some(id);
        self.bubbles.show(id);
        Some(LabelEditRequest {
            id,
            rect,
            initial_text: Self::label_text(selections, id),
        })
    }

    /// Ends label editing, storing `text` (empty unlocks the label).
    pub fn commit_label_edit(&mut self, selections: &mut SelectionSet, text: &str) -> EventOutcome {
        let InteractionState::EditingLabel { id } = self.state else {
            return EventOutcome::none();
        };
        self.state = InteractionState::Idle;
        if selections.commit_label(id, text) {
            EventOutcome::changed(CursorHint::Default)
        } else {
            EventOutcome::timeline(CursorHint::Default)
        }
    }

    /// Ends label editing without touching the selection.
    pub fn cancel_label_edit(&mut self) -> EventOutcome {
        if !matches!(self.state, InteractionState::EditingLabel { .. }) {
            return EventOutcome::none();
        }
        self.state = InteractionState::Idle;
        EventOutcome::timeline(CursorHint::Default)
    }
}
