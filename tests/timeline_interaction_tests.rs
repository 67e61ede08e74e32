use approx::assert_abs_diff_eq;
use penseg::core::{TimeBarGeometry, Viewport};
use penseg::interaction::{
    CursorHint, FixedAdvance, HandleSide, InteractionState, TimelineController, TimelineFrame,
    TimelineLayout, TimelineTuning,
};
use penseg::selection::{SelectionId, SelectionSet};

const TRACK_Y: f64 = 120.0;

struct Fixture {
    times: Vec<f64>,
    measure: FixedAdvance,
    viewport: Viewport,
}

impl Fixture {
    fn new() -> Self {
        Self {
            times: (0..=100).map(f64::from).collect(),
            measure: FixedAdvance::default(),
            viewport: Viewport::new(1000, 200),
        }
    }

    fn frame(&self) -> TimelineFrame<'_> {
        TimelineFrame {
            times: &self.times,
            viewport: self.viewport,
            measure: &self.measure,
        }
    }

    fn layout(&self) -> TimelineLayout {
        let tuning = TimelineTuning::default();
        let bar = TimeBarGeometry::from_times(self.viewport, tuning.bar, &self.times).expect("bar");
        TimelineLayout::new(bar, &tuning)
    }

    fn px(&self, t: f64) -> f64 {
        self.layout().bar.time_to_pixel(t)
    }
}

fn span(set: &SelectionSet, id: SelectionId) -> (f64, f64) {
    let sel = set.get(id).expect("selection");
    (sel.t0, sel.t1)
}

/// Hovers the selection body and runs the fade until its bubbles are clickable.
fn reveal_bubbles(
    controller: &mut TimelineController,
    set: &mut SelectionSet,
    fx: &Fixture,
    id: SelectionId,
) {
    let (t0, t1) = span(set, id);
    let frame = fx.frame();
    controller.pointer_move(set, &frame, fx.px((t0 + t1) / 2.0), TRACK_Y);
    assert_eq!(controller.delete_target(), Some(id));
    controller.tick_bubbles(set);
    assert!(controller.bubble_alpha(id) > 0.0);
}

#[test]
fn drag_on_empty_track_creates_selection() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let mut controller = TimelineController::default();

    let down = controller.pointer_down(&mut set, &frame, fx.px(10.0), TRACK_Y);
    assert_eq!(down.cursor, CursorHint::Crosshair);
    assert!(matches!(
        controller.state(),
        InteractionState::CreatingSelection { .. }
    ));

    controller.pointer_move(&mut set, &frame, fx.px(30.0), TRACK_Y);
    let candidate = controller.candidate().expect("candidate");
    assert_abs_diff_eq!(candidate.t0, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(candidate.t1, 30.0, epsilon = 1e-9);

    let up = controller.pointer_up(&mut set);
    assert!(up.selections_changed);
    assert_eq!(set.len(), 1);
    let (_, sel) = set.iter().next().expect("selection");
    assert_abs_diff_eq!(sel.t0, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sel.t1, 30.0, epsilon = 1e-9);
    assert!(controller.state().is_idle());
}

#[test]
fn click_without_drag_creates_nothing() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let mut controller = TimelineController::default();

    controller.pointer_down(&mut set, &frame, fx.px(10.0), TRACK_Y);
    let up = controller.pointer_up(&mut set);
    assert!(!up.selections_changed);
    assert!(set.is_empty());
}

#[test]
fn new_selection_stops_at_neighbour_edge() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    set.add_or_merge_range(40.0, 60.0).expect("neighbour");
    let mut controller = TimelineController::default();

    controller.pointer_down(&mut set, &frame, fx.px(10.0), TRACK_Y);
    controller.pointer_move(&mut set, &frame, fx.px(80.0), TRACK_Y);
    let candidate = controller.candidate().expect("candidate");
    assert_abs_diff_eq!(candidate.t1, 40.0, epsilon = 1e-9);

    controller.pointer_up(&mut set);
    assert_eq!(set.len(), 2);
}

#[test]
fn press_off_track_starts_nothing() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let mut controller = TimelineController::default();

    let outcome = controller.pointer_down(&mut set, &frame, fx.px(10.0), 195.0);
    assert!(controller.state().is_idle());
    assert!(!outcome.selections_changed);
}

#[test]
fn left_handle_drag_moves_start_and_stops_at_neighbour() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    set.add_or_merge_range(0.0, 8.0).expect("neighbour");
    let id = set.add_or_merge_range(20.0, 40.0).expect("active");
    let mut controller = TimelineController::default();

    let hover = controller.pointer_move(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    assert_eq!(hover.cursor, CursorHint::Grab);
    assert_eq!(controller.hovered_handle(), Some((id, HandleSide::Left)));

    controller.pointer_down(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    assert_eq!(
        controller.state(),
        InteractionState::DraggingHandle {
            id,
            side: HandleSide::Left
        }
    );

    controller.pointer_move(&mut set, &frame, fx.px(12.0), TRACK_Y);
    assert_abs_diff_eq!(span(&set, id).0, 12.0, epsilon = 1e-9);

    controller.pointer_move(&mut set, &frame, fx.px(2.0), TRACK_Y);
    assert_abs_diff_eq!(span(&set, id).0, 8.0, epsilon = 1e-9);

    let up = controller.pointer_up(&mut set);
    assert!(up.selections_changed);
}

#[test]
fn right_handle_drag_never_crosses_left_edge() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 40.0).expect("active");
    let mut controller = TimelineController::default();

    controller.pointer_move(&mut set, &frame, fx.px(40.0) - 3.0, TRACK_Y);
    assert_eq!(controller.hovered_handle(), Some((id, HandleSide::Right)));
    controller.pointer_down(&mut set, &frame, fx.px(40.0) - 3.0, TRACK_Y);
    controller.pointer_move(&mut set, &frame, fx.px(5.0), TRACK_Y);

    let (t0, t1) = span(&set, id);
    assert!(t1 > t0);
    assert_abs_diff_eq!(t1, 20.0, epsilon = 1e-9);
    controller.pointer_up(&mut set);
}

#[test]
fn merge_drag_fuses_overlapped_selections() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let a = set.add_or_merge_range(10.0, 20.0).expect("a");
    set.add_or_merge_range(30.0, 40.0).expect("b");
    let mut controller = TimelineController::default();

    let down = controller.pointer_down(&mut set, &frame, fx.px(15.0), TRACK_Y);
    assert_eq!(down.cursor, CursorHint::Move);
    controller.pointer_move(&mut set, &frame, fx.px(35.0), TRACK_Y);

    let (envelope, gaps) = controller.merge_preview(&set).expect("preview");
    assert_abs_diff_eq!(envelope.t0, 15.0, epsilon = 1e-9);
    assert_abs_diff_eq!(envelope.t1, 35.0, epsilon = 1e-9);
    assert_eq!(gaps.len(), 1);

    let up = controller.pointer_up(&mut set);
    assert!(up.selections_changed);
    assert_eq!(set.len(), 1);
    assert_eq!(span(&set, a), (10.0, 40.0));
}

#[test]
fn merge_drag_over_single_selection_changes_nothing() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    set.add_or_merge_range(10.0, 20.0).expect("a");
    set.add_or_merge_range(60.0, 70.0).expect("b");
    let before = set.clone();
    let mut controller = TimelineController::default();

    controller.pointer_down(&mut set, &frame, fx.px(15.0), TRACK_Y);
    controller.pointer_move(&mut set, &frame, fx.px(45.0), TRACK_Y);
    let up = controller.pointer_up(&mut set);
    assert!(!up.selections_changed);
    assert_eq!(set, before);
}

#[test]
fn split_bubble_then_click_splits_at_nearest_sample() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    let cluster = fx.layout().cluster(set.get(id).expect("selection"));
    let enter = controller.pointer_down(&mut set, &frame, cluster.split.0, cluster.split.1);
    assert_eq!(enter.cursor, CursorHint::Split);
    assert!(matches!(controller.state(), InteractionState::Splitting { .. }));

    controller.pointer_move(&mut set, &frame, fx.px(40.3), TRACK_Y);
    let (preview_id, preview_t) = controller.split_preview().expect("preview");
    assert_eq!(preview_id, id);
    assert_abs_diff_eq!(preview_t, 40.3, epsilon = 1e-9);

    let done = controller.pointer_down(&mut set, &frame, fx.px(40.3), TRACK_Y);
    assert!(done.selections_changed);
    let spans: Vec<(f64, f64)> = set
        .sorted_by_t0()
        .into_iter()
        .map(|(_, s)| (s.t0, s.t1))
        .collect();
    assert_eq!(spans, vec![(20.0, 40.0), (40.0, 60.0)]);
}

#[test]
fn split_click_outside_selection_cancels_split_mode() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    let cluster = fx.layout().cluster(set.get(id).expect("selection"));
    controller.pointer_down(&mut set, &frame, cluster.split.0, cluster.split.1);
    let outcome = controller.pointer_down(&mut set, &frame, fx.px(80.0), TRACK_Y);
    assert!(!outcome.selections_changed);
    assert!(controller.state().is_idle());
    assert_eq!(set.len(), 1);
}

#[test]
fn escape_leaves_split_mode() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    let cluster = fx.layout().cluster(set.get(id).expect("selection"));
    controller.pointer_down(&mut set, &frame, cluster.split.0, cluster.split.1);
    assert!(controller.escape().needs_redraw());
    assert!(controller.state().is_idle());
}

#[test]
fn delete_bubble_removes_selection() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    set.add_or_merge_range(70.0, 80.0).expect("other");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    let cluster = fx.layout().cluster(set.get(id).expect("selection"));
    let outcome = controller.pointer_down(&mut set, &frame, cluster.delete.0, cluster.delete.1);
    assert!(outcome.selections_changed);
    assert!(!set.contains(id));
    assert_eq!(set.len(), 1);
    assert_eq!(controller.delete_target(), None);
}

#[test]
fn label_box_click_opens_editor_and_commit_locks_label() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    let cluster = fx.layout().cluster(set.get(id).expect("selection"));
    let outcome = controller.pointer_down(&mut set, &frame, cluster.label.0, cluster.label.1);
    let request = outcome.label_edit.expect("edit request");
    assert_eq!(request.id, id);
    assert_eq!(request.initial_text, "#1");
    assert_eq!(controller.state(), InteractionState::EditingLabel { id });

    // Presses are swallowed while the editor is open.
    let swallowed = controller.pointer_down(&mut set, &frame, fx.px(80.0), TRACK_Y);
    assert!(!swallowed.needs_redraw());

    let committed = controller.commit_label_edit(&mut set, "loop");
    assert!(committed.selections_changed);
    let sel = set.get(id).expect("selection");
    assert_eq!(sel.label.as_deref(), Some("loop"));
    assert!(sel.locked);
    assert!(controller.state().is_idle());
}

#[test]
fn cancelled_label_edit_keeps_label() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();

    let request = controller
        .begin_label_edit(&set, &frame, id)
        .expect("edit request");
    assert_eq!(request.initial_text, "#1");
    controller.cancel_label_edit();

    let sel = set.get(id).expect("selection");
    assert_eq!(sel.label.as_deref(), Some("#1"));
    assert!(!sel.locked);
    assert!(controller.state().is_idle());
}

#[test]
fn gesture_on_deleted_selection_falls_back_to_idle() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 40.0).expect("selection");
    let mut controller = TimelineController::default();

    controller.pointer_move(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    controller.pointer_down(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    assert!(!controller.state().is_idle());

    set.delete(id);
    controller.pointer_move(&mut set, &frame, fx.px(10.0), TRACK_Y);
    assert!(controller.state().is_idle());
    let up = controller.pointer_up(&mut set);
    assert!(!up.selections_changed);
}

#[test]
fn bubbles_fade_out_after_pointer_leaves() {
    let fx = Fixture::new();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 60.0).expect("selection");
    let mut controller = TimelineController::default();
    reveal_bubbles(&mut controller, &mut set, &fx, id);

    controller.pointer_leave();
    let mut guard = 0;
    while controller.tick_bubbles(&set) {
        guard += 1;
        assert!(guard < 1_000, "fade never settled");
    }
    assert_eq!(controller.bubble_alpha(id), 0.0);
}

#[test]
fn pointer_leave_keeps_editing_selection_as_delete_target() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    set.add_or_merge_range(10.0, 20.0).expect("other");
    let id = set.add_or_merge_range(40.0, 60.0).expect("edited");
    let mut controller = TimelineController::default();

    controller
        .begin_label_edit(&set, &frame, id)
        .expect("edit request");
    controller.pointer_leave();
    assert_eq!(controller.delete_target(), Some(id));
    assert_eq!(controller.hovered_handle(), None);

    controller.cancel_label_edit();
    controller.pointer_leave();
    assert_eq!(controller.delete_target(), None);
}

#[test]
fn nearest_handle_wins_where_grab_regions_overlap() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let left = set.add_or_merge_range(20.0, 30.0).expect("left");
    let right = set.add_or_merge_range(31.0, 40.0).expect("right");
    let mut controller = TimelineController::default();
    let layout = fx.layout();

    // Right edge of `left` at 320 px, left edge of `right` at 329 px.
    for x in [324.0, 325.5] {
        assert!(layout.hits_handle(x, TRACK_Y, fx.px(30.0), HandleSide::Right));
        assert!(layout.hits_handle(x, TRACK_Y, fx.px(31.0), HandleSide::Left));
    }

    controller.pointer_move(&mut set, &frame, 324.0, TRACK_Y);
    assert_eq!(controller.hovered_handle(), Some((left, HandleSide::Right)));

    controller.pointer_move(&mut set, &frame, 325.5, TRACK_Y);
    assert_eq!(controller.hovered_handle(), Some((right, HandleSide::Left)));
    assert_eq!(controller.delete_target(), Some(right));
}

#[test]
fn handle_hit_outranks_body_hover_for_delete_target() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let first = set.add_or_merge_range(20.0, 30.0).expect("first");
    let second = set.add_or_merge_range(30.0, 40.0).expect("second");
    let mut controller = TimelineController::default();

    // Two pixels into `second`, equally close to both handles on the shared edge.
    let x = fx.px(30.0) + 2.0;
    assert!(fx.layout().hovers_body(set.get(second).expect("second"), x, TRACK_Y));

    let outcome = controller.pointer_move(&mut set, &frame, x, TRACK_Y);
    assert_eq!(outcome.cursor, CursorHint::Grab);
    assert_eq!(controller.hovered_handle(), Some((first, HandleSide::Right)));
    assert_eq!(controller.delete_target(), Some(first));

    // Away from any handle the body decides.
    controller.pointer_move(&mut set, &frame, fx.px(35.0), TRACK_Y);
    assert_eq!(controller.hovered_handle(), None);
    assert_eq!(controller.delete_target(), Some(second));
}

#[test]
fn handle_click_without_movement_is_not_a_change() {
    let fx = Fixture::new();
    let frame = fx.frame();
    let mut set = SelectionSet::new();
    let id = set.add_or_merge_range(20.0, 40.0).expect("selection");
    let mut controller = TimelineController::default();

    controller.pointer_down(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    assert!(matches!(
        controller.state(),
        InteractionState::DraggingHandle { .. }
    ));
    let up = controller.pointer_up(&mut set);
    assert!(!up.selections_changed);
    assert_eq!(span(&set, id), (20.0, 40.0));

    // Moving back onto the same edge writes nothing new either.
    controller.pointer_down(&mut set, &frame, fx.px(20.0) + 3.0, TRACK_Y);
    controller.pointer_move(&mut set, &frame, fx.px(20.0), TRACK_Y);
    assert!(!controller.pointer_up(&mut set).selections_changed);
}
