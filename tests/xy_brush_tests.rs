use penseg::core::{Dataset, PixelRect, Viewport, XyTransform, time_ranges_in_rect};
use penseg::interaction::{BrushMode, CursorHint, XyBrushController, XyFrame};
use penseg::selection::SelectionSet;

fn diagonal_dataset(n: usize) -> Dataset {
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let ts: Vec<f64> = (0..n).map(|i| i as f64 * 10.0).collect();
    let ps = vec![1.0; n];
    Dataset::from_vectors(&xs, &xs, &ts, &ps).expect("dataset")
}

/// Canvas rectangle around data points `lo..=hi` on the diagonal.
fn rect_around(transform: &XyTransform, lo: f64, hi: f64) -> (f64, f64, f64, f64) {
    let x0 = transform.to_canvas_x(lo - 0.5);
    let x1 = transform.to_canvas_x(hi + 0.5);
    let y_top = transform.to_canvas_y(hi + 0.5);
    let y_bottom = transform.to_canvas_y(lo - 0.5);
    (x0, y_top, x1, y_bottom)
}

#[test]
fn box_over_visible_samples_yields_one_range_per_index_run() {
    let dataset = diagonal_dataset(8);
    let visible = [0, 1, 2, 5, 6, 7];
    let viewport = Viewport::new(400, 400);
    let transform = XyTransform::fit_dataset(&dataset, &visible, viewport);
    let rect = PixelRect {
        x0: 0.0,
        y0: 0.0,
        x1: 400.0,
        y1: 400.0,
    };

    let ranges = time_ranges_in_rect(rect, &dataset, &visible, &transform);
    let spans: Vec<(f64, f64)> = ranges.iter().map(|r| (r.t0, r.t1)).collect();
    let t = dataset.times();
    assert_eq!(spans, vec![(t[0], t[2]), (t[5], t[7])]);
}

#[test]
fn drawn_rectangle_becomes_pending_with_time_ranges() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let transform = frame.transform();
    let (x0, y0, x1, y1) = rect_around(&transform, 2.0, 4.0);
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    let down = brush.pointer_down(&mut set, &frame, x0, y0);
    assert_eq!(down.cursor, CursorHint::Crosshair);
    assert_eq!(brush.mode(), BrushMode::Drawing);

    brush.pointer_move(&frame, x1, y1);
    let spans: Vec<(f64, f64)> = brush.temp_ranges().iter().map(|r| (r.t0, r.t1)).collect();
    assert_eq!(spans, vec![(20.0, 40.0)]);

    brush.pointer_up();
    assert_eq!(brush.mode(), BrushMode::Pending);
    assert!(brush.commit_bubble(frame.viewport).is_some());
    assert!(set.is_empty());
}

#[test]
fn commit_bubble_adds_selections_and_clears_brush() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let (x0, y0, x1, y1) = rect_around(&frame.transform(), 2.0, 4.0);
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, x0, y0);
    brush.pointer_move(&frame, x1, y1);
    brush.pointer_up();

    let (cx, cy, _) = brush.commit_bubble(frame.viewport).expect("bubble");
    let outcome = brush.pointer_down(&mut set, &frame, cx, cy);
    assert!(outcome.selections_changed);
    assert_eq!(brush.mode(), BrushMode::Idle);
    assert!(brush.rect().is_none());
    assert!(brush.temp_ranges().is_empty());

    let spans: Vec<(f64, f64)> = set.iter().map(|(_, s)| (s.t0, s.t1)).collect();
    assert_eq!(spans, vec![(20.0, 40.0)]);
}

#[test]
fn commit_bubble_stays_inside_canvas() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, 400.0, 5.0);
    brush.pointer_move(&frame, 498.0, 200.0);
    brush.pointer_up();

    let (cx, cy, r) = brush.commit_bubble(frame.viewport).expect("bubble");
    assert!(cx + r <= 500.0);
    assert!(cy - r >= 0.0);
}

#[test]
fn tiny_rectangle_is_discarded_on_release() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, 100.0, 100.0);
    brush.pointer_move(&frame, 102.0, 140.0);
    brush.pointer_up();

    assert_eq!(brush.mode(), BrushMode::Idle);
    assert!(brush.rect().is_none());
    assert!(brush.temp_ranges().is_empty());
}

#[test]
fn dragging_right_edge_resizes_pending_rectangle() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let transform = frame.transform();
    let (x0, y0, x1, y1) = rect_around(&transform, 2.0, 4.0);
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, x0, y0);
    brush.pointer_move(&frame, x1, y1);
    brush.pointer_up();

    let hover = brush.pointer_move(&frame, x1, (y0 + y1) / 2.0);
    assert_eq!(hover.cursor, CursorHint::ResizeHorizontal);

    let grab = brush.pointer_down(&mut set, &frame, x1, (y0 + y1) / 2.0);
    assert_eq!(grab.cursor, CursorHint::ResizeHorizontal);
    assert!(matches!(brush.mode(), BrushMode::Resizing(_)));

    // Widen to the right and raise the top so points 5 and 6 are covered.
    let (_, top, right, _) = rect_around(&transform, 2.0, 6.0);
    brush.pointer_move(&frame, right, (y0 + y1) / 2.0);
    brush.pointer_up();
    let grab_top = brush.pointer_down(&mut set, &frame, (x0 + right) / 2.0, y0);
    assert_eq!(grab_top.cursor, CursorHint::ResizeVertical);
    brush.pointer_move(&frame, (x0 + right) / 2.0, top);
    brush.pointer_up();

    assert_eq!(brush.mode(), BrushMode::Pending);
    let spans: Vec<(f64, f64)> = brush.temp_ranges().iter().map(|r| (r.t0, r.t1)).collect();
    assert_eq!(spans, vec![(20.0, 60.0)]);
    assert!(set.is_empty());
}

#[test]
fn press_away_from_pending_rectangle_starts_new_one() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let (x0, y0, x1, y1) = rect_around(&frame.transform(), 2.0, 4.0);
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, x0, y0);
    brush.pointer_move(&frame, x1, y1);
    brush.pointer_up();

    brush.pointer_down(&mut set, &frame, 10.0, 490.0);
    assert_eq!(brush.mode(), BrushMode::Drawing);
    assert!(brush.temp_ranges().is_empty());
    assert!(set.is_empty());
}

#[test]
fn committing_an_empty_area_adds_nothing() {
    let dataset = diagonal_dataset(8);
    let visible: Vec<usize> = (0..8).collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    // Top-left corner holds no samples on the diagonal.
    brush.pointer_down(&mut set, &frame, 5.0, 5.0);
    brush.pointer_move(&frame, 60.0, 60.0);
    brush.pointer_up();
    assert_eq!(brush.mode(), BrushMode::Pending);

    let outcome = brush.commit(&mut set);
    assert!(!outcome.selections_changed);
    assert!(set.is_empty());
    assert_eq!(brush.mode(), BrushMode::Idle);
}

#[test]
fn brush_ignores_hidden_lift_samples() {
    let xs: Vec<f64> = (0..6).map(f64::from).collect();
    let ts: Vec<f64> = (0..6).map(|i| f64::from(i) * 10.0).collect();
    let ps = [1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
    let dataset = Dataset::from_vectors(&xs, &xs, &ts, &ps).expect("dataset");
    let visible: Vec<usize> = dataset
        .tip()
        .iter()
        .enumerate()
        .filter_map(|(i, &down)| down.then_some(i))
        .collect();
    let frame = XyFrame {
        dataset: &dataset,
        visible: &visible,
        viewport: Viewport::new(500, 500),
    };
    let mut set = SelectionSet::new();
    let mut brush = XyBrushController::default();

    brush.pointer_down(&mut set, &frame, 0.0, 0.0);
    brush.pointer_move(&frame, 500.0, 500.0);
    let spans: Vec<(f64, f64)> = brush.temp_ranges().iter().map(|r| (r.t0, r.t1)).collect();
    assert_eq!(spans, vec![(0.0, 10.0), (40.0, 50.0)]);
}
