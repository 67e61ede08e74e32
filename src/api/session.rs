use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::config::SessionConfig;
use crate::api::host::HostFs;
use crate::core::{
    Dataset, TimeBarGeometry, TimeRange, TimeTick, Viewport, VisibilityPolicy, compute_time_ticks,
    detect_time_gaps, merge_highlight_ranges,
};
use crate::data::{DetectedColumns, FilterSettings, LoadOptions, RawTable, build_dataset, parse_text};
use crate::error::{SegError, SegResult};
use crate::interaction::{
    EventOutcome, FixedAdvance, LabelEditRequest, LabelMeasure, TimelineController, TimelineFrame,
    XyBrushController, XyFrame,
};
use crate::selection::{
    SelectionId, SelectionSet, export_file_name, export_json, import_selections_from_json,
};

/// Everything kept from the last successful load.
struct LoadedSource {
    path: Option<PathBuf>,
    table: RawTable,
    base: Dataset,
    columns: DetectedColumns,
    column_names: Vec<String>,
}

/// Single owner of the dataset, the selections and both controllers.
///
/// Hosts forward pointer events and I/O requests here; the session keeps
/// the dataset immutable between loads and filter changes and hands it out
/// through [`AnnotationSession::dataset`].
pub struct AnnotationSession {
    config: SessionConfig,
    source: Option<LoadedSource>,
    dataset: Option<Arc<Dataset>>,
    visible: Vec<usize>,
    selections: SelectionSet,
    timeline: TimelineController,
    brush: XyBrushController,
    measure: Box<dyn LabelMeasure>,
    timeline_viewport: Viewport,
    xy_viewport: Viewport,
    io_pending: bool,
    selections_version: u64,
    exported_version: u64,
}

impl AnnotationSession {
    pub fn new(config: SessionConfig) -> SegResult<Self> {
        let config = config.validate()?;
        Ok(Self {
            config,
            source: None,
            dataset: None,
            visible: Vec::new(),
            selections: SelectionSet::new(),
            timeline: TimelineController::new(config.timeline, config.split_guard),
            brush: XyBrushController::new(config.brush),
            measure: Box::new(FixedAdvance::default()),
            timeline_viewport: Viewport::new(800, 160),
            xy_viewport: Viewport::new(800, 600),
            io_pending: false,
            selections_version: 0,
            exported_version: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Applies new tuning; filter changes rebuild the dataset.
    pub fn set_config(&mut self, config: SessionConfig) -> SegResult<()> {
        let config = config.validate()?;
        self.timeline.set_tuning(config.timeline, config.split_guard);
        self.brush.set_tuning(config.brush);
        let filters = config.filters;
        self.config = config;
        self.set_filters(filters)
    }

    pub fn set_label_measure(&mut self, measure: Box<dyn LabelMeasure>) {
        self.measure = measure;
    }

    pub fn set_timeline_viewport(&mut self, viewport: Viewport) -> SegResult<()> {
        self.timeline_viewport = viewport.ensure_valid()?;
        Ok(())
    }

    /// The XY transform depends on the canvas size, so a pending brush is
    /// dropped on resize.
    pub fn set_xy_viewport(&mut self, viewport: Viewport) -> SegResult<()> {
        let viewport = viewport.ensure_valid()?;
        if viewport != self.xy_viewport {
            self.brush.reset();
        }
        self.xy_viewport = viewport;
        Ok(())
    }

    #[must_use]
    pub fn timeline_viewport(&self) -> Viewport {
        self.timeline_viewport
    }

    #[must_use]
    pub fn xy_viewport(&self) -> Viewport {
        self.xy_viewport
    }

    /// Current (filtered) dataset.
    #[must_use]
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.clone()
    }

    #[must_use]
    pub fn selections(&self) -> &SelectionSet {
        &self.selections
    }

    #[must_use]
    pub fn timeline(&self) -> &TimelineController {
        &self.timeline
    }

    #[must_use]
    pub fn brush(&self) -> &XyBrushController {
        &self.brush
    }

    #[must_use]
    pub fn detected_columns(&self) -> Option<DetectedColumns> {
        self.source.as_ref().map(|s| s.columns)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.source.as_ref().map_or(&[], |s| s.column_names.as_slice())
    }

    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().and_then(|s| s.path.as_deref())
    }

    /// Sample indices drawn in the XY view under the current lift policy.
    #[must_use]
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    // ----- loading -------------------------------------------------------

    /// Replaces the dataset with `table`. On error nothing changes.
    pub fn load_table(&mut self, table: RawTable, options: &LoadOptions, path: Option<PathBuf>) -> SegResult<()> {
        let loaded = build_dataset(&table, options)?;
        let filtered = self.config.filters.apply(&loaded.dataset)?;
        info!(
            samples = filtered.len(),
            source_rows = table.len(),
            path = ?path,
            "data loaded"
        );
        self.source = Some(LoadedSource {
            path,
            table,
            base: loaded.dataset,
            columns: loaded.columns,
            column_names: loaded.column_names,
        });
        self.install_dataset(filtered);
        self.selections.clear();
        self.timeline.reset();
        self.selections_version = 0;
        self.exported_version = 0;
        Ok(())
    }

    pub fn load_text(&mut self, raw_text: &str, file_name: &str, options: &LoadOptions) -> SegResult<()> {
        let table = parse_text(raw_text, file_name)?;
        self.load_table(table, options, Some(PathBuf::from(file_name)))
    }

    /// Reads and loads a file through the host, inside the I/O guard.
    pub fn load_path(&mut self, host: &dyn HostFs, path: &Path, options: &LoadOptions) -> SegResult<()> {
        self.with_io(|session| {
            let text = host.read_file(path)?;
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let table = parse_text(&text, file_name)?;
            session.load_table(table, options, Some(path.to_path_buf()))
        })
    }

    /// Re-runs detection on the loaded table with user-supplied column names.
    pub fn reload_with_column_names(&mut self, names: Vec<String>) -> SegResult<()> {
        let Some(source) = self.source.as_ref() else {
            return Err(SegError::EmptyData);
        };
        let table = source.table.clone();
        let path = source.path.clone();
        let options = LoadOptions {
            column_names: Some(names),
        };
        self.load_table(table, &options, path)
    }

    /// Re-applies filters from the loaded dataset. Selections survive since
    /// filters never shift the time origin; the brush does not.
    pub fn set_filters(&mut self, filters: FilterSettings) -> SegResult<()> {
        let Some(source) = self.source.as_ref() else {
            self.config.filters = filters;
            return Ok(());
        };
        let filtered = filters.apply(&source.base)?;
        debug!(?filters, samples = filtered.len(), "filters changed");
        self.config.filters = filters;
        self.install_dataset(filtered);
        if self.timeline.cancel_gesture() {
            self.selections_version += 1;
        }
        Ok(())
    }

    fn install_dataset(&mut self, dataset: Dataset) {
        let policy = VisibilityPolicy {
            show_lifts: self.config.filters.show_lifts,
        };
        self.visible = policy.visible_indices(dataset.tip());
        self.dataset = Some(Arc::new(dataset));
        self.brush.reset();
    }

    // ----- derived views ---------------------------------------------------

    #[must_use]
    pub fn time_ticks(&self) -> Vec<TimeTick> {
        let Some(dataset) = self.dataset.as_deref() else {
            return Vec::new();
        };
        let Some(bar) = TimeBarGeometry::from_times(
            self.timeline_viewport,
            self.config.timeline.bar,
            dataset.times(),
        ) else {
            return Vec::new();
        };
        let (t_min, t_max) = bar.time_bounds();
        compute_time_ticks(t_min, t_max, bar.bar_width)
    }

    #[must_use]
    pub fn time_gaps(&self) -> Vec<TimeRange> {
        self.dataset
            .as_deref()
            .map_or_else(Vec::new, |d| detect_time_gaps(d.times()))
    }

    /// Brush ranges clamped and coalesced for the timeline highlight.
    #[must_use]
    pub fn highlight_ranges(&self) -> Vec<TimeRange> {
        let Some((t_min, t_max)) = self.dataset.as_deref().and_then(Dataset::time_bounds) else {
            return Vec::new();
        };
        merge_highlight_ranges(self.brush.temp_ranges(), t_min, t_max)
    }

    // ----- I/O guard ---------------------------------------------------------

    /// Cancels any gesture and blocks pointer input until [`Self::end_io`].
    pub fn begin_io(&mut self) -> SegResult<()> {
        if self.io_pending {
            return Err(SegError::Busy);
        }
        if self.timeline.cancel_gesture() {
            self.selections_version += 1;
        }
        self.brush.cancel_gesture();
        self.io_pending = true;
        Ok(())
    }

    pub fn end_io(&mut self) {
        self.io_pending = false;
    }

    #[must_use]
    pub fn io_pending(&self) -> bool {
        self.io_pending
    }

    fn with_io<T>(&mut self, op: impl FnOnce(&mut Self) -> SegResult<T>) -> SegResult<T> {
        self.begin_io()?;
        let result = op(self);
        self.end_io();
        if let Err(err) = &result {
            warn!(error = %err, "i/o operation failed");
        }
        result
    }

    // ----- export / import -----------------------------------------------------

    #[must_use]
    pub fn selections_version(&self) -> u64 {
        self.selections_version
    }

    #[must_use]
    pub fn has_unexported_changes(&self) -> bool {
        self.selections_version != self.exported_version
    }

    fn note(&mut self, outcome: EventOutcome) -> EventOutcome {
        if outcome.selections_changed {
            self.selections_version += 1;
        }
        outcome
    }

    /// Suggested export file name for the loaded source.
    #[must_use]
    pub fn export_file_name(&self) -> Option<String> {
        self.source_path().map(export_file_name)
    }

    pub fn export_json(&self) -> SegResult<String> {
        let dataset = self.dataset.as_deref().ok_or(SegError::EmptyData)?;
        export_json(dataset, &self.selections)
    }

    /// Writes the export through the host. The in-memory state is only
    /// marked exported once the write succeeded.
    pub fn export_to(&mut self, host: &dyn HostFs, path: &Path) -> SegResult<()> {
        self.with_io(|session| {
            let json = session.export_json()?;
            host.write_file(path, &json)?;
            session.exported_version = session.selections_version;
            info!(path = %path.display(), selections = session.selections.len(), "export written");
            Ok(())
        })
    }

    /// Replaces the selections with those of a prior export.
    pub fn import_segmented_json(&mut self, text: &str) -> SegResult<usize> {
        let dataset = self.dataset.as_deref().ok_or(SegError::EmptyData)?;
        let imported = import_selections_from_json(text, dataset)?;
        let count = imported.len();
        self.selections.replace_all(imported);
        self.timeline.reset();
        self.brush.reset();
        self.selections_version += 1;
        self.exported_version = self.selections_version;
        info!(selections = count, "segmented export imported");
        Ok(count)
    }

    /// Reads a prior export through the host and imports it. I/O or parse
    /// failures leave the current selections untouched.
    pub fn import_segmented(&mut self, host: &dyn HostFs, path: &Path) -> SegResult<usize> {
        self.with_io(|session| {
            let text = host.read_file(path)?;
            session.import_segmented_json(&text)
        })
    }

    // ----- timeline events -------------------------------------------------------

    fn accepts_input(&self) -> bool {
        !self.io_pending && self.dataset.is_some()
    }

    pub fn timeline_pointer_down(&mut self, x: f64, y: f64) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let Some(dataset) = self.dataset.clone() else {
            return EventOutcome::none();
        };
        let frame = TimelineFrame {
            times: dataset.times(),
            viewport: self.timeline_viewport,
            measure: self.measure.as_ref(),
        };
        let outcome = self.timeline.pointer_down(&mut self.selections, &frame, x, y);
        self.note(outcome)
    }

    pub fn timeline_pointer_move(&mut self, x: f64, y: f64) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let Some(dataset) = self.dataset.clone() else {
            return EventOutcome::none();
        };
        let frame = TimelineFrame {
            times: dataset.times(),
            viewport: self.timeline_viewport,
            measure: self.measure.as_ref(),
        };
        let outcome = self.timeline.pointer_move(&mut self.selections, &frame, x, y);
        self.note(outcome)
    }

    pub fn timeline_pointer_up(&mut self) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let outcome = self.timeline.pointer_up(&mut self.selections);
        self.note(outcome)
    }

    pub fn timeline_pointer_leave(&mut self) -> EventOutcome {
        self.timeline.pointer_leave()
    }

    pub fn timeline_escape(&mut self) -> EventOutcome {
        if self.io_pending {
            return EventOutcome::none();
        }
        self.timeline.escape()
    }

    pub fn begin_label_edit(&mut self, id: SelectionId) -> Option<LabelEditRequest> {
        if !self.accepts_input() {
            return None;
        }
        let dataset = self.dataset.clone()?;
        let frame = TimelineFrame {
            times: dataset.times(),
            viewport: self.timeline_viewport,
            measure: self.measure.as_ref(),
        };
        self.timeline.begin_label_edit(&self.selections, &frame, id)
    }

    pub fn commit_label_edit(&mut self, text: &str) -> EventOutcome {
        let outcome = self.timeline.commit_label_edit(&mut self.selections, text);
        self.note(outcome)
    }

    pub fn cancel_label_edit(&mut self) -> EventOutcome {
        self.timeline.cancel_label_edit()
    }

    /// One animation step of the control bubbles.
    pub fn tick(&mut self) -> bool {
        self.timeline.tick_bubbles(&self.selections)
    }

    // ----- XY events ---------------------------------------------------------------

    pub fn xy_pointer_down(&mut self, x: f64, y: f64) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let Some(dataset) = self.dataset.clone() else {
            return EventOutcome::none();
        };
        let frame = XyFrame {
            dataset: &dataset,
            visible: &self.visible,
            viewport: self.xy_viewport,
        };
        let outcome = self.brush.pointer_down(&mut self.selections, &frame, x, y);
        self.note(outcome)
    }

    pub fn xy_pointer_move(&mut self, x: f64, y: f64) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let Some(dataset) = self.dataset.clone() else {
            return EventOutcome::none();
        };
        let frame = XyFrame {
            dataset: &dataset,
            visible: &self.visible,
            viewport: self.xy_viewport,
        };
        self.brush.pointer_move(&frame, x, y)
    }

    pub fn xy_pointer_up(&mut self) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        self.brush.pointer_up()
    }

    /// Commits the pending brush, e.g. from a keyboard shortcut.
    pub fn commit_brush(&mut self) -> EventOutcome {
        if !self.accepts_input() {
            return EventOutcome::none();
        }
        let outcome = self.brush.commit(&mut self.selections);
        self.note(outcome)
    }

    /// Deletes a selection directly (e.g. from a list view).
    pub fn delete_selection(&mut self, id: SelectionId) -> bool {
        if self.io_pending || self.selections.delete(id).is_none() {
            return false;
        }
        self.selections_version += 1;
        true
    }
}
