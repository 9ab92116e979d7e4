//! The explorer ties papers, mesh, selection and camera together and owns
//! the single-flight gate that serializes selection actions.
//!
//! Everything runs on one thread. Host code forwards pointer input and
//! animation frames; detail fetches after a pick are the host's business
//! and are bracketed by a [`SelectionTicket`].

use std::collections::HashSet;

use foundation::color::Rgb;
use foundation::math::{Vec2, Vec3};
use foundation::time::Time;
use runtime::{Event, EventBus, EventGate, Frame, GateTicket};
use tracing::debug;

use crate::camera::{CameraController, CameraOptions};
use crate::legend::{DEFAULT_TOPIC_COLORS, LegendChange, TopicLegend};
use crate::mesh::{MeshOptions, PointMesh};
use crate::neighbors::nearest_neighbors;
use crate::palette::{CategoryPalette, SelectionColors};
use crate::paper::{Paper, PaperSet};
use crate::picking::{PickHit, PickIndex, PickOptions};
use crate::pointer::{ClickDetector, DEFAULT_CLICK_THRESHOLD_PX, PointerGesture};
use crate::selection::{SelectionMode, SelectionState};

#[derive(Debug, Clone)]
pub struct ExplorerOptions {
    pub mesh: MeshOptions,
    pub camera: CameraOptions,
    pub neighbor_count: usize,
    pub click_threshold_px: f64,
    pub selection_colors: SelectionColors,
    pub palette: CategoryPalette,
    pub topic_colors: Vec<Rgb>,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            mesh: MeshOptions::default(),
            camera: CameraOptions::default(),
            neighbor_count: 10,
            click_threshold_px: DEFAULT_CLICK_THRESHOLD_PX,
            selection_colors: SelectionColors::default(),
            palette: CategoryPalette::default(),
            topic_colors: DEFAULT_TOPIC_COLORS.to_vec(),
        }
    }
}

/// Callbacks registered at construction.
pub trait ExplorerObserver {
    fn on_pick(&mut self, _paper: usize, _record: &Paper, _neighbors: &[usize]) {}
    fn on_deselect(&mut self) {}
    fn on_hover(&mut self, _hovered: Option<(usize, &Paper)>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExplorerObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerEvent {
    Picked {
        paper: usize,
        doi: String,
        neighbors: Vec<usize>,
    },
    Deselected,
    Hovered {
        paper: Option<usize>,
    },
}

/// Proof that a pick holds the gate. Hand it back through
/// [`Explorer::finish_selection`] once the detail fetch is done.
#[derive(Debug)]
#[must_use = "the explorer ignores selection actions until the ticket is finished"]
pub struct SelectionTicket {
    gate: GateTicket,
    pub paper: usize,
    /// Picked paper first, then its neighbors.
    pub dois: Vec<String>,
}

#[derive(Debug)]
pub enum ClickOutcome {
    Picked(SelectionTicket),
    Deselected,
    /// Pointer moved too far; left to pan/zoom.
    Drag,
    /// Gate busy or view not initialized.
    Dropped,
}

pub struct Explorer {
    papers: PaperSet,
    means: Option<Vec3>,
    mesh: PointMesh,
    picker: PickIndex,
    palette: CategoryPalette,
    colors: SelectionColors,
    neighbor_count: usize,
    selection: SelectionState,
    legend: TopicLegend,
    camera: CameraController,
    clicks: ClickDetector,
    gate: EventGate,
    events: EventBus<ExplorerEvent>,
    observer: Box<dyn ExplorerObserver>,
    frame: Frame,
    hovered: Option<usize>,
    needs_redraw: bool,
    initialized: bool,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("papers", &self.papers.len())
            .field("mode", self.selection.mode())
            .field("busy", &self.gate.is_busy())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl Explorer {
    pub fn new(
        papers: PaperSet,
        means: Option<Vec3>,
        options: ExplorerOptions,
        observer: Box<dyn ExplorerObserver>,
    ) -> Self {
        let mesh = PointMesh::build(papers.as_slice(), options.mesh, &options.palette);
        let picker = PickIndex::build(&mesh);
        debug!(papers = papers.len(), "explorer: mesh built");

        Self {
            papers,
            means,
            mesh,
            picker,
            palette: options.palette,
            colors: options.selection_colors,
            neighbor_count: options.neighbor_count,
            selection: SelectionState::new(),
            legend: TopicLegend::new(options.topic_colors),
            camera: CameraController::new(options.camera),
            clicks: ClickDetector::new(options.click_threshold_px),
            gate: EventGate::new(),
            events: EventBus::new(),
            observer,
            frame: Frame::first(),
            hovered: None,
            needs_redraw: true,
            initialized: false,
        }
    }

    /// Sizes the viewport and moves to the initial view. Selection actions
    /// are dropped until this has run.
    pub fn initialize(&mut self, width: f64, height: f64) {
        self.camera.set_viewport(width, height);
        let start = self
            .camera
            .initial_position(self.means, self.papers.centroid());
        self.camera.view_area(start);
        self.initialized = true;
        self.needs_redraw = true;
        debug!(x = start.x, y = start.y, z = start.z, "explorer: initial view");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn papers(&self) -> &PaperSet {
        &self.papers
    }

    pub fn mesh(&self) -> &PointMesh {
        &self.mesh
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn legend(&self) -> &TopicLegend {
        &self.legend
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn palette(&self) -> &CategoryPalette {
        &self.palette
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn events(&self) -> &[Event<ExplorerEvent>] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event<ExplorerEvent>> {
        self.events.drain()
    }

    pub fn set_pan_speed(&mut self, speed: f64) -> bool {
        self.camera.set_pan_speed(speed)
    }

    pub fn set_zoom_speed(&mut self, speed: f64) -> bool {
        self.camera.set_zoom_speed(speed)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.camera.set_viewport(width, height);
        self.needs_redraw = true;
    }

    /// Advances one animation frame. The camera tween moves first, so the
    /// returned redraw flag already covers it.
    ///
    /// Undrained events live until the end of the frame after the one that
    /// raised them.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.frame = self.frame.next(Time::from_millis(now_ms));
        let dropped = self.events.retain_since(self.frame.index.saturating_sub(1));
        if dropped > 0 {
            debug!(dropped, "explorer: discarded undrained events");
        }
        if self.camera.update(self.frame.time) {
            self.needs_redraw = true;
        }
        if self.mesh.take_dirty() {
            self.needs_redraw = true;
        }
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn hit_test(&self, px: Vec2) -> Option<PickHit> {
        let ray = self.camera.ray_from_screen(px)?;
        self.picker.pick_ray(&self.mesh, ray, PickOptions::default())
    }

    pub fn pointer_down(&mut self, px: Vec2) {
        self.clicks.pointer_down(px);
    }

    pub fn pointer_up(&mut self, px: Vec2) -> ClickOutcome {
        match self.clicks.pointer_up(px) {
            PointerGesture::Drag => ClickOutcome::Drag,
            PointerGesture::Click(at) => self.click(at),
        }
    }

    /// A click at `px`: pick on a hit, deselect on a miss.
    pub fn click(&mut self, px: Vec2) -> ClickOutcome {
        match self.hit_test(px) {
            Some(hit) => match self.pick(hit.paper) {
                Some(ticket) => ClickOutcome::Picked(ticket),
                None => ClickOutcome::Dropped,
            },
            None => {
                if self.deselect_all() {
                    ClickOutcome::Deselected
                } else {
                    ClickOutcome::Dropped
                }
            }
        }
    }

    /// Hover tracking. The observer only hears about changes.
    pub fn hover(&mut self, px: Vec2) -> Option<usize> {
        let paper = self.hit_test(px).map(|h| h.paper);
        if paper != self.hovered {
            self.hovered = paper;
            let record = paper.and_then(|i| self.papers.get(i).map(|p| (i, p)));
            self.observer.on_hover(record);
            self.events.emit(self.frame, ExplorerEvent::Hovered { paper });
        }
        paper
    }

    pub fn pan(&mut self, dx_px: f64, dy_px: f64) -> bool {
        let moved = self.camera.pan(dx_px, dy_px);
        self.needs_redraw |= moved;
        moved
    }

    pub fn dolly(&mut self, steps: f64) -> bool {
        let moved = self.camera.dolly(steps);
        self.needs_redraw |= moved;
        moved
    }

    fn try_begin(&mut self, action: &'static str) -> Option<GateTicket> {
        if !self.initialized {
            debug!(action, "explorer: dropped before initialization");
            return None;
        }
        let ticket = self.gate.try_begin();
        if ticket.is_none() {
            debug!(action, "explorer: dropped while busy");
        }
        ticket
    }

    fn release(&mut self, ticket: GateTicket) {
        let _ = self.gate.finish(ticket);
    }

    /// Selects `paper` and its nearest neighbors. The gate stays busy until
    /// the returned ticket is finished.
    pub fn pick(&mut self, paper: usize) -> Option<SelectionTicket> {
        if self.papers.get(paper).is_none() {
            return None;
        }
        let gate = self.try_begin("pick")?;

        let neighbors = nearest_neighbors(self.papers.as_slice(), paper, self.neighbor_count);
        self.legend.clear();
        self.selection
            .select_paper(&mut self.mesh, paper, &neighbors, &self.colors);
        self.needs_redraw = true;

        let dois: Vec<String> = std::iter::once(paper)
            .chain(neighbors.iter().copied())
            .filter_map(|i| self.papers.get(i).map(|p| p.doi.clone()))
            .collect();

        if let Some(record) = self.papers.get(paper) {
            self.observer.on_pick(paper, record, &neighbors);
            self.events.emit(
                self.frame,
                ExplorerEvent::Picked {
                    paper,
                    doi: record.doi.clone(),
                    neighbors,
                },
            );
        }

        Some(SelectionTicket { gate, paper, dois })
    }

    pub fn select_paper_by_doi(&mut self, doi: &str) -> Option<SelectionTicket> {
        let index = self.papers.index_of(doi)?;
        self.pick(index)
    }

    /// Releases the gate held by a pick. A stale ticket changes nothing.
    pub fn finish_selection(&mut self, ticket: SelectionTicket) -> bool {
        self.gate.finish(ticket.gate)
    }

    pub fn deselect_all(&mut self) -> bool {
        let Some(gate) = self.try_begin("deselect") else {
            return false;
        };
        self.apply_deselect();
        self.release(gate);
        true
    }

    fn apply_deselect(&mut self) {
        self.selection
            .deselect_all(&mut self.mesh, self.papers.as_slice(), &self.palette);
        self.legend.clear();
        self.camera.cancel_animation();
        self.needs_redraw = true;
        self.observer.on_deselect();
        self.events.emit(self.frame, ExplorerEvent::Deselected);
    }

    /// Highlights every paper whose dominant category is `name`, in that
    /// category's color, and frames them.
    pub fn select_category(&mut self, name: &str) -> bool {
        let Some(gate) = self.try_begin("category") else {
            return false;
        };
        let dois: HashSet<String> = self
            .papers
            .indices_in_category(name)
            .into_iter()
            .filter_map(|i| self.papers.get(i).map(|p| p.doi.clone()))
            .collect();
        let color = self.palette.color_of(name);

        self.legend.clear();
        self.selection.select_papers(
            &mut self.mesh,
            self.papers.as_slice(),
            &dois,
            color,
            &self.colors,
        );
        self.frame_selection();
        self.needs_redraw = true;
        self.release(gate);
        true
    }

    /// Highlights an arbitrary doi set in one color and frames it.
    pub fn select_papers(&mut self, dois: &HashSet<String>, color: Rgb) -> bool {
        let Some(gate) = self.try_begin("select papers") else {
            return false;
        };
        self.legend.clear();
        self.selection
            .select_papers(&mut self.mesh, self.papers.as_slice(), dois, color, &self.colors);
        self.frame_selection();
        self.needs_redraw = true;
        self.release(gate);
        true
    }

    /// Adds a topic badge and re-highlights the union of all badges.
    /// Returns `false` for a duplicate topic or a dropped action.
    pub fn add_topic(&mut self, topic: &str, dois: Vec<String>) -> bool {
        if self.legend.contains(topic) {
            return false;
        }
        let Some(gate) = self.try_begin("add topic") else {
            return false;
        };
        if let LegendChange::Added {
            evicted: Some(evicted),
        } = self.legend.add(topic, dois)
        {
            debug!(topic, evicted = %evicted, "explorer: oldest topic evicted");
        }
        self.apply_topics();
        self.release(gate);
        true
    }

    /// Removes a topic badge; removing the last one deselects.
    pub fn remove_topic(&mut self, topic: &str) -> bool {
        if !self.legend.contains(topic) {
            return false;
        }
        let Some(gate) = self.try_begin("remove topic") else {
            return false;
        };
        self.legend.remove(topic);
        self.apply_topics();
        self.release(gate);
        true
    }

    fn apply_topics(&mut self) {
        if self.legend.is_empty() {
            self.apply_deselect();
            return;
        }
        let groups = self.legend.groups();
        self.selection
            .select_groups(&mut self.mesh, self.papers.as_slice(), &groups, &self.colors);
        self.frame_selection();
        self.needs_redraw = true;
    }

    /// Animates the camera over the highlighted papers. Nothing to frame
    /// leaves the camera where it is.
    fn frame_selection(&mut self) {
        if !matches!(self.selection.mode(), SelectionMode::Multi) {
            return;
        }
        let points = self
            .selection
            .highlighted()
            .iter()
            .filter_map(|i| self.papers.get(i).map(|p| p.point));
        let Some(target) = self.camera.frame_target(points) else {
            return;
        };
        if self.camera.is_animating() {
            self.camera.retarget(target, self.frame.time);
        } else {
            self.camera.animate_to(target, self.frame.time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClickOutcome, Explorer, ExplorerEvent, ExplorerObserver, ExplorerOptions, NoopObserver,
    };
    use crate::mesh::{MaterialTier, MeshOptions, QuadSize};
    use crate::palette::CategoryPalette;
    use crate::paper::{Paper, PaperSet};
    use crate::selection::SelectionMode;
    use foundation::color::Rgb;
    use foundation::math::{Vec2, Vec3};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    const CENTER: Vec2 = Vec2 { x: 50.0, y: 50.0 };
    const CORNER: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    /// Unit quads along +x at 3-unit spacing; paper 0 sits under the
    /// initial camera when `means` is `(0.5, 0.5, 2.5)`.
    fn papers() -> PaperSet {
        PaperSet::from_papers((0..4).map(|i| {
            let cat = if i % 2 == 0 { "even" } else { "odd" };
            Paper::new(format!("10.1/{i}"), Vec3::new(i as f64 * 3.0, 0.0, 0.0))
                .with_category(cat, 1.0)
                .with_title(format!("Paper {i}"))
        }))
        .expect("unique dois")
    }

    fn options() -> ExplorerOptions {
        ExplorerOptions {
            mesh: MeshOptions {
                quad: QuadSize {
                    width: 1.0,
                    height: 1.0,
                },
                depth_offset: 0.0,
                ..MeshOptions::default()
            },
            palette: CategoryPalette::default()
                .with_color("even", Rgb(0x00aa00))
                .with_color("odd", Rgb(0xaa0000)),
            ..ExplorerOptions::default()
        }
    }

    fn explorer_with(observer: Box<dyn ExplorerObserver>) -> Explorer {
        let mut ex = Explorer::new(papers(), Some(Vec3::new(0.5, 0.5, 2.5)), options(), observer);
        ex.initialize(100.0, 100.0);
        ex
    }

    fn explorer() -> Explorer {
        explorer_with(Box::new(NoopObserver))
    }

    fn click(ex: &mut Explorer, at: Vec2) -> ClickOutcome {
        ex.pointer_down(at);
        ex.pointer_up(at)
    }

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl ExplorerObserver for Recorder {
        fn on_pick(&mut self, paper: usize, record: &Paper, neighbors: &[usize]) {
            self.0
                .borrow_mut()
                .push(format!("pick {paper} {} {}", record.doi, neighbors.len()));
        }

        fn on_deselect(&mut self) {
            self.0.borrow_mut().push("deselect".to_string());
        }

        fn on_hover(&mut self, hovered: Option<(usize, &Paper)>) {
            let title = hovered
                .and_then(|(_, p)| p.title.clone())
                .unwrap_or_else(|| "-".to_string());
            self.0.borrow_mut().push(format!("hover {title}"));
        }
    }

    #[test]
    fn click_on_quad_picks_paper_and_neighbors() {
        let mut ex = explorer();
        let ClickOutcome::Picked(ticket) = click(&mut ex, CENTER) else {
            panic!("expected a pick");
        };
        assert_eq!(ticket.paper, 0);
        assert_eq!(ticket.dois, vec!["10.1/0", "10.1/1", "10.1/2", "10.1/3"]);
        assert_eq!(
            ex.selection().mode(),
            &SelectionMode::Single {
                paper: 0,
                neighbors: vec![1, 2, 3]
            }
        );
        assert_eq!(ex.mesh().highlighted_count(), 4);
        assert!(ex.finish_selection(ticket));
    }

    #[test]
    fn gate_drops_actions_until_ticket_is_finished() {
        let mut ex = explorer();
        let ClickOutcome::Picked(ticket) = click(&mut ex, CENTER) else {
            panic!("expected a pick");
        };
        assert!(ex.is_busy());
        assert!(matches!(click(&mut ex, CENTER), ClickOutcome::Dropped));
        assert!(!ex.deselect_all());
        assert!(!ex.select_category("odd"));
        assert!(!ex.add_topic("t", vec!["10.1/1".to_string()]));

        assert!(ex.finish_selection(ticket));
        assert!(matches!(click(&mut ex, CORNER), ClickOutcome::Deselected));
        assert_eq!(ex.selection().mode(), &SelectionMode::None);
    }

    #[test]
    fn drag_is_left_alone() {
        let mut ex = explorer();
        ex.pointer_down(CENTER);
        let outcome = ex.pointer_up(Vec2::new(CENTER.x + 6.0, CENTER.y));
        assert!(matches!(outcome, ClickOutcome::Drag));
        assert_eq!(ex.selection().mode(), &SelectionMode::None);
    }

    #[test]
    fn actions_before_initialize_are_dropped() {
        let mut ex = Explorer::new(papers(), None, options(), Box::new(NoopObserver));
        assert!(ex.pick(0).is_none());
        assert!(!ex.deselect_all());
        assert!(!ex.select_category("even"));
    }

    #[test]
    fn observer_hears_pick_deselect_and_hover_changes() {
        let rec = Recorder::default();
        let log = rec.0.clone();
        let mut ex = explorer_with(Box::new(rec));

        ex.hover(CENTER);
        ex.hover(CENTER);
        ex.hover(CORNER);
        let ClickOutcome::Picked(ticket) = click(&mut ex, CENTER) else {
            panic!("expected a pick");
        };
        let _ = ex.finish_selection(ticket);
        assert!(ex.deselect_all());

        assert_eq!(
            *log.borrow(),
            vec!["hover Paper 0", "hover -", "pick 0 10.1/0 3", "deselect"]
        );
        let kinds: Vec<_> = ex.drain_events().into_iter().map(|e| e.payload).collect();
        assert_eq!(kinds.last(), Some(&ExplorerEvent::Deselected));
        assert!(ex.events().is_empty());
    }

    #[test]
    fn category_selection_uses_palette_color_and_frames() {
        let mut ex = explorer();
        assert!(ex.select_category("odd"));
        assert_eq!(ex.selection().mode(), &SelectionMode::Multi);
        assert_eq!(ex.mesh().paper_style(1), Some((Rgb(0xaa0000), MaterialTier::Primary)));
        assert_eq!(ex.mesh().paper_style(0), Some((Rgb::WHITE, MaterialTier::Default)));
        // Papers 1 and 3 sit at x = 3 and x = 9.
        assert_eq!(ex.camera().animation_target(), Some(Vec3::new(6.0, 0.0, 2.0)));
    }

    #[test]
    fn topics_union_and_last_removal_deselects() {
        let mut ex = explorer();
        assert!(ex.add_topic("a", vec!["10.1/0".into(), "10.1/1".into()]));
        assert!(ex.add_topic("b", vec!["10.1/1".into(), "10.1/2".into()]));
        assert!(!ex.add_topic("a", Vec::new()));
        assert_eq!(ex.selection().highlighted().len(), 3);

        let newest = ex.legend().badges()[0].color;
        assert_eq!(ex.mesh().paper_style(1).map(|s| s.0), Some(newest));

        assert!(ex.remove_topic("a"));
        assert_eq!(ex.selection().highlighted().len(), 2);
        assert!(ex.remove_topic("b"));
        assert_eq!(ex.selection().mode(), &SelectionMode::None);
        assert_eq!(ex.mesh().paper_style(0).map(|s| s.0), Some(Rgb(0x00aa00)));
    }

    #[test]
    fn tick_applies_tween_before_reporting_redraw() {
        let mut ex = explorer();
        assert!(ex.tick(0.0));
        assert!(!ex.tick(16.0));

        let dois: HashSet<String> = ["10.1/3".to_string()].into_iter().collect();
        assert!(ex.select_papers(&dois, Rgb(0x123456)));
        assert!(ex.tick(32.0));
        assert!(ex.camera().is_animating());
        let mid = ex.camera().position();
        assert!(ex.tick(600.0));
        assert!(ex.camera().position().x > mid.x);

        // User controls are ignored mid-flight.
        assert!(!ex.pan(10.0, 0.0));
        assert!(ex.tick(5000.0));
        assert!(!ex.camera().is_animating());
        assert!(ex.camera().position().distance(Vec3::new(9.0, 0.0, 2.0)) < 1e-9);
    }

    #[test]
    fn reframe_mid_flight_continues_from_the_live_position() {
        let mut ex = explorer();
        ex.tick(0.0);
        assert!(ex.select_category("odd"));
        ex.tick(600.0);
        let live = ex.camera().position();
        assert!(ex.camera().is_animating());

        let dois: HashSet<String> = ["10.1/3".to_string()].into_iter().collect();
        assert!(ex.select_papers(&dois, Rgb(0x123456)));
        assert!(ex.camera().is_animating());
        assert_eq!(ex.camera().animation_target(), Some(Vec3::new(9.0, 0.0, 2.0)));
        assert_eq!(ex.camera().position(), live);

        ex.tick(1700.0);
        assert!(ex.camera().is_animating());
        ex.tick(2000.0);
        assert!(!ex.camera().is_animating());
        assert!(ex.camera().position().distance(Vec3::new(9.0, 0.0, 2.0)) < 1e-9);
    }

    #[test]
    fn undrained_events_do_not_pile_up_across_ticks() {
        let mut ex = explorer();
        for i in 0..200 {
            ex.hover(if i % 2 == 0 { CENTER } else { CORNER });
            ex.tick(i as f64 * 16.0);
            assert_eq!(ex.events().len(), 1);
        }
        ex.tick(4000.0);
        assert!(ex.events().is_empty());
    }

    #[test]
    fn speed_setters_reach_the_camera() {
        let mut ex = explorer();
        assert!(ex.set_pan_speed(0.0));
        assert!(!ex.pan(10.0, 0.0));
        assert!(!ex.set_zoom_speed(-0.5));
        assert!(ex.set_zoom_speed(2.0));
        let before = ex.camera().position().z;
        assert!(ex.dolly(1.0));
        assert!((before - ex.camera().position().z - 2.0).abs() < 1e-9);
    }
}
