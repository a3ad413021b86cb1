use tracing::{debug, info, warn};

use crate::geometry::{Point, Rect, ScaleContext};
use crate::mask::{Label, RegionSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectFace,
    SelectId,
    ResetCurrent,
    Commit,
    Abort,
}

/// Input to the capture state machine. Pointer positions are in display
/// (preview) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Command(Command),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { start: Point, current: Point },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Continue(CaptureSession),
    Committed(RegionSet),
    Aborted,
}

/// State of one capture session. Consumed and returned by [`CaptureSession::handle`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    scale: ScaleContext,
    regions: RegionSet,
    mode: Label,
    drag: DragState,
    warning: Option<String>,
}

impl CaptureSession {
    pub fn new(scale: ScaleContext) -> Self {
        Self::with_regions(scale, RegionSet::default())
    }

    /// Starts from previously saved regions, e.g. when re-capturing a mask.
    pub fn with_regions(scale: ScaleContext, regions: RegionSet) -> Self {
        Self {
            scale,
            regions,
            mode: Label::Face,
            drag: DragState::Idle,
            warning: None,
        }
    }

    pub fn scale(&self) -> &ScaleContext {
        &self.scale
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn mode(&self) -> Label {
        self.mode
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Rectangle being dragged, in display coordinates.
    pub fn pending_rect(&self) -> Option<Rect> {
        match self.drag {
            DragState::Dragging { start, current } => Some(Rect::from_corners(start, current)),
            DragState::Idle => None,
        }
    }

    pub fn handle(mut self, event: Event) -> Transition {
        match event {
            Event::PointerDown(point) => {
                if self.drag == DragState::Idle {
                    self.drag = DragState::Dragging {
                        start: point,
                        current: point,
                    };
                }
            }
            Event::PointerMove(point) => {
                if let DragState::Dragging { start, .. } = self.drag {
                    self.drag = DragState::Dragging {
                        start,
                        current: point,
                    };
                }
            }
            Event::PointerUp(end) => {
                if let DragState::Dragging { start, .. } = self.drag {
                    let drawn = Rect::from_corners(start, end);
                    let source = self.scale.to_source_rect(drawn);
                    debug!("{} region set to {} (drawn as {})", self.mode, source, drawn);
                    self.regions.set(self.mode, Some(source));
                    self.drag = DragState::Idle;
                    self.warning = None;
                }
            }
            Event::Command(command) => return self.command(command),
        }
        Transition::Continue(self)
    }

    fn command(mut self, command: Command) -> Transition {
        match command {
            Command::SelectFace => self.select(Label::Face),
            Command::SelectId => self.select(Label::Id),
            Command::ResetCurrent => {
                self.regions.set(self.mode, None);
                self.warning = None;
                info!("reset {} rectangle", self.mode.title());
            }
            Command::Commit => {
                if self.regions.is_complete() {
                    return Transition::Committed(self.regions);
                }
                let message = "Please draw both FACE and ID rectangles before saving!";
                warn!("{}", message);
                self.warning = Some(message.to_string());
            }
            Command::Abort => return Transition::Aborted,
        }
        Transition::Continue(self)
    }

    fn select(&mut self, label: Label) {
        if self.mode != label {
            info!("switched to {} mode", label.title());
        }
        self.mode = label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> CaptureSession {
        CaptureSession::new(ScaleContext::new(400, 300, 800))
    }

    fn step(session: CaptureSession, event: Event) -> CaptureSession {
        match session.handle(event) {
            Transition::Continue(next) => next,
            other => panic!("unexpected transition {:?}", other),
        }
    }

    fn drag(session: CaptureSession, from: (i32, i32), to: (i32, i32)) -> CaptureSession {
        let session = step(session, Event::PointerDown(Point::new(from.0, from.1)));
        let session = step(session, Event::PointerMove(Point::new(to.0, to.1)));
        step(session, Event::PointerUp(Point::new(to.0, to.1)))
    }

    fn cmd(session: CaptureSession, command: Command) -> CaptureSession {
        step(session, Event::Command(command))
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let forward = drag(session(), (10, 20), (60, 80));
        let backward = drag(session(), (60, 80), (10, 20));
        assert_eq!(forward.regions().face, Some(Rect::new(10, 20, 50, 60)));
        assert_eq!(forward.regions(), backward.regions());
    }

    #[test]
    fn drag_writes_to_active_mode() {
        let session = drag(session(), (1, 1), (5, 5));
        let session = cmd(session, Command::SelectId);
        let session = drag(session, (100, 100), (180, 120));
        assert_eq!(session.regions().face, Some(Rect::new(1, 1, 4, 4)));
        assert_eq!(session.regions().id, Some(Rect::new(100, 100, 80, 20)));
        assert_eq!(session.mode(), Label::Id);
    }

    #[test]
    fn drag_is_mapped_to_source_space() {
        let scaled = CaptureSession::new(ScaleContext::new(1000, 1600, 800));
        let session = drag(scaled, (10, 20), (40, 60));
        assert_eq!(session.regions().face, Some(Rect::new(20, 40, 60, 80)));
    }

    #[test]
    fn moving_only_updates_the_pending_rect() {
        let start = step(session(), Event::PointerDown(Point::new(5, 5)));
        let moved = step(start, Event::PointerMove(Point::new(25, 15)));
        assert_eq!(moved.pending_rect(), Some(Rect::new(5, 5, 20, 10)));
        assert_eq!(moved.regions(), &RegionSet::default());

        let idle = step(session(), Event::PointerMove(Point::new(3, 3)));
        assert_eq!(idle, session());
    }

    #[test]
    fn click_without_drag_writes_zero_size_rect() {
        let session = drag(session(), (7, 9), (7, 9));
        assert_eq!(session.regions().face, Some(Rect::new(7, 9, 0, 0)));
    }

    #[test]
    fn pointer_outside_canvas_is_not_clamped() {
        let session = drag(session(), (-10, 250), (420, 330));
        assert_eq!(session.regions().face, Some(Rect::new(-10, 250, 430, 80)));
    }

    #[test]
    fn extreme_drag_coordinates_do_not_overflow() {
        let events = crate::capture::surface::parse_line("drag -2000000000 0 2000000000 10")
            .expect("parse");
        let session = events.into_iter().fold(session(), step);
        assert_eq!(
            session.regions().face,
            Some(Rect::new(-2_000_000_000, 0, i32::MAX, 10))
        );
        assert_eq!(session.drag(), DragState::Idle);
    }

    #[test]
    fn stray_pointer_up_is_ignored() {
        let session = step(session(), Event::PointerUp(Point::new(5, 5)));
        assert_eq!(session.regions(), &RegionSet::default());
        assert_eq!(session.drag(), DragState::Idle);
    }

    #[test]
    fn second_pointer_down_keeps_original_start() {
        let session = step(session(), Event::PointerDown(Point::new(5, 5)));
        let session = step(session, Event::PointerDown(Point::new(50, 50)));
        let session = step(session, Event::PointerUp(Point::new(20, 20)));
        assert_eq!(session.regions().face, Some(Rect::new(5, 5, 15, 15)));
    }

    #[test]
    fn commit_requires_both_regions() {
        let session = cmd(session(), Command::Commit);
        assert!(session.warning().is_some());

        let session = drag(session, (1, 1), (10, 10));
        assert!(session.warning().is_none());
        let session = cmd(session, Command::Commit);
        assert!(session.warning().is_some());

        let session = cmd(session, Command::SelectId);
        let session = drag(session, (20, 20), (40, 30));
        match session.handle(Event::Command(Command::Commit)) {
            Transition::Committed(regions) => {
                assert_eq!(regions.face, Some(Rect::new(1, 1, 9, 9)));
                assert_eq!(regions.id, Some(Rect::new(20, 20, 20, 10)));
            }
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[test]
    fn reset_clears_only_current_region() {
        let session = drag(session(), (1, 1), (10, 10));
        let session = cmd(session, Command::SelectId);
        let session = drag(session, (20, 20), (40, 30));
        let session = cmd(session, Command::ResetCurrent);
        assert!(session.regions().face.is_some());
        assert!(session.regions().id.is_none());

        match session.handle(Event::Command(Command::Commit)) {
            Transition::Continue(next) => assert!(next.warning().is_some()),
            other => panic!("commit should be a no-op, got {:?}", other),
        }
    }

    #[test]
    fn abort_ends_without_result() {
        let session = drag(session(), (1, 1), (10, 10));
        let session = step(session, Event::PointerDown(Point::new(3, 3)));
        assert_eq!(session.handle(Event::Command(Command::Abort)), Transition::Aborted);
    }

    #[test]
    fn commands_work_mid_drag() {
        let session = step(session(), Event::PointerDown(Point::new(0, 0)));
        let session = cmd(session, Command::SelectId);
        let session = step(session, Event::PointerUp(Point::new(30, 10)));
        assert_eq!(session.regions().id, Some(Rect::new(0, 0, 30, 10)));
        assert!(session.regions().face.is_none());
    }
}
