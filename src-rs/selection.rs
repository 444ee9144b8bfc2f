use crate::config::Config;
use crate::corners::{corner_hit, CornerActions};
use crate::input::Record;
use crate::layout::Layout;
use std::thread;
use std::time::{Duration, Instant};

/// Pause between polls while nothing has resolved.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit status for a quit without a selection.
pub const ABORT_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerMoved { x: i32, y: i32 },
    /// Left button released at the last known pointer position.
    LeftReleased,
    /// Quit key or window close request.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Selected(Vec<u8>),
    TimedOut(Vec<u8>),
    Aborted,
}

impl Outcome {
    /// Bytes for stdout; `None` when nothing must be printed.
    pub fn action(&self) -> Option<&[u8]> {
        match self {
            Outcome::Selected(action) | Outcome::TimedOut(action) => Some(action),
            Outcome::Aborted => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Selected(_) | Outcome::TimedOut(_) => 0,
            Outcome::Aborted => ABORT_EXIT_CODE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Running,
    Resolved(Outcome),
}

/// Where pending input comes from. The window backend implements this; tests
/// script it.
pub trait EventSource {
    /// Everything queued since the last call, oldest first. Must not block.
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

/// Turns clicks, quits and the countdown into exactly one [`Outcome`].
/// Once resolved, further input is ignored.
#[derive(Debug)]
pub struct SelectionController {
    layout: Layout,
    actions: Vec<Vec<u8>>,
    corners: CornerActions,
    deadline: Option<Instant>,
    default_action: Vec<u8>,
    /// Unknown until the first pointer motion.
    pointer: Option<(i32, i32)>,
    state: State,
}

impl SelectionController {
    pub fn new(
        config: &Config,
        layout: Layout,
        records: &[Record],
        corners: CornerActions,
        started: Instant,
    ) -> Self {
        Self {
            layout,
            actions: records.iter().map(|r| r.action.clone()).collect(),
            corners,
            deadline: config.timeout.map(|timeout| started + timeout),
            default_action: config.default_action.as_bytes().to_vec(),
            pointer: None,
            state: State::Running,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            State::Resolved(outcome) => Some(outcome),
            State::Running => None,
        }
    }

    pub fn handle(&mut self, event: InputEvent) -> Option<&Outcome> {
        if let State::Running = self.state {
            match event {
                InputEvent::PointerMoved { x, y } => self.pointer = Some((x, y)),
                InputEvent::LeftReleased => match self.pointer {
                    Some((x, y)) => {
                        if let Some(action) = self.action_at(x, y) {
                            self.resolve(Outcome::Selected(action));
                        }
                    }
                    None => log::debug!("release before any pointer motion, ignored"),
                },
                InputEvent::Quit => self.resolve(Outcome::Aborted),
            }
        }
        self.outcome()
    }

    /// Resolve with the default action once `now` is past the deadline.
    pub fn tick(&mut self, now: Instant) -> Option<&Outcome> {
        let expired = self.deadline.is_some_and(|deadline| now > deadline);
        if expired && matches!(self.state, State::Running) {
            log::info!("timeout reached, using default action");
            self.resolve(Outcome::TimedOut(self.default_action.clone()));
        }
        self.outcome()
    }

    /// Corners win over grid cells; the first match in hit order is used.
    pub fn action_at(&self, x: i32, y: i32) -> Option<Vec<u8>> {
        let screen = self.layout.screen;
        let corner = self.corners.iter().find(|(corner, _)| {
            corner_hit(screen.w, screen.h, x, y, self.layout.corner_radius2, *corner)
        });
        if let Some((corner, action)) = corner {
            log::debug!("click at ({x}, {y}) hit corner {}", corner.tag());
            return Some(action.to_vec());
        }
        let index = self.layout.cell_at(x, y)?;
        log::debug!("click at ({x}, {y}) hit cell {index}");
        self.actions.get(index).cloned()
    }

    fn resolve(&mut self, outcome: Outcome) {
        self.state = State::Resolved(outcome);
    }
}

/// Poll until resolved: drain queued events in order, then check the
/// countdown, then sleep for [`POLL_INTERVAL`].
pub fn run_until_resolved<S: EventSource>(
    controller: &mut SelectionController,
    source: &mut S,
) -> Outcome {
    loop {
        for event in source.poll_events() {
            if let Some(outcome) = controller.handle(event) {
                return outcome.clone();
            }
        }
        if let Some(outcome) = controller.tick(Instant::now()) {
            return outcome.clone();
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::Corner;
    use crate::input::DisplayRef;
    use std::collections::VecDeque;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                display: DisplayRef::Path(format!("app{i}.png").into()),
                action: format!("action-{i}").into_bytes(),
            })
            .collect()
    }

    fn controller(config: &Config, corners: CornerActions, start: Instant) -> SelectionController {
        let layout = Layout::new(900, 600, 5, false);
        SelectionController::new(config, layout, &records(5), corners, start)
    }

    struct Scripted {
        batches: VecDeque<Vec<InputEvent>>,
    }

    impl EventSource for Scripted {
        fn poll_events(&mut self) -> Vec<InputEvent> {
            self.batches.pop_front().unwrap_or_default()
        }
    }

    #[test]
    fn click_in_cell_two_selects_record_two() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        // 3x2 grid of 300x300 cells; cell 2 spans x 600..900, y 0..300
        c.handle(InputEvent::PointerMoved { x: 700, y: 150 });
        let outcome = c.handle(InputEvent::LeftReleased).cloned();
        assert_eq!(outcome, Some(Outcome::Selected(b"action-2".to_vec())));
        assert_eq!(outcome.unwrap().exit_code(), 0);
    }

    #[test]
    fn release_before_any_motion_is_ignored() {
        let mut corners = CornerActions::default();
        corners.set(Corner::NorthWest, Some(b"corner-nw".to_vec()));
        let mut c = controller(&Config::default(), corners, Instant::now());
        assert_eq!(c.handle(InputEvent::LeftReleased), None);
        c.handle(InputEvent::PointerMoved { x: 700, y: 150 });
        assert_eq!(
            c.handle(InputEvent::LeftReleased),
            Some(&Outcome::Selected(b"action-2".to_vec()))
        );
    }

    #[test]
    fn empty_action_is_a_valid_selection() {
        let layout = Layout::new(900, 600, 1, false);
        let records = vec![Record {
            display: DisplayRef::Label("blank".to_string()),
            action: Vec::new(),
        }];
        let mut c = SelectionController::new(
            &Config::default(),
            layout,
            &records,
            CornerActions::default(),
            Instant::now(),
        );
        c.handle(InputEvent::PointerMoved { x: 450, y: 300 });
        let outcome = c.handle(InputEvent::LeftReleased).cloned().unwrap();
        assert_eq!(outcome, Outcome::Selected(Vec::new()));
        assert_eq!(outcome.action(), Some(&b""[..]));
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn click_outside_any_cell_keeps_running() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        // sixth cell of the 3x2 grid has no record
        c.handle(InputEvent::PointerMoved { x: 800, y: 450 });
        assert_eq!(c.handle(InputEvent::LeftReleased), None);
        assert_eq!(c.outcome(), None);
    }

    #[test]
    fn corner_beats_overlapping_cell() {
        let mut corners = CornerActions::default();
        corners.set(Corner::NorthWest, Some(b"corner-nw".to_vec()));
        let mut c = controller(&Config::default(), corners, Instant::now());
        c.handle(InputEvent::PointerMoved { x: 2, y: 2 });
        assert_eq!(
            c.handle(InputEvent::LeftReleased),
            Some(&Outcome::Selected(b"corner-nw".to_vec()))
        );
    }

    #[test]
    fn empty_corner_slot_falls_through_to_grid() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        c.handle(InputEvent::PointerMoved { x: 899, y: 599 });
        // SE corner has no action; the point is in the empty sixth cell
        assert_eq!(c.handle(InputEvent::LeftReleased), None);
        c.handle(InputEvent::PointerMoved { x: 0, y: 0 });
        assert_eq!(
            c.handle(InputEvent::LeftReleased),
            Some(&Outcome::Selected(b"action-0".to_vec()))
        );
    }

    #[test]
    fn timeout_emits_default_after_deadline() {
        let config = Config {
            timeout: Some(Duration::from_secs(1)),
            default_action: "fallback".to_string(),
            ..Config::default()
        };
        let start = Instant::now();
        let mut c = controller(&config, CornerActions::default(), start);
        assert_eq!(c.tick(start + Duration::from_millis(500)), None);
        assert_eq!(c.tick(start + Duration::from_secs(1)), None);
        let outcome = c.tick(start + Duration::from_millis(1100)).cloned();
        assert_eq!(outcome, Some(Outcome::TimedOut(b"fallback".to_vec())));
        assert_eq!(outcome.as_ref().and_then(Outcome::action), Some(b"fallback".as_slice()));
        assert_eq!(outcome.unwrap().exit_code(), 0);
    }

    #[test]
    fn disabled_timeout_never_fires() {
        let start = Instant::now();
        let mut c = controller(&Config::default(), CornerActions::default(), start);
        assert_eq!(c.tick(start + Duration::from_secs(3600)), None);
    }

    #[test]
    fn quit_aborts_without_output() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        let outcome = c.handle(InputEvent::Quit).cloned().unwrap();
        assert_eq!(outcome, Outcome::Aborted);
        assert_eq!(outcome.action(), None);
        assert_ne!(outcome.exit_code(), 0);
    }

    #[test]
    fn resolution_is_final() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        c.handle(InputEvent::Quit);
        c.handle(InputEvent::PointerMoved { x: 10, y: 10 });
        assert_eq!(c.handle(InputEvent::LeftReleased), Some(&Outcome::Aborted));
    }

    #[test]
    fn loop_processes_events_in_arrival_order() {
        let mut c = controller(&Config::default(), CornerActions::default(), Instant::now());
        let mut source = Scripted {
            batches: VecDeque::from(vec![
                vec![],
                vec![
                    InputEvent::PointerMoved { x: 350, y: 350 },
                    InputEvent::LeftReleased,
                    InputEvent::Quit,
                ],
            ]),
        };
        let outcome = run_until_resolved(&mut c, &mut source);
        assert_eq!(outcome, Outcome::Selected(b"action-4".to_vec()));
    }

    #[test]
    fn loop_times_out_without_input() {
        let config = Config {
            timeout: Some(Duration::from_secs(1)),
            default_action: "later".to_string(),
            ..Config::default()
        };
        let mut c = controller(&config, CornerActions::default(), Instant::now());
        let mut source = Scripted {
            batches: VecDeque::new(),
        };
        let started = Instant::now();
        let outcome = run_until_resolved(&mut c, &mut source);
        assert!(started.elapsed() > Duration::from_millis(900));
        assert_eq!(outcome, Outcome::TimedOut(b"later".to_vec()));
    }
}
