use std::collections::VecDeque;
use std::convert::Infallible;

use embassy_futures::{block_on, join::join, select::select};
use embassy_time::{Duration, Timer};
use hexapod_core::utils::controllers::{
    BatterySensor, GaitEngine, LedActuator, LinkCommand, ServoActuator, TouchSensor, WirelessLink,
};
use hexapod_core::utils::engine::dance::DanceActivity;
use hexapod_core::utils::engine::gesture::TouchPattern;
use hexapod_core::utils::scheduler::{self, Activity, Cadence, TaskKind, TaskSpec};
use hexapod_core::utils::state::{
    BatteryReading, CalibrationOffsets, Color, HeightClass, InputData, JointTargets, LedControl,
    LedMode, MotionSource, Mode, RobotShared, ServoControl, SERVO_COUNT,
};
use hexapod_core::utils::tasks::{
    BatteryActivity, LedActivity, LinkActivity, ServoActivity, TouchActivity, WalkingActivity,
};
use hexapod_core::utils::config::TaskPeriods;

#[derive(Default)]
struct RecordingServos {
    writes: Vec<ServoControl>,
    persisted: Vec<CalibrationOffsets>,
}

impl ServoActuator for RecordingServos {
    type Error = Infallible;

    fn write_current_targets(
        &mut self,
        ctrl: &ServoControl,
    ) -> Result<(), Self::Error> {
        self.writes.push(*ctrl);
        Ok(())
    }

    fn persist_calibration(
        &mut self,
        offsets: &CalibrationOffsets,
    ) -> Result<(), Self::Error> {
        self.persisted.push(*offsets);
        Ok(())
    }
}

struct FakeBattery {
    voltage: f32,
    recalibrations: usize,
}

impl BatterySensor for FakeBattery {
    type Error = Infallible;

    fn sample(&mut self) -> Result<BatteryReading, Self::Error> {
        Ok(BatteryReading {
            voltage: self.voltage,
            percentage: 50,
        })
    }

    fn recalibrate_zero_point(&mut self) -> Result<(), Self::Error> {
        self.recalibrations += 1;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingLeds {
    parametric: usize,
    manual: usize,
    flushes: usize,
}

impl LedActuator for RecordingLeds {
    type Error = Infallible;

    fn render_parametric(
        &mut self,
        _ctrl: &LedControl,
    ) {
        self.parametric += 1;
    }

    fn render_manual(
        &mut self,
        _ctrl: &LedControl,
    ) {
        self.manual += 1;
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

struct ScriptedTouch {
    script: VecDeque<Option<TouchPattern>>,
    current: Option<TouchPattern>,
}

impl TouchSensor for ScriptedTouch {
    type Error = Infallible;

    fn sample(&mut self) -> Result<(), Self::Error> {
        self.current = self.script.pop_front().flatten();
        Ok(())
    }

    fn has_gesture(&self) -> bool {
        self.current.is_some()
    }

    fn decode_gesture(
        &mut self,
        latch: bool,
    ) -> TouchPattern {
        let pattern = self.current.unwrap_or(TouchPattern::Released);
        if latch {
            self.current = None;
        }
        pattern
    }
}

#[derive(Default)]
struct RecordingGait {
    steps: Vec<(InputData, HeightClass)>,
    frames: Vec<u32>,
}

impl GaitEngine for RecordingGait {
    type Error = Infallible;

    fn advance(
        &mut self,
        input: &InputData,
        height: HeightClass,
    ) -> Result<JointTargets, Self::Error> {
        self.steps.push((*input, height));
        Ok(JointTargets([input.speed; SERVO_COUNT]))
    }

    fn render_dance_frame(
        &mut self,
        frame: u32,
    ) -> Result<JointTargets, Self::Error> {
        self.frames.push(frame);
        Ok(JointTargets([frame as f32; SERVO_COUNT]))
    }
}

#[derive(Default)]
struct FakeLink {
    advertised: Option<String>,
    published: Vec<u8>,
    inbox: VecDeque<LinkCommand>,
}

impl WirelessLink for FakeLink {
    type Error = Infallible;

    fn hardware_address(&self) -> [u8; 6] {
        [0, 0, 0, 0, 0, 3]
    }

    fn start_advertising(
        &mut self,
        name: &str,
    ) -> Result<(), Self::Error> {
        self.advertised = Some(name.to_string());
        Ok(())
    }

    fn connected_peer_count(&self) -> u32 {
        2
    }

    fn publish_battery(
        &mut self,
        percentage: u8,
    ) -> Result<(), Self::Error> {
        self.published.push(percentage);
        Ok(())
    }

    fn poll_command(&mut self) -> Option<LinkCommand> {
        self.inbox.pop_front()
    }
}

#[test]
fn servo_task_persists_once_per_request() {
    let shared = RobotShared::new(Mode::Calibration);
    let mut offsets = CalibrationOffsets::default();
    offsets.adjust(2, 1, -20);
    shared.request_calibration_store(offsets);

    let mut task = ServoActivity::new(&shared, RecordingServos::default());
    block_on(async {
        assert_eq!(task.tick().await, Cadence::Steady);
        task.tick().await;
    });

    assert_eq!(task.servos().persisted, vec![offsets]);
    assert_eq!(task.servos().writes.len(), 2);
    assert!(task.servos().writes[0].power);
}

#[test]
fn battery_task_reads_at_setup_and_recalibrates_on_request() {
    let shared = RobotShared::new(Mode::Standby);
    let mut task = BatteryActivity::new(
        &shared,
        FakeBattery {
            voltage: 7.2,
            recalibrations: 0,
        },
    );

    block_on(task.setup());
    assert_eq!(shared.lock(|s| s.battery.map(|b| b.voltage)), Some(7.2));

    shared.battery_recalibrate.request();
    block_on(async {
        task.tick().await;
        task.tick().await;
    });
    assert_eq!(task.sensor().recalibrations, 1);
    assert!(!shared.battery_recalibrate.take());
}

#[test]
fn led_task_follows_led_mode() {
    let shared = RobotShared::new(Mode::Standby);
    let mut task = LedActivity::new(&shared, RecordingLeds::default());
    block_on(task.tick());
    shared.lock(|s| s.led.mode = LedMode::Manual);
    block_on(task.tick());

    assert_eq!(task.leds().parametric, 1);
    assert_eq!(task.leds().manual, 1);
    assert_eq!(task.leds().flushes, 2);
}

#[test]
fn touch_task_posts_detected_gestures() {
    let shared = RobotShared::new(Mode::Standby);
    let touch = ScriptedTouch {
        script: VecDeque::from([None, Some(TouchPattern::Outer), None]),
        current: None,
    };
    let mut task = TouchActivity::new(&shared, touch);

    block_on(task.tick());
    assert_eq!(shared.take_touch(), None);
    block_on(task.tick());
    assert_eq!(shared.take_touch(), Some(TouchPattern::Outer));
    block_on(task.tick());
    assert_eq!(shared.take_touch(), None);
}

#[test]
fn walking_task_pauses_while_dancing() {
    let shared = RobotShared::new(Mode::Walk);
    shared.lock(|s| {
        s.move_input.source = MotionSource::Remote;
        s.move_input.remote.speed = 0.5;
        s.move_input.height = HeightClass::Normal;
    });
    let mut task = WalkingActivity::new(&shared, RecordingGait::default());

    block_on(task.tick());
    assert_eq!(shared.lock(|s| s.servo.targets.0[0]), 0.5);

    shared.lock(|s| {
        s.move_input.source = MotionSource::Dance;
        s.servo.targets = JointTargets([9.0; SERVO_COUNT]);
    });
    block_on(task.tick());
    assert_eq!(shared.lock(|s| s.servo.targets.0[0]), 9.0);
    assert_eq!(task.gait().steps.len(), 1);
    assert_eq!(task.gait().steps[0].1, HeightClass::Normal);
}

#[test]
fn link_task_advertises_and_routes_commands() {
    let shared = RobotShared::new(Mode::Walk);
    shared.lock(|s| {
        s.battery = Some(BatteryReading {
            voltage: 7.4,
            percentage: 64,
        })
    });
    let remote = InputData {
        speed: 0.25,
        led_primary: Color::CYAN,
        ..InputData::default()
    };
    let link = FakeLink {
        inbox: VecDeque::from([LinkCommand::M(remote), LinkCommand::RecalibrateBattery]),
        ..FakeLink::default()
    };
    let mut task = LinkActivity::new(&shared, link);

    block_on(task.setup());
    // Address bytes sum to 3.
    assert_eq!(task.link().advertised.as_deref(), Some("Hexapod Tuna"));

    block_on(task.tick());
    let state = shared.snapshot();
    assert_eq!(state.connected_peers, 2);
    assert_eq!(state.move_input.remote, remote);
    assert_eq!(task.link().published, vec![64]);
    assert!(shared.battery_recalibrate.take());
}

#[test]
fn dance_sojourn_runs_until_mode_changes() {
    let shared = RobotShared::new(Mode::Dance);
    let mut dance = DanceActivity::new(&shared, RecordingGait::default(), Duration::from_millis(1));

    let (frames, _) = block_on(join(dance.sojourn(), async {
        Timer::after_millis(30).await;
        shared.lock(|s| s.mode = Mode::Walk);
    }));

    assert!(frames > 0);
    let rendered = &dance.gait().frames;
    assert_eq!(rendered.len() as u32, frames);
    assert!(rendered.iter().enumerate().all(|(i, f)| *f == i as u32));
    assert_eq!(shared.lock(|s| s.dance_frame), 0);
    assert_eq!(shared.lock(|s| s.servo.targets.0[0]), (frames - 1) as f32);
}

#[test]
fn dance_tick_is_steady_outside_dance() {
    let shared = RobotShared::new(Mode::Walk);
    shared.lock(|s| s.dance_frame = 7);
    let mut dance = DanceActivity::new(&shared, RecordingGait::default(), Duration::from_millis(1));
    assert_eq!(block_on(dance.tick()), Cadence::Steady);
    assert_eq!(shared.lock(|s| s.dance_frame), 0);
    assert!(dance.gait().frames.is_empty());
}

struct Counter<'a> {
    setups: &'a core::cell::Cell<u32>,
    ticks: &'a core::cell::Cell<u32>,
}

impl Activity for Counter<'_> {
    async fn setup(&mut self) {
        self.setups.set(self.setups.get() + 1);
    }

    async fn tick(&mut self) -> Cadence {
        self.ticks.set(self.ticks.get() + 1);
        Cadence::Steady
    }
}

#[test]
fn runner_sets_up_once_then_ticks_periodically() {
    let setups = core::cell::Cell::new(0);
    let ticks = core::cell::Cell::new(0);
    let schedule = scheduler::Schedule::new(&TaskPeriods::default());
    let spec: TaskSpec = schedule.spec(TaskKind::Servo);

    block_on(select(
        scheduler::run(
            &spec,
            Counter {
                setups: &setups,
                ticks: &ticks,
            },
        ),
        Timer::after_millis(105),
    ));

    assert_eq!(setups.get(), 1);
    // 10 ms period over ~105 ms.
    assert!(ticks.get() >= 5, "ticks = {}", ticks.get());
    assert!(ticks.get() <= 12, "ticks = {}", ticks.get());
}

fn spin(work: std::time::Duration) {
    let start = std::time::Instant::now();
    while start.elapsed() < work {
        core::hint::spin_loop();
    }
}

/// Burns CPU inside every tick and records when each tick began.
struct BusyWork<'a> {
    work: std::time::Duration,
    /// First tick overruns by this much and reports `first_cadence`.
    first_overrun: std::time::Duration,
    first_cadence: Cadence,
    starts: &'a core::cell::RefCell<Vec<std::time::Instant>>,
}

impl Activity for BusyWork<'_> {
    async fn tick(&mut self) -> Cadence {
        let first = {
            let mut starts = self.starts.borrow_mut();
            starts.push(std::time::Instant::now());
            starts.len() == 1
        };
        if first {
            spin(self.first_overrun);
            return self.first_cadence;
        }
        spin(self.work);
        Cadence::Steady
    }
}

fn run_busy(
    activity: BusyWork<'_>,
    window_ms: u64,
) {
    let spec = scheduler::Schedule::new(&TaskPeriods::default()).spec(TaskKind::Servo);
    block_on(select(scheduler::run(&spec, activity), Timer::after_millis(window_ms)));
}

#[test]
fn work_inside_a_tick_does_not_push_later_deadlines() {
    let starts = core::cell::RefCell::new(Vec::new());
    run_busy(
        BusyWork {
            work: std::time::Duration::from_millis(4),
            first_overrun: std::time::Duration::from_millis(4),
            first_cadence: Cadence::Steady,
            starts: &starts,
        },
        205,
    );

    // 10 ms deadlines over 205 ms; sleeping 10 ms after 4 ms of work would
    // give about 14.
    let ticks = starts.borrow().len();
    assert!((18..=21).contains(&ticks), "ticks = {ticks}");
}

#[test]
fn resync_after_overrun_skips_missed_deadlines() {
    let overrun = std::time::Duration::from_millis(35);

    let starts = core::cell::RefCell::new(Vec::new());
    run_busy(
        BusyWork {
            work: std::time::Duration::ZERO,
            first_overrun: overrun,
            first_cadence: Cadence::Resync,
            starts: &starts,
        },
        100,
    );
    let starts = starts.into_inner();
    // One full period after the overrun ends, then evenly spaced.
    assert!(starts[1] - starts[0] >= overrun + std::time::Duration::from_millis(8));
    for pair in starts[1..].windows(2) {
        assert!(pair[1] - pair[0] >= std::time::Duration::from_millis(8));
    }
    assert!(starts.len() <= 7, "ticks = {}", starts.len());

    // The same overrun reported as steady is followed by a burst of
    // catch-up ticks.
    let steady = core::cell::RefCell::new(Vec::new());
    run_busy(
        BusyWork {
            work: std::time::Duration::ZERO,
            first_overrun: overrun,
            first_cadence: Cadence::Steady,
            starts: &steady,
        },
        100,
    );
    let steady = steady.into_inner();
    assert!(steady[2] - steady[1] < std::time::Duration::from_millis(3));
    assert!(steady.len() > starts.len());
}
