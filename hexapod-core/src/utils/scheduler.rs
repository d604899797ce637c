//! Fixed-rate task scheduling.
//!
//! Every task is an [`Activity`] driven by [`run`]: one-time setup, then one
//! unit of work per period. Waiting goes through `embassy_time::Ticker`, whose
//! deadlines advance by exactly one period from the previous deadline, so
//! execution jitter never accumulates into drift.
//!
//! [`boot`] runs the version check and, only if it passes, returns the task
//! table. Priorities and execution contexts are informational on the
//! cooperative host executor: there a task never preempts another, and the
//! only effect of a priority is the spawn order from [`Schedule::boot_order`].
//! Every task runs on the application core.

use core::ops::RangeInclusive;

use embassy_time::{Duration, Ticker};

use crate::utils::config::TaskPeriods;

/// Outcome of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Steady,
    /// The tick overran on purpose (nested loop); restart deadlines from now
    /// instead of catching up on missed ones.
    Resync,
}

/// A periodic activity.
#[allow(async_fn_in_trait)]
pub trait Activity {
    /// Runs once before the first period starts.
    async fn setup(&mut self) {}

    /// One unit of work.
    async fn tick(&mut self) -> Cadence;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

/// Core / executor a task is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Core running the application.
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Battery,
    Walking,
    Servo,
    Led,
    Engine,
    Link,
    Touch,
    Dance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub name: &'static str,
    pub period: Duration,
    pub priority: Priority,
    /// Priority used until setup has finished, if higher than `priority`.
    pub boot_priority: Option<Priority>,
    pub context: ExecutionContext,
}

impl TaskSpec {
    const fn new(
        kind: TaskKind,
        name: &'static str,
        period_ms: u64,
        priority: u8,
    ) -> Self {
        Self {
            kind,
            name,
            period: Duration::from_millis(period_ms),
            priority: Priority(priority),
            boot_priority: None,
            context: ExecutionContext::Application,
        }
    }

    /// Priority that decides start order.
    pub fn start_priority(&self) -> Priority {
        self.boot_priority.unwrap_or(self.priority)
    }
}

pub const TASK_COUNT: usize = 8;

/// The fixed task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    tasks: [TaskSpec; TASK_COUNT],
}

impl Schedule {
    pub fn new(p: &TaskPeriods) -> Self {
        let mut battery = TaskSpec::new(TaskKind::Battery, "battery", p.battery_ms, 2);
        // First safety read happens before anything else gets the CPU.
        battery.boot_priority = Some(Priority(5));

        Self {
            tasks: [
                battery,
                TaskSpec::new(TaskKind::Walking, "walking", p.walk_ms, 1),
                TaskSpec::new(TaskKind::Servo, "servo", p.servo_ms, 3),
                TaskSpec::new(TaskKind::Led, "led", p.led_ms, 5),
                TaskSpec::new(TaskKind::Engine, "engine", p.engine_ms, 3),
                TaskSpec::new(TaskKind::Link, "link", p.link_ms, 3),
                TaskSpec::new(TaskKind::Touch, "touch", p.touch_ms, 3),
                TaskSpec::new(TaskKind::Dance, "dance", p.dance_ms, 4),
            ],
        }
    }

    pub fn spec(
        &self,
        kind: TaskKind,
    ) -> TaskSpec {
        // Every kind has exactly one entry.
        self.tasks[self.index_of(kind)]
    }

    fn index_of(
        &self,
        kind: TaskKind,
    ) -> usize {
        self.tasks.iter().position(|t| t.kind == kind).unwrap_or(0)
    }

    pub fn tasks(&self) -> &[TaskSpec; TASK_COUNT] {
        &self.tasks
    }

    /// Tasks sorted by start priority, highest first; ties keep table order.
    pub fn boot_order(&self) -> [TaskSpec; TASK_COUNT] {
        let mut order = self.tasks;
        order.sort_unstable_by(|a, b| {
            b.start_priority()
                .cmp(&a.start_priority())
                .then(self.index_of(a.kind).cmp(&self.index_of(b.kind)))
        });
        order
    }
}

/// Unrecoverable start-up failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    VersionMismatch {
        found: u8,
        supported: RangeInclusive<u8>,
    },
}

impl core::fmt::Display for BootError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            BootError::VersionMismatch { found, supported } => write!(
                f,
                "board revision {} not supported (expected {}..={})",
                found,
                supported.start(),
                supported.end()
            ),
        }
    }
}

/// Hardware/firmware compatibility gate run once before scheduling.
pub trait VersionCheck {
    fn check(&self) -> Result<(), BootError>;
}

/// Board revisions this firmware drives.
pub const SUPPORTED_BOARD_REVISIONS: RangeInclusive<u8> = 2..=4;

/// Revision read from the production data of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionVersion {
    pub board_revision: u8,
}

impl VersionCheck for ProductionVersion {
    fn check(&self) -> Result<(), BootError> {
        if SUPPORTED_BOARD_REVISIONS.contains(&self.board_revision) {
            Ok(())
        } else {
            Err(BootError::VersionMismatch {
                found: self.board_revision,
                supported: SUPPORTED_BOARD_REVISIONS,
            })
        }
    }
}

/// Check compatibility and hand out the task table. No task may be spawned
/// when this fails.
pub fn boot(
    version: &impl VersionCheck,
    periods: &TaskPeriods,
) -> Result<Schedule, BootError> {
    version.check()?;
    let schedule = Schedule::new(periods);
    tracing::info!(tasks = TASK_COUNT, "version check passed, schedule ready");
    Ok(schedule)
}

/// Drive `activity` forever at the cadence in `spec`.
pub async fn run<A: Activity>(
    spec: &TaskSpec,
    mut activity: A,
) -> ! {
    tracing::info!(task = spec.name, period_us = spec.period.as_micros(), "task started");
    activity.setup().await;

    let mut ticker = Ticker::every(spec.period);
    loop {
        ticker.next().await;
        if activity.tick().await == Cadence::Resync {
            ticker.reset();
        }
    }
}
