mod sim;

use core::cell::RefCell;
use std::path::PathBuf;

use clap::Parser;
use embassy_executor::{Executor, SpawnError, Spawner};
use embassy_net::{Config, Ipv4Address, Ipv4Cidr, Runner, Stack, StackResources};
use embassy_net_tuntap::TunTapDevice;
use heapless::Vec as HeaplessVec;
use hexapod_core::mk_static;
use hexapod_core::utils::config::HexapodConfig;
use hexapod_core::utils::connection::server::WsLink;
use hexapod_core::utils::controllers::{LedRing, ServoBoard};
use hexapod_core::utils::engine::dance::DanceActivity;
use hexapod_core::utils::engine::gesture::TouchPattern;
use hexapod_core::utils::engine::{EngineActivity, ModeEngine};
use hexapod_core::utils::scheduler::{self, ProductionVersion, TaskKind, TaskSpec};
use hexapod_core::utils::state::{Mode, RobotShared};
use hexapod_core::utils::tasks::{
    BatteryActivity, LedActivity, LinkActivity, ServoActivity, TouchActivity, WalkingActivity,
};
use hexapod_core::utils::wss;
use rand_core::{OsRng, RngCore};
use sim::{FileStore, SerialLedDriver, SimBattery, SimGait, SimI2c, SimTouch};
use static_cell::StaticCell;
use tracing::{error, info, warn};

type Servos = ServoBoard<'static, SimI2c, FileStore>;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// TAP device name
    #[clap(long, default_value = "tap0")]
    tap: String,
    /// use a static IP instead of DHCP
    #[clap(long)]
    static_ip: bool,
    /// run without the remote link (no network)
    #[clap(long)]
    no_link: bool,
    /// start in user mode, driven by an external controller
    #[clap(long)]
    user_mode: bool,
    /// empty-battery threshold in volts
    #[clap(long)]
    battery_empty_voltage: Option<f32>,
    /// simulated battery voltage at start
    #[clap(long, default_value_t = 8.2)]
    battery_voltage: f32,
    /// board revision reported by the production data
    #[clap(long, default_value_t = 3)]
    board_revision: u8,
    /// touch gestures to replay, e.g. `outer,outer,left,outer`
    #[clap(long, value_delimiter = ',')]
    gestures: Vec<String>,
    /// file the calibration offsets are kept in
    #[clap(long, default_value = "hexapod-calibration.bin")]
    calibration_file: PathBuf,
}

fn parse_gesture(name: &str) -> Option<TouchPattern> {
    serde_json::from_value(serde_json::Value::String(name.trim().to_owned())).ok()
}

fn spawned(
    spec: &TaskSpec,
    result: Result<(), SpawnError>,
) {
    if let Err(e) = result {
        error!(task = spec.name, ?e, "failed to spawn task");
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, TunTapDevice>) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn wss_task(stack: Stack<'static>) -> ! {
    stack.wait_config_up().await;
    wss(0, 8000, stack, None).await
}

#[embassy_executor::task]
async fn battery_task(
    spec: TaskSpec,
    activity: BatteryActivity<'static, SimBattery>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn walking_task(
    spec: TaskSpec,
    activity: WalkingActivity<'static, SimGait>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn servo_task(
    spec: TaskSpec,
    activity: ServoActivity<'static, Servos>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn led_task(
    spec: TaskSpec,
    activity: LedActivity<'static, LedRing<SerialLedDriver>>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn engine_task(
    spec: TaskSpec,
    activity: EngineActivity<'static>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn link_task(
    spec: TaskSpec,
    activity: LinkActivity<'static, WsLink>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn touch_task(
    spec: TaskSpec,
    activity: TouchActivity<'static, SimTouch>,
) -> ! {
    scheduler::run(&spec, activity).await
}

#[embassy_executor::task]
async fn dance_task(
    spec: TaskSpec,
    activity: DanceActivity<'static, SimGait>,
) -> ! {
    scheduler::run(&spec, activity).await
}

fn servo_board(
    shared: &'static RobotShared,
    calibration_file: PathBuf,
) -> Option<Servos> {
    let i2c_bus = mk_static!(RefCell<SimI2c>, RefCell::new(SimI2c));
    let mut board = match ServoBoard::new(i2c_bus, FileStore::new(calibration_file)) {
        Ok(board) => board,
        Err(e) => {
            error!(?e, "servo board init failed");
            return None;
        }
    };
    if let Err(e) = board.configure() {
        error!(?e, "servo board configure failed");
        return None;
    }
    match board.load_calibration() {
        Ok(offsets) => shared.lock(|state| state.servo.offsets = offsets),
        Err(e) => warn!(?e, "using zero calibration"),
    }
    Some(board)
}

fn network(
    spawner: &Spawner,
    opts: &Opts,
) -> Option<Stack<'static>> {
    let device = match TunTapDevice::new(&opts.tap) {
        Ok(device) => device,
        Err(e) => {
            warn!(tap = %opts.tap, ?e, "no TAP device, running without link");
            return None;
        }
    };
    let config = if opts.static_ip {
        Config::ipv4_static(embassy_net::StaticConfigV4 {
            address: Ipv4Cidr::new(Ipv4Address::new(192, 168, 69, 2), 24),
            dns_servers: HeaplessVec::new(),
            gateway: Some(Ipv4Address::new(192, 168, 69, 1)),
        })
    } else {
        Config::dhcpv4(Default::default())
    };
    let seed = OsRng.next_u64();

    let (stack, runner) = embassy_net::new(
        device,
        config,
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );
    if let Err(e) = spawner.spawn(net_task(runner)) {
        error!(?e, "failed to spawn network task");
        return None;
    }
    Some(stack)
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();

    let config = HexapodConfig::new(
        opts.user_mode.then_some(Mode::UserMode),
        opts.battery_empty_voltage,
        None,
    );
    let schedule = match scheduler::boot(
        &ProductionVersion {
            board_revision: opts.board_revision,
        },
        &config.periods,
    ) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(%e, "boot check failed, halting");
            return;
        }
    };

    let shared: &'static RobotShared = mk_static!(RobotShared, RobotShared::new(config.initial_mode));
    info!(mode = ?config.initial_mode, "robot state ready");

    let mut gestures: std::vec::Vec<TouchPattern> = opts
        .gestures
        .iter()
        .filter_map(|g| {
            let pattern = parse_gesture(g);
            if pattern.is_none() {
                warn!(gesture = %g, "unknown gesture ignored");
            }
            pattern
        })
        .collect();

    let stack = if opts.no_link { None } else { network(&spawner, &opts) };
    let mut mac = [0u8; 6];
    OsRng.fill_bytes(&mut mac);

    for spec in schedule.boot_order() {
        match spec.kind {
            TaskKind::Battery => {
                let battery = SimBattery::new(opts.battery_voltage, 0.001);
                spawned(&spec, spawner.spawn(battery_task(spec, BatteryActivity::new(shared, battery))));
            }
            TaskKind::Walking => {
                spawned(
                    &spec,
                    spawner.spawn(walking_task(spec, WalkingActivity::new(shared, SimGait::default()))),
                );
            }
            TaskKind::Servo => match servo_board(shared, opts.calibration_file.clone()) {
                Some(board) => {
                    spawned(&spec, spawner.spawn(servo_task(spec, ServoActivity::new(shared, board))))
                }
                None => error!("servo task not started"),
            },
            TaskKind::Led => {
                let ring = LedRing::new(SerialLedDriver::new(), Some(1000.0 / config.periods.led_ms as f32));
                spawned(&spec, spawner.spawn(led_task(spec, LedActivity::new(shared, ring))));
            }
            TaskKind::Engine => {
                let engine = ModeEngine::new(config.battery_empty_voltage, OsRng.next_u64());
                spawned(&spec, spawner.spawn(engine_task(spec, EngineActivity::new(shared, engine))));
            }
            TaskKind::Link => {
                let Some(stack) = stack else {
                    info!("remote link disabled");
                    continue;
                };
                spawned(&spec, spawner.spawn(wss_task(stack)));
                spawned(&spec, spawner.spawn(link_task(spec, LinkActivity::new(shared, WsLink::new(mac)))));
            }
            TaskKind::Touch => {
                let spacing = (2000 / config.periods.touch_ms.max(1)) as u32;
                let touch = SimTouch::new(std::mem::take(&mut gestures), spacing);
                spawned(&spec, spawner.spawn(touch_task(spec, TouchActivity::new(shared, touch))));
            }
            TaskKind::Dance => {
                let dance = DanceActivity::new(shared, SimGait::default(), config.periods.dance_frame());
                spawned(&spec, spawner.spawn(dance_task(spec, dance)));
            }
        }
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        if let Err(e) = spawner.spawn(main_task(spawner)) {
            error!(?e, "failed to spawn main task");
        }
    });
}
