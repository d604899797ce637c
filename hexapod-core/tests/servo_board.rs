use core::cell::RefCell;
use std::convert::Infallible;

use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use hexapod_core::utils::controllers::servo_board::{CalibrationStore, PWM_ADDRESSES, SERVO_PRESCALE};
use hexapod_core::utils::controllers::{ServoActuator, ServoBoard};
use hexapod_core::utils::state::{CalibrationOffsets, Mode, RobotState, ServoControl, SERVO_COUNT};

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}

#[derive(Default)]
struct MemStore {
    image: Option<[u8; SERVO_COUNT]>,
}

impl CalibrationStore for MemStore {
    type Error = Infallible;

    fn load(&mut self) -> Result<Option<[u8; SERVO_COUNT]>, Self::Error> {
        Ok(self.image)
    }

    fn store(
        &mut self,
        image: &[u8; SERVO_COUNT],
    ) -> Result<(), Self::Error> {
        self.image = Some(*image);
        Ok(())
    }
}

fn configure_expectations() -> Vec<I2cTrans> {
    PWM_ADDRESSES
        .iter()
        .flat_map(|&addr| {
            [
                write(addr, vec![0x00, 0x01]),
                write(addr, vec![0x00, 0x11]),
                write(addr, vec![0xFE, SERVO_PRESCALE]),
                write(addr, vec![0x00, 0x01]),
            ]
        })
        .collect()
}

/// First frame after configure: auto-increment switch, then nine neutral pulses
/// (307 counts) per chip.
fn neutral_frame_expectations() -> Vec<I2cTrans> {
    PWM_ADDRESSES
        .iter()
        .flat_map(|&addr| {
            let mut t = vec![write(addr, vec![0x00, 0x21])];
            t.extend((0..9u8).map(|ch| write(addr, vec![0x06 + 4 * ch, 0x00, 0x00, 0x33, 0x01])));
            t
        })
        .collect()
}

fn walking_ctrl() -> ServoControl {
    RobotState::new(Mode::Standby).servo
}

#[test]
fn test_configure_board() {
    let expectations = configure_expectations();
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut board = ServoBoard::new(&i2c_bus, MemStore::default()).unwrap();
    board.configure().unwrap();
    assert!(board.is_powered());
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_neutral_frame() {
    let mut expectations = configure_expectations();
    expectations.extend(neutral_frame_expectations());
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut board = ServoBoard::new(&i2c_bus, MemStore::default()).unwrap();
    board.configure().unwrap();
    board.write_current_targets(&walking_ctrl()).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_power_cut_sleeps_both_chips() {
    let mut expectations = configure_expectations();
    expectations.extend(neutral_frame_expectations());
    expectations.extend(PWM_ADDRESSES.iter().map(|&addr| write(addr, vec![0x00, 0x31])));
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut board = ServoBoard::new(&i2c_bus, MemStore::default()).unwrap();
    board.configure().unwrap();
    board.write_current_targets(&walking_ctrl()).unwrap();

    let off = ServoControl {
        power: false,
        ..walking_ctrl()
    };
    board.write_current_targets(&off).unwrap();
    assert!(!board.is_powered());
    // Already off: no further bus traffic.
    board.write_current_targets(&off).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_calibration_roundtrip_through_store() {
    let expectations: [I2cTrans; 0] = [];
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut board = ServoBoard::new(&i2c_bus, MemStore::default()).unwrap();
    assert_eq!(board.load_calibration().unwrap(), CalibrationOffsets::default());

    let mut offsets = CalibrationOffsets::default();
    offsets.adjust(5, 2, -40);
    offsets.adjust(0, 1, 70);
    board.persist_calibration(&offsets).unwrap();
    assert_eq!(board.load_calibration().unwrap(), offsets);
    i2c_bus.borrow_mut().done();
}
