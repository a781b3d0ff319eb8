// PlayBuoy: MPU9250 / AK8963 Driver (GY-91 board)
//
// Register-level driver over the shared I2C bus. The accelerometer/gyro die
// and the AK8963 magnetometer are separate handles on the same bus so the
// sampling loop can hold both at once.

use std::sync::{Mutex, MutexGuard};

use esp_idf_hal::i2c::I2cDriver;
use nalgebra::Vector3;

use crate::config::*;
use crate::drivers::imu::{InertialSensor, SensorError};
use crate::events::RawSample;
use crate::heading::Magnetometer;

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

// MPU9250 register addresses
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_CONFIG_2: u8 = 0x1D;
const REG_INT_PIN_CFG: u8 = 0x37;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
const REG_USER_CTRL: u8 = 0x6A;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_MPU9250: u8 = 0x71;
const WHO_AM_I_MPU9255: u8 = 0x73;

// AK8963 register addresses
const AK_REG_WIA: u8 = 0x00;
const AK_REG_ST1: u8 = 0x02;
const AK_REG_HXL: u8 = 0x03; // HXL..HZH, then ST2
const AK_REG_CNTL1: u8 = 0x0A;
const AK_WIA_EXPECTED: u8 = 0x48;
const AK_MODE_CONT_100HZ_16BIT: u8 = 0x16;
const AK_ST2_OVERFLOW: u8 = 0x08;

fn lock(bus: SharedBus) -> Result<MutexGuard<'static, I2cDriver<'static>>, SensorError> {
    bus.lock().map_err(|_| SensorError::Unavailable)
}

fn bus_err(e: esp_idf_sys::EspError) -> SensorError {
    SensorError::Bus(e.code())
}

// ---------------------------------------------------------------------------
// Accelerometer / gyroscope
// ---------------------------------------------------------------------------
pub struct Mpu9250 {
    bus: SharedBus,
    initialised: bool,
}

impl Mpu9250 {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            initialised: false,
        }
    }

    fn write_reg(&self, reg: u8, value: u8) -> Result<(), SensorError> {
        lock(self.bus)?
            .write(I2C_ADDR_MPU9250, &[reg, value], I2C_TIMEOUT_TICKS)
            .map_err(bus_err)
    }
}

impl InertialSensor for Mpu9250 {
    /// Wake the sensor and configure accel (±8 g), gyro (±500 °/s), DLPF 20 Hz.
    /// Also routes the AK8963 onto the main bus (bypass mode).
    fn init(&mut self) -> Result<(), SensorError> {
        let mut who = [0u8; 1];
        lock(self.bus)?
            .write_read(I2C_ADDR_MPU9250, &[REG_WHO_AM_I], &mut who, I2C_TIMEOUT_TICKS)
            .map_err(bus_err)?;
        if who[0] != WHO_AM_I_MPU9250 && who[0] != WHO_AM_I_MPU9255 {
            return Err(SensorError::WrongDevice(who[0]));
        }

        // Wake up, PLL clock source
        self.write_reg(REG_PWR_MGMT_1, 0x01)?;
        // Gyro DLPF 20 Hz
        self.write_reg(REG_CONFIG, 0x04)?;
        // Gyroscope: ±500 °/s
        self.write_reg(REG_GYRO_CONFIG, 0x08)?;
        // Accelerometer: ±8 g, DLPF 21 Hz
        self.write_reg(REG_ACCEL_CONFIG, 0x10)?;
        self.write_reg(REG_ACCEL_CONFIG_2, 0x04)?;
        // I2C master off, bypass on: AK8963 appears at 0x0C
        self.write_reg(REG_USER_CTRL, 0x00)?;
        self.write_reg(REG_INT_PIN_CFG, 0x02)?;

        self.initialised = true;
        log::info!("MPU9250 initialised (±8g, ±500°/s, DLPF 20Hz)");
        Ok(())
    }

    /// Burst-read all 6 axes.
    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        if !self.initialised {
            return Err(SensorError::NotInitialised);
        }
        let mut raw = [0u8; 14];
        lock(self.bus)?
            .write_read(I2C_ADDR_MPU9250, &[REG_ACCEL_XOUT_H], &mut raw, I2C_TIMEOUT_TICKS)
            .map_err(bus_err)?;

        Ok(RawSample {
            accel: [
                i16::from_be_bytes([raw[0], raw[1]]),
                i16::from_be_bytes([raw[2], raw[3]]),
                i16::from_be_bytes([raw[4], raw[5]]),
            ],
            // raw[6..8] = temperature, skipped
            gyro: [
                i16::from_be_bytes([raw[8], raw[9]]),
                i16::from_be_bytes([raw[10], raw[11]]),
                i16::from_be_bytes([raw[12], raw[13]]),
            ],
        })
    }
}

// ---------------------------------------------------------------------------
// Magnetometer
// ---------------------------------------------------------------------------
pub struct Ak8963 {
    bus: SharedBus,
}

impl Ak8963 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Requires `Mpu9250::init` to have enabled bypass mode first.
    pub fn init(&mut self) -> anyhow::Result<()> {
        let mut bus = lock(self.bus)?;
        let mut wia = [0u8; 1];
        bus.write_read(I2C_ADDR_AK8963, &[AK_REG_WIA], &mut wia, I2C_TIMEOUT_TICKS)?;
        if wia[0] != AK_WIA_EXPECTED {
            anyhow::bail!("AK8963 not found (WIA 0x{:02x})", wia[0]);
        }
        bus.write(
            I2C_ADDR_AK8963,
            &[AK_REG_CNTL1, AK_MODE_CONT_100HZ_16BIT],
            I2C_TIMEOUT_TICKS,
        )?;
        log::info!("AK8963 initialised (16-bit, 100Hz continuous)");
        Ok(())
    }
}

impl Magnetometer for Ak8963 {
    /// Field in µT, rotated into the accelerometer's axes.
    fn read_field(&mut self) -> Result<Vector3<f32>, SensorError> {
        let mut bus = lock(self.bus)?;
        let mut st1 = [0u8; 1];
        bus.write_read(I2C_ADDR_AK8963, &[AK_REG_ST1], &mut st1, I2C_TIMEOUT_TICKS)
            .map_err(bus_err)?;
        if st1[0] & 0x01 == 0 {
            return Err(SensorError::Unavailable);
        }

        // Reading through ST2 releases the data registers for the next sample.
        let mut raw = [0u8; 7];
        bus.write_read(I2C_ADDR_AK8963, &[AK_REG_HXL], &mut raw, I2C_TIMEOUT_TICKS)
            .map_err(bus_err)?;
        if raw[6] & AK_ST2_OVERFLOW != 0 {
            return Err(SensorError::Unavailable);
        }

        let hx = i16::from_le_bytes([raw[0], raw[1]]) as f32 * MAG_SCALE_16BIT;
        let hy = i16::from_le_bytes([raw[2], raw[3]]) as f32 * MAG_SCALE_16BIT;
        let hz = i16::from_le_bytes([raw[4], raw[5]]) as f32 * MAG_SCALE_16BIT;
        Ok(Vector3::new(hy, hx, -hz))
    }
}
