// PlayBuoy: Firmware Entry Point
//
// One wake cycle per boot:
//   1. Arm the task watchdog (45 min, panic on trigger).
//   2. Measure the battery and plan the cycle (window length, sleep).
//   3. Record one wave window (blocks for 1-10 minutes). Without a stored
//      compass calibration, the window also learns one.
//   4. Log the wave statistics.
//   5. Deep-sleep for the planned duration.
//
// On a host build the same cycle runs against a simulated sea and ends by
// printing the sleep it would have taken.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::task::watchdog::{TWDTConfig, TWDTDriver, WatchdogSubscription};

    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use playbuoy::battery::{local_month_hour, plan_wake, ChargeMonitor, WakePlan};
    use playbuoy::config::*;
    use playbuoy::drivers::imu::InertialSensor;
    use playbuoy::drivers::mpu9250::{Ak8963, Mpu9250, SharedBus};
    use playbuoy::drivers::nvs::CalibrationStore;
    use playbuoy::heading::Compass;
    use playbuoy::tasks::power::{enter_deep_sleep, BatteryAdc};
    use playbuoy::tasks::wave::{Clock, WaveRecorder, Watchdog};

    /// Milliseconds since boot from the high-resolution timer.
    struct EspClock;

    impl Clock for EspClock {
        fn now_ms(&self) -> u64 {
            unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u64 }
        }

        fn delay_ms(&mut self, ms: u64) {
            FreeRtos::delay_ms(ms.min(u32::MAX as u64) as u32);
        }
    }

    struct TaskWatchdog<'a>(WatchdogSubscription<'a>);

    impl Watchdog for TaskWatchdog<'_> {
        fn feed(&mut self) {
            if let Err(e) = self.0.feed() {
                log::warn!("Watchdog feed failed: {}", e);
            }
        }
    }

    pub fn run() -> anyhow::Result<()> {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("PlayBuoy firmware starting…");

        let peripherals = Peripherals::take()?;

        // ---- Task watchdog ----------------------------------------------------
        let twdt_config = TWDTConfig {
            duration: Duration::from_secs(WATCHDOG_TIMEOUT_S),
            panic_on_trigger: true,
            ..Default::default()
        };
        let mut twdt = TWDTDriver::new(peripherals.twdt, &twdt_config)?;
        let mut watchdog = TaskWatchdog(twdt.watch_current_task()?);

        // ---- Battery ----------------------------------------------------------
        let voltage = match BatteryAdc::new().and_then(|mut adc| adc.read_voltage()) {
            Ok(v) => Some(v),
            Err(e) => {
                log::error!("Battery read failed: {}", e);
                None
            }
        };
        if let Some(v) = voltage {
            let mut charge = ChargeMonitor::new();
            charge.update(v);
            log::info!("Battery {:.3} V, charging: {}", v, charge.is_charging());
        }

        let (month, hour) = local_month_hour(unix_time_secs());
        let (battery_percent, sleep_hours) = match plan_wake(voltage, month, hour) {
            WakePlan::Hibernate { sleep_hours } => {
                log::warn!("Battery below {:.2} V, skipping wave window", BATTERY_CRITICAL_V);
                enter_deep_sleep(sleep_hours)
            }
            WakePlan::Record {
                battery_percent,
                sleep_hours,
            } => (battery_percent, sleep_hours),
        };

        // ---- Compass calibration ----------------------------------------------
        let mut store = match EspDefaultNvsPartition::take().and_then(CalibrationStore::new) {
            Ok(store) => Some(store),
            Err(e) => {
                log::warn!("NVS unavailable, compass calibration will not persist: {}", e);
                None
            }
        };
        let stored = store.as_ref().and_then(|s| s.load_mag_calibration());

        // ---- I2C bus (MPU9250 and AK8963) -------------------------------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_HZ.Hz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio21, // SDA
            peripherals.pins.gpio22, // SCL
            &i2c_config,
        )?;
        // The bus lives until deep sleep resets the chip.
        let i2c_bus: SharedBus = Box::leak(Box::new(Mutex::new(i2c)));

        let mut imu = Mpu9250::new(i2c_bus);
        let mut magnetometer = Ak8963::new(i2c_bus);
        // Bypass mode must be on before the magnetometer answers.
        match imu.init() {
            Ok(()) => {
                if let Err(e) = magnetometer.init() {
                    log::warn!("Compass unavailable, direction will be N/A: {}", e);
                }
            }
            Err(e) => log::error!("MPU9250 not responding: {}", e),
        }
        let mut compass = Compass::new(magnetometer, stored.unwrap_or_default());
        if stored.is_none() {
            // The buoy yaws on its mooring; the window's heading reads span the circle.
            compass.start_calibration();
        }

        // ---- Wave window ------------------------------------------------------
        let mut recorder = WaveRecorder::new(WaveConfig::default());
        recorder.record_wave_data(
            &mut imu,
            &mut compass,
            &mut EspClock,
            &mut watchdog,
            battery_percent,
        );
        recorder.log_wave_stats();

        if compass.is_calibrating() {
            match (compass.finish_calibration(), store.as_mut()) {
                (Some(calibration), Some(store)) => {
                    if let Err(e) = store.save_mag_calibration(&calibration) {
                        log::warn!("Saving compass calibration failed: {}", e);
                    }
                }
                (Some(_), None) => {}
                (None, _) => log::info!("Not enough rotation this window, calibrating again next wake"),
            }
        }

        // ---- Sleep ------------------------------------------------------------
        log::info!("Month {} hour {}: sleeping {} h", month, hour, sleep_hours);
        enter_deep_sleep(sleep_hours)
    }

    fn unix_time_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::Context;
    use nalgebra::Vector3;

    use playbuoy::battery::{local_month_hour, plan_wake, WakePlan};
    use playbuoy::config::WaveConfig;
    use playbuoy::heading::{Compass, MagCalibration};
    use playbuoy::sim::{
        CountingWatchdog, SimClock, SimMagnetometer, SyntheticSea, WakeScenario, Waveform,
    };
    use playbuoy::tasks::wave::WaveRecorder;

    const START_YAW_DEG: f32 = 240.0;
    const YAW_STEP_DEG: f32 = 4.0;

    /// `playbuoy [battery_v] [amplitude_m] [period_s]`
    pub fn run() -> anyhow::Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let scenario = WakeScenario::from_args(std::env::args())?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before 1970")?
            .as_secs() as i64;
        let (month, hour) = local_month_hour(now);

        let (battery_percent, sleep_hours) = match plan_wake(Some(scenario.battery_v), month, hour) {
            WakePlan::Hibernate { sleep_hours } => {
                log::warn!("Undervoltage, would hibernate {} h", sleep_hours);
                return Ok(());
            }
            WakePlan::Record {
                battery_percent,
                sleep_hours,
            } => (battery_percent, sleep_hours),
        };
        log::info!(
            "Simulated wake cycle: {:.3} V ({}%), swell {:.2} m / {:.1} s",
            scenario.battery_v,
            battery_percent,
            scenario.amplitude_m,
            scenario.period_s
        );

        let config = WaveConfig::default();
        let mut sea = SyntheticSea::new(
            Waveform::Swell {
                amplitude_m: scenario.amplitude_m,
                period_s: scenario.period_s,
            },
            config.sample_rate_hz,
        )
        .with_tilt_deg(3.0)
        .with_dropout_every(97);
        // A fresh board: no stored calibration, a biased magnetometer.
        let magnetometer = SimMagnetometer::new(START_YAW_DEG)
            .with_hard_iron(Vector3::new(25.0, -8.0, 12.0))
            .with_yaw_step_deg(YAW_STEP_DEG);
        let mut compass = Compass::new(magnetometer, MagCalibration::default());
        compass.start_calibration();
        let mut clock = SimClock::new();
        let mut watchdog = CountingWatchdog::default();

        let mut recorder = WaveRecorder::new(config);
        recorder.record_wave_data(
            &mut sea,
            &mut compass,
            &mut clock,
            &mut watchdog,
            battery_percent,
        );
        recorder.log_wave_stats();
        if compass.finish_calibration().is_none() {
            log::warn!("Compass calibration did not converge");
        }
        log::info!(
            "{} IMU reads, {} compass reads, {} watchdog feeds",
            sea.reads(),
            compass.magnetometer().reads(),
            watchdog.feeds()
        );
        log::info!("Would sleep {} h (month {}, hour {})", sleep_hours, month, hour);
        Ok(())
    }
}
