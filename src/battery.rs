// PlayBuoy: Battery State & Duty-Cycle Policy
//
// Turns a stable battery voltage into a charge estimate, then into the two
// knobs that set the energy budget of a wake cycle: how long to sample waves
// and how long to deep-sleep afterwards.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::config::*;

/// Open-circuit voltage at each integer percent 0..=100.
const OCV_BY_PERCENT: [f32; 101] = [
    3.000, 3.081, 3.161, 3.242, 3.322, 3.403, 3.423, 3.443, 3.463, 3.483, //
    3.503, 3.519, 3.535, 3.551, 3.567, 3.583, 3.593, 3.603, 3.613, 3.623, //
    3.633, 3.641, 3.649, 3.657, 3.665, 3.673, 3.679, 3.685, 3.691, 3.697, //
    3.703, 3.709, 3.715, 3.721, 3.727, 3.733, 3.737, 3.741, 3.745, 3.749, //
    3.753, 3.759, 3.765, 3.771, 3.777, 3.783, 3.787, 3.791, 3.795, 3.799, //
    3.803, 3.807, 3.811, 3.815, 3.819, 3.823, 3.829, 3.835, 3.841, 3.847, //
    3.853, 3.859, 3.865, 3.871, 3.877, 3.883, 3.889, 3.895, 3.901, 3.907, //
    3.913, 3.921, 3.929, 3.937, 3.945, 3.953, 3.959, 3.965, 3.971, 3.977, //
    3.983, 3.995, 4.007, 4.019, 4.031, 4.043, 4.055, 4.067, 4.079, 4.091, //
    4.103, 4.119, 4.136, 4.153, 4.168, 4.183, 4.186, 4.190, 4.193, 4.197, //
    4.200,
];

/// Fallback calendar used while the RTC has never been set.
const FALLBACK_MONTH: u32 = 8;
const FALLBACK_HOUR: u32 = 10;
const RTC_VALID_AFTER_S: i64 = 24 * 3600;

// ---------------------------------------------------------------------------
// Charge estimate
// ---------------------------------------------------------------------------

/// State of charge (0..=100) from a rested cell voltage.
pub fn estimate_battery_percent(voltage: f32) -> u8 {
    if !voltage.is_finite() || voltage <= OCV_BY_PERCENT[0] {
        return 0;
    }
    if voltage >= OCV_BY_PERCENT[100] {
        return 100;
    }

    // First entry strictly above the voltage; the table is monotonic.
    let hi = OCV_BY_PERCENT.partition_point(|&v| v <= voltage);
    let lo = hi - 1;
    let (v_lo, v_hi) = (OCV_BY_PERCENT[lo], OCV_BY_PERCENT[hi]);
    let t = if v_hi - v_lo > 1e-6 {
        (voltage - v_lo) / (v_hi - v_lo)
    } else {
        0.0
    };
    (lo as f32 + t).round().clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Duty-cycle policy
// ---------------------------------------------------------------------------

/// Length of the wave sampling window for a given charge.
pub fn sampling_window_ms(battery_percent: u8) -> u64 {
    match battery_percent {
        p if p > 50 => 600_000, // 10 minutes
        p if p > 30 => 300_000, // 5 minutes
        p if p > 20 => 120_000, // 2 minutes
        _ => 60_000,            // 1 minute
    }
}

/// October through April.
pub fn is_winter(month: u32) -> bool {
    month >= 10 || month <= 4
}

/// Hours of deep sleep after this wake cycle.
pub fn sleep_duration_hours(battery_percent: u8, month: u32, hour: u32) -> u32 {
    if is_winter(month) {
        return match battery_percent {
            p if p >= 70 => {
                // Daily wake at local noon
                let to_noon = 12 - hour as i32;
                if to_noon <= 0 {
                    (to_noon + 24) as u32
                } else {
                    to_noon as u32
                }
            }
            p if p >= 60 => 48,
            p if p >= 50 => 168,
            p if p >= 40 => 336,
            p if p >= 30 => 720,
            p if p >= 20 => 1440,
            _ => 2160,
        };
    }

    match battery_percent {
        p if p > 80 => 3,
        p if p > 70 => 6,
        p if p > 60 => 12,
        p if p > 50 => 24,
        p if p > 40 => 48,
        p if p > 30 => 168,
        p if p > 20 => 720,
        p if p > 15 => 1460,
        p if p > 10 => 2180,
        _ => 2160,
    }
}

/// Local (CET) month 1..=12 and hour 0..=23 for a UNIX timestamp.
pub fn local_month_hour(unix_secs: i64) -> (u32, u32) {
    if unix_secs <= RTC_VALID_AFTER_S {
        log::warn!(
            "RTC not set, using fallback month {} hour {}",
            FALLBACK_MONTH,
            FALLBACK_HOUR
        );
        return (FALLBACK_MONTH, FALLBACK_HOUR);
    }

    let offset = FixedOffset::east_opt(UTC_OFFSET_S);
    let local = DateTime::from_timestamp(unix_secs, 0)
        .zip(offset)
        .map(|(utc, offset)| utc.with_timezone(&offset));
    match local {
        Some(t) => (t.month(), t.hour()),
        None => (FALLBACK_MONTH, FALLBACK_HOUR),
    }
}

// ---------------------------------------------------------------------------
// Charging state
// ---------------------------------------------------------------------------

/// Charging detection with a hysteresis band around the threshold.
#[derive(Debug, Clone, Default)]
pub struct ChargeMonitor {
    charging: bool,
}

impl ChargeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a stable voltage; returns the updated charging flag.
    pub fn update(&mut self, voltage: f32) -> bool {
        if !self.charging && voltage > CHARGE_THRESHOLD_V + CHARGE_HYSTERESIS_V {
            self.charging = true;
            log::info!("Charging detected ({:.3} V)", voltage);
        } else if self.charging && voltage < CHARGE_THRESHOLD_V - CHARGE_HYSTERESIS_V {
            self.charging = false;
            log::warn!("Charging lost ({:.3} V)", voltage);
        }
        self.charging
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }
}

pub fn is_undervoltage(voltage: f32) -> bool {
    voltage < BATTERY_CRITICAL_V
}

// ---------------------------------------------------------------------------
// Wake plan
// ---------------------------------------------------------------------------

/// What one wake cycle does with the battery it measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePlan {
    /// Skip the wave window and go straight back to sleep.
    Hibernate { sleep_hours: u32 },
    /// Record a window sized for `battery_percent`, then sleep.
    Record { battery_percent: u8, sleep_hours: u32 },
}

/// Decide the wake cycle from a battery reading, `None` if the ADC failed.
///
/// A failed or implausible reading never counts as undervoltage: the buoy
/// records the shortest window and retries after a short sleep.
pub fn plan_wake(voltage: Option<f32>, month: u32, hour: u32) -> WakePlan {
    let voltage = voltage
        .filter(|v| (BATTERY_PLAUSIBLE_MIN_V..=BATTERY_PLAUSIBLE_MAX_V).contains(v));
    match voltage {
        None => {
            log::warn!(
                "Battery voltage unknown, shortest window and {} h sleep",
                BATTERY_UNKNOWN_SLEEP_H
            );
            WakePlan::Record {
                battery_percent: 0,
                sleep_hours: BATTERY_UNKNOWN_SLEEP_H,
            }
        }
        Some(v) if is_undervoltage(v) => WakePlan::Hibernate {
            sleep_hours: sleep_duration_hours(0, month, hour),
        },
        Some(v) => {
            let battery_percent = estimate_battery_percent(v);
            WakePlan::Record {
                battery_percent,
                sleep_hours: sleep_duration_hours(battery_percent, month, hour),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_saturates_at_table_ends() {
        assert_eq!(estimate_battery_percent(2.5), 0);
        assert_eq!(estimate_battery_percent(3.0), 0);
        assert_eq!(estimate_battery_percent(4.2), 100);
        assert_eq!(estimate_battery_percent(4.5), 100);
        assert_eq!(estimate_battery_percent(f32::NAN), 0);
    }

    #[test]
    fn percent_hits_table_entries() {
        assert_eq!(estimate_battery_percent(3.803), 50);
        assert_eq!(estimate_battery_percent(3.503), 10);
        assert_eq!(estimate_battery_percent(4.103), 90);
    }

    #[test]
    fn percent_interpolates_between_entries() {
        // Between 3.000 (0 %) and 3.081 (1 %): just past the midpoint rounds up.
        assert_eq!(estimate_battery_percent(3.045), 1);
        assert_eq!(estimate_battery_percent(3.035), 0);
    }

    #[test]
    fn percent_is_monotonic() {
        let mut last = 0;
        let mut v = 2.9;
        while v < 4.3 {
            let p = estimate_battery_percent(v);
            assert!(p >= last, "{} V gave {} after {}", v, p, last);
            last = p;
            v += 0.001;
        }
    }

    #[test]
    fn window_shrinks_with_charge() {
        assert_eq!(sampling_window_ms(100), 600_000);
        assert_eq!(sampling_window_ms(51), 600_000);
        assert_eq!(sampling_window_ms(50), 300_000);
        assert_eq!(sampling_window_ms(31), 300_000);
        assert_eq!(sampling_window_ms(30), 120_000);
        assert_eq!(sampling_window_ms(21), 120_000);
        assert_eq!(sampling_window_ms(20), 60_000);
        assert_eq!(sampling_window_ms(0), 60_000);
    }

    #[test]
    fn summer_sleep_table() {
        assert_eq!(sleep_duration_hours(90, 7, 8), 3);
        assert_eq!(sleep_duration_hours(75, 7, 8), 6);
        assert_eq!(sleep_duration_hours(55, 6, 8), 24);
        assert_eq!(sleep_duration_hours(35, 5, 8), 168);
        assert_eq!(sleep_duration_hours(12, 9, 8), 2180);
        assert_eq!(sleep_duration_hours(5, 9, 8), 2160);
    }

    #[test]
    fn winter_high_charge_wakes_at_noon() {
        assert_eq!(sleep_duration_hours(80, 12, 9), 3);
        assert_eq!(sleep_duration_hours(80, 1, 12), 24);
        assert_eq!(sleep_duration_hours(80, 1, 15), 21);
    }

    #[test]
    fn winter_low_charge_hibernates() {
        assert_eq!(sleep_duration_hours(65, 11, 9), 48);
        assert_eq!(sleep_duration_hours(45, 3, 9), 336);
        assert_eq!(sleep_duration_hours(10, 4, 9), 2160);
    }

    #[test]
    fn unset_rtc_uses_fallback_calendar() {
        assert_eq!(local_month_hour(0), (8, 10));
        assert_eq!(local_month_hour(3600), (8, 10));
    }

    #[test]
    fn local_time_is_cet() {
        // 2025-01-15T23:30:00Z is already 00:30 on the 16th in CET.
        assert_eq!(local_month_hour(1_736_983_800), (1, 0));
        // 2025-06-30T23:00:00Z rolls over into July.
        assert_eq!(local_month_hour(1_751_324_400), (7, 0));
    }

    #[test]
    fn charge_monitor_has_hysteresis() {
        let mut monitor = ChargeMonitor::new();
        assert!(!monitor.update(3.72));
        assert!(monitor.update(3.74));
        assert!(monitor.update(3.68));
        assert!(!monitor.update(3.66));
        assert!(!monitor.is_charging());
    }

    #[test]
    fn failed_battery_read_still_records() {
        for (month, hour) in [(1, 9), (7, 9)] {
            assert_eq!(
                plan_wake(None, month, hour),
                WakePlan::Record {
                    battery_percent: 0,
                    sleep_hours: BATTERY_UNKNOWN_SLEEP_H
                }
            );
        }
        assert_eq!(sampling_window_ms(0), 60_000);
    }

    #[test]
    fn implausible_reading_is_treated_as_unknown() {
        let unknown = plan_wake(None, 7, 9);
        assert_eq!(plan_wake(Some(0.0), 7, 9), unknown);
        assert_eq!(plan_wake(Some(f32::NAN), 7, 9), unknown);
        assert_eq!(plan_wake(Some(6.6), 7, 9), unknown);
    }

    #[test]
    fn real_undervoltage_hibernates() {
        assert_eq!(
            plan_wake(Some(2.9), 7, 9),
            WakePlan::Hibernate { sleep_hours: 2160 }
        );
    }

    #[test]
    fn healthy_battery_follows_the_sleep_table() {
        assert_eq!(
            plan_wake(Some(4.103), 7, 8),
            WakePlan::Record {
                battery_percent: 90,
                sleep_hours: 3
            }
        );
    }

    #[test]
    fn undervoltage_threshold() {
        assert!(is_undervoltage(2.95));
        assert!(!is_undervoltage(3.05));
    }
}
