// PlayBuoy: Battery Measurement & Deep Sleep
//
// Rested battery voltage through the 1:2 divider on GPIO35, and the timed
// deep sleep that ends every wake cycle.

use std::thread;
use std::time::Duration;

use esp_idf_sys::esp;

use crate::config::*;

const ADC_FULL_SCALE: f32 = 4095.0;
const ADC_REF_V: f32 = 3.3;
const ADC_SAMPLES: u32 = 16;
const ADC_SAMPLE_GAP_MS: u64 = 5;

/// One-shot ADC1 unit bound to the battery channel.
pub struct BatteryAdc {
    handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    channel: esp_idf_sys::adc_channel_t,
}

impl BatteryAdc {
    pub fn new() -> anyhow::Result<Self> {
        let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // GPIO35 / ADC1_CHANNEL_7, 11 dB attenuation for the 0-3.3 V range
        let channel = esp_idf_sys::adc_channel_t_ADC_CHANNEL_7;
        unsafe {
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            esp!(esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            if let Err(e) = esp!(esp_idf_sys::adc_oneshot_config_channel(handle, channel, &chan_cfg)) {
                esp_idf_sys::adc_oneshot_del_unit(handle);
                return Err(e.into());
            }
        }
        log::debug!("Battery ADC ready on GPIO{}", PIN_BATTERY_ADC);
        Ok(Self { handle, channel })
    }

    /// Averaged cell voltage, corrected for the divider.
    pub fn read_voltage(&mut self) -> anyhow::Result<f32> {
        let mut sum: i64 = 0;
        for _ in 0..ADC_SAMPLES {
            let mut raw: i32 = 0;
            esp!(unsafe { esp_idf_sys::adc_oneshot_read(self.handle, self.channel, &mut raw) })?;
            sum += raw as i64;
            thread::sleep(Duration::from_millis(ADC_SAMPLE_GAP_MS));
        }
        let raw = sum as f32 / ADC_SAMPLES as f32;
        Ok(raw / ADC_FULL_SCALE * ADC_REF_V * BATTERY_DIVIDER_RATIO)
    }
}

impl Drop for BatteryAdc {
    fn drop(&mut self) {
        unsafe {
            esp_idf_sys::adc_oneshot_del_unit(self.handle);
        }
    }
}

/// Arm the RTC timer and enter deep sleep. Does not return.
pub fn enter_deep_sleep(hours: u32) -> ! {
    let micros = hours as u64 * 3600 * 1_000_000;
    log::info!("Entering deep sleep for {} h", hours);
    unsafe {
        esp_idf_sys::esp_sleep_enable_timer_wakeup(micros);
        esp_idf_sys::esp_deep_sleep_start();
    }
}
