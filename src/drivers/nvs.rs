// PlayBuoy: Calibration Storage
//
// Hard-iron offsets survive deep sleep in the default NVS partition. RAM does
// not, so the compass reloads them on every wake.

use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

use crate::heading::MagCalibration;

const NAMESPACE: &str = "playbuoy";
const KEY_MAG_OFFSET: &str = "mag_off";

pub struct CalibrationStore {
    nvs: EspNvs<NvsDefault>,
}

impl CalibrationStore {
    pub fn new(partition: EspNvsPartition<NvsDefault>) -> Result<Self, esp_idf_svc::sys::EspError> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)?;
        Ok(Self { nvs })
    }

    /// `None` if never calibrated, or if the stored blob does not decode.
    pub fn load_mag_calibration(&self) -> Option<MagCalibration> {
        let mut buf = [0u8; MagCalibration::ENCODED_LEN];
        let bytes = match self.nvs.get_raw(KEY_MAG_OFFSET, &mut buf) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("NVS: reading magnetometer calibration failed: {}", e);
                return None;
            }
        };
        let calibration = MagCalibration::from_bytes(bytes);
        match &calibration {
            Some(cal) => log::info!(
                "NVS: loaded magnetometer offset {:.1} / {:.1} / {:.1} µT",
                cal.offset.x,
                cal.offset.y,
                cal.offset.z
            ),
            None => log::warn!("NVS: stored magnetometer calibration is invalid, ignoring"),
        }
        calibration
    }

    pub fn save_mag_calibration(
        &mut self,
        calibration: &MagCalibration,
    ) -> Result<(), esp_idf_svc::sys::EspError> {
        self.nvs.set_raw(KEY_MAG_OFFSET, &calibration.to_bytes())?;
        log::info!("NVS: saved magnetometer calibration");
        Ok(())
    }
}
