// PlayBuoy: Device Drivers

pub mod imu;
#[cfg(target_os = "espidf")]
pub mod mpu9250;
#[cfg(target_os = "espidf")]
pub mod nvs;
