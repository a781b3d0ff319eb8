// PlayBuoy: Tasks

#[cfg(target_os = "espidf")]
pub mod power;
pub mod wave;
