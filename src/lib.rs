// PlayBuoy: hardware-independent core of the buoy firmware.
//
// Everything here builds and tests on the host; the ESP-IDF drivers and the
// power task are only compiled for the device.

pub mod battery;
pub mod config;
pub mod drivers;
pub mod events;
pub mod heading;
pub mod sampler;
pub mod sim;
pub mod tasks;
pub mod wave;
