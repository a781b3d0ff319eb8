// PlayBuoy: Heave Extraction

use nalgebra::Vector3;

/// Vertical acceleration (m/s², positive up) from specific force and the
/// tracked gravity vector.
///
/// The dynamic part `accel - gravity` is projected onto the unit gravity
/// estimate, which in accelerometer convention points up. The result is
/// clamped to `±clamp` and zeroed below `floor`.
pub fn extract_heave(accel: &Vector3<f32>, gravity: &Vector3<f32>, clamp: f32, floor: f32) -> f32 {
    let up = match gravity.try_normalize(1e-6) {
        Some(up) => up,
        None => return 0.0,
    };
    let heave = (accel - gravity).dot(&up);
    if !heave.is_finite() {
        return 0.0;
    }
    let heave = heave.clamp(-clamp, clamp);
    if heave.abs() < floor {
        0.0
    } else {
        heave
    }
}
