//! Cargo-load speed reduction.

/// Nominal speed after carrying `cargo` units.
///
/// Each unit removes `reduction_percent` of the base speed; the result never
/// drops below `min_speed`.
pub fn laden_speed(base_speed: f32, cargo: u32, reduction_percent: f32, min_speed: f32) -> f32 {
    let reduction = base_speed * (reduction_percent / 100.0) * cargo as f32;
    (base_speed - reduction).max(min_speed)
}
