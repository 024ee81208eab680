//! Chart Palette Module
//! Fixed chart colors and the viridis color map.

use plotters::style::RGBColor;

pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235); // EV type bars
pub const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144); // Model year bars
pub const ORANGE: RGBColor = RGBColor(255, 165, 0); // Range histogram
pub const EDGE: RGBColor = RGBColor(0, 0, 0);
pub const BOUNDARY: RGBColor = RGBColor(255, 255, 255);

// Viridis sampled at nine evenly spaced stops.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 45, 123),
    (59, 82, 139),
    (44, 114, 142),
    (33, 145, 140),
    (40, 174, 128),
    (94, 201, 98),
    (173, 220, 48),
    (253, 231, 37),
];

/// Viridis color at `t` in `[0, 1]`; out-of-range values are clamped.
pub fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lower as f64;

    let (r0, g0, b0) = VIRIDIS[lower];
    let (r1, g1, b1) = VIRIDIS[lower + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;

    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Viridis color for `value` normalised into `[min, max]`.
pub fn viridis_scaled(value: f64, min: f64, max: f64) -> RGBColor {
    if max > min {
        viridis((value - min) / (max - min))
    } else {
        viridis(0.0)
    }
}

/// `n` evenly spaced viridis colors, one per bar.
pub fn viridis_steps(n: usize) -> Vec<RGBColor> {
    match n {
        0 => Vec::new(),
        1 => vec![viridis(0.5)],
        _ => (0..n).map(|i| viridis(i as f64 / (n - 1) as f64)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(viridis(0.0), RGBColor(68, 1, 84));
        assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
    }

    #[test]
    fn test_viridis_clamps() {
        assert_eq!(viridis(-3.0), viridis(0.0));
        assert_eq!(viridis(7.0), viridis(1.0));
        assert_eq!(viridis(f64::NAN), viridis(0.0));
    }

    #[test]
    fn test_viridis_scaled_degenerate_range() {
        assert_eq!(viridis_scaled(5.0, 5.0, 5.0), viridis(0.0));
        assert_eq!(viridis_scaled(10.0, 0.0, 10.0), viridis(1.0));
    }

    #[test]
    fn test_viridis_steps() {
        let steps = viridis_steps(10);
        assert_eq!(steps.len(), 10);
        assert_eq!(steps[0], viridis(0.0));
        assert_eq!(steps[9], viridis(1.0));
        assert!(viridis_steps(0).is_empty());
    }
}
