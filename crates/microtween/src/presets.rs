//! Named easing presets
//!
//! A small table of bezier curves that tweens can refer to by name.
//! Curves are built once on first use and shared afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::easing::{CubicBezier, Easing};
use crate::error::TweenError;

/// Built-in easing curves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Preset {
    Linear,
    /// A smooth, general purpose ease; used when no easing is given
    Default,
    EaseOut,
    Circular,
    Elastic,
    ElasticStrong,
    Expo,
}

impl Preset {
    /// Every preset, in table order
    pub const ALL: [Preset; 7] = [
        Preset::Linear,
        Preset::Default,
        Preset::EaseOut,
        Preset::Circular,
        Preset::Elastic,
        Preset::ElasticStrong,
        Preset::Expo,
    ];

    /// Name used for lookup
    pub fn name(self) -> &'static str {
        match self {
            Preset::Linear => "linear",
            Preset::Default => "default",
            Preset::EaseOut => "easeOut",
            Preset::Circular => "circular",
            Preset::Elastic => "elastic",
            Preset::ElasticStrong => "elasticStrong",
            Preset::Expo => "expo",
        }
    }

    /// Control points `[x1, y1, x2, y2]`
    pub fn control_points(self) -> [f64; 4] {
        match self {
            Preset::Linear => [0.0, 0.0, 1.0, 1.0],
            Preset::Default => [0.25, 0.12, 0.31, 1.0],
            Preset::EaseOut => [0.0, 0.0, 0.58, 1.0],
            Preset::Circular => [0.0, 0.6, 0.4, 1.0],
            Preset::Elastic => [0.53, 1.0, 0.15, 1.2],
            Preset::ElasticStrong => [0.75, -0.5, 0.0, 1.75],
            Preset::Expo => [0.19, 0.85, 0.64, 1.01],
        }
    }

    /// The preset's curve, built on first use
    pub fn curve(self) -> CubicBezier {
        static CURVES: OnceLock<Vec<CubicBezier>> = OnceLock::new();
        let curves = CURVES.get_or_init(|| {
            Preset::ALL
                .iter()
                .map(|preset| build(preset.control_points()))
                .collect()
        });
        curves[self as usize]
    }

    /// The preset as an easing function
    pub fn easing(self) -> Easing {
        Easing::Bezier(self.curve())
    }
}

/// Preset control points are all inside the valid range, so this is the
/// one place a curve is built without a fallible return.
fn build([x1, y1, x2, y2]: [f64; 4]) -> CubicBezier {
    match CubicBezier::new(x1, y1, x2, y2) {
        Ok(curve) => curve,
        Err(err) => unreachable!("invalid preset curve: {err}"),
    }
}

impl FromStr for Preset {
    type Err = TweenError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == name)
            .ok_or_else(|| TweenError::UnknownPreset(name.to_string()))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a preset easing by name
pub fn preset(name: &str) -> Option<Easing> {
    name.parse::<Preset>().ok().map(Preset::easing)
}

/// Iterate the preset table as `(name, easing)` pairs
pub fn presets() -> impl Iterator<Item = (&'static str, Easing)> {
    Preset::ALL
        .into_iter()
        .map(|preset| (preset.name(), preset.easing()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>(), Ok(preset));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(
            "ease".parse::<Preset>(),
            Err(TweenError::UnknownPreset("ease".to_string()))
        );
        // Names are case sensitive
        assert!("easeout".parse::<Preset>().is_err());
        assert!(preset("bounce").is_none());
    }

    #[test]
    fn test_control_points_match_table() {
        assert_eq!(Preset::Elastic.curve().control_points(), [0.53, 1.0, 0.15, 1.2]);
        assert_eq!(
            Preset::ElasticStrong.curve().control_points(),
            [0.75, -0.5, 0.0, 1.75]
        );
        assert!(Preset::Linear.curve().is_linear());
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let a = preset("elastic").unwrap();
        let b = preset("elastic").unwrap();
        for i in 0..=100 {
            let t = i as f64 / 100.0;
            assert_eq!(a.apply(t), b.apply(t));
        }
    }

    #[test]
    fn test_elastic_overshoots() {
        let elastic = Preset::Elastic.easing();
        let peak = (1..100)
            .map(|i| elastic.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0, "elastic should overshoot, peaked at {}", peak);
    }

    #[test]
    fn test_table_lists_every_preset() {
        let names: Vec<_> = presets().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["linear", "default", "easeOut", "circular", "elastic", "elasticStrong", "expo"]
        );
    }
}
