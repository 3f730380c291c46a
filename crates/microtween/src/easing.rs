//! Easing functions for tweens
//!
//! Easings are cubic bezier curves anchored at `(0, 0)` and `(1, 1)`, or
//! arbitrary functions supplied by the caller. Evaluating a bezier easing
//! means inverting the curve's x polynomial: a precomputed sample table
//! seeds the search, then Newton-Raphson refines it, with bisection as a
//! fallback where the curve is nearly flat.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, TweenError};
use crate::presets::Preset;

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIVISION_PRECISION: f64 = 0.000_000_1;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

const SPLINE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP_SIZE: f64 = 1.0 / (SPLINE_TABLE_SIZE as f64 - 1.0);

/// A cubic bezier timing curve (CSS `cubic-bezier(x1, y1, x2, y2)` semantics)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    /// x(t) sampled at t = 0.0, 0.1, ..., 1.0. Only a seed for the solver,
    /// so single precision is enough.
    samples: [f32; SPLINE_TABLE_SIZE],
}

impl CubicBezier {
    /// Build a curve from its two control points.
    ///
    /// Both x values must lie in `[0, 1]` so that x(t) is monotonic and the
    /// curve can be inverted. The y values are unconstrained, which is what
    /// lets elastic curves overshoot.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        if !((0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2)) {
            return Err(TweenError::ControlPointOutOfRange { x1, x2 });
        }

        let mut samples = [0.0_f32; SPLINE_TABLE_SIZE];
        if x1 != y1 || x2 != y2 {
            for (i, sample) in samples.iter_mut().enumerate() {
                *sample = bezier_sample(i as f64 * SAMPLE_STEP_SIZE, x1, x2) as f32;
            }
        }

        Ok(Self {
            x1,
            y1,
            x2,
            y2,
            samples,
        })
    }

    /// Build a curve from `[x1, y1, x2, y2]`
    pub fn from_points([x1, y1, x2, y2]: [f64; 4]) -> Result<Self> {
        Self::new(x1, y1, x2, y2)
    }

    /// The control points as `[x1, y1, x2, y2]`
    pub fn control_points(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// True when both control points sit on the diagonal, making the curve
    /// the identity
    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    /// Map linear progress `x` to eased progress.
    ///
    /// `0` and `1` map to themselves exactly; linear curves return `x`
    /// untouched.
    pub fn evaluate(&self, x: f64) -> f64 {
        if self.is_linear() {
            return x;
        }
        if x == 0.0 {
            return 0.0;
        }
        if x == 1.0 {
            return 1.0;
        }
        bezier_sample(self.t_for_x(x), self.y1, self.y2)
    }

    /// Find the curve parameter `t` whose x coordinate is `x`
    fn t_for_x(&self, x: f64) -> f64 {
        let last_sample = SPLINE_TABLE_SIZE - 1;
        let mut interval_start = 0.0;
        let mut current_sample = 1;

        while current_sample != last_sample && f64::from(self.samples[current_sample]) <= x {
            interval_start += SAMPLE_STEP_SIZE;
            current_sample += 1;
        }
        current_sample -= 1;

        // Interpolate inside the bracketing interval for an initial guess
        let lo = f64::from(self.samples[current_sample]);
        let hi = f64::from(self.samples[current_sample + 1]);
        let dist = (x - lo) / (hi - lo);
        let guess = interval_start + dist * SAMPLE_STEP_SIZE;

        let initial_slope = bezier_slope(guess, self.x1, self.x2);
        if initial_slope >= NEWTON_MIN_SLOPE {
            newton_raphson(x, guess, self.x1, self.x2)
        } else if initial_slope == 0.0 {
            guess
        } else {
            binary_subdivide(
                x,
                interval_start,
                interval_start + SAMPLE_STEP_SIZE,
                self.x1,
                self.x2,
            )
        }
    }
}

fn newton_raphson(x: f64, mut guess: f64, x1: f64, x2: f64) -> f64 {
    for _ in 0..NEWTON_ITERATIONS {
        let slope = bezier_slope(guess, x1, x2);
        // Flat tangent: the step is undefined, keep the best estimate so far
        if slope == 0.0 {
            return guess;
        }
        let err = bezier_sample(guess, x1, x2) - x;
        guess -= err / slope;
    }
    guess
}

fn binary_subdivide(x: f64, mut lo: f64, mut hi: f64, x1: f64, x2: f64) -> f64 {
    let mut t = lo;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        t = lo + (hi - lo) / 2.0;
        let err = bezier_sample(t, x1, x2) - x;
        if err > 0.0 {
            hi = t;
        } else {
            lo = t;
        }
        if err.abs() <= SUBDIVISION_PRECISION {
            break;
        }
    }
    t
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: ((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

/// Signature of caller-supplied easing functions
pub type EasingFn = dyn Fn(f64) -> f64 + Send + Sync;

/// An easing function: progress in time to progress in value
#[derive(Clone)]
pub enum Easing {
    /// A cubic bezier timing curve
    Bezier(CubicBezier),
    /// Any pure function of progress
    Function(Arc<EasingFn>),
}

impl Easing {
    /// Bezier easing from control points
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self> {
        CubicBezier::new(x1, y1, x2, y2).map(Easing::Bezier)
    }

    /// Wrap an arbitrary easing function
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Easing::Function(Arc::new(f))
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Bezier(curve) => curve.evaluate(t),
            Easing::Function(f) => f(t),
        }
    }

    /// The underlying curve, if this easing is a bezier
    pub fn as_bezier(&self) -> Option<&CubicBezier> {
        match self {
            Easing::Bezier(curve) => Some(curve),
            Easing::Function(_) => None,
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Preset::Default.easing()
    }
}

impl From<CubicBezier> for Easing {
    fn from(curve: CubicBezier) -> Self {
        Easing::Bezier(curve)
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Bezier(curve) => f.debug_tuple("Bezier").field(&curve.control_points()).finish(),
            Easing::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// The ways a caller can ask for an easing when starting a tween
#[derive(Clone, Debug)]
pub enum EasingInput {
    /// Preset looked up by name; unknown names fall back to `default`
    Named(String),
    /// A preset chosen at compile time
    Preset(Preset),
    /// Control points `[x1, y1, x2, y2]` for a fresh curve
    ControlPoints([f64; 4]),
    /// A ready-made easing
    Direct(Easing),
}

impl EasingInput {
    /// Turn the input into an easing function.
    ///
    /// Control points with x values outside `[0, 1]` are an error. An
    /// unrecognised preset name is not: it logs a warning and resolves to
    /// the `default` preset.
    pub fn resolve(self) -> Result<Easing> {
        match self {
            EasingInput::Named(name) => match name.parse::<Preset>() {
                Ok(preset) => Ok(preset.easing()),
                Err(_) => {
                    warn!(easing = %name, "unsupported easing, falling back to `default`");
                    Ok(Preset::Default.easing())
                }
            },
            EasingInput::Preset(preset) => Ok(preset.easing()),
            EasingInput::ControlPoints(points) => CubicBezier::from_points(points).map(Easing::Bezier),
            EasingInput::Direct(easing) => Ok(easing),
        }
    }
}

impl Default for EasingInput {
    fn default() -> Self {
        EasingInput::Preset(Preset::Default)
    }
}

impl From<&str> for EasingInput {
    fn from(name: &str) -> Self {
        EasingInput::Named(name.to_string())
    }
}

impl From<String> for EasingInput {
    fn from(name: String) -> Self {
        EasingInput::Named(name)
    }
}

impl From<Preset> for EasingInput {
    fn from(preset: Preset) -> Self {
        EasingInput::Preset(preset)
    }
}

impl From<[f64; 4]> for EasingInput {
    fn from(points: [f64; 4]) -> Self {
        EasingInput::ControlPoints(points)
    }
}

impl From<(f64, f64, f64, f64)> for EasingInput {
    fn from((x1, y1, x2, y2): (f64, f64, f64, f64)) -> Self {
        EasingInput::ControlPoints([x1, y1, x2, y2])
    }
}

impl From<Easing> for EasingInput {
    fn from(easing: Easing) -> Self {
        EasingInput::Direct(easing)
    }
}

impl From<CubicBezier> for EasingInput {
    fn from(curve: CubicBezier) -> Self {
        EasingInput::Direct(Easing::Bezier(curve))
    }
}
