//! # Parameter Catalog Module
//!
//! The fixed catalog of force-feedback and filter parameters understood by the
//! wheel, described by one data-driven table. Every consumer (profile apply,
//! manual edit, scroll adjust, persistence) iterates this table instead of
//! carrying its own per-field dispatch, so bounds and order can only ever be
//! defined in one place.
//!
//! ## Catalog order
//! The order of [`PARAMETERS`] is the order in which a profile is pushed to
//! the device. Downstream firmware state is built field by field, so this
//! order is part of the device contract and must stay stable.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

/// Number of parameters in the catalog.
pub const PARAMETER_COUNT: usize = 12;

/// One tunable setting of the wheel.
///
/// The discriminant is the position of the parameter in [`PARAMETERS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Degrees,
    Power,
    Intensity,
    Bumpstop,
    IdleSpring,
    MechanicalDamper,
    Damper,
    Spring,
    Friction,
    Inertia,
    FilterFreq,
    FilterQ,
}

/// How a stored value is converted before it is transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// Sent as stored.
    Unscaled,
    /// Multiplied by the configured angle ratio.
    AngleRatio,
}

/// Static description of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub parameter: Parameter,
    /// Key used on the device contract and in the profile document.
    pub key: &'static str,
    /// Human-readable label for front ends.
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Value used by the built-in "Default" profile.
    pub default: f64,
    pub scaling: Scaling,
}

const fn percent(parameter: Parameter, key: &'static str, label: &'static str) -> ParameterSpec {
    ParameterSpec {
        parameter,
        key,
        label,
        min: 0.0,
        max: 100.0,
        step: 1.0,
        default: 50.0,
        scaling: Scaling::Unscaled,
    }
}

/// The catalog, in transmission order.
pub static PARAMETERS: [ParameterSpec; PARAMETER_COUNT] = [
    ParameterSpec {
        parameter: Parameter::Degrees,
        key: "degrees",
        label: "Degrees",
        min: 90.0,
        max: 1440.0,
        step: 5.0,
        default: 540.0,
        scaling: Scaling::AngleRatio,
    },
    percent(Parameter::Power, "power", "Power"),
    percent(Parameter::Intensity, "intensity", "Intensity"),
    percent(Parameter::Bumpstop, "bumpstop", "Bumpstop"),
    percent(Parameter::IdleSpring, "idlespring", "Idle Spring"),
    percent(Parameter::MechanicalDamper, "mechanicaldamper", "Mechanical Damper"),
    percent(Parameter::Damper, "damper", "Damper"),
    percent(Parameter::Spring, "spring", "Spring"),
    percent(Parameter::Friction, "friction", "Friction"),
    percent(Parameter::Inertia, "inertia", "Inertia"),
    ParameterSpec {
        parameter: Parameter::FilterFreq,
        key: "filterfreq",
        label: "Filter Frequency",
        min: 0.0,
        max: 500.0,
        step: 1.0,
        default: 250.0,
        scaling: Scaling::Unscaled,
    },
    ParameterSpec {
        parameter: Parameter::FilterQ,
        key: "filterq",
        label: "Filter Q",
        min: 0.0,
        max: 80.0,
        step: 1.0,
        default: 50.0,
        scaling: Scaling::Unscaled,
    },
];

/// Key → parameter lookup built once from the catalog.
static KEY_MAP: Lazy<BTreeMap<&'static str, Parameter>> = Lazy::new(|| {
    PARAMETERS
        .iter()
        .map(|spec| (spec.key, spec.parameter))
        .collect()
});

impl Parameter {
    /// Every parameter in catalog order.
    pub const ALL: [Parameter; PARAMETER_COUNT] = [
        Parameter::Degrees,
        Parameter::Power,
        Parameter::Intensity,
        Parameter::Bumpstop,
        Parameter::IdleSpring,
        Parameter::MechanicalDamper,
        Parameter::Damper,
        Parameter::Spring,
        Parameter::Friction,
        Parameter::Inertia,
        Parameter::FilterFreq,
        Parameter::FilterQ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static ParameterSpec {
        &PARAMETERS[self.index()]
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Looks up a parameter by its canonical key (case-sensitive).
    pub fn from_key(key: &str) -> Option<Parameter> {
        KEY_MAP.get(key).copied()
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl ParameterSpec {
    /// Clamps into `[min, max]`. Non-finite input falls back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    /// Clamps and snaps onto the step grid anchored at `min`.
    ///
    /// This is the validation applied to operator input before it is pushed.
    pub fn normalize(&self, value: f64) -> f64 {
        let clamped = self.clamp(value);
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }

    /// Moves `value` by whole steps, e.g. for a scroll-wheel adjustment.
    pub fn nudge(&self, value: f64, steps: i32) -> f64 {
        self.normalize(value + f64::from(steps) * self.step)
    }

    /// Value that goes over the wire for a stored `value`.
    pub fn transmit(&self, value: f64, angle_ratio: f64) -> f64 {
        match self.scaling {
            Scaling::Unscaled => value,
            Scaling::AngleRatio => value * angle_ratio,
        }
    }
}

/// One value per catalog parameter, indexed by [`Parameter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterValues([f64; PARAMETER_COUNT]);

impl Default for ParameterValues {
    /// The baseline values of the built-in "Default" profile.
    fn default() -> Self {
        let mut values = [0.0; PARAMETER_COUNT];
        for spec in &PARAMETERS {
            values[spec.parameter.index()] = spec.default;
        }
        Self(values)
    }
}

impl ParameterValues {
    pub fn get(&self, parameter: Parameter) -> f64 {
        self.0[parameter.index()]
    }

    pub fn set(&mut self, parameter: Parameter, value: f64) {
        self.0[parameter.index()] = value;
    }

    /// Returns a copy with `parameter` replaced, handy for building presets.
    pub fn with(mut self, parameter: Parameter, value: f64) -> Self {
        self.set(parameter, value);
        self
    }

    /// Returns a copy with every value inside its catalog range. Non-finite
    /// values fall back to the baseline.
    pub fn clamped(&self) -> Self {
        let mut values = *self;
        for parameter in Parameter::ALL {
            values[parameter] = parameter.spec().clamp(self[parameter]);
        }
        values
    }

    /// Iterates `(parameter, value)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        Parameter::ALL.iter().map(move |&p| (p, self.get(p)))
    }
}

impl Index<Parameter> for ParameterValues {
    type Output = f64;

    fn index(&self, parameter: Parameter) -> &f64 {
        &self.0[parameter.index()]
    }
}

impl IndexMut<Parameter> for ParameterValues {
    fn index_mut(&mut self, parameter: Parameter) -> &mut f64 {
        &mut self.0[parameter.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_enum_order() {
        for (i, spec) in PARAMETERS.iter().enumerate() {
            assert_eq!(spec.parameter.index(), i);
            assert_eq!(Parameter::ALL[i], spec.parameter);
        }
    }

    #[test]
    fn keys_round_trip_through_lookup() {
        for p in Parameter::ALL {
            assert_eq!(Parameter::from_key(p.key()), Some(p));
        }
        assert_eq!(Parameter::from_key("name"), None);
        assert_eq!(Parameter::from_key("center"), None);
        assert_eq!(Parameter::from_key("Degrees"), None);
    }

    #[test]
    fn baseline_values() {
        let v = ParameterValues::default();
        assert_eq!(v[Parameter::Degrees], 540.0);
        assert_eq!(v[Parameter::FilterFreq], 250.0);
        assert_eq!(v[Parameter::FilterQ], 50.0);
        assert_eq!(v[Parameter::Power], 50.0);
    }

    #[test]
    fn normalize_clamps_and_snaps() {
        let degrees = Parameter::Degrees.spec();
        assert_eq!(degrees.normalize(10.0), 90.0);
        assert_eq!(degrees.normalize(5000.0), 1440.0);
        assert_eq!(degrees.normalize(543.0), 545.0);
        assert_eq!(degrees.normalize(f64::NAN), 540.0);

        let q = Parameter::FilterQ.spec();
        assert_eq!(q.normalize(95.0), 80.0);
        assert_eq!(q.normalize(-3.0), 0.0);
    }

    #[test]
    fn nudge_moves_by_whole_steps() {
        let degrees = Parameter::Degrees.spec();
        assert_eq!(degrees.nudge(540.0, 2), 550.0);
        assert_eq!(degrees.nudge(95.0, -3), 90.0);
        assert_eq!(Parameter::Power.spec().nudge(99.0, 5), 100.0);
    }

    #[test]
    fn clamped_replaces_non_finite_and_out_of_range() {
        let values = ParameterValues::default()
            .with(Parameter::Degrees, f64::NAN)
            .with(Parameter::Power, f64::INFINITY)
            .with(Parameter::FilterQ, 120.0)
            .with(Parameter::Spring, 12.5)
            .clamped();
        assert_eq!(values[Parameter::Degrees], 540.0);
        assert_eq!(values[Parameter::Power], 50.0);
        assert_eq!(values[Parameter::FilterQ], 80.0);
        assert_eq!(values[Parameter::Spring], 12.5);
    }

    #[test]
    fn only_degrees_is_scaled() {
        assert_eq!(Parameter::Degrees.spec().transmit(540.0, 2.0), 1080.0);
        assert_eq!(Parameter::Power.spec().transmit(40.0, 2.0), 40.0);
    }
}
