//! # Composite Equations
//!
//! A composite's equation maps an object-local point to the fraction of the
//! composited material present there. The engine treats equations as opaque:
//! numeric literals evaluate on their own, anything richer needs an evaluator
//! attached by the caller (usually the codec that parsed the AMF text).

use std::fmt;
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Something that can be evaluated at a point in object-local coordinates.
pub trait SpatialEquation: Send + Sync {
    /// Returns the material fraction at `point`. Values outside `[0, 1]`
    /// are clamped by the consumer.
    fn evaluate(&self, point: DVec3) -> f64;
}

impl<F> SpatialEquation for F
where
    F: Fn(DVec3) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: DVec3) -> f64 {
        self(point)
    }
}

/// An opaque spatial equation with its AMF source text.
///
/// ```
/// use amf_doc::Equation;
/// use glam::DVec3;
///
/// let half = Equation::new("0.5");
/// assert_eq!(half.evaluate(DVec3::ZERO), Some(0.5));
///
/// let ramp = Equation::with_evaluator("x", |p: DVec3| p.x);
/// assert_eq!(ramp.evaluate(DVec3::new(0.25, 0.0, 0.0)), Some(0.25));
///
/// let opaque = Equation::new("sin(x)*y");
/// assert_eq!(opaque.evaluate(DVec3::ZERO), None);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "EquationRepr", into = "EquationRepr")]
pub struct Equation {
    source: String,
    /// Accumulated geometry scale; points are divided by it before evaluation.
    frame: DVec3,
    constant: Option<f64>,
    evaluator: Option<Arc<dyn SpatialEquation>>,
}

impl Equation {
    /// Creates an equation from AMF text. Only numeric literals can be
    /// evaluated without an attached evaluator.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let constant = source.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        Self {
            source,
            frame: DVec3::ONE,
            constant,
            evaluator: None,
        }
    }

    /// Creates a constant equation.
    pub fn constant(value: f64) -> Self {
        Self::new(value.to_string())
    }

    /// Creates an equation whose source text is evaluated by `evaluator`.
    pub fn with_evaluator(
        source: impl Into<String>,
        evaluator: impl SpatialEquation + 'static,
    ) -> Self {
        let mut equation = Self::new(source);
        equation.evaluator = Some(Arc::new(evaluator));
        equation
    }

    /// The AMF source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when [`Equation::evaluate`] can produce a value.
    pub fn is_evaluable(&self) -> bool {
        self.evaluator.is_some() || self.constant.is_some()
    }

    /// Evaluates the equation at an object-local point, or `None` when the
    /// text cannot be evaluated by the engine.
    pub fn evaluate(&self, point: DVec3) -> Option<f64> {
        if let Some(evaluator) = &self.evaluator {
            return Some(evaluator.evaluate(point / self.frame));
        }
        self.constant
    }

    /// Follows a geometry scale so the equation keeps describing the same
    /// material features. Factors must be non-zero.
    pub(crate) fn rescale(&mut self, factors: DVec3) {
        self.frame *= factors;
    }

    /// The accumulated scale frame.
    pub fn frame(&self) -> DVec3 {
        self.frame
    }
}

impl Default for Equation {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equation")
            .field("source", &self.source)
            .field("frame", &self.frame)
            .field("evaluable", &self.is_evaluable())
            .finish()
    }
}

impl PartialEq for Equation {
    fn eq(&self, other: &Self) -> bool {
        let same_evaluator = match (&self.evaluator, &other.evaluator) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.source == other.source && self.frame == other.frame && same_evaluator
    }
}

#[derive(Serialize, Deserialize)]
struct EquationRepr {
    source: String,
    #[serde(default = "unit_frame")]
    frame: [f64; 3],
}

fn unit_frame() -> [f64; 3] {
    [1.0; 3]
}

impl From<EquationRepr> for Equation {
    fn from(repr: EquationRepr) -> Self {
        let mut equation = Equation::new(repr.source);
        equation.frame = DVec3::from_array(repr.frame);
        equation
    }
}

impl From<Equation> for EquationRepr {
    fn from(equation: Equation) -> Self {
        EquationRepr {
            source: equation.source,
            frame: equation.frame.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_constant() {
        let eq = Equation::new(" 0.25 ");
        assert!(eq.is_evaluable());
        assert_eq!(eq.evaluate(DVec3::new(9.0, 9.0, 9.0)), Some(0.25));
    }

    #[test]
    fn test_empty_source_is_opaque() {
        let eq = Equation::default();
        assert!(!eq.is_evaluable());
        assert_eq!(eq.evaluate(DVec3::ZERO), None);
    }

    #[test]
    fn test_rescale_divides_coordinates() {
        let mut eq = Equation::with_evaluator("x", |p: DVec3| p.x);
        eq.rescale(DVec3::new(2.0, 1.0, 1.0));
        // The feature that used to sit at x = 1 now sits at x = 2.
        assert_eq!(eq.evaluate(DVec3::new(2.0, 0.0, 0.0)), Some(1.0));
    }

    #[test]
    fn test_serializes_source_and_frame() {
        let mut eq = Equation::new("0.75");
        eq.rescale(DVec3::splat(3.0));
        let json = serde_json::to_string(&eq).unwrap();
        assert!(json.contains("0.75"));
        let back: Equation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eq);
        assert_eq!(back.evaluate(DVec3::ZERO), Some(0.75));
    }
}
