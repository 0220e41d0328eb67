//! Materials and composite blends.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::equation::Equation;

/// A composite: a fraction of another material, given by an equation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    /// Composited material index; 0 is void.
    pub material: usize,
    pub equation: Equation,
}

impl Composite {
    pub fn new(material: usize, equation: Equation) -> Self {
        Self { material, equation }
    }
}

/// A named material with a base color and optional composites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: Color,
    pub composites: Vec<Composite>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Color::default(),
            composites: Vec::new(),
        }
    }

    /// The reserved material at index 0.
    pub(crate) fn void() -> Self {
        Self {
            name: "void".to_string(),
            color: Color::TRANSPARENT,
            composites: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Material indices this material composites in, in order.
    pub fn referenced_materials(&self) -> impl Iterator<Item = usize> + '_ {
        self.composites.iter().map(|c| c.material)
    }
}
