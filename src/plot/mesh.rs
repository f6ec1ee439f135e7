//! Sampling a compiled program into a grid of 3D points

use super::program::Program;
use super::{PlotError, PlotKind};

/// Row-major grid of points. Non-finite samples are stored as NaN in every
/// coordinate and rendered as gaps.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub title: Option<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
    /// Value the colour ramp follows (`z` for surfaces, `r` for spheres)
    pub color: Vec<Vec<f64>>,
}

impl Mesh {
    pub fn rows(&self) -> usize {
        self.z.len()
    }

    pub fn cols(&self) -> usize {
        self.z.first().map_or(0, Vec::len)
    }

    pub fn is_finite_at(&self, row: usize, col: usize) -> bool {
        self.x[row][col].is_finite() && self.y[row][col].is_finite() && self.z[row][col].is_finite()
    }

    /// `(min, max)` of the finite colour values
    pub fn color_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.color.iter().flatten().copied())
    }
}

/// Finite `(min, max)` of a sequence
pub fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Evaluate the program over its axis grid
pub fn sample(program: &Program) -> Result<Mesh, PlotError> {
    let a_samples = program.axes[0].samples(program.resolution);
    let b_samples = program.axes[1].samples(program.resolution);
    let rows = b_samples.len();
    let cols = a_samples.len();

    let mut mesh = Mesh {
        title: program.title.clone(),
        x: vec![vec![f64::NAN; cols]; rows],
        y: vec![vec![f64::NAN; cols]; rows],
        z: vec![vec![f64::NAN; cols]; rows],
        color: vec![vec![f64::NAN; cols]; rows],
    };

    let mut slots = Vec::with_capacity(program.slot_count());
    let mut finite = 0usize;

    for (row, &b) in b_samples.iter().enumerate() {
        for (col, &a) in a_samples.iter().enumerate() {
            let value = program.eval(a, b, &mut slots);
            if !value.is_finite() {
                continue;
            }
            let (x, y, z) = match program.kind {
                PlotKind::Surface => (a, b, value),
                PlotKind::Sphere => {
                    // a = theta (polar), b = phi (azimuth), value = radius
                    let (sin_t, cos_t) = a.sin_cos();
                    let (sin_p, cos_p) = b.sin_cos();
                    (value * sin_t * cos_p, value * sin_t * sin_p, value * cos_t)
                }
            };
            mesh.x[row][col] = x;
            mesh.y[row][col] = y;
            mesh.z[row][col] = z;
            mesh.color[row][col] = value;
            finite += 1;
        }
    }

    if finite == 0 {
        return Err(PlotError::EmptyFigure);
    }
    Ok(mesh)
}
