//! Plot rendering module
//!
//! Figures are described in a small expression language instead of
//! executable code:
//! - `lexer` / `parser`: source text to statements
//! - `program`: name resolution, settings, limits, evaluation
//! - `mesh`: sampling over the axis grid
//! - `html` / `png`: output formats

mod html;
mod lexer;
mod mesh;
mod parser;
mod png;
mod program;

pub use program::{AxisRange, Limits, Program};

use std::f64::consts::{PI, TAU};

use crate::config::PlotConfig;

/// Errors raised while compiling, sampling or rendering a figure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlotError {
    #[error("plot program is empty")]
    Empty,

    #[error("plot program exceeds {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid number '{text}'")]
    InvalidNumber { line: usize, text: String },

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: unknown function '{name}'")]
    UnknownFunction { line: usize, name: String },

    #[error("line {line}: function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        line: usize,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: expression nested deeper than {limit}")]
    TooDeep { line: usize, limit: usize },

    #[error("plot program has more than {limit} statements")]
    TooManyStatements { limit: usize },

    #[error("line {line}: undefined variable '{name}'")]
    UndefinedVariable { line: usize, name: String },

    #[error("line {line}: '{name}' cannot be assigned")]
    ReservedName { line: usize, name: String },

    #[error("line {line}: unknown setting '{name}'")]
    UnknownSetting { line: usize, name: String },

    #[error("line {line}: '{name}' expects a quoted string")]
    ExpectedText { line: usize, name: String },

    #[error("line {line}: invalid range for '{name}'")]
    InvalidRange { line: usize, name: String },

    #[error("line {line}: '{name}' must be a constant expression")]
    NotConstant { line: usize, name: String },

    #[error("no figure: '{expected}' is never assigned")]
    NoFigure { expected: &'static str },

    #[error("figure has no finite points")]
    EmptyFigure,

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Figure families served by the plot endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// `z` over the `x`/`y` plane
    Surface,
    /// radius `r` over polar `theta` and azimuth `phi`
    Sphere,
}

impl PlotKind {
    pub const fn axis_names(self) -> [&'static str; 2] {
        match self {
            Self::Surface => ["x", "y"],
            Self::Sphere => ["theta", "phi"],
        }
    }

    /// Variable a program must assign to produce a figure
    pub const fn output_name(self) -> &'static str {
        match self {
            Self::Surface => "z",
            Self::Sphere => "r",
        }
    }

    pub const fn default_ranges(self) -> [AxisRange; 2] {
        match self {
            Self::Surface => [
                AxisRange {
                    start: -5.0,
                    end: 5.0,
                },
                AxisRange {
                    start: -5.0,
                    end: 5.0,
                },
            ],
            Self::Sphere => [
                AxisRange { start: 0.0, end: PI },
                AxisRange {
                    start: 0.0,
                    end: TAU,
                },
            ],
        }
    }

    /// Artifact filename stem
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Sphere => "sphere",
        }
    }
}

/// Rendered outputs of one figure
#[derive(Debug, Clone)]
pub struct Figure {
    pub html: String,
    pub png: Vec<u8>,
}

/// Tokenize, parse and compile a program
pub fn compile(
    kind: PlotKind,
    source: &str,
    max_source_bytes: usize,
    limits: Limits,
) -> Result<Program, PlotError> {
    if source.len() > max_source_bytes {
        return Err(PlotError::SourceTooLarge {
            limit: max_source_bytes,
        });
    }
    if source.trim().is_empty() {
        return Err(PlotError::Empty);
    }

    let tokens = lexer::tokenize(source)?;
    let statements = parser::parse(&tokens)?;
    Program::compile(kind, &statements, limits)
}

/// Compile, sample and render a program to HTML and PNG
///
/// CPU bound; call from a blocking context.
pub fn render(kind: PlotKind, source: &str, config: &PlotConfig) -> Result<Figure, PlotError> {
    let limits = Limits {
        default_resolution: config.default_resolution,
        max_resolution: config.max_resolution,
    };
    let program = compile(kind, source, config.max_source_bytes, limits)?;
    let mesh = mesh::sample(&program)?;

    let html = html::render(&mesh);
    let png = png::render(&mesh, config.image_width, config.image_height)
        .map_err(|e| PlotError::Encode(e.to_string()))?;

    Ok(Figure { html, png })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_produces_both_formats() {
        let config = PlotConfig {
            default_resolution: 12,
            image_width: 120,
            image_height: 90,
            ..PlotConfig::default()
        };
        let figure = render(
            PlotKind::Surface,
            "title = \"Ripple\"\nz = sin(sqrt(x^2 + y^2))",
            &config,
        )
        .unwrap();

        assert!(figure.html.contains("Ripple"));
        assert!(figure.html.contains("Plotly.newPlot"));
        assert_eq!(&figure.png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_source_limits() {
        assert_eq!(
            compile(PlotKind::Surface, "  \n ", 100, Limits::default()).unwrap_err(),
            PlotError::Empty
        );
        let long = format!("z = {}", "1+".repeat(100)) + "1";
        assert_eq!(
            compile(PlotKind::Surface, &long, 64, Limits::default()).unwrap_err(),
            PlotError::SourceTooLarge { limit: 64 }
        );
    }

    #[test]
    fn test_flat_chain_at_source_limit_is_rejected() {
        // Runs on a thread sized like the blocking pool's
        let source = format!("z = x{}", "+x".repeat(4090));
        assert!(source.len() <= PlotConfig::default().max_source_bytes);
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || render(PlotKind::Surface, &source, &PlotConfig::default()))
            .unwrap();
        assert!(matches!(
            handle.join().unwrap(),
            Err(PlotError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_code_is_not_executed() {
        let python = "import os\nfig = os.system('rm -rf /')";
        assert!(compile(PlotKind::Surface, python, 8192, Limits::default()).is_err());
    }
}
