//! Compiled plot programs
//!
//! Compilation resolves every variable to a numbered slot, folds constants,
//! applies settings (`title`, axis ranges, `resolution`) and checks that the
//! expected output variable is assigned. Evaluation is then a plain walk over
//! the compiled nodes with no name lookups.

use std::collections::HashMap;
use std::f64::consts::{E, PI, TAU};

use super::parser::{BinOp, Expr, Func, Statement};
use super::{PlotError, PlotKind};

/// Hard cap on the number of statements in one program
pub const MAX_STATEMENTS: usize = 64;

/// Sampling limits applied while compiling
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub default_resolution: usize,
    pub max_resolution: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_resolution: 60,
            max_resolution: 200,
        }
    }
}

/// Inclusive sampling range of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub start: f64,
    pub end: f64,
}

impl AxisRange {
    /// `count` evenly spaced samples from `start` to `end`
    pub fn samples(&self, count: usize) -> Vec<f64> {
        if count < 2 {
            return vec![self.start];
        }
        let step = (self.end - self.start) / (count - 1) as f64;
        (0..count).map(|i| self.start + step * i as f64).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Slot(usize),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval(&self, slots: &[f64]) -> f64 {
        match self {
            Self::Const(value) => *value,
            Self::Slot(index) => slots[*index],
            Self::Neg(inner) => -inner.eval(slots),
            Self::Binary(op, lhs, rhs) => op.apply(lhs.eval(slots), rhs.eval(slots)),
            Self::Call(func, args) => {
                let mut values = [f64::NAN; 2];
                for (value, arg) in values.iter_mut().zip(args) {
                    *value = arg.eval(slots);
                }
                func.apply(&values[..args.len().min(2)])
            }
        }
    }
}

/// A program ready to be sampled
#[derive(Debug, Clone)]
pub struct Program {
    pub kind: PlotKind,
    pub title: Option<String>,
    pub axes: [AxisRange; 2],
    pub resolution: usize,
    assignments: Vec<Node>,
    output: usize,
}

impl Program {
    pub fn compile(
        kind: PlotKind,
        statements: &[Statement],
        limits: Limits,
    ) -> Result<Self, PlotError> {
        if statements.len() > MAX_STATEMENTS {
            return Err(PlotError::TooManyStatements {
                limit: MAX_STATEMENTS,
            });
        }

        let axis_names = kind.axis_names();
        let mut scope: HashMap<&str, usize> = HashMap::new();
        scope.insert(axis_names[0], 0);
        scope.insert(axis_names[1], 1);

        let mut program = Self {
            kind,
            title: None,
            axes: kind.default_ranges(),
            resolution: limits.default_resolution.clamp(2, limits.max_resolution.max(2)),
            assignments: Vec::new(),
            output: usize::MAX,
        };

        for statement in statements {
            match statement {
                Statement::Text { name, value, line } => {
                    if name != "title" {
                        return Err(PlotError::UnknownSetting {
                            line: *line,
                            name: name.clone(),
                        });
                    }
                    program.title = Some(value.clone());
                }
                Statement::Range {
                    name,
                    start,
                    end,
                    line,
                } => {
                    let Some(axis) = axis_names.iter().position(|a| a == name) else {
                        return Err(PlotError::InvalidRange {
                            line: *line,
                            name: name.clone(),
                        });
                    };
                    let start = constant(start, name, *line)?;
                    let end = constant(end, name, *line)?;
                    if !start.is_finite() || !end.is_finite() || start >= end {
                        return Err(PlotError::InvalidRange {
                            line: *line,
                            name: name.clone(),
                        });
                    }
                    program.axes[axis] = AxisRange { start, end };
                }
                Statement::Assign { name, value, line } => {
                    match name.as_str() {
                        "title" => {
                            return Err(PlotError::ExpectedText {
                                line: *line,
                                name: name.clone(),
                            })
                        }
                        "resolution" => {
                            let requested = constant(value, name, *line)?;
                            if !requested.is_finite() {
                                return Err(PlotError::NotConstant {
                                    line: *line,
                                    name: name.clone(),
                                });
                            }
                            let max = limits.max_resolution.max(2);
                            program.resolution = requested.round().clamp(2.0, max as f64) as usize;
                            continue;
                        }
                        _ => {}
                    }
                    if axis_names.contains(&name.as_str()) || constant_value(name).is_some() {
                        return Err(PlotError::ReservedName {
                            line: *line,
                            name: name.clone(),
                        });
                    }
                    let node = compile_expr(value, &scope)?;
                    let slot = 2 + program.assignments.len();
                    program.assignments.push(node);
                    scope.insert(name.as_str(), slot);
                }
            }
        }

        program.output = *scope
            .get(kind.output_name())
            .ok_or(PlotError::NoFigure {
                expected: kind.output_name(),
            })?;
        Ok(program)
    }

    /// Number of scratch slots `eval` needs
    pub fn slot_count(&self) -> usize {
        2 + self.assignments.len()
    }

    /// Evaluate the output variable at one sample point
    pub fn eval(&self, a: f64, b: f64, slots: &mut Vec<f64>) -> f64 {
        slots.clear();
        slots.resize(self.slot_count(), f64::NAN);
        slots[0] = a;
        slots[1] = b;
        for (index, node) in self.assignments.iter().enumerate() {
            let value = node.eval(slots);
            slots[2 + index] = value;
        }
        slots[self.output]
    }
}

fn constant_value(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "tau" => Some(TAU),
        "e" => Some(E),
        _ => None,
    }
}

fn compile_expr(expr: &Expr, scope: &HashMap<&str, usize>) -> Result<Node, PlotError> {
    let node = match expr {
        Expr::Number(value) => Node::Const(*value),
        Expr::Var { name, line } => {
            if let Some(slot) = scope.get(name.as_str()) {
                Node::Slot(*slot)
            } else if let Some(value) = constant_value(name) {
                Node::Const(value)
            } else {
                return Err(PlotError::UndefinedVariable {
                    line: *line,
                    name: name.clone(),
                });
            }
        }
        Expr::Neg(inner) => match compile_expr(inner, scope)? {
            Node::Const(value) => Node::Const(-value),
            inner => Node::Neg(Box::new(inner)),
        },
        Expr::Binary { op, lhs, rhs } => {
            match (compile_expr(lhs, scope)?, compile_expr(rhs, scope)?) {
                (Node::Const(a), Node::Const(b)) => Node::Const(op.apply(a, b)),
                (lhs, rhs) => Node::Binary(*op, Box::new(lhs), Box::new(rhs)),
            }
        }
        Expr::Call { func, args } => {
            let args = args
                .iter()
                .map(|arg| compile_expr(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            if args.iter().all(|arg| matches!(arg, Node::Const(_))) {
                Node::Const(Node::Call(*func, args).eval(&[]))
            } else {
                Node::Call(*func, args)
            }
        }
    };
    Ok(node)
}

/// Evaluate an expression that may only use numbers, constants and functions
fn constant(expr: &Expr, setting: &str, line: usize) -> Result<f64, PlotError> {
    match compile_expr(expr, &HashMap::new()) {
        Ok(Node::Const(value)) => Ok(value),
        Ok(_) | Err(PlotError::UndefinedVariable { .. }) => Err(PlotError::NotConstant {
            line,
            name: setting.to_string(),
        }),
        Err(other) => Err(other),
    }
}
