//! Recursive-descent parser for plot programs
//!
//! Produces a flat list of [`Statement`]s. Function names are resolved
//! against the fixed [`Func`] table here, so nothing outside that table can
//! ever be called.

use super::lexer::{Spanned, Token};
use super::PlotError;

/// Maximum expression nesting (parentheses, unary chains, call arguments
/// and every folded binary operator)
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Rem => lhs % rhs,
            Self::Pow => lhs.powf(rhs),
        }
    }
}

/// Callable math functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Abs,
    Exp,
    Ln,
    Log10,
    Log2,
    Floor,
    Ceil,
    Round,
    Sign,
    Atan2,
    Pow,
    Hypot,
    Min,
    Max,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "exp" => Self::Exp,
            "ln" | "log" => Self::Ln,
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "sign" => Self::Sign,
            "atan2" => Self::Atan2,
            "pow" => Self::Pow,
            "hypot" => Self::Hypot,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        };
        Some(func)
    }

    pub const fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Pow | Self::Hypot | Self::Min | Self::Max => 2,
            _ => 1,
        }
    }

    /// Apply to already-evaluated arguments; `args.len()` equals `arity()`
    pub fn apply(self, args: &[f64]) -> f64 {
        let a = args.first().copied().unwrap_or(f64::NAN);
        let b = args.get(1).copied().unwrap_or(f64::NAN);
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Asin => a.asin(),
            Self::Acos => a.acos(),
            Self::Atan => a.atan(),
            Self::Sinh => a.sinh(),
            Self::Cosh => a.cosh(),
            Self::Tanh => a.tanh(),
            Self::Sqrt => a.sqrt(),
            Self::Abs => a.abs(),
            Self::Exp => a.exp(),
            Self::Ln => a.ln(),
            Self::Log10 => a.log10(),
            Self::Log2 => a.log2(),
            Self::Floor => a.floor(),
            Self::Ceil => a.ceil(),
            Self::Round => a.round(),
            Self::Sign => {
                if a == 0.0 || a.is_nan() {
                    a
                } else {
                    a.signum()
                }
            }
            Self::Atan2 => a.atan2(b),
            Self::Pow => a.powf(b),
            Self::Hypot => a.hypot(b),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var { name: String, line: usize },
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call { func: Func, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`
    Assign {
        name: String,
        value: Expr,
        line: usize,
    },
    /// `name = start..end`
    Range {
        name: String,
        start: Expr,
        end: Expr,
        line: usize,
    },
    /// `name = "text"`
    Text {
        name: String,
        value: String,
        line: usize,
    },
}

/// Parse a token stream produced by [`super::lexer::tokenize`]
pub fn parse(tokens: &[Spanned]) -> Result<Vec<Statement>, PlotError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut statements = Vec::new();

    loop {
        while parser.peek() == &Token::Separator {
            parser.pos += 1;
        }
        if parser.peek() == &Token::Eof {
            break;
        }
        statements.push(parser.statement()?);
    }

    Ok(statements)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |spanned| &spanned.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |spanned| spanned.line)
    }

    fn unexpected(&self, expected: &'static str) -> PlotError {
        PlotError::UnexpectedToken {
            line: self.line(),
            expected,
            found: self.peek().describe(),
        }
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), PlotError> {
        if self.peek() == token {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn enter(&mut self) -> Result<(), PlotError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(PlotError::TooDeep {
                line: self.line(),
                limit: MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Each fold makes the left-deep tree one level deeper
    fn fold(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> Result<Expr, PlotError> {
        self.enter()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn statement(&mut self) -> Result<Statement, PlotError> {
        let line = self.line();
        let Token::Ident(name) = self.peek().clone() else {
            return Err(self.unexpected("a variable name"));
        };
        self.pos += 1;
        self.expect(&Token::Assign, "'='")?;

        let statement = if let Token::Str(value) = self.peek().clone() {
            self.pos += 1;
            Statement::Text { name, value, line }
        } else {
            let value = self.expr()?;
            if self.peek() == &Token::DotDot {
                self.pos += 1;
                let end = self.expr()?;
                Statement::Range {
                    name,
                    start: value,
                    end,
                    line,
                }
            } else {
                Statement::Assign { name, value, line }
            }
        };

        match self.peek() {
            Token::Separator | Token::Eof => Ok(statement),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn expr(&mut self) -> Result<Expr, PlotError> {
        self.enter()?;
        let outer = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = self.fold(op, lhs, rhs)?;
        }
        self.depth = outer;
        self.leave();
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, PlotError> {
        let outer = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = self.fold(op, lhs, rhs)?;
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, PlotError> {
        self.enter()?;
        let expr = match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Expr::Neg(Box::new(self.unary()?))
            }
            Token::Plus => {
                self.pos += 1;
                self.unary()?
            }
            _ => self.power()?,
        };
        self.leave();
        Ok(expr)
    }

    /// `a ^ b`; the exponent may carry its own sign and binds to the right
    fn power(&mut self) -> Result<Expr, PlotError> {
        let base = self.primary()?;
        if self.peek() == &Token::Caret {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, PlotError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Number(value) => {
                self.pos += 1;
                Ok(Expr::Number(value))
            }
            Token::Ident(name) => {
                self.pos += 1;
                if self.peek() == &Token::LParen {
                    self.pos += 1;
                    self.call(name, line)
                } else {
                    Ok(Expr::Var { name, line })
                }
            }
            Token::LParen => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn call(&mut self, name: String, line: usize) -> Result<Expr, PlotError> {
        let func = Func::from_name(&name).ok_or(PlotError::UnknownFunction {
            line,
            name: name.clone(),
        })?;

        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.expr()?);
                if self.peek() == &Token::Comma {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;

        if args.len() != func.arity() {
            return Err(PlotError::Arity {
                line,
                name,
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call { func, args })
    }
}
