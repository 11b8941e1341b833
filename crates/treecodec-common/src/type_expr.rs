//! Textual type expressions used in type library files.
//!
//! The grammar is the canonical printable form of a descriptor:
//!
//! ```text
//! expr := '~' IDENT                      placeholder
//!       | IDENT                          named type
//!       | IDENT '[' expr (',' expr)* ']' parameterized type
//!       | 'Tuple' '[' '(' ')' ']'        empty tuple
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use treecodec_core::cursor::DEFAULT_MAX_DEPTH;

/// The one name that takes the `()` argument list.
const EMPTY_TUPLE_NAME: &str = "Tuple";

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    /// Generic placeholder, e.g. `~T`.
    Variable(String),
    /// Named type with its (possibly empty) arguments, e.g. `Mapping[str, int]`.
    Reference(String, Vec<TypeExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeExprError {
    #[error("Unexpected end of type expression '{input}'")]
    UnexpectedEnd { input: String },

    #[error("Unexpected '{found}' at position {position} in type expression '{input}'")]
    Unexpected {
        found: char,
        position: usize,
        input: String,
    },

    #[error("Type expression '{input}' nests deeper than {limit} levels")]
    TooDeep { input: String, limit: usize },
}

impl TypeExpr {
    pub fn reference(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Reference(name.into(), args)
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Reference(name.into(), Vec::new())
    }

    pub fn parse(input: &str) -> Result<Self, TypeExprError> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        };
        let expr = parser.expr(0)?;
        parser.skip_ws();
        match parser.peek() {
            None => Ok(expr),
            Some((position, found)) => Err(TypeExprError::Unexpected {
                found,
                position,
                input: input.to_string(),
            }),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn end(&self) -> TypeExprError {
        TypeExprError::UnexpectedEnd {
            input: self.input.to_string(),
        }
    }

    fn unexpected(&self, (position, found): (usize, char)) -> TypeExprError {
        TypeExprError::Unexpected {
            found,
            position,
            input: self.input.to_string(),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), TypeExprError> {
        self.skip_ws();
        match self.peek() {
            Some((_, c)) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some(other) => Err(self.unexpected(other)),
            None => Err(self.end()),
        }
    }

    fn ident(&mut self) -> Result<String, TypeExprError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|(_, c)| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(other) => self.unexpected(other),
                None => self.end(),
            });
        }
        Ok(self.chars[start..self.pos].iter().map(|(_, c)| c).collect())
    }

    fn expr(&mut self, depth: usize) -> Result<TypeExpr, TypeExprError> {
        if depth >= DEFAULT_MAX_DEPTH {
            return Err(TypeExprError::TooDeep {
                input: self.input.to_string(),
                limit: DEFAULT_MAX_DEPTH,
            });
        }
        self.skip_ws();
        if let Some((_, '~')) = self.peek() {
            self.pos += 1;
            return Ok(TypeExpr::Variable(self.ident()?));
        }

        let name = self.ident()?;
        self.skip_ws();
        if !matches!(self.peek(), Some((_, '['))) {
            return Ok(TypeExpr::Reference(name, Vec::new()));
        }
        self.pos += 1;
        self.skip_ws();

        // `Tuple[()]` spells the empty tuple
        if let Some(open @ (_, '(')) = self.peek() {
            if name != EMPTY_TUPLE_NAME {
                return Err(self.unexpected(open));
            }
            self.pos += 1;
            self.expect(')')?;
            self.expect(']')?;
            return Ok(TypeExpr::Reference(name, Vec::new()));
        }

        let mut args = vec![self.expr(depth + 1)?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some((_, ',')) => {
                    self.pos += 1;
                    args.push(self.expr(depth + 1)?);
                }
                Some((_, ']')) => {
                    self.pos += 1;
                    return Ok(TypeExpr::Reference(name, args));
                }
                Some(other) => return Err(self.unexpected(other)),
                None => return Err(self.end()),
            }
        }
    }
}

impl FromStr for TypeExpr {
    type Err = TypeExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeExpr::parse(s)
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = TypeExprError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TypeExpr::parse(&s)
    }
}

impl From<TypeExpr> for String {
    fn from(expr: TypeExpr) -> String {
        expr.to_string()
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Variable(name) => write!(f, "~{name}"),
            TypeExpr::Reference(name, args) if args.is_empty() && name == EMPTY_TUPLE_NAME => {
                write!(f, "{name}[()]")
            }
            TypeExpr::Reference(name, args) if args.is_empty() => f.write_str(name),
            TypeExpr::Reference(name, args) => {
                write!(f, "{name}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
        }
    }
}
