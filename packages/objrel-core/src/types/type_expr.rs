//! Declared type expressions, as written in declaration files or produced by
//! [`Persist::type_expr`](crate::Persist::type_expr).
//!
//! Grammar:
//! ```text
//! expr := term ('|' term)*
//! term := ident ('<' expr (',' expr)* '>')?
//! ```

use std::fmt;

use super::error::TypeError;

/// Unresolved type expression.
///
/// Expressions can describe shapes the resolver rejects (unions, unknown
/// names, `list` without a parameter); rejection happens in
/// [`TypeRegistry::resolve`](super::TypeRegistry::resolve), not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// Scalar keyword, record name or bare generic name
    Named(String),
    /// Generic application such as `list<int>`
    Generic { name: String, args: Vec<TypeExpr> },
    /// `a | b`
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    /// `list<element>`
    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::Generic {
            name: "list".to_string(),
            args: vec![element],
        }
    }

    /// `map<str, value>`
    pub fn map(value: TypeExpr) -> Self {
        TypeExpr::Generic {
            name: "map".to_string(),
            args: vec![TypeExpr::named("str"), value],
        }
    }

    /// Parses a type expression.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let mut parser = ExprParser { input, pos: 0 };
        let expr = parser.parse_union()?;
        if parser.peek().is_some() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Generic { name, args } => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            TypeExpr::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&mut self) -> Option<u8> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        bytes.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> TypeError {
        TypeError::Parse {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn parse_union(&mut self) -> Result<TypeExpr, TypeError> {
        let mut members = vec![self.parse_term()?];
        while self.peek() == Some(b'|') {
            self.pos += 1;
            members.push(self.parse_term()?);
        }
        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(TypeExpr::Union(members))
        }
    }

    fn parse_term(&mut self) -> Result<TypeExpr, TypeError> {
        self.peek();
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected type name"));
        }
        let name = self.input[start..self.pos].to_string();

        if self.peek() != Some(b'<') {
            return Ok(TypeExpr::Named(name));
        }
        self.pos += 1;

        let mut args = vec![self.parse_union()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            args.push(self.parse_union()?);
        }
        if self.peek() != Some(b'>') {
            return Err(self.error("expected '>'"));
        }
        self.pos += 1;
        Ok(TypeExpr::Generic { name, args })
    }
}
