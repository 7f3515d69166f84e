//! Hand-written parser for host type expressions.
//!
//! Handles the notation used in declaration files: named types (optionally
//! qualified, optionally with type arguments), slices, arrays, string or
//! other keyed maps, pointers, channels of all three directions, function
//! types with variadic tails and type parameters, and inline `struct` and
//! `interface` bodies. Does NOT handle grouped parameter names (`a, b int`),
//! embedded fields, or embedded interfaces.

use std::fmt;

use tether_core::ChanDir;

use crate::error::{GenError, Result};

/// A parsed type expression. Names are not resolved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `int`, `geo.Point`, `List[T]`.
    Name { name: String, args: Vec<TypeExpr> },
    Slice(Box<TypeExpr>),
    Array { length: usize, element: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Pointer(Box<TypeExpr>),
    Func(FuncExpr),
    Chan { direction: ChanDir, element: Box<TypeExpr> },
    Struct(Vec<FieldExpr>),
    Interface(Vec<MethodExpr>),
}

/// A parsed function type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncExpr {
    /// Type parameter names; constraints are parsed and dropped.
    pub type_params: Vec<String>,
    pub params: Vec<ParamExpr>,
    pub results: Vec<ParamExpr>,
    /// The last parameter was written `...T` and is stored as `[]T`.
    pub variadic: bool,
}

/// A parameter or result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamExpr {
    pub name: Option<String>,
    pub ty: TypeExpr,
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpr {
    pub name: String,
    pub ty: TypeExpr,
}

/// An interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodExpr {
    pub name: String,
    pub func: FuncExpr,
}

impl TypeExpr {
    /// Parse a complete type expression.
    ///
    /// Examples:
    /// - `"map[string][]geo.Point"`
    /// - `"func(format string, args ...any) (int, error)"`
    /// - `"struct { X float64; Y float64 }"`
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input)?;
        let ty = parser.parse_type()?;
        parser.finish()?;
        Ok(ty)
    }
}

impl FuncExpr {
    /// Parse a function type; the leading `func` keyword is optional.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser::new(input)?;
        if parser.peek_ident() == Some("func") {
            parser.pos += 1;
        }
        let func = parser.parse_func_tail()?;
        parser.finish()?;
        Ok(func)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    write_list(f, args)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            TypeExpr::Slice(elem) => write!(f, "[]{elem}"),
            TypeExpr::Array { length, element } => write!(f, "[{length}]{element}"),
            TypeExpr::Map { key, value } => write!(f, "map[{key}]{value}"),
            TypeExpr::Pointer(elem) => write!(f, "*{elem}"),
            TypeExpr::Func(func) => write!(f, "func{func}"),
            TypeExpr::Chan { direction, element } => match direction {
                ChanDir::Both => write!(f, "chan {element}"),
                ChanDir::SendOnly => write!(f, "chan<- {element}"),
                ChanDir::RecvOnly => write!(f, "<-chan {element}"),
            },
            TypeExpr::Struct(fields) => {
                if fields.is_empty() {
                    return write!(f, "struct {{}}");
                }
                write!(f, "struct {{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                write!(f, " }}")
            }
            TypeExpr::Interface(methods) => {
                if methods.is_empty() {
                    return write!(f, "interface {{}}");
                }
                write!(f, "interface {{ ")?;
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}{}", method.name, method.func)?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for FuncExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            write!(f, "[{} any]", self.type_params.join(" any, "))?;
        }
        write!(f, "(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let Some(name) = &param.name {
                write!(f, "{name} ")?;
            }
            match (&param.ty, self.variadic && i == last) {
                (TypeExpr::Slice(elem), true) => write!(f, "...{elem}")?,
                (ty, _) => write!(f, "{ty}")?,
            }
        }
        write!(f, ")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] if single.name.is_none() => write!(f, " {}", single.ty),
            results => {
                write!(f, " (")?;
                for (i, result) in results.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &result.name {
                        write!(f, "{name} ")?;
                    }
                    write!(f, "{}", result.ty)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

// === Tokenizer ===

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(usize),
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Star,
    Comma,
    Semi,
    Ellipsis,
    /// `<-`
    Arrow,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{s}'"),
            Token::Int(n) => write!(f, "'{n}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Star => write!(f, "'*'"),
            Token::Comma => write!(f, "','"),
            Token::Semi => write!(f, "';'"),
            Token::Ellipsis => write!(f, "'...'"),
            Token::Arrow => write!(f, "'<-'"),
        }
    }
}

fn invalid(detail: impl Into<String>) -> GenError {
    GenError::InvalidTypeExpr {
        detail: detail.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            '.' => {
                if chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
                    tokens.push(Token::Ellipsis);
                    i += 3;
                } else {
                    return Err(invalid(format!("unexpected '.' at offset {i}")));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'-') {
                    tokens.push(Token::Arrow);
                    i += 2;
                } else {
                    return Err(invalid(format!("unexpected '<' at offset {i}")));
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("array length '{text}' out of range")))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() {
                    let c = chars[i];
                    let continues_qualified = c == '.'
                        && chars
                            .get(i + 1)
                            .is_some_and(|n| n.is_alphabetic() || *n == '_');
                    if c.is_alphanumeric() || c == '_' || continues_qualified {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

// === Parser ===

const KEYWORDS: &[&str] = &["map", "chan", "func", "struct", "interface"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(invalid("empty type expression"));
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Ident(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(invalid(format!("expected {expected}, found {tok}"))),
            None => Err(invalid(format!("expected {expected}, found end of input"))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some(Token::Ident(s)) => Ok(s),
            Some(tok) => Err(invalid(format!("expected {what}, found {tok}"))),
            None => Err(invalid(format!("expected {what}, found end of input"))),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(invalid(format!("unexpected trailing {tok}"))),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        match self.next() {
            Some(Token::LBracket) => match self.next() {
                Some(Token::RBracket) => Ok(TypeExpr::Slice(Box::new(self.parse_type()?))),
                Some(Token::Int(length)) => {
                    self.expect(Token::RBracket)?;
                    Ok(TypeExpr::Array {
                        length,
                        element: Box::new(self.parse_type()?),
                    })
                }
                Some(tok) => Err(invalid(format!("expected ']' or array length, found {tok}"))),
                None => Err(invalid("unterminated '['")),
            },
            Some(Token::Star) => Ok(TypeExpr::Pointer(Box::new(self.parse_type()?))),
            Some(Token::Arrow) => {
                let kw = self.expect_ident("'chan' after '<-'")?;
                if kw != "chan" {
                    return Err(invalid(format!("expected 'chan' after '<-', found '{kw}'")));
                }
                Ok(TypeExpr::Chan {
                    direction: ChanDir::RecvOnly,
                    element: Box::new(self.parse_type()?),
                })
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "map" => {
                    self.expect(Token::LBracket)?;
                    let key = self.parse_type()?;
                    self.expect(Token::RBracket)?;
                    let value = self.parse_type()?;
                    Ok(TypeExpr::Map {
                        key: Box::new(key),
                        value: Box::new(value),
                    })
                }
                "chan" => {
                    let direction = if self.peek() == Some(&Token::Arrow) {
                        self.pos += 1;
                        ChanDir::SendOnly
                    } else {
                        ChanDir::Both
                    };
                    Ok(TypeExpr::Chan {
                        direction,
                        element: Box::new(self.parse_type()?),
                    })
                }
                "func" => Ok(TypeExpr::Func(self.parse_func_tail()?)),
                "struct" => self.parse_struct(),
                "interface" => self.parse_interface(),
                _ => {
                    let mut args = Vec::new();
                    if self.peek() == Some(&Token::LBracket)
                        && matches!(self.peek_at(1), Some(tok) if *tok != Token::RBracket && !matches!(tok, Token::Int(_)))
                    {
                        self.pos += 1;
                        loop {
                            args.push(self.parse_type()?);
                            match self.next() {
                                Some(Token::Comma) => continue,
                                Some(Token::RBracket) => break,
                                Some(tok) => {
                                    return Err(invalid(format!(
                                        "expected ',' or ']' in type arguments, found {tok}"
                                    )))
                                }
                                None => return Err(invalid("unterminated type arguments")),
                            }
                        }
                    }
                    Ok(TypeExpr::Name { name, args })
                }
            },
            Some(tok) => Err(invalid(format!("expected a type, found {tok}"))),
            None => Err(invalid("expected a type, found end of input")),
        }
    }

    /// Parse what follows the `func` keyword (or a method name).
    fn parse_func_tail(&mut self) -> Result<FuncExpr> {
        let mut type_params = Vec::new();
        if self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            loop {
                type_params.push(self.expect_ident("type parameter name")?);
                // Constraint.
                self.parse_type()?;
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::RBracket) => break,
                    Some(tok) => {
                        return Err(invalid(format!(
                            "expected ',' or ']' in type parameters, found {tok}"
                        )))
                    }
                    None => return Err(invalid("unterminated type parameters")),
                }
            }
        }

        self.expect(Token::LParen)?;
        let (params, variadic) = self.parse_param_list(true)?;

        let results = match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                self.parse_param_list(false)?.0
            }
            Some(Token::Ident(_)) | Some(Token::LBracket) | Some(Token::Star) | Some(Token::Arrow) => {
                vec![ParamExpr {
                    name: None,
                    ty: self.parse_type()?,
                }]
            }
            _ => Vec::new(),
        };

        Ok(FuncExpr {
            type_params,
            params,
            results,
            variadic,
        })
    }

    /// Whether the identifier at the cursor names a parameter rather than
    /// starting its type.
    fn at_param_name(&self) -> bool {
        let Some(Token::Ident(name)) = self.peek() else {
            return false;
        };
        if KEYWORDS.contains(&name.as_str()) {
            return false;
        }
        match self.peek_at(1) {
            Some(Token::Ident(_)) | Some(Token::Star) | Some(Token::Arrow) | Some(Token::Ellipsis) => true,
            Some(Token::LBracket) => {
                matches!(self.peek_at(2), Some(Token::RBracket) | Some(Token::Int(_)))
            }
            _ => false,
        }
    }

    /// Parse a parenthesized list; the opening paren is already consumed.
    fn parse_param_list(&mut self, allow_variadic: bool) -> Result<(Vec<ParamExpr>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok((params, variadic));
        }
        loop {
            if variadic {
                return Err(invalid("variadic parameter must be last"));
            }
            let name = if self.at_param_name() {
                Some(self.expect_ident("parameter name")?)
            } else {
                None
            };
            let ty = if self.peek() == Some(&Token::Ellipsis) {
                if !allow_variadic {
                    return Err(invalid("'...' is only allowed on the last parameter"));
                }
                self.pos += 1;
                variadic = true;
                TypeExpr::Slice(Box::new(self.parse_type()?))
            } else {
                self.parse_type()?
            };
            params.push(ParamExpr { name, ty });
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                Some(tok) => return Err(invalid(format!("expected ',' or ')', found {tok}"))),
                None => return Err(invalid("unterminated parameter list")),
            }
        }

        let named = params.iter().filter(|p| p.name.is_some()).count();
        if named != 0 && named != params.len() {
            return Err(invalid(
                "mixed named and unnamed parameters (grouped names are not supported)",
            ));
        }
        Ok((params, variadic))
    }

    fn parse_struct(&mut self) -> Result<TypeExpr> {
        self.expect(Token::LBrace)?;
        let mut fields: Vec<FieldExpr> = Vec::new();
        loop {
            match self.next() {
                Some(Token::RBrace) => break,
                Some(Token::Semi) => continue,
                Some(Token::Ident(name)) => {
                    if fields.iter().any(|f| f.name == name) {
                        return Err(invalid(format!("duplicate field '{name}'")));
                    }
                    let ty = self.parse_type()?;
                    fields.push(FieldExpr { name, ty });
                    match self.peek() {
                        Some(Token::Semi) | Some(Token::RBrace) => {}
                        Some(tok) => {
                            return Err(invalid(format!("expected ';' or '}}' after field, found {tok}")))
                        }
                        None => return Err(invalid("unterminated struct")),
                    }
                }
                Some(tok) => return Err(invalid(format!("expected field name, found {tok}"))),
                None => return Err(invalid("unterminated struct")),
            }
        }
        Ok(TypeExpr::Struct(fields))
    }

    fn parse_interface(&mut self) -> Result<TypeExpr> {
        self.expect(Token::LBrace)?;
        let mut methods: Vec<MethodExpr> = Vec::new();
        loop {
            match self.next() {
                Some(Token::RBrace) => break,
                Some(Token::Semi) => continue,
                Some(Token::Ident(name)) => {
                    if self.peek() != Some(&Token::LParen) {
                        return Err(invalid(format!(
                            "embedded interface '{name}' is not supported"
                        )));
                    }
                    if methods.iter().any(|m| m.name == name) {
                        return Err(invalid(format!("duplicate method '{name}'")));
                    }
                    let func = self.parse_func_tail()?;
                    methods.push(MethodExpr { name, func });
                }
                Some(tok) => return Err(invalid(format!("expected method name, found {tok}"))),
                None => return Err(invalid("unterminated interface")),
            }
        }
        Ok(TypeExpr::Interface(methods))
    }
}

/// Predeclared names that need no declaration.
pub const PREDECLARED: &[&str] = &[
    "bool", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
    "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64", "complex128",
    "string", "error", "any", "unsafe.Pointer",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> TypeExpr {
        TypeExpr::Name {
            name: n.to_string(),
            args: Vec::new(),
        }
    }

    #[test]
    fn parse_named_and_qualified() {
        assert_eq!(TypeExpr::parse("int").unwrap(), name("int"));
        assert_eq!(TypeExpr::parse(" geo.Point ").unwrap(), name("geo.Point"));
        assert_eq!(TypeExpr::parse("unsafe.Pointer").unwrap(), name("unsafe.Pointer"));
    }

    #[test]
    fn parse_composites() {
        let ty = TypeExpr::parse("map[string][]*geo.Point").unwrap();
        assert_eq!(
            ty,
            TypeExpr::Map {
                key: Box::new(name("string")),
                value: Box::new(TypeExpr::Slice(Box::new(TypeExpr::Pointer(Box::new(name(
                    "geo.Point"
                )))))),
            }
        );
        assert_eq!(
            TypeExpr::parse("[4]byte").unwrap(),
            TypeExpr::Array {
                length: 4,
                element: Box::new(name("byte"))
            }
        );
    }

    #[test]
    fn parse_channel_directions() {
        let both = TypeExpr::parse("chan int").unwrap();
        let send = TypeExpr::parse("chan<- int").unwrap();
        let recv = TypeExpr::parse("<-chan int").unwrap();
        assert!(matches!(both, TypeExpr::Chan { direction: ChanDir::Both, .. }));
        assert!(matches!(send, TypeExpr::Chan { direction: ChanDir::SendOnly, .. }));
        assert!(matches!(recv, TypeExpr::Chan { direction: ChanDir::RecvOnly, .. }));
    }

    #[test]
    fn parse_func_with_names_and_results() {
        let func = FuncExpr::parse("func(a geo.Point, b geo.Point) float64").unwrap();
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[0].name.as_deref(), Some("a"));
        assert_eq!(func.results, vec![ParamExpr { name: None, ty: name("float64") }]);
        assert!(!func.variadic);
    }

    #[test]
    fn parse_variadic() {
        let func = FuncExpr::parse("func(format string, args ...any) (int, error)").unwrap();
        assert!(func.variadic);
        assert_eq!(func.params[1].ty, TypeExpr::Slice(Box::new(name("any"))));
        assert_eq!(func.results.len(), 2);
    }

    #[test]
    fn parse_unnamed_params_and_nested_func() {
        let func = FuncExpr::parse("func(func(int) string, []int)").unwrap();
        assert_eq!(func.params.len(), 2);
        match &func.params[0].ty {
            TypeExpr::Func(inner) => assert_eq!(inner.results.len(), 1),
            other => panic!("expected func, got {other:?}"),
        }
        assert!(func.results.is_empty());
    }

    #[test]
    fn parse_type_params() {
        let func = FuncExpr::parse("func[T any, U comparable](x T) U").unwrap();
        assert_eq!(func.type_params, vec!["T", "U"]);
    }

    #[test]
    fn parse_generic_name() {
        let ty = TypeExpr::parse("*List[T]").unwrap();
        assert_eq!(
            ty,
            TypeExpr::Pointer(Box::new(TypeExpr::Name {
                name: "List".into(),
                args: vec![name("T")],
            }))
        );
    }

    #[test]
    fn parse_struct_and_interface() {
        let ty = TypeExpr::parse("struct { A int; B string; Nested struct { X int } }").unwrap();
        match ty {
            TypeExpr::Struct(fields) => {
                assert_eq!(fields.len(), 3);
                assert!(matches!(fields[2].ty, TypeExpr::Struct(_)));
            }
            other => panic!("expected struct, got {other:?}"),
        }

        let ty = TypeExpr::parse("interface { Area() float64; Scale(f float64) }").unwrap();
        match ty {
            TypeExpr::Interface(methods) => {
                assert_eq!(methods[0].name, "Area");
                assert_eq!(methods[1].func.params.len(), 1);
            }
            other => panic!("expected interface, got {other:?}"),
        }
        assert_eq!(TypeExpr::parse("interface{}").unwrap(), TypeExpr::Interface(Vec::new()));
    }

    #[test]
    fn display_round_trips_text() {
        for text in [
            "map[string][]*geo.Point",
            "func(a int, b ...string) (int, error)",
            "<-chan [3]float64",
            "struct { X int; Y string }",
        ] {
            let ty = TypeExpr::parse(text).unwrap();
            assert_eq!(ty.to_string(), text);
        }
    }

    #[test]
    fn errors() {
        assert!(TypeExpr::parse("").is_err());
        assert!(TypeExpr::parse("map[string").is_err());
        assert!(TypeExpr::parse("[]int extra").is_err());
        assert!(FuncExpr::parse("func(a, b int)").is_err());
        assert!(FuncExpr::parse("func(a ...int, b int)").is_err());
        assert!(TypeExpr::parse("struct { X int; X int }").is_err());
        assert!(TypeExpr::parse("interface { io.Reader }").is_err());
        assert!(TypeExpr::parse("a.").is_err());
    }
}
