use std::fmt::Display;

/// Wire discriminator of an encoded value. The numeric values are part of
/// the wire format and must never change.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Placeholder only, never valid on the wire.
    Undefined = 0,
    List = 1,
    Integer = 2,
    Double = 3,
    String = 4,
    Symbol = 5,
    Blob = 6,
}

impl ValueType {
    /// Maps a tag byte to a type; `None` outside `List..=Blob`.
    pub fn from_tag(tag: u8) -> Option<ValueType> {
        match tag {
            1 => Some(ValueType::List),
            2 => Some(ValueType::Integer),
            3 => Some(ValueType::Double),
            4 => Some(ValueType::String),
            5 => Some(ValueType::Symbol),
            6 => Some(ValueType::Blob),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::Undefined => "undefined",
            ValueType::List => "list",
            ValueType::Integer => "integer",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Symbol => "symbol",
            ValueType::Blob => "blob",
        };
        write!(f, "{}", name)
    }
}

/// A string without whitespace.
///
/// Construction does not validate; the codec rejects symbols that contain
/// whitespace on both the write and the read path.
#[derive(Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Default)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        is_valid_symbol(&self.0)
    }
}

pub(crate) fn is_valid_symbol(name: &str) -> bool {
    !name.chars().any(char::is_whitespace)
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(name)
    }
}

/// A value shared by lexer literals and the binary codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    List(Vec<Value>),
    Integer(i64),
    Double(f64),
    String(String),
    Symbol(Symbol),
    Blob(Vec<u8>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::List(_) => ValueType::List,
            Value::Integer(_) => ValueType::Integer,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Symbol(_) => ValueType::Symbol,
            Value::Blob(_) => ValueType::Blob,
        }
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Value::Symbol(Symbol::new(name))
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            Value::Symbol(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Integer(v) => write!(f, "{}", v),
            // keep a decimal point so the text lexes back as a decimal
            Value::Double(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => {
                write!(f, "\"")?;
                for c in v.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Value::Symbol(v) => write!(f, "{}", v),
            Value::Blob(v) => write!(f, "#blob[{}]", v.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Symbol> for Value {
    fn from(v: Symbol) -> Self {
        Value::Symbol(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}
