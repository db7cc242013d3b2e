// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// A value travelling on a port in the interpreted world.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Boolean(bool),
    Int(i32),
    Double(f64),
    String(String),
    Array(Vec<Token>),
}

impl Token {
    pub fn type_name(&self) -> &'static str {
        match self {
            Token::Boolean(_) => "boolean",
            Token::Int(_) => "int",
            Token::Double(_) => "double",
            Token::String(_) => "string",
            Token::Array(_) => "array",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Boolean(v) => write!(f, "{}", v),
            Token::Int(v) => write!(f, "{}", v),
            Token::Double(v) => write!(f, "{}", v),
            Token::String(v) => write!(f, "\"{}\"", v),
            Token::Array(elements) => {
                f.write_str("{")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Boolean(value)
    }
}

impl From<i32> for Token {
    fn from(value: i32) -> Self {
        Token::Int(value)
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::Double(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::String(value.to_string())
    }
}
