// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Array-typed outputs.
//!
//! A unit returns an [`ArrayPayload`] per produced value. Elements are
//! reboxed against the port's declared element type. A direct conversion is
//! tried first; when the element kind differs from the declared one the
//! value goes through its normalized text form and is parsed as the target
//! type. A value that parses to nothing is an error, never a dropped element.

use crate::core::graph::PortType;
use crate::core::marshal::Token;
use crate::core::{FlowError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Boolean(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Array(ArrayPayload),
}

/// `size` plus the element sequence, as generated code lays out arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPayload {
    pub size: usize,
    pub elements: Vec<ArrayElement>,
}

impl ArrayPayload {
    pub fn new(elements: Vec<ArrayElement>) -> Self {
        Self {
            size: elements.len(),
            elements,
        }
    }

    /// Rebox into a [`Token::Array`] whose elements have `element_type`.
    pub fn to_token(&self, port: &str, element_type: &PortType) -> Result<Token> {
        if self.size != self.elements.len() {
            return Err(FlowError::OutputShape {
                port: port.to_string(),
                expected: self.size,
                found: self.elements.len(),
            });
        }
        let tokens = self
            .elements
            .iter()
            .map(|element| convert_element(port, element, element_type))
            .collect::<Result<Vec<_>>>()?;
        Ok(Token::Array(tokens))
    }
}

fn convert_element(port: &str, element: &ArrayElement, target: &PortType) -> Result<Token> {
    match (target, element) {
        (PortType::Boolean, ArrayElement::Boolean(v)) => Ok(Token::Boolean(*v)),
        (PortType::Double, ArrayElement::Double(v)) => Ok(Token::Double(*v)),
        (PortType::Double, ArrayElement::Int(v)) => Ok(Token::Double(*v as f64)),
        (PortType::Int, ArrayElement::Int(v)) if i32::try_from(*v).is_ok() => {
            Ok(Token::Int(*v as i32))
        }
        (PortType::String, ArrayElement::Text(v)) => Ok(Token::String(v.clone())),
        (PortType::Array(inner), ArrayElement::Array(payload)) => payload.to_token(port, inner),
        (PortType::Unknown, other) => natural_token(port, other),
        (_, ArrayElement::Array(payload)) => Err(conversion_error(
            port,
            &format!("{{size={}}}", payload.size),
            target,
        )),
        (_, other) => parse_normalized(port, &normalize(other), target),
    }
}

fn natural_token(port: &str, element: &ArrayElement) -> Result<Token> {
    match element {
        ArrayElement::Boolean(v) => Ok(Token::Boolean(*v)),
        ArrayElement::Int(v) => i32::try_from(*v)
            .map(Token::Int)
            .or(Ok(Token::Double(*v as f64))),
        ArrayElement::Double(v) => Ok(Token::Double(*v)),
        ArrayElement::Text(v) => Ok(Token::String(v.clone())),
        ArrayElement::Array(payload) => payload.to_token(port, &PortType::Unknown),
    }
}

fn normalize(element: &ArrayElement) -> String {
    match element {
        ArrayElement::Boolean(v) => v.to_string(),
        ArrayElement::Int(v) => v.to_string(),
        ArrayElement::Double(v) => v.to_string(),
        ArrayElement::Text(v) => v.trim().trim_matches('"').to_string(),
        ArrayElement::Array(payload) => format!("{{size={}}}", payload.size),
    }
}

fn parse_normalized(port: &str, text: &str, target: &PortType) -> Result<Token> {
    let parsed = match target {
        PortType::Boolean => text.parse::<bool>().ok().map(Token::Boolean),
        PortType::Int => text.parse::<i32>().ok().map(Token::Int).or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .filter(|v| *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
                .map(|v| Token::Int(v as i32))
        }),
        PortType::Double => text.parse::<f64>().ok().map(Token::Double),
        PortType::String => Some(Token::String(text.to_string())),
        PortType::Array(_) | PortType::Unknown => None,
    };
    parsed.ok_or_else(|| conversion_error(port, text, target))
}

fn conversion_error(port: &str, value: &str, target: &PortType) -> FlowError {
    FlowError::ArrayElementConversion {
        port: port.to_string(),
        value: value.to_string(),
        target: target.to_string(),
    }
}
