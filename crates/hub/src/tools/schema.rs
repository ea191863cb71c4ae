// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-Schema to parameter-descriptor translation.
//!
//! A discovered tool definition carries an object `inputSchema`. The
//! translator turns it into a descriptor set the dynamic registry can hand
//! to the aggregator, plus the marshalling rules the executor applies when
//! assembling outgoing `tools/call` arguments. No code generation: the
//! parameter surface is plain data.

use serde_json::{Map, Value};
use tracing::warn;

use crate::mcp::ToolInfo;

/// Errors that make a tool definition untranslatable.
///
/// The orchestrator logs and skips such tools; they never fail a mount.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Tool name missing or empty.
    #[error("tool name must be a non-empty string")]
    InvalidName,

    /// `inputSchema` is present but not a JSON object.
    #[error("inputSchema must be a JSON object")]
    NotAnObject,

    /// `inputSchema` lacks the `type` field.
    #[error("inputSchema is missing 'type'")]
    MissingType,

    /// `inputSchema.properties` is not an object.
    #[error("inputSchema.properties must be an object")]
    InvalidProperties,
}

/// Parameter types the translator can produce (closed set).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    /// JSON `string`.
    String,
    /// JSON `integer`.
    Integer,
    /// JSON `number`.
    Float,
    /// JSON `boolean`.
    Boolean,
    /// JSON `object`, untyped.
    Map,
    /// JSON `array`, untyped.
    List,
    /// JSON `null`.
    Unit,
    /// Two-element union with `null`, or an optional parameter.
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Map a schema `type` value to a parameter type.
    ///
    /// Unions of exactly one non-null member plus `null` become optional;
    /// any other union collapses to its first non-null member with a
    /// diagnostic. A missing `type` defaults to string.
    fn from_type_value(tool: &str, property: &str, ty: Option<&Value>) -> ParamType {
        match ty {
            None => ParamType::String,
            Some(Value::String(name)) => Self::from_type_name(tool, property, name),
            Some(Value::Array(members)) => {
                let names: Vec<&str> = members.iter().filter_map(Value::as_str).collect();
                let non_null: Vec<&str> = names.iter().copied().filter(|n| *n != "null").collect();
                let has_null = names.iter().any(|n| *n == "null");
                match (non_null.first(), has_null) {
                    (None, _) => ParamType::Unit,
                    (Some(first), true) if names.len() == 2 => {
                        ParamType::Optional(Box::new(Self::from_type_name(tool, property, first)))
                    }
                    (Some(first), _) => {
                        warn!(tool, property, union = ?names, "collapsing union to first non-null member");
                        Self::from_type_name(tool, property, first)
                    }
                }
            }
            Some(other) => {
                warn!(tool, property, ty = %other, "unrecognized schema type; treating as untyped map");
                ParamType::Map
            }
        }
    }

    fn from_type_name(tool: &str, property: &str, name: &str) -> ParamType {
        match name {
            "string" => ParamType::String,
            "integer" => ParamType::Integer,
            "number" => ParamType::Float,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Map,
            "array" => ParamType::List,
            "null" => ParamType::Unit,
            other => {
                warn!(tool, property, ty = other, "unknown schema type; treating as untyped map");
                ParamType::Map
            }
        }
    }

    /// Whether the type already admits absence.
    fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_))
    }
}

/// One parameter of a translated tool.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    /// Sanitized name presented on the aggregator surface.
    pub name: String,
    /// Original property name, used when marshalling outgoing arguments.
    pub original: String,
    /// Parameter type.
    pub ty: ParamType,
    /// Whether the property is listed in `required`.
    pub required: bool,
    /// Schema default, if any. `None` for an optional parameter means the
    /// absent sentinel: the key is omitted from outgoing arguments.
    pub default: Option<Value>,
    /// Property description, verbatim.
    pub description: Option<String>,
}

/// A fully translated tool: descriptor set ready for registration.
#[derive(Clone, Debug)]
pub struct ToolSurface {
    /// Tool name as the child knows it (un-prefixed).
    pub tool_name: String,
    /// Tool description, copied from the definition.
    pub description: String,
    /// Parameter descriptors.
    pub params: Vec<ParamSpec>,
}

/// Translate a discovered tool definition into a parameter surface.
///
/// A tool without an `inputSchema` yields a zero-parameter surface. A
/// malformed schema is refused with a diagnostic.
pub fn translate(tool: &ToolInfo) -> Result<ToolSurface, SchemaError> {
    if tool.name.trim().is_empty() {
        return Err(SchemaError::InvalidName);
    }

    let mut params = Vec::new();

    if let Some(schema) = &tool.input_schema {
        let schema = schema.as_object().ok_or(SchemaError::NotAnObject)?;
        if !schema.contains_key("type") {
            return Err(SchemaError::MissingType);
        }

        let properties = match schema.get("properties") {
            None => Map::new(),
            Some(value) => value
                .as_object()
                .cloned()
                .ok_or(SchemaError::InvalidProperties)?,
        };
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        for (property, prop_schema) in &properties {
            let is_required = required.contains(&property.as_str());
            let prop_obj = prop_schema.as_object();

            let mut ty = ParamType::from_type_value(
                &tool.name,
                property,
                prop_obj.and_then(|o| o.get("type")),
            );
            let default = if is_required {
                None
            } else {
                prop_obj.and_then(|o| o.get("default")).cloned()
            };
            // Optional without a schema default: widen the type so absence
            // is representable on the surface.
            if !is_required && default.is_none() && !ty.is_optional() {
                ty = ParamType::Optional(Box::new(ty));
            }

            params.push(ParamSpec {
                name: sanitize_param_name(property),
                original: property.clone(),
                ty,
                required: is_required,
                default,
                description: prop_obj
                    .and_then(|o| o.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
    }

    Ok(ToolSurface {
        tool_name: tool.name.clone(),
        description: tool.description.clone().unwrap_or_default(),
        params,
    })
}

/// Sanitize a property name for the registration surface: every
/// non-alphanumeric character becomes `_`. The original spelling is kept on
/// the [`ParamSpec`] for marshalling.
pub fn sanitize_param_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Assemble the outgoing `tools/call` arguments from caller kwargs.
///
/// Sanitized keys map back to original property names. Omitted optional
/// parameters fall back to their schema default when one exists and are
/// dropped otherwise; an explicit `null` for an optional parameter counts
/// as absent.
pub fn build_arguments(params: &[ParamSpec], kwargs: &Map<String, Value>) -> Map<String, Value> {
    let mut arguments = Map::new();
    for param in params {
        match kwargs.get(&param.name) {
            Some(Value::Null) if !param.required => {}
            Some(value) => {
                arguments.insert(param.original.clone(), value.clone());
            }
            None => {
                if let Some(default) = &param.default {
                    arguments.insert(param.original.clone(), default.clone());
                }
            }
        }
    }
    arguments
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
