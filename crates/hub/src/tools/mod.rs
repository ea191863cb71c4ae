// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic tool surface: schema translation, registration, and routing.

pub mod invocable;
pub mod registry;
pub mod schema;

pub use invocable::ToolInvocable;
pub use registry::{
    Aggregator, AggregatorError, DynamicToolRegistry, InvokeError, RegistrationError,
    ToolInvoker, ToolRegistration,
};
pub use schema::{
    build_arguments, sanitize_param_name, translate, ParamSpec, ParamType, SchemaError,
    ToolSurface,
};
