//! System document parsing
//!
//! A system document is a JSON object of named entries. Every object value at
//! the top level is an entry; everything else becomes a prop of the root,
//! which is a `system` node named `root`.
//!
//! Inside an entry:
//! - `kind` selects the behavior; an entry without one is a nested system.
//! - `children` holds nested entries, either as an object keyed by name or
//!   as an array (each element named by its `name` field, or `#<index>`).
//! - an entry whose object holds `route` is a wire, recorded in the
//!   enclosing scope's routes instead of being built.
//! - any other key holding an object with `kind`, `children` or `route` is a
//!   nested entry (`effect1: { "kind": "3d/behavior/rotate" }`).
//! - all remaining keys are props.
//!
//! Sibling entries must have distinct names, however they were declared.
//!
//! Key order is preserved, so children are built in declaration order.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SceneError};
use crate::types::{NodeSpec, SYSTEM_KIND};

/// Name given to the document root
pub const ROOT_NAME: &str = "root";

const KIND_KEY: &str = "kind";
const CHILDREN_KEY: &str = "children";
const ROUTE_KEY: &str = "route";
const NAME_KEY: &str = "name";

/// Parse a system document from JSON text
pub fn parse_document(text: &str) -> Result<NodeSpec> {
    let value: Value = serde_json::from_str(text)?;
    document_from_value(&value)
}

/// Read and parse a system document file
pub async fn load_document(path: impl AsRef<Path>) -> Result<NodeSpec> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let spec = parse_document(&text)
        .map_err(|e| SceneError::document(format!("{}: {}", path.display(), e)))?;
    log::debug!("Loaded system document {:?} ({} entries)", path, spec.count());
    Ok(spec)
}

/// Turn an already parsed document into the root spec
pub fn document_from_value(value: &Value) -> Result<NodeSpec> {
    let object = value
        .as_object()
        .ok_or_else(|| SceneError::document("document root must be an object"))?;

    let mut root = NodeSpec::system(ROOT_NAME);
    for (key, value) in object {
        match value {
            Value::Object(_) => push_entry(&mut root, key, value)?,
            other => {
                root.props.insert(key.clone(), other.clone());
            }
        }
    }
    Ok(root)
}

/// Build the spec for one named entry
pub fn spec_from_value(name: &str, value: &Value) -> Result<NodeSpec> {
    let object = value
        .as_object()
        .ok_or_else(|| SceneError::document(format!("entry '{}' must be an object", name)))?;
    spec_from_object(name, object, false)
}

fn spec_from_object(name: &str, object: &Map<String, Value>, named_in_array: bool) -> Result<NodeSpec> {
    let kind = match object.get(KIND_KEY) {
        None => SYSTEM_KIND,
        Some(Value::String(kind)) if !kind.is_empty() => kind.as_str(),
        Some(other) => {
            return Err(SceneError::document(format!(
                "entry '{}' has invalid kind {}",
                name, other
            )))
        }
    };

    let mut spec = NodeSpec::new(name, kind);
    for (key, value) in object {
        match key.as_str() {
            KIND_KEY => {}
            NAME_KEY if named_in_array => {}
            CHILDREN_KEY => push_children(&mut spec, value)?,
            _ if is_entry(value) => push_entry(&mut spec, key, value)?,
            _ => {
                spec.props.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(spec)
}

fn push_children(spec: &mut NodeSpec, children: &Value) -> Result<()> {
    match children {
        Value::Object(entries) => {
            for (name, value) in entries {
                push_entry(spec, name, value)?;
            }
        }
        Value::Array(entries) => {
            for (index, value) in entries.iter().enumerate() {
                let object = value.as_object().ok_or_else(|| {
                    SceneError::document(format!(
                        "child #{} of '{}' must be an object",
                        index, spec.name
                    ))
                })?;
                let name = object
                    .get(NAME_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", index));
                if let Some(route) = object.get(ROUTE_KEY) {
                    spec.routes.push(route_string(&name, route)?);
                } else {
                    let child = spec_from_object(&name, object, true)?;
                    push_child(spec, child)?;
                }
            }
        }
        other => {
            return Err(SceneError::document(format!(
                "children of '{}' must be an object or array, got {}",
                spec.name, other
            )))
        }
    }
    Ok(())
}

fn push_entry(spec: &mut NodeSpec, name: &str, value: &Value) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| SceneError::document(format!("entry '{}' must be an object", name)))?;
    match object.get(ROUTE_KEY) {
        Some(route) => spec.routes.push(route_string(name, route)?),
        None => push_child(spec, spec_from_object(name, object, false)?)?,
    }
    Ok(())
}

fn push_child(spec: &mut NodeSpec, child: NodeSpec) -> Result<()> {
    if spec.children.iter().any(|existing| existing.name == child.name) {
        return Err(SceneError::document(format!(
            "duplicate entry '{}' in '{}'",
            child.name, spec.name
        )));
    }
    spec.children.push(child);
    Ok(())
}

fn route_string(name: &str, route: &Value) -> Result<String> {
    route
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SceneError::document(format!("wire '{}' must hold a route string", name)))
}

fn is_entry(value: &Value) -> bool {
    value.as_object().is_some_and(|object| {
        object.contains_key(KIND_KEY)
            || object.contains_key(CHILDREN_KEY)
            || object.contains_key(ROUTE_KEY)
    })
}
