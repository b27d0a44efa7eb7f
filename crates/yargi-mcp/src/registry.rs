//! Immutable tool registry.
//!
//! Every tool is registered explicitly at startup with its schema declared
//! as data; there is no runtime registration and no reflection. Lookups
//! after construction are lock-free reads of a frozen table.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use yargi_core::{Result, SourceId};

use crate::gateway::Gateway;

/// Tool handler: borrows the gateway, consumes raw JSON arguments.
pub type Handler = for<'a> fn(&'a Gateway, Value) -> BoxFuture<'a, Result<Value>>;

/// Behavioral annotations surfaced to MCP clients.
#[derive(Debug, Clone, Copy)]
pub struct Annotations {
    /// The tool does not modify backend state.
    pub read_only: bool,
    /// Repeating the call with the same arguments has no additional effect.
    pub idempotent: bool,
    /// The tool reaches external systems whose contents change.
    pub open_world: bool,
}

/// Immutable descriptor for one registered tool.
pub struct ToolDescriptor {
    /// Stable tool name.
    pub name: &'static str,
    /// One-line description shown to clients.
    pub description: &'static str,
    /// JSON Schema of the argument object.
    pub input_schema: Value,
    /// Behavioral annotations.
    pub annotations: Annotations,
}

/// One registry entry: descriptor plus dispatch metadata.
pub struct ToolEntry {
    /// Client-visible descriptor.
    pub descriptor: ToolDescriptor,
    /// Backend the tool is bound to; `None` for aggregate tools.
    pub source: Option<SourceId>,
    /// Adapter default deadline; the effective deadline is the minimum of
    /// this and the caller's.
    pub default_deadline: Duration,
    /// Handler function.
    pub handler: Handler,
}

/// Frozen name → entry table.
pub struct ToolRegistry {
    entries: BTreeMap<&'static str, Arc<ToolEntry>>,
}

impl ToolRegistry {
    /// Start building a registry.
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder {
            entries: BTreeMap::new(),
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ToolEntry>> {
        self.entries.get(name)
    }

    /// All entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<ToolEntry>> {
        self.entries.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder consumed by [`ToolRegistryBuilder::build`]; registration after
/// that point is impossible by construction.
pub struct ToolRegistryBuilder {
    entries: BTreeMap<&'static str, Arc<ToolEntry>>,
}

impl ToolRegistryBuilder {
    /// Register one tool. Panics on duplicate names — duplicates are a
    /// programming error caught by the registry tests.
    #[allow(clippy::panic)]
    pub fn register(
        mut self,
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        source: Option<SourceId>,
        default_deadline: Duration,
        annotations: Annotations,
        handler: Handler,
    ) -> Self {
        let entry = ToolEntry {
            descriptor: ToolDescriptor {
                name,
                description,
                input_schema,
                annotations,
            },
            source,
            default_deadline,
            handler,
        };
        if self.entries.insert(name, Arc::new(entry)).is_some() {
            panic!("duplicate tool registration: {name}");
        }
        self
    }

    /// Freeze the table.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            entries: self.entries,
        }
    }
}

/// Render a `schemars`-derived schema as a plain JSON value.
pub fn schema_value<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema.schema).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

/// Read-only, idempotent, open-world: the profile of every search tool.
pub const SEARCH_ANNOTATIONS: Annotations = Annotations {
    read_only: true,
    idempotent: true,
    open_world: true,
};

/// Document retrieval: read-only and closed-world (a handle names one
/// document).
pub const FETCH_ANNOTATIONS: Annotations = Annotations {
    read_only: true,
    idempotent: true,
    open_world: false,
};
