//! The declarative document model, as handed over by the editing
//! collaborator.
//!
//! Nodes arrive as JSON; expressions are in-band marker objects
//! (`{"$expr": "form.value + 1"}`) inside otherwise plain prop values.
//! The marker object is a leaf: nothing ever descends into it.

use indexmap::IndexMap;
use serde::Deserialize;
use weft_ir::Value;

/// Key of the in-band expression marker object.
pub const EXPR_MARKER: &str = "$expr";

/// Returns the expression source if `value` is a `{"$expr": "..."}` marker.
pub(crate) fn as_expression(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => match map.get(EXPR_MARKER) {
            Some(Value::Str(source)) => Some(source),
            _ => None,
        },
        _ => None,
    }
}

/// A node in the document tree.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    /// A visual element.
    Element(ElementNode),
    /// A data query.
    Query(QueryNode),
    /// A data mutation.
    Mutation(MutationNode),
}

/// A visual element instance.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    /// Stable node id.
    pub node_id: String,
    /// Component type name, resolved through the component registry.
    pub component: String,
    /// User-visible name; this is what scope paths use. Falls back to the
    /// node id.
    #[serde(default)]
    pub name: Option<String>,
    /// Prop values as authored (constants and expression markers).
    #[serde(default)]
    pub props: IndexMap<String, Value>,
    /// Regular children, parsed together with this node.
    #[serde(default)]
    pub children: Vec<Node>,
    /// Template-slot content, parsed lazily per instance. Never descended
    /// into here.
    #[serde(default)]
    pub slots: IndexMap<String, Vec<Node>>,
}

impl ElementNode {
    /// The name scope paths use for this element.
    pub fn scope_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.node_id)
    }
}

/// A data query node. Result fields are driven by an external query
/// runner through the controlled channel.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryNode {
    /// Stable node id.
    pub node_id: String,
    /// Name under which results are exposed (`<name>.data`, ...).
    pub name: String,
    /// Query parameters (constants and expression markers).
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    /// Whether the query should run; defaults to `true`.
    #[serde(default)]
    pub enabled: Option<Value>,
    /// Refetch interval in milliseconds, if any.
    #[serde(default)]
    pub refetch_interval_ms: Option<Value>,
}

/// A data mutation node. Like a query, but only ever invoked imperatively,
/// so it has no execution config.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationNode {
    /// Stable node id.
    pub node_id: String,
    /// Name under which results are exposed.
    pub name: String,
    /// Mutation parameters.
    #[serde(default)]
    pub params: IndexMap<String, Value>,
}

/// A declared page parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParameter {
    /// Parameter name; also its position in the URL query string.
    pub name: String,
    /// Declared default, used when the URL does not provide the parameter.
    #[serde(default)]
    pub default: Option<Value>,
}

/// A page: declared parameters plus the root node forest.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageDefinition {
    /// Declared page parameters.
    #[serde(default)]
    pub parameters: Vec<PageParameter>,
    /// Root nodes.
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Routing context: the URL query string, already split.
#[derive(Clone, Debug, Default)]
pub struct UrlContext {
    /// Query parameters in URL order.
    pub query: IndexMap<String, String>,
}

impl UrlContext {
    /// Parse a raw query string (`"a=1&b=two"`). Pairs without `=` get an
    /// empty value; percent-decoding is the transport's job, not ours.
    pub fn from_query(raw: &str) -> Self {
        let mut query = IndexMap::new();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) => query.insert(key.to_owned(), value.to_owned()),
                None => query.insert(pair.to_owned(), String::new()),
            };
        }
        UrlContext { query }
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}
