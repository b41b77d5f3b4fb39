//! The registry walk: node tree in, flat binding table out.

use tracing::{debug, warn};
use weft_ir::{
    Binding, BindingId, BindingMeta, BindingTable, BindingTableBuilder, Facet, Initializer,
    NestedSlot, PathSeg, ScopePath, Value,
};

use crate::components::{ComponentRegistry, PropDef, PropKind};
use crate::document::{
    as_expression, ElementNode, MutationNode, Node, PageDefinition, QueryNode, UrlContext,
};

/// Result fields synthesized for every query node.
const QUERY_RESULT_FIELDS: [&str; 4] = ["data", "rows", "error", "isLoading"];

/// Result fields synthesized for every mutation node.
const MUTATION_RESULT_FIELDS: [&str; 3] = ["data", "error", "isLoading"];

/// Parse a page into its binding table: page parameters against the URL
/// context, then every node reachable from the page's roots (template-slot
/// content excluded).
pub fn parse(
    page: &PageDefinition,
    components: &ComponentRegistry,
    url: &UrlContext,
) -> BindingTable {
    let mut collector = Collector::new(components);
    for param in &page.parameters {
        collector.page_parameter(param, url);
    }
    collector.nodes(&page.children);
    let table = collector.builder.build();
    debug!(bindings = table.len(), "parsed page into binding table");
    table
}

/// Parse a detached node forest (template-slot content) into its own
/// binding table. Called once per template instance, on demand.
pub fn parse_fragment(nodes: &[Node], components: &ComponentRegistry) -> BindingTable {
    let mut collector = Collector::new(components);
    collector.nodes(nodes);
    let table = collector.builder.build();
    debug!(bindings = table.len(), "parsed fragment into binding table");
    table
}

struct Collector<'a> {
    components: &'a ComponentRegistry,
    builder: BindingTableBuilder,
}

impl<'a> Collector<'a> {
    fn new(components: &'a ComponentRegistry) -> Self {
        Collector {
            components,
            builder: BindingTable::builder(),
        }
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Element(element) => self.element(element),
                Node::Query(query) => self.query(query),
                Node::Mutation(mutation) => self.mutation(mutation),
            }
        }
    }

    fn page_parameter(&mut self, param: &crate::document::PageParameter, url: &UrlContext) {
        let value = match url.get(&param.name) {
            Some(raw) => Value::str(raw),
            None => param.default.clone().unwrap_or(Value::Undefined),
        };
        let id = BindingId::new(format!("page.parameters.{}", param.name));
        let path = ScopePath::parse(&format!("page.parameters.{}", param.name));
        self.builder.insert(
            id,
            Binding::constant(value).at(path),
            BindingMeta {
                node_id: "page".to_owned(),
                facet: Facet::PageParam,
                prop: param.name.clone(),
            },
        );
    }

    fn element(&mut self, element: &ElementNode) {
        let def = self.components.get(&element.component);
        if def.is_none() {
            warn!(
                component = %element.component,
                node = %element.node_id,
                "unknown component; parsing its props without metadata"
            );
        }

        // Declared props first (declaration order), then undeclared ones
        // the document sets anyway.
        let mut prop_names: Vec<&str> = def
            .map(|d| d.props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        for name in element.props.keys() {
            if !prop_names.contains(&name.as_str()) {
                prop_names.push(name);
            }
        }

        for prop in prop_names {
            let prop_def = def.and_then(|d| d.props.get(prop));
            match prop_def.map(|d| d.kind) {
                // Events belong to the host; template slots are parsed
                // lazily as their own fragments.
                Some(PropKind::Event | PropKind::Template) => continue,
                _ => {}
            }

            let authored = element.props.get(prop);
            let default = prop_def.and_then(|d| d.default.as_ref());
            let id = BindingId::new(format!("{}.props.{prop}", element.node_id));
            let meta = BindingMeta {
                node_id: element.node_id.clone(),
                facet: Facet::Props,
                prop: prop.to_owned(),
            };

            if prop_def.is_some_and(PropDef::is_controlled) {
                let initializer = match authored {
                    Some(value) => Some(classify_initializer(value)),
                    None => default.cloned().map(Initializer::Const),
                };
                let path = ScopePath::parse(&format!("{}.{prop}", element.scope_name()));
                self.builder.insert(
                    id.clone(),
                    Binding::controlled(initializer, false).at(path),
                    meta,
                );
                self.builder.mark_controlled(id);
                continue;
            }

            let Some(value) = authored.or(default) else {
                continue;
            };
            let binding = self.classify(&id, &meta, value);
            self.builder.insert(id, binding, meta);
        }

        self.nodes(&element.children);
    }

    fn query(&mut self, query: &QueryNode) {
        self.params(&query.node_id, &query.params);

        let enabled_id = BindingId::new(format!("{}.config.enabled", query.node_id));
        let enabled_meta = BindingMeta {
            node_id: query.node_id.clone(),
            facet: Facet::Config,
            prop: "enabled".to_owned(),
        };
        let enabled = query.enabled.clone().unwrap_or(Value::Bool(true));
        let binding = self.classify(&enabled_id, &enabled_meta, &enabled);
        self.builder.insert(enabled_id, binding, enabled_meta);

        if let Some(interval) = &query.refetch_interval_ms {
            let id = BindingId::new(format!("{}.config.refetchIntervalMs", query.node_id));
            let meta = BindingMeta {
                node_id: query.node_id.clone(),
                facet: Facet::Config,
                prop: "refetchIntervalMs".to_owned(),
            };
            let binding = self.classify(&id, &meta, interval);
            self.builder.insert(id, binding, meta);
        }

        self.result_fields(&query.node_id, &query.name, &QUERY_RESULT_FIELDS);
    }

    fn mutation(&mut self, mutation: &MutationNode) {
        self.params(&mutation.node_id, &mutation.params);
        self.result_fields(&mutation.node_id, &mutation.name, &MUTATION_RESULT_FIELDS);
    }

    fn params(&mut self, node_id: &str, params: &indexmap::IndexMap<String, Value>) {
        for (name, value) in params {
            let id = BindingId::new(format!("{node_id}.params.{name}"));
            let meta = BindingMeta {
                node_id: node_id.to_owned(),
                facet: Facet::Params,
                prop: name.clone(),
            };
            let binding = self.classify(&id, &meta, value);
            self.builder.insert(id, binding, meta);
        }
    }

    /// Controlled result slots, committed later by the external runner;
    /// they read as loading until the first commit.
    fn result_fields(&mut self, node_id: &str, name: &str, fields: &[&str]) {
        for field in fields {
            let id = BindingId::new(format!("{node_id}.{field}"));
            let path = ScopePath::parse(&format!("{name}.{field}"));
            self.builder.insert(
                id.clone(),
                Binding::controlled(None, true).at(path),
                BindingMeta {
                    node_id: node_id.to_owned(),
                    facet: Facet::Result,
                    prop: (*field).to_owned(),
                },
            );
            self.builder.mark_controlled(id);
        }
    }

    /// Classify one authored value: an expression marker, a constant, or a
    /// constant container with independently bound leaves.
    fn classify(&mut self, id: &BindingId, meta: &BindingMeta, value: &Value) -> Binding {
        if let Some(source) = as_expression(value) {
            return Binding::expression(source);
        }
        let mut slots = Vec::new();
        let sanitized = self.flatten(id, meta, value, &mut Vec::new(), &mut slots);
        let mut binding = Binding::constant(sanitized);
        binding.nested = slots;
        binding
    }

    /// Recursively flatten nested containers whose leaves are expression
    /// markers into independent per-leaf bindings, so each leaf recomputes
    /// on its own. Marker objects are leaves; recursion never enters them.
    fn flatten(
        &mut self,
        parent: &BindingId,
        meta: &BindingMeta,
        value: &Value,
        path: &mut Vec<PathSeg>,
        slots: &mut Vec<NestedSlot>,
    ) -> Value {
        if let Some(source) = as_expression(value) {
            if path.is_empty() {
                // classify() handles the top-level marker case.
                return Value::Undefined;
            }
            let suffix = path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            let leaf_id = parent.child(&suffix);
            self.builder.insert(
                leaf_id.clone(),
                Binding::expression(source),
                BindingMeta {
                    node_id: meta.node_id.clone(),
                    facet: meta.facet,
                    prop: format!("{}.{suffix}", meta.prop),
                },
            );
            slots.push(NestedSlot {
                path: path.clone(),
                id: leaf_id,
            });
            // Placeholder until the merge splices the leaf's result in.
            return Value::Undefined;
        }
        match value {
            Value::List(items) => Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        path.push(PathSeg::Index(idx));
                        let out = self.flatten(parent, meta, item, path, slots);
                        path.pop();
                        out
                    })
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = indexmap::IndexMap::new();
                for (key, item) in map {
                    path.push(PathSeg::key(key.clone()));
                    let flattened = self.flatten(parent, meta, item, path, slots);
                    path.pop();
                    out.insert(key.clone(), flattened);
                }
                Value::Object(out)
            }
            leaf => leaf.clone(),
        }
    }
}

/// A controlled prop's authored value becomes its initializer.
fn classify_initializer(value: &Value) -> Initializer {
    match as_expression(value) {
        Some(source) => Initializer::Expr(source.to_owned()),
        None => Initializer::Const(value.clone()),
    }
}
