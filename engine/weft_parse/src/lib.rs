//! Weft Parse - the binding registry/parser.
//!
//! Walks the declarative node tree (elements, data queries, mutations,
//! page parameters) together with component metadata and the routing
//! context into the flat [`BindingTable`](weft_ir::BindingTable) the
//! evaluator consumes.
//!
//! Parsing is total: a well-formed document never fails to parse, and a
//! construct the parser does not understand degrades to a constant with a
//! `tracing` warning. Malformed documents are rejected upstream by the
//! document-editing collaborator.
//!
//! Template-slot content is *not* parsed here; each slot is its own
//! document fragment, parsed lazily with [`parse_fragment`] when a
//! template instance is created.

mod components;
mod document;
mod registry;

#[cfg(test)]
mod tests;

pub use components::{ComponentDef, ComponentRegistry, PropDef, PropKind};
pub use document::{
    ElementNode, MutationNode, Node, PageDefinition, PageParameter, QueryNode, UrlContext,
    EXPR_MARKER,
};
pub use registry::{parse, parse_fragment};
