//! Component metadata: which props exist, which are bindable, which are
//! controlled, and what their defaults are.
//!
//! The registry is an explicit context object threaded through `parse`;
//! there is no ambient process-wide component lookup.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use weft_ir::Value;

/// What kind of prop this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PropKind {
    /// A plain bindable value prop.
    #[default]
    Value,
    /// An event handler; never bound, owned by the host.
    Event,
    /// A template slot; its content is a separate, lazily parsed fragment.
    Template,
}

/// Metadata for a single prop.
#[derive(Clone, Debug, Default)]
pub struct PropDef {
    /// Prop kind.
    pub kind: PropKind,
    /// Default value when the document does not set the prop.
    pub default: Option<Value>,
    /// Name of the value-change callback. Present iff the prop is
    /// controlled: its value is driven through the controlled channel, and
    /// the authored value only serves as the initializer.
    pub on_change: Option<String>,
}

impl PropDef {
    /// A plain bindable value prop.
    pub fn value() -> Self {
        PropDef::default()
    }

    /// An event prop.
    pub fn event() -> Self {
        PropDef {
            kind: PropKind::Event,
            ..PropDef::default()
        }
    }

    /// A template-slot prop.
    pub fn template() -> Self {
        PropDef {
            kind: PropKind::Template,
            ..PropDef::default()
        }
    }

    /// Set the default value, builder-style.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the prop controlled via the named change callback.
    pub fn controlled_by(mut self, on_change: impl Into<String>) -> Self {
        self.on_change = Some(on_change.into());
        self
    }

    /// Whether the prop is controlled.
    #[inline]
    pub fn is_controlled(&self) -> bool {
        self.on_change.is_some()
    }
}

/// Metadata for one component type.
#[derive(Clone, Debug, Default)]
pub struct ComponentDef {
    /// Props in declaration order.
    pub props: IndexMap<String, PropDef>,
}

impl ComponentDef {
    /// Start an empty component definition.
    pub fn new() -> Self {
        ComponentDef::default()
    }

    /// Add a prop, builder-style.
    pub fn prop(mut self, name: impl Into<String>, def: PropDef) -> Self {
        self.props.insert(name.into(), def);
        self
    }
}

/// All component definitions known to one parse pass.
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    components: FxHashMap<String, ComponentDef>,
}

impl ComponentRegistry {
    /// Start an empty registry.
    pub fn new() -> Self {
        ComponentRegistry::default()
    }

    /// Register a component type, builder-style.
    pub fn register(mut self, name: impl Into<String>, def: ComponentDef) -> Self {
        self.components.insert(name.into(), def);
        self
    }

    /// Look up a component type. Unknown components parse as if they had
    /// no declared props.
    pub fn get(&self, name: &str) -> Option<&ComponentDef> {
        self.components.get(name)
    }
}
