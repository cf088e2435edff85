//! Hierarchical data context for template rendering.
//!
//! Every scope lives in one arena owned by [`Context`] and is addressed by a
//! [`ContextId`]. A child scope records its parent's id; a parent records its
//! children's ids in a list section. Neither owns the other, the arena owns
//! them all. Lookups that miss in a scope continue along the parent chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{HigeError, Result};

/// A section bound to a text transform.
///
/// It receives the raw template text of the section body and returns a
/// template fragment, which is rendered in place of the body.
pub type Lambda = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Handle to one scope inside a [`Context`].
///
/// Ids are only meaningful for the context that issued them; using one with a
/// different context panics or resolves an unrelated scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

/// A structured binding: nested map, lambda, or list of child scopes.
#[derive(Clone)]
pub enum Section {
    Value(HashMap<String, String>),
    Func(Lambda),
    List(Vec<ContextId>),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Value(_) => SectionKind::Value,
            Section::Func(_) => SectionKind::Func,
            Section::List(_) => SectionKind::List,
        }
    }

    /// Empty sections are falsy. A lambda is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Section::Value(map) => map.is_empty(),
            Section::Func(_) => false,
            Section::List(children) => children.is_empty(),
        }
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Value(map) => f.debug_tuple("Value").field(map).finish(),
            Section::Func(_) => f.write_str("Func(<lambda>)"),
            Section::List(children) => f.debug_tuple("List").field(children).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Absent,
    Value,
    Func,
    List,
}

/// A value accepted by [`Context::set`].
///
/// The template only has `{{key}}` / `{{#key}}` to refer to bindings, so the
/// kind of binding is picked from what is assigned.
pub enum Binding {
    /// Stored as a plain variable.
    Text(String),
    /// Stored as a `value` section.
    Map(HashMap<String, String>),
    /// Stored as a `func` section.
    Lambda(Lambda),
}

impl Binding {
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Binding::Lambda(Arc::new(f))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Binding::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Binding::Lambda(_) => f.write_str("Lambda(<lambda>)"),
        }
    }
}

impl From<String> for Binding {
    fn from(text: String) -> Self {
        Binding::Text(text)
    }
}

impl From<&str> for Binding {
    fn from(text: &str) -> Self {
        Binding::Text(text.to_string())
    }
}

/// `false` binds the empty string so that it stays falsy in sections.
impl From<bool> for Binding {
    fn from(flag: bool) -> Self {
        Binding::Text(if flag { "true".to_string() } else { String::new() })
    }
}

impl From<HashMap<String, String>> for Binding {
    fn from(map: HashMap<String, String>) -> Self {
        Binding::Map(map)
    }
}

macro_rules! display_binding {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Binding {
                fn from(value: $ty) -> Self {
                    Binding::Text(value.to_string())
                }
            }
        )*
    };
}

display_binding!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char);

#[derive(Debug, Default)]
struct Scope {
    variables: HashMap<String, String>,
    sections: HashMap<String, Section>,
    parent: Option<ContextId>,
}

/// What a section tag resolves to once kinds are probed in priority order.
#[derive(Clone, Copy)]
pub(crate) enum ResolvedSection<'a> {
    Value(&'a HashMap<String, String>),
    Func(&'a Lambda),
    List(&'a [ContextId]),
    Plain,
}

/// Arena of scopes; index 0 is the root.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<Scope>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context holding only an empty root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.scope(id).parent
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Plain variable bound in `id` itself, without parent fallback.
    pub fn get(&self, id: ContextId, key: &str) -> Result<&str> {
        self.scope(id)
            .variables
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| HigeError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Bind `key` in `id`: text becomes a plain variable, a map becomes a
    /// `value` section, a lambda becomes a `func` section.
    ///
    /// Fails with [`HigeError::UnsupportedBindingType`] when `value` has no
    /// such shape (see the `serde_json::Value` conversion).
    pub fn set<B>(&mut self, id: ContextId, key: impl Into<String>, value: B) -> Result<()>
    where
        B: TryInto<Binding>,
        HigeError: From<B::Error>,
    {
        let key = key.into();
        match value.try_into()? {
            Binding::Text(text) => self.set_variable(id, key, text),
            Binding::Map(map) => self.set_section(id, key, map),
            Binding::Lambda(f) => self.insert_section(id, key, Section::Func(f)),
        }
        Ok(())
    }

    pub fn set_variable(&mut self, id: ContextId, key: impl Into<String>, value: impl Into<String>) {
        self.scope_mut(id)
            .variables
            .insert(key.into(), value.into());
    }

    /// Install a `value` section, replacing any section bound to `key`.
    pub fn set_section(&mut self, id: ContextId, key: impl Into<String>, map: HashMap<String, String>) {
        self.insert_section(id, key, Section::Value(map));
    }

    /// Install a `func` section, replacing any section bound to `key`.
    pub fn set_lambda<F>(&mut self, id: ContextId, key: impl Into<String>, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.insert_section(id, key, Section::Func(Arc::new(f)));
    }

    /// Create a child scope of `id` and append it to the list section `key`.
    ///
    /// A section of another kind under `key` is replaced by a fresh list.
    pub fn add_child_context(&mut self, id: ContextId, key: impl Into<String>) -> ContextId {
        let child = ContextId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(id),
            ..Scope::default()
        });

        match self.list_section(id, key.into()) {
            Section::List(children) => children.push(child),
            other => *other = Section::List(vec![child]),
        }
        child
    }

    /// Make `key` a list section with room for `additional` more children.
    ///
    /// Leaves an empty list behind when no child is added, which is falsy and
    /// shadows a list of the same name further up the chain.
    pub fn reserve_children(&mut self, id: ContextId, key: impl Into<String>, additional: usize) {
        match self.list_section(id, key.into()) {
            Section::List(children) => children.reserve(additional),
            other => *other = Section::List(Vec::with_capacity(additional)),
        }
    }

    /// Section bound to `key` in `id` itself.
    pub fn section(&self, id: ContextId, key: &str) -> Option<&Section> {
        self.scope(id).sections.get(key)
    }

    /// Kind of the section bound to `key` in `id` itself.
    pub fn section_kind(&self, id: ContextId, key: &str) -> SectionKind {
        self.section(id, key).map_or(SectionKind::Absent, Section::kind)
    }

    // ========================================================================
    // Resolution along the parent chain
    // ========================================================================

    /// Plain variable from `id` or its nearest ancestor that binds it.
    pub fn fetch(&self, id: ContextId, key: &str) -> Option<&str> {
        self.ancestry(id)
            .find_map(|scope| scope.variables.get(key))
            .map(String::as_str)
    }

    /// Nearest `value` section named `key`; sections of other kinds are skipped.
    pub fn fetch_value(&self, id: ContextId, key: &str) -> Option<&HashMap<String, String>> {
        self.ancestry(id)
            .find_map(|scope| match scope.sections.get(key) {
                Some(Section::Value(map)) => Some(map),
                _ => None,
            })
    }

    /// Nearest `func` section named `key`; sections of other kinds are skipped.
    pub fn fetch_func(&self, id: ContextId, key: &str) -> Option<&Lambda> {
        self.ancestry(id)
            .find_map(|scope| match scope.sections.get(key) {
                Some(Section::Func(f)) => Some(f),
                _ => None,
            })
    }

    /// Nearest `list` section named `key`; sections of other kinds are skipped.
    pub fn fetch_list(&self, id: ContextId, key: &str) -> Option<&[ContextId]> {
        self.ancestry(id)
            .find_map(|scope| match scope.sections.get(key) {
                Some(Section::List(children)) => Some(children.as_slice()),
                _ => None,
            })
    }

    /// Kind a `{{#key}}` tag in scope `id` renders as.
    ///
    /// Kinds are probed value, func, list in that order, each along the whole
    /// chain, so a `value` in the root beats a `list` in `id`.
    pub fn section_kind_at(&self, id: ContextId, key: &str) -> SectionKind {
        match self.resolve_section(id, key) {
            ResolvedSection::Value(_) => SectionKind::Value,
            ResolvedSection::Func(_) => SectionKind::Func,
            ResolvedSection::List(_) => SectionKind::List,
            ResolvedSection::Plain => SectionKind::Absent,
        }
    }

    pub(crate) fn resolve_section(&self, id: ContextId, key: &str) -> ResolvedSection<'_> {
        if let Some(map) = self.fetch_value(id, key) {
            ResolvedSection::Value(map)
        } else if let Some(f) = self.fetch_func(id, key) {
            ResolvedSection::Func(f)
        } else if let Some(children) = self.fetch_list(id, key) {
            ResolvedSection::List(children)
        } else {
            ResolvedSection::Plain
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn ancestry(&self, id: ContextId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(self.scope(id)), move |scope| {
            scope.parent.map(|parent| self.scope(parent))
        })
    }

    fn scope(&self, id: ContextId) -> &Scope {
        &self.scopes[id.0]
    }

    fn scope_mut(&mut self, id: ContextId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    fn insert_section(&mut self, id: ContextId, key: impl Into<String>, section: Section) {
        self.scope_mut(id).sections.insert(key.into(), section);
    }

    fn list_section(&mut self, id: ContextId, key: String) -> &mut Section {
        self.scope_mut(id)
            .sections
            .entry(key)
            .or_insert_with(|| Section::List(Vec::new()))
    }
}
