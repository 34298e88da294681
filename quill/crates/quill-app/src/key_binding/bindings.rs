//! Key binding registries.
//!
//! A [`KeyBindings`] holds [`Binding`]s in registration order. Registries
//! compose through [`KeyBindingsBase`]: [`MergedKeyBindings`] concatenates,
//! [`ConditionalKeyBindings`] adds a filter to every binding and
//! [`DynamicKeyBindings`] picks a registry at lookup time.
//!
//! When several bindings match the same keys, the one registered last wins,
//! except that a binding with fewer [`Key::Any`] wildcards always beats one
//! with more.

use super::processor::KeyPressEvent;
use crate::error::HandlerResult;
use crate::filters::Filter;
use quill_input::Key;
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// What a binding runs.
pub type Handler = Rc<dyn Fn(&mut KeyPressEvent<'_>) -> HandlerResult>;

/// Shared, composable registry.
pub type SharedKeyBindings = Rc<dyn KeyBindingsBase>;

/// The keys a binding reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySequence(SmallVec<[Key; 2]>);

impl KeySequence {
    /// Parses a space separated sequence such as `"c-x c-e"`.
    pub fn parse(names: &str) -> Option<Self> {
        Key::parse_sequence(names).map(|keys| Self(keys.into_iter().collect()))
    }

    /// Returns true if `keys` matches this sequence exactly, honouring
    /// [`Key::Any`] wildcards.
    pub fn matches(&self, keys: &[Key]) -> bool {
        self.0.len() == keys.len() && self.matches_prefix(keys)
    }

    /// Returns true if `keys` is a proper prefix of this sequence.
    pub fn starts_with(&self, keys: &[Key]) -> bool {
        self.0.len() > keys.len() && self.matches_prefix(keys)
    }

    fn matches_prefix(&self, keys: &[Key]) -> bool {
        self.0
            .iter()
            .zip(keys)
            .all(|(bound, pressed)| *bound == Key::Any || bound == pressed)
    }

    fn any_count(&self) -> usize {
        self.0.iter().filter(|k| **k == Key::Any).count()
    }
}

impl Deref for KeySequence {
    type Target = [Key];

    fn deref(&self) -> &[Key] {
        &self.0
    }
}

impl From<Key> for KeySequence {
    fn from(key: Key) -> Self {
        Self(smallvec::smallvec![key])
    }
}

impl<const N: usize> From<[Key; N]> for KeySequence {
    fn from(keys: [Key; N]) -> Self {
        Self(keys.into_iter().collect())
    }
}

impl From<&[Key]> for KeySequence {
    fn from(keys: &[Key]) -> Self {
        Self(keys.iter().copied().collect())
    }
}

impl From<Vec<Key>> for KeySequence {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys.into_iter().collect())
    }
}

impl From<char> for KeySequence {
    fn from(c: char) -> Self {
        Key::Char(c).into()
    }
}

type SaveBefore = Rc<dyn Fn(&KeyPressEvent<'_>) -> bool>;

/// One key binding.
#[derive(Clone)]
pub struct Binding {
    /// Keys to match.
    pub keys: KeySequence,
    handler: Handler,
    /// Only active while this is true.
    pub filter: Filter,
    /// When true, matches immediately even if a longer binding shares the
    /// prefix.
    pub eager: Filter,
    /// Whether the keys are recorded into keyboard macros.
    pub record_in_macro: Filter,
    save_before: SaveBefore,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("keys", &self.keys)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Binding {
    /// A binding active everywhere.
    pub fn new(
        keys: impl Into<KeySequence>,
        handler: impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult + 'static,
    ) -> Self {
        Self::from_handler(keys, Rc::new(handler))
    }

    /// A binding running an existing handler.
    pub fn from_handler(keys: impl Into<KeySequence>, handler: Handler) -> Self {
        Self {
            keys: keys.into(),
            handler,
            filter: Filter::Always,
            eager: Filter::Never,
            record_in_macro: Filter::Always,
            save_before: Rc::new(|_| true),
        }
    }

    /// A binding running the named readline command, if it exists.
    pub fn named(keys: impl Into<KeySequence>, name: &str) -> Option<Self> {
        super::commands::get_by_name(name).map(|handler| Self::from_handler(keys, handler))
    }

    /// Restricts the binding to when `filter` holds.
    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Makes the binding eager.
    pub fn eager(mut self) -> Self {
        self.eager = Filter::Always;
        self
    }

    /// Makes the binding eager while `filter` holds.
    pub fn eager_when(mut self, filter: impl Into<Filter>) -> Self {
        self.eager = filter.into();
        self
    }

    /// Decides whether the focused buffer's undo state is saved before the
    /// handler runs. The default always saves.
    pub fn save_before(mut self, f: impl Fn(&KeyPressEvent<'_>) -> bool + 'static) -> Self {
        self.save_before = Rc::new(f);
        self
    }

    /// Keeps the keys out of keyboard macros.
    pub fn without_macro_recording(mut self) -> Self {
        self.record_in_macro = Filter::Never;
        self
    }

    /// The handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub(crate) fn should_save_before(&self, event: &KeyPressEvent<'_>) -> bool {
        (self.save_before)(event)
    }
}

/// Something that produces key bindings.
pub trait KeyBindingsBase {
    /// All bindings, lowest priority first.
    fn bindings(&self) -> Vec<Rc<Binding>>;
}

/// Bindings in `all` matching `keys` exactly, ordered so that the preferred
/// binding comes last.
pub fn bindings_for_keys(all: &[Rc<Binding>], keys: &[Key]) -> Vec<Rc<Binding>> {
    let mut found: Vec<(usize, Rc<Binding>)> = all
        .iter()
        .filter(|b| b.keys.matches(keys))
        .map(|b| (b.keys.any_count(), Rc::clone(b)))
        .collect();
    // Stable: among equally specific bindings, registration order stays.
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, b)| b).collect()
}

/// Bindings in `all` that are longer than `keys` and start with them.
pub fn bindings_starting_with_keys(all: &[Rc<Binding>], keys: &[Key]) -> Vec<Rc<Binding>> {
    all.iter()
        .filter(|b| b.keys.starts_with(keys))
        .cloned()
        .collect()
}

/// A plain registry.
#[derive(Default, Clone)]
pub struct KeyBindings {
    bindings: Vec<Rc<Binding>>,
}

impl fmt::Debug for KeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBindings")
            .field("len", &self.bindings.len())
            .finish()
    }
}

impl KeyBindings {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `keys` to `handler` and returns the handler, which can be
    /// passed to [`KeyBindings::remove`].
    pub fn add(
        &mut self,
        keys: impl Into<KeySequence>,
        handler: impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult + 'static,
    ) -> Handler {
        let binding = Binding::new(keys, handler);
        let handler = Rc::clone(binding.handler());
        self.add_binding(binding);
        handler
    }

    /// Adds a fully configured binding.
    pub fn add_binding(&mut self, binding: Binding) {
        self.bindings.push(Rc::new(binding));
    }

    /// Adds a binding built from a sequence and a filter.
    pub fn add_when(
        &mut self,
        keys: impl Into<KeySequence>,
        filter: impl Into<Filter>,
        handler: impl Fn(&mut KeyPressEvent<'_>) -> HandlerResult + 'static,
    ) {
        self.add_binding(Binding::new(keys, handler).with_filter(filter));
    }

    /// Binds `keys` to a named readline command.
    pub fn add_named(&mut self, keys: impl Into<KeySequence>, name: &str) {
        self.add_named_when(keys, Filter::Always, name);
    }

    /// Binds `keys` to a named readline command while `filter` holds.
    pub fn add_named_when(&mut self, keys: impl Into<KeySequence>, filter: impl Into<Filter>, name: &str) {
        match Binding::named(keys, name) {
            Some(binding) => self.add_binding(binding.with_filter(filter)),
            None => tracing::warn!("unknown command: {name}"),
        }
    }

    /// Removes every binding running `handler`. Returns false if there was
    /// none.
    pub fn remove(&mut self, handler: &Handler) -> bool {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| !Rc::ptr_eq(b.handler(), handler));
        before != self.bindings.len()
    }

    /// Removes every binding for exactly `keys`.
    pub fn remove_keys(&mut self, keys: &[Key]) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| &*b.keys != keys);
        before != self.bindings.len()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings matching `keys` exactly, preferred last.
    pub fn get_bindings_for_keys(&self, keys: &[Key]) -> Vec<Rc<Binding>> {
        bindings_for_keys(&self.bindings, keys)
    }

    /// Bindings longer than `keys` that start with them.
    pub fn get_bindings_starting_with_keys(&self, keys: &[Key]) -> Vec<Rc<Binding>> {
        bindings_starting_with_keys(&self.bindings, keys)
    }

    /// Wraps the registry for sharing.
    pub fn shared(self) -> SharedKeyBindings {
        Rc::new(self)
    }
}

impl KeyBindingsBase for KeyBindings {
    fn bindings(&self) -> Vec<Rc<Binding>> {
        self.bindings.clone()
    }
}

/// Several registries, later ones taking priority.
#[derive(Clone)]
pub struct MergedKeyBindings(Vec<SharedKeyBindings>);

impl fmt::Debug for MergedKeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedKeyBindings")
            .field("len", &self.0.len())
            .finish()
    }
}

impl MergedKeyBindings {
    /// Merges registries.
    pub fn new(registries: impl IntoIterator<Item = SharedKeyBindings>) -> Self {
        Self(registries.into_iter().collect())
    }
}

impl KeyBindingsBase for MergedKeyBindings {
    fn bindings(&self) -> Vec<Rc<Binding>> {
        self.0.iter().flat_map(|r| r.bindings()).collect()
    }
}

/// A registry active only while a filter holds.
pub struct ConditionalKeyBindings {
    inner: SharedKeyBindings,
    filter: Filter,
}

impl fmt::Debug for ConditionalKeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalKeyBindings")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ConditionalKeyBindings {
    /// Wraps `inner`.
    pub fn new(inner: SharedKeyBindings, filter: impl Into<Filter>) -> Self {
        Self {
            inner,
            filter: filter.into(),
        }
    }
}

impl KeyBindingsBase for ConditionalKeyBindings {
    fn bindings(&self) -> Vec<Rc<Binding>> {
        match &self.filter {
            Filter::Always => self.inner.bindings(),
            Filter::Never => Vec::new(),
            filter => self
                .inner
                .bindings()
                .into_iter()
                .map(|b| {
                    let mut b = (*b).clone();
                    b.filter = filter.clone().and(b.filter);
                    Rc::new(b)
                })
                .collect(),
        }
    }
}

/// A registry chosen at lookup time.
pub struct DynamicKeyBindings {
    get: Box<dyn Fn() -> Option<SharedKeyBindings>>,
}

impl fmt::Debug for DynamicKeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicKeyBindings").finish_non_exhaustive()
    }
}

impl DynamicKeyBindings {
    /// Calls `get` on every lookup.
    pub fn new(get: impl Fn() -> Option<SharedKeyBindings> + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl KeyBindingsBase for DynamicKeyBindings {
    fn bindings(&self) -> Vec<Rc<Binding>> {
        (self.get)().map(|r| r.bindings()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop(_: &mut KeyPressEvent<'_>) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_parse_sequence() {
        let seq = KeySequence::parse("c-x c-e").unwrap();
        assert_eq!(&*seq, &[Key::Control('x'), Key::Control('e')]);
        assert!(KeySequence::parse("c-x nonsense").is_none());
    }

    #[test]
    fn test_exact_and_prefix_lookup() {
        let mut kb = KeyBindings::new();
        kb.add([Key::Control('x'), Key::Control('e')], noop);
        kb.add(Key::Control('x'), noop);
        assert_eq!(kb.get_bindings_for_keys(&[Key::Control('x')]).len(), 1);
        assert_eq!(
            kb.get_bindings_starting_with_keys(&[Key::Control('x')]).len(),
            1
        );
        assert!(kb.get_bindings_for_keys(&[Key::Control('e')]).is_empty());
    }

    #[test]
    fn test_wildcards_lose_to_specific_bindings() {
        let mut kb = KeyBindings::new();
        let specific = kb.add('a', noop);
        let any = kb.add(Key::Any, noop);
        let found = kb.get_bindings_for_keys(&[Key::Char('a')]);
        assert_eq!(found.len(), 2);
        assert!(Rc::ptr_eq(found[0].handler(), &any));
        assert!(Rc::ptr_eq(found[1].handler(), &specific));
    }

    #[test]
    fn test_remove_by_handler() {
        let mut kb = KeyBindings::new();
        let h = kb.add('a', noop);
        kb.add('b', noop);
        assert!(kb.remove(&h));
        assert!(!kb.remove(&h));
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn test_merged_and_conditional() {
        let mut a = KeyBindings::new();
        a.add('a', noop);
        let mut b = KeyBindings::new();
        b.add('b', noop);
        let merged = MergedKeyBindings::new([a.shared(), b.shared()]);
        assert_eq!(merged.bindings().len(), 2);

        let hidden = ConditionalKeyBindings::new(Rc::new(merged), false);
        assert!(hidden.bindings().is_empty());
    }
}
