//! The runtime value model.
//!
//! A [`Value`] is a tagged variant plus an optional attached [`MetaMap`].
//! Containers share their storage through `Rc`; the `Rc` strong count is the
//! use count that drives copy-on-write — every mutating operation clones the
//! storage first when the count exceeds one, so containers behave as values
//! to the script without eager deep copies. Elements live in [`Slot`] cells
//! (`Rc<RefCell<Value>>`) so that references can alias environment
//! variables, vector elements and map values; cloning storage allocates
//! fresh cells whose contents share their own inner storage in turn.
//!
//! References deliberately escape all of this: copying a [`Reference`]
//! copies the handle, never the referent.

use std::{
    any::Any,
    cell::{Ref, RefCell, RefMut},
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};

use crate::{ast::FunctionNode, builtins::Builtin, env::Env};

/// Ordered map storage: insertion order is observable in iteration and
/// printing.
pub type ValueMap = IndexMap<Value, Slot, ahash::RandomState>;

/// Ordered set storage.
pub type ValueSet = IndexSet<Value, ahash::RandomState>;

/// A shared mutable cell holding one value.
///
/// Environment bindings, vector elements and map values all live in slots;
/// a [`Reference`] is a second handle to such a cell.
#[derive(Debug, Clone)]
pub struct Slot(Rc<RefCell<Value>>);

impl Slot {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Clones the current contents out of the cell.
    #[must_use]
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

/// Escapes `\t`, `\n`, `"` and `\` the way the stringifier prints them.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

/// Shortest-form number printing: IEEE specials as `NaN`/`Inf`/`-Inf`,
/// otherwise the shortest round-trip decimal with trailing zeros and a
/// trailing dot trimmed.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value == f64::INFINITY {
        return "Inf".to_owned();
    }
    if value == f64::NEG_INFINITY {
        return "-Inf".to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(value);
    if text.contains('e') {
        return text.to_owned();
    }
    let trimmed = text.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.to_owned()
}

/// An immutable byte string. Ordering and indexing are byte-based; rune
/// operations decode UTF-8 with replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Str(Rc<[u8]>);

impl Str {
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Rc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn runes(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Str {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().into())
    }
}

impl From<String> for Str {
    fn from(text: String) -> Self {
        Self(text.into_bytes().into())
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_text(&self.runes()))
    }
}

/// A compiled regular expression plus its original source bytes.
#[derive(Debug, Clone)]
pub struct Regexp {
    pattern: Rc<regex::bytes::Regex>,
    source: Str,
}

impl Regexp {
    /// Compiles `source`, which must be valid UTF-8 regex syntax.
    pub fn compile(source: Str) -> Result<Self, String> {
        let text = std::str::from_utf8(source.as_bytes())
            .map_err(|_| "regular expression is not valid UTF-8".to_owned())?;
        let pattern = regex::bytes::Regex::new(text).map_err(|e| e.to_string())?;
        Ok(Self {
            pattern: Rc::new(pattern),
            source,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &regex::bytes::Regex {
        &self.pattern
    }

    #[must_use]
    pub fn source(&self) -> &Str {
        &self.source
    }
}

impl PartialEq for Regexp {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r\"{}\"", escape_text(&self.source.runes()))
    }
}

/// Key-validation outcome for vector element access.
#[derive(Debug)]
pub enum VectorAccess {
    /// The key is not a usable index; carries the message explaining why.
    BadKey(String),
    /// The key is a valid index but past the end.
    OutOfRange,
}

/// An ordered sequence with copy-on-write storage.
#[derive(Debug, Clone, Default)]
pub struct Vector {
    data: Rc<Vec<Slot>>,
}

impl Vector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            data: Rc::new(values.into_iter().map(Slot::new).collect()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.data
    }

    /// A second handle on the current storage. Iteration holds one so that
    /// in-loop mutation of the live vector copies away from the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Rc<Vec<Slot>> {
        Rc::clone(&self.data)
    }

    fn make_mut(&mut self) -> &mut Vec<Slot> {
        if Rc::strong_count(&self.data) > 1 {
            self.data = Rc::new(self.data.iter().map(|slot| Slot::new(slot.get())).collect());
        }
        Rc::get_mut(&mut self.data).expect("vector storage is uniquely owned after copy-on-write")
    }

    /// Validates `key` as an element index.
    pub fn locate(&self, key: &Value) -> Result<usize, VectorAccess> {
        let ValueKind::Number(number) = &key.kind else {
            return Err(VectorAccess::BadKey(format!(
                "attempted vector access using non-number key {key}"
            )));
        };
        let number = *number;
        if number.fract() != 0.0 || !number.is_finite() {
            return Err(VectorAccess::BadKey(format!(
                "attempted vector access using non-integer number {}",
                format_number(number)
            )));
        }
        if number < 0.0 {
            return Err(VectorAccess::BadKey(format!(
                "attempted vector access using a negative index {}",
                format_number(number)
            )));
        }
        let index = number as usize;
        if index >= self.data.len() {
            return Err(VectorAccess::OutOfRange);
        }
        Ok(index)
    }

    #[must_use]
    pub fn get_slot(&self, index: usize) -> Option<Slot> {
        self.data.get(index).cloned()
    }

    pub fn push(&mut self, value: Value) {
        self.make_mut().push(Slot::new(value));
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.make_mut().pop().map(|slot| slot.get())
    }

    /// Inserts at `index`, clamping past-the-end indices like a list insert.
    pub fn insert(&mut self, index: usize, value: Value) {
        let data = self.make_mut();
        let index = index.min(data.len());
        data.insert(index, Slot::new(value));
    }

    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index >= self.data.len() {
            return None;
        }
        Some(self.make_mut().remove(index).get())
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.make_mut()[index] = Slot::new(value);
    }
}

/// The data of a metamap: a type name plus an immutable entry table.
#[derive(Debug)]
pub struct MetaMapData {
    name: Str,
    data: Rc<ValueMap>,
}

/// An immutable, named map attached to values as their type descriptor.
///
/// Metamaps are compared by identity for `ty::is` and copied by handle;
/// writing to one is a runtime error.
#[derive(Debug, Clone)]
pub struct MetaMap(Rc<MetaMapData>);

impl MetaMap {
    #[must_use]
    pub fn new(name: Str, data: Rc<ValueMap>) -> Self {
        Self(Rc::new(MetaMapData { name, data }))
    }

    #[must_use]
    pub fn name(&self) -> &Str {
        &self.0.name
    }

    #[must_use]
    pub fn data(&self) -> &ValueMap {
        &self.0.data
    }

    #[must_use]
    pub fn data_rc(&self) -> Rc<ValueMap> {
        Rc::clone(&self.0.data)
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

/// An ordered mapping with copy-on-write storage; either a plain map or a
/// metamap viewed as a map value.
#[derive(Debug, Clone)]
pub enum Map {
    Plain(Rc<ValueMap>),
    Meta(MetaMap),
}

impl Default for Map {
    fn default() -> Self {
        Self::Plain(Rc::new(ValueMap::default()))
    }
}

impl Map {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let data: ValueMap = entries
            .into_iter()
            .map(|(key, value)| (key, Slot::new(value)))
            .collect();
        Self::Plain(Rc::new(data))
    }

    #[must_use]
    pub fn data(&self) -> &ValueMap {
        match self {
            Self::Plain(data) => data,
            Self::Meta(meta) => meta.data(),
        }
    }

    /// A second handle on the current storage, used for loop snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Rc<ValueMap> {
        match self {
            Self::Plain(data) => Rc::clone(data),
            Self::Meta(meta) => meta.data_rc(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    #[must_use]
    pub fn as_meta(&self) -> Option<&MetaMap> {
        match self {
            Self::Plain(_) => None,
            Self::Meta(meta) => Some(meta),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &Value) -> bool {
        self.data().contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.data().get(key).map(Slot::get)
    }

    #[must_use]
    pub fn get_slot(&self, key: &Value) -> Option<Slot> {
        self.data().get(key).cloned()
    }

    fn make_mut(&mut self) -> Result<&mut ValueMap, String> {
        let data = match self {
            Self::Meta(_) => return Err(format!("attempted to modify metamap {}", DisplayMap(self))),
            Self::Plain(data) => data,
        };
        if Rc::strong_count(data) > 1 {
            let copied: ValueMap = data
                .iter()
                .map(|(key, slot)| (key.clone(), Slot::new(slot.get())))
                .collect();
            *data = Rc::new(copied);
        }
        Ok(Rc::get_mut(data).expect("map storage is uniquely owned after copy-on-write"))
    }

    /// Inserts or replaces an entry. Fails on metamaps.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), String> {
        self.make_mut()?.insert(key, Slot::new(value));
        Ok(())
    }

    /// Removes an entry, preserving the order of the rest. Fails on
    /// metamaps; returns `None` when the key is absent.
    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, String> {
        Ok(self.make_mut()?.shift_remove(key).map(|slot| slot.get()))
    }
}

/// Adapter rendering a map with the stringifier while it is borrowed.
struct DisplayMap<'a>(&'a Map);

impl fmt::Display for DisplayMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_map(self.0, f)
    }
}

fn format_map(map: &Map, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if map.is_empty() {
        return write!(f, "Map{{}}");
    }
    write!(f, "{{")?;
    for (index, (key, slot)) in map.data().iter().enumerate() {
        if index != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{key}: {}", slot.borrow())?;
    }
    write!(f, "}}")
}

/// An ordered set with copy-on-write storage.
#[derive(Debug, Clone, Default)]
pub struct Set {
    data: Rc<ValueSet>,
}

impl Set {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            data: Rc::new(values.into_iter().collect()),
        }
    }

    #[must_use]
    pub fn data(&self) -> &ValueSet {
        &self.data
    }

    #[must_use]
    pub fn snapshot(&self) -> Rc<ValueSet> {
        Rc::clone(&self.data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.data.contains(value)
    }

    fn make_mut(&mut self) -> &mut ValueSet {
        if Rc::strong_count(&self.data) > 1 {
            self.data = Rc::new(self.data.iter().cloned().collect());
        }
        Rc::get_mut(&mut self.data).expect("set storage is uniquely owned after copy-on-write")
    }

    pub fn insert(&mut self, value: Value) {
        self.make_mut().insert(value);
    }

    /// Removes an element, preserving the order of the rest. Returns whether
    /// it was present.
    pub fn remove(&mut self, value: &Value) -> bool {
        self.make_mut().shift_remove(value)
    }
}

/// An alias to a value living elsewhere. Copying a reference copies the
/// handle; the referent stays shared.
#[derive(Debug, Clone)]
pub struct Reference(Slot);

impl Reference {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Slot::new(value))
    }

    #[must_use]
    pub fn to_slot(slot: Slot) -> Self {
        Self(slot)
    }

    #[must_use]
    pub fn slot(&self) -> &Slot {
        &self.0
    }
}

/// A closure: function node plus captured environment.
#[derive(Debug, Clone)]
pub struct Function {
    pub node: Rc<FunctionNode>,
    pub env: Env,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.node.name.borrow().as_ref() {
            Some(name) => name.runes().into_owned(),
            None => "function".to_owned(),
        };
        let ugly = name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'));
        if ugly {
            write!(f, "\"{}\"", escape_text(&name))?;
        } else {
            write!(f, "{name}")?;
        }
        if let Some(location) = &self.node.location {
            write!(f, "@[{location}]")?;
        }
        Ok(())
    }
}

/// An opaque host object carried through the interpreter untouched.
#[derive(Clone)]
pub struct External(Rc<dyn Any>);

impl External {
    #[must_use]
    pub fn new(data: Rc<dyn Any>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn data(&self) -> &Rc<dyn Any> {
        &self.0
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    fn address(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "External({:#x})", self.address())
    }
}

/// The tagged variants of a value.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Number(f64),
    String(Str),
    Regexp(Regexp),
    Vector(Vector),
    Map(Map),
    Set(Set),
    Reference(Reference),
    Function(Function),
    Builtin(Builtin),
    External(External),
}

impl ValueKind {
    /// The built-in type name, ignoring any attached metamap.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Regexp(_) => "regexp",
            Self::Vector(_) => "vector",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Reference(_) => "reference",
            Self::Function(_) | Self::Builtin(_) => "function",
            Self::External(_) => "external",
        }
    }
}

/// A runtime value: a variant plus an optional attached metamap.
///
/// `meta` is `None` for plainly constructed values; the per-type singleton
/// metamaps are resolved lazily by the interpreter (`Interp::meta_of`), so
/// only `new META expr` actually stores a handle here.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub meta: Option<MetaMap>,
}

impl Value {
    #[must_use]
    pub fn from_kind(kind: ValueKind) -> Self {
        Self { kind, meta: None }
    }

    #[must_use]
    pub fn null() -> Self {
        Self::from_kind(ValueKind::Null)
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::from_kind(ValueKind::Boolean(value))
    }

    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::from_kind(ValueKind::Number(value))
    }

    pub fn string(value: impl Into<Str>) -> Self {
        Self::from_kind(ValueKind::String(value.into()))
    }

    #[must_use]
    pub fn bytes(value: Vec<u8>) -> Self {
        Self::from_kind(ValueKind::String(Str::from_bytes(value)))
    }

    #[must_use]
    pub fn regexp(value: Regexp) -> Self {
        Self::from_kind(ValueKind::Regexp(value))
    }

    #[must_use]
    pub fn vector(value: Vector) -> Self {
        Self::from_kind(ValueKind::Vector(value))
    }

    #[must_use]
    pub fn map(value: Map) -> Self {
        Self::from_kind(ValueKind::Map(value))
    }

    #[must_use]
    pub fn set(value: Set) -> Self {
        Self::from_kind(ValueKind::Set(value))
    }

    #[must_use]
    pub fn reference(value: Reference) -> Self {
        Self::from_kind(ValueKind::Reference(value))
    }

    #[must_use]
    pub fn function(value: Function) -> Self {
        Self::from_kind(ValueKind::Function(value))
    }

    #[must_use]
    pub fn builtin(value: Builtin) -> Self {
        Self::from_kind(ValueKind::Builtin(value))
    }

    #[must_use]
    pub fn external(value: External) -> Self {
        Self::from_kind(ValueKind::External(value))
    }

    /// A metamap viewed as a (map) value, preserving its identity.
    #[must_use]
    pub fn from_meta(meta: MetaMap) -> Self {
        Self::from_kind(ValueKind::Map(Map::Meta(meta)))
    }

    /// Whether the value can be called.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ValueKind::Function(_) | ValueKind::Builtin(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a == b,
            // IEEE equality: NaN != NaN, 0.0 == -0.0.
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Regexp(a), ValueKind::Regexp(b)) => a == b,
            (ValueKind::Vector(a), ValueKind::Vector(b)) => {
                a.len() == b.len()
                    && a.slots()
                        .iter()
                        .zip(b.slots())
                        .all(|(x, y)| Slot::ptr_eq(x, y) || *x.borrow() == *y.borrow())
            }
            (ValueKind::Map(a), ValueKind::Map(b)) => {
                if a.as_meta().is_some() != b.as_meta().is_some() {
                    return false;
                }
                a.len() == b.len()
                    && a.data().iter().all(|(key, slot)| {
                        b.data()
                            .get(key)
                            .is_some_and(|other| Slot::ptr_eq(slot, other) || *slot.borrow() == *other.borrow())
                    })
            }
            (ValueKind::Set(a), ValueKind::Set(b)) => {
                a.len() == b.len() && a.data().iter().all(|value| b.contains(value))
            }
            (ValueKind::Reference(a), ValueKind::Reference(b)) => Slot::ptr_eq(a.slot(), b.slot()),
            (ValueKind::Function(a), ValueKind::Function(b)) => Rc::ptr_eq(&a.node, &b.node),
            (ValueKind::Builtin(a), ValueKind::Builtin(b)) => Builtin::ptr_eq(a, b),
            (ValueKind::External(a), ValueKind::External(b)) => External::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Structural hash of a value, consistent with its `Eq` implementation.
#[must_use]
pub fn hash_value(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.kind {
            ValueKind::Null => state.write_u8(0),
            ValueKind::Boolean(b) => {
                state.write_u8(1);
                b.hash(state);
            }
            ValueKind::Number(n) => {
                state.write_u8(2);
                // Canonicalize so 0.0 and -0.0 agree; NaN gets a fixed hash
                // (it is unequal even to itself, so lookups cannot hit).
                let bits = if n.is_nan() {
                    u64::MAX
                } else if *n == 0.0 {
                    0
                } else {
                    n.to_bits()
                };
                state.write_u64(bits);
            }
            ValueKind::String(s) => {
                state.write_u8(3);
                s.as_bytes().hash(state);
            }
            ValueKind::Regexp(r) => {
                state.write_u8(4);
                r.source().as_bytes().hash(state);
            }
            ValueKind::Vector(v) => {
                state.write_u8(5);
                state.write_usize(v.len());
                for slot in v.slots() {
                    slot.borrow().hash(state);
                }
            }
            ValueKind::Map(m) => {
                state.write_u8(6);
                state.write_usize(m.len());
                // Order-independent combine: equal maps with different
                // insertion orders must hash equally.
                let mut combined = 0u64;
                for (key, slot) in m.data() {
                    let mut entry = DefaultHasher::new();
                    key.hash(&mut entry);
                    slot.borrow().hash(&mut entry);
                    combined = combined.wrapping_add(entry.finish());
                }
                state.write_u64(combined);
            }
            ValueKind::Set(s) => {
                state.write_u8(7);
                state.write_usize(s.len());
                let mut combined = 0u64;
                for value in s.data() {
                    combined = combined.wrapping_add(hash_value(value));
                }
                state.write_u64(combined);
            }
            ValueKind::Reference(r) => {
                state.write_u8(8);
                state.write_usize(r.slot().address());
            }
            ValueKind::Function(f) => {
                state.write_u8(9);
                state.write_usize(Rc::as_ptr(&f.node) as usize);
                state.write_usize(f.env.address());
            }
            ValueKind::Builtin(b) => {
                state.write_u8(10);
                state.write_usize(b.address());
            }
            ValueKind::External(e) => {
                state.write_u8(11);
                state.write_usize(e.address());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Boolean(true) => write!(f, "true"),
            ValueKind::Boolean(false) => write!(f, "false"),
            ValueKind::Number(n) => write!(f, "{}", format_number(*n)),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Regexp(r) => write!(f, "{r}"),
            ValueKind::Vector(v) => {
                write!(f, "[")?;
                for (index, slot) in v.slots().iter().enumerate() {
                    if index != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", slot.borrow())?;
                }
                write!(f, "]")
            }
            ValueKind::Map(m) => format_map(m, f),
            ValueKind::Set(s) => {
                if s.is_empty() {
                    return write!(f, "Set{{}}");
                }
                write!(f, "{{")?;
                for (index, value) in s.data().iter().enumerate() {
                    if index != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}}")
            }
            ValueKind::Reference(r) => write!(f, "reference@{:#x}", r.slot().address()),
            ValueKind::Function(function) => write!(f, "{function}"),
            ValueKind::Builtin(builtin) => write!(f, "{builtin}"),
            ValueKind::External(e) => write!(f, "external@{:#x}", e.address()),
        }
    }
}
