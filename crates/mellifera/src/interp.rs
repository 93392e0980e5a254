//! Interpreter state: the per-type metamap singletons, the base
//! environment, the last-regex-match slot and the RNG, plus the staged
//! bootstrap that assembles them.
//!
//! Startup runs in two phases. Phase 1 creates the type metamaps in a fixed
//! order (`function` first, since every builtin is typed by it) with
//! host-implemented methods installed directly and uninitialized
//! placeholders where source-defined methods go, then binds everything into
//! the base environment. Phase 2 evaluates each source-defined builtin
//! against a child of the now-complete base environment and fills its
//! placeholder. The split is load-bearing: the snippets reference the
//! primitive metamaps and each other.

use std::{path::Path, rc::Rc};

use rand::{SeedableRng as _, rngs::StdRng};
use smallvec::smallvec;

use crate::{
    builtins::{self, Builtin, bootstrap},
    env::Env,
    error::Error,
    io::{PrintWriter, StdPrint},
    value::{Map, MetaMap, Reference, Regexp, Slot, Str, Value, ValueKind, ValueMap},
};

/// The singleton metamaps for the built-in types.
pub struct TypeMetas {
    pub function: MetaMap,
    pub boolean: MetaMap,
    pub number: MetaMap,
    pub string: MetaMap,
    pub regexp: MetaMap,
    pub vector: MetaMap,
    pub map: MetaMap,
    pub set: MetaMap,
    pub reference: MetaMap,
    pub iterator: MetaMap,
}

/// One interpreter instance: single-threaded, synchronous.
pub struct Interp {
    pub(crate) metas: TypeMetas,
    base_env: Env,
    /// Capture groups of the last successful `=~`/`!~` match; `None` after
    /// a failed match. Would need to become per-thread if concurrency were
    /// ever introduced.
    last_match: Option<Vec<Option<Vec<u8>>>>,
    rng: StdRng,
    writer: Box<dyn PrintWriter>,
}

fn entries(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Rc<ValueMap> {
    let data: ValueMap = pairs
        .into_iter()
        .map(|(name, value)| (Value::string(name), Slot::new(value)))
        .collect();
    Rc::new(data)
}

fn namespace(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let map: ValueMap = pairs
        .into_iter()
        .map(|(name, value)| (Value::string(name), Slot::new(value)))
        .collect();
    Value::map(Map::Plain(Rc::new(map)))
}

fn host(name: &'static str, function: builtins::HostFn) -> Value {
    Value::builtin(Builtin::host(name, function))
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    /// An interpreter printing to the process stdout/stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(Box::new(StdPrint))
    }

    /// An interpreter with a custom output sink.
    #[must_use]
    pub fn with_writer(writer: Box<dyn PrintWriter>) -> Self {
        use builtins::{core, fs, json, map_set, math, number, print, random, string, ty, vector};

        // Source-defined builtins: created uninitialized, installed into
        // metamaps and the environment, then evaluated in phase 2.
        let vector_sorted = Builtin::source("vector::sorted", bootstrap::VECTOR_SORTED);
        let vector_iterator = Builtin::source("vector::iterator", bootstrap::VECTOR_ITERATOR);
        let map_union = Builtin::source("map::union", bootstrap::MAP_UNION);
        let set_union = Builtin::source("set::union", bootstrap::SET_UNION);
        let set_intersection = Builtin::source("set::intersection", bootstrap::SET_INTERSECTION);
        let set_difference = Builtin::source("set::difference", bootstrap::SET_DIFFERENCE);
        let range = Builtin::source("range", bootstrap::RANGE);
        let assert = Builtin::source("assert", bootstrap::ASSERT);
        let extends = Builtin::source("extends", bootstrap::EXTENDS);
        let min = Builtin::source("min", bootstrap::MIN);
        let max = Builtin::source("max", bootstrap::MAX);
        let clamp = Builtin::source("math::clamp", bootstrap::CLAMP);

        // Phase 1: the type metamaps, function first.
        let function_meta = MetaMap::new(Str::from("function"), entries([]));
        let boolean_meta = MetaMap::new(
            Str::from("boolean"),
            entries([("init", host("boolean::init", number::boolean_init))]),
        );
        let number_meta = MetaMap::new(
            Str::from("number"),
            entries([
                ("init", host("number::init", number::number_init)),
                ("is_nan", host("number::is_nan", number::number_is_nan)),
                ("is_inf", host("number::is_inf", number::number_is_inf)),
                ("is_integer", host("number::is_integer", number::number_is_integer)),
                ("fixed", host("number::fixed", number::number_fixed)),
                ("trunc", host("number::trunc", number::number_trunc)),
                ("round", host("number::round", number::number_round)),
                ("floor", host("number::floor", number::number_floor)),
                ("ceil", host("number::ceil", number::number_ceil)),
            ]),
        );
        let string_meta = MetaMap::new(
            Str::from("string"),
            entries([
                ("init", host("string::init", string::string_init)),
                ("bytes", host("string::bytes", string::string_bytes)),
                ("runes", host("string::runes", string::string_runes)),
                ("count", host("string::count", string::string_count)),
                ("contains", host("string::contains", string::string_contains)),
                ("starts_with", host("string::starts_with", string::string_starts_with)),
                ("ends_with", host("string::ends_with", string::string_ends_with)),
                ("trim", host("string::trim", string::string_trim)),
                ("find", host("string::find", string::string_find)),
                ("rfind", host("string::rfind", string::string_rfind)),
                ("slice", host("string::slice", string::string_slice)),
                ("split", host("string::split", string::string_split)),
                ("join", host("string::join", string::string_join)),
                ("cut", host("string::cut", string::string_cut)),
                ("replace", host("string::replace", string::string_replace)),
                ("to_title", host("string::to_title", string::string_to_title)),
                ("to_upper", host("string::to_upper", string::string_to_upper)),
                ("to_lower", host("string::to_lower", string::string_to_lower)),
            ]),
        );
        let regexp_meta = MetaMap::new(Str::from("regexp"), entries([]));
        let vector_meta = MetaMap::new(
            Str::from("vector"),
            entries([
                ("init", host("vector::init", vector::vector_init)),
                ("count", host("vector::count", vector::vector_count)),
                ("contains", host("vector::contains", vector::vector_contains)),
                ("find", host("vector::find", vector::vector_find)),
                ("rfind", host("vector::rfind", vector::vector_rfind)),
                ("push", host("vector::push", vector::vector_push)),
                ("pop", host("vector::pop", vector::vector_pop)),
                ("insert", host("vector::insert", vector::vector_insert)),
                ("remove", host("vector::remove", vector::vector_remove)),
                ("slice", host("vector::slice", vector::vector_slice)),
                ("reversed", host("vector::reversed", vector::vector_reversed)),
                ("sorted", Value::builtin(vector_sorted.clone())),
                ("iterator", Value::builtin(vector_iterator.clone())),
            ]),
        );
        let map_meta = MetaMap::new(
            Str::from("map"),
            entries([
                ("count", host("map::count", map_set::map_count)),
                ("contains", host("map::contains", map_set::map_contains)),
                ("insert", host("map::insert", map_set::map_insert)),
                ("remove", host("map::remove", map_set::map_remove)),
                ("union", Value::builtin(map_union.clone())),
            ]),
        );
        let set_meta = MetaMap::new(
            Str::from("set"),
            entries([
                ("count", host("set::count", map_set::set_count)),
                ("contains", host("set::contains", map_set::set_contains)),
                ("insert", host("set::insert", map_set::set_insert)),
                ("remove", host("set::remove", map_set::set_remove)),
                ("union", Value::builtin(set_union.clone())),
                ("intersection", Value::builtin(set_intersection.clone())),
                ("difference", Value::builtin(set_difference.clone())),
            ]),
        );
        let reference_meta = MetaMap::new(Str::from("reference"), entries([]));

        let mut interp = Self {
            metas: TypeMetas {
                function: function_meta,
                boolean: boolean_meta,
                number: number_meta,
                string: string_meta,
                regexp: regexp_meta,
                vector: vector_meta,
                map: map_meta,
                set: set_meta,
                reference: reference_meta,
                iterator: MetaMap::new(Str::from("iterator"), entries([])),
            },
            base_env: Env::new(),
            last_match: None,
            rng: StdRng::from_entropy(),
            writer,
        };

        // The iterator prototype is itself Mellifera source; its map becomes
        // the `iterator` metamap. Nothing in it resolves before it is
        // called, so the still-empty environment is fine.
        let iterator_value = interp
            .eval_bootstrap("iterator", bootstrap::ITERATOR)
            .expect("iterator prototype evaluates to a value");
        let ValueKind::Map(iterator_map) = &iterator_value.kind else {
            panic!("iterator prototype evaluates to a map");
        };
        interp.metas.iterator = MetaMap::new(Str::from("iterator"), iterator_map.snapshot());

        // Bind the base environment.
        let bind = |interp: &Interp, name: &str, value: Value| {
            interp.base_env.declare(Str::from(name), value);
        };
        bind(&interp, "boolean", Value::from_meta(interp.metas.boolean.clone()));
        bind(&interp, "number", Value::from_meta(interp.metas.number.clone()));
        bind(&interp, "string", Value::from_meta(interp.metas.string.clone()));
        bind(&interp, "regexp", Value::from_meta(interp.metas.regexp.clone()));
        bind(&interp, "vector", Value::from_meta(interp.metas.vector.clone()));
        bind(&interp, "map", Value::from_meta(interp.metas.map.clone()));
        bind(&interp, "set", Value::from_meta(interp.metas.set.clone()));
        bind(&interp, "reference", Value::from_meta(interp.metas.reference.clone()));
        bind(&interp, "iterator", Value::from_meta(interp.metas.iterator.clone()));
        bind(&interp, "NaN", Value::number(f64::NAN));
        bind(&interp, "Inf", Value::number(f64::INFINITY));
        bind(&interp, "exit", host("exit", core::exit));
        bind(&interp, "assert", Value::builtin(assert.clone()));
        bind(&interp, "typeof", host("typeof", core::typeof_));
        bind(&interp, "typename", host("typename", core::typename));
        bind(&interp, "extends", Value::builtin(extends.clone()));
        bind(&interp, "repr", host("repr", core::repr));
        bind(&interp, "input", host("input", print::input));
        bind(&interp, "inputln", host("inputln", print::inputln));
        bind(&interp, "dump", host("dump", print::dump));
        bind(&interp, "dumpln", host("dumpln", print::dumpln));
        bind(&interp, "print", host("print", print::print));
        bind(&interp, "println", host("println", print::println));
        bind(&interp, "eprint", host("eprint", print::eprint));
        bind(&interp, "eprintln", host("eprintln", print::eprintln));
        bind(&interp, "range", Value::builtin(range.clone()));
        bind(&interp, "min", Value::builtin(min.clone()));
        bind(&interp, "max", Value::builtin(max.clone()));
        bind(&interp, "import", host("import", core::import));
        bind(&interp, "baseenv", host("baseenv", core::baseenv));
        bind(
            &interp,
            "fs",
            namespace([
                ("read", host("fs::read", fs::read)),
                ("write", host("fs::write", fs::write)),
                ("append", host("fs::append", fs::append)),
            ]),
        );
        bind(
            &interp,
            "html",
            namespace([("escape", host("html::escape", fs::html_escape))]),
        );
        bind(
            &interp,
            "json",
            namespace([
                ("encode", host("json::encode", json::encode)),
                ("decode", host("json::decode", json::decode)),
            ]),
        );
        bind(
            &interp,
            "math",
            namespace([
                ("e", Value::number(std::f64::consts::E)),
                ("pi", Value::number(std::f64::consts::PI)),
                ("is_nan", host("math::is_nan", math::is_nan)),
                ("is_inf", host("math::is_inf", math::is_inf)),
                ("is_integer", host("math::is_integer", math::is_integer)),
                ("trunc", host("math::trunc", math::trunc)),
                ("round", host("math::round", math::round)),
                ("floor", host("math::floor", math::floor)),
                ("ceil", host("math::ceil", math::ceil)),
                ("abs", host("math::abs", math::abs)),
                ("exp", host("math::exp", math::exp)),
                ("exp2", host("math::exp2", math::exp2)),
                ("exp10", host("math::exp10", math::exp10)),
                ("log", host("math::log", math::log)),
                ("log2", host("math::log2", math::log2)),
                ("log10", host("math::log10", math::log10)),
                ("pow", host("math::pow", math::pow)),
                ("sqrt", host("math::sqrt", math::sqrt)),
                ("cbrt", host("math::cbrt", math::cbrt)),
                ("clamp", Value::builtin(clamp.clone())),
                ("sin", host("math::sin", math::sin)),
                ("cos", host("math::cos", math::cos)),
                ("tan", host("math::tan", math::tan)),
                ("asin", host("math::asin", math::asin)),
                ("acos", host("math::acos", math::acos)),
                ("atan", host("math::atan", math::atan)),
                ("atan2", host("math::atan2", math::atan2)),
                ("sinh", host("math::sinh", math::sinh)),
                ("cosh", host("math::cosh", math::cosh)),
                ("tanh", host("math::tanh", math::tanh)),
                ("asinh", host("math::asinh", math::asinh)),
                ("acosh", host("math::acosh", math::acosh)),
                ("atanh", host("math::atanh", math::atanh)),
            ]),
        );
        let cwd = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_default();
        bind(
            &interp,
            "module",
            namespace([
                ("path", Value::null()),
                ("file", Value::null()),
                ("directory", Value::string(cwd)),
            ]),
        );
        bind(
            &interp,
            "random",
            namespace([
                ("seed", host("random::seed", random::seed)),
                ("number", host("random::number", random::number)),
                ("integer", host("random::integer", random::integer)),
            ]),
        );
        bind(
            &interp,
            "re",
            namespace([("group", host("re::group", random::re_group))]),
        );
        bind(
            &interp,
            "ty",
            namespace([
                ("is", host("ty::is", ty::is)),
                ("is_null", host("ty::is_null", ty::is_null)),
                ("is_boolean", host("ty::is_boolean", ty::is_boolean)),
                ("is_number", host("ty::is_number", ty::is_number)),
                ("is_string", host("ty::is_string", ty::is_string)),
                ("is_regexp", host("ty::is_regexp", ty::is_regexp)),
                ("is_vector", host("ty::is_vector", ty::is_vector)),
                ("is_map", host("ty::is_map", ty::is_map)),
                ("is_set", host("ty::is_set", ty::is_set)),
                ("is_reference", host("ty::is_reference", ty::is_reference)),
                ("is_function", host("ty::is_function", ty::is_function)),
            ]),
        );

        // Phase 2: compile the source-defined builtins. `range` runs its
        // metamap construction at initialization, so everything it touches
        // (`extends`, `map::union`) must already be filled in.
        for builtin in [
            &assert,
            &extends,
            &min,
            &max,
            &clamp,
            &vector_sorted,
            &vector_iterator,
            &map_union,
            &set_union,
            &set_intersection,
            &set_difference,
            &range,
        ] {
            interp.initialize_source_builtin(builtin);
        }

        interp
    }

    fn eval_bootstrap(&mut self, name: &str, source: &str) -> Option<Value> {
        let program = crate::parse::parse_program(source, None)
            .unwrap_or_else(|error| panic!("bootstrap source for {name} does not parse: {error}"));
        let env = self.base_env.child();
        crate::eval::eval_program(&program, &env, self)
            .unwrap_or_else(|error| panic!("bootstrap source for {name} failed: {error}"))
    }

    fn initialize_source_builtin(&mut self, builtin: &Builtin) {
        let Some((source, _)) = builtin.source_parts() else {
            return;
        };
        let value = self
            .eval_bootstrap(builtin.name(), source)
            .unwrap_or_else(|| panic!("bootstrap builtin {} returned nothing", builtin.name()));
        assert!(
            value.is_callable(),
            "bootstrap builtin {} is not callable",
            builtin.name()
        );
        let (_, evaluated) = builtin.source_parts().expect("source builtin checked above");
        *evaluated.borrow_mut() = Some(value);
    }

    /// The outermost scope holding type names, constants and builtins.
    /// Writable after startup; the metamaps inside it are not.
    #[must_use]
    pub fn base_env(&self) -> &Env {
        &self.base_env
    }

    /// A fresh scope chained to the base environment, for one program or
    /// REPL session.
    #[must_use]
    pub fn child_env(&self) -> Env {
        self.base_env.child()
    }

    pub(crate) fn writer(&mut self) -> &mut dyn PrintWriter {
        self.writer.as_mut()
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub(crate) fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub(crate) fn last_match(&self) -> Option<&Vec<Option<Vec<u8>>>> {
        self.last_match.as_ref()
    }

    /// Runs an unanchored search and records the capture groups (or the
    /// failure) in the last-match slot.
    pub(crate) fn search_and_remember(&mut self, regexp: &Regexp, subject: &[u8]) -> bool {
        match regexp.pattern().captures(subject) {
            Some(captures) => {
                let groups = (0..captures.len())
                    .map(|index| captures.get(index).map(|m| m.as_bytes().to_vec()))
                    .collect();
                self.last_match = Some(groups);
                true
            }
            None => {
                self.last_match = None;
                false
            }
        }
    }

    /// Resolves the metamap governing `value`: an explicitly attached one,
    /// or the type singleton. `null`, externals and metamaps themselves
    /// have none.
    #[must_use]
    pub fn meta_of(&self, value: &Value) -> Option<MetaMap> {
        if let Some(meta) = &value.meta {
            return Some(meta.clone());
        }
        let meta = match &value.kind {
            ValueKind::Null | ValueKind::External(_) => return None,
            ValueKind::Boolean(_) => &self.metas.boolean,
            ValueKind::Number(_) => &self.metas.number,
            ValueKind::String(_) => &self.metas.string,
            ValueKind::Regexp(_) => &self.metas.regexp,
            ValueKind::Vector(_) => &self.metas.vector,
            ValueKind::Map(map) => {
                if map.as_meta().is_some() {
                    return None;
                }
                &self.metas.map
            }
            ValueKind::Set(_) => &self.metas.set,
            ValueKind::Reference(_) => &self.metas.reference,
            ValueKind::Function(_) | ValueKind::Builtin(_) => &self.metas.function,
        };
        Some(meta.clone())
    }

    /// The name scripts see for `value`'s type: its metamap name, falling
    /// back to the built-in kind name.
    #[must_use]
    pub fn typename(&self, value: &Value) -> String {
        match self.meta_of(value) {
            Some(meta) => meta.name().runes().into_owned(),
            None => value.kind.type_name().to_owned(),
        }
    }

    /// Looks `name` up in `value`'s metamap, returning it only if callable.
    #[must_use]
    pub fn metafunction(&self, value: &Value, name: &str) -> Option<Value> {
        let meta = self.meta_of(value)?;
        let entry = meta.data().get(&Value::string(name))?.get();
        entry.is_callable().then_some(entry)
    }

    /// Invokes `value`'s `into_string` metamethod, if any, validating that
    /// it produced a string.
    pub fn call_into_string(&mut self, value: &Value) -> Result<Option<Value>, Error> {
        let Some(metafunction) = self.metafunction(value, "into_string") else {
            return Ok(None);
        };
        let reference = Value::reference(Reference::new(value.clone()));
        let result = crate::eval::call(None, &metafunction, smallvec![reference], self)?;
        if !matches!(result.kind, ValueKind::String(_)) {
            return Err(Error::msg(
                None,
                format!("metafunction `into_string` returned {result}"),
            ));
        }
        Ok(Some(result))
    }

    /// Template interpolation: `into_string` result or raw string bytes go
    /// in verbatim; everything else is stringified.
    pub(crate) fn into_display_bytes(&mut self, value: Value) -> Result<Vec<u8>, Error> {
        if let Some(result) = self.call_into_string(&value)? {
            if let ValueKind::String(s) = &result.kind {
                return Ok(s.as_bytes().to_vec());
            }
        }
        if let ValueKind::String(s) = &value.kind {
            return Ok(s.as_bytes().to_vec());
        }
        Ok(value.to_string().into_bytes())
    }

    fn module_slot(&self) -> Option<Slot> {
        self.base_env.get_slot(&Str::from("module"))
    }

    /// The current `(path, file, directory)` of the `module` map.
    #[must_use]
    pub fn module_info(&self) -> (Value, Value, Value) {
        let Some(slot) = self.module_slot() else {
            return (Value::null(), Value::null(), Value::null());
        };
        let stored = slot.borrow();
        let ValueKind::Map(map) = &stored.kind else {
            return (Value::null(), Value::null(), Value::null());
        };
        (
            map.get(&Value::string("path")).unwrap_or_else(Value::null),
            map.get(&Value::string("file")).unwrap_or_else(Value::null),
            map.get(&Value::string("directory")).unwrap_or_else(Value::null),
        )
    }

    /// Points the `module` map at `path`: absolute path, base name and
    /// directory.
    pub fn set_module_path(&mut self, path: &Path) {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path
            .parent()
            .map(|parent| parent.display().to_string())
            .unwrap_or_default();
        self.write_module_fields(
            Value::string(path.display().to_string()),
            Value::string(file),
            Value::string(directory),
        );
    }

    /// Restores `module` fields captured with [`Interp::module_info`].
    pub fn restore_module_info(&mut self, path: Value, file: Value, directory: Value) {
        self.write_module_fields(path, file, directory);
    }

    fn write_module_fields(&mut self, path: Value, file: Value, directory: Value) {
        let Some(slot) = self.module_slot() else {
            return;
        };
        let mut stored = slot.borrow_mut();
        if let ValueKind::Map(map) = &mut stored.kind {
            let _ = map.insert(Value::string("path"), path);
            let _ = map.insert(Value::string("file"), file);
            let _ = map.insert(Value::string("directory"), directory);
        }
    }
}
