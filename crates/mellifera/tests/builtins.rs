//! Behavior of the builtin catalog: metamap methods, namespace maps,
//! conversions and import resolution.

use mellifera::{CollectPrint, Error, Interp, RunError, Value, eval_source};

fn run(source: &str) -> (Result<Option<Value>, RunError>, CollectPrint) {
    let writer = CollectPrint::new();
    let mut interp = Interp::with_writer(Box::new(writer.clone()));
    let env = interp.child_env();
    let result = eval_source(&mut interp, source, &env, None);
    (result, writer)
}

#[track_caller]
fn stdout_of(source: &str) -> String {
    let (result, writer) = run(source);
    match result {
        Ok(_) => writer.stdout(),
        Err(error) => panic!("program failed: {error}\nstdout so far: {}", writer.stdout()),
    }
}

#[track_caller]
fn error_of(source: &str) -> Error {
    let (result, _) = run(source);
    match result {
        Err(RunError::Eval(error)) => error,
        Err(RunError::Parse(error)) => panic!("expected runtime error, got parse error: {error}"),
        Ok(_) => panic!("expected runtime error, program succeeded"),
    }
}

// --- conversions ---------------------------------------------------------

#[test]
fn boolean_init_conversions() {
    let out = stdout_of(
        "println(boolean::init(0)); println(boolean::init(2.5)); println(boolean::init(NaN));\n\
         println(boolean::init(\"true\")); println(boolean::init(false));",
    );
    assert_eq!(out, "false\ntrue\nfalse\ntrue\nfalse\n");
    let error = error_of("boolean::init(\"yes\");");
    assert_eq!(error.to_string(), "cannot convert value \"yes\" to boolean");
}

#[test]
fn number_init_conversions() {
    let out = stdout_of(
        "println(number::init(\"12.5\")); println(number::init(\"0x10\")); println(number::init(\"-3\"));\n\
         println(number::init(\"+Inf\")); println(number::init(true)); println(number::init(7));",
    );
    assert_eq!(out, "12.5\n16\n-3\nInf\n1\n7\n");
    let error = error_of("number::init(\"12abc\");");
    assert_eq!(error.to_string(), "cannot convert value \"12abc\" to number");
}

#[test]
fn string_init_conversions() {
    let out = stdout_of(
        "println(string::init(12)); println(string::init(\"as-is\")); println(string::init([1, 2]));",
    );
    assert_eq!(out, "12\nas-is\n[1, 2]\n");
}

#[test]
fn vector_init_conversions() {
    let out = stdout_of(
        "println(vector::init([1, 2]));\n\
         println(vector::init({.a = 1}));\n\
         println(vector::init({1, 2}));\n\
         println(vector::init(range(0, 3)));",
    );
    assert_eq!(out, "[1, 2]\n[[\"a\", 1]]\n[1, 2]\n[0, 1, 2]\n");
    let error = error_of("vector::init(1);");
    assert_eq!(error.to_string(), "cannot convert value 1 to vector");
}

// --- number methods ------------------------------------------------------

#[test]
fn number_methods() {
    let out = stdout_of(
        "println((1.5).trunc()); println((2.5).round()); println((3.5).round());\n\
         println((1.2).floor()); println((1.2).ceil());\n\
         println((1.2345).fixed(2));\n\
         println(NaN.is_nan()); println(Inf.is_inf()); println((2).is_integer()); println((2.5).is_integer());",
    );
    assert_eq!(out, "1\n2\n4\n1\n2\n1.23\ntrue\ntrue\ntrue\nfalse\n");
}

// --- string methods ------------------------------------------------------

#[test]
fn string_inspection() {
    let out = stdout_of(
        r#"let s = "hello";
println(s.count());
println(s.contains("ell"));
println(s.starts_with("he"));
println(s.ends_with("lo"));
println(s.find("l"));
println(s.rfind("l"));
println(s.find("zz"));"#,
    );
    assert_eq!(out, "5\ntrue\ntrue\ntrue\n2\n3\nnull\n");
}

#[test]
fn string_count_is_bytes_runes_are_characters() {
    let out = stdout_of(
        "let s = \"h\u{e9}llo\";\n\
         println(s.count());\n\
         println(s.runes().count());",
    );
    assert_eq!(out, "6\n5\n");
}

#[test]
fn string_bytes_and_runes() {
    let out = stdout_of(r#"println("ab".bytes()); println("ab".runes());"#);
    assert_eq!(out, "[\"a\", \"b\"]\n[\"a\", \"b\"]\n");
}

#[test]
fn string_slice_split_join() {
    let out = stdout_of(
        r#"println("hello".slice(1, 3));
println("a,b,,c".split(","));
println("ab".split(""));
println(", ".join(["x", "y", "z"]));
println("".join([]));"#,
    );
    assert_eq!(out, "el\n[\"a\", \"b\", \"\", \"c\"]\n[\"a\", \"b\"]\nx, y, z\n\n");
}

#[test]
fn string_slice_bounds() {
    let error = error_of(r#""abc".slice(2, 1);"#);
    assert_eq!(error.to_string(), "slice end is less than slice begin");
    let error = error_of(r#""abc".slice(0, 9);"#);
    assert_eq!(error.to_string(), "slice end is greater than the string length");
}

#[test]
fn string_cut_and_replace() {
    let out = stdout_of(
        r#"let c = "key=value".cut("=");
println(c.prefix); println(c.suffix);
println("key".cut("=") == null);
println("a-b-c".replace("-", "+"));"#,
    );
    assert_eq!(out, "key\nvalue\ntrue\na+b+c\n");
}

#[test]
fn string_replace_with_empty_target_interleaves() {
    // an empty target matches between every byte and at both ends
    let out = stdout_of(
        r#"println("abc".replace("", "-"));
println("".replace("", "-"));"#,
    );
    assert_eq!(out, "-a-b-c-\n-\n");
}

#[test]
fn string_case_and_trim() {
    let out = stdout_of(
        r#"println("  padded  ".trim());
println("mixed Case".to_upper());
println("MIXED case".to_lower());
println("hello world".to_title());"#,
    );
    assert_eq!(out, "padded\nMIXED CASE\nmixed case\nHello World\n");
}

#[test]
fn string_join_rejects_non_strings() {
    let error = error_of(r#"",".join(["a", 1]);"#);
    assert_eq!(
        error.to_string(),
        "expected string-like value for vector element at index 1, received number"
    );
}

// --- vector methods ------------------------------------------------------

#[test]
fn vector_stack_operations() {
    let out = stdout_of(
        "let v = [1, 2];\n\
         v.push(3);\n\
         println(v.pop());\n\
         v.insert(0, 0);\n\
         println(v);\n\
         println(v.remove(1));\n\
         println(v);",
    );
    assert_eq!(out, "3\n[0, 1, 2]\n1\n[0, 2]\n");
}

#[test]
fn vector_search() {
    let out = stdout_of(
        "let v = [1, 2, 1];\n\
         println(v.contains(2)); println(v.contains(9));\n\
         println(v.find(1)); println(v.rfind(1)); println(v.find(9));",
    );
    assert_eq!(out, "true\nfalse\n0\n2\nnull\n");
}

#[test]
fn vector_slice_and_reversed() {
    let out = stdout_of(
        "let v = [1, 2, 3, 4];\n\
         println(v.slice(1, 3));\n\
         println(v.reversed());\n\
         println(v);",
    );
    assert_eq!(out, "[2, 3]\n[4, 3, 2, 1]\n[1, 2, 3, 4]\n");
}

#[test]
fn vector_sorted() {
    let out = stdout_of(
        "println([3, 1, 2].sorted());\n\
         println([\"b\", \"a\"].sorted());\n\
         println([].sorted());",
    );
    assert_eq!(out, "[1, 2, 3]\n[\"a\", \"b\"]\n[]\n");
}

#[test]
fn sorted_leaves_the_receiver_unchanged() {
    let out = stdout_of("let v = [2, 1]; v.sorted(); println(v);");
    assert_eq!(out, "[2, 1]\n");
}

// --- map and set methods -------------------------------------------------

#[test]
fn map_methods() {
    let out = stdout_of(
        "let m = {.a = 1};\n\
         println(m.count()); println(m.contains(\"a\")); println(m.contains(\"b\"));\n\
         m.insert(\"b\", 2);\n\
         println(m.count());\n\
         println(m.remove(\"a\"));\n\
         println(m);",
    );
    assert_eq!(out, "1\ntrue\nfalse\n2\n1\n{\"b\": 2}\n");
    let error = error_of("let m = Map{}; m.remove(\"x\");");
    assert_eq!(
        error.to_string(),
        "attempted map::remove on a map without key \"x\""
    );
}

#[test]
fn map_union_is_right_biased() {
    let out = stdout_of("println({.a = 1, .b = 1}.union({.b = 2}));");
    assert_eq!(out, "{\"a\": 1, \"b\": 2}\n");
}

#[test]
fn set_methods_and_algebra() {
    let out = stdout_of(
        "let a = {1, 2, 3};\n\
         let b = {2, 3, 4};\n\
         println(a.union(b));\n\
         println(a.intersection(b));\n\
         println(a.difference(b));\n\
         a.insert(9);\n\
         println(a.contains(9));\n\
         a.remove(9);\n\
         println(a.count());",
    );
    assert_eq!(out, "{1, 2, 3, 4}\n{2, 3}\n{1}\n\ntrue\n3\n");
    let error = error_of("let s = Set{}; s.remove(1);");
    assert_eq!(
        error.to_string(),
        "attempted set::remove on a set without element 1"
    );
}

#[test]
fn map_keys_may_be_any_hashable_value() {
    let out = stdout_of(
        "let m = Map{};\n\
         m[[1, 2]] = \"vec\";\n\
         m[true] = \"bool\";\n\
         m[null] = \"null\";\n\
         println(m[[1, 2]]); println(m[true]); println(m[null]);",
    );
    assert_eq!(out, "vec\nbool\nnull\n");
}

// --- math ----------------------------------------------------------------

#[test]
fn math_namespace() {
    let out = stdout_of(
        "println(math::abs(-3)); println(math::pow(2, 10)); println(math::sqrt(9));\n\
         println(math::floor(1.9)); println(math::ceil(1.1)); println(math::trunc(-1.7));\n\
         println(math::log(1)); println(math::log2(8)); println(math::log10(1000));\n\
         println(math::log(0)); println(math::is_nan(math::sqrt(-1)));\n\
         println(math::clamp(5, 0, 3)); println(math::clamp(-1, 0, 3)); println(math::clamp(2, 0, 3));\n\
         println(math::exp(0)); println(math::exp2(3)); println(math::exp10(2));\n\
         println(math::sin(0)); println(math::atan2(0, 1));",
    );
    assert_eq!(
        out,
        "3\n1024\n3\n1\n2\n-1\n0\n3\n3\n-Inf\ntrue\n3\n0\n2\n1\n8\n100\n0\n0\n"
    );
}

#[test]
fn math_constants() {
    let out = stdout_of("println(math::pi > 3.14 and math::pi < 3.15); println(math::e > 2.7);");
    assert_eq!(out, "true\ntrue\n");
}

// --- json ----------------------------------------------------------------

#[test]
fn json_encode_forms() {
    let out = stdout_of(
        r#"println(json::encode({.a = 1, .b = [true, null, "x"]}));
println(json::encode(2.5));
println(json::encode("text"));"#,
    );
    assert_eq!(out, "{\"a\": 1, \"b\": [true, null, \"x\"]}\n2.5\n\"text\"\n");
}

#[test]
fn json_decode_forms() {
    let out = stdout_of(
        r#"let decoded = json::decode("{\"a\": [1, 2.5, false, null]}");
println(decoded.a);
println(json::decode("3") + 1);"#,
    );
    assert_eq!(out, "[1, 2.5, false, null]\n4\n");
}

#[test]
fn json_rejects_unencodable_values() {
    let error = error_of("json::encode(NaN);");
    assert_eq!(error.to_string(), "cannot JSON-encode value NaN");
    let error = error_of("json::encode({1: 2});");
    assert_eq!(error.to_string(), "cannot JSON-encode map with key 1");
    let error = error_of("json::encode(println);");
    assert_eq!(
        error.to_string(),
        "cannot JSON-encode value println@builtin of type function"
    );
    let error = error_of(r#"json::decode("[1,");"#);
    assert_eq!(error.to_string(), "cannot JSON-decode string \"[1,\"");
    let error = error_of(r#"json::decode("Infinity");"#);
    assert!(error.to_string().starts_with("cannot JSON-decode"), "{error}");
}

// --- html ----------------------------------------------------------------

#[test]
fn html_escape() {
    let out = stdout_of(r#"println(html::escape("<a href=\"x\">&'</a>"));"#);
    assert_eq!(out, "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;\n");
}

// --- regular expressions -------------------------------------------------

#[test]
fn regex_last_match_is_process_state() {
    let out = stdout_of(
        r#"if "abc123" =~ r"([a-z]+)(\d+)" {
    println(re::group(0)); println(re::group(1)); println(re::group(2));
}"#,
    );
    assert_eq!(out, "abc123\nabc\n123\n");
}

#[test]
fn regex_group_errors() {
    let error = error_of(r#""a" =~ r"b"; re::group(0);"#);
    assert_eq!(error.to_string(), "regular expression did not match");
    let error = error_of(r#""a" =~ r"a"; re::group(5);"#);
    assert_eq!(
        error.to_string(),
        "out-of-bounds regular expression capture group 5"
    );
}

#[test]
fn regex_optional_group_is_null() {
    let out = stdout_of(r#"if "b" =~ r"(a)?(b)" { println(re::group(1) == null); }"#);
    assert_eq!(out, "true\n");
}

#[test]
fn regex_operators_type_check() {
    let error = error_of(r#"1 =~ r"x";"#);
    assert_eq!(
        error.to_string(),
        "attempted =~ operation with types `number` and `regexp`"
    );
    // the negative match operator reports as `=~` too
    let error = error_of(r#"1 !~ r"x";"#);
    assert_eq!(
        error.to_string(),
        "attempted =~ operation with types `number` and `regexp`"
    );
}

#[test]
fn negative_match_operator() {
    let out = stdout_of(r#"println("abc" !~ r"\d"); println("a1" !~ r"\d");"#);
    assert_eq!(out, "true\nfalse\n");
}

// --- ty ------------------------------------------------------------------

#[test]
fn ty_predicates() {
    let out = stdout_of(
        "println(ty::is_null(null)); println(ty::is_boolean(true)); println(ty::is_number(1));\n\
         println(ty::is_string(\"s\")); println(ty::is_regexp(r\"x\")); println(ty::is_vector([]));\n\
         println(ty::is_map(Map{})); println(ty::is_set(Set{})); println(ty::is_reference(null.&));\n\
         println(ty::is_function(println)); println(ty::is_function(function() { return 1; }));\n\
         println(ty::is_number(\"1\"));",
    );
    assert_eq!(
        out,
        "true\ntrue\ntrue\ntrue\ntrue\ntrue\ntrue\ntrue\ntrue\ntrue\ntrue\nfalse\n"
    );
}

#[test]
fn ty_is_rejects_non_type_arguments() {
    let error = error_of("ty::is(1, 2);");
    assert_eq!(
        error.to_string(),
        "expected null or map value created with the `type` keyword, received 2"
    );
}

// --- random --------------------------------------------------------------

#[test]
fn random_is_deterministic_after_seeding() {
    let program = "random::seed(42); println(random::integer(0, 100)); println(random::number(0, 1) >= 0);";
    let first = stdout_of(program);
    let second = stdout_of(program);
    assert_eq!(first, second);
}

#[test]
fn random_integer_stays_in_range() {
    let out = stdout_of(
        "random::seed(7);\n\
         let ok = true;\n\
         for _ in 100 {\n\
             let n = random::integer(3, 5);\n\
             if n < 3 or n > 5 { ok = false; }\n\
             if not n.is_integer() { ok = false; }\n\
         }\n\
         println(ok);",
    );
    assert_eq!(out, "true\n");
}

#[test]
fn random_integer_validates() {
    let error = error_of("random::integer(0.5, 2);");
    assert_eq!(error.to_string(), "expected integer, received 0.5");
}

// --- misc top-level builtins ---------------------------------------------

#[test]
fn repr_versus_print() {
    let out = stdout_of(r#"println(repr("x")); print("x"); print("\n"); dump("x");"#);
    assert_eq!(out, "\"x\"\nx\n\"x\"");
}

#[test]
fn min_max_work_on_numbers_and_strings() {
    let out = stdout_of(
        "println(min(1, 2)); println(max(1, 2)); println(min(\"a\", \"b\")); println(max(\"a\", \"b\"));",
    );
    assert_eq!(out, "1\n2\na\nb\n");
}

#[test]
fn assert_raises_on_false() {
    let error = error_of("assert(false);");
    assert_eq!(error.to_string(), "assertion failure");
    let out = stdout_of("assert(true); println(\"ok\");");
    assert_eq!(out, "ok\n");
}

#[test]
fn baseenv_exposes_bindings() {
    let out = stdout_of(
        "let env = baseenv();\n\
         println(env.contains(\"println\"));\n\
         println(env.contains(\"range\"));\n\
         println(env.contains(\"no_such_binding\"));",
    );
    assert_eq!(out, "true\ntrue\nfalse\n");
}

#[test]
fn arity_validation_message() {
    let error = error_of("typename(1, 2);");
    assert_eq!(
        error.to_string(),
        "invalid argument count (expected 1, received 2)"
    );
}

#[test]
fn typed_argument_messages() {
    let error = error_of("math::abs(\"x\");");
    assert_eq!(
        error.to_string(),
        "expected number-like value for argument 0, received string"
    );
    let error = error_of("vector::count(1);");
    assert_eq!(
        error.to_string(),
        "expected reference to vector-like value for argument 0, received number"
    );
}

// --- fs and import -------------------------------------------------------

fn unique_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("mellifera-test-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create test dir");
    dir
}

#[test]
fn fs_read_write_append() {
    let dir = unique_dir("fs");
    let path = dir.join("data.txt");
    let path_text = path.display().to_string();
    let out = stdout_of(&format!(
        "fs::write(\"{path_text}\", \"one\");\n\
         fs::append(\"{path_text}\", \"-two\");\n\
         println(fs::read(\"{path_text}\"));"
    ));
    assert_eq!(out, "one-two\n");
    let error = error_of("fs::read(\"/no/such/mellifera/file\");");
    assert_eq!(
        error.to_string(),
        "failed to read file \"/no/such/mellifera/file\""
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn import_resolves_relative_to_the_module_directory() {
    let dir = unique_dir("import");
    std::fs::write(dir.join("answers.mf"), "let x = 40;\nreturn x + 2;\n").expect("write module");

    let writer = CollectPrint::new();
    let mut interp = Interp::with_writer(Box::new(writer.clone()));
    interp.set_module_path(&dir.join("main.mf"));
    let env = interp.child_env();
    let result = eval_source(
        &mut interp,
        "println(import(\"answers.mf\"));",
        &env,
        None,
    );
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(writer.stdout(), "42\n");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn import_of_a_directory_loads_lib_mf() {
    let dir = unique_dir("import-lib");
    let lib_dir = dir.join("mylib");
    std::fs::create_dir_all(&lib_dir).expect("create lib dir");
    std::fs::write(lib_dir.join("lib.mf"), "return {.version = 3};\n").expect("write lib");

    let writer = CollectPrint::new();
    let mut interp = Interp::with_writer(Box::new(writer.clone()));
    interp.set_module_path(&dir.join("main.mf"));
    let env = interp.child_env();
    let result = eval_source(
        &mut interp,
        "let lib = import(\"mylib\"); println(lib.version);",
        &env,
        None,
    );
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(writer.stdout(), "3\n");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_import_is_an_error() {
    let error = error_of("import(\"definitely-not-a-module\");");
    assert_eq!(
        error.to_string(),
        "module \"definitely-not-a-module\" not found"
    );
}

#[test]
fn import_restores_module_fields() {
    let dir = unique_dir("import-restore");
    std::fs::write(dir.join("probe.mf"), "return module.file;\n").expect("write module");

    let writer = CollectPrint::new();
    let mut interp = Interp::with_writer(Box::new(writer.clone()));
    interp.set_module_path(&dir.join("main.mf"));
    let env = interp.child_env();
    let result = eval_source(
        &mut interp,
        "println(import(\"probe.mf\")); println(module.file);",
        &env,
        None,
    );
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(writer.stdout(), "probe.mf\nmain.mf\n");

    let _ = std::fs::remove_dir_all(&dir);
}
