//! End-to-end program behavior: whole Mellifera programs evaluated against
//! a fresh interpreter with captured output.

use mellifera::{CollectPrint, Error, Interp, RunError, Value, eval_source};

/// Runs a program, returning the evaluation outcome and captured stdout.
fn run(source: &str) -> (Result<Option<Value>, RunError>, CollectPrint) {
    let writer = CollectPrint::new();
    let mut interp = Interp::with_writer(Box::new(writer.clone()));
    let env = interp.child_env();
    let result = eval_source(&mut interp, source, &env, None);
    (result, writer)
}

/// Runs a program that must succeed, returning its stdout.
#[track_caller]
fn stdout_of(source: &str) -> String {
    let (result, writer) = run(source);
    match result {
        Ok(_) => writer.stdout(),
        Err(error) => panic!("program failed: {error}\nstdout so far: {}", writer.stdout()),
    }
}

/// Runs a program that must fail with a runtime error.
#[track_caller]
fn error_of(source: &str) -> Error {
    let (result, _) = run(source);
    match result {
        Err(RunError::Eval(error)) => error,
        Err(RunError::Parse(error)) => panic!("expected runtime error, got parse error: {error}"),
        Ok(_) => panic!("expected runtime error, program succeeded"),
    }
}

// --- end-to-end scenarios ------------------------------------------------

#[test]
fn scenario_cow_isolation() {
    let out = stdout_of(
        "let v = [1,2,3]; let w = v; w.push(4); println(v.count()); println(w.count());",
    );
    assert_eq!(out, "3\n4\n");
}

#[test]
fn scenario_regex_groups() {
    let out = stdout_of(
        r#"let r = r"(\d+)-(\d+)"; if "12-345" =~ r { println(re::group(1)); println(re::group(2)); }"#,
    );
    assert_eq!(out, "12\n345\n");
}

#[test]
fn scenario_map_iteration() {
    let out = stdout_of("let m = {.a = 1, .b = 2}; let s = 0; for k, v in m { s = s + v; } println(s);");
    assert_eq!(out, "3\n");
}

#[test]
fn scenario_number_iteration() {
    let out = stdout_of(
        "let range_sum = function(n) { let s = 0; for i in n { s = s + i; } return s; }; println(range_sum(5));",
    );
    assert_eq!(out, "10\n");
}

#[test]
fn scenario_try_catch() {
    let out = stdout_of(r#"try { error "boom"; } catch e { println(e); }"#);
    assert_eq!(out, "boom\n");
}

#[test]
fn scenario_type_and_new() {
    let out = stdout_of(
        "let T = type { .f = function(self) { return 42; } }; let x = new T {}; println(x.f());",
    );
    assert_eq!(out, "42\n");
}

// --- values and arithmetic -----------------------------------------------

#[test]
fn arithmetic_identities() {
    let out = stdout_of(
        "let a = 12.5;\n\
         println(a + 0 == a);\n\
         println(a - a == 0);\n\
         println(a * 1 == a);",
    );
    assert_eq!(out, "true\ntrue\ntrue\n");
}

#[test]
fn remainder_takes_sign_of_dividend() {
    let out = stdout_of(
        "println(7 % 3); println(7 % -3); println(-7 % 3); println(-7 % -3);",
    );
    assert_eq!(out, "1\n1\n-1\n-1\n");
}

#[test]
fn division_by_zero() {
    let error = error_of("let x = 1 / 0;");
    assert_eq!(error.to_string(), "division by zero");
    let error = error_of("let x = 1 % 0;");
    assert_eq!(error.to_string(), "remainder with divisor zero");
}

#[test]
fn number_printing() {
    let out = stdout_of(
        "println(10 / 2); println(1 / 3); println(0.1 + 0.2); println(Inf); println(-Inf); println(NaN); println(0xff);",
    );
    assert_eq!(
        out,
        "5\n0.3333333333333333\n0.30000000000000004\nInf\n-Inf\nNaN\n255\n"
    );
}

#[test]
fn string_concat_and_compare() {
    let out = stdout_of(
        r#"println("foo" + "bar"); println("a" < "b"); println("b" <= "a"); println("x" == "x");"#,
    );
    assert_eq!(out, "foobar\ntrue\nfalse\ntrue\n");
}

#[test]
fn vector_concat() {
    let out = stdout_of("println([1, 2] + [3]);");
    assert_eq!(out, "[1, 2, 3]\n");
}

#[test]
fn mixed_type_addition_fails() {
    let error = error_of("let x = [1] + 2;");
    assert_eq!(
        error.to_string(),
        "attempted + operation with types `vector` and `number`"
    );
}

#[test]
fn structural_equality_across_types() {
    let out = stdout_of(
        r#"println([1, 2] == [1, 2]); println({.a = 1} == {.a = 1}); println({1, 2} == {2, 1}); println(1 == "1");"#,
    );
    assert_eq!(out, "true\ntrue\ntrue\nfalse\n");
}

// --- short-circuit logic -------------------------------------------------

#[test]
fn short_circuit_does_not_invoke_rhs() {
    let out = stdout_of(
        "let called = false;\n\
         let f = function() { called = true; return true; };\n\
         let a = false and f();\n\
         let b = true or f();\n\
         println(called); println(a); println(b);",
    );
    assert_eq!(out, "false\nfalse\ntrue\n");
}

#[test]
fn boolean_operand_on_either_side_short_circuits() {
    // a boolean false right operand short-circuits even with a non-boolean
    // left operand; only the no-shortcut path type-checks both sides
    let out = stdout_of("println(5 and false); println(5 or true);");
    assert_eq!(out, "false\ntrue\n");
    let error = error_of("let x = 5 and true;");
    assert_eq!(
        error.to_string(),
        "attempted binary and operation with types `number` and `boolean`"
    );
}

#[test]
fn not_requires_boolean() {
    let error = error_of("let x = not 1;");
    assert_eq!(error.to_string(), "attempted unary not operation with type `number`");
}

// --- references and copy-on-write ----------------------------------------

#[test]
fn reference_mutation_is_visible_through_origin() {
    let out = stdout_of(
        "let v = [1, 2, 3];\n\
         let r = v.&;\n\
         r.push(4);\n\
         println(v.count());",
    );
    assert_eq!(out, "4\n");
}

#[test]
fn deref_copies_out() {
    let out = stdout_of(
        "let v = [1];\n\
         let r = v.&;\n\
         let w = r.*;\n\
         w.push(2);\n\
         println(v.count()); println(w.count());",
    );
    assert_eq!(out, "1\n2\n");
}

#[test]
fn rebinding_detaches_existing_references() {
    let out = stdout_of(
        "let x = 1;\n\
         let r = x.&;\n\
         x = 2;\n\
         println(r.*); println(x);",
    );
    assert_eq!(out, "1\n2\n");
}

#[test]
fn element_references_alias_live_slots() {
    let out = stdout_of(
        "let v = [[1], [2]];\n\
         for x.& in v { x.push(0); }\n\
         println(v);",
    );
    assert_eq!(out, "[[1, 0], [2, 0]]\n");
}

#[test]
fn map_value_references_alias_live_slots() {
    let out = stdout_of(
        "let m = {.a = [1]};\n\
         for k, v.& in m { v.push(2); }\n\
         println(m);",
    );
    assert_eq!(out, "{\"a\": [1, 2]}\n");
}

#[test]
fn deref_of_non_reference_fails() {
    let error = error_of("let x = 1; let y = x.*;");
    assert_eq!(
        error.to_string(),
        "attempted dereference of non-reference type `number`"
    );
}

// --- iteration -----------------------------------------------------------

#[test]
fn vector_iteration_uses_a_snapshot() {
    let out = stdout_of(
        "let v = [1, 2, 3];\n\
         let total = 0;\n\
         for x in v { v.push(x); total = total + x; }\n\
         println(total); println(v.count());",
    );
    assert_eq!(out, "6\n6\n");
}

#[test]
fn set_iteration_orders_by_insertion() {
    let out = stdout_of("let s = {3, 1, 2}; for x in s { println(x); }");
    assert_eq!(out, "3\n1\n2\n");
}

#[test]
fn iteration_validation_errors() {
    let error = error_of("for x in true { }");
    assert_eq!(error.to_string(), "attempted iteration over type `boolean`");
    let error = error_of("for x in 1.5 { }");
    assert_eq!(
        error.to_string(),
        "attempted iteration over non-integer number `1.5`"
    );
    let error = error_of("for x in -1 { }");
    assert_eq!(
        error.to_string(),
        "attempted iteration over negative number `-1`"
    );
    let error = error_of("for k.& in {.a = 1} { }");
    assert_eq!(error.to_string(), "cannot use a key-reference over type `map`");
    let error = error_of("for k, v in [1] { }");
    assert_eq!(
        error.to_string(),
        "attempted key-value iteration over type `vector`"
    );
}

#[test]
fn user_iterator_protocol() {
    let out = stdout_of("for i in range(2, 5) { println(i); }");
    assert_eq!(out, "2\n3\n4\n");
}

#[test]
fn iterator_adapters() {
    let out = stdout_of(
        "println(range(0, 5).transform(function(x) { return x * 2; }).into_vector());\n\
         println(range(0, 6).filter(function(x) { return x % 2 == 0; }).into_vector());\n\
         println(range(0, 4).count());\n\
         println(range(0, 4).contains(3));\n\
         println(range(0, 4).any(function(x) { return x > 2; }));\n\
         println(range(0, 4).all(function(x) { return x > 2; }));",
    );
    assert_eq!(out, "[0, 2, 4, 6, 8]\n[0, 2, 4]\n4\ntrue\ntrue\nfalse\n");
}

#[test]
fn vector_iterator_method() {
    let out = stdout_of(
        "let v = [10, 20];\n\
         for x in v.iterator() { println(x); }",
    );
    assert_eq!(out, "10\n20\n");
}

#[test]
fn range_rejects_backward_bounds() {
    let error = error_of("range(5, 0);");
    assert_eq!(
        error.to_string(),
        "end-of-range 0 is less than beginning-of-range 5"
    );
}

// --- control flow --------------------------------------------------------

#[test]
fn while_break_continue() {
    let out = stdout_of(
        "let i = 0;\n\
         let total = 0;\n\
         while true {\n\
             i = i + 1;\n\
             if i > 10 { break; }\n\
             if i % 2 == 0 { continue; }\n\
             total = total + i;\n\
         }\n\
         println(total);",
    );
    assert_eq!(out, "25\n");
}

#[test]
fn break_outside_loop_is_an_error() {
    let error = error_of("break;");
    assert_eq!(error.to_string(), "attempted to break outside of a loop");
    let error = error_of("let f = function() { continue; }; f();");
    assert_eq!(error.to_string(), "attempted to continue outside of a loop");
}

#[test]
fn return_passes_through_try() {
    let out = stdout_of(
        "let f = function() {\n\
             try { return 1; } catch { return 2; }\n\
         };\n\
         println(f());",
    );
    assert_eq!(out, "1\n");
}

#[test]
fn top_level_return_is_the_program_value() {
    let (result, _) = run("return 7;");
    assert_eq!(result.unwrap(), Some(Value::number(7.0)));
}

#[test]
fn conditionals_require_booleans() {
    let error = error_of("if 1 { }");
    assert_eq!(error.to_string(), "conditional with non-boolean type `number`");
    let error = error_of("while 1 { }");
    assert_eq!(error.to_string(), "conditional with non-boolean type `number`");
}

#[test]
fn elif_else_chains() {
    let out = stdout_of(
        "let classify = function(n) {\n\
             if n < 0 { return \"neg\"; }\n\
             elif n == 0 { return \"zero\"; }\n\
             else { return \"pos\"; }\n\
         };\n\
         println(classify(-1)); println(classify(0)); println(classify(3));",
    );
    assert_eq!(out, "neg\nzero\npos\n");
}

#[test]
fn block_scoping_shadows_and_restores() {
    let out = stdout_of(
        "let x = 1;\n\
         if true { let x = 2; println(x); }\n\
         println(x);",
    );
    assert_eq!(out, "2\n1\n");
}

// --- functions and closures ----------------------------------------------

#[test]
fn closures_capture_their_environment() {
    let out = stdout_of(
        "let make = function() {\n\
             let n = 0;\n\
             return function() { n = n + 1; return n; };\n\
         };\n\
         let c = make();\n\
         c(); c();\n\
         println(c());",
    );
    assert_eq!(out, "3\n");
}

#[test]
fn recursion() {
    let out = stdout_of(
        "let fib = function(n) {\n\
             if n < 2 { return n; }\n\
             return fib(n - 1) + fib(n - 2);\n\
         };\n\
         println(fib(10));",
    );
    assert_eq!(out, "55\n");
}

#[test]
fn call_arity_is_exact() {
    let error = error_of("let f = function(a, b) { return a; }; f(1);");
    assert_eq!(
        error.to_string(),
        "invalid function argument count (expected 2, received 1)"
    );
}

#[test]
fn calling_a_non_function_fails() {
    let error = error_of("let x = 1; x();");
    assert!(
        error.to_string().starts_with("attempted to call non-function type `number`"),
        "{error}"
    );
}

#[test]
fn function_display_uses_let_names() {
    let out = stdout_of("let f = function() { return 1; }; println(repr(f));");
    assert_eq!(out, "f\n");
    let out = stdout_of("println(repr(println));");
    assert_eq!(out, "println@builtin\n");
}

// --- metamaps and dispatch -----------------------------------------------

#[test]
fn method_dispatch_reaches_metamap_through_reference() {
    let out = stdout_of(
        "let T = type {\n\
             .get = function(self) { return self.value; },\n\
             .bump = function(self) { self.value = self.value + 1; },\n\
         };\n\
         let x = new T { .value = 1 };\n\
         x.bump();\n\
         x.bump();\n\
         println(x.get());",
    );
    assert_eq!(out, "3\n");
}

#[test]
fn typename_and_typeof() {
    let out = stdout_of(
        "println(typename(1)); println(typename(\"x\")); println(typename([]));\n\
         let T = type {.a = 1};\n\
         println(typename(new T {}));\n\
         println(typeof(null));\n\
         println(typeof(typeof(1)));",
    );
    assert_eq!(out, "number\nstring\nvector\nT\nnull\nnull\n");
}

#[test]
fn ty_is_uses_metamap_identity() {
    let out = stdout_of(
        "let T = type {.a = 1};\n\
         let x = new T {};\n\
         println(ty::is(x, T));\n\
         println(ty::is(x, typeof(1)));\n\
         println(ty::is(1, typeof(2)));\n\
         println(ty::is(null, null));",
    );
    assert_eq!(out, "true\nfalse\ntrue\ntrue\n");
}

#[test]
fn metamaps_are_immutable() {
    let error = error_of("let T = type {.a = 1}; T.a = 2;");
    assert!(
        error.to_string().starts_with("attempted to modify metamap"),
        "{error}"
    );
    let error = error_of("let T = type {.a = 1}; map::insert(T.&, \"b\", 2);");
    assert!(
        error.to_string().starts_with("attempted to modify metamap"),
        "{error}"
    );
}

#[test]
fn new_requires_a_metamap() {
    let error = error_of("let x = new {.a = 1} {};");
    assert!(
        error
            .to_string()
            .starts_with("expected map-like value created with the `type` expression"),
        "{error}"
    );
    let error = error_of("let x = new 1 {};");
    assert_eq!(error.to_string(), "expected map-like value, received `number`");
}

#[test]
fn extends_builds_inheritance() {
    let out = stdout_of(
        "let Base = type { .hello = function(self) { return \"hi\"; } };\n\
         let Derived = type extends(Base, { .loud = function(self) { return self.hello() + \"!\"; } });\n\
         let x = new Derived {};\n\
         println(x.loud());",
    );
    assert_eq!(out, "hi!\n");
}

#[test]
fn into_string_drives_templates_and_print() {
    let out = stdout_of(
        "let T = type { .into_string = function(self) { return \"custom\"; } };\n\
         let x = new T {};\n\
         println($\"<{x}>\");\n\
         println(x);\n\
         dumpln(x);",
    );
    assert_eq!(out, "<custom>\ncustom\nMap{}\n");
}

#[test]
fn into_string_must_return_a_string() {
    let error = error_of(
        "let T = type { .into_string = function(self) { return 1; } };\n\
         println($\"{new T {}}\");",
    );
    assert_eq!(error.to_string(), "metafunction `into_string` returned 1");
}

// --- templates -----------------------------------------------------------

#[test]
fn template_interpolation() {
    let out = stdout_of(
        r#"let name = "world"; println($"hello, {name}!"); println($"1 + 2 = {1 + 2}"); println($"{{literal}}");"#,
    );
    assert_eq!(out, "hello, world!\n1 + 2 = 3\n{literal}\n");
}

#[test]
fn template_raw_and_multiline_forms() {
    let out = stdout_of("println($`raw {1 + 1} \\n kept`);");
    assert_eq!(out, "raw 2 \\n kept\n");
    let out = stdout_of("println($```a ` tick {2 * 3}```);");
    assert_eq!(out, "a ` tick 6\n");
}

#[test]
fn template_stringifies_non_strings() {
    let out = stdout_of(r#"println($"{[1, 2]} and {null} and {{}}");"#);
    assert_eq!(out, "[1, 2] and null and {}\n");
}

// --- access and assignment -----------------------------------------------

#[test]
fn index_access_and_assignment() {
    let out = stdout_of(
        "let v = [1, 2, 3];\n\
         v[1] = 20;\n\
         println(v[1]);\n\
         let m = Map{};\n\
         m[3] = \"x\";\n\
         m.key = true;\n\
         println(m[3]); println(m.key); println(m::key);",
    );
    assert_eq!(out, "20\nx\ntrue\ntrue\n");
}

#[test]
fn vector_index_validation() {
    let error = error_of("let v = [1]; println(v[5]);");
    assert_eq!(error.to_string(), "invalid vector access with index 5");
    let error = error_of("let v = [1]; println(v[0.5]);");
    assert_eq!(error.to_string(), "invalid vector access with index 0.5");
    let error = error_of("let v = [1]; v[-1] = 0;");
    assert_eq!(
        error.to_string(),
        "attempted vector access using a negative index -1"
    );
}

#[test]
fn missing_map_field_fails() {
    let error = error_of("let m = {.a = 1}; println(m.b);");
    assert_eq!(error.to_string(), "invalid map access with field \"b\"");
    let error = error_of("let m = {.a = 1}; println(m::b);");
    assert_eq!(error.to_string(), "invalid map access with field \"b\"");
}

#[test]
fn scope_access_is_container_only() {
    // `::` does not fall back to the metamap, so `count` is not found
    let error = error_of("let m = {.a = 1}; println(m::count);");
    assert_eq!(error.to_string(), "invalid map access with field \"count\"");
    let error = error_of("let x = 1; println(x::a);");
    assert_eq!(error.to_string(), "attempted to access field of type `number`");
}

#[test]
fn assignment_to_non_lvalue_fails() {
    let error = error_of("1 + 2 = 3;");
    assert_eq!(error.to_string(), "attempted assignment to non-lvalue");
}

#[test]
fn assignment_to_undefined_identifier_fails() {
    let error = error_of("x = 1;");
    assert_eq!(error.to_string(), "identifier `x` is not defined");
}

#[test]
fn dot_assignment_writes_through_references() {
    let out = stdout_of(
        "let m = {.a = 1};\n\
         let r = m.&;\n\
         r.a = 2;\n\
         println(m.a);",
    );
    assert_eq!(out, "2\n");
}

#[test]
fn nested_container_writes() {
    let out = stdout_of(
        "let m = {.inner = {.n = 1}};\n\
         m.inner.n = 5;\n\
         println(m.inner.n);\n\
         let v = [[1, 2]];\n\
         v[0][1] = 9;\n\
         println(v);",
    );
    assert_eq!(out, "5\n[[1, 9]]\n");
}

// --- errors and traces ---------------------------------------------------

#[test]
fn error_payloads_may_be_any_value() {
    let out = stdout_of("try { error [1, 2]; } catch e { println(repr(e)); }");
    assert_eq!(out, "[1, 2]\n");
}

#[test]
fn catch_without_identifier() {
    let out = stdout_of("try { error \"x\"; } catch { println(\"caught\"); }");
    assert_eq!(out, "caught\n");
}

#[test]
fn uncaught_errors_carry_innermost_first_traces() {
    let error = error_of(
        "let inner = function() { error \"deep\"; };\n\
         let outer = function() { return inner(); };\n\
         outer();",
    );
    assert_eq!(error.to_string(), "deep");
    assert_eq!(error.trace.len(), 2);
    assert_eq!(error.trace[0].callee.to_string(), "inner");
    assert_eq!(error.trace[1].callee.to_string(), "outer");
}

#[test]
fn source_builtins_contribute_one_trace_frame() {
    let error = error_of("[1, \"a\"].sorted();");
    assert_eq!(
        error.to_string(),
        "attempted < operation with types `number` and `string`"
    );
    assert_eq!(error.trace.len(), 1);
    assert_eq!(error.trace[0].callee.to_string(), "vector::sorted@builtin");
}

#[test]
fn builtin_errors_gain_a_frame() {
    let error = error_of("[].pop();");
    assert_eq!(error.to_string(), "attempted vector::pop on an empty vector");
    assert_eq!(error.trace.len(), 1);
    assert_eq!(error.trace[0].callee.to_string(), "vector::pop@builtin");
}

#[test]
fn errors_raised_in_loops_propagate() {
    let error = error_of("for i in 3 { if i == 1 { error \"mid\"; } }");
    assert_eq!(error.to_string(), "mid");
}
