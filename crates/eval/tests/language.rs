//! Expression-level semantics: operators, matching, control flow,
//! interpolation, and the built-in functions, observed through notice
//! output.

mod common;

use cairn_eval::{Level, StaticFactProvider, Value};
use common::*;

// ──────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────

#[test]
fn arithmetic_promotes_mixed_numerics() {
    let (_, logger) = compile_ok("notice 1 + 0.5 notice 7 / 2 notice 7.0 / 2 notice 7 % 3");
    assert_eq!(notices(&logger), vec!["1.5", "3", "3.5", "1"]);
}

#[test]
fn division_by_zero_fails() {
    let (error, _) = compile_err("$x = 1 / 0");
    assert!(
        error.message.contains("divide by zero"),
        "message: {}",
        error.message
    );
}

#[test]
fn integer_overflow_fails() {
    let (error, _) = compile_err("$x = (0 - 9223372036854775807 - 1) / -1");
    assert!(
        error.message.contains("overflow"),
        "message: {}",
        error.message
    );
}

#[test]
fn plus_concatenates_arrays_and_merges_hashes() {
    let (_, logger) = compile_ok(
        "$a = [1, 2] + [3] notice $a\n\
         $h = { 'a' => 1, 'b' => 1 } + { 'b' => 2 } notice $h['b']",
    );
    assert_eq!(notices(&logger), vec!["[1, 2, 3]", "2"]);
}

#[test]
fn left_shift_appends_to_arrays() {
    let (_, logger) = compile_ok("$a = [1] << 2 << [3] notice $a notice 1 << 3");
    // Appending an array appends it as a single element
    assert_eq!(notices(&logger), vec!["[1, 2, [3]]", "8"]);
}

#[test]
fn string_comparison_is_case_insensitive() {
    let (_, logger) = compile_ok(
        "notice 'ABC' == 'abc' notice 'apple' < 'Banana' notice 'a' != 'b'",
    );
    assert_eq!(notices(&logger), vec!["true", "true", "true"]);
}

#[test]
fn cross_kind_ordering_fails_but_equality_is_false() {
    let (_, logger) = compile_ok("notice 1 == 'one'");
    assert_eq!(notices(&logger), vec!["false"]);
    let (error, _) = compile_err("$x = 1 < 'one'");
    assert!(error.message.contains("expected"), "message: {}", error.message);
}

#[test]
fn type_comparison_uses_specialization() {
    let (_, logger) = compile_ok(
        "notice Integer[1, 5] < Integer notice Integer <= Integer notice String > Enum['a']",
    );
    assert_eq!(notices(&logger), vec!["true", "true", "true"]);
}

#[test]
fn logical_operators_short_circuit() {
    // The right side of a short-circuited `and` is never evaluated, so the
    // division by zero is unreachable
    let (_, logger) = compile_ok("$x = false and 1 / 0 notice $x notice true or false");
    assert_eq!(notices(&logger), vec!["false", "true"]);
}

#[test]
fn truthiness_counts_only_undef_and_false_as_false() {
    let (_, logger) = compile_ok(
        "notice !undef notice !false notice !0 notice !'' notice ![] notice !{}",
    );
    assert_eq!(
        notices(&logger),
        vec!["true", "true", "false", "false", "false", "false"]
    );
}

#[test]
fn in_operator_is_type_dependent() {
    let (_, logger) = compile_ok(
        "notice 'ell' in 'Hello' notice 2 in [1, 2] notice 'a' in { 'a' => 1 } \
         notice(/l+/ in 'hello') notice Integer in ['x', 3] notice 5 in 5",
    );
    assert_eq!(
        notices(&logger),
        vec!["true", "true", "true", "true", "true", "false"]
    );
}

#[test]
fn match_and_in_bind_looser_than_arithmetic() {
    // Tight to loose: arithmetic, then equality/match, then ordering,
    // then `in`
    let (_, logger) = compile_ok(
        "notice 1 + 2 =~ Integer[3, 3] notice 1 + 1 == 2 in [true] notice 10 - 6 < 5 in [true]",
    );
    assert_eq!(notices(&logger), vec!["true", "true", "true"]);
}

#[test]
fn match_binds_capture_groups() {
    let (_, logger) = compile_ok(
        "if 'web-42' =~ /^(\\w+)-(\\d+)$/ { notice $0 notice $1 notice $2 }",
    );
    assert_eq!(notices(&logger), vec!["web-42", "web", "42"]);
}

#[test]
fn not_match_negates() {
    let (_, logger) = compile_ok("notice 'abc' !~ /\\d/ notice 'abc' =~ 'b'");
    assert_eq!(notices(&logger), vec!["true", "true"]);
}

#[test]
fn splat_expands_in_argument_lists() {
    let (_, logger) = compile_ok("$args = ['a', 'b'] notice(*$args) notice [1, *[2, 3], 4]");
    assert_eq!(notices(&logger), vec!["a b", "[1, 2, 3, 4]"]);
}

// ──────────────────────────────────────────────
// Control flow
// ──────────────────────────────────────────────

#[test]
fn if_elsif_else() {
    let (_, logger) = compile_ok(
        "$x = 7 if $x > 10 { notice 'big' } elsif $x > 5 { notice 'medium' } else { notice 'small' }",
    );
    assert_eq!(notices(&logger), vec!["medium"]);
}

#[test]
fn unless_runs_on_false() {
    let (_, logger) = compile_ok("unless false { notice 'ran' } unless true { } else { notice 'else' }");
    assert_eq!(notices(&logger), vec!["ran", "else"]);
}

#[test]
fn case_matches_literals_regexes_and_types() {
    let (_, logger) = compile_ok(
        "case 'debian' { 'redhat': { notice 'rpm' } /^deb/: { notice 'apt' } default: { notice 'other' } }\n\
         case 42 { Integer: { notice 'int' } default: { notice 'other' } }",
    );
    assert_eq!(notices(&logger), vec!["apt", "int"]);
}

#[test]
fn case_default_is_position_independent() {
    let (_, logger) = compile_ok(
        "case 'zzz' { default: { notice 'fallback' } 'aaa': { notice 'a' } }",
    );
    assert_eq!(notices(&logger), vec!["fallback"]);
}

#[test]
fn selector_picks_first_match() {
    let (_, logger) = compile_ok(
        "$os = 'debian'\n\
         $family = $os ? { /deb/ => 'apt', 'redhat' => 'rpm', default => 'unknown' }\n\
         notice $family",
    );
    assert_eq!(notices(&logger), vec!["apt"]);
}

#[test]
fn selector_without_match_or_default_fails() {
    let (error, _) = compile_err("$x = 'z' ? { 'a' => 1 }");
    assert!(
        error.message.contains("no matching selector case"),
        "message: {}",
        error.message
    );
}

// ──────────────────────────────────────────────
// Strings, heredocs, and access
// ──────────────────────────────────────────────

#[test]
fn interpolation_of_variables_and_expressions() {
    let (_, logger) = compile_ok(
        "$port = 80\n\
         notice \"port is $port\"\n\
         notice \"next is ${$port + 1}\"\n\
         notice \"${unset_variable}!\"",
    );
    assert_eq!(notices(&logger), vec!["port is 80", "next is 81", "!"]);
}

#[test]
fn interpolation_with_access_treats_name_as_variable() {
    let (_, logger) = compile_ok("$list = ['a', 'b'] notice \"first is ${list[0]}\"");
    assert_eq!(notices(&logger), vec!["first is a"]);
}

#[test]
fn single_quotes_do_not_interpolate() {
    let (_, logger) = compile_ok("$x = 1 notice '$x and \\'quoted\\''");
    assert_eq!(notices(&logger), vec!["$x and 'quoted'"]);
}

#[test]
fn escape_sequences_resolve_in_double_quotes() {
    let (_, logger) = compile_ok("notice \"tab\\tend\" notice \"u:\\u0041\" notice \"\\${literal}\"");
    assert_eq!(notices(&logger), vec!["tab\tend", "u:A", "${literal}"]);
}

#[test]
fn heredoc_strips_margin_and_interpolates() {
    let source = "$who = 'ops'\n$text = @(\"EOT\")\n    hello ${who}\n    line two\n    | EOT\nnotice $text";
    let (_, logger) = compile_ok(source);
    assert_eq!(notices(&logger), vec!["hello ops\nline two\n"]);
}

#[test]
fn heredoc_trim_removes_trailing_break() {
    let source = "$text = @(EOT)\nexact\n|- EOT\nnotice $text";
    let (_, logger) = compile_ok(source);
    assert_eq!(notices(&logger), vec!["exact"]);
}

#[test]
fn array_and_string_access() {
    let (_, logger) = compile_ok(
        "$a = [10, 20, 30]\n\
         notice $a[1] notice $a[-1] notice $a[5] notice $a[0, 2]\n\
         $s = 'hello' notice $s[1] notice $s[1, 3]",
    );
    assert_eq!(
        notices(&logger),
        vec!["20", "30", "", "[10, 20]", "e", "ell"]
    );
}

#[test]
fn hash_access_returns_undef_for_missing_keys() {
    let (_, logger) = compile_ok(
        "$h = { 'a' => 1, 'b' => 2 } notice $h['a'] notice \"${h['missing']}!\"",
    );
    assert_eq!(notices(&logger), vec!["1", "!"]);
}

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

#[test]
fn parameterized_types_check_instances() {
    let (_, logger) = compile_ok(
        "notice 5 =~ Integer[1, 10] notice 'no' =~ Integer notice 'hi' =~ String[1, 2] \
         notice undef =~ Optional[Integer] notice 'a' =~ Variant[Integer, Enum['a', 'b']]",
    );
    assert_eq!(
        notices(&logger),
        vec!["true", "false", "true", "true", "true"]
    );
}

#[test]
fn assert_type_returns_matching_values() {
    let (_, logger) = compile_ok("notice assert_type(Integer[1, 10], 5)");
    assert_eq!(notices(&logger), vec!["5"]);
}

#[test]
fn assert_type_fails_without_lambda() {
    let (error, _) = compile_err("$x = assert_type(Integer, 'hi')");
    assert!(
        error.message.contains("type assertion failure"),
        "message: {}",
        error.message
    );
}

#[test]
fn typed_parameters_are_validated() {
    let (error, _) = compile_err(
        "class web(Integer[1, 65535] $port = 80) { } class { 'web': port => 'http' }",
    );
    assert!(
        error.message.contains("failed to evaluate class"),
        "message: {}",
        error.message
    );
}

#[test]
fn resource_references_are_type_values() {
    let (_, logger) = compile_ok(
        "file { '/a': } $ref = File['/a'] notice $ref notice $ref =~ Type[Resource]",
    );
    assert_eq!(notices(&logger), vec!["File[/a]", "true"]);
}

// ──────────────────────────────────────────────
// Functions
// ──────────────────────────────────────────────

#[test]
fn each_iterates_collections() {
    let (_, logger) = compile_ok(
        "[10, 20].each |$index, $value| { notice \"${index}=${value}\" }\n\
         { 'a' => 1 }.each |$key, $value| { notice \"${key}:${value}\" }\n\
         each(3) |$n| { notice $n }",
    );
    assert_eq!(
        notices(&logger),
        vec!["0=10", "1=20", "a:1", "0", "1", "2"]
    );
}

#[test]
fn each_over_integer_ranges() {
    let (_, logger) = compile_ok("Integer[5, 7].each |$n| { notice $n }");
    assert_eq!(notices(&logger), vec!["5", "6", "7"]);
}

#[test]
fn each_requires_an_enumerable() {
    let (error, _) = compile_err("each(true) |$x| { }");
    assert!(
        error.message.contains("enumerable"),
        "message: {}",
        error.message
    );
}

#[test]
fn filter_keeps_true_elements() {
    let (_, logger) = compile_ok(
        "$even = [1, 2, 3, 4].filter |$n| { $n % 2 == 0 } notice $even\n\
         $h = { 'a' => 1, 'b' => 2 }.filter |$k, $v| { $v > 1 } notice $h['b']",
    );
    assert_eq!(notices(&logger), vec!["[2, 4]", "2"]);
}

#[test]
fn split_by_string_regex_and_empty_pattern() {
    let (_, logger) = compile_ok(
        "notice split('a,b,c', ',') notice split('a1b22c', /\\d+/) notice split('abc', '')",
    );
    assert_eq!(
        notices(&logger),
        vec!["[a, b, c]", "[a, b, c]", "[a, b, c]"]
    );
}

#[test]
fn with_passes_arguments_through() {
    let (_, logger) = compile_ok("notice with(2, 3) |$a, $b| { $a + $b }");
    assert_eq!(notices(&logger), vec!["5"]);
}

#[test]
fn fail_aborts_with_the_message() {
    let (error, logger) = compile_err("fail 'broken', 'badly'");
    assert!(error.message.contains("broken badly"), "message: {}", error.message);
    assert_eq!(logger.errors(), 1);
}

#[test]
fn logging_functions_use_their_levels() {
    let (_, logger) = compile_ok("debug 'd' info 'i' notice 'n' warning 'w'");
    assert!(logger.messages_at(Level::Debug).contains(&"d".to_string()));
    assert_eq!(logger.messages_at(Level::Info), vec!["i"]);
    assert_eq!(logger.messages_at(Level::Notice), vec!["n"]);
    assert_eq!(logger.messages_at(Level::Warning), vec!["w"]);
    assert_eq!(logger.warnings(), 1);
}

#[test]
fn shellquote_quotes_words() {
    let (_, logger) = compile_ok("notice shellquote('plain', 'has space', ['in$list'])");
    assert_eq!(notices(&logger), vec!["plain \"has space\" 'in$list'"]);
}

#[test]
fn unknown_functions_fail() {
    let (error, _) = compile_err("$x = frobnicate(1)");
    assert!(
        error.message.contains("unknown function"),
        "message: {}",
        error.message
    );
}

#[test]
fn method_calls_prepend_the_target() {
    let (_, logger) = compile_ok("$parts = 'a,b'.split(',') notice $parts[1]");
    assert_eq!(notices(&logger), vec!["b"]);
}

#[test]
fn lambdas_capture_enclosing_variables() {
    let (_, logger) = compile_ok(
        "$prefix = 'n' [1, 2].each |$n| { notice \"${prefix}${n}\" }",
    );
    assert_eq!(notices(&logger), vec!["n1", "n2"]);
}

#[test]
fn lambda_captures_rest_parameters() {
    let (_, logger) = compile_ok("with(1, 2, 3) |$first, *$rest| { notice $rest } ");
    assert_eq!(notices(&logger), vec!["[2, 3]"]);
}

#[test]
fn facts_flow_through_functions() {
    let mut facts = StaticFactProvider::empty();
    facts.set(
        "interfaces",
        Value::Array(vec![
            Value::String("lo".to_string()),
            Value::String("eth0".to_string()),
        ]),
    );
    let (result, logger) = compile_with_facts(
        "$real = $interfaces.filter |$i| { $i != 'lo' } notice $real",
        facts,
    );
    result.unwrap();
    assert_eq!(notices(&logger), vec!["[eth0]"]);
}
