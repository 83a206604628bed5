//! End-to-end compilation scenarios: resources, classes, defined types,
//! nodes, collections, relationships, and the catalog invariants.

mod common;

use cairn_eval::{Relationship, ResourceStatus, StaticFactProvider, Value};
use common::*;

// ──────────────────────────────────────────────
// Core scenarios
// ──────────────────────────────────────────────

#[test]
fn arithmetic_notice() {
    let (catalog, logger) = compile_ok("$x = 1 + 2 * 3 notice $x");
    assert_eq!(notices(&logger), vec!["7"]);
    assert!(user_resources(&catalog).is_empty());
}

#[test]
fn resource_declaration() {
    let (catalog, _) =
        compile_ok("file { '/tmp/a': ensure => present, mode => '0644' }");
    assert_eq!(
        user_resources(&catalog),
        vec![("File".to_string(), "/tmp/a".to_string())]
    );
    let index = catalog.find_resource("file", "/tmp/a").unwrap();
    assert_eq!(catalog.resource(index).status(), ResourceStatus::Real);
    assert_eq!(
        parameter(&catalog, "file", "/tmp/a", "ensure"),
        Some(Value::String("present".to_string()))
    );
    assert_eq!(
        parameter(&catalog, "file", "/tmp/a", "mode"),
        Some(Value::String("0644".to_string()))
    );
}

#[test]
fn virtual_resource_realized_by_collection() {
    let (catalog, _) = compile_ok("@user { 'alice': uid => 1000 } User <| uid == 1000 |>");
    let index = catalog.find_resource("user", "alice").unwrap();
    assert_eq!(
        catalog.resource(index).status(),
        ResourceStatus::RealizedVirtual
    );
}

#[test]
fn unmatched_virtual_resource_stays_out_of_the_catalog() {
    let (catalog, _) = compile_ok("@user { 'alice': uid => 1000 } User <| uid == 2000 |>");
    assert!(user_resources(&catalog).is_empty());
    // Still present for duplicate detection, just unrealized
    let index = catalog.find_resource("user", "alice").unwrap();
    assert_eq!(catalog.resource(index).status(), ResourceStatus::Virtual);
}

#[test]
fn exported_resources_need_the_exported_collector() {
    let (catalog, _) = compile_ok("@@host { 'db': ip => '10.0.0.2' } Host <| |>");
    let index = catalog.find_resource("host", "db").unwrap();
    assert_eq!(catalog.resource(index).status(), ResourceStatus::Exported);

    let (catalog, _) = compile_ok("@@host { 'db': ip => '10.0.0.2' } Host <<| |>>");
    let index = catalog.find_resource("host", "db").unwrap();
    assert_eq!(
        catalog.resource(index).status(),
        ResourceStatus::RealizedExported
    );
}

#[test]
fn class_with_parameters() {
    let (catalog, _) =
        compile_ok("class web($port = 80) { notify { \"port-${port}\": } } include web");
    assert!(catalog.find_resource("class", "web").is_some());
    assert!(catalog.find_resource("notify", "port-80").is_some());
}

#[test]
fn assert_type_routes_to_lambda() {
    let (_, logger) =
        compile_ok("$x = assert_type(Integer, 'hi') |$actual| { 0 } notice $x");
    assert_eq!(notices(&logger), vec!["0"]);
}

#[test]
fn duplicate_resource_fails() {
    let (error, logger) = compile_err("file { '/a': }\nfile { '/a': }");
    assert!(
        error.message.contains("previously declared"),
        "message: {}",
        error.message
    );
    // Exactly one error, at the second declaration
    assert_eq!(logger.errors(), 1);
    assert_eq!(error.line, 2);
}

// ──────────────────────────────────────────────
// Catalog invariants
// ──────────────────────────────────────────────

#[test]
fn include_is_idempotent() {
    let once = compile_ok("class foo { notify { 'in-foo': } } include foo").0;
    let twice = compile_ok("class foo { notify { 'in-foo': } } include foo include foo").0;
    assert_eq!(user_resources(&once), user_resources(&twice));
}

#[test]
fn class_redeclaration_with_identical_parameters_is_a_no_op() {
    let (catalog, _) = compile_ok(
        "class web($port = 80) { } class { 'web': port => 8080 } include web",
    );
    assert!(catalog.find_resource("class", "web").is_some());
}

#[test]
fn class_redeclaration_with_different_parameters_fails() {
    let (error, _) = compile_err(
        "class web($port = 80) { } class { 'web': port => 8080 } class { 'web': port => 9090 }",
    );
    assert!(
        error.message.contains("previously declared"),
        "message: {}",
        error.message
    );
}

#[test]
fn variable_write_once() {
    let (error, logger) = compile_err("$x = 1\n$x = 2");
    assert!(
        error.message.contains("previously assigned"),
        "message: {}",
        error.message
    );
    assert_eq!(logger.errors(), 1);
    assert_eq!(error.line, 2);
}

#[test]
fn assignment_cannot_shadow_enclosing_scopes() {
    let (error, _) = compile_err("$x = 1 if true { $x = 2 }");
    assert!(
        error.message.contains("previously assigned"),
        "message: {}",
        error.message
    );
}

#[test]
fn resource_order_is_declaration_order() {
    let (catalog, _) = compile_ok(
        "file { '/b': } user { 'alice': } file { '/a': } notify { 'done': }",
    );
    assert_eq!(
        user_resources(&catalog),
        vec![
            ("File".to_string(), "/b".to_string()),
            ("User".to_string(), "alice".to_string()),
            ("File".to_string(), "/a".to_string()),
            ("Notify".to_string(), "done".to_string()),
        ]
    );
}

#[test]
fn unproductive_expression_is_an_error() {
    let (error, _) = compile_err("1 + 1 notice 'done'");
    assert!(
        error.message.contains("unproductive"),
        "message: {}",
        error.message
    );
}

// ──────────────────────────────────────────────
// Relationships
// ──────────────────────────────────────────────

#[test]
fn require_metaparameter_creates_a_reversed_edge() {
    let (catalog, _) = compile_ok(
        "package { 'nginx': } service { 'nginx': require => Package['nginx'] }",
    );
    let package = catalog.find_resource("package", "nginx").unwrap();
    let service = catalog.find_resource("service", "nginx").unwrap();
    assert_eq!(catalog.edges().len(), 1);
    let edge = catalog.edges()[0];
    assert_eq!(edge.source, package);
    assert_eq!(edge.target, service);
    assert_eq!(edge.relationship, Relationship::Require);
}

#[test]
fn relationship_arrows_chain() {
    let (catalog, _) = compile_ok(
        "package { 'nginx': } file { '/etc/nginx.conf': } service { 'nginx': }\n\
         Package['nginx'] -> File['/etc/nginx.conf'] -> Service['nginx']",
    );
    let package = catalog.find_resource("package", "nginx").unwrap();
    let file = catalog.find_resource("file", "/etc/nginx.conf").unwrap();
    let service = catalog.find_resource("service", "nginx").unwrap();
    let edges: Vec<(usize, usize)> = catalog
        .edges()
        .iter()
        .map(|e| (e.source, e.target))
        .collect();
    assert!(edges.contains(&(package, file)));
    assert!(edges.contains(&(file, service)));
}

#[test]
fn notify_arrow_uses_subscription() {
    let (catalog, _) = compile_ok(
        "file { '/etc/app.conf': } service { 'app': }\n\
         File['/etc/app.conf'] ~> Service['app']",
    );
    assert_eq!(catalog.edges().len(), 1);
    assert_eq!(catalog.edges()[0].relationship, Relationship::Notify);
}

#[test]
fn missing_relationship_target_fails_at_finalization() {
    let (error, _) = compile_err("service { 'app': require => Package['missing'] }");
    assert!(
        error.message.contains("does not exist in the catalog"),
        "message: {}",
        error.message
    );
}

#[test]
fn dependency_cycles_are_reported() {
    let (error, _) = compile_err(
        "file { '/a': before => File['/b'] } file { '/b': before => File['/a'] }",
    );
    assert!(
        error.message.contains("dependency cycle"),
        "message: {}",
        error.message
    );
}

// ──────────────────────────────────────────────
// Defined types and nodes
// ──────────────────────────────────────────────

#[test]
fn defined_type_evaluates_once_per_title() {
    let (catalog, _) = compile_ok(
        "define site::dir($mode = '0755') { file { \"/srv/${title}\": mode => $mode } }\n\
         site::dir { 'one': }\n\
         site::dir { 'two': mode => '0700' }",
    );
    assert!(catalog.find_resource("site::dir", "one").is_some());
    assert_eq!(
        parameter(&catalog, "file", "/srv/one", "mode"),
        Some(Value::String("0755".to_string()))
    );
    assert_eq!(
        parameter(&catalog, "file", "/srv/two", "mode"),
        Some(Value::String("0700".to_string()))
    );
}

#[test]
fn defined_type_requires_missing_parameters() {
    let (error, _) = compile_err(
        "define site::dir($mode) { } site::dir { 'one': }",
    );
    assert!(
        error.message.contains("failed to evaluate defined type"),
        "message: {}",
        error.message
    );
}

#[test]
fn node_definitions_match_by_subname() {
    let (catalog, _) = compile_ok(
        "node 'test.example.com' { notify { 'matched': } } node default { notify { 'default': } }",
    );
    assert!(catalog.find_resource("notify", "matched").is_some());
    assert!(catalog.find_resource("notify", "default").is_none());
    assert!(catalog.find_resource("node", "test.example.com").is_some());
}

#[test]
fn node_definitions_match_by_regex_and_default() {
    let (catalog, _) = compile_ok(
        "node /^db\\d+/ { notify { 'db': } } node default { notify { 'fallback': } }",
    );
    // test.example.com matches neither regex nor name: default wins
    assert!(catalog.find_resource("notify", "fallback").is_some());
    assert!(catalog.find_resource("node", "default").is_some());
}

#[test]
fn duplicate_default_node_fails() {
    let (error, _) = compile_err("node default { } node default { }");
    assert!(
        error.message.contains("previously defined"),
        "message: {}",
        error.message
    );
}

#[test]
fn no_matching_node_fails() {
    let (error, _) = compile_err("node 'other.example.com' { }");
    assert!(
        error.message.contains("could not find a default node"),
        "message: {}",
        error.message
    );
}

// ──────────────────────────────────────────────
// Defaults and overrides
// ──────────────────────────────────────────────

#[test]
fn scope_defaults_apply_to_later_declarations() {
    let (catalog, _) = compile_ok(
        "File { mode => '0644', owner => 'root' } file { '/a': owner => 'web' }",
    );
    assert_eq!(
        parameter(&catalog, "file", "/a", "mode"),
        Some(Value::String("0644".to_string()))
    );
    assert_eq!(
        parameter(&catalog, "file", "/a", "owner"),
        Some(Value::String("web".to_string()))
    );
}

#[test]
fn default_body_applies_to_all_bodies() {
    let (catalog, _) = compile_ok(
        "file { default: mode => '0600'; '/a': ; '/b': mode => '0644' }",
    );
    assert_eq!(
        parameter(&catalog, "file", "/a", "mode"),
        Some(Value::String("0600".to_string()))
    );
    assert_eq!(
        parameter(&catalog, "file", "/b", "mode"),
        Some(Value::String("0644".to_string()))
    );
}

#[test]
fn override_sets_new_attributes() {
    let (catalog, _) = compile_ok(
        "file { '/a': owner => 'root' } File['/a'] { group => 'wheel' }",
    );
    assert_eq!(
        parameter(&catalog, "file", "/a", "group"),
        Some(Value::String("wheel".to_string()))
    );
    assert_eq!(
        parameter(&catalog, "file", "/a", "owner"),
        Some(Value::String("root".to_string()))
    );
}

#[test]
fn override_of_class_resources_is_rejected() {
    let (error, _) = compile_err(
        "class web { } include web Class['web'] { foo => 1 }",
    );
    assert!(
        error.message.contains("cannot override"),
        "message: {}",
        error.message
    );
}

#[test]
fn metaparameter_types_are_validated() {
    let (error, _) = compile_err("file { '/a': noop => 'yes' }");
    assert!(
        error.message.contains("expected Boolean"),
        "message: {}",
        error.message
    );
}

#[test]
fn relationship_metaparameters_accept_scalars() {
    let (catalog, _) = compile_ok(
        "package { 'nginx': } service { 'nginx': require => 'Package[nginx]' }",
    );
    // Scalars wrap into arrays
    let value = parameter(&catalog, "service", "nginx", "require").unwrap();
    assert!(matches!(value, Value::Array(_)));
    assert_eq!(catalog.edges().len(), 1);
}

// ──────────────────────────────────────────────
// Classes: inheritance and scoping
// ──────────────────────────────────────────────

#[test]
fn class_scopes_are_addressable_by_qualified_name() {
    let (_, logger) = compile_ok(
        "class config { $root = '/srv' } include config notice $config::root",
    );
    assert_eq!(notices(&logger), vec!["/srv"]);
}

#[test]
fn qualified_lookup_declares_the_class_on_demand() {
    let (catalog, logger) = compile_ok(
        "class config { $root = '/srv' } notice $config::root",
    );
    assert_eq!(notices(&logger), vec!["/srv"]);
    assert!(catalog.find_resource("class", "config").is_some());
}

#[test]
fn child_classes_see_parent_variables() {
    let (_, logger) = compile_ok(
        "class base { $root = '/srv' } class app inherits base { notice $root } include app",
    );
    assert_eq!(notices(&logger), vec!["/srv"]);
}

#[test]
fn conflicting_parent_definitions_fail() {
    let (error, _) = compile_err(
        "class a { } class b { } class web inherits a { } class web inherits b { }",
    );
    assert!(
        error.message.contains("already inherits"),
        "message: {}",
        error.message
    );
}

#[test]
fn class_parameter_defaults_see_earlier_parameters() {
    let (_, logger) = compile_ok(
        "class paths($root = '/srv', $logs = \"${root}/logs\") { notice $logs } include paths",
    );
    assert_eq!(notices(&logger), vec!["/srv/logs"]);
}

#[test]
fn undefined_class_cannot_be_declared() {
    let (error, _) = compile_err("include missing");
    assert!(
        error.message.contains("has not been defined"),
        "message: {}",
        error.message
    );
}

#[test]
fn nested_classes_qualify_their_names() {
    let (catalog, _) = compile_ok(
        "class outer { class inner { } } include outer::inner",
    );
    assert!(catalog.find_resource("class", "outer::inner").is_some());
}

#[test]
fn class_and_defined_type_names_conflict() {
    let (error, _) = compile_err("define web { } class web { }");
    assert!(
        error.message.contains("previously defined as a defined type"),
        "message: {}",
        error.message
    );
}

#[test]
fn reserved_class_names_are_rejected() {
    let (error, _) = compile_err("class main { }");
    assert!(
        error.message.contains("built-in class"),
        "message: {}",
        error.message
    );
}

#[test]
fn reserved_parameter_names_are_rejected() {
    let (error, _) = compile_err("class web($title) { }");
    assert!(
        error.message.contains("reserved"),
        "message: {}",
        error.message
    );
}

// ──────────────────────────────────────────────
// Facts and settings
// ──────────────────────────────────────────────

#[test]
fn facts_are_top_scope_variables() {
    let mut facts = StaticFactProvider::empty();
    facts.set("osfamily", Value::String("linux".to_string()));
    let (result, logger) = compile_with_facts("notice $osfamily", facts);
    result.unwrap();
    assert_eq!(notices(&logger), vec!["linux"]);
}

#[test]
fn facts_cannot_be_reassigned() {
    let mut facts = StaticFactProvider::empty();
    facts.set("osfamily", Value::String("linux".to_string()));
    let (result, _) = compile_with_facts("$osfamily = 'windows'", facts);
    let error = result.unwrap_err();
    assert!(
        error.message.contains("fact or node parameter"),
        "message: {}",
        error.message
    );
}

#[test]
fn settings_scope_is_available() {
    let (_, logger) = compile_ok("notice $settings::node_name");
    assert_eq!(notices(&logger), vec![NODE_NAME]);
}

// ──────────────────────────────────────────────
// Output encoding
// ──────────────────────────────────────────────

#[test]
fn catalog_serializes_resources_and_edges() {
    let (catalog, _) = compile_ok(
        "package { 'nginx': ensure => present } service { 'nginx': require => Package['nginx'] }",
    );
    let json = catalog.to_json();
    let resources = json["resources"].as_array().unwrap();
    assert!(resources.iter().any(|r| {
        r["type"] == "Package" && r["title"] == "nginx" && r["parameters"]["ensure"] == "present"
    }));
    let edges = json["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["source"], "Package[nginx]");
    assert_eq!(edges[0]["target"], "Service[nginx]");
}
