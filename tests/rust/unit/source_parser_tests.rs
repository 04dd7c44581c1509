use gremgraph::gremlin::parse_source;
use test_case::test_case;

#[test]
fn test_empty_and_comment_only_sources() {
    assert!(parse_source("").unwrap().functions.is_empty());
    let file = parse_source("// nothing here\n/* still nothing */\n").unwrap();
    assert!(file.functions.is_empty());
    assert!(file.imports.is_empty());
}

#[test_case("def f() { g.V() }", &[]; "no args")]
#[test_case("def f(id) { g.V(id) }", &["id"]; "single arg")]
#[test_case("def f(String name, int limit = 5) { g.V() }", &["name", "limit"]; "typed with default")]
#[test_case("def f( a ,b ) { g.V() }", &["a", "b"]; "loose spacing")]
#[test_case("def f(id, Map opts = [depth: 2, dir: 'out']) { g.V(id) }", &["id", "opts"]; "map default")]
#[test_case("def f(id, since = new Date(0), n = Math.max(1, 2)) { g.V(id) }", &["id", "since", "n"]; "call defaults")]
fn test_argument_names(source: &str, expected: &[&str]) {
    let file = parse_source(source).unwrap();
    assert_eq!(file.function("f").unwrap().args, expected);
}

#[test]
fn test_nested_blocks_and_strings() {
    let source = r#"
def tagged(id) {
    def tags = ['a}', "b{"]
    g.V(id).sideEffect { it.get().property('seen', true) }.fold()
}

def after() { g.E() }
"#;
    let file = parse_source(source).unwrap();
    let tagged = file.function("tagged").unwrap();
    assert!(tagged.body.starts_with("def tags = ['a}', \"b{\"]"));
    assert!(tagged.body.ends_with(".fold()"));
    assert_eq!(file.function("after").unwrap().body, "g.E()");
}

#[test]
fn test_triple_quoted_strings_keep_braces() {
    let source = "def q() {\n    '''{{'''\n    \"\"\"}\"\"\"\n}\n";
    let body = &parse_source(source).unwrap().functions[0].body;
    assert_eq!(body, "'''{{'''\n    \"\"\"}\"\"\"");
}

#[test]
fn test_unterminated_body_reports_line() {
    let err = parse_source("import a.B\n\ndef broken(id) {\n    g.V(id)\n").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(err.message.contains("broken"));
}

#[test]
fn test_later_definition_is_kept_in_order() {
    let file = parse_source("def a() { 1 }\ndef b() { 2 }\ndef a() { 3 }\n").unwrap();
    assert_eq!(file.functions.len(), 3);
    assert_eq!(file.function("a").unwrap().body, "1");
}
