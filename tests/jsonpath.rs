use std::str::FromStr;

use json_token_path::{
    select_token, select_tokens, CompareOp, Document, Error, EvalError, Expression, Filter,
    JsonPath, LogicalOp, Operand, Value,
};
use serde_json::json;

#[test]
fn parse() {
    #[track_caller]
    fn test(s: &str, filters: Vec<Filter>) {
        let path = JsonPath::from_str(s).unwrap();
        assert_eq!(path.filters(), filters.as_slice());
    }
    fn field(name: &str) -> Filter {
        Filter::Field(Some(name.into()))
    }

    test("", vec![]);
    test("$", vec![]);
    test(" $ ", vec![]);
    test("$.a", vec![field("a")]);
    test("a.b", vec![field("a"), field("b")]);
    test("$foo", vec![field("$foo")]);
    test("$.*", vec![Filter::Field(None)]);
    test("$['*']", vec![field("*")]);
    test("$..a", vec![Filter::Scan(Some("a".into()))]);
    test("$..*", vec![Filter::Scan(None)]);
    test("$[0]", vec![Filter::ArrayIndex(Some(0))]);
    test("$[ 1 ]", vec![Filter::ArrayIndex(Some(1))]);
    test("$[*]", vec![Filter::ArrayIndex(None)]);
    test("$[1, 2]", vec![Filter::ArrayMultipleIndex(vec![1, 2])]);
    test(
        "$[-2:]",
        vec![Filter::ArraySlice {
            start: Some(-2),
            end: None,
            step: None,
        }],
    );
    test(
        "$[::-1]",
        vec![Filter::ArraySlice {
            start: None,
            end: None,
            step: Some(-1),
        }],
    );
    test(
        "$['a', 'b']",
        vec![Filter::FieldMultiple(vec!["a".into(), "b".into()])],
    );
    test(
        "$..['a','b']",
        vec![Filter::ScanMultiple(vec!["a".into(), "b".into()])],
    );
    test(r"$['it\'s']", vec![field("it's")]);
    test(r"$['a\tb']", vec![field("a\tb")]);
    test("$.a(0)", vec![field("a"), Filter::ArrayIndex(Some(0))]);
}

#[test]
fn parse_query() {
    #[track_caller]
    fn test(s: &str, expr: Expression) {
        let path = JsonPath::from_str(s).unwrap();
        assert_eq!(path.filters(), [Filter::Query(Box::new(expr))]);
    }
    fn at(name: &str) -> Operand {
        Operand::Path(vec![Filter::Field(Some(name.into()))])
    }
    fn exists(name: &str) -> Expression {
        Expression::Boolean {
            op: CompareOp::Exists,
            left: at(name),
            right: None,
        }
    }
    fn cmp(name: &str, op: CompareOp, value: impl Into<Value>) -> Expression {
        Expression::Boolean {
            op,
            left: at(name),
            right: Some(Operand::Literal(value.into())),
        }
    }

    test("$[?(@.a)]", exists("a"));
    test("$[?(@.a>1)]", cmp("a", CompareOp::Gt, 1i64));
    test("$[?(@.a <> 'x')]", cmp("a", CompareOp::Ne, "x"));
    test(r#"$[?(@.a === "x")]"#, cmp("a", CompareOp::StrictEq, "x"));
    test("$[?(@.a !== null)]", cmp("a", CompareOp::StrictNe, Value::Null));
    test("$[?(@.a <= -1.5)]", cmp("a", CompareOp::Le, -1.5));
    test("$[?(@.a >= 2e1)]", cmp("a", CompareOp::Ge, 20.0));
    test("$[?(@.a == false)]", cmp("a", CompareOp::Eq, false));
    test(
        "$[?(@ < $.limit)]",
        Expression::Boolean {
            op: CompareOp::Lt,
            left: Operand::Path(vec![]),
            right: Some(Operand::Path(vec![
                Filter::Root,
                Filter::Field(Some("limit".into())),
            ])),
        },
    );
    test(
        "$[?(@.a && @.b && @.c)]",
        Expression::Composite {
            op: LogicalOp::And,
            expressions: vec![exists("a"), exists("b"), exists("c")],
        },
    );
    // a change of operator nests the rest of the chain
    test(
        "$[?(@.a && @.b || @.c)]",
        Expression::Composite {
            op: LogicalOp::And,
            expressions: vec![
                exists("a"),
                Expression::Composite {
                    op: LogicalOp::Or,
                    expressions: vec![exists("b"), exists("c")],
                },
            ],
        },
    );

    let path = JsonPath::from_str(r"$[?(@.id =~ /^a\/b$/im)]").unwrap();
    let [Filter::Query(expr)] = path.filters() else {
        panic!("expected a query: {path:?}");
    };
    let Expression::Boolean {
        op: CompareOp::RegexMatch,
        right: Some(Operand::Regex(regex)),
        ..
    } = &**expr
    else {
        panic!("expected a regex: {expr:?}");
    };
    assert_eq!(regex.pattern(), "^a/b$");
    assert_eq!(regex.flags(), "im");
}

#[test]
fn parse_error() {
    #[track_caller]
    fn test(s: &str, position: usize, message: &str) {
        let err = JsonPath::from_str(s).unwrap_err();
        assert_eq!((err.position(), err.message()), (position, message), "{s}");
    }

    test("$.a.", 4, "Unexpected end while parsing path.");
    test("$..", 3, "Unexpected end while parsing path.");
    test("$[0]x", 4, "Unexpected character following indexer: x");
    test("$.a]", 3, "Unexpected character while parsing path: ]");
    test("$.a b", 4, "Unexpected character while parsing path: b");
    test("$[", 2, "Path ended with open indexer.");
    test("$[0", 3, "Path ended with open indexer.");
    test("$['a", 4, "Path ended with an open string.");
    test(r"$['a\q']", 5, r"Unknown escape character: \q");
    test("$['a' 'b']", 6, "Unexpected character while parsing path indexer: '");
    test("$['a',b]", 6, "Unexpected character while parsing path indexer: b");
    test("$[]", 2, "Array index expected.");
    test("$[1,]", 4, "Array index expected.");
    test("$[a]", 2, "Unexpected character while parsing path indexer: a");
    test("$[1 2]", 4, "Unexpected character while parsing path indexer: 2");
    test("$[1:2:3:4]", 7, "Unexpected character while parsing path indexer: :");
    test("$[1,2:3]", 5, "Unexpected character while parsing path indexer: :");
    test("$[*,1]", 3, "Unexpected character while parsing path indexer: ,");
    test("$[99999999999]", 13, "Invalid array index: 99999999999");
    test("$[?@.a]", 3, "Unexpected character while parsing path indexer: @");
    test("$[?(@.a == 1]", 12, "Unexpected character while parsing path query: ]");
    test("$[?(@.a == 1", 12, "Path ended with open query.");
    test("$[?(@.a ~ 1)]", 8, "Could not read query operator.");
    test("$[?(@.a == x)]", 11, "Unexpected character while parsing path query: x");
    test("$[?(@.a & @.b)]", 8, "Unexpected character while parsing path query: &");
    test("$[?(@.a =~ /x)]", 15, "Path ended with an open regex.");
    test("$[?(@.a. == 1)]", 8, "Unexpected end while parsing path.");

    let err = JsonPath::from_str("$[").unwrap_err();
    assert_eq!(err.to_string(), "at position 2, Path ended with open indexer.");
}

#[test]
fn display() {
    #[track_caller]
    fn test(s: &str, display: &str) {
        let path = JsonPath::from_str(s).unwrap();
        assert_eq!(path.to_string(), display);
        // the canonical text parses back to the same path
        assert_eq!(JsonPath::from_str(display).unwrap(), path);
    }

    test("", "$");
    test("a.b", "$.a.b");
    test("$.a[0]['b c']..d[?(@.x > 1)]", "$.a[0]['b c']..d[?(@.x > 1)]");
    test("$['a.b']", "$['a.b']");
    test("$['*']", "$['*']");
    test("$.*", "$.*");
    test("$..*", "$..*");
    test("$..['a b']", "$..['a b']");
    test(r"$['it\'s']", r"$['it\'s']");
    test("$[ 1 , 2 ]", "$[1,2]");
    test("$[1:]", "$[1:]");
    test("$[:-1]", "$[:-1]");
    test("$[::-1]", "$[::-1]");
    test("$['a','b']", "$['a','b']");
    test("$[?(@.a)]", "$[?(@.a)]");
    test(r#"$[?(@.a=="x")]"#, "$[?(@.a == 'x')]");
    test("$[?(@.a<>1.0)]", "$[?(@.a != 1.0)]");
    test("$[?(@ >= $.min)]", "$[?(@ >= $.min)]");
    test("$..[?(@.a && @.b || @.c)]", "$..[?(@.a && @.b || @.c)]");
    test(
        r"$[?(@.PackageId =~ /^Newtonsoft\.(.*)$/)]",
        r"$[?(@.PackageId =~ /^Newtonsoft\.(.*)$/)]",
    );
    test(r"$[?(@.p =~ /a\/b/i)]", r"$[?(@.p =~ /a\/b/i)]");
    // unknown flag letters are dropped
    test("$[?(@.p =~ /a/gi)]", "$[?(@.p =~ /a/i)]");
    // names with operator characters stay quoted inside queries
    test("$[?(@['a=b'] == 1)]", "$[?(@['a=b'] == 1)]");
    test("$[?(@['a&&b'])]", "$[?(@['a&&b'])]");
    test("$[?(@['x<y'] > $['p|q'])]", "$[?(@['x<y'] > $['p|q'])]");
    test("$..['!x']", "$..['!x']");
}

#[track_caller]
fn select(json: &str, path: &str) -> Vec<serde_json::Value> {
    let doc = Document::from_json_str(json).unwrap();
    let nodes = select_tokens(doc.root(), path, false).unwrap();
    nodes.into_iter().map(|node| node.to_json()).collect()
}

#[track_caller]
fn select_err(json: &str, path: &str) -> String {
    let doc = Document::from_json_str(json).unwrap();
    select_tokens(doc.root(), path, true).unwrap_err().to_string()
}

#[test]
fn index() {
    let json = "[10, 20, 30]";
    assert_eq!(select(json, "$[1]"), [json!(20)]);
    assert_eq!(select(json, "[2]"), [json!(30)]);
    assert_eq!(select(json, "$[2,0,2]"), [json!(30), json!(10), json!(30)]);
    assert_eq!(select(json, "$[*]"), [json!(10), json!(20), json!(30)]);
    assert_eq!(select(json, "$[3]"), Vec::<serde_json::Value>::new());
    assert_eq!(select(json, "$[-1]"), Vec::<serde_json::Value>::new());
    assert_eq!(select(json, "$[1,5]"), [json!(20)]);

    assert_eq!(select_err(json, "$[3]"), "Index 3 outside the bounds of array.");
    assert_eq!(select_err(json, "$[-1]"), "Index -1 outside the bounds of array.");
    assert_eq!(select_err(json, "$[0,5]"), "Index 5 outside the bounds of array.");
    assert_eq!(
        select_err(r#"{"a": [1]}"#, "$.a[3]"),
        "Index 3 outside the bounds of array. Path 'a'."
    );
    assert_eq!(select_err(r#"{"a": 1}"#, "$[0]"), "Index 0 not valid on object.");
    assert_eq!(select_err(r#"{"a": 1}"#, "$[*]"), "Index * not valid on object.");
}

#[test]
fn slice() {
    let json = "[1, 2, 3, 4, 5]";
    let all = [json!(1), json!(2), json!(3), json!(4), json!(5)];
    assert_eq!(select(json, "$[0:5]"), all);
    assert_eq!(select(json, "$[:]"), all);
    assert_eq!(select(json, "$[-10:10]"), all);
    assert_eq!(select(json, "$[1:3]"), [json!(2), json!(3)]);
    assert_eq!(select(json, "$[-2:]"), [json!(4), json!(5)]);
    assert_eq!(select(json, "$[:-3]"), [json!(1), json!(2)]);
    assert_eq!(select(json, "$[::2]"), [json!(1), json!(3), json!(5)]);
    assert_eq!(
        select(json, "$[::-1]"),
        [json!(5), json!(4), json!(3), json!(2), json!(1)]
    );
    assert_eq!(select(json, "$[3:0:-2]"), [json!(4), json!(2)]);
    assert_eq!(select(json, "$[3:1]"), Vec::<serde_json::Value>::new());

    assert_eq!(
        select_err(json, "$[3:1]"),
        "Array slice of 3 to 1 returned no results."
    );
    assert_eq!(
        select_err(json, "$[10:]"),
        "Array slice of 10 to * returned no results."
    );
    assert_eq!(
        select_err(r#"{"a": 1}"#, "$[0:1]"),
        "Array slice is not valid on object."
    );
}

#[test]
fn zero_step() {
    let doc = Document::from_json_str("[1, 2, 3, 4, 5]").unwrap();
    for error_when_no_match in [false, true] {
        let err = select_tokens(doc.root(), "$[0:5:0]", error_when_no_match).unwrap_err();
        assert_eq!(err, Error::Eval(EvalError::ZeroStep));
        assert_eq!(err.to_string(), "Step cannot be zero.");
    }
}

#[test]
fn field() {
    let json = r#"{"b": 1, "a": 2, "c": {"d": 3}}"#;
    assert_eq!(select(json, "$.a"), [json!(2)]);
    assert_eq!(select(json, "$.c.d"), [json!(3)]);
    assert_eq!(select(json, "$['c']['d']"), [json!(3)]);
    assert_eq!(select(json, "$.*"), [json!(1), json!(2), json!({"d": 3})]);
    assert_eq!(select(json, "$.x"), Vec::<serde_json::Value>::new());
    assert_eq!(select(json, "$.A"), Vec::<serde_json::Value>::new());

    assert_eq!(
        select_err(json, "$.x"),
        "Property 'x' does not exist on object."
    );
    assert_eq!(
        select_err(json, "$.c.x"),
        "Property 'x' does not exist on object. Path 'c'."
    );
    assert_eq!(select_err("[1]", "$.a"), "Property 'a' not valid on array.");
    assert_eq!(select_err("[1]", "$.*"), "Property '*' not valid on array.");
    assert_eq!(
        select_err(r#"{"a": "s"}"#, "$.a.b"),
        "Property 'b' not valid on value. Path 'a'."
    );
}

#[test]
fn field_multiple() {
    let json = r#"{"a": 1, "b": 2, "c": 3}"#;
    assert_eq!(select(json, "$['a','b']"), [json!(1), json!(2)]);
    assert_eq!(select(json, "$['c','a']"), [json!(3), json!(1)]);

    // missing names are skipped even when no match is an error
    let doc = Document::from_json_str(json).unwrap();
    let nodes = select_tokens(doc.root(), "$['a','x']", true).unwrap();
    assert_eq!(nodes.len(), 1);

    assert_eq!(
        select_err("[1]", "$['a','x']"),
        "Properties 'a', 'x' not valid on array."
    );
}

#[test]
fn scan() {
    let json = r#"{
        "name": "root",
        "x": {"y": {"z": {"name": "deep"}}},
        "list": [{"name": "item", "other": 1}]
    }"#;
    assert_eq!(
        select(json, "$..name"),
        [json!("root"), json!("deep"), json!("item")]
    );
    assert_eq!(
        select(json, "$..['other','name']"),
        [json!("root"), json!("deep"), json!("item"), json!(1)]
    );
    assert_eq!(select(json, "$.list..name"), [json!("item")]);
    assert_eq!(select(json, "$..missing"), Vec::<serde_json::Value>::new());

    assert_eq!(
        select(r#"{"a": [1]}"#, "$..*"),
        [json!({"a": [1]}), json!([1]), json!(1)]
    );
}

#[test]
fn query() {
    let json = r#"[{"a": 1}, {"a": 2}, {"b": 3}]"#;
    assert_eq!(select(json, "$[?(@.a > 1)]"), [json!({"a": 2})]);
    assert_eq!(select(json, "$[?(@.a)]"), [json!({"a": 1}), json!({"a": 2})]);
    assert_eq!(select(json, "$[?(@.a == 1)].a"), [json!(1)]);
    assert_eq!(select(json, "$[?(@.a != 1)]"), [json!({"a": 2})]);
    assert_eq!(
        select(json, "$[?(@.a == 1 || @.b)]"),
        [json!({"a": 1}), json!({"b": 3})]
    );
    assert_eq!(select(json, "$[?(@.a && @.b)]"), Vec::<serde_json::Value>::new());

    // the values of an object are tested
    assert_eq!(
        select(r#"{"x": {"a": 1}, "y": {"a": 5}}"#, "$[?(@.a > 2)]"),
        [json!({"a": 5})]
    );
    // `$` refers to the document root
    assert_eq!(
        select(r#"{"limit": 2, "items": [1, 2, 3]}"#, "$.items[?(@ >= $.limit)]"),
        [json!(2), json!(3)]
    );
}

#[test]
fn query_scan() {
    let json = r#"{"a": {"b": 1}, "c": [{"b": 2}, {"d": 3}]}"#;
    assert_eq!(
        select(json, "$..[?(@.b)]"),
        [json!({"b": 1}), json!({"b": 2})]
    );
    assert_eq!(select(json, "$..[?(@ == 3)]"), [json!(3)]);
}

#[test]
fn query_existential() {
    let json = r#"[{"a": [1, 5]}, {"a": [2]}, {"a": []}]"#;
    assert_eq!(select(json, "$[?(@.a[*] > 4)]"), [json!({"a": [1, 5]})]);
    assert_eq!(select(json, "$[?(@.a[*] == 2)]"), [json!({"a": [2]})]);
    // any pair of different values satisfies `!=`
    assert_eq!(
        select(json, "$[?(@.a[*] != 1)]"),
        [json!({"a": [1, 5]}), json!({"a": [2]})]
    );
}

#[test]
fn query_equality() {
    let json = r#"[{"v": true}, {"v": "true"}, {"v": 1}, {"v": 1.0}, {"v": null}]"#;
    assert_eq!(select(json, "$[?(@.v === true)]"), [json!({"v": true})]);
    assert_eq!(select(json, "$[?(@.v == true)]"), [json!({"v": true})]);
    assert_eq!(select(json, r#"$[?(@.v == "true")]"#), [json!({"v": "true"})]);
    assert_eq!(select(json, "$[?(@.v == 'true')]"), [json!({"v": "true"})]);
    assert_eq!(
        select(json, "$[?(@.v == 1)]"),
        [json!({"v": 1}), json!({"v": 1.0})]
    );
    assert_eq!(
        select(json, "$[?(@.v === 1.0)]"),
        [json!({"v": 1}), json!({"v": 1.0})]
    );
    assert_eq!(select(json, "$[?(@.v == null)]"), [json!({"v": null})]);
    assert_eq!(select(json, "$[?(@.v > 0.5)]"), [json!({"v": 1}), json!({"v": 1.0})]);
    // strings and numbers never order against each other
    assert_eq!(
        select(r#"[{"v": 1}, {"v": "2"}]"#, "$[?(@.v < '3')]"),
        [json!({"v": "2"})]
    );
}

#[test]
fn query_containers() {
    let json = r#"[{"a": [1]}, {"a": 1}, {"a": {"b": 1}}]"#;
    // containers only ever satisfy `!=`
    assert_eq!(
        select(json, "$[?(@.a != 1)]"),
        [json!({"a": [1]}), json!({"a": {"b": 1}})]
    );
    assert_eq!(select(json, "$[?(@.a !== 2)]"), [json!({"a": 1})]);
    assert_eq!(select(json, "$[?(@.a == 1)]"), [json!({"a": 1})]);
    assert_eq!(select(json, "$[?(@.a > 0)]"), [json!({"a": 1})]);
}

#[test]
fn query_regex() {
    let json = r#"[
        {"PackageId": "Newtonsoft.Json"},
        {"PackageId": "Other.Json"},
        {"PackageId": "Newtonsoft.Json.Bson"},
        {"PackageId": 1}
    ]"#;
    assert_eq!(
        select(json, r"$[?(@.PackageId =~ /^Newtonsoft\.(.*)$/)].PackageId"),
        [json!("Newtonsoft.Json"), json!("Newtonsoft.Json.Bson")]
    );
    assert_eq!(
        select(json, r"$[?(@.PackageId =~ /^newtonsoft\.json$/i)].PackageId"),
        [json!("Newtonsoft.Json")]
    );

    // a pattern can come from the document
    assert_eq!(
        select(
            r#"{"pattern": "/^a/i", "items": ["Apple", "banana", "avocado"]}"#,
            "$.items[?(@ =~ $.pattern)]"
        ),
        [json!("Apple"), json!("avocado")]
    );
    // a document string that is not a pattern never matches
    assert_eq!(
        select(
            r#"{"pattern": "^a", "items": ["apple"]}"#,
            "$.items[?(@ =~ $.pattern)]"
        ),
        Vec::<serde_json::Value>::new()
    );

    let doc = Document::from_json_str(r#"["a"]"#).unwrap();
    let err = select_tokens(doc.root(), "$[?(@ =~ /(/)]", false).unwrap_err();
    assert!(
        matches!(err, Error::Eval(EvalError::InvalidRegex { .. })),
        "{err:?}"
    );
}

#[test]
fn select_single() {
    let doc = Document::from_json_str(r#"{"a": [1, 2]}"#).unwrap();
    let root = doc.root();

    let node = select_token(root, "$.a[1]", false).unwrap().unwrap();
    assert_eq!(node.to_json(), json!(2));

    assert_eq!(select_token(root, "$.missing", false), Ok(None));
    let err = select_token(root, "$.missing", true).unwrap_err();
    assert_eq!(err.to_string(), "Property 'missing' does not exist on object.");

    let err = select_token(root, "$.a[*]", false).unwrap_err();
    assert_eq!(err, Error::Eval(EvalError::MultipleTokens));
    assert_eq!(err.to_string(), "Path returned multiple tokens.");

    let err = select_token(root, "$.a[", false).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");

    // methods on nodes start from that node
    let a = root.get("a").unwrap();
    assert_eq!(a.select_tokens("$[0]", false).unwrap()[0].to_json(), json!(1));
    assert_eq!(a.select_token("[1]", false).unwrap().unwrap().to_json(), json!(2));
}

#[test]
fn combinators() {
    let doc = Document::from_json_str(r#"{"a": [5, 6], "b": 2}"#).unwrap();

    let path = JsonPath::from_filters(vec![Filter::And(vec![
        Filter::Field(Some("a".into())),
        Filter::ArrayIndex(Some(1)),
    ])]);
    let nodes = path.query(doc.root()).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].to_json(), json!(6));
    // combinators have no path syntax
    assert_eq!(path.to_string(), "$and(@.a, @[1])");
    assert!(JsonPath::from_str(&path.to_string()).is_err());

    // the first occurrence of each node wins
    let path = JsonPath::from_filters(vec![Filter::Or(vec![
        Filter::Field(Some("b".into())),
        Filter::Scan(None),
        Filter::Field(Some("b".into())),
    ])]);
    let nodes: Vec<_> = path
        .query(doc.root())
        .unwrap()
        .into_iter()
        .map(|node| node.to_json())
        .collect();
    assert_eq!(
        nodes,
        [
            json!(2),
            json!({"a": [5, 6], "b": 2}),
            json!([5, 6]),
            json!(5),
            json!(6),
        ]
    );
}

#[test]
fn idempotent() {
    let doc = Document::from_json_str(r#"{"a": [{"b": 1}, {"b": 2}], "b": 3}"#).unwrap();
    let path = JsonPath::new("$..b").unwrap();
    let first = path.query(doc.root()).unwrap();
    let second: Vec<_> = path
        .evaluate(doc.root(), false)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}
