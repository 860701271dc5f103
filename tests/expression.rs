//! Tests for expression parsing and symbolic typing.
use jdm_graph::error::ExpressionError;
use jdm_graph::expression::{BinaryOp, Expression, MAX_EXPRESSION_DEPTH, calculate_type, parse};
use jdm_graph::prelude::*;

fn order_shape() -> TypeShape {
    TypeShape::object([
        ("price", TypeShape::number()),
        ("quantity", TypeShape::number()),
        ("name", TypeShape::string()),
        ("discount", TypeShape::union([TypeShape::number(), TypeShape::null()])),
        ("flag", TypeShape::bool()),
        (
            "customer",
            TypeShape::object([("name", TypeShape::string()), ("age", TypeShape::number())]),
        ),
        (
            "items",
            TypeShape::array(TypeShape::object([
                ("sku", TypeShape::string()),
                ("price", TypeShape::number()),
            ])),
        ),
        ("tags", TypeShape::object([("x y", TypeShape::bool())])),
    ])
}

fn type_of(source: &str) -> TypeShape {
    calculate_type(&order_shape(), source)
        .unwrap_or_else(|e| panic!("'{}' should type-check: {}", source, e))
}

// --- Parsing ---

#[test]
fn test_display_keeps_only_needed_parentheses() {
    assert_eq!(parse("(a + b) * c").unwrap().to_string(), "(a + b) * c");
    assert_eq!(parse("a + (b * c)").unwrap().to_string(), "a + b * c");
    assert_eq!(parse("a - b - c").unwrap().to_string(), "a - b - c");
    assert_eq!(parse("a - (b - c)").unwrap().to_string(), "a - (b - c)");
    assert_eq!(parse("not (a and b)").unwrap().to_string(), "not (a and b)");
}

#[test]
fn test_power_is_right_associative() {
    let Expression::Binary(BinaryOp::Power, left, right) = parse("2 ^ 3 ^ 2").unwrap() else {
        panic!("expected a power expression");
    };
    assert!(matches!(*left, Expression::Literal(_)));
    assert!(matches!(*right, Expression::Binary(BinaryOp::Power, _, _)));

    assert_eq!(parse("2 ^ 3 ^ 2").unwrap().to_string(), "2 ^ 3 ^ 2");
    assert_eq!(parse("(2 ^ 3) ^ 2").unwrap().to_string(), "(2 ^ 3) ^ 2");
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let Expression::Binary(BinaryOp::Add, _, right) = parse("a + b * c").unwrap() else {
        panic!("expected an addition at the root");
    };
    assert!(matches!(*right, Expression::Binary(BinaryOp::Multiply, _, _)));
}

#[test]
fn test_not_in_spans_two_words() {
    let expression = parse("sku not in ['a', 'b']").unwrap();
    assert!(matches!(expression, Expression::Binary(BinaryOp::NotIn, _, _)));
    assert_eq!(expression.to_string(), "sku not in [\"a\", \"b\"]");
}

#[test]
fn test_member_and_index_chains() {
    let expression = parse("items[0].price").unwrap();
    let Expression::Member(target, name) = expression else {
        panic!("expected a member access");
    };
    assert_eq!(name, "price");
    assert!(matches!(*target, Expression::Index(_, _)));
}

#[test]
fn test_parse_errors() {
    assert_eq!(
        parse("1 +"),
        Err(ExpressionError::UnexpectedEnd("an operand".to_string()))
    );
    assert_eq!(
        parse("a @ b"),
        Err(ExpressionError::UnexpectedCharacter {
            character: '@',
            offset: 2
        })
    );
    assert!(matches!(
        parse("1 2"),
        Err(ExpressionError::UnexpectedToken { offset: 2, .. })
    ));
    assert!(matches!(parse("'open"), Err(ExpressionError::UnexpectedEnd(_))));
    assert!(matches!(parse("{a 1}"), Err(ExpressionError::UnexpectedToken { .. })));
}

#[test]
fn test_nesting_is_depth_capped() {
    let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(
        parse(&nested),
        Err(ExpressionError::DepthExceeded(MAX_EXPRESSION_DEPTH))
    );

    let chained = vec!["a"; 200].join(" + ");
    assert_eq!(
        parse(&chained),
        Err(ExpressionError::DepthExceeded(MAX_EXPRESSION_DEPTH))
    );

    let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    assert!(parse(&shallow).is_ok());
}

// --- Typing ---

#[test]
fn test_arithmetic_and_string_concatenation() {
    assert_eq!(type_of("price * quantity"), TypeShape::number());
    assert_eq!(type_of("-price + 1.5"), TypeShape::number());
    assert_eq!(type_of("name + '!'"), TypeShape::string());
    assert_eq!(type_of("1 + 'a'"), TypeShape::string());
    assert_eq!(type_of("discount * 2"), TypeShape::number());
}

#[test]
fn test_unknown_variables_type_as_any() {
    assert_eq!(type_of("missing"), TypeShape::Any);
    assert_eq!(type_of("missing * 2"), TypeShape::Any);
    assert_eq!(type_of("customer.missing.deeper"), TypeShape::Any);
}

#[test]
fn test_comparisons_and_logic_are_boolean() {
    for source in [
        "price > 10",
        "name == 'x'",
        "price >= 1 and quantity < 3",
        "flag or false",
        "!flag",
        "not flag",
        "sku in ['a']",
        "sku not in ['a']",
    ] {
        assert_eq!(type_of(source), TypeShape::bool(), "{}", source);
    }
}

#[test]
fn test_member_and_index_access() {
    assert_eq!(type_of("customer.name"), TypeShape::string());
    assert_eq!(type_of("items[0].price"), TypeShape::number());
    assert_eq!(type_of("items[1]").to_string(), "{ price: number; sku: string }");
    assert_eq!(type_of("tags[\"x y\"]"), TypeShape::bool());
    assert_eq!(type_of("name[0]"), TypeShape::string());
}

#[test]
fn test_ternary_yields_union_of_branches() {
    assert_eq!(
        type_of("price > 10 ? 'big' : 0"),
        TypeShape::union([TypeShape::string(), TypeShape::number()])
    );
    assert_eq!(type_of("flag ? 1 : 2"), TypeShape::number());
}

#[test]
fn test_coalesce_strips_null() {
    assert_eq!(type_of("discount ?? 0"), TypeShape::number());
    assert_eq!(
        type_of("discount ?? 'none'"),
        TypeShape::union([TypeShape::number(), TypeShape::string()])
    );
}

#[test]
fn test_literals() {
    assert_eq!(type_of("null"), TypeShape::null());
    assert_eq!(type_of("true"), TypeShape::bool());
    assert_eq!(
        type_of("[1, 'a']"),
        TypeShape::array(TypeShape::union([TypeShape::number(), TypeShape::string()]))
    );
    assert_eq!(
        type_of("{ total: price * quantity, label: 'x' }"),
        TypeShape::object([("label", TypeShape::string()), ("total", TypeShape::number())])
    );
}

#[test]
fn test_closures_bind_the_item_shape() {
    assert_eq!(type_of("map(items, #.price)"), TypeShape::array(TypeShape::number()));
    assert_eq!(type_of("filter(items, #.price > 10)"), order_shape().get("items"));
    assert_eq!(type_of("some(items, #.sku == 'a')"), TypeShape::bool());
    assert_eq!(type_of("count(items, #.price > 1)"), TypeShape::number());
    assert_eq!(
        type_of("map(items, { sku: #.sku })"),
        TypeShape::array(TypeShape::object([("sku", TypeShape::string())]))
    );
}

#[test]
fn test_builtin_functions() {
    assert_eq!(type_of("len(items)"), TypeShape::number());
    assert_eq!(type_of("sum(map(items, #.price))"), TypeShape::number());
    assert_eq!(type_of("upper(name)"), TypeShape::string());
    assert_eq!(type_of("contains(name, 'a')"), TypeShape::bool());
    assert_eq!(type_of("keys(customer)"), TypeShape::array(TypeShape::string()));
    assert_eq!(
        type_of("values(customer)"),
        TypeShape::array(TypeShape::union([TypeShape::number(), TypeShape::string()]))
    );
    assert_eq!(type_of("date('2024-01-01')"), TypeShape::date());
    assert_eq!(type_of("date() - date('2024-01-01')"), TypeShape::number());
    assert_eq!(type_of("round(price, 2)"), TypeShape::number());
}

#[test]
fn test_earlier_rows_are_reachable_through_dollar() {
    let root = TypeShape::object([("$", TypeShape::object([("total", TypeShape::number())]))]);
    assert_eq!(calculate_type(&root, "$.total * 2"), Ok(TypeShape::number()));
}

#[test]
fn test_typing_errors() {
    assert_eq!(
        calculate_type(&order_shape(), "foo(1)"),
        Err(ExpressionError::UnknownFunction("foo".to_string()))
    );
    assert_eq!(
        calculate_type(&order_shape(), "len(items, name)"),
        Err(ExpressionError::ArgumentCount {
            name: "len".to_string(),
            expected: 1,
            found: 2
        })
    );
    assert_eq!(
        calculate_type(&order_shape(), "name * 2"),
        Err(ExpressionError::InvalidOperand {
            operator: "*".to_string(),
            found: "string".to_string()
        })
    );
    assert!(matches!(
        calculate_type(&order_shape(), "-customer"),
        Err(ExpressionError::InvalidOperand { .. })
    ));
}

#[test]
fn test_shape_calculate_type_recovers_to_any() {
    let shape = order_shape();
    assert_eq!(shape.calculate_type("price *"), TypeShape::Any);
    assert_eq!(shape.calculate_type("nope(1)"), TypeShape::Any);
    assert_eq!(shape.calculate_type("price * 2"), TypeShape::number());
    assert!(shape.try_calculate_type("price *").is_err());
}
