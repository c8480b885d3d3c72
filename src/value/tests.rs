use rstest::rstest;

use super::*;
use crate::grammar::ParseletId;
use crate::tree::ParseNode;

fn shapes() -> (TypeRegistry, TypeId, TypeId, TypeId, TypeId) {
    let mut types = TypeRegistry::new();
    let shape = types.declare("Shape", None).unwrap();
    let circle = types.declare("Circle", Some(shape)).unwrap();
    let square = types.declare("Square", Some(shape)).unwrap();
    let color = types.declare("Color", None).unwrap();
    (types, shape, circle, square, color)
}

#[test]
fn test_declare_is_idempotent() {
    let (mut types, shape, circle, ..) = shapes();
    assert_eq!(types.declare("Circle", Some(shape)), Ok(circle));
    assert_eq!(types.declare("Circle", None), Ok(circle));
    assert_eq!(types.len(), 4);
}

#[test]
fn test_redeclare_with_other_parent_conflicts() {
    let (mut types, _, circle, _, color) = shapes();
    assert_eq!(types.declare("Circle", Some(color)), Err(circle));
    assert_eq!(types.name(types.parent(circle).unwrap()), "Shape");
}

#[test]
fn test_assignability_follows_lineage() {
    let (types, shape, circle, square, color) = shapes();
    assert!(types.is_assignable(shape, circle));
    assert!(types.is_assignable(circle, circle));
    assert!(!types.is_assignable(circle, shape));
    assert!(!types.is_assignable(square, circle));
    assert!(!types.is_assignable(color, circle));
    assert_eq!(types.lineage(circle).collect::<Vec<_>>(), vec![circle, shape]);
}

#[rstest]
#[case("Circle", "Square", Some("Shape"))]
#[case("Circle", "Shape", Some("Shape"))]
#[case("Circle", "Circle", Some("Circle"))]
#[case("Circle", "Color", None)]
fn test_common_super_type(#[case] a: &str, #[case] b: &str, #[case] expected: Option<&str>) {
    let (types, ..) = shapes();
    let a = types.lookup(a).unwrap();
    let b = types.lookup(b).unwrap();
    let common = types.common_super_type(a, b).map(|t| types.name(t).to_string());
    assert_eq!(common.as_deref(), expected);
}

#[test]
fn test_join() {
    let (types, shape, circle, square, color) = shapes();
    assert_eq!(
        types.join(ValueType::Object(circle), ValueType::Object(square)),
        Ok(ValueType::Object(shape))
    );
    assert_eq!(types.join(ValueType::Any, ValueType::Object(circle)), Ok(ValueType::Any));
    assert_eq!(types.join(ValueType::String, ValueType::String), Ok(ValueType::String));
    assert_eq!(types.join(ValueType::String, ValueType::List), Ok(ValueType::Any));
    assert_eq!(
        types.join(ValueType::Object(circle), ValueType::Object(color)),
        Err((circle, color))
    );
}

#[test]
fn test_accepts() {
    let (types, shape, circle, ..) = shapes();
    assert!(types.accepts(ValueType::Object(shape), ValueType::Object(circle)));
    assert!(!types.accepts(ValueType::Object(circle), ValueType::Object(shape)));
    assert!(types.accepts(ValueType::Any, ValueType::String));
    assert!(types.accepts(ValueType::String, ValueType::Any));
    assert!(!types.accepts(ValueType::String, ValueType::List));
}

#[test]
fn test_structural_equality() {
    let (_, _, circle, ..) = shapes();
    let a = ObjectRef::new(Object::new(Some(circle), Some("Circle".into())));
    let b = ObjectRef::new(Object::new(Some(circle), Some("Circle".into())));
    a.set("r", "1");
    b.set("r", "1");
    assert_eq!(Value::Object(a.clone()), Value::Object(b.clone()));
    assert!(!Value::Object(a.clone()).same_instance(&Value::Object(b.clone())));

    b.set("r", "2");
    assert_ne!(Value::Object(a), Value::Object(b));
    assert_eq!(Value::list([Value::str("x")]), Value::from(vec![Value::from("x")]));
    assert_ne!(Value::Null, Value::str(""));
}

#[test]
fn test_properties_keep_order() {
    let obj = ObjectRef::new(Object::anonymous());
    obj.set("b", "2");
    obj.set("a", "1");
    obj.set("b", "3");
    let keys: Vec<String> = obj.borrow().properties().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(obj.get("b"), Value::str("3"));
    assert_eq!(obj.borrow_mut().remove("b"), Some(Value::str("3")));
    assert!(obj.get("b").is_null());
}

#[test]
fn test_slot_access_and_value_type() {
    let (_, _, circle, ..) = shapes();
    let mut obj = Object::new(Some(circle), Some("Circle".into()));
    obj.set_slot("r", Value::str("5"));
    assert_eq!(obj.get_slot("r"), Value::str("5"));
    assert_eq!(obj.slot_type(), Some(circle));

    let value = Value::Object(ObjectRef::new(obj));
    assert_eq!(value.value_type(), ValueType::Object(circle));
    assert_eq!(value.get("r").as_str(), Some("5"));
    assert_eq!(Value::str("x").get("r"), Value::Null);
    assert_eq!(Value::Object(ObjectRef::new(Object::anonymous())).value_type(), ValueType::Any);
}

#[rstest]
#[case(Value::Null, true)]
#[case(Value::str(""), true)]
#[case(Value::str("a"), false)]
#[case(Value::List(Vec::new()), true)]
#[case(Value::Object(ObjectRef::new(Object::anonymous())), false)]
fn test_is_empty(#[case] value: Value, #[case] expected: bool) {
    assert_eq!(value.is_empty(), expected);
}

#[test]
fn test_parse_node_binding_is_weak() {
    let obj = ObjectRef::new(Object::anonymous());
    let node = ParseNode::parent(ParseletId(0), Vec::new(), Value::Object(obj.clone()));
    assert!(obj.borrow().parse_node().is_some_and(|n| Rc::ptr_eq(&n, &node)));
    drop(node);
    assert!(obj.borrow().parse_node().is_none());
}

#[test]
fn test_debug_format() {
    let obj = ObjectRef::new(Object::new(None, Some("Point".into())));
    obj.set("x", "1");
    assert_eq!(format!("{:?}", Value::Object(obj)), r#"{"@type": "Point", "x": "1"}"#);
    assert_eq!(Value::str("hi").to_string(), "hi");
}
