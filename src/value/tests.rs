use super::value::{Symbol, Value, ValueType};

#[test]
fn test_tags_are_fixed() {
    assert_eq!(ValueType::Undefined.tag(), 0);
    assert_eq!(ValueType::List.tag(), 1);
    assert_eq!(ValueType::Integer.tag(), 2);
    assert_eq!(ValueType::Double.tag(), 3);
    assert_eq!(ValueType::String.tag(), 4);
    assert_eq!(ValueType::Symbol.tag(), 5);
    assert_eq!(ValueType::Blob.tag(), 6);
}

#[test]
fn test_from_tag_rejects_out_of_range() {
    assert_eq!(ValueType::from_tag(0), None);
    assert_eq!(ValueType::from_tag(7), None);
    assert_eq!(ValueType::from_tag(255), None);

    for tag in 1..=6u8 {
        assert_eq!(ValueType::from_tag(tag).map(ValueType::tag), Some(tag));
    }
}

#[test]
fn test_value_type_of_values() {
    assert_eq!(Value::from(1i64).value_type(), ValueType::Integer);
    assert_eq!(Value::from(1.0).value_type(), ValueType::Double);
    assert_eq!(Value::from("a").value_type(), ValueType::String);
    assert_eq!(Value::sym("a").value_type(), ValueType::Symbol);
    assert_eq!(Value::from(vec![1u8]).value_type(), ValueType::Blob);
    assert_eq!(Value::List(vec![]).value_type(), ValueType::List);
}

#[test]
fn test_integer_and_double_are_distinct() {
    assert_ne!(Value::Integer(2), Value::Double(2.0));
}

#[test]
fn test_symbol_validity() {
    assert!(Symbol::new("-foo").is_valid());
    assert!(Symbol::new("").is_valid());
    assert!(!Symbol::new("a b").is_valid());
    assert!(!Symbol::new("tab\there").is_valid());
    assert!(!Symbol::new("nbsp\u{00A0}").is_valid());
}

#[test]
fn test_value_display() {
    let value = Value::List(vec![
        Value::sym("define"),
        Value::Integer(-3),
        Value::Double(2.0),
        Value::Double(0.25),
        Value::from(r#"say "hi" \o/"#),
        Value::Blob(vec![1, 2, 3]),
        Value::List(vec![]),
    ]);

    assert_eq!(
        value.to_string(),
        r#"(define -3 2.0 0.25 "say \"hi\" \\o/" #blob[3] ())"#
    );
}

#[test]
fn test_accessors() {
    let list = Value::List(vec![Value::Integer(1)]);
    assert_eq!(list.as_list().map(<[Value]>::len), Some(1));
    assert_eq!(Value::Integer(7).as_integer(), Some(7));
    assert_eq!(Value::Integer(7).as_double(), None);
    assert_eq!(Value::Double(0.5).as_double(), Some(0.5));
    assert_eq!(Value::sym("x").as_str(), Some("x"));
    assert_eq!(Value::Blob(vec![9]).as_blob(), Some(&[9u8][..]));
}
