use kshell::query::decoder;
use kshell::query::parser::{self, Projection};

#[test]
fn parses_full_select_statement() {
    let stmt = parser::parse(
        "select key,value from orders where value contains 'urgent' limit 5 with groupId=g1,delta=3,decoder=json",
    )
    .unwrap();

    assert_eq!(stmt.projection, Projection::Fields(vec!["key".to_string(), "value".to_string()]));
    assert_eq!(stmt.topic, "orders");
    assert_eq!(stmt.limit, Some(5));
    assert_eq!(stmt.restrictions.group_id, Some("g1".to_string()));
    assert_eq!(stmt.restrictions.delta, Some(3));
    assert_eq!(stmt.decoder, Some("json".to_string()));
    assert_eq!(stmt.where_clauses.len(), 1);
    assert_eq!(stmt.where_clauses[0].field, "value");
}

#[test]
fn resolved_decoder_parses_the_json_it_is_asked_to_decode() {
    let stmt = parser::parse("select * from t with decoder=json").unwrap();
    let decoder = decoder::resolve_decoder(stmt.decoder.as_deref().unwrap()).unwrap();
    let value = decoder.decode(br#"{"urgent":true}"#).unwrap();
    assert_eq!(value["urgent"], true);
}

#[test]
fn quoted_literal_with_spaces_is_one_where_clause_value() {
    let stmt = parser::parse("select * from t where value = \"hello world\"").unwrap();
    assert_eq!(stmt.where_clauses[0].literal, "hello world");
}
