use kshell::display::DisplayValue;

#[test]
fn listing_renders_one_item_per_line() {
    let value = DisplayValue::Listing(vec!["ids".to_string(), "topics".to_string()]);
    assert_eq!(value.render(), "ids\ntopics");
}

#[test]
fn json_renders_pretty_printed() {
    let value = DisplayValue::Json(serde_json::json!({"host": "b1", "port": 9092}));
    let rendered = value.render();
    assert!(rendered.contains("\"host\""));
    assert!(rendered.contains("9092"));
}
