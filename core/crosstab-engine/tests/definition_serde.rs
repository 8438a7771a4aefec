use crosstab_engine::{
    BucketSpec, CalculationKind, CellDefinition, CrosstabDefinition, GroupSpec, MeasureSpec,
    NullOrder, PercentageMode, SortOrder, TotalLevel, TotalPosition, ValueKind,
};

fn create_test_definition() -> CrosstabDefinition {
    let mut def = CrosstabDefinition::new();
    def.name = Some("orders".to_string());

    let mut month = BucketSpec::new("month_name", ValueKind::Text);
    month.order_key = Some(crosstab_engine::ValueProducer::new("month_number"));
    month.null_order = NullOrder::Last;
    let mut month_group = GroupSpec::new("Month", month);
    month_group.total_position = TotalPosition::Start;
    month_group.total_header = Some("all months".to_string());

    def.row_groups.push(month_group);
    def.column_groups.push(GroupSpec::new("Channel", BucketSpec::new("channel", ValueKind::Text)));

    let mut revenue = MeasureSpec::new("Revenue", "revenue", ValueKind::Number, CalculationKind::Sum);
    revenue.percentage_mode = PercentageMode::GrandTotal;
    def.measures.push(revenue);
    def.measures.push(MeasureSpec::new("Spread", "revenue", ValueKind::Number, CalculationKind::StandardDeviation));

    def.cells.set(TotalLevel::Base, TotalLevel::Base, CellDefinition::new("revenue", 70, 18));
    def.cells.set(TotalLevel::Total(0), TotalLevel::Total(0), CellDefinition::new("grand", 70, 22));
    def
}

#[test]
fn test_definition_round_trips_through_json() {
    let def = create_test_definition();
    let json = serde_json::to_string_pretty(&def).unwrap();
    let loaded: CrosstabDefinition = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, def);
    assert_eq!(loaded.validate(), Ok(()));
}

#[test]
fn test_minimal_json_fills_defaults() {
    let json = r#"{
        "row_groups": [
            { "name": "Country", "bucket": { "expression": "country", "value_kind": "Text" } }
        ],
        "column_groups": [],
        "measures": [
            { "name": "Amount", "expression": "amount", "value_kind": "Integer" }
        ],
        "cells": {
            "entries": [
                { "row": "Base", "column": "Base", "definition": { "content": "amount", "width": 50, "height": 20 } }
            ]
        }
    }"#;

    let def: CrosstabDefinition = serde_json::from_str(json).unwrap();
    let group = &def.row_groups[0];
    assert!(group.has_total);
    assert!(group.merge_header_cells);
    assert_eq!(group.total_position, TotalPosition::End);
    assert_eq!(group.bucket.order, SortOrder::Ascending);
    assert_eq!(group.bucket.null_order, NullOrder::First);
    assert_eq!(def.measures[0].calculation, CalculationKind::Sum);
    assert_eq!(def.measures[0].percentage_mode, PercentageMode::None);
    assert_eq!(def.name, None);
    assert_eq!(def.validate(), Ok(()));
}
