use fundpilot_api::types::{DataInterval, Fund, FundType, MarketIndex, Trend};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn deserialize_funds() {
    let funds: Vec<Fund> = serde_json::from_str(&load_fixture("funds.json")).unwrap();
    assert_eq!(funds.len(), 2);
    assert_eq!(funds[0].fund_type, FundType::Stock);
    assert_eq!(funds[1].fund_type, FundType::Index);
    assert!(funds[1].daily_change < 0.0);
}

#[test]
fn fund_serializes_camel_case_with_type_key() {
    let funds: Vec<Fund> = serde_json::from_str(&load_fixture("funds.json")).unwrap();
    let value = serde_json::to_value(&funds[0]).unwrap();
    assert_eq!(value["type"], "stock");
    assert!(value.get("dailyChangePercent").is_some());
    assert!(value.get("fund_type").is_none());
}

#[test]
fn market_index_trend() {
    let index: MarketIndex = serde_json::from_value(serde_json::json!({
        "name": "上证指数",
        "code": "000001.SH",
        "value": 3021.5,
        "change": -12.3,
        "changePercent": -0.41,
        "trend": "down"
    }))
    .unwrap();
    assert_eq!(index.trend, Trend::Down);
    assert_eq!(Trend::from_change(index.change), Trend::Down);
    assert_eq!(Trend::from_change(0.0), Trend::Neutral);
}

#[test]
fn interval_wire_names() {
    assert_eq!(serde_json::to_value(DataInterval::Daily).unwrap(), "1d");
    assert_eq!(serde_json::to_value(DataInterval::Monthly).unwrap(), "1m");
}
