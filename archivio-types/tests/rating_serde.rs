use archivio_types::{RatingConfig, RatingField, RatingRuleConfig, WILDCARD};

#[test]
fn rating_config_round_trips_through_json() {
    let cfg = RatingConfig::new(
        "DEFAULT_TSS_CONFIG",
        vec![
            RatingRuleConfig::new(RatingField::DataSource, "BLOOMBERG", 10),
            RatingRuleConfig::new(RatingField::DataSource, WILDCARD, 1),
            RatingRuleConfig::new(RatingField::DataProvider, WILDCARD, 1),
        ],
    );

    let json = serde_json::to_string(&cfg).unwrap();
    let back: RatingConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn rating_field_uses_snake_case_tags() {
    let json = serde_json::to_string(&RatingField::DataProvider).unwrap();
    assert_eq!(json, "\"data_provider\"");
}

#[test]
fn permission_config_defaults_deny_unknown_principals() {
    use archivio_types::{Operation, PermissionConfig};

    let cfg: PermissionConfig = serde_json::from_str(
        r#"{"principals":{"batch":{"operations":["view","update"]}}}"#,
    )
    .unwrap();

    assert!(cfg.allows_operation("batch", Operation::View));
    assert!(!cfg.allows_operation("batch", Operation::Remove));
    assert!(!cfg.allows_operation("stranger", Operation::View));
    assert!(cfg.allows_source("batch", "BLOOMBERG"));
    assert!(!cfg.allows_source("stranger", "BLOOMBERG"));
}
