use archivio_core::{
    ExternalId, ExternalIdBundle, InfoSearchRequest, ObjectId, Paging, PagingRequest,
    TimeSeriesInfo, UniqueId, glob_matches,
};

fn info(name: &str, source: &str) -> TimeSeriesInfo {
    TimeSeriesInfo {
        unique_id: Some(UniqueId::versioned(ObjectId::new("MemTs", "1"), 1)),
        external_ids: ExternalIdBundle::of([ExternalId::new("TICKER", "AAPL")]),
        data_source: source.to_owned(),
        data_provider: "CMPL".to_owned(),
        data_field: "PX_LAST".to_owned(),
        observation_time: "LONDON_CLOSE".to_owned(),
        name: name.to_owned(),
    }
}

#[test]
fn unset_criteria_match_everything() {
    let req = InfoSearchRequest::default();
    assert!(req.matches(&info("Apple Inc", "BLOOMBERG")));
}

#[test]
fn criteria_are_conjunctive() {
    let req = InfoSearchRequest {
        data_source: Some("BLOOMBERG".to_owned()),
        data_field: Some("PX_LAST".to_owned()),
        ..Default::default()
    };
    assert!(req.matches(&info("Apple Inc", "BLOOMBERG")));
    assert!(!req.matches(&info("Apple Inc", "REUTERS")));
}

#[test]
fn name_glob_is_case_insensitive() {
    let req = InfoSearchRequest {
        name: Some("apple*".to_owned()),
        ..Default::default()
    };
    assert!(req.matches(&info("Apple Inc", "BLOOMBERG")));
    assert!(!req.matches(&info("Microsoft Corp", "BLOOMBERG")));
}

#[test]
fn object_id_filter_rejects_unsaved_records() {
    let req = InfoSearchRequest {
        object_ids: Some(vec![ObjectId::new("MemTs", "1")]),
        ..Default::default()
    };
    assert!(req.matches(&info("Apple Inc", "BLOOMBERG")));

    let unsaved = TimeSeriesInfo {
        unique_id: None,
        ..info("Apple Inc", "BLOOMBERG")
    };
    assert!(!req.matches(&unsaved));
}

#[test]
fn glob_wildcards() {
    assert!(glob_matches("*", ""));
    assert!(glob_matches("*", "anything"));
    assert!(glob_matches("a?c", "abc"));
    assert!(!glob_matches("a?c", "ac"));
    assert!(glob_matches("*close*", "London Close Px"));
    assert!(!glob_matches("close", "London Close Px"));
    assert!(glob_matches("**x", "x"));
}

#[test]
fn star_heavy_globs_match_in_linear_time() {
    let name = "a".repeat(64);
    assert!(glob_matches("*a*a*a*a*a*a*a*a*a*a*a*a*a*a*a*a", &name));
    assert!(!glob_matches("*a*a*a*a*a*a*a*a*a*a*a*a*a*a*a*b", &name));
}

#[test]
fn paging_request_selects_a_window() {
    let items: Vec<u32> = (0..10).collect();
    assert_eq!(PagingRequest::of_index(3, 4).select(items.clone()), vec![3, 4, 5, 6]);
    assert_eq!(PagingRequest::of_index(8, 5).select(items.clone()), vec![8, 9]);
    assert!(PagingRequest::NONE.select(items.clone()).is_empty());
    assert_eq!(PagingRequest::ALL.select(items.clone()).len(), 10);
    assert_eq!(PagingRequest::default().select(items).len(), 10);
}

#[test]
fn paging_has_more_and_reduce_total() {
    let mut paging = Paging::of(PagingRequest::of_size(20), 45);
    assert!(paging.has_more());
    paging.reduce_total(30);
    assert_eq!(paging.total(), 15);
    assert!(!paging.has_more());
    paging.reduce_total(100);
    assert_eq!(paging.total(), 0);
}
