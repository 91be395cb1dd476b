use std::collections::HashMap;
use std::sync::Arc;

use archivio_core::{
    ArchivioError, ExternalId, ExternalIdBundle, InfoDocument, InfoHistoryRequest,
    InfoSearchRequest, PagingRequest, PointSeries, SeriesGetRequest, TimeSeriesInfo,
    TimeSeriesMaster, UniqueId,
};
use archivio_mem::InMemoryMaster;
use archivio_middleware::{ConfigPermissionChecker, PermissionedMaster};
use archivio_types::{Operation, PermissionConfig, PrincipalGrants};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn info(name: &str, source: &str) -> TimeSeriesInfo {
    TimeSeriesInfo {
        unique_id: None,
        external_ids: ExternalIdBundle::of([ExternalId::new("TICKER", name)]),
        data_source: source.to_owned(),
        data_provider: "CMPL".to_owned(),
        data_field: "PX_LAST".to_owned(),
        observation_time: "LONDON_CLOSE".to_owned(),
        name: name.to_owned(),
    }
}

fn config_for(operations: Vec<Operation>, denied_sources: Vec<String>) -> PermissionConfig {
    PermissionConfig {
        principals: HashMap::from([(
            "alice".to_owned(),
            PrincipalGrants {
                operations,
                denied_sources,
            },
        )]),
    }
}

fn wrap(inner: Arc<InMemoryMaster>, config: PermissionConfig) -> PermissionedMaster {
    PermissionedMaster::new(
        inner,
        Arc::new(ConfigPermissionChecker::new(config, "alice")),
    )
}

async fn seeded() -> (Arc<InMemoryMaster>, UniqueId, UniqueId) {
    let master = Arc::new(InMemoryMaster::new());
    let open = master
        .add(InfoDocument::new(info("AAPL", "BLOOMBERG")))
        .await
        .unwrap();
    let hidden = master
        .add(InfoDocument::new(info("MSFT", "SECRET")))
        .await
        .unwrap();
    (
        master,
        UniqueId::latest(open.object_id().unwrap().clone()),
        UniqueId::latest(hidden.object_id().unwrap().clone()),
    )
}

#[tokio::test]
async fn denied_operations_fail_fast() {
    let (master, open, _) = seeded().await;
    // No grants at all.
    let guarded = wrap(master, config_for(vec![], vec![]));

    assert!(matches!(
        guarded.get(&open).await,
        Err(ArchivioError::Forbidden(_))
    ));
    assert!(matches!(
        guarded.add(InfoDocument::new(info("GOOG", "BLOOMBERG"))).await,
        Err(ArchivioError::Forbidden(_))
    ));
    assert!(matches!(
        guarded.search(InfoSearchRequest::default()).await,
        Err(ArchivioError::Forbidden(_))
    ));
}

#[tokio::test]
async fn unknown_principal_is_denied_everything() {
    let (master, open, _) = seeded().await;
    let guarded = PermissionedMaster::new(
        master,
        Arc::new(ConfigPermissionChecker::new(
            config_for(vec![Operation::View], vec![]),
            "mallory",
        )),
    );
    assert!(matches!(
        guarded.get(&open).await,
        Err(ArchivioError::Forbidden(_))
    ));
}

#[tokio::test]
async fn denied_record_turns_get_into_forbidden() {
    let (master, open, hidden) = seeded().await;
    let guarded = wrap(
        master,
        config_for(vec![Operation::View], vec!["SECRET".to_owned()]),
    );

    assert!(guarded.get(&open).await.is_ok());
    assert!(matches!(
        guarded.get(&hidden).await,
        Err(ArchivioError::Forbidden(_))
    ));
}

#[tokio::test]
async fn bulk_reads_filter_and_count_withheld_records() {
    let (master, open, hidden) = seeded().await;
    let guarded = wrap(
        master,
        config_for(vec![Operation::View], vec!["SECRET".to_owned()]),
    );

    let bulk = guarded
        .get_bulk(&[open.clone(), hidden])
        .await
        .unwrap();
    assert_eq!(bulk.documents.len(), 1);
    assert!(bulk.documents.contains_key(&open));
    assert_eq!(bulk.unauthorized_count, 1);
}

#[tokio::test]
async fn search_reports_withheld_records() {
    let (master, _, _) = seeded().await;
    let guarded = wrap(
        master,
        config_for(vec![Operation::View], vec!["SECRET".to_owned()]),
    );

    let result = guarded.search(InfoSearchRequest::default()).await.unwrap();
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.unauthorized_count, 1);
    assert_eq!(result.paging.total(), 1);
    assert_eq!(result.documents[0].info.data_source, "BLOOMBERG");
}

#[tokio::test]
async fn history_of_a_hidden_record_comes_back_empty() {
    let (master, _, hidden) = seeded().await;
    let guarded = wrap(
        master,
        config_for(vec![Operation::View], vec!["SECRET".to_owned()]),
    );

    let result = guarded
        .history(InfoHistoryRequest {
            object_id: hidden.object_id().clone(),
            paging: PagingRequest::ALL,
        })
        .await
        .unwrap();
    assert!(result.documents.is_empty());
    assert_eq!(result.unauthorized_count, 1);
    assert_eq!(result.paging.total(), 0);
}

#[tokio::test]
async fn point_writes_need_both_levels() {
    let (master, open, hidden) = seeded().await;
    let guarded = wrap(
        master,
        config_for(
            vec![Operation::View, Operation::Update],
            vec!["SECRET".to_owned()],
        ),
    );
    let series =
        PointSeries::from_points([(d(2024, 1, 1), 10.0)]).unwrap();

    guarded
        .update_points(open.object_id(), series.clone())
        .await
        .unwrap();
    assert!(matches!(
        guarded.update_points(hidden.object_id(), series.clone()).await,
        Err(ArchivioError::Forbidden(_))
    ));
    // Update granted, Remove not.
    assert!(matches!(
        guarded.remove_points(open.object_id(), None, None).await,
        Err(ArchivioError::Forbidden(_))
    ));

    let points = guarded
        .get_points(SeriesGetRequest::all(open.object_id().clone()))
        .await
        .unwrap();
    assert_eq!(points.len(), 1);
}
