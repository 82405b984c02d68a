use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use schedule_cell::{
    InMemoryScheduleStore, ScheduleError, ScheduleService, ScheduleStore, UpdateBlockRequest,
    UpsertBlockRequest,
};

fn entry(day: i32, start: &str, end: &str) -> UpsertBlockRequest {
    UpsertBlockRequest {
        day_of_week: day,
        start_time: start.to_string(),
        end_time: end.to_string(),
        is_available: None,
    }
}

fn service() -> (ScheduleService, Arc<InMemoryScheduleStore>) {
    let store = Arc::new(InMemoryScheduleStore::new());
    (ScheduleService::new(store.clone()), store)
}

#[tokio::test]
async fn test_upsert_replaces_block_for_same_day() {
    let (service, _) = service();
    let professional_id = Uuid::new_v4();

    let first = service
        .upsert_blocks(professional_id, vec![entry(1, "08:00", "12:00")])
        .await
        .unwrap();
    let second = service
        .upsert_blocks(professional_id, vec![entry(1, "13:00", "17:00")])
        .await
        .unwrap();

    assert_eq!(first[0].id, second[0].id);

    let blocks = service.list_blocks(professional_id).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start_time, "13:00");
    assert_eq!(blocks[0].end_time, "17:00");
}

#[tokio::test]
async fn test_upsert_returns_blocks_in_request_order() {
    let (service, _) = service();
    let professional_id = Uuid::new_v4();

    let saved = service
        .upsert_blocks(
            professional_id,
            vec![entry(5, "08:00", "12:00"), entry(0, "09:00", "10:00"), entry(3, "14:00", "18:00")],
        )
        .await
        .unwrap();

    let days: Vec<u8> = saved.iter().map(|b| b.day_of_week).collect();
    assert_eq!(days, vec![5, 0, 3]);

    let listed: Vec<u8> = service
        .list_blocks(professional_id)
        .await
        .unwrap()
        .iter()
        .map(|b| b.day_of_week)
        .collect();
    assert_eq!(listed, vec![0, 3, 5]);
}

#[tokio::test]
async fn test_invalid_entry_leaves_schedule_untouched() {
    let (service, _) = service();
    let professional_id = Uuid::new_v4();

    service
        .upsert_blocks(professional_id, vec![entry(2, "08:00", "12:00")])
        .await
        .unwrap();

    let result = service
        .upsert_blocks(
            professional_id,
            vec![entry(2, "10:00", "11:00"), entry(4, "12:00", "08:00")],
        )
        .await;
    assert_matches!(result, Err(ScheduleError::InvalidInput(_)));

    let blocks = service.list_blocks(professional_id).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].start_time, "08:00");
}

#[tokio::test]
async fn test_duplicate_days_in_one_batch_are_rejected() {
    let (service, _) = service();
    let professional_id = Uuid::new_v4();

    let result = service
        .upsert_blocks(
            professional_id,
            vec![entry(1, "08:00", "12:00"), entry(1, "13:00", "17:00")],
        )
        .await;

    assert_matches!(result, Err(ScheduleError::InvalidInput(_)));
    assert!(service.list_blocks(professional_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unpadded_and_out_of_range_values_are_rejected() {
    let (service, _) = service();
    let professional_id = Uuid::new_v4();

    assert_matches!(
        service.upsert_blocks(professional_id, vec![entry(1, "8:00", "12:00")]).await,
        Err(ScheduleError::InvalidInput(_))
    );
    assert_matches!(
        service.upsert_blocks(professional_id, vec![entry(-1, "08:00", "12:00")]).await,
        Err(ScheduleError::InvalidInput(_))
    );
    assert_matches!(
        service.upsert_blocks(professional_id, vec![entry(3, "10:00", "10:00")]).await,
        Err(ScheduleError::InvalidInput(_))
    );
}

#[tokio::test]
async fn test_blocks_are_scoped_per_professional() {
    let (service, store) = service();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    service.upsert_blocks(alice, vec![entry(1, "08:00", "12:00")]).await.unwrap();
    service.upsert_blocks(bob, vec![entry(1, "14:00", "18:00")]).await.unwrap();

    let alice_blocks = store.active_blocks_for_day(alice, 1).await.unwrap();
    assert_eq!(alice_blocks.len(), 1);
    assert_eq!(alice_blocks[0].start_time, "08:00");
    assert!(store.active_blocks_for_day(alice, 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_block_merges_fields_and_checks_owner() {
    let (service, store) = service();
    let owner = Uuid::new_v4();
    let block = service
        .upsert_blocks(owner, vec![entry(1, "08:00", "12:00")])
        .await
        .unwrap()
        .remove(0);

    let updated = service
        .update_block(block.id, owner, UpdateBlockRequest {
            end_time: Some("16:00".to_string()),
            is_available: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.start_time, "08:00");
    assert_eq!(updated.end_time, "16:00");
    assert!(!updated.is_available);
    assert!(store.active_blocks_for_day(owner, 1).await.unwrap().is_empty());

    let inverted = service
        .update_block(block.id, owner, UpdateBlockRequest {
            start_time: Some("17:00".to_string()),
            ..Default::default()
        })
        .await;
    assert_matches!(inverted, Err(ScheduleError::InvalidInput(_)));

    let stranger = service
        .update_block(block.id, Uuid::new_v4(), UpdateBlockRequest::default())
        .await;
    assert_matches!(stranger, Err(ScheduleError::NotAuthorized));
}

#[tokio::test]
async fn test_delete_block() {
    let (service, _) = service();
    let owner = Uuid::new_v4();
    let block = service
        .upsert_blocks(owner, vec![entry(6, "09:00", "13:00")])
        .await
        .unwrap()
        .remove(0);

    assert_matches!(
        service.delete_block(block.id, Uuid::new_v4()).await,
        Err(ScheduleError::NotAuthorized)
    );
    service.delete_block(block.id, owner).await.unwrap();
    assert!(service.list_blocks(owner).await.unwrap().is_empty());

    assert_matches!(
        service.delete_block(block.id, owner).await,
        Err(ScheduleError::NotFound)
    );
}
