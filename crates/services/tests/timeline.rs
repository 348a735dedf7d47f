mod common;

use common::Fixture;
use services::services::timeline::TimelineError;
use uuid::Uuid;

async fn titles(fx: &Fixture) -> Vec<(String, i64)> {
    fx.campaign
        .timeline
        .list(fx.adventure_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.title, e.order_index))
        .collect()
}

fn expected(titles: &[&str]) -> Vec<(String, i64)> {
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), i as i64))
        .collect()
}

async fn seed(fx: &Fixture, titles: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for title in titles {
        let entry = fx
            .campaign
            .timeline
            .create_entry(fx.adventure_id, title, None)
            .await
            .unwrap();
        ids.push(entry.id);
    }
    ids
}

#[tokio::test]
async fn entries_are_appended_in_order() {
    let fx = Fixture::new().await;
    seed(&fx, &["Arrival", "Tavern", "Castle"]).await;

    assert_eq!(titles(&fx).await, expected(&["Arrival", "Tavern", "Castle"]));
}

#[tokio::test]
async fn title_is_required_and_text_is_trimmed() {
    let fx = Fixture::new().await;

    let err = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "   ", Some("body"))
        .await
        .unwrap_err();
    assert!(matches!(err, TimelineError::TitleRequired));

    let entry = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "  Arrival  ", Some("   "))
        .await
        .unwrap();
    assert_eq!(entry.title, "Arrival");
    assert_eq!(entry.description, None);

    let updated = fx
        .campaign
        .timeline
        .update_entry(entry.id, "Arrival", Some("  The mists close in. \n"))
        .await
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("The mists close in."));
}

#[tokio::test]
async fn deleting_repacks_the_order() {
    let fx = Fixture::new().await;
    let ids = seed(&fx, &["A", "B", "C", "D"]).await;

    fx.campaign.timeline.delete_entry(ids[1]).await.unwrap();

    assert_eq!(titles(&fx).await, expected(&["A", "C", "D"]));

    let next = fx
        .campaign
        .timeline
        .create_entry(fx.adventure_id, "E", None)
        .await
        .unwrap();
    assert_eq!(next.order_index, 3);
}

#[tokio::test]
async fn moving_swaps_with_the_neighbour() {
    let fx = Fixture::new().await;
    let ids = seed(&fx, &["A", "B", "C"]).await;

    let moved = fx.campaign.timeline.move_up(ids[2]).await.unwrap();
    assert_eq!(moved.order_index, 1);
    assert_eq!(titles(&fx).await, expected(&["A", "C", "B"]));

    let moved = fx.campaign.timeline.move_down(ids[0]).await.unwrap();
    assert_eq!(moved.order_index, 1);
    assert_eq!(titles(&fx).await, expected(&["C", "A", "B"]));
}

#[tokio::test]
async fn moving_past_either_end_does_nothing() {
    let fx = Fixture::new().await;
    let ids = seed(&fx, &["A", "B"]).await;

    let first = fx.campaign.timeline.move_up(ids[0]).await.unwrap();
    assert_eq!(first.order_index, 0);
    let last = fx.campaign.timeline.move_down(ids[1]).await.unwrap();
    assert_eq!(last.order_index, 1);

    assert_eq!(titles(&fx).await, expected(&["A", "B"]));
}

#[tokio::test]
async fn missing_entries_are_not_found() {
    let fx = Fixture::new().await;
    let missing = Uuid::new_v4();

    let err = fx
        .campaign
        .timeline
        .update_entry(missing, "Title", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TimelineError::NotFound(id) if id == missing));

    let err = fx.campaign.timeline.move_up(missing).await.unwrap_err();
    assert!(matches!(err, TimelineError::NotFound(_)));

    let err = fx.campaign.timeline.delete_entry(missing).await.unwrap_err();
    assert!(matches!(err, TimelineError::NotFound(_)));
}

#[tokio::test]
async fn each_adventure_has_its_own_order() {
    let fx = Fixture::new().await;
    let other = common::add_adventure(fx.pool(), "Tomb of Annihilation").await;
    seed(&fx, &["A", "B"]).await;

    let entry = fx
        .campaign
        .timeline
        .create_entry(other, "Port Nyanzaru", None)
        .await
        .unwrap();

    assert_eq!(entry.order_index, 0);
    assert_eq!(titles(&fx).await, expected(&["A", "B"]));
}
