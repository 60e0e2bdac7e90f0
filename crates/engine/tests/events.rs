mod common;

use chrono::{Duration, Utc};
use engine::{
    CreateEventCmd, Engine, EngineError, Event, EventAwardCmd, EventUpdate, Principal, Role,
    TransactionKind,
};

use common::{cast, engine_with_db, points};

async fn open_event(engine: &Engine, manager: &Principal, capacity: i64, budget: i64) -> Event {
    let now = Utc::now();
    engine
        .create_event(
            CreateEventCmd::new(
                "Games night",
                now - Duration::hours(1),
                now + Duration::hours(2),
                capacity,
                budget,
            )
            .location("Hall B"),
            manager,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn create_event_validates_input_and_role() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();

    let err = engine
        .create_event(
            CreateEventCmd::new("Talk", now, now + Duration::hours(1), 10, 100),
            &cast.organizer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    for cmd in [
        CreateEventCmd::new("Talk", now, now, 10, 100),
        CreateEventCmd::new("Talk", now, now + Duration::hours(1), 0, 100),
        CreateEventCmd::new("Talk", now, now + Duration::hours(1), 10, 0),
        CreateEventCmd::new("  ", now, now + Duration::hours(1), 10, 100),
    ] {
        let err = engine.create_event(cmd, &cast.manager).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    let event = open_event(&engine, &cast.manager, 10, 500).await;
    assert_eq!(event.points_remain, 500);
    assert_eq!(event.points_awarded, 0);
    assert_eq!(event.location.as_deref(), Some("Hall B"));
}

#[tokio::test]
async fn organizers_and_guests_are_disjoint() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 500).await;

    let event = engine
        .add_organizer(event.id, cast.organizer.id, &cast.manager)
        .await
        .unwrap();
    assert!(event.is_organizer(cast.organizer.id));

    let err = engine
        .add_guest(event.id, cast.organizer.id, &cast.organizer)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let event = engine.rsvp(event.id, &cast.alice).await.unwrap();
    assert_eq!(event.guests.len(), 1);
    let err = engine
        .add_organizer(event.id, cast.alice.id, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.rsvp(event.id, &cast.alice).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn guest_list_respects_capacity_and_end() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 1, 500).await;

    engine.rsvp(event.id, &cast.alice).await.unwrap();
    let err = engine.rsvp(event.id, &cast.bob).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let now = Utc::now();
    let past = engine
        .create_event(
            CreateEventCmd::new(
                "Yesterday",
                now - Duration::days(2),
                now - Duration::days(1),
                10,
                100,
            ),
            &cast.manager,
        )
        .await
        .unwrap();
    let err = engine.rsvp(past.id, &cast.bob).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn guests_can_leave_and_strangers_cannot_remove_them() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 500).await;
    engine.rsvp(event.id, &cast.alice).await.unwrap();

    let err = engine
        .remove_guest(event.id, cast.alice.id, &cast.bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let event = engine
        .remove_guest(event.id, cast.alice.id, &cast.alice)
        .await
        .unwrap();
    assert!(event.guests.is_empty());
}

#[tokio::test]
async fn award_to_attendees_splits_budget() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 750).await;
    engine
        .add_organizer(event.id, cast.organizer.id, &cast.manager)
        .await
        .unwrap();

    let mut attendees = Vec::new();
    for handle in ["ann", "ben", "cat", "dan", "eve"] {
        let user = common::user(&engine, handle, Role::Regular).await;
        engine
            .add_guest(event.id, user.id, &cast.organizer)
            .await
            .unwrap();
        engine
            .mark_attended(event.id, user.id, &cast.organizer)
            .await
            .unwrap();
        attendees.push(user.id);
    }
    // On the list but absent: gets nothing.
    engine.rsvp(event.id, &cast.alice).await.unwrap();

    let award = engine
        .award_to_attendees(event.id, 50, &cast.organizer)
        .await
        .unwrap();
    assert_eq!(award.total_awarded, 250);
    assert_eq!(award.remaining_budget, 500);
    assert_eq!(award.transactions.len(), 5);
    for tx in &award.transactions {
        assert_eq!(tx.kind, TransactionKind::Event);
        assert!(tx.processed);
        assert_eq!(tx.event_id, Some(event.id));
    }

    for user_id in attendees {
        assert_eq!(points(&engine, user_id).await, 50);
        assert!(engine.verify_balance(user_id).await.unwrap());
    }
    assert_eq!(points(&engine, cast.alice.id).await, 0);

    let event = engine.event(event.id).await.unwrap();
    assert_eq!(event.points_remain, 500);
    assert_eq!(event.points_awarded, 250);
    assert_eq!(event.points_remain + event.points_awarded, event.points_budget);
}

#[tokio::test]
async fn award_beyond_budget_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 100).await;
    for guest in [&cast.alice, &cast.bob] {
        engine.rsvp(event.id, guest).await.unwrap();
        engine
            .mark_attended(event.id, guest.id, &cast.manager)
            .await
            .unwrap();
    }

    let err = engine
        .award_to_attendees(event.id, 60, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBudget(_)));

    assert_eq!(points(&engine, cast.alice.id).await, 0);
    assert_eq!(points(&engine, cast.bob.id).await, 0);
    let event = engine.event(event.id).await.unwrap();
    assert_eq!(event.points_remain, 100);
    assert_eq!(event.points_awarded, 0);
}

#[tokio::test]
async fn award_requires_attendees_and_staff() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 100).await;
    engine.rsvp(event.id, &cast.alice).await.unwrap();

    let err = engine
        .award_to_attendees(event.id, 10, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoAttendees(_)));

    // Organizer role alone is not enough: the caller must organize this event.
    let err = engine
        .award_to_attendees(event.id, 10, &cast.organizer)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .award_to_attendees(event.id, 0, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn single_event_award_goes_to_attended_guest_only() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 100).await;
    engine
        .add_organizer(event.id, cast.organizer.id, &cast.manager)
        .await
        .unwrap();
    engine.rsvp(event.id, &cast.alice).await.unwrap();

    let err = engine
        .create_transaction(
            EventAwardCmd::new(event.id, cast.alice.id, 40).into(),
            &cast.organizer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine
        .mark_attended(event.id, cast.alice.id, &cast.organizer)
        .await
        .unwrap();
    let tx = engine
        .create_transaction(
            EventAwardCmd::new(event.id, cast.alice.id, 40).into(),
            &cast.organizer,
        )
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(tx.kind, TransactionKind::Event);
    assert_eq!(tx.points_delta, 40);
    assert_eq!(points(&engine, cast.alice.id).await, 40);

    let err = engine
        .create_transaction(
            EventAwardCmd::new(event.id, cast.alice.id, 61).into(),
            &cast.organizer,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBudget(_)));

    let err = engine
        .create_transaction(
            EventAwardCmd::new(event.id, cast.alice.id, 10).into(),
            &cast.bob,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let event = engine.event(event.id).await.unwrap();
    assert_eq!(event.points_remain, 60);
    assert_eq!(event.points_awarded, 40);
}

#[tokio::test]
async fn budget_change_keeps_remaining_in_step_with_awards() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 300).await;
    for guest in [cast.alice, cast.bob] {
        engine.rsvp(event.id, &guest).await.unwrap();
        engine
            .mark_attended(event.id, guest.id, &cast.manager)
            .await
            .unwrap();
    }
    engine
        .award_to_attendees(event.id, 50, &cast.manager)
        .await
        .unwrap();

    let event = engine
        .update_event(event.id, EventUpdate::default().points_budget(150), &cast.manager)
        .await
        .unwrap();
    assert_eq!(event.points_budget, 150);
    assert_eq!(event.points_awarded, 100);
    assert_eq!(event.points_remain, 50);

    // Below what was already handed out.
    let err = engine
        .update_event(event.id, EventUpdate::default().points_budget(90), &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let unchanged = engine.event(event.id).await.unwrap();
    assert_eq!(unchanged.points_budget, 150);
    assert_eq!(unchanged.points_remain, 50);

    let err = engine
        .award_to_attendees(event.id, 30, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBudget(_)));

    let event = engine
        .update_event(event.id, EventUpdate::default().points_budget(100), &cast.manager)
        .await
        .unwrap();
    assert_eq!(event.points_remain, 0);
    assert_eq!(event.points_remain + event.points_awarded, event.points_budget);
}

#[tokio::test]
async fn update_event_checks_role_capacity_and_input() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let event = open_event(&engine, &cast.manager, 10, 300).await;
    engine
        .add_organizer(event.id, cast.organizer.id, &cast.manager)
        .await
        .unwrap();
    engine.rsvp(event.id, &cast.alice).await.unwrap();
    engine.rsvp(event.id, &cast.bob).await.unwrap();

    let err = engine
        .update_event(event.id, EventUpdate::default().name("Mine"), &cast.organizer)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let now = Utc::now();
    for update in [
        EventUpdate::default(),
        EventUpdate::default().name("   "),
        EventUpdate::default().capacity(1),
        EventUpdate::default().capacity(0),
        EventUpdate::default().points_budget(0),
        EventUpdate::default().window(now + Duration::hours(2), now + Duration::hours(1)),
    ] {
        let err = engine
            .update_event(event.id, update, &cast.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }

    let updated = engine
        .update_event(
            event.id,
            EventUpdate::default()
                .name("  Quiz night ")
                .location("Hall C")
                .capacity(2),
            &cast.manager,
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Quiz night");
    assert_eq!(updated.location.as_deref(), Some("Hall C"));
    assert_eq!(updated.capacity, 2);
    assert_eq!(updated.guests.len(), 2);
    assert_eq!(updated.points_budget, 300);
}

#[tokio::test]
async fn ended_event_keeps_its_details() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();
    let event = engine
        .create_event(
            CreateEventCmd::new("Past", now - Duration::hours(3), now - Duration::hours(1), 5, 100),
            &cast.manager,
        )
        .await
        .unwrap();

    let err = engine
        .update_event(event.id, EventUpdate::default().description("late"), &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let event = engine
        .update_event(event.id, EventUpdate::default().points_budget(200), &cast.manager)
        .await
        .unwrap();
    assert_eq!(event.points_remain, 200);
    assert_eq!(event.name, "Past");
}

#[tokio::test]
async fn only_upcoming_events_can_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;

    let running = open_event(&engine, &cast.manager, 10, 100).await;
    let err = engine
        .delete_event(running.id, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let now = Utc::now();
    let upcoming = engine
        .create_event(
            CreateEventCmd::new("Soon", now + Duration::days(1), now + Duration::days(2), 5, 100),
            &cast.manager,
        )
        .await
        .unwrap();
    engine
        .add_organizer(upcoming.id, cast.organizer.id, &cast.manager)
        .await
        .unwrap();
    engine.rsvp(upcoming.id, &cast.alice).await.unwrap();

    let err = engine
        .delete_event(upcoming.id, &cast.organizer)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    engine
        .delete_event(upcoming.id, &cast.manager)
        .await
        .unwrap();
    let err = engine.event(upcoming.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    let err = engine
        .delete_event(upcoming.id, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
