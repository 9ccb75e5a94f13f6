use tokio_test::{assert_err, assert_ok};

use tower_builder::core::{GameConfig, GameSession, SceneAdapter, SceneError, SessionError};
use tower_builder::scene::{FailPoint, MemoryScene};
use tower_builder::types::{ErrorKind, GameEvent, Phase, GROUND_FALLBACK_Y};

fn started() -> GameSession<MemoryScene> {
    let mut s = GameSession::new(MemoryScene::new(), GameConfig::default());
    assert_ok!(s.start());
    s.drain_events();
    s
}

#[test]
fn failed_spawn_after_landing_leaves_session_untouched() {
    let mut s = started();
    let block = s.current_block().unwrap().clone();
    s.advance(20.0);
    let before = s.scene().world_position(block.node).unwrap();

    s.scene().fail_next(FailPoint::Create);
    let err = assert_err!(s.request_drop());
    assert!(matches!(err, SessionError::Adapter(SceneError::CreateFailed(_))));
    assert_eq!(err.kind(), ErrorKind::AdapterFailure);

    assert_eq!(s.score(), 0);
    assert_eq!(s.block_count(), 0);
    assert!(s.placed_blocks().is_empty());
    assert_eq!(s.phase(), Phase::Oscillating);
    assert_eq!(s.current_block().map(|b| b.node), Some(block.node));
    assert_eq!(s.drain_events(), vec![GameEvent::Error(ErrorKind::AdapterFailure)]);

    // The block is back where the drop was requested, still oscillating.
    assert_eq!(s.scene().timeline_position(), 21.0);
    assert_eq!(s.scene().world_position(block.node).unwrap(), before);
    assert!(s.scene().is_animated(block.node));
    s.advance(45.0);
    let after = s.scene().world_position(block.node).unwrap();
    assert_ne!(after.x, before.x);
    assert_eq!(after.y, block.position.y);

    let outcome = assert_ok!(s.request_drop());
    assert_eq!(outcome.landing().position.x, after.x);
    assert_eq!(s.score(), 1);
    assert_eq!(s.scene().node_count(), 3);
}

#[test]
fn retry_after_failed_spawn_samples_the_same_next_block() {
    let clean = {
        let mut s = started();
        assert_ok!(s.request_drop());
        s.current_block().unwrap().size
    };

    let mut s = started();
    s.scene().fail_next(FailPoint::Create);
    assert_err!(s.request_drop());
    assert_ok!(s.request_drop());
    assert_eq!(s.current_block().unwrap().size, clean);
}

#[test]
fn failed_keyframe_edit_keeps_the_block_moving() {
    let mut s = started();
    let node = s.current_block().unwrap().node;

    s.scene().fail_next(FailPoint::Keyframe);
    let err = assert_err!(s.request_drop());
    assert!(matches!(err, SessionError::Adapter(SceneError::KeyframeFailed(_))));

    assert!(s.scene().is_animated(node));
    assert_eq!(s.phase(), Phase::Oscillating);
    assert_eq!(s.score(), 0);

    assert_ok!(s.request_drop());
    assert_eq!(s.score(), 1);
}

#[test]
fn failed_start_leaves_an_idle_empty_session() {
    let mut s = GameSession::new(MemoryScene::new(), GameConfig::default());

    s.scene().fail_next(FailPoint::Create);
    assert_err!(s.start());
    assert_eq!(s.phase(), Phase::Idle);
    assert!(s.base().is_none());
    assert_eq!(s.scene().node_count(), 0);
    assert_eq!(s.drain_events(), vec![GameEvent::Error(ErrorKind::AdapterFailure)]);

    assert_ok!(s.start());
    assert_eq!(s.phase(), Phase::Oscillating);
}

#[test]
fn failed_oscillation_setup_removes_the_base_too() {
    let mut s = GameSession::new(MemoryScene::new(), GameConfig::default());

    s.scene().fail_next(FailPoint::Keyframe);
    assert_err!(s.start());
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.scene().node_count(), 0);
}

#[test]
fn reset_continues_past_cleanup_failures() {
    let mut s = started();
    assert_ok!(s.request_drop());

    s.scene().fail_next(FailPoint::Delete);
    s.reset();
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.score(), 0);
    assert_eq!(s.scene().node_count(), 0);
}

#[test]
fn missing_base_falls_back_to_ground_height() {
    let mut s = started();
    let base = s.base().unwrap();
    assert_ok!(s.scene_mut().delete_nodes(&[base]));

    let outcome = assert_ok!(s.request_drop());
    assert_eq!(outcome.landing().support_y, GROUND_FALLBACK_Y);
    assert_eq!(s.score(), 1);

    let events = s.drain_events();
    assert_eq!(events[0], GameEvent::Error(ErrorKind::MissingBaseReference));
    assert!(matches!(events[1], GameEvent::BlockPlaced { index: 0, score: 1 }));
}

#[test]
fn failed_base_query_also_uses_the_fallback() {
    let mut s = started();
    s.scene().fail_next(FailPoint::Query);
    let outcome = assert_ok!(s.request_drop());
    assert_eq!(outcome.landing().support_y, GROUND_FALLBACK_Y);
}
