// Snapshot and reconciliation properties

use glam::Vec2;
use std::cell::RefCell;
use std::rc::Rc;

use tilephys::core::GameTick;
use tilephys::engine::physics::{
    BodyBuilder, BodyHandle, BodyStatus, BroadphaseHooks, Fixture, FixtureBuilder, PhysicsWorld,
};
use tilephys::engine::sync::{apply_state, decode, encode, get_state, BodyState, Stamped, StateReceiver};

#[derive(Clone, Default)]
struct Broadphase(Rc<RefCell<Vec<String>>>);

impl BroadphaseHooks for Broadphase {
    fn create_fixture(&mut self, _body: BodyHandle, fixture: &Fixture) {
        self.0.borrow_mut().push(format!("+{}", fixture.id()));
    }

    fn destroy_fixture(&mut self, _body: BodyHandle, fixture: &Fixture) {
        self.0.borrow_mut().push(format!("-{}", fixture.id()));
    }
}

fn fixture(id: &str, radius: f32) -> Fixture {
    FixtureBuilder::circle(radius).id(id).density(2.0).build()
}

#[test]
fn test_fixture_diff_touches_only_what_changed() {
    let broadphase = Broadphase::default();
    let mut world = PhysicsWorld::with_hooks(Default::default(), broadphase.clone());
    let handle = world.add_body(
        BodyBuilder::new_dynamic()
            .fixture(fixture("A", 0.5))
            .fixture(fixture("B", 0.25))
            .build()
            .unwrap(),
    );
    broadphase.0.borrow_mut().clear();

    let mut remote = get_state(&world, handle).unwrap();
    remote.fixtures = vec![fixture("A", 0.5), fixture("C", 1.0)];

    let revision = world.body(handle).unwrap().mass_revision();
    let report = apply_state(&mut world, handle, &remote).unwrap();

    assert_eq!(report.removed, vec!["B".to_string()]);
    assert_eq!(report.added, vec!["C".to_string()]);
    assert_eq!(*broadphase.0.borrow(), vec!["-B", "+C"]);

    let body = world.body(handle).unwrap();
    assert_eq!(body.mass_revision(), revision + 1);
    assert_eq!(body.fixtures()[0], fixture("A", 0.5));
    assert_eq!(body.fixture_count(), 2);
    assert!(body.get_fixture("B").is_none());
    assert!(body.get_fixture("C").is_some());
}

#[test]
fn test_unchanged_snapshot_recomputes_nothing() {
    let mut world = PhysicsWorld::default();
    let handle = world.add_body(
        BodyBuilder::new_dynamic()
            .fixture(fixture("A", 0.5))
            .build()
            .unwrap(),
    );

    let state = get_state(&world, handle).unwrap();
    let revision = world.body(handle).unwrap().mass_revision();
    let report = apply_state(&mut world, handle, &state).unwrap();

    assert!(!report.fixtures_changed());
    assert_eq!(world.body(handle).unwrap().mass_revision(), revision);
}

#[test]
fn test_snapshot_round_trip_over_cbor() {
    let mut server = PhysicsWorld::default();
    let source = server.add_body(
        BodyBuilder::new_kinematic_controller()
            .fixture(fixture("hull", 0.5))
            .fixture(FixtureBuilder::solid_box(0.2, 0.1).offset(Vec2::new(0.4, 0.0)).build())
            .linvel(1.5, -2.0)
            .angvel(0.75)
            .sleeping_allowed(false)
            .can_collide(false)
            .status(BodyStatus::InAir)
            .build()
            .unwrap(),
    );

    let snapshot = Stamped::new(GameTick(12), get_state(&server, source).unwrap());
    let bytes = encode(&snapshot).unwrap();
    let received: Stamped<BodyState> = decode(&bytes).unwrap();
    assert_eq!(received, snapshot);

    let mut client = PhysicsWorld::default();
    let target = client.add_body(BodyBuilder::new_dynamic().build().unwrap());
    apply_state(&mut client, target, &received.state).unwrap();

    let again = get_state(&client, target).unwrap();
    assert_eq!(again, snapshot.state);
    assert_eq!(again.fixtures[1].id(), "fixture_1");
}

#[test]
fn test_stale_snapshot_is_not_applied() {
    let mut world = PhysicsWorld::default();
    let handle = world.add_body(BodyBuilder::new_dynamic().build().unwrap());

    let mut newer = get_state(&world, handle).unwrap();
    newer.linear_velocity = Vec2::new(4.0, 0.0);
    let mut older = newer.clone();
    older.linear_velocity = Vec2::new(-4.0, 0.0);

    let mut receiver = StateReceiver::new();
    receiver.offer(Stamped::new(GameTick(20), newer));
    assert!(!receiver.offer(Stamped::new(GameTick(19), older)));

    while let Some(snapshot) = receiver.take() {
        apply_state(&mut world, handle, &snapshot.state).unwrap();
    }
    assert_eq!(world.body(handle).unwrap().linear_velocity(), Vec2::new(4.0, 0.0));
}
