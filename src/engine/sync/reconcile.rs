// Applying a remote body snapshot to a local body

use super::state::BodyState;
use super::SyncError;
use crate::engine::physics::{BodyHandle, Fixture, PhysicsError, PhysicsWorld};

/// What has to change to turn one fixture set into another
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureDiff {
    /// Local fixture IDs to destroy
    pub remove: Vec<String>,
    /// Remote fixtures to create
    pub add: Vec<Fixture>,
}

impl FixtureDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Diff two fixture sets by ID.
///
/// A fixture whose ID exists on both sides but whose value differs is
/// removed and re-added. Order on either side is irrelevant.
pub fn diff_fixtures(local: &[Fixture], remote: &[Fixture]) -> FixtureDiff {
    let mut diff = FixtureDiff::default();

    for theirs in remote {
        match local.iter().find(|ours| ours.id() == theirs.id()) {
            Some(ours) if ours == theirs => {}
            Some(ours) => {
                diff.remove.push(ours.id().to_string());
                diff.add.push(theirs.clone());
            }
            None => diff.add.push(theirs.clone()),
        }
    }

    for ours in local {
        if !remote.iter().any(|theirs| theirs.id() == ours.id()) {
            diff.remove.push(ours.id().to_string());
        }
    }

    diff
}

/// Outcome of [`apply_state`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

impl ReconcileReport {
    pub fn fixtures_changed(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }
}

/// Reject remote fixtures that cannot be attached, before anything is touched
fn check_additions(add: &[Fixture]) -> Result<(), SyncError> {
    for (i, fixture) in add.iter().enumerate() {
        let invalid = |reason: String| SyncError::InvalidFixture {
            id: fixture.id().to_string(),
            reason,
        };

        fixture.shape().validate().map_err(|e| invalid(e.to_string()))?;
        if !fixture.density().is_finite() || fixture.density() < 0.0 {
            return Err(invalid(format!("density {}", fixture.density())));
        }
        if !fixture.id().is_empty() && add[..i].iter().any(|f| f.id() == fixture.id()) {
            return Err(PhysicsError::DuplicateFixture(fixture.id().to_string()).into());
        }
    }
    Ok(())
}

/// Bring a local body in line with a remote snapshot.
///
/// Fixtures are reconciled first (removals, then additions, then a single
/// mass recompute if anything changed). Scalar fields are then taken from the
/// snapshot unconditionally. Invalid or duplicate remote fixtures are rejected
/// before the body is modified.
pub fn apply_state(
    world: &mut PhysicsWorld,
    handle: BodyHandle,
    state: &BodyState,
) -> Result<ReconcileReport, SyncError> {
    let (body, hooks) = world
        .body_and_hooks(handle)
        .ok_or(SyncError::UnknownBody(handle))?;

    let diff = diff_fixtures(body.fixtures(), &state.fixtures);
    check_additions(&diff.add)?;
    let mut report = ReconcileReport::default();

    for id in diff.remove {
        if let Some(fixture) = body.get_fixture(&id) {
            hooks.destroy_fixture(handle, fixture);
        }
        if body.take_fixture(&id).is_some() {
            report.removed.push(id);
        }
    }

    for fixture in diff.add {
        let id = match body.insert_fixture(fixture) {
            Ok(id) => id,
            Err(err) => {
                body.reset_mass_data();
                return Err(err.into());
            }
        };
        if let Some(fixture) = body.get_fixture(&id) {
            hooks.create_fixture(handle, fixture);
        }
        report.added.push(id);
    }

    if report.fixtures_changed() {
        body.reset_mass_data();
        log::debug!(
            "Reconciled fixtures on {:?}: -{:?} +{:?}",
            handle,
            report.removed,
            report.added
        );
    }

    body.set_sleeping_allowed(state.sleeping_allowed);
    body.set_fixed_rotation(state.fixed_rotation);
    body.set_can_collide(state.can_collide);
    body.set_status(state.status);

    // Type goes before velocities: a static body ignores velocity writes.
    world.set_body_type(handle, state.body_type)?;

    if let Some(body) = world.body_mut(handle) {
        body.set_linear_velocity(state.linear_velocity);
        body.set_angular_velocity(state.angular_velocity);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::{BodyBuilder, BodyType, BroadphaseHooks, FixtureBuilder, Shape};
    use crate::engine::sync::state::get_state;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn named(id: &str, radius: f32) -> Fixture {
        FixtureBuilder::circle(radius).id(id).build()
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl BroadphaseHooks for Recorder {
        fn create_fixture(&mut self, _body: BodyHandle, fixture: &Fixture) {
            self.0.borrow_mut().push(format!("create {}", fixture.id()));
        }

        fn destroy_fixture(&mut self, _body: BodyHandle, fixture: &Fixture) {
            self.0.borrow_mut().push(format!("destroy {}", fixture.id()));
        }
    }

    #[test]
    fn test_diff_is_by_id_not_position() {
        let local = vec![named("a", 1.0), named("b", 1.0)];
        let remote = vec![named("b", 1.0), named("a", 1.0)];
        assert!(diff_fixtures(&local, &remote).is_empty());
    }

    #[test]
    fn test_changed_value_is_replaced() {
        let local = vec![named("a", 1.0)];
        let remote = vec![named("a", 2.0)];
        let diff = diff_fixtures(&local, &remote);
        assert_eq!(diff.remove, vec!["a".to_string()]);
        assert_eq!(diff.add, vec![named("a", 2.0)]);
    }

    #[test]
    fn test_apply_notifies_removals_before_additions() {
        let recorder = Recorder::default();
        let mut world = PhysicsWorld::with_hooks(Default::default(), recorder.clone());
        let body = BodyBuilder::new_dynamic()
            .fixture(named("a", 1.0))
            .fixture(named("b", 1.0))
            .build()
            .unwrap();
        let handle = world.add_body(body);
        recorder.0.borrow_mut().clear();

        let mut state = get_state(&world, handle).unwrap();
        state.fixtures = vec![named("c", 0.5), named("a", 1.0)];

        let report = apply_state(&mut world, handle, &state).unwrap();
        assert_eq!(report.removed, vec!["b".to_string()]);
        assert_eq!(report.added, vec!["c".to_string()]);
        assert_eq!(*recorder.0.borrow(), vec!["destroy b", "create c"]);
    }

    #[test]
    fn test_apply_scalars_after_type_change() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            BodyBuilder::new_static()
                .fixture(named("a", 1.0))
                .build()
                .unwrap(),
        );

        let mut state = get_state(&world, handle).unwrap();
        state.body_type = BodyType::Dynamic;
        state.linear_velocity = Vec2::new(3.0, 0.0);
        state.can_collide = false;

        let report = apply_state(&mut world, handle, &state).unwrap();
        assert!(!report.fixtures_changed());

        let body = world.body(handle).unwrap();
        assert_eq!(body.body_type(), BodyType::Dynamic);
        assert_eq!(body.linear_velocity(), Vec2::new(3.0, 0.0));
        assert!(!body.can_collide());
        assert!(body.awake());
    }

    #[test]
    fn test_unknown_body() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(BodyBuilder::new_dynamic().build().unwrap());
        let state = get_state(&world, handle).unwrap();
        world.remove_body(handle);

        assert!(matches!(
            apply_state(&mut world, handle, &state),
            Err(SyncError::UnknownBody(_))
        ));
    }

    #[test]
    fn test_duplicate_remote_ids_leave_body_untouched() {
        let recorder = Recorder::default();
        let mut world = PhysicsWorld::with_hooks(Default::default(), recorder.clone());
        let handle = world.add_body(
            BodyBuilder::new_dynamic()
                .fixture(named("a", 0.5))
                .fixture(named("b", 0.5))
                .build()
                .unwrap(),
        );
        recorder.0.borrow_mut().clear();
        let mass = world.body(handle).unwrap().mass();

        let mut state = get_state(&world, handle).unwrap();
        state.fixtures = vec![named("c", 0.5), named("c", 0.5)];

        assert!(matches!(
            apply_state(&mut world, handle, &state),
            Err(SyncError::Physics(PhysicsError::DuplicateFixture(ref id))) if id == "c"
        ));
        let body = world.body(handle).unwrap();
        assert_eq!(body.fixture_count(), 2);
        assert_eq!(body.mass(), mass);
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn test_decoded_degenerate_polygon_is_rejected() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(
            BodyBuilder::new_dynamic()
                .fixture(named("a", 0.5))
                .build()
                .unwrap(),
        );
        let mass = world.body(handle).unwrap().mass();

        let mut state = get_state(&world, handle).unwrap();
        let mut bad = named("hull", 0.5);
        bad.set_shape(Shape::Polygon { vertices: vec![] });
        state.fixtures = vec![bad];

        // Off the wire the shape never decodes
        let bytes = crate::engine::sync::encode(&state).unwrap();
        assert!(matches!(
            crate::engine::sync::decode::<BodyState>(&bytes),
            Err(SyncError::Decode(_))
        ));

        // Built in process it is refused before anything is removed
        assert!(matches!(
            apply_state(&mut world, handle, &state),
            Err(SyncError::InvalidFixture { ref id, .. }) if id == "hull"
        ));
        let body = world.body(handle).unwrap();
        assert!(body.get_fixture("a").is_some());
        assert_eq!(body.mass(), mass);
    }

    #[test]
    fn test_negative_density_is_rejected() {
        let mut world = PhysicsWorld::default();
        let handle = world.add_body(BodyBuilder::new_dynamic().build().unwrap());

        let mut state = get_state(&world, handle).unwrap();
        state.fixtures = vec![FixtureBuilder::circle(0.5).id("a").density(-1.0).build()];

        assert!(matches!(
            apply_state(&mut world, handle, &state),
            Err(SyncError::InvalidFixture { .. })
        ));
        assert_eq!(world.body(handle).unwrap().fixture_count(), 0);
    }
}
