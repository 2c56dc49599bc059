use std::collections::BTreeMap;
use std::sync::Arc;

use azrael_math::{Quat, Vec3};
use azrael_store::prelude::*;
use azrael_types::prelude::*;
use serde_json::json;

use crate::{Broker, SpawnRequest};

fn sphere_template(id: &str) -> Template {
    let mut body = Body::default();
    body.shapes.insert(
        "cs".into(),
        ShapeFragment::new(CollisionShape::Sphere { radius: 1.0 }),
    );
    Template::new(id, body)
}

fn setup() -> (Arc<Datastore>, Broker) {
    let store = Arc::new(Datastore::new());
    let broker = Broker::new(store.clone()).unwrap();
    (store, broker)
}

/// Writes a body document the way Leonard's commit does, so mutation
/// operations see a live object.
fn install_body(
    store: &Datastore,
    id: ObjectId,
    body: &Body,
    boosters: BTreeMap<String, Booster>,
    factories: BTreeMap<String, Factory>,
) {
    let doc = json!({
        "body": serde_json::to_value(body).unwrap(),
        "boosters": serde_json::to_value(&boosters).unwrap(),
        "factories": serde_json::to_value(&factories).unwrap(),
        "force": {},
    });
    store
        .collection(BODIES)
        .unwrap()
        .upsert(&id.to_string(), doc)
        .unwrap();
}

#[test]
fn template_roundtrip_and_conflict() {
    let (_, broker) = setup();
    let template = sphere_template("t1");

    let flags = broker.add_templates(vec![template.clone()]).unwrap();
    assert_eq!(flags, vec![true]);

    let back = broker.get_templates(&["t1".into()]).unwrap();
    assert_eq!(back.get("t1").unwrap().as_ref(), Some(&template));

    // Re-adding the same name reports a duplicate and leaves the original.
    let flags = broker.add_templates(vec![sphere_template("t1")]).unwrap();
    assert_eq!(flags, vec![false]);
}

#[test]
fn malformed_template_rejects_whole_batch() {
    let (store, broker) = setup();
    let mut bad = sphere_template("bad");
    bad.body.shapes.insert(
        "broken".into(),
        ShapeFragment::new(CollisionShape::Sphere { radius: -1.0 }),
    );

    let err = broker
        .add_templates(vec![sphere_template("good"), bad])
        .unwrap_err();
    assert!(matches!(err, AzError::BadInput(_)));
    // No side effects: not even the valid template went in.
    assert_eq!(store.collection(TEMPLATES).unwrap().count(), 0);
}

#[test]
fn spawn_allocates_fresh_ids_and_enqueues() {
    let (store, broker) = setup();
    broker.add_templates(vec![sphere_template("t1")]).unwrap();

    let ids = broker
        .spawn(vec![
            SpawnRequest {
                template_id: "t1".into(),
                ..Default::default()
            },
            SpawnRequest {
                template_id: "t1".into(),
                overrides: BodyUpdate {
                    position: Some(Vec3::new(5.0, 0.0, 0.0)),
                    ..Default::default()
                },
            },
        ])
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);
    assert_eq!(store.queue(CMD_SPAWN).unwrap().len(), 2);

    // Nothing is observable before the tick boundary.
    let states = broker.get_body_states(&ids).unwrap();
    assert!(states.values().all(|s| s.is_none()));
}

#[test]
fn spawn_unknown_template_fails_fast() {
    let (store, broker) = setup();
    let err = broker
        .spawn(vec![SpawnRequest {
            template_id: "nope".into(),
            ..Default::default()
        }])
        .unwrap_err();
    assert_eq!(err, AzError::UnknownTemplate("nope".into()));
    assert!(store.queue(CMD_SPAWN).unwrap().is_empty());
    // No ids were burned.
    assert_eq!(store.get_counter("objectid").unwrap(), None);
}

#[test]
fn set_body_state_validates_and_requires_object() {
    let (store, broker) = setup();
    let id = ObjectId(1);

    let err = broker.set_body_state(id, BodyUpdate::default()).unwrap_err();
    assert_eq!(err, AzError::UnknownObject(id));

    install_body(&store, id, &Body::default(), BTreeMap::new(), BTreeMap::new());

    let bad = BodyUpdate {
        orientation: Some(Quat::from_xyzw(0.0, 0.0, 0.0, 3.0)),
        ..Default::default()
    };
    assert!(matches!(broker.set_body_state(id, bad), Err(AzError::BadInput(_))));
    assert!(store.queue(CMD_MODIFY).unwrap().is_empty());

    broker
        .set_body_state(
            id,
            BodyUpdate {
                position: Some(Vec3::ONE),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(store.queue(CMD_MODIFY).unwrap().len(), 1);
}

#[test]
fn remove_tolerates_unknown_ids() {
    let (store, broker) = setup();
    broker.remove_objects(&[ObjectId(404)]).unwrap();
    assert_eq!(store.queue(CMD_REMOVE).unwrap().len(), 1);
}

#[test]
fn direct_force_requires_live_object() {
    let (store, broker) = setup();
    let id = ObjectId(3);
    assert_eq!(
        broker.set_direct_force(id, Vec3::X, Vec3::ZERO).unwrap_err(),
        AzError::UnknownObject(id)
    );

    install_body(&store, id, &Body::default(), BTreeMap::new(), BTreeMap::new());
    broker.set_direct_force(id, Vec3::X, Vec3::ZERO).unwrap();
    assert_eq!(store.queue(CMD_DIRECT_FORCE).unwrap().len(), 1);
}

#[test]
fn control_parts_clamps_booster_commands() {
    let (store, broker) = setup();
    let id = ObjectId(7);
    let mut boosters = BTreeMap::new();
    boosters.insert(
        "b0".to_string(),
        Booster::new(Vec3::ZERO, Vec3::Z, -1.0, 1.0),
    );
    install_body(&store, id, &Body::default(), boosters, BTreeMap::new());

    let spawned = broker
        .control_parts(
            id,
            &[CmdBooster {
                part_id: "b0".into(),
                force: 5.0,
            }],
            &[],
        )
        .unwrap();
    assert!(spawned.is_empty());

    // The broker never writes the bodies collection; the object document is
    // untouched until Leonard drains the command.
    let doc = store
        .collection(BODIES)
        .unwrap()
        .get_one(&id.to_string(), None)
        .unwrap();
    assert_eq!(doc["boosters"]["b0"]["current_force"], json!(0.0));

    // The queued command carries the summed body-local force and the clamped
    // per-part outputs for Leonard to merge.
    let cmds = store.queue(CMD_BOOSTER_FORCE).unwrap().drain();
    assert_eq!(cmds.len(), 1);
    let cmd: CmdBoosterForce = serde_json::from_value(cmds[0].clone()).unwrap();
    assert!((cmd.force - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    assert_eq!(cmd.parts.get("b0"), Some(&1.0));
}

#[test]
fn control_parts_rejects_unknown_part() {
    let (store, broker) = setup();
    let id = ObjectId(7);
    install_body(&store, id, &Body::default(), BTreeMap::new(), BTreeMap::new());

    let err = broker
        .control_parts(
            id,
            &[CmdBooster {
                part_id: "ghost".into(),
                force: 1.0,
            }],
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, AzError::BadInput(_)));
}

#[test]
fn factory_on_rotated_parent_ejects_world_rotated() {
    let (store, broker) = setup();
    broker.add_templates(vec![sphere_template("bullet")]).unwrap();

    let parent_id = ObjectId(7);
    let mut parent = Body::default();
    // 180 degrees around x: local +z becomes world -z.
    parent.orientation = Quat::from_rotation_x(std::f32::consts::PI);
    parent.velocity_lin = Vec3::new(1.0, 0.0, 0.0);

    let mut factories = BTreeMap::new();
    factories.insert(
        "f0".to_string(),
        Factory {
            position: Vec3::ZERO,
            direction: Vec3::Z,
            template_id: "bullet".into(),
            exit_speed: [2.0, 2.0],
        },
    );
    install_body(&store, parent_id, &parent, BTreeMap::new(), factories);

    let spawned = broker
        .control_parts(parent_id, &[], &[CmdFactory { part_id: "f0".into() }])
        .unwrap();
    assert_eq!(spawned.len(), 1);

    let cmds = store.queue(CMD_SPAWN).unwrap().drain();
    assert_eq!(cmds.len(), 1);
    let spawn: CmdSpawn = serde_json::from_value(cmds[0].clone()).unwrap();
    assert_eq!(spawn.object_id, spawned[0]);
    let expected = Vec3::new(1.0, 0.0, -2.0);
    assert!(
        (spawn.body.velocity_lin - expected).length() < 1e-5,
        "velocity {:?}",
        spawn.body.velocity_lin
    );
}

#[test]
fn get_all_object_ids_is_sorted() {
    let (store, broker) = setup();
    for id in [5u64, 1, 9] {
        install_body(&store, ObjectId(id), &Body::default(), BTreeMap::new(), BTreeMap::new());
    }
    let ids = broker.get_all_object_ids().unwrap();
    assert_eq!(ids, vec![ObjectId(1), ObjectId(5), ObjectId(9)]);
}

#[test]
fn get_fragments_resolves_template() {
    let (store, broker) = setup();
    let mut template = sphere_template("t1");
    template.fragments.insert(
        "hull".to_string(),
        FragmentMeta {
            kind: "raw".into(),
            url: "/templates/t1/hull".into(),
        },
    );
    broker.add_templates(vec![template]).unwrap();

    let id = ObjectId(2);
    let mut body = Body::default();
    body.template_id = "t1".into();
    install_body(&store, id, &body, BTreeMap::new(), BTreeMap::new());

    let out = broker.get_fragments(&[id, ObjectId(99)]).unwrap();
    let frags = out.get(&id).unwrap().as_ref().unwrap();
    assert_eq!(frags.get("hull").unwrap().url, "/templates/t1/hull");
    assert!(out.get(&ObjectId(99)).unwrap().is_none());
}
