use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::rc::Rc;
use track_physics::assets::AssetCache;
use track_physics::physics::{
    Axis, BodyType, ObjectId, ObjectSettings, ObjectState, PhysicalObject, PhysicalObjectManager, UserPointer,
};
use track_physics::world::{PhysicsEvent, PhysicsWorld, SceneObject, TrackObjectRef};
use track_physics::PhysicsConfig;

fn scene_object(position: Vec3) -> Rc<RefCell<SceneObject>> {
    SceneObject::new("object", Vec3::splat(0.5)).at(position).into_shared()
}

fn init(world: &mut PhysicsWorld, is_dynamic: bool, settings: &ObjectSettings, track: &TrackObjectRef) -> PhysicalObject {
    let mut object = PhysicalObject::new(is_dynamic, settings, track);
    object
        .init(
            world,
            &mut AssetCache::new(),
            UserPointer::physical_object(ObjectId::new(0, 0)),
            &PhysicsConfig::default(),
        )
        .unwrap();
    object
}

#[test]
fn test_boulder_reset_when_too_low() {
    // A boulder at height 0 that resets below -5 falls into the void
    let config = PhysicsConfig::default();
    let mut world = PhysicsWorld::new(&config);
    let scene = scene_object(Vec3::ZERO);
    let track: TrackObjectRef = scene.clone();
    let settings = ObjectSettings::from_xml_str(
        r#"<object id="boulder" shape="sphere" mass="10" radius="0.5" resetWhenTooLow="true" resetHeight="-5"/>"#,
    )
    .unwrap();
    let mut object = init(&mut world, true, &settings, &track);

    let mut resets = 0;
    for _ in 0..(3.0 / config.tick_length) as usize {
        world.step(config.tick_length);
        if object.update(&mut world, config.tick_length) {
            resets += 1;
            // Reset happens in the same update: never seen below the limit
            let (position, _) = object.graphical_pose(&world).unwrap();
            assert!(position.length() < 1e-5);
            assert_eq!(object.linear_velocity(&world).unwrap(), Vec3::ZERO);
            assert_eq!(scene.borrow().position, Vec3::ZERO);
        } else {
            assert!(scene.borrow().position.y >= -5.0);
        }
    }
    assert!(resets >= 1);
    object.destroy(&mut world);
}

#[test]
fn test_reset_returns_to_rest_pose() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let rotation = Quat::from_rotation_y(0.7);
    let scene = SceneObject::new("cone", Vec3::new(0.5, 1.0, 0.5))
        .at(Vec3::new(3.0, 2.0, 1.0))
        .rotated(rotation)
        .into_shared();
    let track: TrackObjectRef = scene.clone();
    let mut object = init(&mut world, true, &ObjectSettings::new(BodyType::Cone(Axis::Y), 0.0, 2.0), &track);

    for _ in 0..50 {
        world.step(1.0 / 120.0);
        object.update(&mut world, 1.0 / 120.0);
    }
    object.move_to(&mut world, Vec3::new(-4.0, 9.0, 0.0), Quat::from_rotation_x(1.0));
    object.reset(&mut world);

    let (position, orientation) = object.graphical_pose(&world).unwrap();
    assert!((position - Vec3::new(3.0, 2.0, 1.0)).length() < 1e-4);
    assert!(orientation.dot(rotation).abs() > 0.9999);
    assert_eq!(object.linear_velocity(&world).unwrap(), Vec3::ZERO);
    assert_eq!(object.angular_velocity(&world).unwrap(), Vec3::ZERO);
    object.destroy(&mut world);
}

#[test]
fn test_add_remove_add_equals_add() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let track: TrackObjectRef = scene_object(Vec3::new(0.0, 5.0, 0.0));
    let mut object = init(&mut world, true, &ObjectSettings::new(BodyType::Box, 0.0, 1.0), &track);
    let handle = object.body_handle().unwrap();

    object.add_body(&mut world);
    object.remove_body(&mut world);
    object.add_body(&mut world);

    assert_eq!(object.state(), ObjectState::Active);
    assert!(world.is_registered(handle));
    assert_eq!(world.body_count(), 1);

    // Still simulated
    world.step(1.0 / 60.0);
    world.step(1.0 / 60.0);
    let (position, _) = object.graphical_pose(&world).unwrap();
    assert!(position.y < 5.0);
    object.destroy(&mut world);
}

#[test]
fn test_explicit_sphere_radius() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    // The visual is much bigger than the declared radius
    let track: TrackObjectRef = SceneObject::new("ball", Vec3::splat(3.0)).into_shared();
    let object = init(&mut world, true, &ObjectSettings::new(BodyType::Sphere, 0.5, 1.0), &track);
    assert_eq!(object.radius(), 0.5);

    let hit = object
        .cast_ray(&world, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -10.0, 0.0), false)
        .unwrap();
    assert!((hit.point.y - 0.5).abs() < 1e-4);
    object.destroy(&mut world);
}

#[test]
fn test_box_ray_cast_outward_normal() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let track: TrackObjectRef = SceneObject::new("crate", Vec3::new(1.0, 0.5, 2.0))
        .at(Vec3::new(0.0, 1.0, 0.0))
        .into_shared();
    let object = init(&mut world, false, &ObjectSettings::new(BodyType::Box, 0.0, 0.0), &track);

    let hit = object
        .cast_ray(&world, Vec3::new(0.0, 1.0, -10.0), Vec3::new(0.0, 1.0, 10.0), false)
        .unwrap();
    assert!((hit.point - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-4);
    assert!((hit.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-4);

    let hit = object
        .cast_ray(&world, Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -10.0, 0.0), false)
        .unwrap();
    assert!((hit.normal - Vec3::Y).length() < 1e-4);
    assert!((hit.point.y - 1.5).abs() < 1e-4);
    object.destroy(&mut world);
}

#[test]
fn test_set_interaction_explode_only() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let track: TrackObjectRef = scene_object(Vec3::ZERO);
    let settings =
        ObjectSettings::from_xml_str(r#"<object shape="box" crashReset="true" flattenKart="true"/>"#).unwrap();
    let mut object = init(&mut world, false, &settings, &track);

    object.set_interaction("explode");
    assert!(object.is_explode_kart_object());
    assert!(!object.is_crash_reset());
    assert!(!object.is_flatten_kart_object());
    object.destroy(&mut world);
}

#[test]
fn test_static_crash_reset_box_moved_below_track() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let scene = scene_object(Vec3::new(0.0, 1.0, 0.0));
    let track: TrackObjectRef = scene.clone();
    let settings = ObjectSettings::from_xml_str(
        r#"<object shape="box" mass="0" crashReset="true" resetWhenTooLow="true" resetHeight="-10"/>"#,
    )
    .unwrap();
    let mut object = init(&mut world, false, &settings, &track);

    object.move_to(&mut world, Vec3::new(0.0, -100.0, 0.0), Quat::IDENTITY);
    world.step(1.0 / 60.0);
    assert!(!object.update(&mut world, 1.0 / 60.0));

    // Static objects stay where they were put
    let (position, _) = object.graphical_pose(&world).unwrap();
    assert!((position.y + 100.0).abs() < 1e-4);
    assert_eq!(scene.borrow().position, Vec3::new(0.0, 1.0, 0.0));
    assert!(object.is_crash_reset());
    object.destroy(&mut world);
}

#[test]
fn test_dynamic_graphics_follow_move() {
    let mut world = PhysicsWorld::new(&PhysicsConfig::default());
    let scene = scene_object(Vec3::ZERO);
    let track: TrackObjectRef = scene.clone();
    let mut object = init(&mut world, true, &ObjectSettings::new(BodyType::Box, 0.0, 1.0), &track);

    object.move_to(&mut world, Vec3::new(0.0, -100.0, 0.0), Quat::IDENTITY);
    world.step(1.0 / 120.0);
    assert!(!object.update(&mut world, 1.0 / 120.0));

    let position = scene.borrow().position;
    assert!((position.y + 100.0).abs() < 0.1);
    object.destroy(&mut world);
}

#[test]
fn test_static_reset_when_configured() {
    let config = PhysicsConfig {
        reset_static_when_too_low: true,
        ..PhysicsConfig::default()
    };
    let mut manager = PhysicalObjectManager::new(config);
    let scene = scene_object(Vec3::ZERO);
    let track: TrackObjectRef = scene.clone();
    let id = manager
        .add_object_from_xml(false, r#"<object shape="box" resetWhenTooLow="true" resetHeight="-10"/>"#, &track)
        .unwrap();

    manager.move_object(id, Vec3::new(0.0, -100.0, 0.0), Quat::IDENTITY).unwrap();
    let tick = manager.config().tick_length;
    manager.step(tick);

    let object = manager.get(id).unwrap();
    let (position, _) = object.graphical_pose(manager.world()).unwrap();
    assert!(position.length() < 1e-5);
    assert!(manager
        .drain_events()
        .iter()
        .any(|e| matches!(e, PhysicsEvent::ObjectReset { object, .. } if *object == id)));
}
