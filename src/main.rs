use anyhow::{Context, Result};
use glam::Vec3;
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, Vector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use track_physics::assets::{MaterialLibrary, RenderMesh};
use track_physics::physics::{ObjectId, PhysicalObject, PhysicalObjectManager};
use track_physics::utils::logging::init_logging_with_file;
use track_physics::utils::math::{hpr_degrees_to_quat, parsing};
use track_physics::world::{PhysicsEvent, SceneObject, TrackObject, TrackObjectRef};
use track_physics::{load_physics_config, APP_NAME, VERSION};

const MATERIALS: &str = r#"
<materials>
    <material name="asphalt"/>
    <material name="goal" collision-reaction="push-soccer"/>
</materials>"#;

/// A small test track: a boulder rolling off the edge, a crash-reset gate,
/// an explosive barrel, a soccer ball and an exact jump pad
const SCENE: &str = r#"
<scene>
    <object id="boulder" xyz="58 4 0" size="2 2 2" dynamic="true"
            shape="sphere" mass="40" resetWhenTooLow="true" resetHeight="-20"/>
    <object id="gate" xyz="0 1 -10" size="4 2 1" dynamic="false"
            shape="box" crashReset="true"/>
    <object id="barrel" xyz="-3 0.75 2" size="1 1.5 1" dynamic="true"
            shape="cylinder_y" mass="10" reaction="explosive"/>
    <object id="ball" xyz="5 0.5 5" size="1 1 1" dynamic="true" soccer="true"
            shape="sphere" mass="0.5"/>
    <object id="jump" xyz="0 0.01 15" hpr="10 0 0" mesh="pad" dynamic="false"
            shape="exact" flatten="true"/>
</scene>"#;

fn main() -> Result<()> {
    // Optional first argument: session log file
    let log_file = std::env::args().nth(1).map(PathBuf::from);
    init_logging_with_file(log_file.as_deref());
    info!("{} {}", APP_NAME, VERSION);

    let config = load_physics_config();
    let materials = MaterialLibrary::from_xml(MATERIALS).context("Failed to parse materials")?;
    let mut manager = PhysicalObjectManager::new(config.clone());

    let ground = ColliderBuilder::cuboid(50.0, 0.5, 50.0)
        .translation(Vector::new(0.0, -0.5, 0.0))
        .build();
    manager.insert_track_collider(ground, materials.get("asphalt"));
    let goal = ColliderBuilder::cuboid(0.5, 2.0, 4.0)
        .translation(Vector::new(12.0, 2.0, 5.0))
        .build();
    manager.insert_track_collider(goal, materials.get("goal"));

    let doc = roxmltree::Document::parse(SCENE).context("Failed to parse scene")?;
    let mut objects: Vec<(ObjectId, TrackObjectRef)> = Vec::new();
    for node in doc.root_element().children().filter(|n| n.has_tag_name("object")) {
        let track = track_object(node, &materials)?;
        let is_dynamic = bool_attribute(node, "dynamic")?;
        let object = PhysicalObject::from_xml(is_dynamic, node, &track)?;
        match manager.add_object(object) {
            Ok(id) => objects.push((id, track)),
            Err(e) => warn!("Skipping '{}': {}", node.attribute("id").unwrap_or("?"), e),
        }
    }
    info!("Scene ready with {} physical objects", manager.object_count());

    // A kart driving through the gate, and one kicking the ball towards the goal
    let kart = RigidBodyBuilder::dynamic()
        .translation(Vector::new(0.0, 0.6, -4.0))
        .linvel(Vector::new(0.0, 0.0, -8.0))
        .build();
    manager.insert_kart(kart, ColliderBuilder::cuboid(0.5, 0.5, 1.0).build(), 0);
    let striker = RigidBodyBuilder::dynamic()
        .translation(Vector::new(1.0, 0.6, 5.0))
        .linvel(Vector::new(12.0, 0.0, 0.0))
        .build();
    manager.insert_kart(striker, ColliderBuilder::ball(0.5).build(), 1);

    let ticks = (3.0 / config.tick_length) as usize;
    for tick in 0..ticks {
        manager.step(config.tick_length);
        if tick == ticks / 2 {
            info!("Boom");
            manager.handle_explosion(Vec3::new(-3.0, 0.0, 3.0), 5.0, None);
        }
        for event in manager.drain_events() {
            log_event(&manager, &event);
        }
    }

    for (id, track) in &objects {
        let track = track.borrow();
        info!("{} '{}' ends at {}", id, track.id(), track.position());
    }
    Ok(())
}

fn log_event(manager: &PhysicalObjectManager, event: &PhysicsEvent) {
    let name = |id: &ObjectId| manager.get(*id).map(|o| o.id().to_string()).unwrap_or_default();
    match event {
        PhysicsEvent::KartInteraction { kart, object, effect, tick } => {
            info!("[{}] kart {} touched '{}': {:?}", tick, kart, name(object), effect)
        }
        PhysicsEvent::SoccerBallTouched { kart, tick, .. } => info!("[{}] kart {} kicked the ball", tick, kart),
        PhysicsEvent::ObjectReset { object, reason, tick } => {
            info!("[{}] '{}' reset ({:?})", tick, name(object), reason)
        }
        PhysicsEvent::ObjectBroken { object, tick } => info!("[{}] '{}' broke", tick, name(object)),
        PhysicsEvent::ObjectHit { .. } => {}
    }
}

/// Scene node for an `<object>` element: placement plus either a box of
/// `size` or one of the demo meshes
fn track_object(node: roxmltree::Node<'_, '_>, materials: &MaterialLibrary) -> Result<TrackObjectRef> {
    let id = node.attribute("id").unwrap_or_default();
    let position = vec3_attribute(node, "xyz", Vec3::ZERO)?;
    let hpr = vec3_attribute(node, "hpr", Vec3::ZERO)?;
    let scale = vec3_attribute(node, "scale", Vec3::ONE)?;

    let object = match node.attribute("mesh") {
        Some("pad") => {
            let mesh = RenderMesh::ground_quad("pad", 3.0, 0.0, materials.get("asphalt"));
            SceneObject::with_mesh(id, Arc::new(mesh))
        }
        Some(other) => anyhow::bail!("Unknown mesh '{}' for '{}'", other, id),
        None => SceneObject::new(id, 0.5 * vec3_attribute(node, "size", Vec3::ONE)?),
    };
    let mut object = object.at(position).rotated(hpr_degrees_to_quat(hpr)).scaled(scale);
    if bool_attribute(node, "soccer")? {
        object = object.soccer_ball();
    }
    let shared: TrackObjectRef = object.into_shared();
    Ok(shared)
}

fn vec3_attribute(node: roxmltree::Node<'_, '_>, name: &str, default: Vec3) -> Result<Vec3> {
    match node.attribute(name) {
        Some(value) => parsing::parse_vec3(value).map_err(anyhow::Error::msg),
        None => Ok(default),
    }
}

fn bool_attribute(node: roxmltree::Node<'_, '_>, name: &str) -> Result<bool> {
    match node.attribute(name) {
        Some(value) => parsing::parse_bool(value).map_err(anyhow::Error::msg),
        None => Ok(false),
    }
}
