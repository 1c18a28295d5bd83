//! Scene viewer demo
//!
//! Builds a small thoracic scene (heart, vessel tree, ribs, a lesion and
//! annotations), orbits a camera around it and logs culling statistics.
//! No window is opened; the renderer side is represented by the render
//! batches each frame produces.
//!
//! Usage: `scene_viewer [config.toml|config.ron]`

use medvis_scene::foundation::logging;
use medvis_scene::foundation::math::{utils, Quat, Vec3};
use medvis_scene::foundation::time::Timer;
use medvis_scene::prelude::*;
use medvis_scene::scene::RoleVisibility;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Demo configuration
const FRAME_COUNT: u32 = 240;
const FIXED_DELTA: f32 = 1.0 / 60.0;
const ORBIT_RADIUS: f32 = 40.0;
const ORBIT_SPEED: f32 = 0.6; // radians per second
const RIB_PAIRS: usize = 12;
const VESSEL_SEGMENTS: usize = 24;
const REPORT_EVERY: u32 = 60;

#[derive(thiserror::Error, Debug)]
enum ViewerError {
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

struct SceneViewerApp {
    scene: SceneGraph,
    camera: Camera,
    timer: Timer,
    orbit_angle: f32,
    heart: NodeKey,
}

impl SceneViewerApp {
    fn new(mut scene: SceneGraph) -> Result<Self, ViewerError> {
        log::info!("Creating scene viewer...");
        let build_time = Stopwatch::start_new();
        let heart = build_thorax(&mut scene)?;
        log::info!(
            "Thorax scene built with {} nodes in {:.2} ms",
            scene.node_count(),
            build_time.elapsed_millis()
        );

        let mut camera = Camera::perspective(Vec3::new(0.0, 5.0, ORBIT_RADIUS), 45.0, 16.0 / 9.0, 0.1, 500.0);
        camera.look_at(Vec3::zeros(), Vec3::y());

        Ok(Self {
            scene,
            camera,
            timer: Timer::new(),
            orbit_angle: 0.0,
            heart,
        })
    }

    fn run(&mut self) -> Result<(), ViewerError> {
        if self.scene.play_animation(self.heart, "heartbeat") {
            log::info!("Heartbeat animation started");
        }

        for frame in 1..=FRAME_COUNT {
            self.timer.tick();
            self.orbit_angle += ORBIT_SPEED * FIXED_DELTA;
            self.camera.set_position(Vec3::new(
                ORBIT_RADIUS * self.orbit_angle.sin(),
                5.0,
                ORBIT_RADIUS * self.orbit_angle.cos(),
            ));

            if frame == FRAME_COUNT / 2 {
                let visible = self.scene.apply_role_visibility(ViewerRole::Student);
                log::info!("Switched to student view ({} medical nodes visible)", visible);
            }

            self.scene.update(FIXED_DELTA);
            let result = self.scene.cull(&mut self.camera)?;

            if frame % REPORT_EVERY == 0 {
                let stats = &result.statistics;
                log::info!(
                    "Frame {:>3} @ {:>5.1} deg: {}/{} visible, culled [hidden {}, lod {}, distance {}, frustum {}], {} batches, {:.3} ms",
                    frame,
                    utils::rad_to_deg(self.orbit_angle) % 360.0,
                    stats.visible_nodes,
                    stats.total_nodes,
                    stats.hidden_culled,
                    stats.lod_culled,
                    stats.distance_culled,
                    stats.frustum_culled,
                    stats.batch_count,
                    stats.elapsed.as_secs_f64() * 1000.0
                );
                for batch in &result.render_batches {
                    log::debug!("  batch {} x{} ({} bytes)", batch.id, batch.instance_count, batch.instance_bytes().len());
                }
            }
        }

        log::info!(
            "Ran {} frames in {:.2}s wall time",
            self.timer.frame_count(),
            self.timer.total_time()
        );
        Ok(())
    }
}

fn mesh_node(
    scene: &mut SceneGraph,
    id: &str,
    parent: Option<&str>,
    material: &str,
    position: Vec3,
) -> Result<NodeKey, SceneError> {
    let key = scene.create_node(id, id, NodeType::Mesh);
    if let Some(node) = scene.node_mut(key) {
        node.render_state.shader = Some("tissue_pbr".into());
        node.render_state.material = Some(material.into());
    }
    scene.add_node(key, parent)?;
    scene.set_position(key, position);
    Ok(key)
}

fn build_thorax(scene: &mut SceneGraph) -> Result<NodeKey, SceneError> {
    let mut rng = StdRng::seed_from_u64(2024);

    let thorax = scene.create_node("thorax", "Thorax", NodeType::Group);
    scene.add_node(thorax, None)?;

    // Heart with a pulsing scale track
    let heart = mesh_node(scene, "heart", Some("thorax"), "myocardium", Vec3::new(1.0, 0.0, 0.0))?;
    scene.set_medical_data(
        heart,
        MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::High).with_organ_system("cardiovascular"),
    );
    scene.set_scale(heart, Vec3::new(3.0, 3.5, 3.0));
    scene.set_lod(
        heart,
        Lod::new(
            vec![30.0, 80.0],
            vec![MeshHandle::new("heart_high"), MeshHandle::new("heart_medium"), MeshHandle::new("heart_low")],
        ),
    );
    let beat = Animation::new("heartbeat", AnimationTarget::Transform(TransformProperty::Scale), 0.8)
        .with_keyframe(Keyframe::new(0.0, KeyframeValue::Vector(Vec3::new(3.0, 3.5, 3.0))))
        .with_keyframe(
            Keyframe::new(0.2, KeyframeValue::Vector(Vec3::new(3.3, 3.8, 3.3)))
                .with_interpolation(Interpolation::Cubic),
        )
        .with_keyframe(
            Keyframe::new(0.8, KeyframeValue::Vector(Vec3::new(3.0, 3.5, 3.0)))
                .with_interpolation(Interpolation::Cubic),
        )
        .looping(true);
    scene.add_animation(heart, beat);

    // Vessel tree: a jittered chain of segments
    let vessels = scene.create_node("vessels", "Vessels", NodeType::Group);
    scene.add_node(vessels, Some("thorax"))?;
    let mut parent = String::from("vessels");
    for i in 0..VESSEL_SEGMENTS {
        let id = format!("vessel_{i}");
        let offset = Vec3::new(rng.gen_range(-0.4..0.4), 1.5, rng.gen_range(-0.4..0.4));
        let segment = mesh_node(scene, &id, Some(&parent), "blood_vessel", offset)?;
        scene.set_scale(segment, Vec3::new(0.4, 1.5, 0.4));
        scene.set_medical_data(
            segment,
            MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::Medium).with_organ_system("cardiovascular"),
        );
        parent = id;
    }

    // Rib cage
    let ribs = scene.create_node("ribs", "Ribs", NodeType::Group);
    scene.add_node(ribs, Some("thorax"))?;
    for i in 0..RIB_PAIRS {
        let y = 8.0 - i as f32 * 1.4;
        for (side, x) in [("l", -6.0), ("r", 6.0)] {
            let rib = mesh_node(scene, &format!("rib_{side}{i}"), Some("ribs"), "bone", Vec3::new(x, y, 0.0))?;
            scene.set_scale(rib, Vec3::new(5.0, 0.3, 8.0));
            let tilt = if x < 0.0 { -15.0 } else { 15.0 };
            scene.set_rotation(rib, Quat::from_axis_angle(&Vec3::z_axis(), utils::deg_to_rad(tilt)));
            scene.set_medical_data(
                rib,
                MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::Low).with_organ_system("skeletal"),
            );
        }
    }

    // Lesion: only clinicians see it
    let lesion = mesh_node(scene, "lesion", Some("heart"), "lesion_highlight", Vec3::new(0.3, 0.2, 0.4))?;
    scene.set_scale(lesion, Vec3::new(0.1, 0.1, 0.1));
    scene.set_medical_data(
        lesion,
        MedicalData::new(MedicalType::Pathology, ClinicalRelevance::Critical)
            .with_roles(RoleVisibility::RADIOLOGIST | RoleVisibility::SURGEON)
            .with_metadata("finding", "suspected thrombus"),
    );

    let label = scene.create_node("lesion_label", "Lesion label", NodeType::Annotation);
    scene.add_node(label, Some("thorax"))?;
    scene.set_position(label, Vec3::new(4.0, 4.0, 2.0));
    scene.set_medical_data(label, MedicalData::new(MedicalType::Annotation, ClinicalRelevance::Medium));

    Ok(heart)
}

fn create_scene() -> Result<SceneGraph, ViewerError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading scene config from {}", path);
            Ok(SceneGraph::from_config_file(path)?)
        }
        None => Ok(SceneGraph::new()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    log::info!("Starting scene viewer demo");

    let scene = create_scene()?;
    let mut app = SceneViewerApp::new(scene)?;

    match app.run() {
        Ok(()) => {
            log::info!("Scene viewer completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scene viewer failed: {}", e);
            Err(e.into())
        }
    }
}
