//! Triangle demo
//!
//! Draws a vertex-coloured triangle next to a textured quad while the camera
//! orbits the pair. Close the window or press Escape to quit.

mod config;
mod texture;

use glfw::{Action, Key, WindowEvent};
use lights_engine::foundation::logging;
use lights_engine::prelude::*;

use crate::config::DemoConfig;
use crate::texture::{checkerboard, load_png, Pixels};

const CONFIG_PATH: &str = "lights.toml";
const CAMERA_PITCH: f32 = 0.35;

/// Shift every vertex along X so the two meshes sit side by side
fn offset_x(mut mesh: MeshData, dx: f32) -> MeshData {
    for vertex in &mut mesh.vertices {
        vertex.position[0] += dx;
    }
    mesh
}

fn quad_pixels(config: &DemoConfig) -> Pixels {
    match config.texture_path.as_deref() {
        Some(path) => match load_png(path) {
            Ok(pixels) => pixels,
            Err(e) => {
                log::warn!("{}; using a checkerboard instead", e);
                checkerboard(256, 8)
            }
        },
        None => checkerboard(256, 8),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DemoConfig::load_or_default(CONFIG_PATH)?;
    logging::init_with_level(&config.application.engine.log_level);
    log::info!("Starting triangle demo");

    let mut window = GlfwWindow::new(&config.application.window)?;
    let mut renderer = VulkanRenderer::new(&mut window, &config.application.renderer)?;

    let pipeline = renderer.create_pipeline(&config.application.renderer.shaders)?;

    let triangle = renderer.create_mesh(&offset_x(MeshData::triangle(), -0.8))?;
    let vertex_colour = renderer.create_material(pipeline, None, [1.0, 1.0, 1.0, 1.0])?;
    renderer.add_drawable(triangle, vertex_colour)?;

    let pixels = quad_pixels(&config);
    let texture = renderer.create_texture(pixels.width, pixels.height, &pixels.rgba)?;
    let quad = renderer.create_mesh(&offset_x(MeshData::quad(), 0.8))?;
    let textured = renderer.create_material(pipeline, Some(texture), [1.0, 0.95, 0.85, 1.0])?;
    renderer.add_drawable(quad, textured)?;

    let mut camera = Camera::perspective(
        Vec3::new(0.0, 0.0, config.orbit_radius),
        60.0,
        renderer.aspect_ratio(),
        0.1,
        100.0,
    );
    let start = window.time();

    while !window.should_close() {
        window.poll_events();

        let events: Vec<WindowEvent> = window.flush_events().map(|(_, event)| event).collect();
        for event in events {
            match event {
                WindowEvent::FramebufferSize(width, height) => {
                    renderer.resize(width.max(0) as u32, height.max(0) as u32);
                }
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => window.set_should_close(true),
                _ => {}
            }
        }

        let elapsed = (window.time() - start) as f32;
        camera.orbit(
            Vec3::zeros(),
            config.orbit_radius,
            elapsed * config.orbit_speed,
            CAMERA_PITCH,
        );
        camera.set_aspect_ratio(renderer.aspect_ratio());

        renderer.draw_frame(&camera)?;
    }

    renderer.wait_idle()?;
    let stats = renderer.frame_stats();
    log::info!(
        "Presented {} frames, skipped {}, rebuilt the swapchain {} times",
        stats.frames_presented,
        stats.frames_skipped,
        stats.swapchain_recreations
    );

    Ok(())
}
