//! Rendering System
//!
//! Turns an updated [`Scene`] into pixels in a camera's [`RenderTarget`].
//!
//! # Frame flow
//!
//! 1. Resolve lights to world space (rendering spot shadow maps)
//! 2. Fill the background, clear depth and the gBuffer
//! 3. Geometry stage: project meshes, split opaque / transparent
//! 4. Rasterize opaque triangles (shade now, or fill the gBuffer)
//! 5. Deferred targets: shade the gBuffer on the worker pool
//! 6. Fog empty pixels with the scene medium
//! 7. Rasterize transparent triangles back to front, always shaded now
//!
//! Empty-pixel fog runs before the transparent pass: transparent fragments
//! fog the segment in front of themselves while shading, so the sky behind
//! them must already be fogged when they blend over it.
//! 8. Draw the wireframe overlay
//!
//! The worker pool is created on the first deferred frame and lives until
//! [`Renderer::shutdown`] (or drop).

pub mod background;
pub mod fog;
pub mod fragment;
pub mod geometry;
pub mod lighting;
pub mod rasterizer;
pub mod scheduler;
pub mod settings;
pub mod shading;
pub mod shadow;
pub mod target;

pub use fragment::Fragment;
pub use geometry::{FrameView, Triangle, TriangleLists, build_triangles};
pub use lighting::{LightSample, ResolvedKind, ResolvedLight};
pub use rasterizer::{RasterPass, Rasterizer};
pub use scheduler::ShadingScheduler;
pub use settings::RendererSettings;
pub use shading::ShadingContext;
pub use shadow::ShadowMap;
pub use target::RenderTarget;

use std::time::Instant;

use glam::Vec2;

use crate::color::Color;
use crate::errors::{RasterError, Result};
use crate::renderer::background::fill_background;
use crate::renderer::fog::sample_fog;
use crate::renderer::rasterizer::unlit;
use crate::renderer::shadow::render_shadow_map;
use crate::renderer::target::EMPTY_DEPTH;
use crate::resources::volume::Volume;
use crate::scene::{CameraKey, NodeHandle, Scene};

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub opaque_triangles: usize,
    pub transparent_triangles: usize,
    /// Fragments that passed the depth test.
    pub fragments: usize,
    pub lights: usize,
    pub shadow_maps: usize,
    /// Brightest shaded luminance. Only tracked for auto-exposure cameras
    /// (`white_point == 0`), otherwise 0.
    pub max_luminance: f32,
}

/// Framebuffer pointer shared by the deferred workers.
#[derive(Clone, Copy)]
struct FramebufferPtr(*mut Color);

// SAFETY: workers write disjoint indices and the buffer outlives the batch.
unsafe impl Send for FramebufferPtr {}
unsafe impl Sync for FramebufferPtr {}

impl FramebufferPtr {
    // Accessed through a method so closures capture the wrapper, not the
    // raw pointer field.
    #[inline]
    fn get(self) -> *mut Color {
        self.0
    }
}

pub struct Renderer {
    settings: RendererSettings,
    scheduler: Option<ShadingScheduler>,
}

impl Renderer {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings, scheduler: None }
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Changing `worker_count` takes effect after [`Renderer::shutdown`].
    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Whether the deferred worker pool is currently running.
    #[must_use]
    pub fn has_workers(&self) -> bool {
        self.scheduler.as_ref().is_some_and(ShadingScheduler::is_running)
    }

    /// Renders the scene's active camera.
    pub fn render_active(&mut self, scene: &mut Scene) -> Result<FrameStats> {
        let camera = scene
            .active_camera
            .ok_or_else(|| RasterError::CameraNotFound("no active camera".to_string()))?;
        self.render(scene, camera)
    }

    /// Renders `scene` into the target of the camera on `camera_node`.
    ///
    /// Call [`Scene::update`] first; this reads the cached world matrices.
    pub fn render(&mut self, scene: &mut Scene, camera_node: NodeHandle) -> Result<FrameStats> {
        let key = scene
            .camera_components
            .get(camera_node)
            .copied()
            .filter(|&key| scene.cameras.contains_key(key))
            .ok_or_else(|| RasterError::CameraNotFound(format!("{camera_node:?}")))?;

        // The target leaves the scene for the frame so the scene can be
        // shared with the workers.
        let mut target = std::mem::take(&mut scene.cameras[key].target);
        let result = self.render_into(scene, key, &mut target);

        let camera = &mut scene.cameras[key];
        camera.target = target;
        if let Ok(stats) = &result {
            if stats.max_luminance > 0.0 {
                camera.maximum_color = stats.max_luminance;
            }
        }
        result
    }

    fn render_into(&mut self, scene: &Scene, key: CameraKey, target: &mut RenderTarget) -> Result<FrameStats> {
        if target.is_empty() {
            return Err(RasterError::InvalidTargetSize { width: target.width(), height: target.height() });
        }
        let started = Instant::now();
        let camera = &scene.cameras[key];
        let view = FrameView::from_camera(camera, target.size());
        let mut stats = FrameStats::default();

        // 1. Lights
        let mut lights = Vec::with_capacity(scene.light_components.len());
        for (light, transform) in scene.iter_lights() {
            let mut resolved = ResolvedLight::resolve(light, transform);
            if self.settings.shadows && light.cast_shadows {
                if let Some(map) = render_shadow_map(scene, light, transform)? {
                    resolved = resolved.with_shadow(map);
                    stats.shadow_maps += 1;
                }
            }
            lights.push(resolved);
        }
        stats.lights = lights.len();

        let environment = &scene.environment;
        let fog = environment.fog.as_ref().filter(|v| !v.is_clear());
        let ctx = ShadingContext::new(&lights, environment.ambient, view.camera_position, fog)
            .with_exposure_tracking(self.settings.track_exposure && camera.white_point == 0.0);

        // 2. Background
        fill_background(target, &environment.background, &view);

        // 3. Geometry
        let mut lists = build_triangles(scene, &view, false);
        stats.opaque_triangles = lists.opaque.len();
        stats.transparent_triangles = lists.transparent.len();

        // 4. Opaque
        let deferred = target.is_deferred();
        let pass = if deferred { RasterPass::Deferred } else { RasterPass::Immediate };
        let mut rasterizer = Rasterizer::new(pass, &view, &scene.settings).with_shading(&ctx);
        if scene.settings.wireframe {
            rasterizer = rasterizer.with_wireframe(self.settings.wireframe_color);
        }
        for tri in &lists.opaque {
            stats.fragments += rasterizer.rasterize(tri, target);
        }

        // 5./6. Deferred shading and empty-pixel fog
        let empty_fog = fog.filter(|_| self.settings.screen_space_fog);
        let workers_fog = empty_fog.filter(|v| v.god_rays);
        if deferred {
            self.shade_gbuffer(target, &ctx, &view, scene.settings.full_bright, workers_fog)?;
        }
        if let Some(volume) = empty_fog {
            if !(deferred && workers_fog.is_some()) {
                fog_empty_pixels(target, &view, &lights, volume);
            }
        }

        // 7. Transparent
        lists.sort_transparent();
        rasterizer.pass = RasterPass::Immediate;
        for tri in &lists.transparent {
            stats.fragments += rasterizer.rasterize(&tri.triangle, target);
        }

        // 8. Overlay
        target.draw_overlay();

        stats.max_luminance = ctx.max_luminance();
        log::trace!(
            "Frame {}x{}: {} opaque / {} transparent triangles, {} fragments, {} lights in {:?}",
            target.width(),
            target.height(),
            stats.opaque_triangles,
            stats.transparent_triangles,
            stats.fragments,
            stats.lights,
            started.elapsed()
        );
        Ok(stats)
    }

    fn shade_gbuffer(
        &mut self,
        target: &mut RenderTarget,
        ctx: &ShadingContext<'_>,
        view: &FrameView,
        full_bright: bool,
        empty_fog: Option<&Volume>,
    ) -> Result<()> {
        if !self.has_workers() {
            self.scheduler = Some(ShadingScheduler::new(self.settings.resolved_worker_count())?);
        }
        let Some(scheduler) = self.scheduler.as_mut() else {
            return Err(RasterError::SchedulerShutDown);
        };

        let width = target.width() as usize;
        let gbuffer = target.gbuffer.as_slice();
        let framebuffer = FramebufferPtr(target.framebuffer.as_mut_ptr());
        let len = gbuffer.len().min(target.framebuffer.len());

        let job = |k: usize, n: usize| {
            let mut i = k;
            while i < len {
                // SAFETY: `i` is in bounds and only worker `i % n` touches it.
                let pixel = unsafe { &mut *framebuffer.get().add(i) };
                let fragment = &gbuffer[i];

                if fragment.valid {
                    if let Some(material) = &fragment.material {
                        let mut fragment = fragment.clone();
                        if !material.is_alpha_cutout() {
                            fragment.base_color = material.base_color(&fragment.uv);
                        }
                        *pixel = if full_bright {
                            unlit(material, &fragment, *pixel)
                        } else {
                            material.shade(&fragment, *pixel, ctx)
                        };
                    }
                } else if let Some(volume) = empty_fog {
                    *pixel = fog_empty_pixel(i, width, *pixel, view, ctx.lights, volume);
                }
                i += n;
            }
        };

        scheduler.dispatch(&job)
    }

    /// Stops the worker pool. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererSettings::default())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn fog_empty_pixel(
    index: usize,
    width: usize,
    background: Color,
    view: &FrameView,
    lights: &[ResolvedLight],
    volume: &Volume,
) -> Color {
    let pixel = Vec2::new((index % width) as f32 + 0.5, (index / width) as f32 + 0.5);
    sample_fog(view.far_point(pixel), view.camera_position, background, lights, volume)
}

fn fog_empty_pixels(target: &mut RenderTarget, view: &FrameView, lights: &[ResolvedLight], volume: &Volume) {
    let width = target.width() as usize;
    for (i, (color, &z)) in target.framebuffer.iter_mut().zip(&target.z_buffer).enumerate() {
        if z <= EMPTY_DEPTH {
            *color = fog_empty_pixel(i, width, *color, view, lights, volume);
        }
    }
}
