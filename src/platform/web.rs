//! Browser host
//!
//! - `DomGeometry`: measures the card container and its marker elements
//! - `CanvasSurface`: 2D canvas render surface, optionally blurred
//! - `RafScheduler`: `requestAnimationFrame` scheduling
//! - `OrientationTilt`: tilt fed by a host-registered `deviceorientation` listener
//! - `ConfettiHandle`: the `wasm_bindgen` face of one controller

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, DeviceOrientationEvent, DomRect, Element, HtmlCanvasElement};

use super::{FrameHandle, FrameScheduler, GeometryProvider, LayoutRect, LayoutSnapshot, TiltSource};
use crate::config::SimulationConfig;
use crate::consts::CONFETTI_ASPECT;
use crate::controller::{ConfettiController, ControllerInputs};
use crate::renderer::{RenderSurface, Sprite, SurfaceSet};
use crate::status::StatusFlags;

/// Marker attributes looked up inside the container
const BOX_SELECTOR: &str = "[data-confetti-box]";
const FLOOR_SELECTOR: &str = "[data-confetti-floor]";
const LEDGE_SELECTOR: &str = "[data-confetti-ledge]";
const ENVELOPE_SELECTOR: &str = "[data-confetti-envelope]";

/// Blur radius (canvas px) per blur tier
const BLUR_STEP_PX: f32 = 1.5;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // Already initialised when several modules share the page
    let _ = console_log::init_with_level(log::Level::Info);
}

fn layout_rect(rect: &DomRect) -> LayoutRect {
    LayoutRect::new(
        rect.x() as f32,
        rect.y() as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

/// Layout measurement through `getBoundingClientRect`
pub struct DomGeometry {
    container: Element,
}

impl DomGeometry {
    pub fn new(container: Element) -> Self {
        Self { container }
    }

    fn marker(&self, selector: &str) -> Option<LayoutRect> {
        let element = self.container.query_selector(selector).ok().flatten()?;
        Some(layout_rect(&element.get_bounding_client_rect()))
    }
}

impl GeometryProvider for DomGeometry {
    fn measure(&mut self) -> Option<LayoutSnapshot> {
        if !self.container.is_connected() {
            return None;
        }
        let window = web_sys::window()?;
        let container = layout_rect(&self.container.get_bounding_client_rect());
        if container.is_empty() {
            return None;
        }
        Some(LayoutSnapshot {
            container,
            box_rect: self.marker(BOX_SELECTOR),
            floor_marker: self.marker(FLOOR_SELECTOR),
            ledge_marker: self.marker(LEDGE_SELECTOR),
            envelope: self.marker(ENVELOPE_SELECTOR),
            device_pixel_ratio: window.device_pixel_ratio() as f32,
        })
    }
}

/// 2D canvas surface in device pixels
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// CSS filter, re-applied whenever a resize resets the context
    filter: Option<String>,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Option<Self> {
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self {
            canvas,
            ctx,
            filter: None,
        })
    }

    /// Surface for blur tier `tier`; deeper tiers blur more
    pub fn blurred(canvas: HtmlCanvasElement, tier: usize) -> Option<Self> {
        let mut surface = Self::new(canvas)?;
        let radius = BLUR_STEP_PX * (tier + 1) as f32;
        let filter = format!("blur({radius}px)");
        surface.ctx.set_filter(&filter);
        surface.filter = Some(filter);
        Some(surface)
    }
}

impl RenderSurface for CanvasSurface {
    fn clear(&mut self) {
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
    }

    fn draw(&mut self, sprite: &Sprite) {
        if sprite.opacity <= 0.0 {
            return;
        }
        let w = sprite.size as f64;
        let h = w * CONFETTI_ASPECT as f64;
        let ctx = &self.ctx;
        ctx.save();
        let _ = ctx.translate(sprite.center.x as f64, sprite.center.y as f64);
        let _ = ctx.rotate(sprite.rotation as f64);
        ctx.set_global_alpha(sprite.opacity as f64);
        ctx.set_fill_style_str(&sprite.color.to_css(1.0));
        ctx.fill_rect(-w / 2.0, -h / 2.0, w, h);
        ctx.restore();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.canvas.width() == width && self.canvas.height() == height {
            return;
        }
        // Resizing resets the backing store and every context setting
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        if let Some(filter) = &self.filter {
            self.ctx.set_filter(filter);
        }
        log::debug!("Confetti canvas resized to {}x{}", width, height);
    }
}

type SharedController = Rc<RefCell<ConfettiController>>;
/// Filled in once the controller exists, so the scheduler can call back into it
type ControllerSlot = Rc<RefCell<Weak<RefCell<ConfettiController>>>>;

/// `requestAnimationFrame` scheduler calling back into its controller.
///
/// One callback lives as long as the scheduler and is handed to every request,
/// so cancelled frames leave nothing behind.
pub struct RafScheduler {
    callback: Closure<dyn FnMut(f64)>,
}

impl RafScheduler {
    fn new() -> (Self, ControllerSlot) {
        let target: ControllerSlot = Rc::new(RefCell::new(Weak::new()));
        let slot = target.clone();
        let callback = Closure::<dyn FnMut(f64)>::new(move |time: f64| {
            let Some(shared) = slot.borrow().upgrade() else {
                return;
            };
            match shared.try_borrow_mut() {
                Ok(mut controller) => controller.on_frame(time),
                Err(_) => log::warn!("Confetti frame fired while the controller was busy, dropped"),
            }
        });
        (Self { callback }, target)
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let Some(window) = web_sys::window() else {
            return FrameHandle(0);
        };
        let id = window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
            .unwrap_or_default();
        FrameHandle(id)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle.0);
        }
    }
}

/// Latest device tilt, written by the page's orientation listener
#[derive(Debug, Clone, Default)]
pub struct OrientationTilt {
    latest: Rc<Cell<Option<f32>>>,
}

impl OrientationTilt {
    /// Store a `gamma` reading (degrees, left/right tilt)
    pub fn record_gamma(&self, gamma_degrees: f64) {
        self.latest
            .set(Some((gamma_degrees / 90.0).clamp(-1.0, 1.0) as f32));
    }
}

impl TiltSource for OrientationTilt {
    fn sample(&mut self) -> Option<f32> {
        self.latest.get()
    }
}

/// One confetti controller bound to a card element and its canvases
#[wasm_bindgen]
pub struct ConfettiHandle {
    controller: SharedController,
    tilt: OrientationTilt,
    inputs: ControllerInputs,
}

#[wasm_bindgen]
impl ConfettiHandle {
    /// `blur` is an array of canvases, one per blur tier. `config_json` falls
    /// back to the default config when absent or invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: Element,
        back: HtmlCanvasElement,
        front: Option<HtmlCanvasElement>,
        mirror: Option<HtmlCanvasElement>,
        blur: Option<js_sys::Array>,
        config_json: Option<String>,
    ) -> ConfettiHandle {
        let config = match config_json.as_deref().map(SimulationConfig::from_json) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                log::warn!("Rejected confetti config, using defaults: {}", e);
                SimulationConfig::default()
            }
            None => SimulationConfig::default(),
        };

        let mut surfaces = SurfaceSet::default();
        surfaces.primary = CanvasSurface::new(back).map(|s| Box::new(s) as Box<dyn RenderSurface>);
        surfaces.front = front
            .and_then(CanvasSurface::new)
            .map(|s| Box::new(s) as Box<dyn RenderSurface>);
        surfaces.mirror = mirror
            .and_then(CanvasSurface::new)
            .map(|s| Box::new(s) as Box<dyn RenderSurface>);
        if let Some(blur) = blur {
            for (tier, canvas) in blur.iter().enumerate() {
                if let Some(surface) = canvas
                    .dyn_into::<HtmlCanvasElement>()
                    .ok()
                    .and_then(|c| CanvasSurface::blurred(c, tier))
                {
                    surfaces.blur.push(Box::new(surface));
                }
            }
        }

        let tilt = OrientationTilt::default();
        let (scheduler, target) = RafScheduler::new();
        let controller = ConfettiController::new(
            config,
            surfaces,
            Some(Box::new(DomGeometry::new(container))),
            Box::new(scheduler),
        )
        .with_tilt(tilt.clone());
        let controller = Rc::new(RefCell::new(controller));
        *target.borrow_mut() = Rc::downgrade(&controller);

        ConfettiHandle {
            controller,
            tilt,
            inputs: ControllerInputs::default(),
        }
    }

    #[wasm_bindgen(js_name = setActive)]
    pub fn set_active(&mut self, active: bool) {
        self.inputs.active = active;
        self.apply();
    }

    #[wasm_bindgen(js_name = setComplete)]
    pub fn set_complete(&mut self, complete: bool) {
        self.inputs.complete = complete;
        self.apply();
    }

    #[wasm_bindgen(js_name = setPaused)]
    pub fn set_paused(&mut self, paused: bool) {
        self.inputs.paused = paused;
        self.apply();
    }

    #[wasm_bindgen(js_name = setPauseAtFrame)]
    pub fn set_pause_at_frame(&mut self, frame: Option<u32>) {
        self.inputs.pause_at_frame = frame.map(u64::from);
        self.apply();
    }

    /// Deterministic replay to `frame`; the result stays on screen, paused
    #[wasm_bindgen(js_name = renderFrame)]
    pub fn render_frame(&mut self, frame: u32) {
        self.inputs.render_frame = Some(u64::from(frame));
        self.apply();
    }

    /// Leave replay mode and follow the activation flags again
    #[wasm_bindgen(js_name = clearRenderFrame)]
    pub fn clear_render_frame(&mut self) {
        self.inputs.render_frame = None;
        self.apply();
    }

    /// Feed tilt from the page's own `deviceorientation` listener
    #[wasm_bindgen(js_name = recordTilt)]
    pub fn record_tilt(&self, gamma_degrees: f64) {
        self.tilt.record_gamma(gamma_degrees);
    }

    /// Register a `deviceorientation` listener on the window that feeds tilt
    #[wasm_bindgen(js_name = listenForTilt)]
    pub fn listen_for_tilt(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let tilt = self.tilt.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            if let Some(gamma) = event
                .dyn_ref::<DeviceOrientationEvent>()
                .and_then(|e| e.gamma())
            {
                tilt.record_gamma(gamma);
            }
        });
        let _ = window
            .add_event_listener_with_callback("deviceorientation", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    #[wasm_bindgen(getter)]
    pub fn frame(&self) -> f64 {
        self.controller.borrow().status().frame() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn paused(&self) -> bool {
        self.controller.borrow().status().paused()
    }

    #[wasm_bindgen(getter)]
    pub fn ready(&self) -> bool {
        self.controller.borrow().status().ready()
    }

    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        self.controller.borrow().phase().as_str().to_string()
    }

    fn apply(&self) {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.set_inputs(self.inputs),
            Err(_) => log::debug!("Confetti inputs changed during a frame, ignored"),
        }
    }
}

/// Frame number last rendered by any controller on the page
#[wasm_bindgen(js_name = confettiFrame)]
pub fn confetti_frame() -> f64 {
    StatusFlags::global().frame() as f64
}

#[wasm_bindgen(js_name = confettiPaused)]
pub fn confetti_paused() -> bool {
    StatusFlags::global().paused()
}

#[wasm_bindgen(js_name = confettiReady)]
pub fn confetti_ready() -> bool {
    StatusFlags::global().ready()
}
