//! confetti-replay entry point
//!
//! Headless deterministic replay: builds a controller against a fixed layout,
//! runs it to the requested frame and prints what every surface drew as JSON.
//!
//! ```text
//! confetti-replay [--profile boxed|depth] [--config config.json]
//!                 [--layout layout.json] [--frames N]
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use card_confetti::config::{ProfileKind, SimulationConfig};
    use card_confetti::controller::ConfettiController;
    use card_confetti::platform::{
        FixedLayout, FrameHandle, FrameScheduler, LayoutRect, LayoutSnapshot,
    };
    use card_confetti::renderer::{RecordingSurface, SurfaceSet};
    use card_confetti::status::StatusFlags;

    const DEFAULT_FRAMES: u64 = 120;

    /// Replay never schedules frames
    struct NoFrames;

    impl FrameScheduler for NoFrames {
        fn request_frame(&mut self) -> FrameHandle {
            FrameHandle(0)
        }

        fn cancel_frame(&mut self, _handle: FrameHandle) {}
    }

    #[derive(Debug, Default)]
    struct Args {
        profile: Option<String>,
        config: Option<String>,
        layout: Option<String>,
        frames: Option<String>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut args = Args::default();
        let mut iter = std::env::args().skip(1);
        while let Some(flag) = iter.next() {
            let slot = match flag.as_str() {
                "--profile" => &mut args.profile,
                "--config" => &mut args.config,
                "--layout" => &mut args.layout,
                "--frames" => &mut args.frames,
                other => return Err(format!("unknown argument: {other}")),
            };
            *slot = Some(iter.next().ok_or_else(|| format!("{flag} needs a value"))?);
        }
        Ok(args)
    }

    /// Card used when no layout file is given
    fn default_layout(kind: ProfileKind) -> LayoutSnapshot {
        let mut layout = LayoutSnapshot::container(300.0, 540.0);
        layout.floor_marker = Some(LayoutRect::new(0.0, 500.0, 300.0, 2.0));
        if kind == ProfileKind::Boxed {
            layout.box_rect = Some(LayoutRect::new(60.0, 320.0, 180.0, 180.0));
        }
        layout
    }

    fn load(args: &Args) -> Result<(SimulationConfig, LayoutSnapshot, u64), String> {
        let config = match (&args.config, &args.profile) {
            (Some(path), _) => {
                let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
                SimulationConfig::from_json(&json).map_err(|e| format!("{path}: {e}"))?
            }
            (None, Some(name)) => {
                let kind = ProfileKind::from_str(name)
                    .ok_or_else(|| format!("unknown profile: {name}"))?;
                SimulationConfig::for_profile(kind)
            }
            (None, None) => SimulationConfig::default(),
        };

        let layout = match &args.layout {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
                serde_json::from_str(&json).map_err(|e| format!("{path}: {e}"))?
            }
            None => default_layout(config.profile.kind),
        };

        let frames = match &args.frames {
            Some(n) => n.parse().map_err(|_| format!("bad frame count: {n}"))?,
            None => DEFAULT_FRAMES,
        };
        Ok((config, layout, frames))
    }

    pub fn run() -> Result<(), String> {
        let args = parse_args()?;
        let (config, layout, frames) = load(&args)?;

        let back = RecordingSurface::new();
        let front = RecordingSurface::new();
        let mirror = RecordingSurface::new();
        let surfaces = SurfaceSet::new(back.clone())
            .with_front(front.clone())
            .with_mirror(mirror.clone());

        let mut controller = ConfettiController::new(
            config,
            surfaces,
            Some(Box::new(FixedLayout(layout))),
            Box::new(NoFrames),
        )
        .with_status(StatusFlags::global());
        controller.render_frame(frames);

        let status = controller.status().snapshot();
        if !status.ready {
            return Err(format!("replay did not reach frame {frames}"));
        }

        let output = serde_json::json!({
            "controller": controller.snapshot(),
            "geometry": controller.geometry(),
            "back": back.recording(),
            "front": front.recording(),
            "mirror": mirror.recording(),
        });
        let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
        println!("{text}");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("confetti-replay starting...");

    if let Err(e) = replay::run() {
        log::error!("{e}");
        eprintln!("confetti-replay: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser entry point lives in the library (platform::web)
}
