use std::time::{Duration, Instant};

use anyhow::Context;
use vista_render::{
    CameraUniform, DebugTextRenderer, FrameSnapshot, InstanceData, MaterialTable, Renderer, Visibility,
    cull_into, draw_list, instance_data,
};
use vista_sync::{Consumer, FrameState, FrameTimer, Producer, StateSlot, SyncStats, TripleBuffer};

use crate::config::SceneConfig;
use crate::scene::Scene;

/// Stand-in for a GPU fence: stays busy for a fixed number of frames after
/// each submission.
#[derive(Debug)]
pub struct SimulatedFence {
    latency: u32,
    remaining: u32,
}

impl SimulatedFence {
    pub fn new(latency: u32) -> Self {
        Self { latency, remaining: 0 }
    }

    pub fn submit(&mut self) {
        self.remaining = self.latency;
    }

    /// One frame of GPU progress.
    pub fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn busy(&self) -> bool {
        self.remaining > 0
    }
}

/// What the render thread saw over a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub frames_rendered: u64,
    pub loop_iterations: u64,
    pub last_tick: u64,
    pub last_visible: usize,
    pub last_draws: usize,
    pub unresolved_materials: usize,
    pub upload_bytes: usize,
    pub timer: FrameTimer,
    pub stats: SyncStats,
}

/// Run the simulation and render contexts on two threads until the reader
/// has displayed the final tick.
pub fn run(config: &SceneConfig, show_frames: bool) -> anyhow::Result<RunReport> {
    let scene = Scene::new(config).context("building demo scene")?;

    let mut builder = TripleBuffer::builder(FrameSnapshot::default);
    let materials = builder.register_state(MaterialTable::new);
    let (producer, consumer) = builder.build();

    let ticks = config.ticks;
    let interval = Duration::from_millis(config.tick_interval_ms);

    tracing::info!(
        entities = scene.world.entity_count(),
        ticks,
        latency = config.gpu_latency_frames,
        "starting run"
    );

    let report = std::thread::scope(|s| {
        let sim = s.spawn(|| simulate(scene, producer, materials, ticks, interval));
        let report = render(&consumer, materials, config.gpu_latency_frames, show_frames, || {
            sim.is_finished()
        });
        sim.join()
            .map_err(|_| anyhow::anyhow!("simulation thread panicked"))??;
        Ok::<_, anyhow::Error>(report)
    })?;

    if report.last_tick != ticks {
        anyhow::bail!("render stopped at tick {} of {ticks}", report.last_tick);
    }
    Ok(report)
}

fn simulate(
    mut scene: Scene,
    mut producer: Producer<FrameSnapshot>,
    materials: StateSlot<MaterialTable>,
    ticks: u64,
    interval: Duration,
) -> anyhow::Result<()> {
    let _span = tracing::info_span!("simulation").entered();
    for _ in 0..ticks {
        let step = scene.advance().context("advancing scene")?;
        let frame = producer.write_state();
        frame.state_mut().capture_into(&scene.world, &scene.camera);
        // The write instance is recycled from an older tick; refresh the table too.
        frame.slot_mut(&materials).copy_from(&scene.materials);
        let tick = producer.swap_staging();
        tracing::debug!(
            tick,
            rebuilt = step.matrices_rebuilt,
            recomputed = step.bounds_recomputed,
            "tick staged"
        );
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    Ok(())
}

fn render(
    consumer: &Consumer<FrameSnapshot>,
    materials: StateSlot<MaterialTable>,
    latency: u32,
    show_frames: bool,
    producer_done: impl Fn() -> bool,
) -> RunReport {
    let _span = tracing::info_span!("render").entered();
    let renderer = DebugTextRenderer::new();
    let mut fence = SimulatedFence::new(latency);
    let mut visibility = Visibility::default();
    let mut instances: Vec<InstanceData> = Vec::new();
    let mut report = RunReport {
        frames_rendered: 0,
        loop_iterations: 0,
        last_tick: 0,
        last_visible: 0,
        last_draws: 0,
        unresolved_materials: 0,
        upload_bytes: 0,
        timer: FrameTimer::new(256),
        stats: SyncStats::default(),
    };

    loop {
        report.loop_iterations += 1;
        fence.advance();
        let guard = consumer.start_read();
        if guard.tick() != report.last_tick {
            let started = Instant::now();
            let frame = &*guard;
            let draws = draw_frame(frame, &materials, &mut visibility, &mut instances, &mut report);
            if show_frames {
                print!("{}", renderer.render(frame.state(), &visibility));
            }
            fence.submit();
            report.timer.record(started.elapsed());
            report.frames_rendered += 1;
            report.last_tick = guard.tick();
            report.last_draws = draws;
        }
        guard.stop_read(|_, _| fence.busy());

        // Checked in this order, a finished producer with nothing staged means
        // the read instance holds the last tick there will ever be.
        if producer_done() && !consumer.has_pending() && consumer.start_read().tick() == report.last_tick {
            break;
        }
        std::thread::yield_now();
    }
    report.stats = consumer.stats();
    report
}

/// Cull one published frame and prepare its upload data. Returns the draw count.
fn draw_frame(
    frame: &FrameState<FrameSnapshot>,
    materials: &StateSlot<MaterialTable>,
    visibility: &mut Visibility,
    instances: &mut Vec<InstanceData>,
    report: &mut RunReport,
) -> usize {
    cull_into(frame.state(), visibility);
    let draws = draw_list(frame.state(), visibility);
    let table = frame.slot(materials);
    report.unresolved_materials += draws.iter().filter(|d| table.get(d.material).is_none()).count();

    let camera = CameraUniform::from_snapshot(&frame.camera);
    instances.clear();
    instances.extend(instance_data(&draws));
    report.upload_bytes += size_of_val(&camera) + size_of_val(instances.as_slice());
    report.last_visible = visibility.stats.visible;
    tracing::trace!(tick = frame.tick(), visible = visibility.stats.visible, draws = draws.len(), "frame drawn");
    draws.len()
}
