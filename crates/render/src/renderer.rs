use std::fmt::Write as _;

use crate::cull::{Visibility, draw_list};
use crate::snapshot::FrameSnapshot;

/// Consumer of a published frame.
///
/// Renderers read the snapshot and the culling result and produce output.
/// They never see the simulation-side world.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from a snapshot and its visible set.
    fn render(&self, frame: &FrameSnapshot, visibility: &Visibility) -> Self::Output;
}

/// Text renderer for the CLI, logs and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// Also list every visible entity, not just the totals.
    pub verbose: bool,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &FrameSnapshot, visibility: &Visibility) -> String {
        let mut out = String::new();
        let cam = &frame.camera;
        let s = &visibility.stats;
        let _ = writeln!(out, "=== Frame (tick={}) ===", frame.tick);
        let _ = writeln!(
            out,
            "Camera: pos=({:.1}, {:.1}, {:.1}) near={:.2} far={:.1}",
            cam.position.x, cam.position.y, cam.position.z, cam.near, cam.far
        );
        let _ = writeln!(
            out,
            "Visible: {}/{} (sphere-rejected {}, box-rejected {})",
            s.visible, s.tested, s.rejected_by_sphere, s.rejected_by_box
        );
        let _ = writeln!(out, "Draws: {}", draw_list(frame, visibility).len());

        if self.verbose {
            for &i in &visibility.visible {
                let e = &frame.entities[i];
                let c = e.aabb.center();
                let _ = writeln!(
                    out,
                    "  [{}] center=({:.2}, {:.2}, {:.2}) radius={:.2}",
                    e.id.short(),
                    c.x,
                    c.y,
                    c.z,
                    e.sphere.radius
                );
            }
        }
        out
    }
}
