//! The per-frame dispatcher.
//!
//! A frame resolves the program of every visible drawable, sequences the drawables, runs the
//! optional pick pass, and draws them once per camera. Failures of single drawables are
//! recovered in place and reported in the `FrameReport`. Only fatal errors abort a frame.

pub mod picking;
pub mod renderer;
pub mod sequencer;
pub mod stats;

pub use self::picking::PickBuffer;
pub use self::renderer::{Frame, Renderer};
pub use self::sequencer::{DrawOrder, Sequencer};
pub use self::stats::PerformanceStats;

use crate::errors::Error;

/// What happened during one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub draw_calls: u32,
    pub faces: u32,
    pub nodes_drawn: u32,
    /// The drawable under the pick point, if a pick pass ran and hit something.
    pub picked: Option<usize>,
    /// Errors that were recovered without aborting the frame.
    pub errors: Vec<Error>,
}

impl FrameReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
