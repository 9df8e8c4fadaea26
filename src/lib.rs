//! # cc3
//!
//! The GL state tracking and rendering core of a 3D scene graph engine. It sits between a
//! high level scene (nodes, meshes, materials, lights and cameras) and the GL driver, and
//! makes sure that:
//!
//! 1. redundant state changes never reach the driver;
//! 2. fixed-function and programmable pipelines are driven through one interface;
//! 3. shader uniforms and attributes are populated from declarative semantics;
//! 4. draw calls are ordered for correctness and throughput, and statistics are recorded.
//!
//! All the GL work happens on one thread, through a `GLContext` that owns every tracker of
//! one driver context. A software `HeadlessDriver` is shipped for tests and tooling.
//!
//! ```rust,ignore
//! let driver = cc3::driver::headless::HeadlessDriver::new(640, 480);
//! let mut ctx = cc3::GLContext::new(Box::new(driver), cc3::Settings::default())?;
//! let report = ctx.render_frame(&mut scene, 1.0 / 60.0)?;
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub extern crate cgmath;
pub extern crate gl;

pub mod errors;
pub mod math;
pub mod settings;
pub mod utils;

pub mod driver;
pub mod matrix;
pub mod shader;
pub mod state;
pub mod vertex;

pub mod render;
pub mod scene;

mod context;

pub use self::context::{ContextState, GLContext};
pub use self::errors::{Error, Result};
pub use self::settings::Settings;

pub mod prelude {
    pub use crate::context::GLContext;
    pub use crate::driver::headless::HeadlessDriver;
    pub use crate::driver::types::*;
    pub use crate::driver::Driver;
    pub use crate::errors::{Error, Result};
    pub use crate::math::prelude::*;
    pub use crate::matrix::{MatrixMode, MatrixSemantic, MatrixSystem};
    pub use crate::render::{FrameReport, PerformanceStats};
    pub use crate::scene::prelude::*;
    pub use crate::settings::*;
    pub use crate::shader::prelude::*;
    pub use crate::state::{Policy, Slot, StateCache, Value};
}
