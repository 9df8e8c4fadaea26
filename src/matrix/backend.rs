use cgmath::Matrix4;
use gl::types::*;

use super::MatrixMode;
use crate::driver::consts as c;
use crate::errors::*;
use crate::math::matrix as mat;
use crate::state::{Slot, StateCache, Value};

/// One operation on a matrix stack.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StackOp<'a> {
    Push,
    Pop,
    Identity,
    Load(&'a Matrix4<f32>),
    Multiply(&'a Matrix4<f32>),
    /// Copies the top of the modelview stack into a palette matrix.
    LoadFromModelView,
}

/// Where the matrix stacks live besides the host.
///
/// The host stacks have already validated and applied `op` when a backend sees it, so an
/// operation that reaches a backend is always legal.
pub trait MatrixBackend {
    fn apply(&mut self, cache: &mut StateCache, mode: MatrixMode, op: StackOp) -> Result<()>;

    /// Whether the GL matrix stacks are used at all.
    fn is_fixed_function(&self) -> bool;
}

/// Keeps the matrices on the host only. Shaders receive them as uniforms.
#[derive(Debug, Default)]
pub struct ProgrammableBackend;

impl MatrixBackend for ProgrammableBackend {
    #[inline]
    fn apply(&mut self, _: &mut StateCache, _: MatrixMode, _: StackOp) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn is_fixed_function(&self) -> bool {
        false
    }
}

/// Mirrors every operation into the GL matrix stacks.
#[derive(Debug, Default)]
pub struct FixedBackend;

impl FixedBackend {
    fn select(cache: &mut StateCache, mode: MatrixMode) -> Result<()> {
        match mode {
            MatrixMode::Texture(unit) => {
                cache.write(Slot::ActiveTexture, Value::Enum(c::TEXTURE0 + GLenum::from(unit)))?;
            }
            MatrixMode::Palette(index) => {
                cache.write(Slot::PaletteMatrix, Value::UInt(index.into()))?;
            }
            _ => {}
        }

        cache.write(Slot::MatrixMode, Value::Enum(mode.into()))
    }
}

impl MatrixBackend for FixedBackend {
    fn apply(&mut self, cache: &mut StateCache, mode: MatrixMode, op: StackOp) -> Result<()> {
        Self::select(cache, mode)?;

        let name = {
            let driver = cache.driver();
            match op {
                StackOp::Push => {
                    driver.push_matrix();
                    "glPushMatrix"
                }
                StackOp::Pop => {
                    driver.pop_matrix();
                    "glPopMatrix"
                }
                StackOp::Identity => {
                    driver.load_identity();
                    "glLoadIdentity"
                }
                StackOp::Load(m) => {
                    driver.load_matrixf(&mat::to_array(m));
                    "glLoadMatrixf"
                }
                StackOp::Multiply(m) => {
                    driver.mult_matrixf(&mat::to_array(m));
                    "glMultMatrixf"
                }
                StackOp::LoadFromModelView => {
                    driver.load_palette_from_modelview_matrix();
                    "glLoadPaletteFromModelViewMatrixOES"
                }
            }
        };

        cache.after_call(name)
    }

    #[inline]
    fn is_fixed_function(&self) -> bool {
        true
    }
}
