use cgmath::{Matrix4, SquareMatrix};

use super::MatrixMode;
use crate::errors::*;

/// A host side matrix stack.
///
/// The stack starts with one identity matrix. `max_depth` is the number of pushes allowed
/// above that base entry.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    mode: MatrixMode,
    max_depth: usize,
    items: Vec<Matrix4<f32>>,
}

impl MatrixStack {
    pub fn new(mode: MatrixMode, max_depth: usize) -> Self {
        MatrixStack {
            mode,
            max_depth,
            items: vec![Matrix4::identity()],
        }
    }

    #[inline]
    pub fn mode(&self) -> MatrixMode {
        self.mode
    }

    /// The number of matrices on the stack, starting at 1.
    #[inline]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn top(&self) -> &Matrix4<f32> {
        // The base entry is never popped.
        &self.items[self.items.len() - 1]
    }

    #[inline]
    fn top_mut(&mut self) -> &mut Matrix4<f32> {
        let i = self.items.len() - 1;
        &mut self.items[i]
    }

    /// Checks that a push would succeed, without changing the stack.
    pub fn check_push(&self) -> Result<()> {
        if self.items.len() > self.max_depth {
            warn!("{} matrix stack overflow at depth {}.", self.mode, self.depth());
            return Err(Error::StackOverflow {
                mode: self.mode,
                depth: self.depth(),
            });
        }

        Ok(())
    }

    /// Checks that a pop would succeed, without changing the stack.
    pub fn check_pop(&self) -> Result<()> {
        if self.items.len() <= 1 {
            warn!("{} matrix stack underflow.", self.mode);
            return Err(Error::StackUnderflow { mode: self.mode });
        }

        Ok(())
    }

    /// Duplicates the top.
    pub fn push(&mut self) -> Result<()> {
        self.check_push()?;
        let top = *self.top();
        self.items.push(top);
        Ok(())
    }

    /// Discards the top.
    pub fn pop(&mut self) -> Result<()> {
        self.check_pop()?;
        self.items.pop();
        Ok(())
    }

    pub fn load(&mut self, m: &Matrix4<f32>) {
        *self.top_mut() = *m;
    }

    pub fn load_identity(&mut self) {
        *self.top_mut() = Matrix4::identity();
    }

    /// Replaces the top with `top * m`.
    pub fn multiply(&mut self, m: &Matrix4<f32>) {
        let top = self.top_mut();
        *top = *top * m;
    }

    /// Drops everything but an identity base entry.
    pub fn reset(&mut self) {
        self.items.truncate(1);
        self.load_identity();
    }
}
