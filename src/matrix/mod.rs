//! Matrix stacks and the matrices derived from them.
//!
//! The host keeps every stack in both pipelines. In the fixed-function pipeline each
//! operation is mirrored into the GL stacks as well, while the programmable pipeline only
//! reads the stacks back through `MatrixSystem::matrix_for` to populate uniforms.

pub mod backend;
pub mod stack;
pub mod system;

pub use self::backend::{FixedBackend, MatrixBackend, ProgrammableBackend, StackOp};
pub use self::stack::MatrixStack;
pub use self::system::MatrixSystem;

use std::fmt;

use gl::types::*;

use crate::driver::consts as c;

/// Selects one matrix stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixMode {
    ModelView,
    Projection,
    /// The texture matrix of a texture unit.
    Texture(u8),
    /// One matrix of the skinning palette.
    Palette(u8),
}

impl fmt::Display for MatrixMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MatrixMode::ModelView => write!(f, "Modelview"),
            MatrixMode::Projection => write!(f, "Projection"),
            MatrixMode::Texture(unit) => write!(f, "Texture (unit {})", unit),
            MatrixMode::Palette(index) => write!(f, "Palette (index {})", index),
        }
    }
}

impl From<MatrixMode> for GLenum {
    fn from(mode: MatrixMode) -> Self {
        match mode {
            MatrixMode::ModelView => c::MODELVIEW,
            MatrixMode::Projection => c::PROJECTION,
            MatrixMode::Texture(_) => c::TEXTURE,
            MatrixMode::Palette(_) => c::MATRIX_PALETTE,
        }
    }
}

/// The composite matrices the engine can supply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixBase {
    /// The transform of the current drawable relative to its parent.
    ModelLocal,
    Model,
    View,
    ModelView,
    Projection,
    ViewProjection,
    ModelViewProjection,
}

impl MatrixBase {
    pub const ALL: [MatrixBase; 7] = [
        MatrixBase::ModelLocal,
        MatrixBase::Model,
        MatrixBase::View,
        MatrixBase::ModelView,
        MatrixBase::Projection,
        MatrixBase::ViewProjection,
        MatrixBase::ModelViewProjection,
    ];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixForm {
    Plain,
    Inverse,
    InverseTranspose,
}

impl MatrixForm {
    pub const ALL: [MatrixForm; 3] = [
        MatrixForm::Plain,
        MatrixForm::Inverse,
        MatrixForm::InverseTranspose,
    ];
}

/// A derived matrix: one base in one form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixSemantic {
    pub base: MatrixBase,
    pub form: MatrixForm,
}

impl MatrixSemantic {
    pub const fn new(base: MatrixBase, form: MatrixForm) -> Self {
        MatrixSemantic { base, form }
    }

    pub const fn plain(base: MatrixBase) -> Self {
        MatrixSemantic::new(base, MatrixForm::Plain)
    }

    pub const fn inverse(base: MatrixBase) -> Self {
        MatrixSemantic::new(base, MatrixForm::Inverse)
    }

    pub const fn inverse_transpose(base: MatrixBase) -> Self {
        MatrixSemantic::new(base, MatrixForm::InverseTranspose)
    }

    /// Position in the derived matrix table, and bit in its validity mask.
    #[inline]
    pub fn index(self) -> usize {
        self.base.index() * 3 + self.form as usize
    }

    /// Iterates all 21 semantics.
    pub fn all() -> impl Iterator<Item = MatrixSemantic> {
        MatrixBase::ALL
            .iter()
            .flat_map(|b| MatrixForm::ALL.iter().map(move |f| MatrixSemantic::new(*b, *f)))
    }
}

impl fmt::Display for MatrixSemantic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.form {
            MatrixForm::Plain => write!(f, "{:?}", self.base),
            MatrixForm::Inverse => write!(f, "{:?}Inv", self.base),
            MatrixForm::InverseTranspose => write!(f, "{:?}InvTran", self.base),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn semantics() {
        let all: Vec<_> = MatrixSemantic::all().collect();
        assert_eq!(all.len(), 21);
        for (i, v) in all.iter().enumerate() {
            assert_eq!(v.index(), i);
        }

        let s = MatrixSemantic::inverse_transpose(MatrixBase::ModelView);
        assert_eq!(format!("{}", s), "ModelViewInvTran");
        assert_eq!(format!("{}", MatrixMode::Texture(2)), "Texture (unit 2)");
        assert_eq!(GLenum::from(MatrixMode::Palette(3)), c::MATRIX_PALETTE);
    }
}
