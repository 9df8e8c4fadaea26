//! Shader programs and the semantic binding of their variables.
//!
//! Every active variable of a linked program is tagged with a `Semantic`, resolved by a
//! `SemanticDelegate` from its name or from an effect declaration. At draw time the uniforms
//! are populated from their semantics, unless the application has overridden them, and
//! written through the state cache so that unchanged values are never uploaded twice.

pub mod cache;
pub mod matcher;
pub mod pfx;
pub mod program;
pub mod semantics;
pub mod source;
pub mod system;
pub mod uniform;

pub use self::cache::ObjectCache;
pub use self::matcher::{DefaultMatcher, MatchTraits, ShaderMatcher};
pub use self::pfx::Effect;
pub use self::program::{Program, ReleaseQueue, Shader, ShaderVariable};
pub use self::semantics::{
    Semantic, SemanticDelegate, SemanticsByDeclaration, SemanticsByVarName, VariableSemantic,
};
pub use self::source::ShaderSource;
pub use self::system::ShaderSystem;
pub use self::uniform::{UniformContext, UniformValue};

pub mod prelude {
    pub use super::pfx::Effect;
    pub use super::program::{Program, ShaderVariable};
    pub use super::semantics::{Semantic, SemanticDelegate, SemanticsByVarName};
    pub use super::source::ShaderSource;
    pub use super::system::ShaderSystem;
    pub use super::uniform::UniformValue;
}
