use crate::driver::types::ShaderStage;
use crate::matrix::MatrixMode;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "OpenGL implementation doesn't support {}.", _0)]
    PlatformUnsupported(String),
    #[fail(
        display = "Failed to compile {} shader '{}', errors: \n{}",
        stage, name, log
    )]
    ShaderCompileFailed {
        stage: ShaderStage,
        name: String,
        log: String,
    },
    #[fail(display = "Failed to link program '{}', errors: \n{}", name, log)]
    ProgramLinkFailed { name: String, log: String },
    #[fail(display = "Uniform '{}' could not be populated.", _0)]
    UniformUnpopulated(String),
    #[fail(display = "{} matrix stack overflow at depth {}.", mode, depth)]
    StackOverflow { mode: MatrixMode, depth: usize },
    #[fail(display = "{} matrix stack underflow.", mode)]
    StackUnderflow { mode: MatrixMode },
    #[fail(display = "Failed to submit draw call, errors: \n{}.", _0)]
    DrawCallFailed(String),
    #[fail(display = "The GL context has been lost.")]
    ContextLost,
    #[fail(display = "{} not found.", _0)]
    ResourceNotFound(String),
    #[fail(display = "[GL] {}", _0)]
    Driver(String),
    #[fail(display = "Invalid settings: {}.", _0)]
    InvalidSettings(String),
}

impl Error {
    /// Fatal errors end the render loop. Everything else is recovered within a frame.
    pub fn is_fatal(&self) -> bool {
        match *self {
            Error::ContextLost | Error::PlatformUnsupported(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::InvalidSettings(format!("{}", err))
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
