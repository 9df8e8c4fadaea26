use gl::types::*;

use super::consts as c;
use super::Driver;
use crate::errors::*;
use crate::settings::{ErrorAssertion, ErrorLogging};

/// Polls `glGetError` according to the configured logging and assertion switches.
#[derive(Debug, Clone)]
pub struct ErrorChecker {
    logging: ErrorLogging,
    assertion: ErrorAssertion,
}

impl ErrorChecker {
    pub fn new(logging: ErrorLogging, assertion: ErrorAssertion) -> Self {
        ErrorChecker { logging, assertion }
    }

    #[inline]
    pub fn logging(&self) -> ErrorLogging {
        self.logging
    }

    /// Called after every driver call. Only polls in trace mode.
    #[inline]
    pub fn after_call(&self, driver: &mut dyn Driver, call: &str) -> Result<()> {
        if self.logging == ErrorLogging::OnEveryCall {
            self.poll(driver, call)
        } else {
            Ok(())
        }
    }

    /// Called once per frame boundary. Polls unless logging is off.
    #[inline]
    pub fn at_frame_boundary(&self, driver: &mut dyn Driver, label: &str) -> Result<()> {
        if self.logging != ErrorLogging::Off {
            self.poll(driver, label)
        } else {
            Ok(())
        }
    }

    /// Drains the error flags of the driver, and reports the first one.
    pub fn poll(&self, driver: &mut dyn Driver, context: &str) -> Result<()> {
        let first = driver.get_error();
        if first == c::NO_ERROR {
            return Ok(());
        }

        // Implementations may keep one flag per error kind.
        for _ in 0..8 {
            if driver.get_error() == c::NO_ERROR {
                break;
            }
        }

        if first == c::CONTEXT_LOST {
            error!("[GL] Context lost, detected after {}.", context);
            return Err(Error::ContextLost);
        }

        let msg = format!("{} after {}.", describe(first), context);
        error!("[GL] {}", msg);

        if self.assertion == ErrorAssertion::Abort {
            panic!("[GL] {}", msg);
        }

        Err(Error::Driver(msg))
    }
}

/// Returns a readable explanation of a GL error code.
pub fn describe(code: GLenum) -> &'static str {
    match code {
        c::NO_ERROR => "No error",
        c::INVALID_ENUM => "An unacceptable value is specified for an enumerated argument",
        c::INVALID_VALUE => "A numeric argument is out of range",
        c::INVALID_OPERATION => "The specified operation is not allowed in the current state",
        c::STACK_OVERFLOW => "The command would cause a stack overflow",
        c::STACK_UNDERFLOW => "The command would cause a stack underflow",
        c::INVALID_FRAMEBUFFER_OPERATION => {
            "The command is trying to render to or read from the framebuffer while the \
             currently bound framebuffer is not framebuffer complete"
        }
        c::OUT_OF_MEMORY => "There is not enough memory left to execute the command",
        c::CONTEXT_LOST => "The context has been lost",
        _ => "Oops, Unknown OpenGL error",
    }
}
