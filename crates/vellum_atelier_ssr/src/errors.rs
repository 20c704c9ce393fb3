//! SSR-specific compiler errors.

use thiserror::Error;
use vellum_atelier_dom::DomErrorCode;
use vellum_relief::errors::CompilerError;
use vellum_relief::SourceLocation;

/// SSR error codes, numbered after the DOM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u16)]
pub enum SsrErrorCode {
    /// Attribute name that would break out of the markup
    #[error("Unsafe attribute name for SSR.")]
    UnsafeAttrName = DomErrorCode::EXTEND_POINT,
    #[error("Missing required 'to' prop on <Teleport>.")]
    NoTeleportTarget,
}

impl SsrErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn into_error(self, loc: Option<SourceLocation>) -> CompilerError {
        CompilerError::with_code(self.code(), &self.to_string(), loc)
    }
}
