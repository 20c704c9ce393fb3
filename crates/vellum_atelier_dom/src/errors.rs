//! DOM compiler diagnostics.
//!
//! Codes continue where the core table stops, at [`ErrorCode::EXTEND_POINT`].

use thiserror::Error;
use vellum_relief::errors::{CompilerError, ErrorCode};
use vellum_relief::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u16)]
pub enum DomErrorCode {
    #[error("v-html is missing expression.")]
    VHtmlNoExpression = ErrorCode::EXTEND_POINT,
    #[error("v-html will override element children.")]
    VHtmlWithChildren,
    #[error("v-text is missing expression.")]
    VTextNoExpression,
    #[error("v-text will override element children.")]
    VTextWithChildren,
    #[error("v-model can only be used on <input>, <textarea> and <select> elements.")]
    VModelOnInvalidElement,
    #[error("v-model argument is not supported on plain elements.")]
    VModelArgOnElement,
    #[error("v-model cannot used on file inputs since they are read-only. Use a v-on:change listener instead.")]
    VModelOnFileInputElement,
    #[error("Unnecessary value binding used alongside v-model. It will interfere with v-model's behavior.")]
    VModelUnnecessaryValue,
    #[error("v-show is missing expression.")]
    VShowNoExpression,
    #[error("<Transition> expects exactly one child element or component.")]
    TransitionInvalidChildren,
}

impl DomErrorCode {
    /// First code free for compilers layered on the DOM one.
    pub const EXTEND_POINT: u16 = 57;

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn into_error(self, loc: Option<SourceLocation>) -> CompilerError {
        CompilerError::with_code(self.code(), &self.to_string(), loc)
    }
}
