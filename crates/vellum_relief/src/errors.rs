//! Compiler diagnostics.
//!
//! Codes are stable numbers; platform compilers extend the table starting at
//! [`ErrorCode::EXTEND_POINT`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::SourceLocation;
use vellum_carton::String;

/// Parse and transform error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // Parse errors
    AbruptClosingOfEmptyComment = 0,
    CdataInHtmlContent = 1,
    DuplicateAttribute = 2,
    EndTagWithAttributes = 3,
    EndTagWithTrailingSolidus = 4,
    EofBeforeTagName = 5,
    EofInCdata = 6,
    EofInComment = 7,
    EofInScriptHtmlCommentLikeText = 8,
    EofInTag = 9,
    IncorrectlyClosedComment = 10,
    IncorrectlyOpenedComment = 11,
    InvalidFirstCharacterOfTagName = 12,
    MissingAttributeValue = 13,
    MissingEndTagName = 14,
    MissingWhitespaceBetweenAttributes = 15,
    NestedComment = 16,
    UnexpectedCharacterInAttributeName = 17,
    UnexpectedCharacterInUnquotedAttributeValue = 18,
    UnexpectedEqualsSignBeforeAttributeName = 19,
    UnexpectedNullCharacter = 20,
    UnexpectedQuestionMarkInsteadOfTagName = 21,
    UnexpectedSolidusInTag = 22,

    // Vue-specific parse errors
    InvalidEndTag = 23,
    MissingEndTag = 24,
    MissingInterpolationEnd = 25,
    MissingDynamicDirectiveArgumentEnd = 26,

    // Transform errors
    VIfNoExpression = 27,
    VElseNoAdjacentIf = 28,
    VForNoExpression = 29,
    VForMalformedExpression = 30,
    VBindNoExpression = 31,
    VOnNoExpression = 32,
    VSlotUnexpectedDirectiveOnSlotOutlet = 33,
    VSlotMixedSlotUsage = 34,
    VSlotDuplicateSlotNames = 35,
    VSlotExtraneousDefaultSlotChildren = 36,
    VSlotMisplaced = 37,
    VModelNoExpression = 38,
    VModelMalformedExpression = 39,
    VModelOnScopeVariable = 40,
    InvalidExpression = 41,
    KeepAliveInvalidChildren = 42,
    VIfSameKey = 43,

    // Generic errors
    PrefixIdNotSupported = 44,
    ModuleModeNotSupported = 45,
    ScopeIdNotSupported = 46,
}

impl ErrorCode {
    /// First code available to platform compilers.
    pub const EXTEND_POINT: u16 = 47;

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::AbruptClosingOfEmptyComment => "Illegal comment.",
            Self::CdataInHtmlContent => "CDATA section is allowed only in XML context.",
            Self::DuplicateAttribute => "Duplicate attribute.",
            Self::EndTagWithAttributes => "End tag cannot have attributes.",
            Self::EndTagWithTrailingSolidus => "Illegal '/' in tags.",
            Self::EofBeforeTagName => "Unexpected EOF in tag.",
            Self::EofInCdata => "Unexpected EOF in CDATA section.",
            Self::EofInComment => "Unexpected EOF in comment.",
            Self::EofInScriptHtmlCommentLikeText => "Unexpected EOF in script.",
            Self::EofInTag => "Unexpected EOF in tag.",
            Self::IncorrectlyClosedComment => "Incorrectly closed comment.",
            Self::IncorrectlyOpenedComment => "Incorrectly opened comment.",
            Self::InvalidFirstCharacterOfTagName => "Illegal tag name. Use '&lt;' to print '<'.",
            Self::MissingAttributeValue => "Attribute value was expected.",
            Self::MissingEndTagName => "End tag name was expected.",
            Self::MissingWhitespaceBetweenAttributes => "Whitespace was expected.",
            Self::NestedComment => "Unexpected '<!--' in comment.",
            Self::UnexpectedCharacterInAttributeName => {
                "Attribute name cannot contain U+0022 (\"), U+0027 ('), and U+003C (<)."
            }
            Self::UnexpectedCharacterInUnquotedAttributeValue => {
                "Unquoted attribute value cannot contain U+0022 (\"), U+0027 ('), U+003C (<), U+003D (=), and U+0060 (`)."
            }
            Self::UnexpectedEqualsSignBeforeAttributeName => {
                "Attribute name cannot start with '='."
            }
            Self::UnexpectedNullCharacter => "Unexpected null character.",
            Self::UnexpectedQuestionMarkInsteadOfTagName => "'<?' is allowed only in XML context.",
            Self::UnexpectedSolidusInTag => "Illegal '/' in tags.",
            Self::InvalidEndTag => "Invalid end tag.",
            Self::MissingEndTag => "Element is missing end tag.",
            Self::MissingInterpolationEnd => "Interpolation end sign was not found.",
            Self::MissingDynamicDirectiveArgumentEnd => {
                "End bracket for dynamic directive argument was not found. Note that dynamic directive argument cannot contain spaces."
            }
            Self::VIfNoExpression => "v-if/v-else-if is missing expression.",
            Self::VElseNoAdjacentIf => "v-else/v-else-if has no adjacent v-if.",
            Self::VForNoExpression => "v-for is missing expression.",
            Self::VForMalformedExpression => "v-for has invalid expression.",
            Self::VBindNoExpression => "v-bind is missing expression.",
            Self::VOnNoExpression => "v-on is missing expression.",
            Self::VSlotUnexpectedDirectiveOnSlotOutlet => "Unexpected custom directive on <slot> outlet.",
            Self::VSlotMixedSlotUsage => {
                "Mixed v-slot usage on both the component and nested <template>. When there are multiple named slots, all slots should use <template> syntax to avoid scope ambiguity."
            }
            Self::VSlotDuplicateSlotNames => "Duplicate slot names found. ",
            Self::VSlotExtraneousDefaultSlotChildren => {
                "Extraneous children found when component already has explicitly named default slot. These children will be ignored."
            }
            Self::VSlotMisplaced => "v-slot can only be used on components or <template> tags.",
            Self::VModelNoExpression => "v-model is missing expression.",
            Self::VModelMalformedExpression => "v-model value must be a valid JavaScript member expression.",
            Self::VModelOnScopeVariable => {
                "v-model cannot be used on v-for or v-slot scope variables because they are not writable."
            }
            Self::InvalidExpression => "Error parsing JavaScript expression.",
            Self::KeepAliveInvalidChildren => "<KeepAlive> expects exactly one child component.",
            Self::VIfSameKey => {
                "v-if/else branches must use unique keys."
            }
            Self::PrefixIdNotSupported => "\"prefixIdentifiers\" option is not supported in this build of compiler.",
            Self::ModuleModeNotSupported => "ES module mode is not supported in this build of compiler.",
            Self::ScopeIdNotSupported => "\"scopeId\" option is only supported in module mode.",
        }
    }
}

/// A diagnostic with a stable numeric code.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct CompilerError {
    pub code: u16,
    pub message: String,
    pub loc: Option<SourceLocation>,
}

impl CompilerError {
    pub fn new(code: ErrorCode, loc: Option<SourceLocation>) -> Self {
        Self {
            code: code.code(),
            message: code.message().into(),
            loc,
        }
    }

    /// Diagnostic from outside the numbered tables (preprocessors, custom transforms).
    pub fn custom(message: impl Into<String>, loc: Option<SourceLocation>) -> Self {
        Self {
            code: u16::MAX,
            message: message.into(),
            loc,
        }
    }

    /// Diagnostic with a platform-specific code and message.
    pub fn with_code(code: u16, message: &str, loc: Option<SourceLocation>) -> Self {
        Self {
            code,
            message: message.into(),
            loc,
        }
    }
}
