//! Patch flags carried on generated vnode calls.

use bitflags::bitflags;

bitflags! {
    /// Optimization hints emitted as the fourth argument of `createElementVNode`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatchFlags: i32 {
        const TEXT = 1;
        const CLASS = 1 << 1;
        const STYLE = 1 << 2;
        const PROPS = 1 << 3;
        const FULL_PROPS = 1 << 4;
        const NEED_HYDRATION = 1 << 5;
        const STABLE_FRAGMENT = 1 << 6;
        const KEYED_FRAGMENT = 1 << 7;
        const UNKEYED_FRAGMENT = 1 << 8;
        const NEED_PATCH = 1 << 9;
        const DYNAMIC_SLOTS = 1 << 10;
    }
}

/// Hoisted static vnode marker.
pub const PATCH_FLAG_HOISTED: i32 = -1;

impl PatchFlags {
    /// Debug comment appended after the numeric flag in generated code.
    pub fn describe(self) -> std::string::String {
        const NAMES: &[(PatchFlags, &str)] = &[
            (PatchFlags::TEXT, "TEXT"),
            (PatchFlags::CLASS, "CLASS"),
            (PatchFlags::STYLE, "STYLE"),
            (PatchFlags::PROPS, "PROPS"),
            (PatchFlags::FULL_PROPS, "FULL_PROPS"),
            (PatchFlags::NEED_HYDRATION, "NEED_HYDRATION"),
            (PatchFlags::STABLE_FRAGMENT, "STABLE_FRAGMENT"),
            (PatchFlags::KEYED_FRAGMENT, "KEYED_FRAGMENT"),
            (PatchFlags::UNKEYED_FRAGMENT, "UNKEYED_FRAGMENT"),
            (PatchFlags::NEED_PATCH, "NEED_PATCH"),
            (PatchFlags::DYNAMIC_SLOTS, "DYNAMIC_SLOTS"),
        ];
        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<std::vec::Vec<_>>()
            .join(", ")
    }
}

/// How a component's slots may change between renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotFlags {
    /// Slots only reference slot props; the child need not update on parent change
    Stable = 1,
    /// Slots reference scope variables or use conditional/looped templates
    Dynamic = 2,
    /// Slots forward `<slot>` outlets of the parent
    Forwarded = 3,
}

impl SlotFlags {
    pub fn name(self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::Dynamic => "DYNAMIC",
            Self::Forwarded => "FORWARDED",
        }
    }

    /// `2 /* DYNAMIC */`
    pub fn annotated(self) -> std::string::String {
        format!("{} /* {} */", self as u8, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let flags = PatchFlags::TEXT | PatchFlags::PROPS;
        assert_eq!(flags.bits(), 9);
        assert_eq!(flags.describe(), "TEXT, PROPS");
    }

    #[test]
    fn test_slot_flag_annotation() {
        assert_eq!(SlotFlags::Forwarded.annotated(), "3 /* FORWARDED */");
    }
}
