//! Shape and patch flags.
//!
//! [`ShapeFlags`] describe what kind of node a vnode is and what kind of
//! children it has; they are computed at creation and drive dispatch in the
//! renderer. [`PatchFlags`] are optimization hints attached by compiled
//! render code; they name the parts of an element that can change, so the
//! renderer patches only those.

bitflags::bitflags! {
    /// What a vnode is and what it holds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u32 {
        const ELEMENT = 1;
        const FUNCTIONAL_COMPONENT = 1 << 1;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN = 1 << 3;
        const ARRAY_CHILDREN = 1 << 4;
        const SLOTS_CHILDREN = 1 << 5;
        const TELEPORT = 1 << 6;
        const SUSPENSE = 1 << 7;
        const COMPONENT_SHOULD_KEEP_ALIVE = 1 << 8;
        const COMPONENT_KEPT_ALIVE = 1 << 9;
        const COMPONENT = Self::STATEFUL_COMPONENT.bits() | Self::FUNCTIONAL_COMPONENT.bits();
    }
}

bitflags::bitflags! {
    /// Which parts of an element may change between renders.
    ///
    /// An empty set means "no hint": the element is diffed in full.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatchFlags: u32 {
        /// Text children are dynamic.
        const TEXT = 1;
        /// The `class` prop is dynamic.
        const CLASS = 1 << 1;
        /// The `style` prop is dynamic.
        const STYLE = 1 << 2;
        /// Non-class/style props are dynamic; their names are listed in the
        /// vnode's dynamic props.
        const PROPS = 1 << 3;
        /// Props have dynamic keys; diff them in full.
        const FULL_PROPS = 1 << 4;
        const NEED_HYDRATION = 1 << 5;
        /// A fragment whose children never change order.
        const STABLE_FRAGMENT = 1 << 6;
        const KEYED_FRAGMENT = 1 << 7;
        const UNKEYED_FRAGMENT = 1 << 8;
        /// Only non-prop work is needed (e.g. refs or directives).
        const NEED_PATCH = 1 << 9;
        const DYNAMIC_SLOTS = 1 << 10;
        const DEV_ROOT_FRAGMENT = 1 << 11;
    }
}

/// Hints that are never tested bitwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialPatch {
    /// Statically hoisted; never needs patching.
    Hoisted,
    /// Leave optimized mode and diff the subtree in full.
    Bail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_covers_both_kinds() {
        assert!(ShapeFlags::COMPONENT.contains(ShapeFlags::STATEFUL_COMPONENT));
        assert!(ShapeFlags::COMPONENT.contains(ShapeFlags::FUNCTIONAL_COMPONENT));
        assert!(ShapeFlags::FUNCTIONAL_COMPONENT.intersects(ShapeFlags::COMPONENT));
        assert!(!ShapeFlags::ELEMENT.intersects(ShapeFlags::COMPONENT));
    }

    #[test]
    fn bit_values_are_stable() {
        assert_eq!(ShapeFlags::COMPONENT_KEPT_ALIVE.bits(), 512);
        assert_eq!(PatchFlags::STABLE_FRAGMENT.bits(), 64);
        assert_eq!(PatchFlags::DEV_ROOT_FRAGMENT.bits(), 2048);
    }
}
