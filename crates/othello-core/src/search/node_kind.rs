//! Compile-time node kinds of the PVS recursion.

/// Node searched with a null window `[alpha, alpha + 1]`; only the side of the bound matters.
pub struct Scout;

/// Node on the principal variation, searched with the full `[alpha, beta]` window.
pub struct Principal;

/// The root of one iteration. Restricted to `SearchContext::root_moves` and never cut off by the TT.
pub struct Root;

pub trait NodeKind {
    /// Searched with an open window; records the PV.
    const FULL_WINDOW: bool;
    const IS_ROOT: bool;
}

impl NodeKind for Scout {
    const FULL_WINDOW: bool = false;
    const IS_ROOT: bool = false;
}

impl NodeKind for Principal {
    const FULL_WINDOW: bool = true;
    const IS_ROOT: bool = false;
}

impl NodeKind for Root {
    const FULL_WINDOW: bool = true;
    const IS_ROOT: bool = true;
}
