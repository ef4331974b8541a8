use bitflags::bitflags;

bitflags! {
    /// Side effects recorded on a fiber during the render phase.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        const PLACEMENT = 0b10;
        const UPDATE = 0b100;
        const CHILD_DELETION = 0b1000;
        /// A host ref must be detached and attached again.
        const REF = 0b10_0000_0000;
        const PASSIVE = 0b100_0000_0000;
    }
}

impl Flags {
    pub const MUTATION_MASK: Flags = Flags::PLACEMENT
        .union(Flags::UPDATE)
        .union(Flags::CHILD_DELETION)
        .union(Flags::REF);
    pub const LAYOUT_MASK: Flags = Flags::UPDATE.union(Flags::REF);
}

bitflags! {
    /// Classification of an effect slot.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HookFlags: u8 {
        /// The effect must run in the upcoming commit.
        const HAS_EFFECT = 0b0001;
        const LAYOUT = 0b0100;
        const PASSIVE = 0b1000;
    }
}
