//! Code constants of the emitted script format.
//!
//! Every value here is a 16-bit word of the on-disk encoding. Structural
//! tokens drive the host interpreter's control flow; value tokens are the
//! codes of the closed enumerations and of the scriptable game attributes
//! and operations. Value tokens are unique across all groups so that the
//! reverse indices (code to type, code to element) stay injective.

use crate::CodeValue;

/// Version word stored at the first code position of every script.
pub const SCRIPT_VERSION: CodeValue = 12;

/// Structural tokens of the instruction stream.
pub mod token {
    use crate::CodeValue;

    pub const SCRIPT_END: CodeValue = 0x0000;
    pub const IF: CodeValue = 0x0001;
    pub const ELSE: CodeValue = 0x0002;
    pub const ENDIF: CodeValue = 0x0003;
    pub const EVERY: CodeValue = 0x0004;
    pub const ENDEVERY: CodeValue = 0x0005;
    pub const SET: CodeValue = 0x0006;
    pub const INCREMENT: CodeValue = 0x0007;
    pub const DECREMENT: CodeValue = 0x0008;
    /// Followed by an index into the field table.
    pub const FIELD: CodeValue = 0x0009;
    /// Followed by a user variable slot.
    pub const VARIABLE: CodeValue = 0x000a;

    pub const MULTIPLY: CodeValue = 0x0010;
    pub const DIVIDE: CodeValue = 0x0011;
    pub const ADD: CodeValue = 0x0012;
    pub const SUBTRACT: CodeValue = 0x0013;
    pub const GREATER: CodeValue = 0x0014;
    pub const LESS: CodeValue = 0x0015;
    pub const GREATER_EQUAL: CodeValue = 0x0016;
    pub const LESS_EQUAL: CodeValue = 0x0017;
    pub const EQUAL: CodeValue = 0x0018;
    pub const NOT_EQUAL: CodeValue = 0x0019;
    pub const AND: CodeValue = 0x001a;
    pub const OR: CodeValue = 0x001b;
    pub const NOT: CodeValue = 0x001c;
    pub const NEGATE: CodeValue = 0x001d;
}

/// State enumeration values.
pub mod state {
    use crate::CodeValue;

    pub const OFF: CodeValue = 0x0040;
    pub const ON: CodeValue = 0x0041;
}

/// Team enumeration values.
pub mod team {
    use crate::CodeValue;

    pub const BLUE: CodeValue = 0x0050;
    pub const RED: CodeValue = 0x0051;
    pub const YELLOW: CodeValue = 0x0052;
    pub const GREEN: CodeValue = 0x0053;
}

/// Read-only internal values of the Spell enumeration.
pub mod spell {
    use crate::CodeValue;

    pub const BURN: CodeValue = 0x0100;
    pub const BLAST: CodeValue = 0x0101;
    pub const LIGHTNING_BOLT: CodeValue = 0x0102;
    pub const WHIRLWIND: CodeValue = 0x0103;
    pub const INSECT_PLAGUE: CodeValue = 0x0104;
    pub const INVISIBILITY: CodeValue = 0x0105;
    pub const HYPNOTISM: CodeValue = 0x0106;
    pub const FIRESTORM: CodeValue = 0x0107;
    pub const GHOST_ARMY: CodeValue = 0x0108;
    pub const EROSION: CodeValue = 0x0109;
    pub const SWAMP: CodeValue = 0x010a;
    pub const LAND_BRIDGE: CodeValue = 0x010b;
    pub const ANGEL_OF_DEAD: CodeValue = 0x010c;
    pub const EARTHQUAKE: CodeValue = 0x010d;
    pub const FLATTEN: CodeValue = 0x010e;
    pub const VOLCANO: CodeValue = 0x010f;
    pub const WRATH_OF_GOD: CodeValue = 0x0110;
    pub const SHIELD: CodeValue = 0x0111;
    pub const CONVERT: CodeValue = 0x0112;
    pub const TELEPORT: CodeValue = 0x0113;
    pub const BLOODLUST: CodeValue = 0x0114;
    pub const NO_SPECIFIC_SPELL: CodeValue = 0x0115;
}

/// Read-only internal values of the Follower enumeration.
pub mod follower {
    use crate::CodeValue;

    pub const BRAVE: CodeValue = 0x0120;
    pub const WARRIOR: CodeValue = 0x0121;
    pub const RELIGIOUS: CodeValue = 0x0122;
    pub const SPY: CodeValue = 0x0123;
    pub const FIREWARRIOR: CodeValue = 0x0124;
    pub const SHAMAN: CodeValue = 0x0125;
    pub const NO_SPECIFIC_PERSON: CodeValue = 0x0126;
}

/// Read-only internal values of the Building enumeration.
pub mod building {
    use crate::CodeValue;

    pub const SMALL_HUT: CodeValue = 0x0130;
    pub const MEDIUM_HUT: CodeValue = 0x0131;
    pub const LARGE_HUT: CodeValue = 0x0132;
    pub const DRUM_TOWER: CodeValue = 0x0133;
    pub const TEMPLE: CodeValue = 0x0134;
    pub const SPY_TRAIN: CodeValue = 0x0135;
    pub const WARRIOR_TRAIN: CodeValue = 0x0136;
    pub const FIREWARRIOR_TRAIN: CodeValue = 0x0137;
    pub const RECONVERSION: CodeValue = 0x0138;
    pub const WALL_PIECE: CodeValue = 0x0139;
    pub const GATE: CodeValue = 0x013a;
    pub const BOAT_HUT: CodeValue = 0x013b;
    pub const BOAT_HUT_2: CodeValue = 0x013c;
    pub const AIRSHIP_HUT: CodeValue = 0x013d;
    pub const AIRSHIP_HUT_2: CodeValue = 0x013e;
    pub const NO_SPECIFIC_BUILDING: CodeValue = 0x013f;
}

/// Codes of the `AI` namespace attributes.
pub mod attribute {
    use crate::CodeValue;

    // Writable tribe parameters.
    pub const AGGRESSION: CodeValue = 0x0180;
    pub const EXPANSION: CodeValue = 0x0181;
    pub const PREF_WARRIORS: CodeValue = 0x0182;
    pub const PREF_FIREWARRIORS: CodeValue = 0x0183;
    pub const PREF_SPIES: CodeValue = 0x0184;
    pub const PREF_RELIGIOUS: CodeValue = 0x0185;

    // Read-only game counters.
    pub const GAME_TURN: CodeValue = 0x01a0;
    pub const MY_PEOPLE_COUNT: CodeValue = 0x01a1;
    pub const ENEMY_PEOPLE_COUNT: CodeValue = 0x01a2;
    pub const MY_MANA: CodeValue = 0x01a3;
    pub const MY_BUILDING_COUNT: CodeValue = 0x01a4;
}

/// Codes of the callable game operations.
pub mod function {
    use crate::CodeValue;

    pub const GAME_TURN: CodeValue = 0x0200;
    pub const MY_MANA: CodeValue = 0x0201;
    pub const SET_AGGRESSION: CodeValue = 0x0202;
    pub const ATTACK: CodeValue = 0x0203;
    pub const CAST_SPELL: CodeValue = 0x0204;
    pub const TRAIN: CodeValue = 0x0205;
    pub const CONSTRUCT: CodeValue = 0x0206;
    pub const DISBAND: CodeValue = 0x0207;
}
