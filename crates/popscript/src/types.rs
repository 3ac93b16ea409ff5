use std::collections::HashMap;
use std::sync::LazyLock;

use crate::codes;
use crate::{CodeValue, PopString};

/// Process wide registry of the closed enumerations, built once and
/// read-only afterwards.
static REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::standard);

#[derive(Debug)]
struct TypeDescriptor {
    name: PopString,
    /// Permitted identifier to code. Unnamed values are not listed here.
    by_name: HashMap<PopString, CodeValue>,
    /// Permitted code to the type's default identifier.
    by_value: HashMap<CodeValue, PopString>,
    default_identifier: PopString,
    default_value: CodeValue,
}

#[derive(Debug, Default)]
/// The table of registered data types and its two reverse indices.
struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<PopString, u8>,
    /// Value identifier to owning type; empty identifiers are excluded.
    constant_by_name: HashMap<PopString, u8>,
    /// Value code to owning type; first registration wins.
    constant_by_value: HashMap<CodeValue, u8>,
}

impl TypeRegistry {
    /// Registers a type without a permitted value set.
    fn register(&mut self, name: &str) -> u8 {
        self.register_with(name, &[], "", 0)
    }

    /// Registers a closed enumeration. Type names must be unique; within a
    /// type, identifier to code must be injective. The reverse indices pick
    /// the first registration on code collisions across types.
    fn register_with(
        &mut self,
        name: &str,
        values: &[(&str, CodeValue)],
        default_identifier: &str,
        default_value: CodeValue,
    ) -> u8 {
        assert!(
            !self.by_name.contains_key(name),
            "data type {name} registered twice"
        );
        let id = self.types.len() as u8;

        let mut by_name = HashMap::new();
        let mut by_value = HashMap::new();
        for &(identifier, code) in values {
            if !identifier.is_empty() {
                let previous = by_name.insert(PopString::new(identifier), code);
                assert!(previous.is_none(), "duplicate identifier in type {name}");
                self.constant_by_name
                    .entry(PopString::new(identifier))
                    .or_insert(id);
            }
            by_value.insert(code, PopString::new(default_identifier));
            self.constant_by_value.entry(code).or_insert(id);
        }

        self.types.push(TypeDescriptor {
            name: PopString::new(name),
            by_name,
            by_value,
            default_identifier: PopString::new(default_identifier),
            default_value,
        });
        self.by_name.insert(PopString::new(name), id);
        id
    }

    /// Builds the registry with the game's enumerations, in a fixed order.
    fn standard() -> TypeRegistry {
        use codes::{building, follower, spell, state, team};

        let mut reg = TypeRegistry::default();
        reg.register("Integer");
        reg.register_with(
            "State",
            &[("on", state::ON), ("off", state::OFF)],
            "off",
            state::OFF,
        );
        reg.register_with(
            "Team",
            &[
                ("Blue", team::BLUE),
                ("Red", team::RED),
                ("Yellow", team::YELLOW),
                ("Green", team::GREEN),
            ],
            "Blue",
            team::BLUE,
        );
        reg.register_with(
            "Spell",
            &[
                ("", spell::BURN),
                ("Blast", spell::BLAST),
                ("Lightning", spell::LIGHTNING_BOLT),
                ("", spell::WHIRLWIND),
                ("Swarm", spell::INSECT_PLAGUE),
                ("Invisibility", spell::INVISIBILITY),
                ("Hypnotism", spell::HYPNOTISM),
                ("Firestorm", spell::FIRESTORM),
                ("GhostArmy", spell::GHOST_ARMY),
                ("Erosion", spell::EROSION),
                ("Swamp", spell::SWAMP),
                ("LandBridge", spell::LAND_BRIDGE),
                ("AngelOfDead", spell::ANGEL_OF_DEAD),
                ("Earthquake", spell::EARTHQUAKE),
                ("Flatten", spell::FLATTEN),
                ("Volcano", spell::VOLCANO),
                ("Armageddon", spell::WRATH_OF_GOD),
                ("Shield", spell::SHIELD),
                ("Convert", spell::CONVERT),
                ("Teleport", spell::TELEPORT),
                ("Bloodlust", spell::BLOODLUST),
                ("UndefinedSpell", spell::NO_SPECIFIC_SPELL),
            ],
            "Blast",
            spell::BLAST,
        );
        reg.register_with(
            "Follower",
            &[
                ("Brave", follower::BRAVE),
                ("Warrior", follower::WARRIOR),
                ("Religious", follower::RELIGIOUS),
                ("Spy", follower::SPY),
                ("Firewarrior", follower::FIREWARRIOR),
                ("Shaman", follower::SHAMAN),
                ("UndefinedFollower", follower::NO_SPECIFIC_PERSON),
            ],
            "Brave",
            follower::BRAVE,
        );
        reg.register_with(
            "Building",
            &[
                ("SmallHut", building::SMALL_HUT),
                ("MediumHut", building::MEDIUM_HUT),
                ("LargeHut", building::LARGE_HUT),
                ("DrumTower", building::DRUM_TOWER),
                ("Temple", building::TEMPLE),
                ("SpyTrain", building::SPY_TRAIN),
                ("WarriorTrain", building::WARRIOR_TRAIN),
                ("FirewarriorTrain", building::FIREWARRIOR_TRAIN),
                ("", building::RECONVERSION),
                ("", building::WALL_PIECE),
                ("", building::GATE),
                ("BoatHut", building::BOAT_HUT),
                ("", building::BOAT_HUT_2),
                ("AirshipHut", building::AIRSHIP_HUT),
                ("", building::AIRSHIP_HUT_2),
                ("UndefinedBuilding", building::NO_SPECIFIC_BUILDING),
            ],
            "SmallHut",
            building::SMALL_HUT,
        );
        reg
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// A reference to a registered enumeration descriptor.
///
/// Handles are cheap copies; equality is by registered type.
pub struct DataType(u8);

impl DataType {
    pub fn integer() -> DataType {
        DataType(0)
    }

    pub fn state() -> DataType {
        DataType(1)
    }

    pub fn team() -> DataType {
        DataType(2)
    }

    pub fn spell() -> DataType {
        DataType(3)
    }

    pub fn follower() -> DataType {
        DataType(4)
    }

    pub fn building() -> DataType {
        DataType(5)
    }

    /// Returns whether a type with the given name is registered.
    pub fn is_valid_type(name: &str) -> bool {
        REGISTRY.by_name.contains_key(name)
    }

    /// Looks a type up by name.
    pub fn get_type(name: &str) -> Option<DataType> {
        REGISTRY.by_name.get(name).copied().map(DataType)
    }

    /// Resolves the type owning a value code. Arbitrary integers resolve
    /// to no type.
    pub fn find_type_from_value(value: CodeValue) -> Option<DataType> {
        REGISTRY.constant_by_value.get(&value).copied().map(DataType)
    }

    /// Resolves the type owning a value identifier.
    pub fn find_type_from_value_name(name: &str) -> Option<DataType> {
        REGISTRY.constant_by_name.get(name).copied().map(DataType)
    }

    fn descriptor(self) -> &'static TypeDescriptor {
        &REGISTRY.types[self.0 as usize]
    }

    /// The type's registered name.
    pub fn name(self) -> &'static str {
        &self.descriptor().name
    }

    /// Whether this is the distinguished integer type, which has no
    /// permitted value set.
    pub fn is_integer(self) -> bool {
        self == DataType::integer()
    }

    /// The permitted identifiers of this type, in no particular order.
    pub fn available_values(self) -> Vec<&'static str> {
        self.descriptor()
            .by_name
            .keys()
            .map(PopString::as_str)
            .collect()
    }

    /// Tests membership of a value identifier.
    pub fn is_valid_identifier(self, identifier: &str) -> bool {
        self.descriptor().by_name.contains_key(identifier)
    }

    /// Tests membership of a value code.
    pub fn is_valid_value(self, value: CodeValue) -> bool {
        self.descriptor().by_value.contains_key(&value)
    }

    /// Resolves a permitted code to the type's default identifier.
    pub fn value_identifier(self, value: CodeValue) -> Option<&'static str> {
        self.descriptor()
            .by_value
            .get(&value)
            .map(PopString::as_str)
    }

    /// Resolves a permitted identifier to its code.
    pub fn identifier_value(self, identifier: &str) -> Option<CodeValue> {
        self.descriptor().by_name.get(identifier).copied()
    }

    /// The default identifier of this type.
    pub fn default_identifier(self) -> &'static str {
        &self.descriptor().default_identifier
    }

    /// The default value code of this type.
    pub fn default_value(self) -> CodeValue {
        self.descriptor().default_value
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{building, spell, state, team};

    #[test]
    fn standard_types_are_registered() {
        for name in ["Integer", "State", "Team", "Spell", "Follower", "Building"] {
            assert!(DataType::is_valid_type(name), "{name} missing");
        }
        assert!(!DataType::is_valid_type("Terrain"));
    }

    #[test]
    fn get_type_resolves_the_distinguished_handles() {
        assert_eq!(DataType::get_type("Integer"), Some(DataType::integer()));
        assert_eq!(DataType::get_type("Spell"), Some(DataType::spell()));
    }

    #[test]
    fn integer_has_no_permitted_values() {
        let int = DataType::integer();
        assert!(int.is_integer());
        assert!(int.available_values().is_empty());
        assert!(!int.is_valid_identifier("on"));
        assert_eq!(DataType::find_type_from_value(1234), None);
    }

    #[test]
    fn identifier_and_code_resolve_both_ways() {
        let st = DataType::state();
        assert_eq!(st.identifier_value("on"), Some(state::ON));
        assert!(st.is_valid_value(state::OFF));
        // The reverse map resolves to the default identifier.
        assert_eq!(st.value_identifier(state::ON), Some("off"));
        assert_eq!(st.value_identifier(0x7777), None);
    }

    #[test]
    fn value_names_resolve_to_their_type() {
        assert_eq!(
            DataType::find_type_from_value_name("Blue"),
            Some(DataType::team())
        );
        assert_eq!(
            DataType::find_type_from_value_name("Volcano"),
            Some(DataType::spell())
        );
        assert_eq!(
            DataType::find_type_from_value_name("SmallHut"),
            Some(DataType::building())
        );
        assert_eq!(DataType::find_type_from_value_name("nonsense"), None);
    }

    #[test]
    fn value_codes_resolve_to_their_type() {
        assert_eq!(
            DataType::find_type_from_value(team::RED),
            Some(DataType::team())
        );
        assert_eq!(
            DataType::find_type_from_value(spell::TELEPORT),
            Some(DataType::spell())
        );
    }

    #[test]
    fn unnamed_values_are_codes_without_identifiers() {
        // Burn and Whirlwind carry no source identifier but are valid
        // values of Spell.
        assert_eq!(
            DataType::find_type_from_value(spell::BURN),
            Some(DataType::spell())
        );
        assert_eq!(DataType::find_type_from_value_name(""), None);
        assert!(DataType::spell().is_valid_value(spell::WHIRLWIND));
        assert_eq!(
            DataType::spell().value_identifier(spell::WHIRLWIND),
            Some("Blast")
        );
    }

    #[test]
    fn gate_has_no_identifier_but_belongs_to_building() {
        assert_eq!(
            DataType::find_type_from_value(building::GATE),
            Some(DataType::building())
        );
        assert!(!DataType::building().is_valid_identifier("Gate"));
    }

    #[test]
    fn equality_is_by_registered_type() {
        assert_eq!(DataType::team(), DataType::get_type("Team").unwrap());
        assert_ne!(DataType::team(), DataType::spell());
    }
}
