use std::collections::HashMap;
use std::sync::LazyLock;

use crate::codes;
use crate::{CodeValue, PopString};

/// Process wide element graph, built once and read-only afterwards.
static REGISTRY: LazyLock<ElementRegistry> = LazyLock::new(ElementRegistry::standard);

/// The element graph of the scriptable game surface.
pub fn elements() -> &'static ElementRegistry {
    &REGISTRY
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
/// An identifier for a language element in the registry's arena.
pub struct ElementId(u32);

impl ElementId {
    /// Get the element id as a number.
    pub fn as_num(self) -> u32 {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The variant kind of a language element.
pub enum ElementKind {
    Namespace,
    Class,
    Object,
    Attribute,
    ReadOnlyAttribute,
    Function,
}

impl ElementKind {
    /// Whether elements of this kind hold an ordered child list.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ElementKind::Namespace | ElementKind::Class | ElementKind::Object
        )
    }

    /// Whether elements of this kind carry an emission code.
    pub fn has_code(self) -> bool {
        matches!(
            self,
            ElementKind::Object
                | ElementKind::Attribute
                | ElementKind::ReadOnlyAttribute
                | ElementKind::Function
        )
    }
}

#[derive(Debug)]
/// A named element of the language surface.
///
/// Equality is by unique id; two lookups that reach the same registered
/// element compare equal.
pub struct LangElement {
    id: ElementId,
    parent: Option<ElementId>,
    name: PopString,
    kind: ElementKind,
    code: Option<CodeValue>,
    children: Vec<ElementId>,
}

impl PartialEq for LangElement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LangElement {}

impl LangElement {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn parent_id(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// The emission code, for kinds that carry one.
    pub fn code(&self) -> Option<CodeValue> {
        self.code
    }

    pub fn child_ids(&self) -> &[ElementId] {
        &self.children
    }

    pub fn is_namespace(&self) -> bool {
        self.kind == ElementKind::Namespace
    }

    pub fn is_class(&self) -> bool {
        self.kind == ElementKind::Class
    }

    pub fn is_object(&self) -> bool {
        self.kind == ElementKind::Object
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == ElementKind::Attribute
    }

    pub fn is_read_only_attribute(&self) -> bool {
        self.kind == ElementKind::ReadOnlyAttribute
    }

    pub fn is_function(&self) -> bool {
        self.kind == ElementKind::Function
    }

    /// Whether writing to this element from a script is permitted.
    pub fn is_writable(&self) -> bool {
        self.kind == ElementKind::Attribute
    }
}

#[derive(Debug, Default)]
/// Arena of language elements with the two global lookup indices.
pub struct ElementRegistry {
    arena: Vec<LangElement>,
    global_map: HashMap<PopString, ElementId>,
    code_map: HashMap<CodeValue, ElementId>,
}

impl ElementRegistry {
    /// Gets an element by id.
    pub fn get(&self, id: ElementId) -> &LangElement {
        &self.arena[id.0 as usize]
    }

    /// Looks an element up in the global name index.
    pub fn find_global(&self, name: &str) -> Option<&LangElement> {
        self.global_map.get(name).map(|&id| self.get(id))
    }

    /// Looks an attribute-kind element up in the code index.
    pub fn find_by_code(&self, code: CodeValue) -> Option<&LangElement> {
        self.code_map.get(&code).map(|&id| self.get(id))
    }

    /// Finds a direct child by name, for container kinds.
    pub fn find_child(&self, parent: &LangElement, name: &str) -> Option<&LangElement> {
        if !parent.kind().is_container() {
            return None;
        }
        parent
            .children
            .iter()
            .map(|&id| self.get(id))
            .find(|child| child.name() == name)
    }

    /// Finds a direct child by emission code, for container kinds.
    pub fn find_child_by_code(&self, parent: &LangElement, code: CodeValue) -> Option<&LangElement> {
        if !parent.kind().is_container() {
            return None;
        }
        parent
            .children
            .iter()
            .map(|&id| self.get(id))
            .find(|child| child.code() == Some(code))
    }

    /// Iterates over every element in the arena.
    pub fn iter(&self) -> impl Iterator<Item = &LangElement> {
        self.arena.iter()
    }

    fn alloc(&mut self, name: &str, kind: ElementKind, code: Option<CodeValue>) -> ElementId {
        debug_assert_eq!(code.is_some(), kind.has_code());
        let id = ElementId(self.arena.len() as u32);
        self.arena.push(LangElement {
            id,
            parent: None,
            name: PopString::new(name),
            kind,
            code,
            children: Vec::new(),
        });
        id
    }

    fn register_global(&mut self, id: ElementId) {
        let name = self.get(id).name.clone();
        let previous = self.global_map.insert(name, id);
        assert!(
            previous.is_none(),
            "element {} registered globally twice",
            self.get(id).name()
        );
    }

    fn register_code(&mut self, id: ElementId) {
        let code = self.get(id).code.expect("code registration without code");
        let previous = self.code_map.insert(code, id);
        assert!(
            previous.is_none(),
            "code {code:#06x} registered twice (element {})",
            self.get(id).name()
        );
    }

    /// Parents `child` under `parent`, enforcing the parentage rules.
    /// Violations are configuration errors.
    fn assign_to(&mut self, parent: ElementId, child: ElementId) {
        let parent_kind = self.get(parent).kind();
        let child_kind = self.get(child).kind();
        let allowed = match parent_kind {
            ElementKind::Namespace => matches!(
                child_kind,
                ElementKind::Attribute | ElementKind::ReadOnlyAttribute
            ),
            ElementKind::Class => matches!(
                child_kind,
                ElementKind::Object | ElementKind::Attribute | ElementKind::ReadOnlyAttribute
            ),
            ElementKind::Object => matches!(
                child_kind,
                ElementKind::Attribute | ElementKind::ReadOnlyAttribute
            ),
            _ => false,
        };
        assert!(
            allowed,
            "a {child_kind:?} cannot be a child of a {parent_kind:?}"
        );
        self.arena[child.0 as usize].parent = Some(parent);
        self.arena[parent.0 as usize].children.push(child);
    }

    fn make_namespace(&mut self, name: &str) -> ElementId {
        let id = self.alloc(name, ElementKind::Namespace, None);
        self.register_global(id);
        id
    }

    fn make_class(&mut self, name: &str) -> ElementId {
        let id = self.alloc(name, ElementKind::Class, None);
        self.register_global(id);
        id
    }

    fn make_object(&mut self, name: &str, class: ElementId, code: CodeValue) -> ElementId {
        let id = self.alloc(name, ElementKind::Object, Some(code));
        self.assign_to(class, id);
        self.register_code(id);
        id
    }

    fn make_attribute(&mut self, name: &str, parent: ElementId, code: CodeValue) -> ElementId {
        let id = self.alloc(name, ElementKind::Attribute, Some(code));
        self.assign_to(parent, id);
        self.register_global(id);
        self.register_code(id);
        id
    }

    fn make_read_only_attribute(
        &mut self,
        name: &str,
        parent: ElementId,
        code: CodeValue,
    ) -> ElementId {
        let id = self.alloc(name, ElementKind::ReadOnlyAttribute, Some(code));
        self.assign_to(parent, id);
        self.register_global(id);
        self.register_code(id);
        id
    }

    /// Function elements have no parent and appear only in the code index.
    fn make_function(&mut self, name: &str, code: CodeValue) -> ElementId {
        let id = self.alloc(name, ElementKind::Function, Some(code));
        self.register_code(id);
        id
    }

    /// Builds the standard element library of the game surface.
    fn standard() -> ElementRegistry {
        use codes::{attribute, building, follower, function, spell, state, team};

        let mut reg = ElementRegistry::default();

        let class_state = reg.make_class("State");
        let class_team = reg.make_class("Team");
        let class_spell = reg.make_class("Spell");
        let class_follower = reg.make_class("Follower");
        let class_building = reg.make_class("Building");

        reg.make_object("on", class_state, state::ON);
        reg.make_object("off", class_state, state::OFF);

        reg.make_object("Blue", class_team, team::BLUE);
        reg.make_object("Red", class_team, team::RED);
        reg.make_object("Yellow", class_team, team::YELLOW);
        reg.make_object("Green", class_team, team::GREEN);

        reg.make_object("Blast", class_spell, spell::BLAST);
        reg.make_object("Lightning", class_spell, spell::LIGHTNING_BOLT);
        reg.make_object("Swarm", class_spell, spell::INSECT_PLAGUE);
        reg.make_object("Invisibility", class_spell, spell::INVISIBILITY);
        reg.make_object("Hypnotism", class_spell, spell::HYPNOTISM);
        reg.make_object("Firestorm", class_spell, spell::FIRESTORM);
        reg.make_object("GhostArmy", class_spell, spell::GHOST_ARMY);
        reg.make_object("Erosion", class_spell, spell::EROSION);
        reg.make_object("Swamp", class_spell, spell::SWAMP);
        reg.make_object("LandBridge", class_spell, spell::LAND_BRIDGE);
        reg.make_object("AngelOfDead", class_spell, spell::ANGEL_OF_DEAD);
        reg.make_object("Earthquake", class_spell, spell::EARTHQUAKE);
        reg.make_object("Flatten", class_spell, spell::FLATTEN);
        reg.make_object("Volcano", class_spell, spell::VOLCANO);
        reg.make_object("Armageddon", class_spell, spell::WRATH_OF_GOD);
        reg.make_object("Shield", class_spell, spell::SHIELD);
        reg.make_object("Convert", class_spell, spell::CONVERT);
        reg.make_object("Teleport", class_spell, spell::TELEPORT);
        reg.make_object("Bloodlust", class_spell, spell::BLOODLUST);
        reg.make_object("UndefinedSpell", class_spell, spell::NO_SPECIFIC_SPELL);

        reg.make_object("Brave", class_follower, follower::BRAVE);
        reg.make_object("Warrior", class_follower, follower::WARRIOR);
        reg.make_object("Religious", class_follower, follower::RELIGIOUS);
        reg.make_object("Spy", class_follower, follower::SPY);
        reg.make_object("Firewarrior", class_follower, follower::FIREWARRIOR);
        reg.make_object("Shaman", class_follower, follower::SHAMAN);
        reg.make_object("UndefinedFollower", class_follower, follower::NO_SPECIFIC_PERSON);

        reg.make_object("SmallHut", class_building, building::SMALL_HUT);
        reg.make_object("MediumHut", class_building, building::MEDIUM_HUT);
        reg.make_object("LargeHut", class_building, building::LARGE_HUT);
        reg.make_object("DrumTower", class_building, building::DRUM_TOWER);
        reg.make_object("Temple", class_building, building::TEMPLE);
        reg.make_object("SpyTrain", class_building, building::SPY_TRAIN);
        reg.make_object("WarriorTrain", class_building, building::WARRIOR_TRAIN);
        reg.make_object("FirewarriorTrain", class_building, building::FIREWARRIOR_TRAIN);
        reg.make_object("BoatHut", class_building, building::BOAT_HUT);
        reg.make_object("AirshipHut", class_building, building::AIRSHIP_HUT);
        reg.make_object("UndefinedBuilding", class_building, building::NO_SPECIFIC_BUILDING);

        let ai = reg.make_namespace("AI");
        reg.make_attribute("Aggression", ai, attribute::AGGRESSION);
        reg.make_attribute("Expansion", ai, attribute::EXPANSION);
        reg.make_attribute("PrefWarriors", ai, attribute::PREF_WARRIORS);
        reg.make_attribute("PrefFirewarriors", ai, attribute::PREF_FIREWARRIORS);
        reg.make_attribute("PrefSpies", ai, attribute::PREF_SPIES);
        reg.make_attribute("PrefReligious", ai, attribute::PREF_RELIGIOUS);

        reg.make_read_only_attribute("GameTurn", ai, attribute::GAME_TURN);
        reg.make_read_only_attribute("MyPeopleCount", ai, attribute::MY_PEOPLE_COUNT);
        reg.make_read_only_attribute("EnemyPeopleCount", ai, attribute::ENEMY_PEOPLE_COUNT);
        reg.make_read_only_attribute("MyMana", ai, attribute::MY_MANA);
        reg.make_read_only_attribute("MyBuildingCount", ai, attribute::MY_BUILDING_COUNT);

        reg.make_function("gameTurn", function::GAME_TURN);
        reg.make_function("myMana", function::MY_MANA);
        reg.make_function("setAggression", function::SET_AGGRESSION);
        reg.make_function("attack", function::ATTACK);
        reg.make_function("castSpell", function::CAST_SPELL);
        reg.make_function("train", function::TRAIN);
        reg.make_function("construct", function::CONSTRUCT);
        reg.make_function("disband", function::DISBAND);

        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{attribute, spell, team};

    #[test]
    fn classes_are_found_globally() {
        let spell_class = elements().find_global("Spell").unwrap();
        assert!(spell_class.is_class());
        assert_eq!(spell_class.name(), "Spell");
    }

    #[test]
    fn objects_are_children_of_their_class() {
        let reg = elements();
        let team_class = reg.find_global("Team").unwrap();
        let blue = reg.find_child(team_class, "Blue").unwrap();
        assert!(blue.is_object());
        assert_eq!(blue.code(), Some(team::BLUE));
        assert_eq!(blue.parent_id(), Some(team_class.id()));
    }

    #[test]
    fn objects_resolve_through_the_code_index() {
        let reg = elements();
        let volcano = reg.find_by_code(spell::VOLCANO).unwrap();
        assert_eq!(volcano.name(), "Volcano");
        let spell_class = reg.find_global("Spell").unwrap();
        assert_eq!(
            reg.find_child_by_code(spell_class, spell::VOLCANO).unwrap(),
            volcano
        );
    }

    #[test]
    fn attributes_satisfy_the_index_bijection() {
        let reg = elements();
        for element in reg.iter() {
            if element.is_attribute() || element.is_read_only_attribute() {
                let by_name = reg.find_global(element.name()).unwrap();
                assert_eq!(by_name, element);
                let by_code = reg.find_by_code(element.code().unwrap()).unwrap();
                assert_eq!(by_code, element);
            }
        }
    }

    #[test]
    fn ai_namespace_owns_the_tribe_attributes() {
        let reg = elements();
        let ai = reg.find_global("AI").unwrap();
        assert!(ai.is_namespace());
        let aggression = reg.find_child(ai, "Aggression").unwrap();
        assert!(aggression.is_writable());
        assert_eq!(aggression.code(), Some(attribute::AGGRESSION));
        let turn = reg.find_child(ai, "GameTurn").unwrap();
        assert!(turn.is_read_only_attribute());
        assert!(!turn.is_writable());
    }

    #[test]
    fn functions_live_only_in_the_code_index() {
        let reg = elements();
        assert!(reg.find_global("attack").is_none());
        let attack = reg.find_by_code(crate::codes::function::ATTACK).unwrap();
        assert!(attack.is_function());
        assert!(!attack.has_parent());
    }

    #[test]
    fn find_child_on_a_leaf_kind_is_none() {
        let reg = elements();
        let turn = reg.find_global("GameTurn").unwrap();
        assert!(reg.find_child(turn, "anything").is_none());
    }

    #[test]
    fn element_equality_is_by_id() {
        let reg = elements();
        let a = reg.find_global("Team").unwrap();
        let b = reg.find_global("Team").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, reg.find_global("Spell").unwrap());
    }
}
