use std::collections::HashMap;
use std::sync::LazyLock;

use crate::codes::function;
use crate::types::DataType;
use crate::{CodeValue, PopString};

/// Process wide table of the callable game operations.
static CALLABLES: LazyLock<HashMap<PopString, Callable>> = LazyLock::new(standard_callables);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// The shape of a callable.
pub enum CallableKind {
    Getter,
    Setter,
    Function,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A single named, typed parameter of a callable.
pub struct Parameter {
    kind: DataType,
    name: PopString,
}

impl Parameter {
    pub fn new(kind: DataType, name: &str) -> Parameter {
        Parameter {
            kind,
            name: PopString::new(name),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug)]
/// A callable signature: getter, setter or free function.
///
/// Getters have no parameters and yield a value; setters take exactly one
/// parameter named `value` and yield nothing. Equality is by emission code.
pub struct Callable {
    kind: CallableKind,
    name: PopString,
    parameters: Vec<Parameter>,
    is_void: bool,
    code: CodeValue,
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Callable {}

impl Callable {
    /// Creates a getter: zero parameters, non-void.
    pub fn getter(name: &str, code: CodeValue) -> Callable {
        Callable {
            kind: CallableKind::Getter,
            name: PopString::new(name),
            parameters: Vec::new(),
            is_void: false,
            code,
        }
    }

    /// Creates a setter: one parameter named `value`, void.
    pub fn setter(name: &str, code: CodeValue, value_type: DataType) -> Callable {
        Callable {
            kind: CallableKind::Setter,
            name: PopString::new(name),
            parameters: vec![Parameter::new(value_type, "value")],
            is_void: true,
            code,
        }
    }

    /// Creates a function with an explicit parameter list.
    pub fn function(
        name: &str,
        code: CodeValue,
        is_void: bool,
        parameters: Vec<Parameter>,
    ) -> Callable {
        Callable {
            kind: CallableKind::Function,
            name: PopString::new(name),
            parameters,
            is_void,
            code,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> CodeValue {
        self.code
    }

    pub fn is_void(&self) -> bool {
        self.is_void
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter(&self, idx: usize) -> &Parameter {
        &self.parameters[idx]
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_getter(&self) -> bool {
        self.kind == CallableKind::Getter
    }

    pub fn is_setter(&self) -> bool {
        self.kind == CallableKind::Setter
    }

    pub fn is_function(&self) -> bool {
        self.kind == CallableKind::Function
    }

    /// Looks a standard callable up by name.
    pub fn find(name: &str) -> Option<&'static Callable> {
        CALLABLES.get(name)
    }
}

impl std::fmt::Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The callable operations the game exposes to scripts.
fn standard_callables() -> HashMap<PopString, Callable> {
    let list = [
        Callable::getter("gameTurn", function::GAME_TURN),
        Callable::getter("myMana", function::MY_MANA),
        Callable::setter("setAggression", function::SET_AGGRESSION, DataType::integer()),
        Callable::function(
            "attack",
            function::ATTACK,
            true,
            vec![
                Parameter::new(DataType::team(), "target"),
                Parameter::new(DataType::integer(), "count"),
            ],
        ),
        Callable::function(
            "castSpell",
            function::CAST_SPELL,
            true,
            vec![
                Parameter::new(DataType::spell(), "spell"),
                Parameter::new(DataType::team(), "target"),
            ],
        ),
        Callable::function(
            "train",
            function::TRAIN,
            true,
            vec![
                Parameter::new(DataType::follower(), "follower"),
                Parameter::new(DataType::integer(), "count"),
            ],
        ),
        Callable::function(
            "construct",
            function::CONSTRUCT,
            true,
            vec![Parameter::new(DataType::building(), "building")],
        ),
        Callable::function(
            "disband",
            function::DISBAND,
            true,
            vec![Parameter::new(DataType::integer(), "count")],
        ),
    ];
    list.into_iter()
        .map(|c| (PopString::new(c.name()), c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_have_no_parameters_and_a_value() {
        let g = Callable::getter("turn", 99);
        assert!(g.is_getter());
        assert!(!g.is_void());
        assert_eq!(g.parameter_count(), 0);
    }

    #[test]
    fn setters_take_exactly_one_value_parameter() {
        let s = Callable::setter("setThing", 100, DataType::integer());
        assert!(s.is_setter());
        assert!(s.is_void());
        assert_eq!(s.parameter_count(), 1);
        assert_eq!(s.parameter(0).name(), "value");
        assert_eq!(s.parameter(0).data_type(), DataType::integer());
    }

    #[test]
    fn equality_is_by_emission_code() {
        let a = Callable::getter("a", 7);
        let b = Callable::function("b", 7, true, vec![]);
        assert_eq!(a, b);
        assert_ne!(a, Callable::getter("a", 8));
    }

    #[test]
    fn standard_table_resolves_by_name() {
        let attack = Callable::find("attack").unwrap();
        assert!(attack.is_function());
        assert_eq!(attack.parameter_count(), 2);
        assert_eq!(attack.parameter(0).data_type(), DataType::team());
        assert!(Callable::find("fly").is_none());
    }
}
