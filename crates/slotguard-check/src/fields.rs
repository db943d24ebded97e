//! Field-level comparison of two state variables.
//!
//! Rules decide on the set of fields that differ between an old and a new
//! variable. The compared fields form a closed enumeration so that adding a
//! field to [`StateVariable`] never silently changes what the rules see.

use std::fmt;

use slotguard_core::StateVariable;

/// A compared field of a state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Slot,
    Offset,
    TypeHash,
}

impl Field {
    /// Every compared field, in bit order.
    pub const ALL: [Field; 4] = [Field::Name, Field::Slot, Field::Offset, Field::TypeHash];

    fn bit(self) -> u8 {
        match self {
            Field::Name => 1,
            Field::Slot => 1 << 1,
            Field::Offset => 1 << 2,
            Field::TypeHash => 1 << 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Slot => "slot",
            Field::Offset => "offset",
            Field::TypeHash => "typeHash",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of fields that differ between two variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangedFields(u8);

impl ChangedFields {
    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Changed fields in [`Field::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

/// Compares `old` and `new` over the fixed field list.
pub fn changed_fields(old: &StateVariable, new: &StateVariable) -> ChangedFields {
    let mut changed = ChangedFields::default();
    if old.name != new.name {
        changed.insert(Field::Name);
    }
    if old.slot != new.slot {
        changed.insert(Field::Slot);
    }
    if old.offset != new.offset {
        changed.insert(Field::Offset);
    }
    if old.type_hash != new.type_hash {
        changed.insert(Field::TypeHash);
    }
    changed
}
