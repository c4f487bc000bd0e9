//! Tagged back-references stored in engine bodies and colliders
//!
//! rapier only carries an opaque `u128` per body/collider. We pack a kind tag,
//! an index and a generation into it; the object manager resolves the handle
//! through its slot table, so a stale handle resolves to nothing instead of a
//! dangling object.

use std::fmt;

/// Generational index of a physical object in the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub index: u32,
    pub generation: u32,
}

impl ObjectId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum UserPointerKind {
    #[default]
    Undefined = 0,
    Kart = 1,
    Track = 2,
    PhysicalObject = 3,
}

impl UserPointerKind {
    fn from_tag(tag: u8) -> Self {
        match tag {
            1 => UserPointerKind::Kart,
            2 => UserPointerKind::Track,
            3 => UserPointerKind::PhysicalObject,
            _ => UserPointerKind::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserPointer {
    pub kind: UserPointerKind,
    pub index: u32,
    pub generation: u32,
}

impl UserPointer {
    pub const UNDEFINED: UserPointer = UserPointer {
        kind: UserPointerKind::Undefined,
        index: 0,
        generation: 0,
    };

    pub fn physical_object(id: ObjectId) -> Self {
        Self {
            kind: UserPointerKind::PhysicalObject,
            index: id.index,
            generation: id.generation,
        }
    }

    pub fn kart(kart_index: u32) -> Self {
        Self {
            kind: UserPointerKind::Kart,
            index: kart_index,
            generation: 0,
        }
    }

    /// Track geometry; `index` selects its surface material in the manager
    pub fn track(index: u32) -> Self {
        Self {
            kind: UserPointerKind::Track,
            index,
            generation: 0,
        }
    }

    pub fn is(&self, kind: UserPointerKind) -> bool {
        self.kind == kind
    }

    pub fn as_physical_object(&self) -> Option<ObjectId> {
        self.is(UserPointerKind::PhysicalObject)
            .then(|| ObjectId::new(self.index, self.generation))
    }

    /// Layout: bits 0..32 index, 32..64 generation, 64..72 kind tag
    pub fn to_user_data(self) -> u128 {
        (self.index as u128) | ((self.generation as u128) << 32) | ((self.kind as u8 as u128) << 64)
    }

    pub fn from_user_data(data: u128) -> Self {
        Self {
            kind: UserPointerKind::from_tag((data >> 64) as u8),
            index: data as u32,
            generation: (data >> 32) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_object_pointer() {
        let id = ObjectId::new(7, 3);
        let pointer = UserPointer::from_user_data(UserPointer::physical_object(id).to_user_data());
        assert!(pointer.is(UserPointerKind::PhysicalObject));
        assert_eq!(pointer.as_physical_object(), Some(id));
    }

    #[test]
    fn test_default_user_data_is_undefined() {
        let pointer = UserPointer::from_user_data(0);
        assert_eq!(pointer, UserPointer::UNDEFINED);
        assert_eq!(pointer.as_physical_object(), None);
    }

    #[test]
    fn test_kart_pointer_is_not_an_object() {
        let pointer = UserPointer::from_user_data(UserPointer::kart(2).to_user_data());
        assert_eq!(pointer.kind, UserPointerKind::Kart);
        assert_eq!(pointer.index, 2);
        assert_eq!(pointer.as_physical_object(), None);
    }
}
