//! Type-safe object id wrappers for the STP hardware objects.
//!
//! Each hardware object kind gets its own id type so a VLAN handle cannot be
//! passed where an STP instance handle is expected. Ids wrap an opaque `u64`
//! (matching `sai_object_id_t`); 0 is the null id.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw object id type (matches sai_object_id_t in C).
pub type RawObjectId = u64;

/// Marker trait for hardware object kinds.
pub trait SaiObjectKind: Send + Sync + 'static {
    /// Returns the object type name for debugging.
    fn type_name() -> &'static str;
}

/// A type-safe hardware object id.
///
/// The phantom type parameter `T` indicates which kind of object this id
/// refers to, so mixing kinds is a compile error.
#[derive(Clone, Copy)]
pub struct SaiObjectId<T: SaiObjectKind> {
    raw: RawObjectId,
    _marker: PhantomData<T>,
}

impl<T: SaiObjectKind> SaiObjectId<T> {
    /// The null object id (SAI_NULL_OBJECT_ID).
    pub const NULL: Self = Self {
        raw: 0,
        _marker: PhantomData,
    };

    /// Creates an object id from a raw value.
    ///
    /// Returns `None` if the raw value is 0; use [`Self::NULL`] for
    /// explicitly null ids.
    pub fn from_raw(raw: RawObjectId) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    /// Creates an object id from a raw value, null included.
    pub const fn from_raw_unchecked(raw: RawObjectId) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Returns the raw object id value.
    pub const fn as_raw(&self) -> RawObjectId {
        self.raw
    }

    /// Returns true if this is the null object id.
    pub const fn is_null(&self) -> bool {
        self.raw == 0
    }

    /// Returns true if this is a valid (non-null) object id.
    pub const fn is_valid(&self) -> bool {
        self.raw != 0
    }
}

impl<T: SaiObjectKind> fmt::Debug for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:x})", T::type_name(), self.raw)
    }
}

impl<T: SaiObjectKind> fmt::Display for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.raw)
    }
}

impl<T: SaiObjectKind> PartialEq for SaiObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: SaiObjectKind> Eq for SaiObjectId<T> {}

impl<T: SaiObjectKind> Hash for SaiObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: SaiObjectKind> Default for SaiObjectId<T> {
    fn default() -> Self {
        Self::NULL
    }
}

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal, $oid_alias:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl SaiObjectKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        pub type $oid_alias = SaiObjectId<$name>;
    };
}

define_object_kind!(SwitchKind, "Switch", SwitchOid);
define_object_kind!(VlanKind, "Vlan", VlanOid);
define_object_kind!(BridgePortKind, "BridgePort", BridgePortOid);
define_object_kind!(StpKind, "Stp", StpOid);
define_object_kind!(StpPortKind, "StpPort", StpPortOid);
