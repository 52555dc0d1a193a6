//! The type descriptor model: a runtime tree describing a message shape,
//! independent of any specific Rust struct definition.
//!
//! Descriptor trees are built once, shared behind `Arc`, and outlive every
//! object instance they describe. The codec dispatches over them with
//! exhaustive matches, so adding a node kind forces every traversal to
//! handle it.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::host::{BoolVectorAccess, SequenceAccess, U8StringAccess, U16StringAccess};

/// Wire-level primitive kinds.
///
/// Discriminants match the ROS introspection field-type numbering so
/// descriptors built from introspection metadata carry them through
/// unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum PrimitiveKind {
    Float = 1,
    Double = 2,
    LongDouble = 3,
    Char = 4,
    WChar = 5,
    Boolean = 6,
    Octet = 7,
    UInt8 = 8,
    Int8 = 9,
    UInt16 = 10,
    Int16 = 11,
    UInt32 = 12,
    Int32 = 13,
    UInt64 = 14,
    Int64 = 15,
}

impl PrimitiveKind {
    /// Look up a kind by its introspection discriminant.
    pub fn from_discriminant(id: u8) -> Result<Self> {
        Self::from_repr(id).ok_or(Error::UnknownTypeDiscriminant(id))
    }

    /// In-memory and wire extent in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            Self::Boolean | Self::Octet | Self::UInt8 | Self::Int8 | Self::Char => 1,
            Self::UInt16 | Self::Int16 | Self::WChar => 2,
            Self::Float | Self::UInt32 | Self::Int32 => 4,
            Self::Double | Self::UInt64 | Self::Int64 => 8,
            Self::LongDouble => 16,
        }
    }

    /// Natural alignment, before clamping to the writer's maximum.
    pub const fn align_of(self) -> usize {
        self.size_of()
    }

    /// Whether a contiguous run of this kind may be copied wholesale when no
    /// byte swap is needed. Booleans are excluded: incoming bytes must be
    /// normalized one element at a time.
    pub const fn is_bulk_copyable(self) -> bool {
        !matches!(self, Self::Boolean)
    }
}

/// Discriminant of a [`ValueType`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ValueKind {
    Primitive,
    U8String,
    U16String,
    Struct,
    Array,
    Sequence,
    BoolVector,
}

/// One node of a type descriptor tree.
#[derive(Clone)]
pub enum ValueType {
    Primitive(PrimitiveKind),
    U8String(U8StringType),
    U16String(U16StringType),
    Struct(Arc<StructType>),
    Array(ArrayType),
    Sequence(SequenceType),
    BoolVector(BoolVectorType),
}

impl ValueType {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Primitive(_) => ValueKind::Primitive,
            Self::U8String(_) => ValueKind::U8String,
            Self::U16String(_) => ValueKind::U16String,
            Self::Struct(_) => ValueKind::Struct,
            Self::Array(_) => ValueKind::Array,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::BoolVector(_) => ValueKind::BoolVector,
        }
    }

    /// In-memory extent of the host object this node describes.
    pub fn size_of(&self) -> usize {
        match self {
            Self::Primitive(kind) => kind.size_of(),
            Self::U8String(ty) => ty.size_of,
            Self::U16String(ty) => ty.size_of,
            Self::Struct(ty) => ty.size_of,
            Self::Array(ty) => ty.len * ty.element.size_of(),
            Self::Sequence(ty) => ty.size_of,
            Self::BoolVector(ty) => ty.size_of,
        }
    }

    /// In-memory alignment of the host object this node describes.
    pub fn align_of(&self) -> usize {
        match self {
            Self::Primitive(kind) => kind.align_of(),
            Self::U8String(ty) => ty.align_of,
            Self::U16String(ty) => ty.align_of,
            Self::Struct(ty) => ty.align_of,
            Self::Array(ty) => ty.element.align_of(),
            Self::Sequence(ty) => ty.align_of,
            Self::BoolVector(ty) => ty.align_of,
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "Primitive({kind})"),
            Self::Struct(ty) => write!(f, "Struct({})", ty.type_name),
            Self::Array(ty) => write!(f, "Array({:?}; {})", ty.element, ty.len),
            Self::Sequence(ty) => write!(f, "Sequence({:?})", ty.element),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Accessor-backed 8-bit string node. The accessor hides how the host
/// stores the string; the node only records the object's extent.
#[derive(Clone)]
pub struct U8StringType {
    pub size_of: usize,
    pub align_of: usize,
    pub access: Arc<dyn U8StringAccess>,
}

/// Accessor-backed 16-bit string node.
#[derive(Clone)]
pub struct U16StringType {
    pub size_of: usize,
    pub align_of: usize,
    pub access: Arc<dyn U16StringAccess>,
}

/// Fixed element count, contiguous storage, no count prefix on the wire.
#[derive(Clone)]
pub struct ArrayType {
    pub element: Box<ValueType>,
    pub len: usize,
}

impl ArrayType {
    pub fn new(element: ValueType, len: usize) -> Self {
        Self {
            element: Box::new(element),
            len,
        }
    }
}

/// Variable element count behind a [`SequenceAccess`] capability.
#[derive(Clone)]
pub struct SequenceType {
    pub element: Box<ValueType>,
    pub size_of: usize,
    pub align_of: usize,
    pub access: Arc<dyn SequenceAccess>,
}

/// Opaque boolean sequence behind a [`BoolVectorAccess`] capability.
/// Storage may be bit-packed, so the codec only ever iterates it.
#[derive(Clone)]
pub struct BoolVectorType {
    pub size_of: usize,
    pub align_of: usize,
    pub access: Arc<dyn BoolVectorAccess>,
}

/// A named field inside a [`StructType`].
pub struct Member {
    pub name: String,
    pub offset: usize,
    pub value_type: ValueType,
}

impl Member {
    pub fn new(name: impl Into<String>, offset: usize, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            offset,
            value_type,
        }
    }
}

/// An ordered sequence of members plus the declared extent of the struct.
pub struct StructType {
    pub type_name: String,
    pub size_of: usize,
    pub align_of: usize,
    pub members: Vec<Member>,
}

impl StructType {
    /// Build a descriptor, checking the layout invariants: member offsets
    /// must not decrease and every member must fit inside the declared
    /// size. Violations are descriptor bugs, not data errors, and abort.
    pub fn new(
        type_name: impl Into<String>,
        size_of: usize,
        align_of: usize,
        members: Vec<Member>,
    ) -> Arc<Self> {
        let type_name = type_name.into();
        let mut previous = 0;
        for member in &members {
            assert!(
                member.offset >= previous,
                "{type_name}.{}: member offsets must not decrease",
                member.name
            );
            assert!(
                member.offset + member.value_type.size_of() <= size_of,
                "{type_name}.{}: member extends past the declared struct size",
                member.name
            );
            previous = member.offset;
        }
        Arc::new(Self {
            type_name,
            size_of,
            align_of,
            members,
        })
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StructType({}, {} members, {} bytes)",
            self.type_name,
            self.members.len(),
            self.size_of
        )
    }
}

/// How a repeated-field declaration maps onto memory and the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ContainerKind {
    SingleValue,
    Array,
    Sequence,
}

/// Classify a member from its introspection flags: no repetition is a single
/// value; a fixed, non-upper-bounded count is an array; anything else
/// repeated (unbounded, or declared through an upper bound) is a sequence.
///
/// Classification happens once, while the descriptor is built; writer and
/// reader then share the frozen result through the tree itself.
pub const fn classify_container(
    is_repeated: bool,
    fixed_len: usize,
    has_upper_bound: bool,
) -> ContainerKind {
    if !is_repeated {
        ContainerKind::SingleValue
    } else if fixed_len > 0 && !has_upper_bound {
        ContainerKind::Array
    } else {
        ContainerKind::Sequence
    }
}
