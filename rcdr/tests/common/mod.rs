//! Shared descriptor fixtures for the integration suites.
//!
//! Each fixture pairs a `#[repr(C)]` message struct with the descriptor
//! tree an introspection layer would produce for it.
#![allow(dead_code)]

use std::mem::offset_of;
use std::sync::Arc;

use rcdr::host::BoolVectorAccess;
use rcdr::{
    ArrayType, BoolVectorType, Member, PrimitiveKind, SequenceType, StructType, U8StringType,
    U16StringType, ValueType,
};

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub fn vector3_type() -> Arc<StructType> {
    StructType::new(
        "geometry_msgs/msg/Vector3",
        size_of::<Vector3>(),
        align_of::<Vector3>(),
        vec![
            Member::new(
                "x",
                offset_of!(Vector3, x),
                ValueType::Primitive(PrimitiveKind::Double),
            ),
            Member::new(
                "y",
                offset_of!(Vector3, y),
                ValueType::Primitive(PrimitiveKind::Double),
            ),
            Member::new(
                "z",
                offset_of!(Vector3, z),
                ValueType::Primitive(PrimitiveKind::Double),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

pub fn twist_type() -> Arc<StructType> {
    StructType::new(
        "geometry_msgs/msg/Twist",
        size_of::<Twist>(),
        align_of::<Twist>(),
        vec![
            Member::new(
                "linear",
                offset_of!(Twist, linear),
                ValueType::Struct(vector3_type()),
            ),
            Member::new(
                "angular",
                offset_of!(Twist, angular),
                ValueType::Struct(vector3_type()),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanRecord {
    pub id: u8,
    pub stamp: u32,
    pub label: String,
    pub readings: Vec<i32>,
    pub valid: bool,
}

pub fn scan_record_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/ScanRecord",
        size_of::<ScanRecord>(),
        align_of::<ScanRecord>(),
        vec![
            Member::new(
                "id",
                offset_of!(ScanRecord, id),
                ValueType::Primitive(PrimitiveKind::UInt8),
            ),
            Member::new(
                "stamp",
                offset_of!(ScanRecord, stamp),
                ValueType::Primitive(PrimitiveKind::UInt32),
            ),
            Member::new(
                "label",
                offset_of!(ScanRecord, label),
                ValueType::U8String(U8StringType::std_string()),
            ),
            Member::new(
                "readings",
                offset_of!(ScanRecord, readings),
                ValueType::Sequence(SequenceType::vec_of::<i32>(ValueType::Primitive(
                    PrimitiveKind::Int32,
                ))),
            ),
            Member::new(
                "valid",
                offset_of!(ScanRecord, valid),
                ValueType::Primitive(PrimitiveKind::Boolean),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cloud {
    pub points: Vec<Vector3>,
    pub names: Vec<String>,
}

pub fn cloud_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/Cloud",
        size_of::<Cloud>(),
        align_of::<Cloud>(),
        vec![
            Member::new(
                "points",
                offset_of!(Cloud, points),
                ValueType::Sequence(SequenceType::vec_of::<Vector3>(ValueType::Struct(
                    vector3_type(),
                ))),
            ),
            Member::new(
                "names",
                offset_of!(Cloud, names),
                ValueType::Sequence(SequenceType::vec_of::<String>(ValueType::U8String(
                    U8StringType::std_string(),
                ))),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Note {
    pub label: String,
}

pub fn note_type() -> Arc<StructType> {
    StructType::new(
        "std_msgs/msg/String",
        size_of::<Note>(),
        align_of::<Note>(),
        vec![Member::new(
            "label",
            offset_of!(Note, label),
            ValueType::U8String(U8StringType::std_string()),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideNote {
    pub title: Vec<u16>,
}

pub fn wide_note_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/WideNote",
        size_of::<WideNote>(),
        align_of::<WideNote>(),
        vec![Member::new(
            "title",
            offset_of!(WideNote, title),
            ValueType::U16String(U16StringType::wide_string()),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calib {
    pub gains: [f64; 3],
    pub tag: u8,
}

pub fn calib_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/Calib",
        size_of::<Calib>(),
        align_of::<Calib>(),
        vec![
            Member::new(
                "gains",
                offset_of!(Calib, gains),
                ValueType::Array(ArrayType::new(
                    ValueType::Primitive(PrimitiveKind::Double),
                    3,
                )),
            ),
            Member::new(
                "tag",
                offset_of!(Calib, tag),
                ValueType::Primitive(PrimitiveKind::UInt8),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibSeq {
    pub gains: Vec<f64>,
    pub tag: u8,
}

pub fn calib_seq_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/CalibSeq",
        size_of::<CalibSeq>(),
        align_of::<CalibSeq>(),
        vec![
            Member::new(
                "gains",
                offset_of!(CalibSeq, gains),
                ValueType::Sequence(SequenceType::vec_of::<f64>(ValueType::Primitive(
                    PrimitiveKind::Double,
                ))),
            ),
            Member::new(
                "tag",
                offset_of!(CalibSeq, tag),
                ValueType::Primitive(PrimitiveKind::UInt8),
            ),
        ],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flags {
    pub bits: Vec<bool>,
}

pub fn flags_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/Flags",
        size_of::<Flags>(),
        align_of::<Flags>(),
        vec![Member::new(
            "bits",
            offset_of!(Flags, bits),
            ValueType::BoolVector(BoolVectorType::vec_bool()),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ByteBlob {
    pub data: Vec<u8>,
}

pub fn byte_blob_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/ByteBlob",
        size_of::<ByteBlob>(),
        align_of::<ByteBlob>(),
        vec![Member::new(
            "data",
            offset_of!(ByteBlob, data),
            ValueType::Sequence(SequenceType::vec_of::<u8>(ValueType::Primitive(
                PrimitiveKind::Octet,
            ))),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Empty {}

pub fn empty_type() -> Arc<StructType> {
    StructType::new("test_msgs/msg/Empty", size_of::<Empty>(), 1, vec![])
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counter {
    pub value: u32,
}

pub fn counter_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/Counter",
        size_of::<Counter>(),
        align_of::<Counter>(),
        vec![Member::new(
            "value",
            offset_of!(Counter, value),
            ValueType::Primitive(PrimitiveKind::UInt32),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolOnly {
    pub valid: bool,
}

pub fn bool_only_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/BoolOnly",
        size_of::<BoolOnly>(),
        align_of::<BoolOnly>(),
        vec![Member::new(
            "valid",
            offset_of!(BoolOnly, valid),
            ValueType::Primitive(PrimitiveKind::Boolean),
        )],
    )
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AlignProbe {
    pub flag: u8,
    pub big: u64,
}

pub fn align_probe_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/AlignProbe",
        size_of::<AlignProbe>(),
        align_of::<AlignProbe>(),
        vec![
            Member::new(
                "flag",
                offset_of!(AlignProbe, flag),
                ValueType::Primitive(PrimitiveKind::UInt8),
            ),
            Member::new(
                "big",
                offset_of!(AlignProbe, big),
                ValueType::Primitive(PrimitiveKind::UInt64),
            ),
        ],
    )
}

/// Opaque 16-byte extended float, aligned the way a host `long double`
/// would be.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LongDoubleBits(pub [u8; 16]);

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extended {
    pub head: u8,
    pub value: LongDoubleBits,
}

pub fn extended_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/Extended",
        size_of::<Extended>(),
        align_of::<Extended>(),
        vec![
            Member::new(
                "head",
                offset_of!(Extended, head),
                ValueType::Primitive(PrimitiveKind::UInt8),
            ),
            Member::new(
                "value",
                offset_of!(Extended, value),
                ValueType::Primitive(PrimitiveKind::LongDouble),
            ),
        ],
    )
}

// ---------------------------------------------------------------------------
// A bit-packed boolean container, exercising the iteration-only contract of
// the boolean vector capability.

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedBits {
    pub bits: Vec<u8>,
    pub len: usize,
}

impl PackedBits {
    pub fn from_bools(values: &[bool]) -> Self {
        let mut bits = vec![0u8; values.len().div_ceil(8)];
        for (index, &value) in values.iter().enumerate() {
            if value {
                bits[index / 8] |= 1 << (index % 8);
            }
        }
        Self {
            bits,
            len: values.len(),
        }
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len)
            .map(|index| self.bits[index / 8] >> (index % 8) & 1 != 0)
            .collect()
    }
}

pub struct PackedBitsAccess;

unsafe fn packed(obj: &[u8]) -> &PackedBits {
    unsafe { &*(obj.as_ptr() as *const PackedBits) }
}

unsafe fn packed_mut(obj: &mut [u8]) -> &mut PackedBits {
    unsafe { &mut *(obj.as_mut_ptr() as *mut PackedBits) }
}

impl BoolVectorAccess for PackedBitsAccess {
    fn len(&self, obj: &[u8]) -> usize {
        unsafe { packed(obj) }.len
    }

    fn get(&self, obj: &[u8], index: usize) -> bool {
        let packed = unsafe { packed(obj) };
        packed.bits[index / 8] >> (index % 8) & 1 != 0
    }

    fn set(&self, obj: &mut [u8], index: usize, value: bool) {
        let packed = unsafe { packed_mut(obj) };
        if value {
            packed.bits[index / 8] |= 1 << (index % 8);
        } else {
            packed.bits[index / 8] &= !(1 << (index % 8));
        }
    }

    fn resize(&self, obj: &mut [u8], len: usize) {
        let packed = unsafe { packed_mut(obj) };
        packed.bits = vec![0; len.div_ceil(8)];
        packed.len = len;
    }
}

#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedFlags {
    pub bits: PackedBits,
}

pub fn packed_flags_type() -> Arc<StructType> {
    StructType::new(
        "test_msgs/msg/PackedFlags",
        size_of::<PackedFlags>(),
        align_of::<PackedFlags>(),
        vec![Member::new(
            "bits",
            offset_of!(PackedFlags, bits),
            ValueType::BoolVector(BoolVectorType {
                size_of: size_of::<PackedBits>(),
                align_of: align_of::<PackedBits>(),
                access: Arc::new(PackedBitsAccess),
            }),
        )],
    )
}
