//! Capability interfaces over host container representations, plus adapters
//! for the native Rust containers.
//!
//! The codec core never assumes how the host lays out a string or a
//! sequence. Descriptor nodes carry one of these accessors instead,
//! implemented once per representation and injected when the tree is built.
//! An accessor receives the container object as its raw byte image and
//! encapsulates whatever reinterpretation the layout requires, which keeps
//! every `unsafe` cast in this module.

use std::marker::PhantomData;
use std::slice;
use std::sync::Arc;

use crate::schema::{BoolVectorType, SequenceType, U8StringType, U16StringType, ValueType};

/// View a message struct as the byte image the codec walks.
///
/// The image is only ever handed back to accessors built for the same
/// layout; the codec itself reads primitive fields out of it at descriptor
/// offsets.
pub fn object_bytes<T>(value: &T) -> &[u8] {
    unsafe { slice::from_raw_parts((value as *const T).cast(), size_of::<T>()) }
}

/// Mutable variant of [`object_bytes`], for decode destinations.
pub fn object_bytes_mut<T>(value: &mut T) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut((value as *mut T).cast(), size_of::<T>()) }
}

/// Read/assign capability over an opaque 8-bit string object.
pub trait U8StringAccess: Send + Sync {
    /// Current contents as a contiguous span.
    fn get<'a>(&self, obj: &'a [u8]) -> &'a [u8];
    /// Replace the contents.
    fn assign(&self, obj: &mut [u8], contents: &[u8]);
}

/// Read/assign capability over an opaque 16-bit string object.
pub trait U16StringAccess: Send + Sync {
    fn get<'a>(&self, obj: &'a [u8]) -> &'a [u16];
    fn assign(&self, obj: &mut [u8], contents: &[u16]);
}

/// Element storage capability over an opaque variable-length sequence.
pub trait SequenceAccess: Send + Sync {
    /// Number of valid elements.
    fn len(&self, obj: &[u8]) -> usize;
    /// Contiguous element storage, `len * element_extent` bytes.
    fn contents<'a>(&self, obj: &'a [u8]) -> &'a [u8];
    /// Mutable element storage.
    fn contents_mut<'a>(&self, obj: &'a mut [u8]) -> &'a mut [u8];
    /// Resize to `len` elements, default-constructing new ones and dropping
    /// removed ones.
    fn resize(&self, obj: &mut [u8], len: usize);
}

/// Iteration-only capability over a boolean sequence. Storage may be
/// bit-packed, so there is deliberately no way to get at a contents pointer.
pub trait BoolVectorAccess: Send + Sync {
    fn len(&self, obj: &[u8]) -> usize;
    fn get(&self, obj: &[u8], index: usize) -> bool;
    fn set(&self, obj: &mut [u8], index: usize, value: bool);
    fn resize(&self, obj: &mut [u8], len: usize);
}

unsafe fn as_host<T>(obj: &[u8]) -> &T {
    debug_assert!(obj.len() >= size_of::<T>());
    debug_assert_eq!(obj.as_ptr().align_offset(align_of::<T>()), 0);
    unsafe { &*obj.as_ptr().cast() }
}

unsafe fn as_host_mut<T>(obj: &mut [u8]) -> &mut T {
    debug_assert!(obj.len() >= size_of::<T>());
    debug_assert_eq!(obj.as_ptr().align_offset(align_of::<T>()), 0);
    unsafe { &mut *obj.as_mut_ptr().cast() }
}

/// `String`-backed 8-bit string member.
pub struct StdString;

impl U8StringAccess for StdString {
    fn get<'a>(&self, obj: &'a [u8]) -> &'a [u8] {
        unsafe { as_host::<String>(obj) }.as_bytes()
    }

    fn assign(&self, obj: &mut [u8], contents: &[u8]) {
        let string = unsafe { as_host_mut::<String>(obj) };
        string.clear();
        string.push_str(&String::from_utf8_lossy(contents));
    }
}

/// `Vec<u16>`-backed wide string member.
pub struct WideString;

impl U16StringAccess for WideString {
    fn get<'a>(&self, obj: &'a [u8]) -> &'a [u16] {
        unsafe { as_host::<Vec<u16>>(obj) }.as_slice()
    }

    fn assign(&self, obj: &mut [u8], contents: &[u16]) {
        let vec = unsafe { as_host_mut::<Vec<u16>>(obj) };
        vec.clear();
        vec.extend_from_slice(contents);
    }
}

/// `Vec<T>`-backed span sequence member.
pub struct VecSequence<T> {
    _element: PhantomData<fn() -> T>,
}

impl<T> VecSequence<T> {
    pub const fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<T> Default for VecSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> SequenceAccess for VecSequence<T> {
    fn len(&self, obj: &[u8]) -> usize {
        unsafe { as_host::<Vec<T>>(obj) }.len()
    }

    fn contents<'a>(&self, obj: &'a [u8]) -> &'a [u8] {
        let vec = unsafe { as_host::<Vec<T>>(obj) };
        unsafe { slice::from_raw_parts(vec.as_ptr().cast(), vec.len() * size_of::<T>()) }
    }

    fn contents_mut<'a>(&self, obj: &'a mut [u8]) -> &'a mut [u8] {
        let vec = unsafe { as_host_mut::<Vec<T>>(obj) };
        unsafe { slice::from_raw_parts_mut(vec.as_mut_ptr().cast(), vec.len() * size_of::<T>()) }
    }

    fn resize(&self, obj: &mut [u8], len: usize) {
        unsafe { as_host_mut::<Vec<T>>(obj) }.resize_with(len, T::default);
    }
}

/// `Vec<bool>`-backed boolean vector member.
pub struct VecBool;

impl BoolVectorAccess for VecBool {
    fn len(&self, obj: &[u8]) -> usize {
        unsafe { as_host::<Vec<bool>>(obj) }.len()
    }

    fn get(&self, obj: &[u8], index: usize) -> bool {
        (unsafe { as_host::<Vec<bool>>(obj) })[index]
    }

    fn set(&self, obj: &mut [u8], index: usize, value: bool) {
        (unsafe { as_host_mut::<Vec<bool>>(obj) })[index] = value;
    }

    fn resize(&self, obj: &mut [u8], len: usize) {
        unsafe { as_host_mut::<Vec<bool>>(obj) }.resize(len, false);
    }
}

impl U8StringType {
    /// Descriptor node for a `String` field.
    pub fn std_string() -> Self {
        Self {
            size_of: size_of::<String>(),
            align_of: align_of::<String>(),
            access: Arc::new(StdString),
        }
    }
}

impl U16StringType {
    /// Descriptor node for a `Vec<u16>` wide-string field.
    pub fn wide_string() -> Self {
        Self {
            size_of: size_of::<Vec<u16>>(),
            align_of: align_of::<Vec<u16>>(),
            access: Arc::new(WideString),
        }
    }
}

impl SequenceType {
    /// Descriptor node for a `Vec<T>` field whose elements are described by
    /// `element`.
    pub fn vec_of<T: Default + 'static>(element: ValueType) -> Self {
        assert_eq!(
            element.size_of(),
            size_of::<T>(),
            "element descriptor extent must match the host element extent"
        );
        Self {
            element: Box::new(element),
            size_of: size_of::<Vec<T>>(),
            align_of: align_of::<Vec<T>>(),
            access: Arc::new(VecSequence::<T>::new()),
        }
    }
}

impl BoolVectorType {
    /// Descriptor node for a `Vec<bool>` field.
    pub fn vec_bool() -> Self {
        Self {
            size_of: size_of::<Vec<bool>>(),
            align_of: align_of::<Vec<bool>>(),
            access: Arc::new(VecBool),
        }
    }
}
