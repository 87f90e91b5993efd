//! Codes defined by the NIfTI-1 standard which this crate reads or writes.
//!
//! Only the scalar voxel types are backed by a [`DataElement`] implementation;
//! the remaining codes are recognised so that headers written by other tools
//! can still be inspected.
//!
//! [`DataElement`]: ../volume/trait.DataElement.html

/// Data type of a voxel in a NIfTI-1 volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum NiftiType {
    /// unsigned char.
    Uint8 = 2,
    /// signed short.
    Int16 = 4,
    /// signed int.
    Int32 = 8,
    /// 32 bit float.
    Float32 = 16,
    /// 64 bit complex = 2 32 bit floats.
    Complex64 = 32,
    /// 64 bit float = double.
    Float64 = 64,
    /// 3 8 bit bytes.
    Rgb24 = 128,
    /// signed char.
    Int8 = 256,
    /// unsigned short.
    Uint16 = 512,
    /// unsigned int.
    Uint32 = 768,
    /// signed long long.
    Int64 = 1024,
    /// unsigned long long.
    Uint64 = 1280,
    /// 128 bit float = long double.
    Float128 = 1536,
    /// 128 bit complex = 2 64 bit floats.
    Complex128 = 1792,
    /// 256 bit complex = 2 128 bit floats
    Complex256 = 2048,
    /// 4 8 bit bytes.
    Rgba32 = 2304,
}

impl NiftiType {
    /// Size of one element of this type, in bytes.
    pub fn size_of(self) -> usize {
        use self::NiftiType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Rgb24 => 3,
            Int32 | Uint32 | Float32 | Rgba32 => 4,
            Int64 | Uint64 | Float64 | Complex64 => 8,
            Float128 | Complex128 => 16,
            Complex256 => 32,
        }
    }

    /// Whether values of this type are integers (label maps are).
    pub fn is_integer(self) -> bool {
        use self::NiftiType::*;
        match self {
            Int8 | Uint8 | Int16 | Uint16 | Int32 | Uint32 | Int64 | Uint64 => true,
            _ => false,
        }
    }
}

/// Coordinate system a qform or sform maps voxel indices into.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum XForm {
    /// Arbitrary coordinates.
    Unknown = 0,
    /// Scanner-based anatomical coordinates
    ScannerAnat = 1,
    /// Coordinates aligned to another file's, or to anatomical "truth".
    AlignedAnat = 2,
    /// Coordinates aligned to the Talairach-Tournoux atlas.
    Talairach = 3,
    /// MNI 152 normalized coordinates.
    Mni152 = 4,
}
