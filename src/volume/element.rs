//! This module defines the data element API: the scalar types a volume may
//! hold and how each one is encoded in a NIfTI-1 file.
use std::fmt::Debug;
use std::io::{Read, Result as IoResult, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array3;
use num_traits::AsPrimitive;

use super::VoxelData;
use crate::typedef::NiftiType;

/// A scalar voxel type with a NIfTI-1 data type code.
///
/// Values are always written little-endian; reading accepts either byte
/// order since files written by other tools may be big-endian.
pub trait DataElement: 'static + Copy + Debug + PartialEq + AsPrimitive<f64> {
    /// The NIfTI-1 data type code of this element type.
    const DATA_TYPE: NiftiType;

    /// Write one value in little-endian order.
    fn write_le<W: Write>(self, writer: &mut W) -> IoResult<()>;

    /// Read one value in the byte order `B`.
    fn read_with<B: ByteOrder, R: Read>(reader: &mut R) -> IoResult<Self>;

    /// Wrap a typed array into the type-erased voxel container.
    fn wrap(data: Array3<Self>) -> VoxelData;
}

impl DataElement for u8 {
    const DATA_TYPE: NiftiType = NiftiType::Uint8;

    fn write_le<W: Write>(self, writer: &mut W) -> IoResult<()> {
        writer.write_u8(self)
    }

    fn read_with<B: ByteOrder, R: Read>(reader: &mut R) -> IoResult<Self> {
        reader.read_u8()
    }

    fn wrap(data: Array3<Self>) -> VoxelData {
        VoxelData::U8(data)
    }
}

impl DataElement for i8 {
    const DATA_TYPE: NiftiType = NiftiType::Int8;

    fn write_le<W: Write>(self, writer: &mut W) -> IoResult<()> {
        writer.write_i8(self)
    }

    fn read_with<B: ByteOrder, R: Read>(reader: &mut R) -> IoResult<Self> {
        reader.read_i8()
    }

    fn wrap(data: Array3<Self>) -> VoxelData {
        VoxelData::I8(data)
    }
}

macro_rules! multi_byte_element {
    ($t:ty, $code:ident, $variant:ident, $write:ident, $read:ident) => {
        impl DataElement for $t {
            const DATA_TYPE: NiftiType = NiftiType::$code;

            fn write_le<W: Write>(self, writer: &mut W) -> IoResult<()> {
                writer.$write::<LittleEndian>(self)
            }

            fn read_with<B: ByteOrder, R: Read>(reader: &mut R) -> IoResult<Self> {
                reader.$read::<B>()
            }

            fn wrap(data: Array3<Self>) -> VoxelData {
                VoxelData::$variant(data)
            }
        }
    };
}

multi_byte_element!(i16, Int16, I16, write_i16, read_i16);
multi_byte_element!(u16, Uint16, U16, write_u16, read_u16);
multi_byte_element!(i32, Int32, I32, write_i32, read_i32);
multi_byte_element!(u32, Uint32, U32, write_u32, read_u32);
multi_byte_element!(i64, Int64, I64, write_i64, read_i64);
multi_byte_element!(u64, Uint64, U64, write_u64, read_u64);
multi_byte_element!(f32, Float32, F32, write_f32, read_f32);
multi_byte_element!(f64, Float64, F64, write_f64, read_f64);
