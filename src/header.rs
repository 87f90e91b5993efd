//! This module defines the `NiftiHeader` struct: the 348-byte NIfTI-1
//! header, how it is derived from a [`Volume`], and how it is encoded and
//! decoded.
//!
//! [`Volume`]: ../volume/struct.Volume.html

use std::convert::TryFrom;
use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use num_traits::FromPrimitive;

use crate::affine::{self, Affine4};
use crate::error::{Result, ScanPickError};
use crate::typedef::{NiftiType, XForm};
use crate::volume::Volume;

/// Magic code for full NIFTI-1 files (extension ".nii[.gz]").
pub const MAGIC_CODE_NIP1: &[u8; 4] = b"n+1\0";
/// Magic code for NIFTI-1 header files (extension ".hdr[.gz]").
pub const MAGIC_CODE_NI1: &[u8; 4] = b"ni1\0";
/// Value of `sizeof_hdr`.
pub const HEADER_SIZE: i32 = 348;
/// Where voxel data starts in a single-file NIfTI-1 without extensions.
pub const VOX_OFFSET: f32 = 352.;

/// Units code for millimetres, the only spatial unit written here.
const NIFTI_UNITS_MM: u8 = 2;

/// Byte order a header was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little endian
    Little,
    /// Big endian
    Big,
}

/// The NIFTI-1 header. Fields are named after `nifti1.h`; the ones unused
/// by NIfTI-1 (`data_type`, `db_name`, `extents`, `session_error`,
/// `regular`, `glmax`, `glmin`) are kept so the header round-trips byte for
/// byte.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct NiftiHeader {
    pub sizeof_hdr: i32,
    pub data_type: [u8; 10],
    pub db_name: [u8; 18],
    pub extents: i32,
    pub session_error: i16,
    pub regular: u8,
    pub dim_info: u8,
    pub dim: [u16; 8],
    pub intent_p1: f32,
    pub intent_p2: f32,
    pub intent_p3: f32,
    pub intent_code: i16,
    pub datatype: i16,
    pub bitpix: i16,
    pub slice_start: i16,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub slice_end: i16,
    pub slice_code: u8,
    pub xyzt_units: u8,
    pub cal_max: f32,
    pub cal_min: f32,
    pub slice_duration: f32,
    pub toffset: f32,
    pub glmax: i32,
    pub glmin: i32,
    pub descrip: [u8; 80],
    pub aux_file: [u8; 24],
    pub qform_code: i16,
    pub sform_code: i16,
    pub quatern_b: f32,
    pub quatern_c: f32,
    pub quatern_d: f32,
    pub quatern_x: f32,
    pub quatern_y: f32,
    pub quatern_z: f32,
    pub srow_x: [f32; 4],
    pub srow_y: [f32; 4],
    pub srow_z: [f32; 4],
    pub intent_name: [u8; 16],
    pub magic: [u8; 4],
    /// Byte order of the file this header was read from. Always little
    /// endian for headers written by this crate.
    pub endianness: Endianness,
}

impl Default for NiftiHeader {
    fn default() -> NiftiHeader {
        NiftiHeader {
            sizeof_hdr: HEADER_SIZE,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: 0,
            dim_info: 0,
            dim: [1, 0, 0, 0, 0, 0, 0, 0],
            intent_p1: 0.,
            intent_p2: 0.,
            intent_p3: 0.,
            intent_code: 0,
            datatype: 0,
            bitpix: 0,
            slice_start: 0,
            pixdim: [1., 1., 1., 1., 0., 0., 0., 0.],
            vox_offset: VOX_OFFSET,
            scl_slope: 1.,
            scl_inter: 0.,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: NIFTI_UNITS_MM,
            cal_max: 0.,
            cal_min: 0.,
            slice_duration: 0.,
            toffset: 0.,
            glmax: 0,
            glmin: 0,
            descrip: [0; 80],
            aux_file: [0; 24],
            qform_code: XForm::Unknown as i16,
            sform_code: XForm::AlignedAnat as i16,
            quatern_b: 0.,
            quatern_c: 0.,
            quatern_d: 0.,
            quatern_x: 0.,
            quatern_y: 0.,
            quatern_z: 0.,
            srow_x: [1., 0., 0., 0.],
            srow_y: [0., 1., 0., 0.],
            srow_z: [0., 0., 1., 0.],
            intent_name: [0; 16],
            magic: *MAGIC_CODE_NIP1,
            endianness: Endianness::Little,
        }
    }
}

impl NiftiHeader {
    /// Build the header describing `volume`.
    ///
    /// `dim`, `datatype` and `bitpix` come from the voxels; the sform and
    /// `pixdim` come from the volume's affine, or from the identity when it
    /// has none.
    ///
    /// `dim` is a signed 16-bit field, so a volume with an axis longer than
    /// 32767 voxels cannot be described and is rejected.
    pub fn for_volume(volume: &Volume) -> Result<NiftiHeader> {
        let shape = volume.shape();
        let mut dim = [3, 1, 1, 1, 1, 1, 1, 1];
        for (d, &len) in dim[1..4].iter_mut().zip(shape.iter()) {
            *d = match i16::try_from(len) {
                Ok(len) => len as u16,
                Err(_) => {
                    return Err(ScanPickError::InvalidNifti(format!(
                        "volume shape {:?} exceeds the {} voxels a NIfTI-1 axis can hold",
                        shape,
                        i16::MAX
                    )))
                }
            };
        }
        let datatype = volume.data_type();
        let affine = volume.affine().cloned().unwrap_or_else(Affine4::identity);
        let zooms = affine::zooms(&affine);
        let [srow_x, srow_y, srow_z] = affine::srows(&affine);

        Ok(NiftiHeader {
            dim,
            datatype: datatype as i16,
            bitpix: (datatype.size_of() * 8) as i16,
            pixdim: [1., zooms[0], zooms[1], zooms[2], 0., 0., 0., 0.],
            srow_x,
            srow_y,
            srow_z,
            ..NiftiHeader::default()
        })
    }

    /// Set the free-text description, truncated to 79 bytes so that it stays
    /// NUL-terminated.
    pub fn set_description(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let len = bytes.len().min(self.descrip.len() - 1);
        self.descrip = [0; 80];
        self.descrip[..len].copy_from_slice(&bytes[..len]);
    }

    /// The description up to its first NUL byte.
    pub fn description(&self) -> String {
        let end = self.descrip.iter().position(|&b| b == 0).unwrap_or(80);
        String::from_utf8_lossy(&self.descrip[..end]).into_owned()
    }

    /// Get the data type as a validated enum.
    pub fn data_type(&self) -> Result<NiftiType> {
        FromPrimitive::from_i16(self.datatype)
            .ok_or_else(|| ScanPickError::InvalidNifti(format!("datatype code {}", self.datatype)))
    }

    /// Get the sform coordinate mapping method as a validated enum.
    pub fn sform(&self) -> Result<XForm> {
        FromPrimitive::from_i16(self.sform_code)
            .ok_or_else(|| ScanPickError::InvalidNifti(format!("sform code {}", self.sform_code)))
    }

    /// The sform as a 4x4 affine.
    pub fn sform_affine(&self) -> Affine4 {
        affine::from_srows(&self.srow_x, &self.srow_y, &self.srow_z)
    }

    /// The spatial extent `dim[1..=dim[0]]`.
    pub fn shape(&self) -> &[u16] {
        let rank = usize::from(self.dim[0]).min(7);
        &self.dim[1..=rank]
    }

    /// Number of voxels described by `dim`.
    pub fn voxel_count(&self) -> usize {
        self.shape().iter().map(|&d| usize::from(d)).product()
    }

    /// Encode this header in little-endian order, followed by the 4-byte
    /// extender announcing that no extension follows.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        type B = LittleEndian;

        writer.write_i32::<B>(self.sizeof_hdr)?;
        writer.write_all(&self.data_type)?;
        writer.write_all(&self.db_name)?;
        writer.write_i32::<B>(self.extents)?;
        writer.write_i16::<B>(self.session_error)?;
        writer.write_u8(self.regular)?;
        writer.write_u8(self.dim_info)?;
        for s in &self.dim {
            writer.write_u16::<B>(*s)?;
        }
        for f in &[self.intent_p1, self.intent_p2, self.intent_p3] {
            writer.write_f32::<B>(*f)?;
        }
        writer.write_i16::<B>(self.intent_code)?;
        writer.write_i16::<B>(self.datatype)?;
        writer.write_i16::<B>(self.bitpix)?;
        writer.write_i16::<B>(self.slice_start)?;
        for f in &self.pixdim {
            writer.write_f32::<B>(*f)?;
        }
        writer.write_f32::<B>(self.vox_offset)?;
        writer.write_f32::<B>(self.scl_slope)?;
        writer.write_f32::<B>(self.scl_inter)?;
        writer.write_i16::<B>(self.slice_end)?;
        writer.write_u8(self.slice_code)?;
        writer.write_u8(self.xyzt_units)?;
        for f in &[self.cal_max, self.cal_min, self.slice_duration, self.toffset] {
            writer.write_f32::<B>(*f)?;
        }
        writer.write_i32::<B>(self.glmax)?;
        writer.write_i32::<B>(self.glmin)?;
        writer.write_all(&self.descrip)?;
        writer.write_all(&self.aux_file)?;
        writer.write_i16::<B>(self.qform_code)?;
        writer.write_i16::<B>(self.sform_code)?;
        for f in &[
            self.quatern_b,
            self.quatern_c,
            self.quatern_d,
            self.quatern_x,
            self.quatern_y,
            self.quatern_z,
        ] {
            writer.write_f32::<B>(*f)?;
        }
        for f in self.srow_x.iter().chain(&self.srow_y).chain(&self.srow_z) {
            writer.write_f32::<B>(*f)?;
        }
        writer.write_all(&self.intent_name)?;
        writer.write_all(&self.magic)?;

        // extender: no extensions
        writer.write_u32::<B>(0)?;
        Ok(())
    }

    /// Decode a header from the start of a NIfTI-1 stream. The byte order is
    /// detected from `dim[0]`, which must lie in `1..=7`.
    pub fn from_reader<R: Read>(mut input: R) -> Result<NiftiHeader> {
        let mut raw = [0u8; 348];
        input.read_exact(&mut raw)?;

        let rank_le = LittleEndian::read_u16(&raw[40..42]);
        if (1..=7).contains(&rank_le) {
            parse_header::<LittleEndian>(&raw, Endianness::Little)
        } else {
            parse_header::<BigEndian>(&raw, Endianness::Big)
        }
    }
}

fn parse_header<B: ByteOrder>(raw: &[u8; 348], endianness: Endianness) -> Result<NiftiHeader> {
    let mut input = &raw[..];
    let mut h = NiftiHeader {
        endianness,
        ..NiftiHeader::default()
    };

    h.sizeof_hdr = input.read_i32::<B>()?;
    input.read_exact(&mut h.data_type)?;
    input.read_exact(&mut h.db_name)?;
    h.extents = input.read_i32::<B>()?;
    h.session_error = input.read_i16::<B>()?;
    h.regular = input.read_u8()?;
    h.dim_info = input.read_u8()?;
    for v in &mut h.dim {
        *v = input.read_u16::<B>()?;
    }
    h.intent_p1 = input.read_f32::<B>()?;
    h.intent_p2 = input.read_f32::<B>()?;
    h.intent_p3 = input.read_f32::<B>()?;
    h.intent_code = input.read_i16::<B>()?;
    h.datatype = input.read_i16::<B>()?;
    h.bitpix = input.read_i16::<B>()?;
    h.slice_start = input.read_i16::<B>()?;
    for v in &mut h.pixdim {
        *v = input.read_f32::<B>()?;
    }
    h.vox_offset = input.read_f32::<B>()?;
    h.scl_slope = input.read_f32::<B>()?;
    h.scl_inter = input.read_f32::<B>()?;
    h.slice_end = input.read_i16::<B>()?;
    h.slice_code = input.read_u8()?;
    h.xyzt_units = input.read_u8()?;
    h.cal_max = input.read_f32::<B>()?;
    h.cal_min = input.read_f32::<B>()?;
    h.slice_duration = input.read_f32::<B>()?;
    h.toffset = input.read_f32::<B>()?;
    h.glmax = input.read_i32::<B>()?;
    h.glmin = input.read_i32::<B>()?;
    input.read_exact(&mut h.descrip)?;
    input.read_exact(&mut h.aux_file)?;
    h.qform_code = input.read_i16::<B>()?;
    h.sform_code = input.read_i16::<B>()?;
    h.quatern_b = input.read_f32::<B>()?;
    h.quatern_c = input.read_f32::<B>()?;
    h.quatern_d = input.read_f32::<B>()?;
    h.quatern_x = input.read_f32::<B>()?;
    h.quatern_y = input.read_f32::<B>()?;
    h.quatern_z = input.read_f32::<B>()?;
    for v in h.srow_x.iter_mut().chain(&mut h.srow_y).chain(&mut h.srow_z) {
        *v = input.read_f32::<B>()?;
    }
    input.read_exact(&mut h.intent_name)?;
    input.read_exact(&mut h.magic)?;

    if h.sizeof_hdr != HEADER_SIZE {
        return Err(ScanPickError::InvalidNifti(format!(
            "sizeof_hdr is {}, expected {}",
            h.sizeof_hdr, HEADER_SIZE
        )));
    }
    if &h.magic != MAGIC_CODE_NI1 && &h.magic != MAGIC_CODE_NIP1 {
        return Err(ScanPickError::InvalidNifti("bad magic code".to_string()));
    }
    Ok(h)
}
