//! In-memory volumes: a 3D voxel array in NIfTI axis order `(i, j, k)` and
//! an optional voxel-to-world affine.
//!
//! Arrays coming from NumPy are indexed `(z, y, x)`; [`Volume::from_zyx`]
//! reverses the axes without copying so that the first axis varies fastest
//! on disk, as NIfTI-1 requires.
//!
//! [`Volume::from_zyx`]: ./struct.Volume.html#method.from_zyx

pub mod element;

use ndarray::{Array3, ArrayD, Axis, Ix3};

pub use self::element::DataElement;
use crate::affine::Affine4;
use crate::typedef::NiftiType;

/// Type-erased voxel storage, one variant per supported element type.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    /// unsigned 8-bit voxels (label maps)
    U8(Array3<u8>),
    /// signed 8-bit voxels
    I8(Array3<i8>),
    /// signed 16-bit voxels
    I16(Array3<i16>),
    /// unsigned 16-bit voxels
    U16(Array3<u16>),
    /// signed 32-bit voxels
    I32(Array3<i32>),
    /// unsigned 32-bit voxels
    U32(Array3<u32>),
    /// signed 64-bit voxels
    I64(Array3<i64>),
    /// unsigned 64-bit voxels
    U64(Array3<u64>),
    /// single precision voxels
    F32(Array3<f32>),
    /// double precision voxels
    F64(Array3<f64>),
}

/// Apply `$body` to the typed array inside a `VoxelData`, whatever its type.
macro_rules! with_voxels {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            VoxelData::U8($arr) => $body,
            VoxelData::I8($arr) => $body,
            VoxelData::I16($arr) => $body,
            VoxelData::U16($arr) => $body,
            VoxelData::I32($arr) => $body,
            VoxelData::U32($arr) => $body,
            VoxelData::I64($arr) => $body,
            VoxelData::U64($arr) => $body,
            VoxelData::F32($arr) => $body,
            VoxelData::F64($arr) => $body,
        }
    };
}

impl VoxelData {
    /// The NIfTI-1 code of the element type.
    pub fn data_type(&self) -> NiftiType {
        with_voxels!(self, arr => element_type_of(arr))
    }

    /// Volume extent along `(i, j, k)`.
    pub fn shape(&self) -> [usize; 3] {
        with_voxels!(self, arr => {
            let s = arr.shape();
            [s[0], s[1], s[2]]
        })
    }

    /// Total number of voxels.
    pub fn len(&self) -> usize {
        with_voxels!(self, arr => arr.len())
    }

    /// Whether the volume holds no voxel at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binarize (or round) the voxels into an 8-bit label map.
    pub fn to_label_map(&self, mode: MaskMode, threshold: f64) -> Array3<u8> {
        with_voxels!(self, arr => label_map(arr, mode, threshold))
    }
}

fn element_type_of<T: DataElement>(_: &Array3<T>) -> NiftiType {
    T::DATA_TYPE
}

/// How a segmentation volume is turned into a `u8` label map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Integer masks: any positive value is foreground. Float masks: values
    /// above the threshold are foreground.
    Auto,
    /// Values above the threshold are foreground, whatever the type.
    Threshold,
    /// Round to the nearest integer and clamp into `0..=255`.
    Round,
}

impl Default for MaskMode {
    fn default() -> Self {
        MaskMode::Auto
    }
}

fn label_map<T: DataElement>(arr: &Array3<T>, mode: MaskMode, threshold: f64) -> Array3<u8> {
    let integer = T::DATA_TYPE.is_integer();
    arr.mapv(|v| {
        let x: f64 = v.as_();
        match mode {
            MaskMode::Auto if integer => (x > 0.) as u8,
            MaskMode::Auto | MaskMode::Threshold => (x > threshold) as u8,
            MaskMode::Round => x.round().max(0.).min(255.) as u8,
        }
    })
}

/// A 3D volume ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: VoxelData,
    affine: Option<Affine4>,
}

impl Volume {
    /// Create a volume from voxels already in `(i, j, k)` order.
    pub fn new(data: VoxelData) -> Self {
        Volume { data, affine: None }
    }

    /// Create a volume from a typed array indexed `(z, y, x)`.
    pub fn from_zyx<T: DataElement>(data: Array3<T>) -> Self {
        Volume::new(T::wrap(data.reversed_axes()))
    }

    /// Attach a voxel-to-world transform.
    pub fn with_affine(mut self, affine: Affine4) -> Self {
        self.affine = Some(affine);
        self
    }

    /// The voxels.
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    /// The voxel-to-world transform, if the source provided one.
    pub fn affine(&self) -> Option<&Affine4> {
        self.affine.as_ref()
    }

    /// Extent along `(i, j, k)`.
    pub fn shape(&self) -> [usize; 3] {
        self.data.shape()
    }

    /// The NIfTI-1 code of the element type.
    pub fn data_type(&self) -> NiftiType {
        self.data.data_type()
    }

    /// Turn this volume into a `u8` label map, keeping its orientation.
    pub fn into_label_map(self, mode: MaskMode, threshold: f64) -> Self {
        Volume {
            data: VoxelData::U8(self.data.to_label_map(mode, threshold)),
            affine: self.affine,
        }
    }
}

/// Remove every axis of length 1 and require exactly three to remain.
///
/// Returns the offending shape on failure.
pub fn squeeze_to_3d<T>(mut data: ArrayD<T>) -> ::std::result::Result<Array3<T>, Vec<usize>> {
    while let Some(axis) = data.shape().iter().position(|&len| len == 1) {
        data = data.index_axis_move(Axis(axis), 0);
    }
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>().map_err(|_| shape)
}
