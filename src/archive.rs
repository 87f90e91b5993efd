//! Reading volumes out of NumPy `.npz` archives.
//!
//! Every array in the archive is an entry. Entries whose name matches one
//! of the metadata patterns, or that carry the orientation suffix, are
//! metadata; everything else is data. A data entry `ct` may have its
//! voxel-to-world transform stored next to it as a 4x4 entry `ct_affine`.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use glob::Pattern;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use npyz::npz::NpzArchive;
use npyz::{DType, Order};

use crate::affine::{affine_from_row_major, Affine4};
use crate::error::{Result, ScanPickError};
use crate::volume::{squeeze_to_3d, DataElement, Volume};

/// Metadata patterns used when none are configured.
pub const DEFAULT_METADATA_PATTERNS: &[&str] = &["*_mask_name_lst", "*_names"];
/// Suffix of the entry holding another entry's affine.
pub const DEFAULT_AFFINE_SUFFIX: &str = "_affine";
/// Name fragment marking a segmentation.
pub const DEFAULT_MASK_TOKEN: &str = "mask";

/// Whether an entry holds a volume or describes other entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTag {
    /// A volume candidate
    Data,
    /// Names, labels, orientation and other bookkeeping
    Metadata,
}

/// What a data entry depicts, which decides how it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A CT scan (intensity image)
    Image,
    /// A segmentation mask
    Mask,
}

/// The naming conventions of an archive.
#[derive(Debug, Clone)]
pub struct NamingRules {
    metadata_patterns: Vec<Pattern>,
    affine_suffix: String,
    mask_token: String,
}

impl Default for NamingRules {
    fn default() -> Self {
        NamingRules {
            metadata_patterns: DEFAULT_METADATA_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
            affine_suffix: DEFAULT_AFFINE_SUFFIX.to_string(),
            mask_token: DEFAULT_MASK_TOKEN.to_string(),
        }
    }
}

impl NamingRules {
    /// Replace the metadata patterns (glob syntax, e.g. `meta_*`).
    pub fn metadata_patterns<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.metadata_patterns = patterns
            .into_iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| {
                    ScanPickError::InvalidPattern(p.as_ref().to_string(), e.to_string())
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Replace the suffix of orientation entries.
    pub fn affine_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.affine_suffix = suffix.into();
        self
    }

    /// Replace the name fragment identifying segmentations.
    pub fn mask_token<S: Into<String>>(mut self, token: S) -> Self {
        self.mask_token = token.into();
        self
    }

    /// Tag an entry name.
    pub fn tag(&self, name: &str) -> EntryTag {
        let is_affine = !self.affine_suffix.is_empty() && name.ends_with(&self.affine_suffix);
        if is_affine || self.metadata_patterns.iter().any(|p| p.matches(name)) {
            EntryTag::Metadata
        } else {
            EntryTag::Data
        }
    }

    /// Classify a data entry by name.
    pub fn kind(&self, name: &str) -> EntryKind {
        if !self.mask_token.is_empty() && name.contains(&self.mask_token) {
            EntryKind::Mask
        } else {
            EntryKind::Image
        }
    }

    /// The name of the image a mask was drawn on: everything before
    /// `_<token>`, e.g. `9_tibia_R` for `9_tibia_R_mask_tibia_R`.
    pub fn background_base<'a>(&self, mask_name: &'a str) -> Option<&'a str> {
        let marker = format!("_{}", self.mask_token);
        mask_name
            .find(&marker)
            .map(|idx| &mask_name[..idx])
            .filter(|base| !base.is_empty())
    }

    fn affine_entry(&self, name: &str) -> String {
        format!("{}{}", name, self.affine_suffix)
    }
}

/// An entry name with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Array name inside the archive (without `.npy`)
    pub name: String,
    /// Data or metadata
    pub tag: EntryTag,
}

/// Element type of an array, as NumPy describes it (`<f8`, `|u1`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementType {
    /// NumPy kind character: `i`, `u`, `f`, `b`, ...
    pub kind: char,
    /// Size in bytes
    pub size: u64,
    /// The full type string
    pub descr: String,
}

impl ElementType {
    fn from_dtype(dtype: &DType) -> ElementType {
        match dtype {
            DType::Plain(ts) => {
                let descr = ts.to_string();
                let mut chars = descr.chars();
                chars.next();
                let kind = chars.next().unwrap_or('?');
                let size = chars.as_str().parse().unwrap_or(0);
                ElementType { kind, size, descr }
            }
            _ => ElementType {
                kind: 'V',
                size: 0,
                descr: "structured".to_string(),
            },
        }
    }

    /// Integers and floats are numeric; booleans, strings and records are not.
    pub fn is_numeric(&self) -> bool {
        match self.kind {
            'i' | 'u' | 'f' => true,
            _ => false,
        }
    }
}

/// Header-level description of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Array shape as stored
    pub shape: Vec<u64>,
    /// Element type
    pub dtype: ElementType,
    /// Whether the array is stored in Fortran order
    pub fortran_order: bool,
}

impl EntryInfo {
    /// At least three axes, and the last three are non-empty.
    pub fn is_3d_like(&self) -> bool {
        self.shape.len() >= 3 && self.shape[self.shape.len() - 3..].iter().all(|&d| d > 0)
    }
}

/// A data entry eligible for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Entry name
    pub name: String,
    /// Image or mask
    pub kind: EntryKind,
    /// Header description
    pub info: EntryInfo,
}

/// An open `.npz` archive.
pub struct Archive {
    path: PathBuf,
    npz: NpzArchive<BufReader<File>>,
    names: Vec<String>,
    rules: NamingRules,
}

impl ::std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("names", &self.names)
            .field("rules", &self.rules)
            .finish()
    }
}

impl Archive {
    /// Open an archive read-only.
    pub fn open<P: AsRef<Path>>(path: P, rules: NamingRules) -> Result<Archive> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScanPickError::NotFound("archive", path.to_path_buf()));
        }
        let npz = NpzArchive::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => ScanPickError::Format(
                path.display().to_string(),
                format!("not an npz archive: {}", e),
            ),
            _ => ScanPickError::Io(e),
        })?;
        let mut names: Vec<String> = npz.array_names().map(|n| n.to_string()).collect();
        names.sort();
        Ok(Archive {
            path: path.to_path_buf(),
            npz,
            names,
            rules,
        })
    }

    /// Where the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The naming rules in use.
    pub fn rules(&self) -> &NamingRules {
        &self.rules
    }

    /// Every entry, sorted by name, tagged data or metadata.
    pub fn entries(&self) -> Vec<Entry> {
        self.names
            .iter()
            .map(|name| Entry {
                name: name.clone(),
                tag: self.rules.tag(name),
            })
            .collect()
    }

    /// Whether an entry of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Read only the header of an entry.
    pub fn describe(&mut self, name: &str) -> Result<EntryInfo> {
        let npy = self
            .npz
            .by_name(name)
            .map_err(|e| entry_error(name, e))?
            .ok_or_else(|| ScanPickError::Format(name.to_string(), "no such entry".to_string()))?;
        Ok(EntryInfo {
            shape: npy.shape().to_vec(),
            dtype: ElementType::from_dtype(&npy.dtype()),
            fortran_order: matches!(npy.order(), Order::Fortran),
        })
    }

    /// The data entries that can be displayed: numeric, 3D-like and, when
    /// `filter` is given, of that kind. Entries whose header cannot be read
    /// are skipped with a warning.
    pub fn candidates(&mut self, filter: Option<EntryKind>) -> Vec<Candidate> {
        let data: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|e| e.tag == EntryTag::Data)
            .map(|e| e.name)
            .collect();

        let mut out = Vec::new();
        for name in data {
            let info = match self.describe(&name) {
                Ok(info) => info,
                Err(e) => {
                    warn!("skipping entry '{}': {}", name, e);
                    continue;
                }
            };
            if !info.dtype.is_numeric() || !info.is_3d_like() {
                debug!("entry '{}' ({:?} {}) is not a volume", name, info.shape, info.dtype.descr);
                continue;
            }
            let kind = self.rules.kind(&name);
            if filter.map_or(false, |f| f != kind) {
                continue;
            }
            out.push(Candidate { name, kind, info });
        }
        out
    }

    /// The CT image a mask entry belongs to, if the archive holds it.
    pub fn background_for(&self, mask_name: &str) -> Option<String> {
        let base = self.rules.background_base(mask_name)?;
        if self.contains(base) && self.rules.kind(base) == EntryKind::Image {
            Some(base.to_string())
        } else {
            None
        }
    }

    /// Read an entry as a volume, with its affine when the archive has one.
    ///
    /// The array is squeezed to three axes and reordered from NumPy's
    /// `(z, y, x)` to NIfTI's `(i, j, k)`.
    pub fn read_volume(&mut self, name: &str) -> Result<Volume> {
        let info = self.describe(name)?;
        let shape: Vec<usize> = info.shape.iter().map(|&d| d as usize).collect();
        let volume = match (info.dtype.kind, info.dtype.size) {
            ('u', 1) => self.read_typed::<u8>(name, &shape, info.fortran_order)?,
            ('i', 1) => self.read_typed::<i8>(name, &shape, info.fortran_order)?,
            ('i', 2) => self.read_typed::<i16>(name, &shape, info.fortran_order)?,
            ('u', 2) => self.read_typed::<u16>(name, &shape, info.fortran_order)?,
            ('i', 4) => self.read_typed::<i32>(name, &shape, info.fortran_order)?,
            ('u', 4) => self.read_typed::<u32>(name, &shape, info.fortran_order)?,
            ('i', 8) => self.read_typed::<i64>(name, &shape, info.fortran_order)?,
            ('u', 8) => self.read_typed::<u64>(name, &shape, info.fortran_order)?,
            ('f', 4) => self.read_typed::<f32>(name, &shape, info.fortran_order)?,
            ('f', 8) => self.read_typed::<f64>(name, &shape, info.fortran_order)?,
            _ => {
                return Err(ScanPickError::Format(
                    name.to_string(),
                    format!("unsupported element type {}", info.dtype.descr),
                ))
            }
        };

        match self.read_affine(name)? {
            Some(affine) => Ok(volume.with_affine(affine)),
            None => Ok(volume),
        }
    }

    fn read_typed<T>(&mut self, name: &str, shape: &[usize], fortran: bool) -> Result<Volume>
    where
        T: DataElement + npyz::Deserialize,
    {
        let values: Vec<T> = self.read_vec(name)?;
        let array = ArrayD::from_shape_vec(IxDyn(shape).set_f(fortran), values)
            .map_err(|e| ScanPickError::Format(name.to_string(), e.to_string()))?;
        let array = squeeze_to_3d(array).map_err(|shape| {
            ScanPickError::Format(
                name.to_string(),
                format!("expected 3 axes after squeezing, found shape {:?}", shape),
            )
        })?;
        Ok(Volume::from_zyx(array))
    }

    fn read_vec<T: npyz::Deserialize>(&mut self, name: &str) -> Result<Vec<T>> {
        let npy = self
            .npz
            .by_name(name)
            .map_err(|e| entry_error(name, e))?
            .ok_or_else(|| ScanPickError::Format(name.to_string(), "no such entry".to_string()))?;
        npy.into_vec::<T>().map_err(|e| entry_error(name, e))
    }

    fn read_affine(&mut self, name: &str) -> Result<Option<Affine4>> {
        let entry = self.rules.affine_entry(name);
        if !self.contains(&entry) {
            return Ok(None);
        }
        let info = self.describe(&entry)?;
        if info.shape != [4, 4] {
            return Err(ScanPickError::Format(
                entry,
                format!("an affine must be 4x4, found {:?}", info.shape),
            ));
        }
        let mut values: Vec<f32> = match (info.dtype.kind, info.dtype.size) {
            ('f', 4) => self.read_vec::<f32>(&entry)?,
            ('f', 8) => self
                .read_vec::<f64>(&entry)?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            _ => {
                return Err(ScanPickError::Format(
                    entry,
                    format!("an affine must hold floats, found {}", info.dtype.descr),
                ))
            }
        };
        if info.fortran_order {
            // stored column-major: transpose into row-major
            values = (0..16).map(|i| values[(i % 4) * 4 + i / 4]).collect();
        }
        affine_from_row_major(&values)
            .map(Some)
            .ok_or_else(|| ScanPickError::Format(entry, "last row is not [0, 0, 0, 1]".to_string()))
    }
}

fn entry_error(name: &str, e: io::Error) -> ScanPickError {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
            ScanPickError::Format(name.to_string(), e.to_string())
        }
        _ => ScanPickError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> NamingRules {
        NamingRules::default()
    }

    #[test]
    fn default_metadata_names() {
        let rules = rules();
        assert_eq!(rules.tag("9_tibia_R_mask_name_lst"), EntryTag::Metadata);
        assert_eq!(rules.tag("label_names"), EntryTag::Metadata);
        assert_eq!(rules.tag("9_tibia_R_affine"), EntryTag::Metadata);
        assert_eq!(rules.tag("9_tibia_R"), EntryTag::Data);
        assert_eq!(rules.tag("9_tibia_R_mask_tibia_R"), EntryTag::Data);
    }

    #[test]
    fn custom_metadata_pattern() {
        let rules = rules().metadata_patterns(&["meta_*"]).unwrap();
        assert_eq!(rules.tag("meta_info"), EntryTag::Metadata);
        assert_eq!(rules.tag("ct_scan"), EntryTag::Data);
        assert_eq!(rules.tag("seg_mask"), EntryTag::Data);
        // the defaults were replaced
        assert_eq!(rules.tag("label_names"), EntryTag::Data);
    }

    #[test]
    fn element_types_from_dtypes() {
        let dtype = |s: &str| DType::new_scalar(s.parse::<npyz::TypeStr>().unwrap());
        let t = ElementType::from_dtype(&dtype("<i2"));
        assert_eq!((t.kind, t.size, t.descr.as_str()), ('i', 2, "<i2"));
        let t = ElementType::from_dtype(&dtype("<f8"));
        assert_eq!((t.kind, t.size), ('f', 8));
        assert!(t.is_numeric());
        let t = ElementType::from_dtype(&dtype("|b1"));
        assert!(!t.is_numeric());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        match rules().metadata_patterns(&["meta_[*"]) {
            Err(ScanPickError::InvalidPattern(p, _)) => assert_eq!(p, "meta_[*"),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn kinds_and_backgrounds() {
        let rules = rules();
        assert_eq!(rules.kind("seg_mask"), EntryKind::Mask);
        assert_eq!(rules.kind("ct_scan"), EntryKind::Image);
        assert_eq!(
            rules.background_base("9_tibia_R_mask_tibia_R"),
            Some("9_tibia_R")
        );
        assert_eq!(rules.background_base("seg_mask"), Some("seg"));
        assert_eq!(rules.background_base("mask_only"), None);
        assert_eq!(rules.background_base("ct_scan"), None);
    }

    #[test]
    fn element_types() {
        let info = EntryInfo {
            shape: vec![1, 4, 5, 6],
            dtype: ElementType {
                kind: 'f',
                size: 4,
                descr: "<f4".to_string(),
            },
            fortran_order: false,
        };
        assert!(info.is_3d_like());
        assert!(info.dtype.is_numeric());

        let flat = EntryInfo {
            shape: vec![4, 0, 6],
            ..info.clone()
        };
        assert!(!flat.is_3d_like());
        let two_d = EntryInfo {
            shape: vec![4, 6],
            ..info
        };
        assert!(!two_d.is_3d_like());

        let boolean = ElementType {
            kind: 'b',
            size: 1,
            descr: "|b1".to_string(),
        };
        assert!(!boolean.is_numeric());
    }
}
