//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use npyz::npz::NpzWriter;
use npyz::{AutoSerialize, Order, WriterBuilder};

/// Add one array to an archive being written. `data` is in the given order.
pub fn add_array<W, T>(npz: &mut NpzWriter<W>, name: &str, shape: &[u64], order: Order, data: Vec<T>)
where
    W: Write + Seek,
    T: AutoSerialize,
{
    let mut writer = npz
        .array(name, Default::default())
        .unwrap()
        .default_dtype()
        .shape(shape)
        .order(order)
        .begin_nd()
        .unwrap();
    writer.extend(data).unwrap();
    writer.finish().unwrap();
}

/// `0, 1, 2, ...` as a `(z, y, x)` volume of the given shape.
pub fn ramp_i16(shape: [u64; 3]) -> Vec<i16> {
    (0..shape.iter().product::<u64>()).map(|v| v as i16).collect()
}

/// A sphere-ish blob of ones in a zero volume.
pub fn blob_u8(shape: [u64; 3]) -> Vec<u8> {
    let [z, y, x] = shape;
    let mut out = Vec::new();
    for k in 0..z {
        for j in 0..y {
            for i in 0..x {
                let d = (k as i64 - z as i64 / 2).pow(2)
                    + (j as i64 - y as i64 / 2).pow(2)
                    + (i as i64 - x as i64 / 2).pow(2);
                out.push((d <= 2) as u8);
            }
        }
    }
    out
}

/// The archive of the selection scenario: `meta_info` (metadata under the
/// `meta_*` pattern), `ct_scan` and `seg_mask`.
pub fn meta_archive(dir: &Path) -> PathBuf {
    let path = dir.join("meta.npz");
    let mut npz = NpzWriter::create(&path).unwrap();
    add_array(&mut npz, "meta_info", &[3], Order::C, vec![1i32, 2, 3]);
    add_array(&mut npz, "ct_scan", &[4, 5, 6], Order::C, ramp_i16([4, 5, 6]));
    add_array(&mut npz, "seg_mask", &[4, 5, 6], Order::C, blob_u8([4, 5, 6]));
    drop(npz);
    path
}

/// An archive with a CT, its segmentation and their affine, named the way
/// the segmentation exports are.
pub fn tibia_archive(dir: &Path) -> PathBuf {
    let path = dir.join("tibia.npz");
    let mut npz = NpzWriter::create(&path).unwrap();
    add_array(&mut npz, "9_tibia_R", &[4, 5, 6], Order::C, ramp_i16([4, 5, 6]));
    #[rustfmt::skip]
    let affine = vec![
        0.5f64, 0., 0., -10.,
        0., 0.5, 0., 20.,
        0., 0., 2., 30.,
        0., 0., 0., 1.,
    ];
    add_array(&mut npz, "9_tibia_R_affine", &[4, 4], Order::C, affine);
    let mask: Vec<f32> = blob_u8([4, 5, 6]).into_iter().map(|v| v as f32 * 0.9).collect();
    add_array(&mut npz, "9_tibia_R_mask_tibia_R", &[1, 4, 5, 6], Order::C, mask);
    add_array(&mut npz, "9_tibia_R_mask_name_lst", &[1], Order::C, vec![7i32]);
    drop(npz);
    path
}

/// An archive whose entries are all metadata or not volumes.
pub fn empty_archive(dir: &Path) -> PathBuf {
    let path = dir.join("empty.npz");
    let mut npz = NpzWriter::create(&path).unwrap();
    add_array(&mut npz, "scan_names", &[2], Order::C, vec![0i32, 1]);
    add_array(&mut npz, "slice", &[4, 5], Order::C, vec![0f32; 20]);
    add_array(&mut npz, "flags", &[2, 2, 2], Order::C, vec![true; 8]);
    drop(npz);
    path
}

/// A stand-in viewer: records its arguments in `args.txt`, the size of
/// every `.nii.gz` argument in `sizes.txt`, then exits with `code`.
#[cfg(unix)]
pub fn fake_viewer(dir: &Path, code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-viewer");
    let script = format!(
        "#!/bin/sh\n\
         printf '%s\\n' \"$@\" > '{dir}/args.txt'\n\
         for a in \"$@\"; do\n\
         case \"$a\" in *.nii.gz) wc -c < \"$a\" >> '{dir}/sizes.txt' ;; esac\n\
         done\n\
         exit {code}\n",
        dir = dir.display(),
        code = code
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A stand-in viewer that writes its pid to `viewer.pid` and then sleeps,
/// like a viewer left open.
#[cfg(unix)]
pub fn sleeping_viewer(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("sleeping-viewer");
    let script = format!(
        "#!/bin/sh\n\
         echo $$ > '{dir}/viewer.pid'\n\
         exec sleep 30\n",
        dir = dir.display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Every file left in `dir`.
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}
