#![no_main]
use libfuzzer_sys::fuzz_target;
use scanpick::NiftiHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NiftiHeader::from_reader(data) {
        let _ = header.shape();
        let _ = header.voxel_count();
        let _ = header.data_type();
        let _ = header.sform();
        let _ = header.sform_affine();
        let _ = header.description();
    }
});
