#![no_main]
use libfuzzer_sys::fuzz_target;
use scanpick::NiftiObject;

fuzz_target!(|data: &[u8]| {
    if let Ok(obj) = NiftiObject::from_reader(data) {
        let _ = obj.volume().shape();
    }
});
