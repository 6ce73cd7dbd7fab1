#![no_main]

use imaging::{ErrorKind, Image, Limits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Small ceilings keep each run fast; decode must fail cleanly, never panic
    let limits = Limits::default()
        .with_max_dimension(4096)
        .with_max_pixels(4_000_000);
    match Image::from_bytes_with_limits(data, limits) {
        Ok(img) => {
            let (w, h) = img.dimensions().expect("fresh handle is open");
            assert!(w > 0 && h > 0);
            assert_eq!(img.raster().expect("open").as_raw().len(), (w * h * 4) as usize);
        }
        Err(err) => assert!(matches!(
            err.kind(),
            ErrorKind::Decode | ErrorKind::ResourceExhausted
        )),
    }
});
