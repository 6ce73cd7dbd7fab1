#![no_main]

use arbitrary::Arbitrary;
use imaging::{EncodingFormat, Image, RasterImage, Rgb};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Step {
    Resize { width: u16, height: u16 },
    Crop { aspect: f64 },
    Flatten { r: u8, g: u8, b: u8 },
    Encode { format: u8, quality: u8 },
    Dispose,
}

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    seed: Vec<u8>,
    steps: Vec<Step>,
}

fn build_raster(input: &Input) -> RasterImage {
    let width = u32::from(input.width) % 64 + 1;
    let height = u32::from(input.height) % 64 + 1;
    let len = (width * height * 4) as usize;
    let data: Vec<u8> = if input.seed.is_empty() {
        vec![0; len]
    } else {
        input.seed.iter().copied().cycle().take(len).collect()
    };
    RasterImage::from_rgba(width, height, data).expect("length matches")
}

fuzz_target!(|input: Input| {
    let mut img = Image::from_raster(build_raster(&input));

    for step in input.steps.iter().take(16) {
        let before = img.raster().ok().cloned();
        let result = match *step {
            Step::Resize { width, height } => {
                img.resize(u32::from(width) % 512, u32::from(height) % 512)
            }
            Step::Crop { aspect } => img.crop(aspect),
            Step::Flatten { r, g, b } => img.flatten(Rgb::new(r, g, b)),
            Step::Encode { format, quality } => {
                let format = EncodingFormat::ALL[usize::from(format) % EncodingFormat::ALL.len()];
                img.encode(format, u32::from(quality)).map(drop)
            }
            Step::Dispose => {
                img.dispose();
                Ok(())
            }
        };
        // a failed step leaves the raster exactly as it was
        if result.is_err() {
            assert_eq!(img.raster().ok().cloned(), before);
        }
    }
});
