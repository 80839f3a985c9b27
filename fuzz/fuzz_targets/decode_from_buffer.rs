#![no_main]

use gridcut::engine::SourceImage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    if let Ok(image) = SourceImage::decode(data) {
        assert!(image.width() > 0 && image.height() > 0);
    }
});
