use image::{Rgba, RgbaImage};
use prism_core::rhi::RhiSettings;
use prism_core::sync::{CancellationToken, WaitError};
use prism_infra::imaging::mipmaps::{mip_level_count, MipChainGenerator, MipError};
use std::time::Duration;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255])
    })
}

#[test]
fn chain_halves_down_to_one_pixel() {
    let _ = env_logger::builder().is_test(true).try_init();
    let generator = MipChainGenerator::new(4).unwrap();
    let source = gradient(64, 32);

    let chain = generator
        .generate_with_settings(&source, &RhiSettings::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(chain.len() as u32, mip_level_count(64, 32));
    assert_eq!(chain.len(), 6);
    assert_eq!(chain.level(0), Some(&source));
    assert_eq!(chain.level(5).map(|l| l.dimensions()), Some((2, 1)));
    assert!(chain.level(6).is_none());
}

#[test]
fn single_pixel_image_has_one_level() {
    let generator = MipChainGenerator::new(1).unwrap();
    let source = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4]));

    let chain = generator
        .generate(&source, Duration::from_secs(1), &CancellationToken::new())
        .unwrap();

    assert_eq!(chain.into_levels(), vec![source]);
}

#[test]
fn zero_timeout_reports_the_unfinished_levels() {
    let generator = MipChainGenerator::new(1).unwrap();
    let source = gradient(256, 256);

    let err = generator
        .generate(&source, Duration::ZERO, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(
        err,
        MipError::Wait(WaitError::Timeout { expected: 8, .. })
    ));
}

#[test]
fn one_generator_serves_many_images() {
    let generator = MipChainGenerator::new(2).unwrap();
    for size in [8, 16, 128] {
        let chain = generator
            .generate(
                &gradient(size, size),
                Duration::from_secs(10),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(chain.levels().last().map(|l| l.dimensions()), Some((1, 1)));
    }
}
