mod common;

use common::{headless, Fixture};
use prism_core::rhi::resource::{Texture, TextureDesc, TextureFlags};
use prism_core::rhi::{Format, RhiError};
use prism_infra::graphics::headless::DeviceCall;

#[test]
fn blit_copies_between_identical_textures() {
    let fx = Fixture::new();
    let source = fx.color_target("frame", 64);
    let destination = fx.color_target("frame_history", 64);
    let mut list = fx.recording("blit");

    list.blit(&source, &destination).unwrap();

    assert_eq!(
        headless(&mut list).calls(),
        &[DeviceCall::CopyResource {
            destination: destination.handle().unwrap(),
            source: source.handle().unwrap(),
        }]
    );
}

#[test]
fn blit_rejects_mismatched_or_aliased_textures() {
    let fx = Fixture::new();
    let source = fx.color_target("frame", 64);
    let smaller = fx.color_target("half", 32);
    let other_format = Texture::new(
        &fx.device,
        TextureDesc::new_2d(
            "hdr",
            64,
            64,
            1,
            Format::R16G16B16A16Float,
            TextureFlags::RT_COLOR | TextureFlags::SRV,
        ),
    )
    .unwrap();
    let unbacked = Texture::unbacked(source.desc().clone());
    let mut list = fx.recording("blit");

    for destination in [&smaller, &other_format, &source, &unbacked] {
        let err = list.blit(&source, destination).unwrap_err();
        assert!(matches!(err, RhiError::Precondition(_)), "{err}");
    }
    assert!(headless(&mut list).calls().is_empty());
}
