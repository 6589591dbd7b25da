mod common;

use bytemuck::{Pod, Zeroable};
use common::{headless, Fixture};
use prism_core::renderer::FrameConstants;
use prism_core::rhi::resource::VertexBuffer;
use prism_core::rhi::ResourceError;
use prism_infra::graphics::headless::DeviceCall;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    uv: [f32; 2],
}

#[test]
fn vertex_upload_reaches_the_buffer() {
    let fx = Fixture::new();
    let buffer = VertexBuffer::new(&fx.device, "triangle", 20, 3).unwrap();
    let vertices = [
        Vertex {
            position: [0.0, 0.5, 0.0],
            uv: [0.5, 0.0],
        },
        Vertex {
            position: [-0.5, -0.5, 0.0],
            uv: [0.0, 1.0],
        },
        Vertex {
            position: [0.5, -0.5, 0.0],
            uv: [1.0, 1.0],
        },
    ];
    let mut list = fx.recording("upload");

    buffer.update(list.device_context(), &vertices).unwrap();

    assert_eq!(
        fx.device.buffer_contents(buffer.handle()).unwrap(),
        bytemuck::cast_slice::<Vertex, u8>(&vertices)
    );
    assert_eq!(
        headless(&mut list).calls(),
        &[DeviceCall::UpdateBuffer {
            buffer: buffer.handle(),
            size: 60,
        }]
    );
}

#[test]
fn oversized_upload_is_rejected() {
    let fx = Fixture::new();
    let buffer = VertexBuffer::new(&fx.device, "point", 20, 1).unwrap();
    let vertices = [Vertex::zeroed(); 2];
    let mut list = fx.recording("upload");

    let err = buffer.update(list.device_context(), &vertices).unwrap_err();

    assert!(matches!(err, ResourceError::InvalidDescriptor(_)));
    assert!(headless(&mut list).calls().is_empty());
}

#[test]
fn frame_constants_fill_their_buffer() {
    let fx = Fixture::new();
    let buffer = fx.factory.constant_buffers().frame.clone();
    let constants = FrameConstants {
        frame: 42,
        ..FrameConstants::default()
    };
    let mut list = fx.recording("constants");

    buffer.update(list.device_context(), &constants).unwrap();

    let contents = fx.device.buffer_contents(buffer.handle()).unwrap();
    assert_eq!(contents.len() as u32, buffer.size());
    assert_eq!(contents.as_slice(), bytemuck::bytes_of(&constants));
}
