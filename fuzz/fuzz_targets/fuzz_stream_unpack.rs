//! Fuzz target for stream id unpacking.
//!
//! Feeds arbitrary (id, device, kind) triples through unpacking and checks
//! that decoding is total, packing round-trips, and that resolving a
//! foreign stream against a registry never panics.

#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use devstream::{AcceleratorStream, CpuQueueRuntime, FixedDeviceContext, StreamPoolRegistry, StreamSlot};
use libfuzzer_sys::fuzz_target;

/// Fuzz input: the three packed fields of a stream.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    stream_id: i64,
    device_index: i8,
    device_type: i8,
    /// Also resolve the stream against a live registry.
    resolve: bool,
}

fn registry() -> &'static StreamPoolRegistry {
    static REGISTRY: OnceLock<StreamPoolRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        StreamPoolRegistry::new(Arc::new(CpuQueueRuntime::new(2)))
            .with_device_context(Arc::new(FixedDeviceContext(0)))
    })
}

fuzz_target!(|input: FuzzInput| {
    // Every id decodes, and decoding is lossless.
    let slot = StreamSlot::decode(input.stream_id);
    assert_eq!(slot.encode(), input.stream_id);
    let _ = slot.validate(input.device_index);

    let Ok(stream) =
        AcceleratorStream::unpack3(input.stream_id, input.device_index, input.device_type)
    else {
        return;
    };

    let data = stream.pack3();
    assert_eq!(data.stream_id, input.stream_id);
    assert_eq!(data.device_index, input.device_index);
    assert_eq!(data.device_type, input.device_type);

    if input.resolve {
        let registry = registry();
        // Arbitrary ids never name a registered external queue, so this
        // stays non-blocking.
        let _ = registry.native_queue(&stream);
        let _ = registry.query(&stream);
    }
});
