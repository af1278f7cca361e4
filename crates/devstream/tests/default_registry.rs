//! Integration tests for the process-wide default registry.
//!
//! Kept in their own binary: the default registry is installed once per
//! process.

use std::sync::Arc;

use devstream::prelude::*;
use devstream::{install_registry, CpuQueue, FixedDeviceContext};

fn installed() -> &'static StreamPoolRegistry {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let registry = StreamPoolRegistry::new(Arc::new(CpuQueueRuntime::new(2)))
            .with_device_context(Arc::new(FixedDeviceContext(0)));
        install_registry(registry).unwrap();
    });
    registry()
}

#[test]
fn test_install_once() {
    let first = installed();
    assert_eq!(first.device_count(), 2);

    let again = StreamPoolRegistry::new(Arc::new(CpuQueueRuntime::new(1)));
    assert_eq!(
        install_registry(again).unwrap_err(),
        StreamError::RegistryAlreadyInstalled
    );
    assert_eq!(registry().id(), first.id());
}

#[test]
fn test_free_functions_use_default_registry() {
    installed();

    let high = get_stream_from_pool(true, Some(1)).unwrap();
    assert_eq!(high.priority(), -1);
    assert_eq!(high.device_index(), 1);

    let normal = get_stream_from_pool_with_priority(0, None).unwrap();
    assert_eq!(normal.device_index(), 0);
    assert!(get_stream_from_pool_with_priority(-5, None).is_err());

    set_current_stream(high).unwrap();
    assert_eq!(get_current_stream(Some(1)).unwrap(), high);

    assert_eq!(priority_range(), (0, -1));
    sync_streams_on_device(Some(1)).unwrap();
}

#[test]
fn test_stream_methods_reach_default_registry() {
    installed();

    let stream = get_stream_from_pool(false, Some(0)).unwrap();
    assert!(stream.query(registry()));
    stream.synchronize(registry()).unwrap();
    assert!(stream.native_queue(registry()).is_ok());

    let queue: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));
    let external = get_stream_from_external(&queue, 0).unwrap();
    assert!(Arc::ptr_eq(&external.native_queue(registry()).unwrap(), &queue));
    external.synchronize(registry()).unwrap();
}
