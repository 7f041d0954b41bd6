//! Deferred deallocation for decoded sources
//!
//! Decoded tracks are wrapped in `basedrop::Shared`. When the audio thread
//! swaps a deck's source (load, unload) the old pointer is dropped in the
//! render callback; instead of freeing a multi-megabyte buffer there, the
//! drop only enqueues the pointer and the `audio-gc` thread frees it later.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let frames = Shared::new(&gc_handle(), StereoBuffer::silence(44100));
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector thread reclaims queued drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Spawn the collector thread and hand back a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn audio GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Handle for allocating `Shared<T>` values reclaimed off the audio thread
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_drop_is_deferred() {
        let data = Shared::new(&gc_handle(), vec![0.0f32; 1024]);
        let copy = Shared::clone(&data);
        drop(data);
        assert_eq!(copy.len(), 1024);
        drop(copy);
    }
}
