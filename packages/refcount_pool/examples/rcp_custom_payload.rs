//! Defines a custom payload type that reuses its buffer capacity across acquisitions.
//!
//! Run with `cargo run --example rcp_custom_payload`.

use std::sync::Mutex;

use refcount_pool::{RefCountable, RefCountedPool, RefCounter, ResetError};

/// A scratch buffer for assembling outgoing messages.
struct MessageBuffer {
    counter: RefCounter<Self>,
    bytes: Mutex<Vec<u8>>,
}

impl RefCountable for MessageBuffer {
    fn ref_counter(&self) -> &RefCounter<Self> {
        &self.counter
    }
}

impl MessageBuffer {
    fn new(counter: RefCounter<Self>) -> Self {
        Self {
            counter,
            bytes: Mutex::new(Vec::with_capacity(1024)),
        }
    }

    fn reset(&self) -> Result<(), ResetError> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_poisoned| ResetError::new("message buffer lock poisoned"))?;

        // Clearing keeps the capacity, which is the whole point of pooling the buffer.
        bytes.clear();
        Ok(())
    }
}

fn main() {
    let pool = RefCountedPool::builder()
        .name("message_buffers")
        .factory(MessageBuffer::new)
        .reset(MessageBuffer::reset)
        .build();

    for message in ["hello", "pooled", "world"] {
        let buffer = pool.get();

        {
            let mut bytes = buffer.bytes.lock().unwrap();
            bytes.extend_from_slice(message.as_bytes());
            println!(
                "buffer {} holds {:?} with capacity {}",
                buffer.ref_counter().id(),
                String::from_utf8_lossy(&bytes),
                bytes.capacity()
            );
        }

        buffer.decrement_reference_count();
    }

    println!("{}", pool.stats());
}
