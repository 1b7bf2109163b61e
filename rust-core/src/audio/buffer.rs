//! Lock-free capture buffer
//!
//! Single-producer/single-consumer handoff between the device callback
//! thread (writer) and the session thread (reader after the stream stops).

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Fixed-capacity audio ring buffer sized to one full capture
pub struct AudioRingBuffer {
    producer: HeapProducer<f64>,
    consumer: HeapConsumer<f64>,
    capacity: usize,
}

impl AudioRingBuffer {
    /// Create new ring buffer with given capacity
    ///
    /// # Arguments
    /// * `capacity` - Buffer capacity in samples (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let rb = HeapRb::<f64>::new(capacity);
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            capacity,
        }
    }

    /// Split into producer and consumer ends
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        (
            AudioProducer {
                producer: self.producer,
            },
            AudioConsumer {
                consumer: self.consumer,
                capacity: self.capacity,
            },
        )
    }
}

/// Writer end, owned by the capture callback
pub struct AudioProducer {
    producer: HeapProducer<f64>,
}

impl AudioProducer {
    /// Append samples produced one at a time, stopping once full
    ///
    /// # Returns
    /// Number of samples actually written; samples past capacity are dropped
    pub fn write_iter(&mut self, mut samples: impl Iterator<Item = f64>) -> usize {
        self.producer.push_iter(&mut samples)
    }
}

/// Reader end, owned by the capture handle
pub struct AudioConsumer {
    consumer: HeapConsumer<f64>,
    capacity: usize,
}

impl AudioConsumer {
    /// Take every sample currently buffered, in write order
    pub fn drain(&mut self) -> Vec<f64> {
        let mut samples = vec![0.0; self.consumer.len()];
        let read = self.consumer.pop_slice(&mut samples);
        samples.truncate(read);
        samples
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
