//! Client receiver task (spec §4.C): wait for a delivered frame, copy it
//! out from under the lock, and hand it to the consumer callback.

use crate::instance::ClientInstance;
use std::sync::Arc;

pub fn run(instance: &Arc<ClientInstance>) {
    loop {
        instance.semaphore.wait();
        if instance.quit.is_set() {
            return;
        }

        let frame = instance.state.lock().buffer_in.take();
        let Some(frame) = frame else { continue };

        if let Some(cb) = &instance.params.on_frame {
            cb(&frame);
        }
    }
}
