// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource objects: buffers, textures, samplers and fixed-function state.
//!
//! Every resource wraps one or more [`OwnedHandle`]s. Resources are shared through
//! `Arc`; dropping the last reference releases every backend object the resource
//! owns, through the device that created it.

mod buffer;
mod sampler;
mod shader;
mod state;
mod swap_chain;
mod texture;

pub use self::buffer::*;
pub use self::sampler::*;
pub use self::shader::*;
pub use self::state::*;
pub use self::swap_chain::*;
pub use self::texture::*;

use crate::rhi::common::BackendHandle;
use crate::rhi::traits::ResourceReleaser;
use std::fmt;
use std::sync::Weak;

/// A backend object that is released when dropped.
///
/// The releaser is held weakly: if the device is already gone there is nothing
/// left to release and the drop is a no-op.
pub struct OwnedHandle {
    handle: BackendHandle,
    releaser: Weak<dyn ResourceReleaser>,
}

impl OwnedHandle {
    /// Takes ownership of `handle`; `releaser` frees it on drop.
    pub fn new(handle: BackendHandle, releaser: Weak<dyn ResourceReleaser>) -> Self {
        Self { handle, releaser }
    }

    /// The wrapped backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.handle
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if let Some(releaser) = self.releaser.upgrade() {
            releaser.release(self.handle);
        }
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedHandle").field(&self.handle.raw()).finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Hands out sequential handles and remembers which ones were released.
    #[derive(Default)]
    pub struct CountingReleaser {
        next: AtomicU64,
        pub released: Mutex<Vec<BackendHandle>>,
    }

    impl CountingReleaser {
        pub fn owned(self: &Arc<Self>) -> OwnedHandle {
            let raw = self.next.fetch_add(1, Ordering::Relaxed) + 1;
            let releaser: Arc<dyn ResourceReleaser> = self.clone();
            OwnedHandle::new(
                BackendHandle::new(raw).unwrap(),
                Arc::downgrade(&releaser),
            )
        }

        pub fn released_count(&self) -> usize {
            self.released.lock().unwrap().len()
        }
    }

    impl ResourceReleaser for CountingReleaser {
        fn release(&self, handle: BackendHandle) {
            self.released.lock().unwrap().push(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CountingReleaser;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn drop_releases_handle() {
        let releaser = Arc::new(CountingReleaser::default());
        let owned = releaser.owned();
        let handle = owned.handle();
        drop(owned);
        assert_eq!(*releaser.released.lock().unwrap(), vec![handle]);
    }

    #[test]
    fn drop_after_device_is_gone_is_a_noop() {
        let releaser = Arc::new(CountingReleaser::default());
        let owned = releaser.owned();
        drop(releaser);
        drop(owned);
    }
}
