// Copyright 2021 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
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

use std::alloc::{alloc, dealloc, Layout};
use std::ptr;

/// A fixed-capacity bump allocator. There is no per-allocation metadata
/// and no individual deallocation; the only way to reclaim memory is
/// `reset`, which is O(1) and logically invalidates every allocation made
/// so far.
pub struct MemPool {
    ptr: *mut u8,
    layout: Layout,
    cap: usize,
    len: usize
}

impl MemPool {
    /// Returns a pool backed by a freshly allocated buffer of `capacity`
    /// bytes aligned to `align`, or `None` if the allocation fails.
    ///
    /// # Arguments
    ///
    /// * `align` - the alignment of the buffer, a power of two
    /// * `capacity` - the size of the buffer, a multiple of `align`
    ///
    pub fn new(align: usize, capacity: usize) -> Option<MemPool> {
        assert!(align.is_power_of_two());
        assert!(capacity > 0 && capacity % align == 0);

        let layout = Layout::from_size_align(capacity, align).ok()?;
        let ptr = unsafe { alloc(layout) };

        if ptr.is_null() {
            None
        } else {
            Some(MemPool { ptr, layout, cap: capacity, len: 0 })
        }
    }

    /// Returns a pointer to `size` fresh bytes aligned to `align`, or null
    /// if the pool cannot satisfy the request. The pointer is valid until
    /// the next `reset`.
    pub fn alloc(&mut self, align: usize, size: usize) -> *mut u8 {
        assert!(align.is_power_of_two());

        let aligned_len = (self.len + align - 1) & !(align - 1);

        if aligned_len + size > self.cap {
            return ptr::null_mut();
        }

        let out = unsafe { self.ptr.add(aligned_len) };
        self.len = aligned_len + size;

        out
    }

    /// Discard every allocation made so far.
    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn base(&self) -> *mut u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Drop for MemPool {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_is_base() {
        let mut pool = MemPool::new(8, 64).unwrap();

        assert_eq!(pool.alloc(8, 16), pool.base());
        assert_eq!(pool.len(), 16);
    }

    #[test]
    fn allocations_are_aligned() {
        let mut pool = MemPool::new(8, 64).unwrap();

        pool.alloc(1, 3);
        let second = pool.alloc(8, 8);

        assert_eq!(second as usize % 8, 0);
        assert_eq!(pool.len(), 16);
    }

    #[test]
    fn exact_capacity_succeeds_one_more_fails() {
        let mut pool = MemPool::new(8, 64).unwrap();

        assert!(!pool.alloc(8, 64).is_null());
        assert!(pool.alloc(1, 1).is_null());
    }

    #[test]
    fn oversized_allocation_fails() {
        let mut pool = MemPool::new(8, 64).unwrap();

        assert!(pool.alloc(8, 65).is_null());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn reset_restores_base() {
        let mut pool = MemPool::new(8, 64).unwrap();

        pool.alloc(8, 48);
        pool.reset();

        assert_eq!(pool.len(), 0);
        assert_eq!(pool.alloc(8, 8), pool.base());
    }
}
