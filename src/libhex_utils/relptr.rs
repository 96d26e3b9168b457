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

use std::ptr;

/// A signed relative pointer, stored as a byte offset from the referrer to
/// the referent. The encoding XOR-flips the sign bit so that the all-zero
/// bit pattern denotes null while a zero byte offset (self-reference)
/// remains representable. Graphs built out of relative pointers are
/// position-independent and can be relocated with a plain `memcpy`.
pub trait RelPtr: Copy + PartialEq + Sized {
    /// The null relative pointer, equal to the zero bit pattern.
    const NULL: Self;

    /// Encode a byte offset. The offset must fit in the underlying integer
    /// type, sign bit excluded.
    fn from_offset(offset: isize) -> Self;

    /// Recover the byte offset from an encoded, non-null relative pointer.
    fn to_offset(self) -> isize;

    fn is_null(self) -> bool {
        self == Self::NULL
    }
}

macro_rules! impl_relptr {
    ($ty:ty) => {
        impl RelPtr for $ty {
            const NULL: Self = 0;

            fn from_offset(offset: isize) -> Self {
                debug_assert!(
                    offset >= (<$ty>::min_value() >> 1) as isize &&
                    offset <= (<$ty>::max_value() >> 1) as isize
                );

                (offset as $ty) ^ <$ty>::min_value()
            }

            fn to_offset(self) -> isize {
                (self ^ <$ty>::min_value()) as isize
            }
        }
    };
}

impl_relptr!(i16);
impl_relptr!(i32);
impl_relptr!(i64);

/// Encode the relative pointer from `base` to `absptr`, where a null
/// `absptr` encodes as `R::NULL`.
pub fn abs2rel<R: RelPtr, T>(base: *const T, absptr: *const T) -> R {
    if absptr.is_null() {
        R::NULL
    } else {
        R::from_offset((absptr as isize) - (base as isize))
    }
}

/// Decode the relative pointer `relptr` against `base`, where `R::NULL`
/// decodes as a null pointer.
pub fn rel2abs<R: RelPtr, T>(base: *const T, relptr: R) -> *mut T {
    if relptr.is_null() {
        ptr::null_mut()
    } else {
        ((base as isize) + relptr.to_offset()) as *mut T
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_zero_pattern() {
        assert_eq!(<i16 as RelPtr>::NULL, 0);
        assert_eq!(<i32 as RelPtr>::NULL, 0);
        assert_eq!(<i64 as RelPtr>::NULL, 0);
    }

    #[test]
    fn zero_offset_is_not_null() {
        let rel: i64 = RelPtr::from_offset(0);

        assert!(!rel.is_null());
        assert_eq!(rel.to_offset(), 0);
    }

    #[test]
    fn offset_round_trip() {
        for &offset in &[-4096isize, -8, -1, 0, 1, 8, 4096] {
            let rel: i32 = RelPtr::from_offset(offset);

            assert_eq!(rel.to_offset(), offset);
        }
    }

    #[test]
    fn pointer_round_trip() {
        let buf = [0u64; 16];
        let base = &buf[3] as *const u64;

        for i in 0..16 {
            let absptr = &buf[i] as *const u64;
            let rel: i64 = abs2rel(base, absptr);

            assert_eq!(rel2abs(base, rel) as *const u64, absptr);
        }
    }

    #[test]
    fn null_round_trip() {
        let buf = [0u64; 1];
        let base = &buf[0] as *const u64;
        let rel: i64 = abs2rel(base, ptr::null());

        assert_eq!(rel, 0);
        assert!(rel2abs::<i64, u64>(base, rel).is_null());
    }
}
