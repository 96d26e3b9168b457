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

use hex_game::Player;
use hex_utils::relptr::{abs2rel, rel2abs};

use std::mem;

/// A node of the search tree, allocated inside a `MemPool`. The node is
/// variable-size: the fixed header below is followed by `children_cap`
/// relative pointers to child nodes. Both the parent link and the child
/// links are byte offsets relative to this node itself, so the whole tree
/// is position-independent within its pool.
#[repr(C)]
pub struct Node {
    parent: i64,

    /// The player that made the move `(x, y)` leading to this node.
    pub player: Player,
    pub x: u8,
    pub y: u8,

    pub wins: i32,
    pub rave_wins: i32,
    pub plays: u32,
    pub rave_plays: u32,

    /// The branching factor available from this node, i.e. the number of
    /// empty cells after the root-to-node path has been applied.
    pub children_cap: u16,
    pub children_len: u16
}

/// Returns the size in bytes of a node with room for `children` child
/// links.
pub fn size_of_node(children: usize) -> usize {
    mem::size_of::<Node>() + children * mem::size_of::<i64>()
}

impl Node {
    /// Initialise the node at `node` in-place.
    ///
    /// # Safety
    ///
    /// `node` must point to at least `size_of_node(children_cap)` writable
    /// bytes, aligned for `Node`, in the same pool as `parent` (if any).
    ///
    pub unsafe fn init(
        node: *mut Node,
        parent: *mut Node,
        player: Player,
        x: u8,
        y: u8,
        children_cap: u16
    )
    {
        (*node).parent = abs2rel(node, parent);
        (*node).player = player;
        (*node).x = x;
        (*node).y = y;
        (*node).wins = 0;
        (*node).rave_wins = 0;
        (*node).plays = 0;
        (*node).rave_plays = 0;
        (*node).children_cap = children_cap;
        (*node).children_len = 0;
    }

    /// Returns the parent of this node, or null for the root.
    pub fn parent(&self) -> *mut Node {
        rel2abs(self as *const Node, self.parent)
    }

    /// Returns a pointer to the trailing child link array.
    fn children(&self) -> *mut i64 {
        let base = self as *const Node as *mut u8;

        unsafe { base.add(mem::size_of::<Node>()) as *mut i64 }
    }

    /// Returns the `i`-th child of this node.
    ///
    /// # Safety
    ///
    /// `i` must be below `children_len`; links past `children_len` are
    /// uninitialised memory.
    ///
    pub unsafe fn child(&self, i: usize) -> *mut Node {
        debug_assert!(i < self.children_len as usize);

        rel2abs(self as *const Node, *self.children().add(i))
    }

    /// Append `child` to this node's child links.
    ///
    /// # Safety
    ///
    /// `child` must live in the same pool as this node and
    /// `children_len` must be below `children_cap`.
    ///
    pub unsafe fn push_child(&mut self, child: *mut Node) {
        debug_assert!(self.children_len < self.children_cap);

        let i = self.children_len as usize;
        *self.children().add(i) = abs2rel(self as *const Node, child as *const Node);
        self.children_len += 1;
    }

    /// Returns the child of this node carrying the move `(x, y)`, or null.
    pub fn find_child(&self, x: u8, y: u8) -> *mut Node {
        for i in 0..self.children_len as usize {
            let child = unsafe { self.child(i) };

            unsafe {
                if (*child).x == x && (*child).y == y {
                    return child;
                }
            }
        }

        std::ptr::null_mut()
    }
}
