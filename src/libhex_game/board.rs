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

use crate::error::HexError;
use crate::player::{Cell, Player};

use hex_utils::relptr::RelPtr;

use std::fmt;
use std::mem;

/// The number of virtual edge segments trailing the playable cells.
const EDGE_COUNT: usize = 4;

/// The six hex neighbours of a cell, as `(dx, dy)` offsets.
const NEIGHBOURS: [(i32, i32); 6] = [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0)];

/// A single union-find element. The parent link is a relative byte offset
/// from this segment to its parent, so a bulk copy of the segment array
/// yields a valid board.
#[repr(C)]
#[derive(Clone, Copy)]
struct Segment {
    parent: i32,
    rank: u8,
    occupant: Cell
}

impl Segment {
    const EMPTY: Segment = Segment {
        parent: <i32 as RelPtr>::NULL,
        rank: 0,
        occupant: Cell::Empty
    };
}

const SEGMENT_SIZE: isize = mem::size_of::<Segment>() as isize;

/// A move on the board, in single-byte coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub x: u8,
    pub y: u8
}

/// The state of a hex board of a fixed size. Connectivity between cells of
/// the same colour, and between cells and the four virtual edges, is
/// tracked with a union-find over the segment array so that win detection
/// after a move is near-constant time.
pub struct Board {
    size: u32,
    segments: Vec<Segment>
}

impl Board {
    /// Returns an empty board with `size * size` playable cells.
    ///
    /// # Arguments
    ///
    /// * `size` - the board dimension, `1..=255`
    ///
    pub fn new(size: u32) -> Board {
        assert!(size >= 1 && size <= 255);

        let mut segments = vec! [Segment::EMPTY; (size * size) as usize + EDGE_COUNT];

        segments[(size * size) as usize + 0].occupant = Cell::Black;  // black source
        segments[(size * size) as usize + 1].occupant = Cell::Black;  // black sink
        segments[(size * size) as usize + 2].occupant = Cell::White;  // white source
        segments[(size * size) as usize + 3].occupant = Cell::White;  // white sink

        Board { size, segments }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn black_source(&self) -> usize { (self.size * self.size) as usize + 0 }
    fn black_sink(&self) -> usize { (self.size * self.size) as usize + 1 }
    fn white_source(&self) -> usize { (self.size * self.size) as usize + 2 }
    fn white_sink(&self) -> usize { (self.size * self.size) as usize + 3 }

    /// Returns the segment index of `(x, y)`, if it is in bounds.
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.size && y < self.size {
            Some((y * self.size + x) as usize)
        } else {
            None
        }
    }

    /// Returns the occupant of `(x, y)`, if it is in bounds.
    pub fn cell(&self, x: u32, y: u32) -> Option<Cell> {
        self.index(x, y).map(|i| self.segments[i].occupant)
    }

    /// Returns the parent of the segment at `at`, if it has one.
    fn parent(&self, at: usize) -> Option<usize> {
        let rel = self.segments[at].parent;

        if rel.is_null() {
            None
        } else {
            Some((at as isize + rel.to_offset() / SEGMENT_SIZE) as usize)
        }
    }

    /// Re-points the parent link of the segment at `from` to the segment
    /// at `to`.
    fn link(&mut self, from: usize, to: usize) {
        self.segments[from].parent =
            RelPtr::from_offset((to as isize - from as isize) * SEGMENT_SIZE);
    }

    /// Returns the root of the segment at `at`, compressing every visited
    /// segment onto its grandparent along the way.
    fn root(&mut self, mut at: usize) -> usize {
        while let Some(parent) = self.parent(at) {
            let grandparent = match self.parent(parent) {
                None => return parent,
                Some(grandparent) => grandparent
            };

            self.link(at, grandparent);
            at = grandparent;
        }

        at
    }

    /// Merge the groups containing the segments at `a` and `b`, attaching
    /// the lower rank root beneath the higher. A merge of two segments
    /// already in the same group is a no-op.
    fn merge(&mut self, a: usize, b: usize) {
        let root_a = self.root(a);
        let root_b = self.root(b);

        if root_a == root_b {
            return;
        }

        if self.segments[root_a].rank < self.segments[root_b].rank {
            self.link(root_a, root_b);
        } else if self.segments[root_a].rank > self.segments[root_b].rank {
            self.link(root_b, root_a);
        } else {
            self.link(root_a, root_b);
            self.segments[root_b].rank += 1;
        }
    }

    /// Place a stone for `player` at `(x, y)`, connecting it to its edges
    /// and same-coloured neighbours.
    ///
    /// # Arguments
    ///
    /// * `player` - the player making the move
    /// * `x` - the column, `0 <= x < size`
    /// * `y` - the row, `0 <= y < size`
    ///
    pub fn play(&mut self, player: Player, x: u32, y: u32) -> Result<(), HexError> {
        let at = match self.index(x, y) {
            Some(at) => at,
            None => {
                log::debug!("{} played invalid move ({}, {}); out of bounds", player, x, y);
                return Err(HexError::BadMove);
            }
        };

        if !self.segments[at].occupant.is_empty() {
            log::debug!(
                "{} played invalid move ({}, {}); previously occupied by {:?}",
                player, x, y, self.segments[at].occupant
            );
            return Err(HexError::BadMove);
        }

        self.segments[at].occupant = Cell::from(player);

        // the edge unions must come before any neighbour unions, so that
        // the root of the merged group is reachable from an edge
        match player {
            Player::Black => {
                if x == 0 {
                    let edge = self.black_source();
                    self.merge(edge, at);
                }
                if x == self.size - 1 {
                    let edge = self.black_sink();
                    self.merge(edge, at);
                }
            },
            Player::White => {
                if y == 0 {
                    let edge = self.white_source();
                    self.merge(edge, at);
                }
                if y == self.size - 1 {
                    let edge = self.white_sink();
                    self.merge(edge, at);
                }
            }
        }

        for &(dx, dy) in NEIGHBOURS.iter() {
            let px = x as i32 + dx;
            let py = y as i32 + dy;

            if px >= 0 && py >= 0 {
                if let Some(neighbour) = self.index(px as u32, py as u32) {
                    if self.segments[neighbour].occupant == self.segments[at].occupant {
                        self.merge(at, neighbour);
                    }
                }
            }
        }

        Ok(())
    }

    /// Flip the colour of every occupied cell, rebuilding the union-find
    /// from scratch by re-playing each cell in reading order.
    pub fn swap(&mut self) {
        let size = self.size;
        let mut occupied = Vec::with_capacity((size * size) as usize);

        for y in 0..size {
            for x in 0..size {
                let at = (y * size + x) as usize;

                if let Some(player) = self.segments[at].occupant.to_player() {
                    occupied.push((x, y, player.opponent()));
                }
            }
        }

        for segment in self.segments.iter_mut() {
            *segment = Segment::EMPTY;
        }

        let (bs, bk, ws, wk) = (self.black_source(), self.black_sink(), self.white_source(), self.white_sink());
        self.segments[bs].occupant = Cell::Black;
        self.segments[bk].occupant = Cell::Black;
        self.segments[ws].occupant = Cell::White;
        self.segments[wk].occupant = Cell::White;

        for (x, y, player) in occupied.into_iter() {
            self.play(player, x, y).expect("cell is empty after the rebuild");
        }
    }

    /// Returns the winner, if either player has connected their two edges.
    pub fn winner(&mut self) -> Option<Player> {
        let (source, sink) = (self.black_source(), self.black_sink());
        if self.root(source) == self.root(sink) {
            return Some(Player::Black);
        }

        let (source, sink) = (self.white_source(), self.white_sink());
        if self.root(source) == self.root(sink) {
            return Some(Player::White);
        }

        None
    }

    /// Returns the number of empty cells.
    pub fn available_moves(&self) -> usize {
        self.segments[..(self.size * self.size) as usize]
            .iter()
            .filter(|segment| segment.occupant.is_empty())
            .count()
    }

    /// Clear `out` and fill it with every empty cell, in reading order.
    pub fn available_moves_into(&self, out: &mut Vec<Move>) {
        out.clear();

        for y in 0..self.size {
            for x in 0..self.size {
                if self.segments[(y * self.size + x) as usize].occupant.is_empty() {
                    out.push(Move { x: x as u8, y: y as u8 });
                }
            }
        }
    }

    /// Overwrite this board with the contents of `other`, which must have
    /// the same size. This is a bulk copy, valid because all parent links
    /// are relative.
    pub fn copy_from(&mut self, other: &Board) {
        assert_eq!(self.size, other.size);

        self.segments.copy_from_slice(&other.segments);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.size {
            for _ in 0..y {
                write!(f, "  ")?;
            }

            for x in 0..self.size {
                match self.segments[(y * self.size + x) as usize].occupant {
                    Cell::Empty => write!(f, ". ")?,
                    Cell::Black => write!(f, "B ")?,
                    Cell::White => write!(f, "W ")?
                }
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_occupies_cell() {
        let mut board = Board::new(3);

        assert_eq!(board.available_moves(), 9);
        assert!(board.play(Player::Black, 1, 1).is_ok());
        assert_eq!(board.cell(1, 1), Some(Cell::Black));
        assert_eq!(board.available_moves(), 8);

        let mut moves = vec! [];
        board.available_moves_into(&mut moves);
        assert_eq!(moves.len(), 8);
        assert!(!moves.contains(&Move { x: 1, y: 1 }));
    }

    #[test]
    fn play_rejects_occupied_and_out_of_bounds() {
        let mut board = Board::new(2);

        assert!(board.play(Player::Black, 0, 0).is_ok());
        assert_eq!(board.play(Player::White, 0, 0), Err(HexError::BadMove));
        assert_eq!(board.play(Player::White, 2, 0), Err(HexError::BadMove));
        assert_eq!(board.play(Player::White, 0, 7), Err(HexError::BadMove));
    }

    #[test]
    fn size_one_wins_immediately() {
        let mut board = Board::new(1);

        assert!(board.play(Player::White, 0, 0).is_ok());
        assert_eq!(board.winner(), Some(Player::White));
    }

    #[test]
    fn black_connects_first_column() {
        let mut board = Board::new(3);

        assert!(board.play(Player::Black, 0, 0).is_ok());
        assert_eq!(board.play(Player::White, 0, 0), Err(HexError::BadMove));
        assert!(board.play(Player::White, 1, 0).is_ok());
        assert_eq!(board.play(Player::Black, 1, 0), Err(HexError::BadMove));
        assert!(board.play(Player::Black, 0, 1).is_ok());
        assert!(board.play(Player::White, 2, 0).is_ok());
        assert_eq!(board.winner(), None);

        // the first column alone does not connect the black edges; the
        // black source and sink lie on x = 0 and x = size - 1
        assert!(board.play(Player::Black, 0, 2).is_ok());
        assert_eq!(board.winner(), None);

        assert!(board.play(Player::Black, 1, 1).is_ok());
        assert!(board.play(Player::Black, 2, 1).is_ok());
        assert_eq!(board.winner(), Some(Player::Black));
    }

    #[test]
    fn white_connects_rows() {
        let mut board = Board::new(3);

        for y in 0..3 {
            assert_eq!(board.winner(), None);
            assert!(board.play(Player::White, 1, y).is_ok());
        }

        assert_eq!(board.winner(), Some(Player::White));
    }

    #[test]
    fn at_most_one_winner() {
        let mut board = Board::new(2);

        assert!(board.play(Player::Black, 0, 0).is_ok());
        assert!(board.play(Player::Black, 1, 0).is_ok());
        assert_eq!(board.winner(), Some(Player::Black));

        // white cannot also be a winner on this board
        assert!(board.play(Player::White, 0, 1).is_ok());
        assert!(board.play(Player::White, 1, 1).is_ok());
        assert_eq!(board.winner(), Some(Player::Black));
    }

    #[test]
    fn swap_flips_colours_only() {
        let mut board = Board::new(5);

        assert!(board.play(Player::Black, 2, 3).is_ok());
        board.swap();

        assert_eq!(board.cell(2, 3), Some(Cell::White));
        assert_eq!(board.cell(3, 2), Some(Cell::Empty));
        assert_eq!(board.available_moves(), 24);
    }

    #[test]
    fn double_swap_restores_board() {
        let mut board = Board::new(4);

        assert!(board.play(Player::Black, 0, 0).is_ok());
        assert!(board.play(Player::White, 1, 2).is_ok());
        assert!(board.play(Player::Black, 3, 3).is_ok());

        board.swap();
        board.swap();

        assert_eq!(board.cell(0, 0), Some(Cell::Black));
        assert_eq!(board.cell(1, 2), Some(Cell::White));
        assert_eq!(board.cell(3, 3), Some(Cell::Black));
        assert_eq!(board.available_moves(), 13);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn swap_rebuilds_connectivity() {
        let mut board = Board::new(3);

        for y in 0..3 {
            assert!(board.play(Player::White, 1, y).is_ok());
        }
        assert_eq!(board.winner(), Some(Player::White));

        // the flipped chain runs top to bottom, which does not connect
        // black's left and right edges
        board.swap();
        assert_eq!(board.winner(), None);

        board.swap();
        assert_eq!(board.winner(), Some(Player::White));
    }

    #[test]
    fn compression_is_idempotent() {
        let mut board = Board::new(5);

        for x in 0..5 {
            assert!(board.play(Player::Black, x, 2).is_ok());
        }

        let first = board.root(2 * 5 + 4);
        let second = board.root(2 * 5 + 4);

        assert_eq!(first, second);

        // every segment in the chain resolves to the same root as the
        // uncompressed walk would
        for x in 0..5 {
            assert_eq!(board.root(2 * 5 + x), first);
        }
    }

    #[test]
    fn equal_rank_union_increments_rank() {
        let mut board = Board::new(5);

        assert!(board.play(Player::White, 0, 2).is_ok());

        // two singleton roots have equal rank, so the surviving root gains
        // a rank
        assert!(board.play(Player::White, 1, 2).is_ok());

        let root = board.root(2 * 5 + 1);
        assert_eq!(board.segments[root].rank, 1);
    }

    #[test]
    fn copy_from_mirrors_state() {
        let mut board = Board::new(3);
        let mut mirror = Board::new(3);

        assert!(board.play(Player::Black, 0, 1).is_ok());
        assert!(board.play(Player::White, 2, 2).is_ok());

        mirror.copy_from(&board);

        assert_eq!(mirror.cell(0, 1), Some(Cell::Black));
        assert_eq!(mirror.cell(2, 2), Some(Cell::White));
        assert_eq!(mirror.available_moves(), board.available_moves());
    }
}
