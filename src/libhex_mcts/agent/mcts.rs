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

use crate::node::{size_of_node, Node};
use crate::pool::MemPool;
use crate::threadpool::Threadpool;

use hex_game::{Board, Cell, Move, Player};

use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use std::mem;
use std::ptr;
use std::time::{Duration, Instant};

/// How much of the memory budget is reserved for everything that is not
/// the node pool.
const RESERVED_MEM: usize = 1024 * 1024;

/// The number of visits over which the RAVE estimate is faded out in
/// favour of the node's own win rate.
const EXPLORATION_ROUNDS: i64 = 3000;

/// Returns the RAVE-UCT score of `child`, as seen from its parent. An
/// unvisited child scores infinity so that it is preferred until every
/// sibling has been tried at least once.
unsafe fn score(child: *const Node) -> f32 {
    if (*child).plays == 0 {
        return f32::INFINITY;
    }

    let beta = ((EXPLORATION_ROUNDS - (*child).plays as i64) as f32
        / EXPLORATION_ROUNDS as f32).max(0.0);

    let parent = (*child).parent();
    debug_assert!(!parent.is_null());

    let exploration = std::f32::consts::SQRT_2
        * (((*parent).plays as f32).ln() / (*child).plays as f32).sqrt();
    let exploitation = (1.0 - beta) * ((*child).wins as f32 / (*child).plays as f32);
    let rave_exploitation = if (*child).rave_plays > 0 {
        beta * ((*child).rave_wins as f32 / (*child).rave_plays as f32)
    } else {
        0.0
    };

    exploration + exploitation + rave_exploitation
}

/// Returns the child of `node` with the greatest score, or null if it has
/// no children.
unsafe fn best_child(node: *const Node) -> *mut Node {
    let mut max_score = OrderedFloat(std::f32::NEG_INFINITY);
    let mut best = ptr::null_mut();

    for i in 0..(*node).children_len as usize {
        let child = (*node).child(i);
        let score = OrderedFloat(score(child));

        if score > max_score {
            max_score = score;
            best = child;
        }
    }

    best
}

/// A Monte-Carlo Tree Search backend with the RAVE enhancement. The tree
/// lives in a bump-allocated pool sized from the memory budget, and is
/// thrown away (an O(1) pool reset) whenever a move is committed.
pub struct AgentMcts {
    shadow: Board,
    pool: MemPool,
    root: *mut Node,
    rng: SmallRng,
    moves: Vec<Move>
}

impl AgentMcts {
    /// Returns a fresh search for `player`, or `None` if the node pool
    /// cannot be carved out of the memory budget.
    ///
    /// # Arguments
    ///
    /// * `board` - the board the match is played on
    /// * `threadpool` - the thread budget granted by the referee
    /// * `mem_limit_mib` - the memory budget granted by the referee
    /// * `player` - the player this search plays for
    ///
    pub fn new(
        board: &Board,
        threadpool: &Threadpool,
        mem_limit_mib: u32,
        player: Player
    ) -> Option<AgentMcts>
    {
        let align = mem::align_of::<Node>();
        let cap = ((mem_limit_mib as usize) << 20).saturating_sub(RESERVED_MEM) & !(align - 1);

        if cap == 0 {
            return None;
        }

        log::debug!(
            "search pool is {} bytes, running on 1 of {} allowed threads",
            cap,
            threadpool.threads() + 1
        );

        let size = board.size();
        let mut out = AgentMcts {
            shadow: Board::new(size),
            pool: MemPool::new(align, cap)?,
            root: ptr::null_mut(),
            rng: SmallRng::from_entropy(),
            moves: Vec::with_capacity((size * size) as usize)
        };

        // the root carries the opponent as its player, so that its
        // children (the moves we might make) carry ours
        out.new_root(board, player.opponent(), 0, 0);

        if out.root.is_null() {
            None
        } else {
            Some(out)
        }
    }

    /// Discard the tree and allocate a fresh root describing the move
    /// `(x, y)` made by `player`.
    fn new_root(&mut self, board: &Board, player: Player, x: u8, y: u8) {
        let children_cap = board.available_moves();

        self.pool.reset();
        let root = self.pool.alloc(
            mem::align_of::<Node>(),
            size_of_node(children_cap)
        ) as *mut Node;

        if !root.is_null() {
            unsafe {
                Node::init(root, ptr::null_mut(), player, x, y, children_cap as u16);
            }
        }

        self.root = root;
    }

    /// Notify the search that `player` has played `(x, y)`. The board has
    /// already been updated by the caller. The previous tree is discarded
    /// rather than re-rooted; see `new_root`.
    pub fn play(&mut self, board: &Board, player: Player, x: u8, y: u8) {
        self.new_root(board, player, x, y);
    }

    /// Notify the search that the swap rule was exercised. The root keeps
    /// its move but flips its player, since a swap changes the colour of
    /// the occupied cell and nothing else.
    pub fn swap(&mut self, board: &Board) {
        let (player, x, y) = unsafe {
            ((*self.root).player.opponent(), (*self.root).x, (*self.root).y)
        };

        self.new_root(board, player, x, y);
    }

    /// Allocate a child of `node` for the move `mv`, carrying the opposing
    /// player. Returns null when the pool is exhausted.
    unsafe fn expand(&mut self, node: *mut Node, mv: Move) -> *mut Node {
        debug_assert!((*node).children_cap > 0);

        let children_cap = (*node).children_cap - 1;
        let child = self.pool.alloc(
            mem::align_of::<Node>(),
            size_of_node(children_cap as usize)
        ) as *mut Node;

        if !child.is_null() {
            Node::init(child, node, (*node).player.opponent(), mv.x, mv.y, children_cap);
            (*node).push_child(child);
        }

        child
    }

    /// Perform one round of selection, expansion, simulation, and
    /// backpropagation. Returns false if the round had to be aborted, in
    /// which case no statistics were updated and the search should stop.
    fn round(&mut self, board: &Board) -> bool {
        self.shadow.copy_from(board);

        unsafe {
            // selection: walk the tree by the highest scoring child until
            // we hit a node with unexpanded children
            let mut node = self.root;

            while (*node).children_len == (*node).children_cap {
                let child = best_child(node);
                if child.is_null() {
                    break;
                }

                let (player, x, y) = ((*child).player, (*child).x, (*child).y);
                if self.shadow.play(player, x as u32, y as u32).is_err() {
                    log::warn!("failed to play move ({}, {}) on the shadow board", x, y);
                    return false;
                }

                node = child;
            }

            self.shadow.available_moves_into(&mut self.moves);
            self.moves.shuffle(&mut self.rng);

            // expansion: create a child of the selected node for one
            // random untried move
            if self.shadow.winner().is_none() {
                let mv = match self.moves.pop() {
                    Some(mv) => mv,
                    None => return false
                };

                let child = self.expand(node, mv);
                if child.is_null() {
                    log::warn!("failed to expand selected node, the pool is full");
                    return false;
                }

                let (player, x, y) = ((*child).player, (*child).x, (*child).y);
                if self.shadow.play(player, x as u32, y as u32).is_err() {
                    log::warn!("failed to play move ({}, {}) on the shadow board", x, y);
                    return false;
                }
            }

            // simulation: walk the remaining shuffled moves alternately
            // until someone wins (hex has no draws)
            let mut player = (*node).player;
            let winner = loop {
                if let Some(winner) = self.shadow.winner() {
                    break winner;
                }

                let mv = match self.moves.pop() {
                    Some(mv) => mv,
                    None => return false
                };

                if self.shadow.play(player, mv.x as u32, mv.y as u32).is_err() {
                    log::warn!("failed to play move ({}, {}) on the shadow board", mv.x, mv.y);
                    return false;
                }

                player = player.opponent();
            };

            // backpropagation: bump every node on the path, and the RAVE
            // statistics of each sibling whose move appears in the final
            // position for its player
            loop {
                let reward = if winner == (*node).player { 1 } else { -1 };

                for i in 0..(*node).children_len as usize {
                    let child = (*node).child(i);
                    let occupant = self.shadow.cell((*child).x as u32, (*child).y as u32);

                    if occupant == Some(Cell::from((*child).player)) {
                        (*child).rave_plays += 1;
                        (*child).rave_wins += -reward;
                    }
                }

                (*node).plays += 1;
                (*node).wins += reward;

                let parent = (*node).parent();
                if parent.is_null() {
                    break;
                }

                node = parent;
            }
        }

        true
    }

    fn search(&mut self, board: &Board, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut rounds = 0usize;

        log::info!("starting search with {:.3}s timeout", timeout.as_secs_f64());

        loop {
            if !self.round(board) {
                log::warn!("search stopped early after {} rounds", rounds);
                break;
            }

            rounds += 1;

            if Instant::now() >= deadline {
                break;
            }
        }

        log::info!("completed {} rounds of search", rounds);
        log::info!("node pool occupancy: {}/{} bytes", self.pool.len(), self.pool.cap());
    }

    /// Search until `timeout` elapses, then return the move of the most
    /// visited child of the root. Ties are broken by a fair coin every
    /// time a tied maximum is encountered.
    pub fn next(&mut self, board: &Board, timeout: Duration) -> Option<(u8, u8)> {
        self.search(board, timeout);

        unsafe {
            let root = self.root;
            if (*root).children_len == 0 {
                return None;
            }

            let mut best = (*root).child(0);
            let mut max_plays = (*best).plays;

            for i in 1..(*root).children_len as usize {
                let child = (*root).child(i);

                if (*child).plays > max_plays {
                    max_plays = (*child).plays;
                    best = child;
                } else if (*child).plays == max_plays && self.rng.gen::<bool>() {
                    best = child;
                }
            }

            Some(((*best).x, (*best).y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_on(board: &Board, player: Player) -> AgentMcts {
        AgentMcts::new(board, &Threadpool::new(3), 64, player).unwrap()
    }

    #[test]
    fn insufficient_memory_budget() {
        let board = Board::new(3);

        assert!(AgentMcts::new(&board, &Threadpool::new(3), 1, Player::Black).is_none());
    }

    #[test]
    fn only_move_on_size_one() {
        let board = Board::new(1);
        let mut agent = agent_on(&board, Player::Black);

        assert_eq!(agent.next(&board, Duration::from_millis(1)), Some((0, 0)));
    }

    #[test]
    fn next_returns_a_legal_move() {
        let mut board = Board::new(3);
        let mut agent = agent_on(&board, Player::White);

        board.play(Player::Black, 1, 1).unwrap();
        agent.play(&board, Player::Black, 1, 1);

        let (x, y) = agent.next(&board, Duration::from_millis(20)).unwrap();
        assert_eq!(board.cell(x as u32, y as u32), Some(Cell::Empty));
    }

    #[test]
    fn swap_flips_the_root_player() {
        let mut board = Board::new(5);
        let mut agent = agent_on(&board, Player::White);

        board.play(Player::Black, 2, 2).unwrap();
        agent.play(&board, Player::Black, 2, 2);

        board.swap();
        agent.swap(&board);

        unsafe {
            assert_eq!((*agent.root).player, Player::White);
            assert_eq!(((*agent.root).x, (*agent.root).y), (2, 2));
        }

        // black moves next after a swap
        let (x, y) = agent.next(&board, Duration::from_millis(20)).unwrap();
        assert_eq!(board.cell(x as u32, y as u32), Some(Cell::Empty));
    }

    #[test]
    fn finds_the_winning_move() {
        // white has two stones of a top-bottom chain on a 3x3 board; the
        // search should complete it rather than play elsewhere
        let mut board = Board::new(3);
        let mut agent = agent_on(&board, Player::White);

        for &(player, x, y) in &[
            (Player::White, 1, 0),
            (Player::Black, 0, 2),
            (Player::White, 1, 1),
            (Player::Black, 2, 2)
        ] {
            board.play(player, x, y).unwrap();
            agent.play(&board, player, x as u8, y as u8);
        }

        let (x, y) = agent.next(&board, Duration::from_millis(100)).unwrap();
        let mut after = Board::new(3);
        after.copy_from(&board);
        after.play(Player::White, x as u32, y as u32).unwrap();

        assert_eq!(after.winner(), Some(Player::White));
    }

    #[test]
    fn survives_pool_exhaustion() {
        // a 2 MiB budget leaves a 1 MiB pool, which a search on a full
        // size board will saturate; the best child so far is still
        // reported
        let board = Board::new(11);
        let mut agent = AgentMcts::new(&board, &Threadpool::new(3), 2, Player::Black).unwrap();

        let (x, y) = agent.next(&board, Duration::from_millis(250)).unwrap();
        assert!(x < 11 && y < 11);
    }
}
