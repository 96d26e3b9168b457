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

mod mcts;
mod random;

pub use self::mcts::AgentMcts;
pub use self::random::AgentRandom;

use crate::threadpool::Threadpool;
use hex_game::{Board, Player};

use std::str::FromStr;
use std::time::Duration;

/// The available search backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Random,
    Mcts
}

impl FromStr for AgentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<AgentKind, Self::Err> {
        match s {
            "random" => Ok(AgentKind::Random),
            "mcts" => Ok(AgentKind::Mcts),
            _ => Err(())
        }
    }
}

/// A search backend. Every backend maintains its own view of the game
/// through `play` / `swap`, and proposes the next move within a time
/// budget through `next`.
pub enum Agent {
    Random(AgentRandom),
    Mcts(AgentMcts)
}

impl Agent {
    /// Returns a fresh backend of the given kind, or `None` if it could
    /// not be constructed within the memory budget.
    ///
    /// # Arguments
    ///
    /// * `kind` - which backend to construct
    /// * `board` - the (empty) board the match is played on
    /// * `threadpool` - the thread budget granted by the referee
    /// * `mem_limit_mib` - the memory budget granted by the referee
    /// * `player` - the player this agent controls
    ///
    pub fn new(
        kind: AgentKind,
        board: &Board,
        threadpool: &Threadpool,
        mem_limit_mib: u32,
        player: Player
    ) -> Option<Agent>
    {
        match kind {
            AgentKind::Random => Some(Agent::Random(AgentRandom::new(board))),
            AgentKind::Mcts => {
                AgentMcts::new(board, threadpool, mem_limit_mib, player).map(Agent::Mcts)
            }
        }
    }

    /// Notify the backend that `player` has played `(x, y)`. The board has
    /// already been updated by the caller.
    pub fn play(&mut self, board: &Board, player: Player, x: u8, y: u8) {
        match self {
            Agent::Random(agent) => agent.play(player, x, y),
            Agent::Mcts(agent) => agent.play(board, player, x, y)
        }
    }

    /// Notify the backend that the swap rule was exercised. The board has
    /// already been swapped by the caller.
    pub fn swap(&mut self, board: &Board) {
        match self {
            Agent::Random(agent) => agent.swap(),
            Agent::Mcts(agent) => agent.swap(board)
        }
    }

    /// Returns the move to play, derived within `timeout`.
    pub fn next(&mut self, board: &Board, timeout: Duration) -> Option<(u8, u8)> {
        match self {
            Agent::Random(agent) => agent.next(timeout),
            Agent::Mcts(agent) => agent.next(board, timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_str() {
        assert_eq!("mcts".parse(), Ok(AgentKind::Mcts));
        assert_eq!("random".parse(), Ok(AgentKind::Random));
        assert_eq!("".parse::<AgentKind>(), Err(()));
    }

    #[test]
    fn dispatch_random() {
        let board = Board::new(2);
        let threadpool = Threadpool::new(1);
        let mut agent = Agent::new(AgentKind::Random, &board, &threadpool, 64, Player::Black).unwrap();

        let (x, y) = agent.next(&board, Duration::from_millis(1)).unwrap();
        assert!(x < 2 && y < 2);
    }
}
