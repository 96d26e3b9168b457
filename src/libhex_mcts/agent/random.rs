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

use hex_game::{Board, Move, Player};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use std::time::Duration;

/// A backend that plays a uniformly random legal move by shuffling the
/// empty cells once and handing them out from the back, removing any cell
/// either player occupies along the way.
pub struct AgentRandom {
    moves: Vec<Move>
}

impl AgentRandom {
    pub fn new(board: &Board) -> AgentRandom {
        let mut moves = vec! [];
        board.available_moves_into(&mut moves);
        moves.shuffle(&mut SmallRng::from_entropy());

        AgentRandom { moves }
    }

    pub fn play(&mut self, _player: Player, x: u8, y: u8) {
        if let Some(i) = self.moves.iter().position(|mv| mv.x == x && mv.y == y) {
            self.moves.swap_remove(i);
        }
    }

    pub fn swap(&mut self) {
        // nothing to update; the move list drops moves made by either
        // player, and a swap occupies no new cell
    }

    pub fn next(&mut self, _timeout: Duration) -> Option<(u8, u8)> {
        self.moves.pop().map(|mv| (mv.x, mv.y))
    }
}
