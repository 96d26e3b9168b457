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

use crate::network::Network;

use hex_game::{Board, HexError, Kind, Msg, Player};
use hex_mcts::{Agent, AgentKind, Threadpool};
use hex_utils::config;

use std::time::{Duration, Instant};

enum State {
    Recv,
    Send,
    End
}

/// Returns the time budget for a single move: an amortised split of the
/// remaining wall-clock budget across the remaining turns.
fn move_budget(timer: Duration, size: u32, round: usize) -> Duration {
    let total_rounds = (size as usize * size as usize) / 2;
    let remaining = total_rounds.saturating_sub(round).max(1);

    timer / remaining as u32
}

/// Returns true if white should exercise the swap rule against a black
/// opening at `(x, y)`: openings near the centre are strong enough to be
/// worth stealing.
fn should_swap(size: u32, x: u32, y: u32) -> bool {
    let dx = (2 * x as i64 - (size as i64 - 1)).abs();
    let dy = (2 * y as i64 - (size as i64 - 1)).abs();

    dx.max(dy) <= size as i64 / 2
}

/// The agent side of a match: a single-threaded state machine that
/// mirrors the authoritative board, drives the search backend, and
/// relays moves over the referee connection.
pub struct Game {
    network: Network,
    board: Board,
    agent: Agent,
    round: usize,
    timer: Duration,
    player: Player,
    state: State
}

impl Game {
    /// Receive the `START` message and set up the board and the search
    /// backend from the game parameters it carries.
    pub fn start(mut network: Network) -> Result<Game, HexError> {
        let msg = network.recv(&[Kind::Start])?;
        let (player, board_size, game_secs, thread_limit, mem_limit_mib) = match msg {
            Msg::Start { player, board_size, game_secs, thread_limit, mem_limit_mib } => {
                (player, board_size, game_secs, thread_limit, mem_limit_mib)
            },
            _ => return Err(HexError::BadMsg)
        };

        if board_size < 1 || board_size > 255 {
            log::error!("received unplayable board size {}", board_size);
            return Err(HexError::BadMsg);
        }

        log::info!(
            "received game parameters: player {}, board size {}, game secs {}, thread limit {}, mem limit {} MiB",
            player, board_size, game_secs, thread_limit, mem_limit_mib
        );

        let threadpool = Threadpool::new(thread_limit.saturating_sub(1));
        let board = Board::new(board_size);
        let kind = config::AGENT_TYPE.parse().unwrap_or(AgentKind::Mcts);
        let agent = Agent::new(kind, &board, &threadpool, mem_limit_mib, player)
            .ok_or(HexError::Server)?;

        Ok(Game {
            network,
            board,
            agent,
            round: 1,
            timer: Duration::from_secs(game_secs as u64),
            player,
            state: match player {
                Player::Black => State::Send,
                Player::White => State::Recv
            }
        })
    }

    /// Drive the state machine until the game is over. An error return
    /// means this agent failed and should exit non-zero.
    pub fn run(&mut self) -> Result<(), HexError> {
        loop {
            match self.state {
                State::Recv => self.recv_handler()?,
                State::Send => self.send_handler()?,
                State::End => return Ok(())
            }

            self.round += 1;
        }
    }

    fn recv_handler(&mut self) -> Result<(), HexError> {
        let msg = self.network.recv(&[Kind::Move, Kind::Swap, Kind::End])?;

        match msg {
            Msg::Move { x, y } => {
                log::info!("received move ({}, {}) from opponent", x, y);

                let opponent = self.player.opponent();
                self.board.play(opponent, x, y)?;
                self.agent.play(&self.board, opponent, x as u8, y as u8);

                if self.round == 1 && *config::SWAP_OPENINGS && should_swap(self.board.size(), x, y) {
                    log::info!("stealing the opening with a swap");

                    self.board.swap();
                    self.agent.swap(&self.board);
                    self.network.send(&Msg::Swap)?;

                    // black moves again after a swap, so stay in Recv
                } else {
                    self.state = State::Send;
                }
            },
            Msg::Swap => {
                log::info!("received swap from opponent");

                self.board.swap();
                self.agent.swap(&self.board);
                self.state = State::Send;
            },
            Msg::End { winner } => {
                log::info!("{} has won the game", winner);

                self.state = State::End;
            },
            Msg::Start { .. } => return Err(HexError::BadMsg)
        }

        Ok(())
    }

    fn send_handler(&mut self) -> Result<(), HexError> {
        let timeout = move_budget(self.timer, self.board.size(), self.round);

        let start = Instant::now();
        let (x, y) = self.agent.next(&self.board, timeout).ok_or(HexError::Server)?;
        self.timer = self.timer.saturating_sub(start.elapsed());

        log::info!("generated move ({}, {}), {:.3}s budget left", x, y, self.timer.as_secs_f64());

        self.board.play(self.player, x as u32, y as u32)?;
        self.agent.play(&self.board, self.player, x, y);
        self.network.send(&Msg::Move { x: x as u32, y: y as u32 })?;
        self.state = State::Recv;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_splits_remaining_timer() {
        let timer = Duration::from_secs(300);

        // 60 total rounds on a 11x11 board, one already spent
        assert_eq!(move_budget(timer, 11, 1), timer / 59);
    }

    #[test]
    fn budget_never_divides_by_zero() {
        let timer = Duration::from_secs(10);

        assert_eq!(move_budget(timer, 2, 2), timer);
        assert_eq!(move_budget(timer, 2, 100), timer);
    }

    #[test]
    fn swaps_central_openings_only() {
        assert!(should_swap(11, 5, 5));
        assert!(should_swap(11, 3, 7));
        assert!(!should_swap(11, 0, 0));
        assert!(!should_swap(11, 10, 5));
        assert!(!should_swap(11, 2, 5));
    }

    #[test]
    fn swaps_the_single_cell_of_size_one() {
        assert!(should_swap(1, 0, 0));
    }
}
