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

mod game;
mod network;

use crate::game::Game;
use crate::network::Network;

use hex_utils::config;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use std::env;
use std::process;

fn main() {
    let args = env::args().collect::<Vec<_>>();

    if args.len() < 3 {
        eprintln!("Usage: {} <host> <port>", args[0]);
        process::exit(1);
    }

    let level = match config::AGENT_LOG_LEVEL.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        _ => LevelFilter::Info
    };

    // stderr is redirected into this agent's logfile by the referee
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Never)
        .expect("could not initialize logger");

    let network = match Network::connect(&args[1], &args[2]) {
        Ok(network) => network,
        Err(err) => {
            log::error!("failed to connect to {}:{}: {}", args[1], args[2], err);
            process::exit(1);
        }
    };

    let mut game = match Game::start(network) {
        Ok(game) => game,
        Err(err) => {
            log::error!("failed to start game: {}", err);
            process::exit(1);
        }
    };

    match game.run() {
        Ok(()) => log::info!("game over, goodbye"),
        Err(err) => {
            log::error!("game failed: {}", err);
            process::exit(1);
        }
    }
}
