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

mod args;
mod server;

use crate::server::{AgentState, Server};

use hex_game::{Board, HexError, Player};

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use std::env;
use std::process;

fn main() {
    let argv = env::args().collect::<Vec<_>>();
    let args = match args::parse(&argv) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            args::usage(&argv[0]);
            process::exit(1);
        }
    };

    if args.help {
        args::usage(&argv[0]);
        process::exit(0);
    }

    TermLogger::init(
        if args.verbose { LevelFilter::Debug } else { LevelFilter::Info },
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto
    ).expect("could not initialize logger");

    let (agent_1, agent_2) = match (args.agent_1.clone(), args.agent_2.clone()) {
        (Some(agent_1), Some(agent_2)) => (agent_1, agent_2),
        _ => {
            eprintln!("Must provide execution targets for both agent-1 and agent-2");
            args::usage(&argv[0]);
            process::exit(1);
        }
    };

    if args.agent_1_uid == 0 || args.agent_2_uid == 0 {
        eprintln!("Must provide (non-root) user ids for both agent-1 and agent-2");
        args::usage(&argv[0]);
        process::exit(1);
    }

    if args.board_dimensions < 1 || args.board_dimensions > 255 {
        eprintln!("Board dimensions must be between 1 and 255, was given: {}", args.board_dimensions);
        process::exit(1);
    }

    let mut board = Board::new(args.board_dimensions);

    let server = match Server::new() {
        Ok(server) => server,
        Err(_) => {
            log::error!("failed to initialise server state");
            process::exit(1);
        }
    };

    let mut black = AgentState::new(Player::Black, agent_1, args.agent_1_uid, args.game_secs);
    let mut white = AgentState::new(Player::White, agent_2, args.agent_2_uid, args.game_secs);

    if server.spawn_agent(&mut black, &args).is_err() {
        log::error!("failed to spawn black user agent: {}", black.agent);
        process::exit(1);
    }

    if server.spawn_agent(&mut white, &args).is_err() {
        log::error!("failed to spawn white user agent: {}", white.agent);
        process::exit(1);
    }

    let stats = server.run(&mut board, &mut black, &mut white, &args);

    server.wait_all_agents();

    println!("agent_1,agent_1_won,agent_1_rounds,agent_1_secs,agent_1_err,agent_1_logfile,agent_2,agent_2_won,agent_2_rounds,agent_2_secs,agent_2_err,agent_2_logfile,");
    println!(
        "{},{},{},{:.6},{},{},{},{},{},{:.6},{},{},",
        black.agent,
        stats.agent_1_won as i32,
        stats.agent_1_rounds,
        stats.agent_1_secs,
        HexError::code_of(stats.agent_1_err),
        black.logfile,
        white.agent,
        stats.agent_2_won as i32,
        stats.agent_2_rounds,
        stats.agent_2_secs,
        HexError::code_of(stats.agent_2_err),
        white.logfile
    );
}
