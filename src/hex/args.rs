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

/// The referee configuration, as given on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Args {
    pub agent_1: Option<String>,
    pub agent_1_uid: u32,
    pub agent_2: Option<String>,
    pub agent_2_uid: u32,
    pub board_dimensions: u32,
    pub game_secs: u32,
    pub thread_limit: u32,
    pub mem_limit_mib: u32,
    pub verbose: bool,
    pub help: bool
}

impl Default for Args {
    fn default() -> Args {
        Args {
            agent_1: None,
            agent_1_uid: 0,
            agent_2: None,
            agent_2_uid: 0,
            board_dimensions: 11,
            game_secs: 300,
            thread_limit: 4,
            mem_limit_mib: 1024,
            verbose: false,
            help: false
        }
    }
}

pub fn usage(program: &str) {
    eprintln!("Usage: {} -a <agent-1> -ua <uid> -b <agent-2> -ub <uid> [-d 11] [-s 300] [-t 4] [-m 1024] [-v] [-h]", program);
    eprintln!("\t-a: The command to execute for the first agent (black)");
    eprintln!("\t-ua: The user id to set for the first agent (black)");
    eprintln!("\t-b: The command to execute for the second agent (white)");
    eprintln!("\t-ub: The user id to set for the second agent (white)");
    eprintln!("\t-d: The dimensions for the game board (default: 11)");
    eprintln!("\t-s: The per-agent game timer, in seconds (default: 300 seconds)");
    eprintln!("\t-t: The per-agent thread hard-limit (default: 4 threads)");
    eprintln!("\t-m: The per-agent memory hard-limit, in MiB (default: 1024 MiB)");
    eprintln!("\t-v: Enables verbose logging on the server");
    eprintln!("\t-h: Prints this help information");
}

fn parse_u32(flag: &str, value: Option<&String>) -> Result<u32, String> {
    value
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| format!(
            "{} takes a positive, unsigned integer argument, was given: '{}'",
            flag,
            value.map(String::as_str).unwrap_or("")
        ))
}

/// Parse the command line, leaving any omitted option at its default.
pub fn parse(argv: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut i = 1;

    while i < argv.len() {
        let arg = &argv[i];

        if !arg.starts_with('-') {
            i += 1;
            continue;
        }

        match &arg[1..] {
            "a" => {
                i += 1;
                args.agent_1 = argv.get(i).cloned();
            },
            "b" => {
                i += 1;
                args.agent_2 = argv.get(i).cloned();
            },
            "ua" => {
                i += 1;
                args.agent_1_uid = parse_u32("-ua", argv.get(i))?;
            },
            "ub" => {
                i += 1;
                args.agent_2_uid = parse_u32("-ub", argv.get(i))?;
            },
            "d" => {
                i += 1;
                args.board_dimensions = parse_u32("-d", argv.get(i))?;
            },
            "s" => {
                i += 1;
                args.game_secs = parse_u32("-s", argv.get(i))?;
            },
            "t" => {
                i += 1;
                args.thread_limit = parse_u32("-t", argv.get(i))?;
            },
            "m" => {
                i += 1;
                args.mem_limit_mib = parse_u32("-m", argv.get(i))?;
            },
            "v" => args.verbose = true,
            "h" => args.help = true,
            unknown => return Err(format!("Unknown argument: {}", unknown))
        }

        i += 1;
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("hex")
            .chain(args.iter().cloned())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults() {
        let args = parse(&argv(&[])).unwrap();

        assert_eq!(args.board_dimensions, 11);
        assert_eq!(args.game_secs, 300);
        assert_eq!(args.thread_limit, 4);
        assert_eq!(args.mem_limit_mib, 1024);
        assert!(!args.verbose);
    }

    #[test]
    fn full_command_line() {
        let args = parse(&argv(&[
            "-a", "./black", "-ua", "1001",
            "-b", "./white", "-ub", "1002",
            "-d", "13", "-s", "60", "-t", "2", "-m", "256", "-v"
        ])).unwrap();

        assert_eq!(args.agent_1.as_deref(), Some("./black"));
        assert_eq!(args.agent_1_uid, 1001);
        assert_eq!(args.agent_2.as_deref(), Some("./white"));
        assert_eq!(args.agent_2_uid, 1002);
        assert_eq!(args.board_dimensions, 13);
        assert_eq!(args.game_secs, 60);
        assert_eq!(args.thread_limit, 2);
        assert_eq!(args.mem_limit_mib, 256);
        assert!(args.verbose);
    }

    #[test]
    fn bad_uid_is_rejected() {
        assert!(parse(&argv(&["-ua", "root"])).is_err());
        assert!(parse(&argv(&["-ua"])).is_err());
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse(&argv(&["-z"])).is_err());
    }
}
