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

use std::env;
use std::str::FromStr;

/// Returns the value of the environment variable `name`, parsed as `T`, or
/// `default` if the variable is unset or unparseable.
fn get_env<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse::<T>().unwrap_or(default),
        Err(_) => default
    }
}

lazy_static! {
    /// How long the referee waits for a freshly spawned agent to connect
    /// back before assuming a forfeit, in milliseconds.
    pub static ref AGENT_ACCEPT_TIMEOUT_MS: u64 = get_env("HEX_AGENT_ACCEPT_TIMEOUT_MS", 1000);

    /// The search backend an agent process should use, `mcts` or `random`.
    pub static ref AGENT_TYPE: String = get_env("HEXES_AGENT", "mcts".to_string());

    /// The log level of an agent process, `error`, `warn`, `info`, or
    /// `debug`.
    pub static ref AGENT_LOG_LEVEL: String = get_env("HEXES_LOG", "info".to_string());

    /// Whether an agent playing white should consider invoking the swap
    /// rule on its first turn.
    pub static ref SWAP_OPENINGS: bool = get_env("HEXES_SWAP", 1u32) != 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_default() {
        assert_eq!(get_env("HEX_THIS_VARIABLE_IS_NOT_SET", 42u64), 42);
    }

    #[test]
    fn defaults() {
        assert!(*AGENT_ACCEPT_TIMEOUT_MS > 0);
        assert!(*AGENT_TYPE == "mcts" || *AGENT_TYPE == "random");
    }
}
