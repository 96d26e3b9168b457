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

/// The thread budget available to a search. The reference search runs on
/// the calling thread; this records how many extra workers a parallel
/// search would be allowed to spawn under the process hard-limit.
pub struct Threadpool {
    threads: u32
}

impl Threadpool {
    pub fn new(threads: u32) -> Threadpool {
        Threadpool { threads }
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_budget() {
        assert_eq!(Threadpool::new(3).threads(), 3);
    }
}
