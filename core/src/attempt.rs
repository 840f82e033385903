// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Retry scheduling for idempotent remote operations.

use std::time::Duration;
use tokio::time::Instant;

/// FixedAttemptStrategy describes how often and for how long an operation
/// may be attempted.
///
/// - `total`: attempts may start until this much time has passed since [`start`](Self::start).
/// - `delay`: minimum spacing between the starts of two attempts.
/// - `min`: attempts that are made even when `total` has already elapsed.
///
/// The strategy itself is immutable configuration and can be shared freely,
/// every call sequence owns the [`Attempt`] returned by `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedAttemptStrategy {
    total: Duration,
    delay: Duration,
    min: usize,
}

impl FixedAttemptStrategy {
    /// Create a strategy bounded by `total`, spacing attempts by `delay`.
    pub fn new(total: Duration, delay: Duration) -> Self {
        Self {
            total,
            delay,
            min: 0,
        }
    }

    /// Guarantee at least `min` attempts regardless of elapsed time.
    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Maximum duration in which attempts may start.
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Minimum spacing between attempt starts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Minimum number of attempts.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Begin a new sequence of attempts.
    ///
    /// The first call to [`Attempt::next`] always succeeds.
    pub fn start(&self) -> Attempt {
        let now = Instant::now();
        Attempt {
            strategy: *self,
            state: State::NotStarted,
            force: true,
            count: 0,
            last: now,
            end: now + self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    Active,
    Exhausted,
}

/// Outcome of [`Attempt::retry`].
#[derive(Debug, PartialEq, Eq)]
pub enum Step<E> {
    /// Another attempt has been granted, the caller should try again.
    Continue,
    /// No attempt is left, carries the last observed error untouched.
    Exhausted(E),
}

/// Attempt is the state of one sequence of attempts.
#[derive(Debug)]
pub struct Attempt {
    strategy: FixedAttemptStrategy,
    state: State,
    force: bool,
    count: usize,
    last: Instant,
    end: Instant,
}

impl Attempt {
    /// Wait for the next attempt slot.
    ///
    /// Returns false once the strategy is exhausted. After that every
    /// further call returns false too.
    pub async fn next(&mut self) -> bool {
        if self.state == State::Exhausted {
            return false;
        }

        let now = Instant::now();
        let sleep = self.next_sleep(now);
        if !self.force && now + sleep >= self.end && self.strategy.min <= self.count {
            self.state = State::Exhausted;
            return false;
        }

        self.force = false;
        if self.count > 0 && !sleep.is_zero() {
            tokio::time::sleep(sleep).await;
        }
        self.count += 1;
        self.last = Instant::now();
        self.state = State::Active;
        true
    }

    /// Report whether another attempt is available.
    ///
    /// A true answer is binding: the following [`next`](Self::next) call
    /// returns true even if the deadline passes in between.
    pub fn has_next(&mut self) -> bool {
        if self.state == State::Exhausted {
            return false;
        }
        if self.force || self.strategy.min > self.count {
            return true;
        }

        let now = Instant::now();
        if now + self.next_sleep(now) < self.end {
            self.force = true;
            return true;
        }

        false
    }

    /// Ask for another attempt after a failure.
    ///
    /// Waits for the next slot and returns [`Step::Continue`], or hands `err`
    /// back in [`Step::Exhausted`] when none is left.
    pub async fn retry<E>(&mut self, err: E) -> Step<E> {
        if self.next().await {
            Step::Continue
        } else {
            Step::Exhausted(err)
        }
    }

    /// Number of attempts granted so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the strategy declined further attempts.
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    fn next_sleep(&self, now: Instant) -> Duration {
        self.strategy
            .delay
            .saturating_sub(now.saturating_duration_since(self.last))
    }
}
