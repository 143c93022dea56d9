//! Harvest session state machine.
//!
//! `HarvestSession` is a plain value: each cycle consumes the previous session
//! and returns the next one, so termination can be tested without a page.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPhase {
    Running,
    /// The page reported its list complete.
    Settled,
    /// Too many consecutive cycles produced nothing new.
    Exhausted,
    /// The scroll attempt budget ran out.
    Aborted,
}

impl HarvestPhase {
    pub fn is_terminal(self) -> bool {
        self != HarvestPhase::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestLimits {
    pub max_scroll_attempts: u32,
    pub max_consecutive_empty: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSession {
    /// Reviews committed so far; also the start of the next cycle's window.
    pub committed: usize,
    pub attempts: u32,
    pub consecutive_empty: u32,
    pub phase: HarvestPhase,
}

impl HarvestSession {
    /// Fresh session. Zero budgets terminate before the first cycle.
    pub fn start(limits: HarvestLimits) -> Self {
        let phase = if limits.max_scroll_attempts == 0 {
            HarvestPhase::Aborted
        } else if limits.max_consecutive_empty == 0 {
            HarvestPhase::Exhausted
        } else {
            HarvestPhase::Running
        };
        Self {
            committed: 0,
            attempts: 0,
            consecutive_empty: 0,
            phase,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Close one cycle that committed `new_records` reviews.
    pub fn step(self, new_records: usize, end_of_list: bool, limits: HarvestLimits) -> Self {
        if self.is_terminal() {
            return self;
        }
        let mut next = self;

        if new_records == 0 {
            next.consecutive_empty += 1;
            if next.consecutive_empty >= limits.max_consecutive_empty {
                next.phase = HarvestPhase::Exhausted;
            }
        } else {
            next.committed += new_records;
            next.consecutive_empty = 0;
        }

        if end_of_list && next.phase == HarvestPhase::Running {
            next.phase = HarvestPhase::Settled;
        }

        next.attempts += 1;
        if next.attempts >= limits.max_scroll_attempts && next.phase == HarvestPhase::Running {
            next.phase = HarvestPhase::Aborted;
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: HarvestLimits = HarvestLimits {
        max_scroll_attempts: 5,
        max_consecutive_empty: 3,
    };

    #[test]
    fn productive_cycle_commits_and_resets_empty_streak() {
        let session = HarvestSession::start(LIMITS).step(0, false, LIMITS);
        assert_eq!(session.consecutive_empty, 1);

        let session = session.step(7, false, LIMITS);
        assert_eq!(session.committed, 7);
        assert_eq!(session.consecutive_empty, 0);
        assert_eq!(session.attempts, 2);
        assert_eq!(session.phase, HarvestPhase::Running);
    }

    #[test]
    fn empty_streak_exhausts_before_budget() {
        let mut session = HarvestSession::start(LIMITS).step(4, false, LIMITS);
        for _ in 0..3 {
            session = session.step(0, false, LIMITS);
        }
        assert_eq!(session.phase, HarvestPhase::Exhausted);
        assert_eq!(session.attempts, 4);
        assert_eq!(session.committed, 4);
    }

    #[test]
    fn budget_aborts_productive_session() {
        let mut session = HarvestSession::start(LIMITS);
        for _ in 0..5 {
            session = session.step(10, false, LIMITS);
        }
        assert_eq!(session.phase, HarvestPhase::Aborted);
        assert_eq!(session.committed, 50);
    }

    #[test]
    fn exhaustion_on_last_attempt_wins_over_abort() {
        let limits = HarvestLimits {
            max_scroll_attempts: 3,
            max_consecutive_empty: 3,
        };
        let mut session = HarvestSession::start(limits);
        for _ in 0..3 {
            session = session.step(0, false, limits);
        }
        assert_eq!(session.phase, HarvestPhase::Exhausted);
    }

    #[test]
    fn end_of_list_settles() {
        let session = HarvestSession::start(LIMITS).step(3, true, LIMITS);
        assert_eq!(session.phase, HarvestPhase::Settled);
        assert_eq!(session.committed, 3);
    }

    #[test]
    fn terminal_session_ignores_further_steps() {
        let session = HarvestSession::start(LIMITS).step(2, true, LIMITS);
        assert_eq!(session.step(9, false, LIMITS), session);
    }

    #[test]
    fn zero_budgets_never_run() {
        let no_attempts = HarvestLimits {
            max_scroll_attempts: 0,
            max_consecutive_empty: 3,
        };
        assert_eq!(HarvestSession::start(no_attempts).phase, HarvestPhase::Aborted);

        let no_patience = HarvestLimits {
            max_scroll_attempts: 5,
            max_consecutive_empty: 0,
        };
        assert_eq!(HarvestSession::start(no_patience).phase, HarvestPhase::Exhausted);
    }

    #[test]
    fn every_configuration_terminates_within_budget() {
        for attempts in 1..=6 {
            for patience in 1..=6 {
                let limits = HarvestLimits {
                    max_scroll_attempts: attempts,
                    max_consecutive_empty: patience,
                };
                let mut session = HarvestSession::start(limits);
                let mut cycles = 0;
                while !session.is_terminal() {
                    session = session.step(0, false, limits);
                    cycles += 1;
                }
                assert!(cycles <= attempts);
                assert_eq!(cycles, attempts.min(patience));
            }
        }
    }
}
