use std::fmt;

/// States of one account's member-day lottery.
///
/// Each run flows through: START → CAMPAIGN_RESOLVED → SHARE_ATTEMPTED →
/// DRAWING_SHARED → DRAWING_EXCHANGE → DONE, or jumps from START to DONE when
/// no campaign id is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotteryState {
    Start,
    CampaignResolved,
    ShareAttempted,
    DrawingShared,
    DrawingExchange,
    Done,
}

impl fmt::Display for LotteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotteryState::Start => write!(f, "START"),
            LotteryState::CampaignResolved => write!(f, "CAMPAIGN_RESOLVED"),
            LotteryState::ShareAttempted => write!(f, "SHARE_ATTEMPTED"),
            LotteryState::DrawingShared => write!(f, "DRAWING_SHARED"),
            LotteryState::DrawingExchange => write!(f, "DRAWING_EXCHANGE"),
            LotteryState::Done => write!(f, "DONE"),
        }
    }
}

/// What the current phase ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Phase finished, move to the next one.
    Proceed,
    /// Nothing more can happen this run, go straight to `Done`.
    Abort,
}

/// Tracks the current state and the path taken to reach it.
#[derive(Debug, Clone)]
pub struct LotteryMachine {
    state: LotteryState,
    history: Vec<LotteryState>,
}

impl Default for LotteryMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl LotteryMachine {
    pub fn new() -> Self {
        Self {
            state: LotteryState::Start,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> LotteryState {
        self.state
    }

    /// Every state visited, ending with the current one.
    pub fn path(&self) -> Vec<LotteryState> {
        let mut path = self.history.clone();
        path.push(self.state);
        path
    }

    /// Applies `step` to the current state and returns the new state. `Done`
    /// is terminal.
    pub fn next(&mut self, step: Step) -> LotteryState {
        let next = match (self.state, step) {
            (LotteryState::Done, _) => return LotteryState::Done,
            (_, Step::Abort) => LotteryState::Done,
            (LotteryState::Start, Step::Proceed) => LotteryState::CampaignResolved,
            (LotteryState::CampaignResolved, Step::Proceed) => LotteryState::ShareAttempted,
            (LotteryState::ShareAttempted, Step::Proceed) => LotteryState::DrawingShared,
            (LotteryState::DrawingShared, Step::Proceed) => LotteryState::DrawingExchange,
            (LotteryState::DrawingExchange, Step::Proceed) => LotteryState::Done,
        };
        self.history.push(self.state);
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_all_states() {
        let mut machine = LotteryMachine::new();
        assert_eq!(machine.state(), LotteryState::Start);
        assert_eq!(machine.next(Step::Proceed), LotteryState::CampaignResolved);
        assert_eq!(machine.next(Step::Proceed), LotteryState::ShareAttempted);
        assert_eq!(machine.next(Step::Proceed), LotteryState::DrawingShared);
        assert_eq!(machine.next(Step::Proceed), LotteryState::DrawingExchange);
        assert_eq!(machine.next(Step::Proceed), LotteryState::Done);

        // Done is terminal.
        assert_eq!(machine.next(Step::Proceed), LotteryState::Done);
        assert_eq!(machine.path().len(), 6);
    }

    #[test]
    fn missing_campaign_goes_straight_to_done() {
        let mut machine = LotteryMachine::new();
        assert_eq!(machine.next(Step::Abort), LotteryState::Done);
        assert_eq!(machine.path(), vec![LotteryState::Start, LotteryState::Done]);
    }

    #[test]
    fn state_display() {
        assert_eq!(LotteryState::Start.to_string(), "START");
        assert_eq!(LotteryState::DrawingExchange.to_string(), "DRAWING_EXCHANGE");
        assert_eq!(LotteryState::Done.to_string(), "DONE");
    }
}
