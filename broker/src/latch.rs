use std::sync::OnceLock;

use rootprompt_protocol::Policy;

use crate::controller::DecisionTrigger;

/// The decision claimed for a prompt, together with what caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimedDecision {
    pub policy: Policy,
    pub trigger: DecisionTrigger,
}

/// Single-assignment cell guarding the decision channel.
///
/// The first caller of [`DecisionLatch::claim`] wins and is the only one
/// allowed to write; every later caller gets the winning decision back.
#[derive(Debug, Default)]
pub struct DecisionLatch {
    cell: OnceLock<ClaimedDecision>,
}

impl DecisionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, trigger: DecisionTrigger) -> Result<ClaimedDecision, ClaimedDecision> {
        let decision = ClaimedDecision {
            policy: trigger.policy(),
            trigger,
        };
        match self.cell.set(decision) {
            Ok(()) => Ok(decision),
            Err(_) => Err(self.claimed().unwrap_or(decision)),
        }
    }

    pub fn claimed(&self) -> Option<ClaimedDecision> {
        self.cell.get().copied()
    }

    pub fn is_claimed(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_claim_wins() {
        let latch = DecisionLatch::new();
        assert!(!latch.is_claimed());

        let first = latch.claim(DecisionTrigger::AllowClicked);
        assert_eq!(
            first,
            Ok(ClaimedDecision {
                policy: Policy::Allow,
                trigger: DecisionTrigger::AllowClicked,
            })
        );

        let second = latch.claim(DecisionTrigger::Dismissed);
        assert_eq!(
            second,
            Err(ClaimedDecision {
                policy: Policy::Allow,
                trigger: DecisionTrigger::AllowClicked,
            })
        );
        assert_eq!(latch.claimed().map(|d| d.policy), Some(Policy::Allow));
    }

    #[test]
    fn concurrent_claims_admit_exactly_one_winner() {
        let latch = std::sync::Arc::new(DecisionLatch::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let latch = std::sync::Arc::clone(&latch);
                std::thread::spawn(move || {
                    let trigger = if i % 2 == 0 {
                        DecisionTrigger::AllowClicked
                    } else {
                        DecisionTrigger::Teardown
                    };
                    latch.claim(trigger).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(false))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
