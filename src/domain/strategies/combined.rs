//! Several strategies run side by side on one symbol.

use crate::domain::error::StrategyError;
use crate::domain::observation::MarketObservation;
use crate::domain::position::Position;
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;

/// Feeds every member each observation and acts on the first non-HOLD signal,
/// in member order.
///
/// A failing member fails the whole tick, after the remaining members have
/// still seen the observation so their histories stay aligned.
pub struct Combined {
    name: String,
    members: Vec<Box<dyn Strategy>>,
}

impl Combined {
    pub fn new(members: Vec<Box<dyn Strategy>>) -> Self {
        let name = members
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join("+");
        Self { name, members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Strategy for Combined {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        position: Option<&Position>,
    ) -> Result<Signal, StrategyError> {
        let mut chosen = Signal::Hold;
        let mut failure = None;

        for member in &mut self.members {
            match member.on_observation(observation, position) {
                Ok(signal) if chosen.is_hold() => chosen = signal,
                Ok(_) => {}
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(StrategyError::new(format!("{}: {}", member.name(), e)));
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(chosen),
        }
    }
}
