use crate::types::{SimulationRequest, SimulationResult};
use serde::Serialize;
use thiserror::Error;

/// The single "current result / loading / error" slot behind the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SimulatorState {
    #[default]
    Idle,
    Loading { request: SimulationRequest },
    #[serde(rename = "result")]
    ShowingResult { result: Box<SimulationResult> },
    #[serde(rename = "error")]
    ShowingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Succeed,
    Fail,
    RejectInput,
    Reset,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{transition:?} is not allowed while {from}")]
pub struct IllegalTransition {
    pub from: &'static str,
    pub transition: Transition,
}

impl SimulatorState {
    pub fn label(&self) -> &'static str {
        match self {
            SimulatorState::Idle => "idle",
            SimulatorState::Loading { .. } => "loading",
            SimulatorState::ShowingResult { .. } => "result",
            SimulatorState::ShowingError { .. } => "error",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SimulatorState::Loading { .. })
    }

    fn illegal(&self, transition: Transition) -> IllegalTransition {
        IllegalTransition { from: self.label(), transition }
    }

    /// Starts a simulation. Any previous result or error is dropped.
    pub fn submit(&mut self, request: SimulationRequest) -> Result<(), IllegalTransition> {
        if self.is_loading() {
            return Err(self.illegal(Transition::Submit));
        }
        *self = SimulatorState::Loading { request };
        Ok(())
    }

    pub fn succeed(&mut self, result: SimulationResult) -> Result<(), IllegalTransition> {
        if !self.is_loading() {
            return Err(self.illegal(Transition::Succeed));
        }
        *self = SimulatorState::ShowingResult { result: Box::new(result) };
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        if !self.is_loading() {
            return Err(self.illegal(Transition::Fail));
        }
        *self = SimulatorState::ShowingError { message: message.into() };
        Ok(())
    }

    /// Form input was refused before any call was issued.
    pub fn reject_input(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        if self.is_loading() {
            return Err(self.illegal(Transition::RejectInput));
        }
        *self = SimulatorState::ShowingError { message: message.into() };
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), IllegalTransition> {
        if self.is_loading() {
            return Err(self.illegal(Transition::Reset));
        }
        *self = SimulatorState::Idle;
        Ok(())
    }

    /// Closes the error banner; a no-op in any other state.
    pub fn dismiss_error(&mut self) {
        if matches!(self, SimulatorState::ShowingError { .. }) {
            *self = SimulatorState::Idle;
        }
    }
}
