//! Cyclic module interface
//!
//! A cyclic module is initialised once from its parameters, then processed once per tick of its
//! loop. The loop (or a test) owns the module and feeds it one input per tick.

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// State of a cyclic module.
pub trait State {
    /// Parameters the module is initialised from
    type InitData;
    type InitError;

    /// Inputs sampled at the start of a tick
    type InputData;

    /// Output of a tick, for instance an actuator command
    type OutputData;

    /// Intermediate values of a tick, for logging and diagnostics
    type StatusReport;
    type ProcError;

    /// Initialise, or re-initialise, the module.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Process one tick.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
