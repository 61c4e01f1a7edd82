pub use crate::composer::{compose, ComposedInstructionSet, OptionalGroup};
pub use crate::config::{
  Commitment, ConfigError, ExecutorConfig, SimulationPolicy, TimeoutPolicy,
};
pub use crate::error::{ExecutionError, FlowError};
pub use crate::flow::{
  Collaborators, FlowReport, SwapAndDeposit, SwapAndDepositRequest,
};
pub use crate::size_budget::{SizeBudget, TransactionSize};
pub use crate::submitter::{
  OutcomeStatus, Stage, SubmissionReport, Submitter, TransactionOutcome,
};
pub use crate::transaction_builder::CandidateTransaction;
