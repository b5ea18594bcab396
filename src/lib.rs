pub mod browser;
pub mod config;
pub mod document;
pub mod driver;
pub mod element;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod page;
pub mod profile;
pub mod sequencer;
pub mod waiter;

pub use browser::Session;
pub use config::{BrowserConfig, SweepConfig};
pub use document::{Document, LoadStep, NodeInfo};
pub use driver::{ListDriver, OutcomeTally, ScanSnapshot, SweepReport, Termination};
pub use error::{Error, Result};
pub use page::Page;
pub use profile::{Matcher, SweepProfile};
pub use sequencer::{ActionOutcome, ActionSequencer, SequenceState};
pub use waiter::{WaitBudget, Waiter};
