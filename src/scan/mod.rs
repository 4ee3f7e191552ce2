//! Rule violation scanning
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Scheduler  │────▶│   Scanner   │────▶│  Evaluator  │
//! │ (interval)  │     │ (per comp.) │     │ (per rule)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │    Store    │◀──── manual status changes
//!                     └─────────────┘
//! ```

pub mod evaluator;
pub mod manual;
pub mod scanner;
pub mod scheduler;

pub use evaluator::evaluate;
pub use scanner::{ScanSummary, Scanner};
pub use scheduler::run_periodic;
