//! Per-event dispatch: route, summarize or format, render.

pub mod dispatch;

pub use dispatch::{DispatchOutcome, Dispatcher, Route, decide_route};
