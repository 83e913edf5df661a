//! Built-in step executors: `agent`, `condition`, `delay`, `webhook`, `email`.

pub mod agent;
pub mod condition;
pub mod delay;
pub mod email;
pub mod webhook;
