// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Opens the chat widget and selects a tab in it, retrying until the widget
//! has mounted or the retry budget runs out.

pub mod activator;
pub mod collaborators;
pub mod policy;
pub mod request;
pub mod timer;

pub use activator::*;
pub use collaborators::*;
pub use policy::*;
pub use request::*;
pub use timer::ThreadScheduler;
