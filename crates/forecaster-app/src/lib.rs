// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod model;
pub mod report;
pub mod results;
pub mod state;
pub mod validation;

pub use ids::*;
pub use model::*;
pub use report::*;
pub use results::*;
pub use state::*;
pub use validation::*;
