// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod amount;
pub mod calendar;
pub mod error;
pub mod filter;
pub mod ids;
pub mod layout;
pub mod model;
pub mod records;
pub mod schema;
pub mod scroll;
pub mod session;
pub mod state;

pub use amount::*;
pub use calendar::*;
pub use error::*;
pub use filter::*;
pub use ids::*;
pub use layout::*;
pub use model::*;
pub use records::*;
pub use schema::*;
pub use scroll::*;
pub use session::*;
pub use state::*;
