//! sea-orm entities for the roster database.

pub mod entities;
