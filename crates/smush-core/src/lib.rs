pub mod accumulate;
pub mod activity;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod schedule;
pub mod smooth;
