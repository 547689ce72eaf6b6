pub mod close;
pub mod configure;
pub mod dashboard;
pub mod panel;
