pub mod app;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod session;
pub mod shared;
pub mod wizard;
