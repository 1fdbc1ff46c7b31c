pub mod amounts;
pub mod client;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod explorer;
pub mod fetcher;
pub mod poller;
pub mod round;
pub mod state;
pub mod ui;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
