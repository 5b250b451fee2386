//! Operator tooling for the fleet fuel offline sync engine
//!
//! The `fleetsync` binary loads layered settings, opens the local store,
//! wires the HTTP remote (or an in-process one for dry runs) and runs one
//! command against the engine.
//!
//! ```bash
//! fleetsync status
//! fleetsync --offline add vehicles '{"plate":"ABC-1234","model":"Actros"}'
//! fleetsync sync
//! fleetsync list fuel-records
//! fleetsync update-fuel rem-000003 '{"observations":"refilled"}'
//! fleetsync watch --interval 60
//! ```

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Args, Command};
pub use settings::Settings;
