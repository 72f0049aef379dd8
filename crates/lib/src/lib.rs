//! beambot core library — config, Beam job client, artifact fetcher, channels and the
//! prompt relay used by the CLI and the Discord adapter.

pub mod artifacts;
pub mod channels;
pub mod config;
pub mod jobs;
pub mod presence;
pub mod relay;
