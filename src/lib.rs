pub mod cache;
pub mod candidate;
pub mod config;
pub mod debrid;
pub mod doctor;
pub mod encoding;
pub mod enrich;
pub mod filehost;
pub mod link_index;
pub mod media;
pub mod orchestrator;
pub mod playback;
pub mod quality;
pub mod service;
pub mod tmdb;
pub mod user_config;
