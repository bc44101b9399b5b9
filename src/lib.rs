// src/lib.rs
pub mod app;
pub mod broadcast;
pub mod config;
pub mod errors;
pub mod event;
pub mod holodex;
pub mod notify;
pub mod presenter;
pub mod scheduler;
pub mod snapshot;
pub mod transitions;
pub mod ui;
pub mod video_client;
