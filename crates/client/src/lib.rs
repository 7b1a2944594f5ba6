//! Client code for the uninav offline worker.
//!
//! This crate provides the HTTP fetch client the worker falls back to, and
//! the worker itself: request routing, cache lifecycle, and tile prefetch.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, RequestMode, UrlError, resolve};
pub use reqwest::Method;
pub use worker::{
    ControlMessage, InstallReport, PrefetchSummary, RequestClass, ResponseSource, RoutedResponse, Worker, WorkerEvent,
    WorkerState,
};
