//! # Meteo OpenWeatherMap client
//!
//! [`WeatherProvider`](meteo_core::WeatherProvider) implementation backed by
//! the OpenWeatherMap current-weather endpoint.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;

pub use client::{OpenWeatherClient, OpenWeatherConfig};
