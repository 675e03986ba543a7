//! tg-media-dl: bulk Telegram media/album downloader with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
