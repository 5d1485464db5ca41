//! HTTP/WebSocket route handlers

pub mod ws;
