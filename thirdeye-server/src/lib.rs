//! thirdeye-server: HTTP surface for the ThirdEye vision pipeline

pub mod http;
