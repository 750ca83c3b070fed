pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod record;
pub mod replay;
pub mod resolve;
pub mod runtime;
pub mod scenarios;
pub mod synthesize;
