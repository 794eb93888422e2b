//! Core domain types and logic.

pub mod error;
pub mod num;
pub mod bar;
pub mod series;
pub mod indicator;
pub mod order;
pub mod cost;
pub mod position;
pub mod trading_record;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod strategy;
pub mod backtest;
pub mod slicer;
pub mod history_runner;
pub mod criterion;
pub mod registry;
pub mod config_validation;
