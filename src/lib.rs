//! Objects Counter クライアント
//!
//! サーバーへのリクエスト、Cookie/ローカルストレージの永続化、
//! 画面遷移を制御するコントローラーとCLI。

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod imaging;
pub mod prompt;
pub mod scanner;
pub mod storage;
