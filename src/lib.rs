//! # botsim
//!
//! 2次元アリーナでボット同士が戦うバトルロイヤルシミュレーションです。
//!
//! - [`models`]: ボット・弾・行動ポリシーなどのエージェントモデル
//! - [`arena`]: フェーズ管理とtick処理を行うアリーナ
//! - [`scenario`]: YAMLシナリオの読み込みと検証
//! - [`simulation`]: 入力・tick・描画を回すフレームループ
//! - [`logging`]: tracingによるログ出力の初期化

pub mod arena;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
