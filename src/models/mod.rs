// 基本的なデータ型と幾何ユーティリティ
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// 行動ポリシーと各エージェントモデルの実装
pub mod policy;
pub mod bot;
pub mod projectile;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use policy::{BehaviorPolicy, CombatStats, PolicyDecision, PolicyInput, ALL_POLICIES};
pub use bot::{Bot, OtherBots};
pub use projectile::{Projectile, ProjectileEndReason};
