use crate::arena::{ArenaCommand, ArenaSnapshot};
use crate::models::common::*;

/// 全てのシミュレーションエージェントが実装する基本インターフェース
pub trait IAgent {
    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 移動可能なエージェントのインターフェース
pub trait IMovable {
    /// 1tick分の移動処理
    fn move_agent(&mut self);

    /// 現在位置の取得
    fn get_position(&self) -> Position2D;
}

/// 衝突検知のインターフェース
pub trait ICollision {
    /// 衝突判定に使う半径
    fn collision_radius(&self) -> f64;

    /// 中心位置
    fn collision_center(&self) -> Position2D;

    /// 点が衝突半径の内側にあるか（境界上は含まない）
    fn check_collision(&self, point: Position2D) -> bool {
        self.collision_center().distance_to(&point) < self.collision_radius()
    }
}

/// 描画側のインターフェース（tick後に1回だけ読み取る）
pub trait IRenderer {
    fn render(&mut self, snapshot: &ArenaSnapshot);
}

/// 入力側のインターフェース
pub trait ICommandSource {
    /// 指定フレームで発行されるコマンド
    fn poll(&mut self, frame: u64) -> Vec<ArenaCommand>;

    /// これ以上コマンドが来ないかどうか
    fn is_exhausted(&self) -> bool;
}
