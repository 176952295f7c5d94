use tracing::{info, trace};

use crate::models::{
    traits::{IAgent, IMovable, ICollision},
    common::{Position2D, Velocity2D, ArenaBounds, PROJECTILE_SPEED, PROJECTILE_LIFETIME, PROJECTILE_SIZE},
    bot::Bot,
};

/// 弾の終了理由
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectileEndReason {
    /// 所有者以外の生存ボットに命中した
    Hit,
    /// 寿命が尽きた
    Expired,
    /// アリーナ外に出た
    OutOfBounds,
}

/// 弾エージェント
///
/// 発射時の方向へ等速直線運動し、最初に接触した所有者以外の生存ボットにダメージを与えます。
/// ダメージ量と所有者は生成後に変更できません。
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: String,
    pub position: Position2D,
    pub velocity: Velocity2D,
    /// 残り寿命[tick]
    pub lifetime: i32,
    pub size: f64,
    pub end_reason: Option<ProjectileEndReason>,
    damage: i32,
    owner: usize,
}

impl Projectile {
    /// 新しい弾を作成
    ///
    /// # 引数
    ///
    /// * `id` - 弾の識別子
    /// * `position` - 発射位置
    /// * `angle` - 発射方向[rad]
    /// * `damage` - 発射時点の所有者のダメージ値
    /// * `owner` - 所有者のボットインデックス
    pub fn new(id: String, position: Position2D, angle: f64, damage: i32, owner: usize) -> Self {
        Self {
            id,
            position,
            velocity: Velocity2D::from_polar(angle, PROJECTILE_SPEED),
            lifetime: PROJECTILE_LIFETIME,
            size: PROJECTILE_SIZE,
            end_reason: None,
            damage,
            owner,
        }
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    /// 1tick分の処理
    ///
    /// 移動 → 寿命減算 → 衝突判定（ストレージ順、所有者と破壊済みは除外）→
    /// 領域外・寿命切れ判定の順に処理します。
    ///
    /// # 戻り値
    ///
    /// (まだ飛翔中か, バトルログ用メッセージ)
    pub fn tick(&mut self, bots: &mut [Bot], bounds: &ArenaBounds) -> (bool, Option<String>) {
        self.move_agent();
        self.lifetime -= 1;

        let hit = bots
            .iter()
            .enumerate()
            .find(|(index, bot)| {
                *index != self.owner && bot.is_active() && bot.check_collision(self.position)
            })
            .map(|(index, _)| index);

        if let Some(index) = hit {
            let attacker = bots
                .get(self.owner)
                .map(|owner| owner.get_id())
                .unwrap_or_else(|| "unknown".to_string());
            let victim = &mut bots[index];
            let message = victim.take_damage(self.damage, &attacker);
            self.end_reason = Some(ProjectileEndReason::Hit);

            info!(
                projectile_id = %self.id,
                attacker = %attacker,
                victim = %victim.name,
                damage = self.damage,
                remaining_health = victim.health,
                hit_position_x = self.position.x,
                hit_position_y = self.position.y,
                "PROJECTILE_HIT: 弾が命中しました"
            );

            return (false, Some(message));
        }

        if !bounds.contains(self.position) {
            self.end_reason = Some(ProjectileEndReason::OutOfBounds);
        } else if self.lifetime <= 0 {
            self.end_reason = Some(ProjectileEndReason::Expired);
        }

        if let Some(reason) = self.end_reason {
            trace!(
                projectile_id = %self.id,
                reason = ?reason,
                position_x = self.position.x,
                position_y = self.position.y,
                "PROJECTILE_END: 弾が消滅しました"
            );
            return (false, None);
        }

        (true, None)
    }
}

impl IAgent for Projectile {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> bool {
        self.end_reason.is_none()
    }
}

impl IMovable for Projectile {
    fn move_agent(&mut self) {
        self.position = self.position + self.velocity;
    }

    fn get_position(&self) -> Position2D {
        self.position
    }
}
