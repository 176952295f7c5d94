use rand::Rng;
use tracing::debug;

use crate::models::{
    traits::{IAgent, IMovable, ICollision},
    common::{Position2D, Velocity2D, ArenaBounds, Rgb, BOT_SIZE, TARGET_SCAN_INTERVAL},
    policy::{BehaviorPolicy, PolicyInput},
    projectile::Projectile,
};

/// ボットエージェント
///
/// 行動ポリシーに従って移動・射撃する自律戦闘エージェントです。
/// 体力が0になると破壊状態となり、以後は何も行動しませんが、
/// ターゲットや弾の所有者のインデックスを保つため実行中は保管され続けます。
#[derive(Debug, Clone)]
pub struct Bot {
    /// ボット名（実行中は一意）
    pub name: String,
    /// 表示色
    pub color: Rgb,
    /// 行動ポリシー（生成時に固定）
    pub policy: BehaviorPolicy,
    /// 現在位置
    pub position: Position2D,
    /// 直近tickの速度（毎tick再計算）
    pub velocity: Velocity2D,
    /// 進行方向[rad]
    pub heading: f64,
    /// 大きさ（クランプはsize/2、衝突はsizeを半径として使用）
    pub size: f64,

    /// 現在の体力
    pub health: i32,
    /// 最大体力
    pub max_health: i32,
    /// 1発あたりのダメージ
    pub damage: i32,
    /// 移動速度[units/tick]（Sneakyは接近時に書き換える）
    pub speed: f64,
    /// 交戦距離
    pub range: f64,
    /// 射撃間隔[tick]
    pub fire_cooldown: u32,
    /// 前回射撃からの経過tick
    pub ticks_since_shot: u32,

    /// 現在のターゲット（ボット配列のインデックス、所有しない）
    pub target: Option<usize>,
    /// 前回探索からの経過tick
    pub ticks_since_scan: u32,
    /// 弾ID生成用カウンタ
    pub shots_fired: u32,
}

impl Bot {
    /// 新しいボットを作成
    ///
    /// 基本ステータスにポリシー固有の補正を適用し、進行方向を[0, 2π)の一様乱数で初期化します。
    pub fn new<R: Rng>(
        position: Position2D,
        color: Rgb,
        name: String,
        policy: BehaviorPolicy,
        rng: &mut R,
    ) -> Self {
        let stats = policy.stats();
        Self {
            name,
            color,
            policy,
            position,
            velocity: Velocity2D::default(),
            heading: rng.random_range(0.0..std::f64::consts::TAU),
            size: BOT_SIZE,
            health: stats.max_health,
            max_health: stats.max_health,
            damage: stats.damage,
            speed: stats.speed,
            range: stats.range,
            fire_cooldown: stats.fire_cooldown,
            ticks_since_shot: 0,
            target: None,
            ticks_since_scan: 0,
            shots_fired: 0,
        }
    }

    /// 1tick分の処理
    ///
    /// 破壊済みなら何もしません。カウンタ更新 → 定期的なターゲット再探索 →
    /// ポリシー実行（射撃判定を含む）→ 移動 → 境界クランプの順に処理します。
    ///
    /// # 引数
    ///
    /// * `others` - 自分以外のボット（ストレージ順のインデックス付き）
    /// * `bounds` - アリーナ境界
    /// * `rng` - 乱数生成器
    ///
    /// # 戻り値
    ///
    /// 射撃した場合は新しい弾
    pub fn tick<R: Rng>(
        &mut self,
        others: &OtherBots<'_>,
        bounds: &ArenaBounds,
        rng: &mut R,
    ) -> Option<Projectile> {
        if !self.is_active() {
            return None;
        }

        self.ticks_since_shot = self.ticks_since_shot.saturating_add(1);
        self.ticks_since_scan = self.ticks_since_scan.saturating_add(1);

        if self.ticks_since_scan > TARGET_SCAN_INTERVAL {
            self.target = self.find_target(others);
            self.ticks_since_scan = 0;
        }

        let projectile = self.execute_policy(others, rng);

        self.move_agent();
        self.constrain_to_bounds(bounds);

        projectile
    }

    /// 移動せずにポリシーだけを再実行する
    ///
    /// ポリシーの二重実行モードで、アリーナが射撃判定をやり直すために使います。
    pub fn reconsider<R: Rng>(&mut self, others: &OtherBots<'_>, rng: &mut R) -> Option<Projectile> {
        if !self.is_active() {
            return None;
        }
        self.execute_policy(others, rng)
    }

    /// 最も近い生存ボットを探索（同距離なら先に見つかった方）
    pub fn find_target(&self, others: &OtherBots<'_>) -> Option<usize> {
        let mut closest = None;
        let mut closest_distance = f64::INFINITY;

        for (index, bot) in others.iter() {
            if !bot.is_active() {
                continue;
            }
            let distance = self.position.distance_to(&bot.get_position());
            if distance < closest_distance {
                closest = Some(index);
                closest_distance = distance;
            }
        }

        if closest != self.target {
            debug!(
                bot = %self.name,
                previous_target = ?self.target,
                new_target = ?closest,
                distance = closest_distance,
                "BOT_RETARGET: ターゲットを更新しました"
            );
        }

        closest
    }

    /// ポリシーを実行して進行方向・速度を更新し、必要なら射撃
    fn execute_policy<R: Rng>(&mut self, others: &OtherBots<'_>, rng: &mut R) -> Option<Projectile> {
        // 破壊済みのターゲットでも次の再探索までは狙い続ける
        let target_position = self
            .target
            .and_then(|index| others.get(index))
            .map(|bot| bot.get_position());

        let decision = self.policy.decide(
            &PolicyInput {
                position: self.position,
                heading: self.heading,
                range: self.range,
                target: target_position,
            },
            rng,
        );

        self.heading = decision.heading;
        if let Some(speed) = decision.speed_override {
            self.speed = speed;
        }

        if decision.fire {
            self.shoot(target_position, others.self_index())
        } else {
            None
        }
    }

    /// クールダウンが明けていてターゲットがあれば弾を生成
    pub fn shoot(&mut self, target_position: Option<Position2D>, owner_index: usize) -> Option<Projectile> {
        let target_position = target_position?;
        if !self.can_fire() {
            return None;
        }

        let angle = self.position.angle_to(&target_position);
        self.ticks_since_shot = 0;
        self.shots_fired += 1;

        let projectile_id = format!("{}_P{:03}", self.name, self.shots_fired);
        Some(Projectile::new(projectile_id, self.position, angle, self.damage, owner_index))
    }

    /// 発射した弾が採用されなかったとき、発射数だけを戻す（クールダウンは消費したまま）
    pub fn discard_shot(&mut self) {
        self.shots_fired = self.shots_fired.saturating_sub(1);
    }

    /// 射撃可能かどうか
    pub fn can_fire(&self) -> bool {
        self.is_active() && self.ticks_since_shot >= self.fire_cooldown
    }

    /// ダメージを受ける
    ///
    /// 体力は[0, max_health]にクランプされます。
    ///
    /// # 引数
    ///
    /// * `amount` - ダメージ量
    /// * `attacker` - 弾の所有者名
    ///
    /// # 戻り値
    ///
    /// バトルログ用のメッセージ
    pub fn take_damage(&mut self, amount: i32, attacker: &str) -> String {
        let was_alive = self.is_active();
        self.health = (self.health - amount).clamp(0, self.max_health);

        if was_alive && self.health == 0 {
            format!("{} destroyed by {}!", self.name, attacker)
        } else {
            format!("{} takes {} damage!", self.name, amount)
        }
    }

    /// アリーナ境界内に位置を制限
    pub fn constrain_to_bounds(&mut self, bounds: &ArenaBounds) {
        self.position = bounds.clamp(self.position, self.size / 2.0);
    }
}

impl IAgent for Bot {
    fn get_id(&self) -> String {
        self.name.clone()
    }

    fn is_active(&self) -> bool {
        self.health > 0
    }
}

impl IMovable for Bot {
    fn move_agent(&mut self) {
        self.velocity = Velocity2D::from_polar(self.heading, self.speed);
        self.position = self.position + self.velocity;
    }

    fn get_position(&self) -> Position2D {
        self.position
    }
}

impl ICollision for Bot {
    fn collision_radius(&self) -> f64 {
        self.size
    }

    fn collision_center(&self) -> Position2D {
        self.position
    }
}

/// 1体のボットから見た他のボット群
///
/// ボット配列を自分の前後に分割して借用し、元のインデックスを保ったまま参照できます。
pub struct OtherBots<'a> {
    before: &'a [Bot],
    after: &'a [Bot],
}

impl<'a> OtherBots<'a> {
    /// `index` のボットを可変で取り出し、残りを `OtherBots` として返す
    pub fn split(bots: &'a mut [Bot], index: usize) -> Option<(&'a mut Bot, OtherBots<'a>)> {
        let (before, rest) = bots.split_at_mut(index.min(bots.len()));
        let (current, after) = rest.split_first_mut()?;
        Some((current, OtherBots { before, after }))
    }

    /// 自分自身のインデックス
    pub fn self_index(&self) -> usize {
        self.before.len()
    }

    /// インデックスで参照（自分自身はNone）
    pub fn get(&self, index: usize) -> Option<&'a Bot> {
        let self_index = self.self_index();
        if index < self_index {
            self.before.get(index)
        } else if index == self_index {
            None
        } else {
            self.after.get(index - self_index - 1)
        }
    }

    /// ストレージ順に (インデックス, ボット) を列挙
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Bot)> + 'a {
        let offset = self.self_index() + 1;
        self.before
            .iter()
            .enumerate()
            .chain(self.after.iter().enumerate().map(move |(i, bot)| (i + offset, bot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::{RED, BLUE};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn bot(name: &str, x: f64, y: f64, policy: BehaviorPolicy) -> Bot {
        let mut rng = Pcg32::seed_from_u64(3);
        Bot::new(Position2D::new(x, y), RED, name.to_string(), policy, &mut rng)
    }

    #[test]
    fn test_new_applies_policy_stats() {
        let b = bot("B", 10.0, 10.0, BehaviorPolicy::Berserker);
        assert_eq!((b.health, b.max_health, b.damage), (60, 60, 25));
        assert_eq!(b.speed, 3.0);
        assert!(b.heading >= 0.0 && b.heading < std::f64::consts::TAU);

        let d = bot("D", 10.0, 10.0, BehaviorPolicy::Defensive);
        assert_eq!((d.health, d.max_health), (120, 120));
        assert_eq!(d.color, RED);
    }

    #[test]
    fn test_take_damage_messages() {
        let mut b = bot("Target", 100.0, 100.0, BehaviorPolicy::Aggressive);
        assert_eq!(b.take_damage(15, "Shooter"), "Target takes 15 damage!");
        assert_eq!(b.health, 85);
        assert_eq!(b.take_damage(500, "Shooter"), "Target destroyed by Shooter!");
        assert_eq!(b.health, 0);
        assert!(!b.is_active());
        // 2回目以降は撃破メッセージを出さない
        assert_eq!(b.take_damage(10, "Shooter"), "Target takes 10 damage!");
        assert_eq!(b.health, 0);
    }

    #[test]
    fn test_destroyed_bot_does_nothing() {
        let mut bots = vec![
            bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("B", 120.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].health = 0;
        bots[0].ticks_since_shot = 1000;
        let mut rng = Pcg32::seed_from_u64(1);
        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        assert!(a.tick(&others, &ArenaBounds::default(), &mut rng).is_none());
        assert_eq!(a.position, Position2D::new(100.0, 100.0));
        assert_eq!(a.ticks_since_shot, 1000);
    }

    #[test]
    fn test_rescan_after_interval() {
        let mut bots = vec![
            bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("B", 140.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].speed = 0.0;
        let bounds = ArenaBounds::default();
        let mut rng = Pcg32::seed_from_u64(1);

        for _ in 0..TARGET_SCAN_INTERVAL {
            let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
            a.tick(&others, &bounds, &mut rng);
        }
        assert_eq!(bots[0].target, None);

        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        a.tick(&others, &bounds, &mut rng);
        assert_eq!(bots[0].target, Some(1));
        assert_eq!(bots[0].ticks_since_scan, 0);
    }

    #[test]
    fn test_find_target_nearest_living_first_wins() {
        let mut bots = vec![
            bot("Self", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("Dead", 101.0, 100.0, BehaviorPolicy::Aggressive),
            bot("Left", 50.0, 100.0, BehaviorPolicy::Aggressive),
            bot("Right", 150.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[1].health = 0;
        let (me, others) = OtherBots::split(&mut bots, 0).unwrap();
        assert_eq!(me.find_target(&others), Some(2));

        let mut lonely = vec![bot("Only", 100.0, 100.0, BehaviorPolicy::Aggressive)];
        let (me, others) = OtherBots::split(&mut lonely, 0).unwrap();
        assert_eq!(me.find_target(&others), None);
    }

    #[test]
    fn test_other_bots_indices() {
        let mut bots = vec![
            bot("A", 0.0, 0.0, BehaviorPolicy::Aggressive),
            bot("B", 0.0, 0.0, BehaviorPolicy::Aggressive),
            bot("C", 0.0, 0.0, BehaviorPolicy::Aggressive),
        ];
        let (me, others) = OtherBots::split(&mut bots, 1).unwrap();
        assert_eq!(me.name, "B");
        assert_eq!(others.self_index(), 1);
        let names: Vec<(usize, String)> = others.iter().map(|(i, b)| (i, b.name.clone())).collect();
        assert_eq!(names, vec![(0, "A".to_string()), (2, "C".to_string())]);
        assert!(others.get(1).is_none());
        assert_eq!(others.get(2).map(|b| b.name.as_str()), Some("C"));
        assert!(OtherBots::split(&mut bots, 3).is_none());
    }

    #[test]
    fn test_fires_when_cooldown_elapsed_and_target_in_range() {
        let mut bots = vec![
            bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("B", 200.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].target = Some(1);
        bots[0].ticks_since_shot = 59;
        let bounds = ArenaBounds::default();
        let mut rng = Pcg32::seed_from_u64(1);

        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        let projectile = a.tick(&others, &bounds, &mut rng).expect("弾が生成されるはず");
        assert_eq!(projectile.id, "A_P001");
        assert_eq!(projectile.owner(), 0);
        assert_eq!(projectile.damage(), 15);
        assert_eq!(projectile.position, Position2D::new(100.0, 100.0));
        assert_eq!(a.ticks_since_shot, 0);
        // 移動は射撃後
        assert_eq!(a.position, Position2D::new(102.0, 100.0));

        // クールダウン中は撃たない
        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        assert!(a.tick(&others, &bounds, &mut rng).is_none());
    }

    #[test]
    fn test_no_target_no_fire() {
        let mut b = bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive);
        b.ticks_since_shot = 1000;
        assert!(b.shoot(None, 0).is_none());
        assert_eq!(b.ticks_since_shot, 1000);
    }

    #[test]
    fn test_sneaky_speed_mutation_persists() {
        let mut bots = vec![
            bot("S", 100.0, 100.0, BehaviorPolicy::Sneaky),
            bot("T", 130.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].target = Some(1);
        let bounds = ArenaBounds::default();
        let mut rng = Pcg32::seed_from_u64(1);

        let (s, others) = OtherBots::split(&mut bots, 0).unwrap();
        s.tick(&others, &bounds, &mut rng);
        assert_eq!(s.speed, 1.0);
        assert_eq!(s.position, Position2D::new(101.0, 100.0));

        // 周回距離に入っても速度は戻らない
        bots[1].position = Position2D::new(220.0, 100.0);
        let (s, others) = OtherBots::split(&mut bots, 0).unwrap();
        s.tick(&others, &bounds, &mut rng);
        assert_eq!(s.speed, 1.0);
    }

    #[test]
    fn test_stale_target_is_still_aimed_at() {
        let mut bots = vec![
            bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("B", 100.0, 200.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].target = Some(1);
        bots[1].health = 0;
        let mut rng = Pcg32::seed_from_u64(1);
        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        a.tick(&others, &ArenaBounds::default(), &mut rng);
        assert_eq!(a.heading, std::f64::consts::FRAC_PI_2);
        assert_eq!(a.target, Some(1));
    }

    #[test]
    fn test_reconsider_does_not_move() {
        let mut bots = vec![
            bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive),
            bot("B", 150.0, 100.0, BehaviorPolicy::Aggressive),
        ];
        bots[0].target = Some(1);
        bots[0].ticks_since_shot = 60;
        let mut rng = Pcg32::seed_from_u64(1);
        let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
        assert!(a.reconsider(&others, &mut rng).is_some());
        assert_eq!(a.position, Position2D::new(100.0, 100.0));
        assert_eq!(a.heading, 0.0);
    }

    #[test]
    fn test_collision_uses_full_size_as_radius() {
        let mut b = bot("A", 100.0, 100.0, BehaviorPolicy::Aggressive);
        b.color = BLUE;
        assert!(b.check_collision(Position2D::new(119.0, 100.0)));
        assert!(!b.check_collision(Position2D::new(120.0, 100.0)));
    }

    proptest! {
        #[test]
        fn prop_health_always_clamped(hits in proptest::collection::vec(0i32..500, 1..20)) {
            let mut b = bot("A", 100.0, 100.0, BehaviorPolicy::Defensive);
            for amount in hits {
                b.take_damage(amount, "X");
                prop_assert!(b.health >= 0 && b.health <= b.max_health);
            }
        }

        #[test]
        fn prop_position_clamped_after_tick(
            x in -1000.0f64..2000.0,
            y in -1000.0f64..2000.0,
            heading in 0.0f64..std::f64::consts::TAU,
            speed in 0.0f64..50.0,
        ) {
            let mut bots = vec![bot("A", x, y, BehaviorPolicy::Aggressive)];
            bots[0].heading = heading;
            bots[0].speed = speed;
            let bounds = ArenaBounds::default();
            let mut rng = Pcg32::seed_from_u64(9);
            let (a, others) = OtherBots::split(&mut bots, 0).unwrap();
            a.tick(&others, &bounds, &mut rng);
            let half = a.size / 2.0;
            prop_assert!(a.position.x >= half && a.position.x <= bounds.width - half);
            prop_assert!(a.position.y >= half && a.position.y <= bounds.height - half);
        }
    }
}
