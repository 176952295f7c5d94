//! # 行動ポリシー
//!
//! ボットの4種類の行動ポリシー（Aggressive / Defensive / Sneaky / Berserker）を
//! 閉じた列挙型として定義します。各ポリシーは生成時のステータス補正と、
//! 毎tickの意思決定（進行方向・射撃意図・速度変更）を純粋関数として提供します。

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::common::Position2D;

/// Defensiveが後退に切り替える距離
pub const DEFENSIVE_RETREAT_DISTANCE: f64 = 100.0;
/// Defensiveが射撃時に加える進行方向の揺らぎ幅[rad]
pub const DEFENSIVE_JITTER: f64 = 0.2;
/// Sneakyが周回を始める最小距離
pub const SNEAKY_ORBIT_MIN_DISTANCE: f64 = 80.0;
/// Sneakyが接近中に設定する速度
pub const SNEAKY_APPROACH_SPEED: f64 = 1.0;

/// ボットの行動ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorPolicy {
    /// 直進追撃し射程内で常に射撃
    Aggressive,
    /// 距離を保ち、近づかれたら後退
    Defensive,
    /// 中距離で周回し、近距離・遠距離では減速して接近
    Sneaky,
    /// Aggressiveと同じ動きで高火力・高速
    Berserker,
}

/// ランダム出現時の抽選候補
pub const ALL_POLICIES: [BehaviorPolicy; 4] = [
    BehaviorPolicy::Aggressive,
    BehaviorPolicy::Defensive,
    BehaviorPolicy::Sneaky,
    BehaviorPolicy::Berserker,
];

/// 戦闘ステータス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatStats {
    pub max_health: i32,
    pub damage: i32,
    pub speed: f64,
    pub range: f64,
    /// 射撃間隔[tick]
    pub fire_cooldown: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            max_health: 100,
            damage: 15,
            speed: 2.0,
            range: 150.0,
            fire_cooldown: 60,
        }
    }
}

/// 意思決定の入力
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput {
    pub position: Position2D,
    pub heading: f64,
    pub range: f64,
    /// ターゲットの現在位置（ターゲットなしならNone）
    pub target: Option<Position2D>,
}

/// 意思決定の結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyDecision {
    /// 新しい進行方向[rad]
    pub heading: f64,
    /// 射撃意図（クールダウンの判定はボット側）
    pub fire: bool,
    /// ボット自身の速度フィールドを上書きする値
    pub speed_override: Option<f64>,
}

impl BehaviorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorPolicy::Aggressive => "aggressive",
            BehaviorPolicy::Defensive => "defensive",
            BehaviorPolicy::Sneaky => "sneaky",
            BehaviorPolicy::Berserker => "berserker",
        }
    }

    /// 基本値にポリシー固有の補正を適用したステータス
    pub fn stats(&self) -> CombatStats {
        let base = CombatStats::default();
        match self {
            BehaviorPolicy::Aggressive => base,
            BehaviorPolicy::Defensive => CombatStats {
                max_health: 120,
                speed: 1.5,
                ..base
            },
            BehaviorPolicy::Sneaky => CombatStats {
                speed: 2.5,
                fire_cooldown: 45,
                ..base
            },
            BehaviorPolicy::Berserker => CombatStats {
                max_health: 60,
                speed: 3.0,
                damage: 25,
                ..base
            },
        }
    }

    /// 1回分の意思決定
    ///
    /// ターゲットがいない場合は進行方向を変えず、射撃もしません。
    /// Defensiveの揺らぎのみ乱数を消費します。
    ///
    /// # 引数
    ///
    /// * `input` - 自身の状態とターゲット位置
    /// * `rng` - 乱数生成器
    ///
    /// # 戻り値
    ///
    /// 進行方向・射撃意図・速度上書きの組
    pub fn decide<R: Rng>(&self, input: &PolicyInput, rng: &mut R) -> PolicyDecision {
        let unchanged = PolicyDecision {
            heading: input.heading,
            fire: false,
            speed_override: None,
        };

        let Some(target) = input.target else {
            return unchanged;
        };

        let distance = input.position.distance_to(&target);
        let angle = input.position.angle_to(&target);

        match self {
            BehaviorPolicy::Aggressive | BehaviorPolicy::Berserker => PolicyDecision {
                heading: angle,
                fire: distance < input.range,
                speed_override: None,
            },
            BehaviorPolicy::Defensive => {
                if distance < DEFENSIVE_RETREAT_DISTANCE {
                    PolicyDecision {
                        heading: angle + PI,
                        ..unchanged
                    }
                } else if distance < input.range {
                    PolicyDecision {
                        heading: input.heading + rng.random_range(-DEFENSIVE_JITTER..=DEFENSIVE_JITTER),
                        fire: true,
                        speed_override: None,
                    }
                } else {
                    unchanged
                }
            }
            BehaviorPolicy::Sneaky => {
                if distance > SNEAKY_ORBIT_MIN_DISTANCE && distance < input.range {
                    PolicyDecision {
                        heading: angle + FRAC_PI_2,
                        fire: true,
                        speed_override: None,
                    }
                } else {
                    // 慎重に接近: 速度フィールド自体を書き換える（元に戻さない）
                    PolicyDecision {
                        heading: angle,
                        fire: false,
                        speed_override: Some(SNEAKY_APPROACH_SPEED),
                    }
                }
            }
        }
    }
}

impl fmt::Display for BehaviorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aggressive" => Ok(BehaviorPolicy::Aggressive),
            "defensive" => Ok(BehaviorPolicy::Defensive),
            "sneaky" => Ok(BehaviorPolicy::Sneaky),
            "berserker" => Ok(BehaviorPolicy::Berserker),
            _ => Err(format!(
                "無効なポリシー: {}. 利用可能: aggressive, defensive, sneaky, berserker",
                s
            )),
        }
    }
}
