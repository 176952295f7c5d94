use std::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

/// デフォルトのアリーナ幅
pub const ARENA_WIDTH: f64 = 800.0;
/// デフォルトのアリーナ高さ
pub const ARENA_HEIGHT: f64 = 600.0;
/// ランダム出現時の壁からの余白
pub const SPAWN_MARGIN: f64 = 50.0;
/// ボットの大きさ（クランプは半分、衝突判定は全体を半径として使用）
pub const BOT_SIZE: f64 = 20.0;
/// ターゲット再探索の間隔[tick]
pub const TARGET_SCAN_INTERVAL: u32 = 30;
/// 弾の速度[units/tick]
pub const PROJECTILE_SPEED: f64 = 5.0;
/// 弾の寿命[tick]
pub const PROJECTILE_LIFETIME: i32 = 120;
/// 弾の大きさ
pub const PROJECTILE_SIZE: f64 = 3.0;
/// バトルログの保持件数
pub const EVENT_LOG_CAPACITY: usize = 10;
/// 描画側に渡すログ件数
pub const RENDERED_LOG_LINES: usize = 5;
/// 目標フレームレート
pub const TARGET_TICK_RATE_HZ: u32 = 60;

/// 2次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f64,
    pub y: f64,
}

impl Position2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 2点間の距離
    pub fn distance_to(&self, other: &Position2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// 自分から相手への方位角（ラジアン）
    pub fn angle_to(&self, other: &Position2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }
}

impl Add<Velocity2D> for Position2D {
    type Output = Self;

    fn add(self, velocity: Velocity2D) -> Self::Output {
        Self::new(self.x + velocity.x, self.y + velocity.y)
    }
}

impl Sub for Position2D {
    type Output = Velocity2D;

    fn sub(self, other: Self) -> Self::Output {
        Velocity2D::new(self.x - other.x, self.y - other.y)
    }
}

/// 2次元速度を表す構造体（units/tick）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity2D {
    pub x: f64,
    pub y: f64,
}

impl Velocity2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 方位角と速さから速度ベクトルを生成
    pub fn from_polar(angle: f64, speed: f64) -> Self {
        Self::new(angle.cos() * speed, angle.sin() * speed)
    }

    /// 速度ベクトルの大きさ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

impl Mul<f64> for Velocity2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

/// アリーナの境界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: f64,
    pub height: f64,
}

impl ArenaBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 半径 `half_extent` の物体が収まる範囲に位置を制限
    pub fn clamp(&self, position: Position2D, half_extent: f64) -> Position2D {
        Position2D::new(
            position.x.max(half_extent).min(self.width - half_extent),
            position.y.max(half_extent).min(self.height - half_extent),
        )
    }

    /// [0,width]×[0,height] に含まれるか
    pub fn contains(&self, position: Position2D) -> bool {
        position.x >= 0.0 && position.x <= self.width &&
        position.y >= 0.0 && position.y <= self.height
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self::new(ARENA_WIDTH, ARENA_HEIGHT)
    }
}

/// 表示色（描画側でのみ使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const RED: Rgb = Rgb(255, 107, 107);
pub const BLUE: Rgb = Rgb(78, 205, 196);
pub const GREEN: Rgb = Rgb(69, 183, 209);
pub const YELLOW: Rgb = Rgb(249, 202, 36);
pub const PURPLE: Rgb = Rgb(108, 92, 231);
pub const ORANGE: Rgb = Rgb(238, 90, 36);

/// ランダム出現ボットの配色候補
pub const SPAWN_PALETTE: [Rgb; 6] = [RED, BLUE, GREEN, YELLOW, PURPLE, ORANGE];
