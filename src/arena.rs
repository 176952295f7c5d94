//! # Arena モジュール
//!
//! ボット同士の対戦を管理するシミュレーションコントローラです。
//!
//! アリーナはボットと飛翔中の弾を排他的に所有し、外部ループから1フレームに1回
//! 呼ばれる [`Arena::tick`] の中で全ての状態変更を同期的に行います。
//! 描画側は tick 後に [`Arena::snapshot`] で読み取り専用の状態を受け取り、
//! 入力側は [`ArenaCommand`] で実行状態を操作します。
//!
//! ## tick の処理順序
//!
//! 1. **ボット処理**: ストレージ順に移動・再探索・射撃判定
//! 2. **弾処理**: 既存の弾を進め、命中・消滅したものを除去
//! 3. **新規弾の追加**: このtickで発射された弾を飛翔中リストへ追加
//! 4. **終了判定**: 生存ボットが1体以下なら終了し、勝者または引き分けを記録
//!
//! ## 状態遷移
//!
//! `Idle` ⇄ `Running` → `Ended`。`Ended` は [`Arena::reset`] まで抜けません。

use std::collections::VecDeque;
use std::time::SystemTime;

use rand::{Rng, SeedableRng};
use rand::seq::IndexedRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::*;
use crate::scenario::{RosterEntry, ScenarioConfig};

/// アリーナの実行フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArenaPhase {
    /// 開始前・一時停止中・リセット直後
    Idle,
    /// tickでシミュレーションが進む
    Running,
    /// 生存ボットが1体以下（resetまで終端）
    Ended,
}

/// 入力側から発行される離散コマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaCommand {
    ToggleRunning,
    Reset,
    SpawnRandomBot,
    /// 外部ループの終了のみ（アリーナ状態には影響しない）
    Quit,
}

/// 射撃判定の実行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireMode {
    /// ボットのtick内の射撃判定をそのまま採用
    #[default]
    Single,
    /// ボットのtick内の弾を捨て、弾処理の後に全生存ボットが再判定する
    Double,
}

/// バトルログの1件
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub text: String,
    /// 記録時のtick番号
    pub step: u64,
    pub timestamp: SystemTime,
}

/// 直近のメッセージのみ保持するバトルログ
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// 追加し、容量を超えた分を古い順に捨てる
    pub fn push(&mut self, text: String, step: u64) {
        self.entries.push_back(LogEntry {
            text,
            step,
            timestamp: SystemTime::now(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 古い順
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// 直近 `count` 件（古い順）
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}

/// アリーナの設定値
#[derive(Debug, Clone, Copy)]
pub struct ArenaSettings {
    pub bounds: ArenaBounds,
    pub seed: u64,
    pub fire_mode: FireMode,
    pub spawn_margin: f64,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            bounds: ArenaBounds::default(),
            seed: 42,
            fire_mode: FireMode::Single,
            spawn_margin: SPAWN_MARGIN,
        }
    }
}

/// 描画側に渡すボットの状態
#[derive(Debug, Clone, Serialize)]
pub struct BotSnapshot {
    pub name: String,
    pub policy: BehaviorPolicy,
    pub color: Rgb,
    pub position: Position2D,
    pub heading: f64,
    pub health: i32,
    pub max_health: i32,
    pub alive: bool,
}

/// 描画側に渡すアリーナ全体の状態
#[derive(Debug, Clone, Serialize)]
pub struct ArenaSnapshot {
    pub step: u64,
    pub width: f64,
    pub height: f64,
    pub phase: ArenaPhase,
    pub winner: Option<String>,
    pub bots: Vec<BotSnapshot>,
    pub projectiles: Vec<Position2D>,
    pub messages: Vec<String>,
}

/// アリーナ（シミュレーションコントローラ）
pub struct Arena {
    bounds: ArenaBounds,
    fire_mode: FireMode,
    spawn_margin: f64,
    /// 作成時のロスター（resetで復元する）
    roster: Vec<RosterEntry>,
    bots: Vec<Bot>,
    projectiles: Vec<Projectile>,
    phase: ArenaPhase,
    winner: Option<usize>,
    log: EventLog,
    rng: Pcg32,
    step: u64,
}

impl Arena {
    /// 設定と初期ロスターからアリーナを作成し、初期化する
    pub fn new(settings: ArenaSettings, roster: Vec<RosterEntry>) -> Self {
        let mut arena = Self {
            bounds: settings.bounds,
            fire_mode: settings.fire_mode,
            spawn_margin: settings.spawn_margin,
            roster: Vec::new(),
            bots: Vec::new(),
            projectiles: Vec::new(),
            phase: ArenaPhase::Idle,
            winner: None,
            log: EventLog::default(),
            rng: Pcg32::seed_from_u64(settings.seed),
            step: 0,
        };
        arena.initialize(&roster);
        arena.roster = roster;
        arena
    }

    /// シナリオ設定からアリーナを作成
    pub fn from_scenario(scenario: &ScenarioConfig) -> Self {
        let settings = ArenaSettings {
            bounds: ArenaBounds::new(scenario.arena.width, scenario.arena.height),
            seed: scenario.sim.seed,
            fire_mode: scenario.sim.fire_mode,
            spawn_margin: scenario.arena.spawn_margin,
        };
        Self::new(settings, scenario.roster.clone())
    }

    /// ロスターからボットを生成し、弾・ログ・勝者をクリアして `Idle` にする
    ///
    /// 渡したロスターはこの対戦にだけ使われ、[`Arena::reset`] は作成時のロスターに戻します。
    pub fn initialize(&mut self, roster: &[RosterEntry]) {
        self.projectiles.clear();
        self.log.clear();
        self.winner = None;
        self.phase = ArenaPhase::Idle;
        self.step = 0;

        let rng = &mut self.rng;
        self.bots = roster
            .iter()
            .map(|entry| Bot::new(entry.position, entry.color, entry.name.clone(), entry.policy, rng))
            .collect();

        debug!(
            bots = self.bots.len(),
            width = self.bounds.width,
            height = self.bounds.height,
            "ARENA_INITIALIZED: アリーナを初期化しました"
        );
        self.log_message(format!("Arena initialized with {} bots!", self.bots.len()));
    }

    /// 作成時のロスターで再初期化
    pub fn reset(&mut self) {
        let roster = std::mem::take(&mut self.roster);
        self.initialize(&roster);
        self.roster = roster;
    }

    /// 1tick進める（`Running` 以外では何もしない）
    pub fn tick(&mut self) {
        if self.phase != ArenaPhase::Running {
            return;
        }
        self.step += 1;

        let mut fired = self.process_bots();
        self.process_projectiles();

        if self.fire_mode == FireMode::Double {
            fired = self.reconsider_fire();
        }

        for (shooter, projectile) in fired {
            debug!(
                projectile_id = %projectile.get_id(),
                shooter,
                damage = projectile.damage(),
                "PROJECTILE_SPAWN: 弾を追加しました"
            );
            self.log_fire(shooter);
            self.projectiles.push(projectile);
        }

        self.check_for_winner();
    }

    /// 全ボットを更新し、Singleモードなら発射された弾を返す
    ///
    /// Doubleモードではこの段階の弾は捨てられ、発射数にも数えません。
    fn process_bots(&mut self) -> Vec<(usize, Projectile)> {
        let mut fired = Vec::new();
        for index in 0..self.bots.len() {
            let Some((bot, others)) = OtherBots::split(&mut self.bots, index) else {
                continue;
            };
            let Some(projectile) = bot.tick(&others, &self.bounds, &mut self.rng) else {
                continue;
            };
            match self.fire_mode {
                FireMode::Single => fired.push((index, projectile)),
                FireMode::Double => bot.discard_shot(),
            }
        }
        fired
    }

    /// 既存の弾を進め、消滅したものを除去してメッセージを記録
    fn process_projectiles(&mut self) {
        let in_flight = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(in_flight.len());

        for mut projectile in in_flight {
            let (alive, message) = projectile.tick(&mut self.bots, &self.bounds);
            if alive {
                survivors.push(projectile);
            } else if let Some(message) = message {
                self.log_message(message);
            }
        }

        self.projectiles = survivors;
    }

    /// 生存ボットに射撃判定だけをやり直させる
    fn reconsider_fire(&mut self) -> Vec<(usize, Projectile)> {
        let mut fired = Vec::new();
        for index in 0..self.bots.len() {
            let Some((bot, others)) = OtherBots::split(&mut self.bots, index) else {
                continue;
            };
            if let Some(projectile) = bot.reconsider(&others, &mut self.rng) {
                fired.push((index, projectile));
            }
        }
        fired
    }

    fn log_fire(&mut self, shooter: usize) {
        let Some(bot) = self.bots.get(shooter) else {
            return;
        };
        let target_name = bot
            .target
            .and_then(|index| self.bots.get(index))
            .map(|target| target.name.as_str())
            .unwrap_or("nothing");
        let message = format!("{} fires at {}!", bot.name, target_name);
        self.log_message(message);
    }

    /// 生存数が1以下なら終了させる
    fn check_for_winner(&mut self) {
        let living: Vec<usize> = self
            .bots
            .iter()
            .enumerate()
            .filter(|(_, bot)| bot.is_active())
            .map(|(index, _)| index)
            .collect();

        if living.len() > 1 {
            return;
        }

        self.phase = ArenaPhase::Ended;
        self.winner = living.first().copied();

        info!(
            step = self.step,
            winner = ?self.winner_name(),
            "ARENA_PHASE: 対戦が終了しました"
        );

        let message = match self.winner_name() {
            Some(name) => format!("{} wins the battle!", name),
            None => "Battle ended in a draw!".to_string(),
        };
        self.log_message(message);
    }

    /// ランダムなボットを追加（フェーズに関係なく有効）
    ///
    /// # 戻り値
    ///
    /// 追加したボットのインデックス
    pub fn add_random_bot(&mut self) -> usize {
        let position = self.random_spawn_position();
        let policy = *ALL_POLICIES.choose(&mut self.rng).unwrap_or(&BehaviorPolicy::Aggressive);
        let color = *SPAWN_PALETTE.choose(&mut self.rng).unwrap_or(&ORANGE);
        let name = self.unique_random_name();

        let bot = Bot::new(position, color, name.clone(), policy, &mut self.rng);
        self.bots.push(bot);
        self.log_message(format!("New bot {} ({}) joined!", name, policy));

        self.bots.len() - 1
    }

    /// 余白を除いた範囲の整数座標を一様に選ぶ
    fn random_spawn_position(&mut self) -> Position2D {
        let margin = self.spawn_margin.min(self.bounds.width / 2.0).min(self.bounds.height / 2.0);
        let low = margin.ceil() as i64;
        let high_x = ((self.bounds.width - margin).floor() as i64).max(low);
        let high_y = ((self.bounds.height - margin).floor() as i64).max(low);

        let x = self.rng.random_range(low..=high_x);
        let y = self.rng.random_range(low..=high_y);
        Position2D::new(x as f64, y as f64)
    }

    /// `Bot-NNN` 形式で、実行中のボットと重複しない名前
    fn unique_random_name(&mut self) -> String {
        for _ in 0..32 {
            let candidate = format!("Bot-{}", self.rng.random_range(100..=999));
            if !self.bots.iter().any(|bot| bot.name == candidate) {
                return candidate;
            }
        }
        format!("Bot-{}", 1000 + self.bots.len())
    }

    /// 実行状態を設定（`Ended` の間は無視）
    ///
    /// # 戻り値
    ///
    /// 状態が変化した場合はtrue
    pub fn set_running(&mut self, running: bool) -> bool {
        let next = match (self.phase, running) {
            (ArenaPhase::Ended, _) => {
                debug!("ARENA_PHASE: 終了済みのため実行状態は変更できません");
                return false;
            }
            (ArenaPhase::Idle, true) => ArenaPhase::Running,
            (ArenaPhase::Running, false) => ArenaPhase::Idle,
            _ => return false,
        };

        self.phase = next;
        let message = if running { "Battle started!" } else { "Battle paused!" };
        self.log_message(message.to_string());
        true
    }

    pub fn toggle_running(&mut self) -> bool {
        self.set_running(self.phase != ArenaPhase::Running)
    }

    /// 入力コマンドを適用
    ///
    /// # 戻り値
    ///
    /// 外部ループを継続する場合はtrue（`Quit` のみfalse）
    pub fn apply_command(&mut self, command: ArenaCommand) -> bool {
        debug!(command = ?command, step = self.step, "ARENA_COMMAND: コマンドを受信しました");
        match command {
            ArenaCommand::ToggleRunning => {
                self.toggle_running();
            }
            ArenaCommand::Reset => self.reset(),
            ArenaCommand::SpawnRandomBot => {
                self.add_random_bot();
            }
            ArenaCommand::Quit => return false,
        }
        true
    }

    /// バトルログに記録（直近10件のみ保持）
    pub fn log_message(&mut self, text: String) {
        info!(step = self.step, "ARENA_EVENT: {}", text);
        self.log.push(text, self.step);
    }

    /// 描画用のスナップショット
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            step: self.step,
            width: self.bounds.width,
            height: self.bounds.height,
            phase: self.phase,
            winner: self.winner_name().map(str::to_string),
            bots: self
                .bots
                .iter()
                .map(|bot| BotSnapshot {
                    name: bot.get_id(),
                    policy: bot.policy,
                    color: bot.color,
                    position: bot.get_position(),
                    heading: bot.heading,
                    health: bot.health,
                    max_health: bot.max_health,
                    alive: bot.is_active(),
                })
                .collect(),
            projectiles: self.projectiles.iter().map(|p| p.get_position()).collect(),
            messages: self.log.recent(RENDERED_LOG_LINES).map(|entry| entry.text.clone()).collect(),
        }
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    /// 状態の直接編集（テストや外部ツール用）
    pub fn bots_mut(&mut self) -> &mut [Bot] {
        &mut self.bots
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn phase(&self) -> ArenaPhase {
        self.phase
    }

    pub fn winner(&self) -> Option<&Bot> {
        self.winner.and_then(|index| self.bots.get(index))
    }

    fn winner_name(&self) -> Option<&str> {
        self.winner().map(|bot| bot.name.as_str())
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn bounds(&self) -> ArenaBounds {
        self.bounds
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn living_count(&self) -> usize {
        self.bots.iter().filter(|bot| bot.is_active()).count()
    }
}
