//! # Simulation モジュール
//!
//! アリーナを駆動する外部フレームループを提供します。
//!
//! 実際のゲームではウィンドウ・入力・描画が担う役割を、ヘッドレスで再現します。
//! 1フレームごとに次の順序で処理します：
//!
//! 1. **入力処理**: コマンドソースから、そのフレームのコマンドを取得して適用
//! 2. **シミュレーション**: [`Arena::tick`] を1回呼ぶ
//! 3. **描画**: スナップショットを描画側へ渡す
//!
//! `run` は可能な限り高速に、`run_realtime` は tokio のインターバルで
//! 目標フレームレートに合わせて実行します。
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use botsim::scenario::ScenarioConfig;
//! use botsim::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/classic.yaml")?;
//! let mut engine = SimulationEngine::new(&config, 1);
//! let summary = engine.run()?;
//! println!("{:?}", summary.winner);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, debug, trace};

use crate::arena::{Arena, ArenaCommand, ArenaPhase, ArenaSnapshot};
use crate::models::{ICommandSource, IRenderer};
use crate::scenario::{ScenarioConfig, ScriptedCommand};

/// 進行状況をログ出力するフレーム間隔
const PROGRESS_INTERVAL: u64 = 600;

/// シナリオに記述されたコマンドを指定フレームで発行する入力ソース
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommands {
    queue: VecDeque<ScriptedCommand>,
}

impl ScriptedCommands {
    pub fn new(mut script: Vec<ScriptedCommand>) -> Self {
        // 同一フレーム内の順序は記述順を保つ
        script.sort_by_key(|scripted| scripted.tick);
        Self { queue: script.into() }
    }
}

impl ICommandSource for ScriptedCommands {
    fn poll(&mut self, frame: u64) -> Vec<ArenaCommand> {
        let mut commands = Vec::new();
        while let Some(next) = self.queue.front() {
            if next.tick > frame {
                break;
            }
            commands.push(next.command);
            self.queue.pop_front();
        }
        commands
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

/// スナップショットを定期的にトレースログへ出す描画側
#[derive(Debug, Clone)]
pub struct TraceRenderer {
    interval: u64,
    frames: u64,
    last_phase: Option<ArenaPhase>,
}

impl TraceRenderer {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            frames: 0,
            last_phase: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl IRenderer for TraceRenderer {
    fn render(&mut self, snapshot: &ArenaSnapshot) {
        self.frames += 1;

        if self.last_phase != Some(snapshot.phase) {
            debug!(frame = self.frames, phase = ?snapshot.phase, "RENDER_PHASE: フェーズが変化しました");
            self.last_phase = Some(snapshot.phase);
        }

        if self.frames % self.interval != 0 {
            return;
        }

        let living = snapshot.bots.iter().filter(|bot| bot.alive).count();
        trace!(
            frame = self.frames,
            step = snapshot.step,
            living,
            projectiles = snapshot.projectiles.len(),
            last_message = ?snapshot.messages.last(),
            "RENDER_FRAME: フレーム状態"
        );
        for bot in &snapshot.bots {
            trace!(
                bot = %bot.name,
                x = bot.position.x,
                y = bot.position.y,
                health = bot.health,
                max_health = bot.max_health,
                "RENDER_BOT"
            );
        }
    }
}

/// 実行結果の要約
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub frames: u64,
    pub steps: u64,
    pub phase: ArenaPhase,
    pub winner: Option<String>,
    pub survivors: usize,
    pub final_snapshot: ArenaSnapshot,
}

pub struct SimulationEngine {
    pub arena: Arena,
    pub frame: u64,
    pub max_frames: u64,
    pub tick_rate_hz: u32,
    pub verbose_level: u8,
    commands: Box<dyn ICommandSource>,
    renderer: Box<dyn IRenderer>,
    quit_requested: bool,
}

impl SimulationEngine {
    pub fn new(scenario: &ScenarioConfig, verbose_level: u8) -> Self {
        let engine = Self::with_collaborators(
            Arena::from_scenario(scenario),
            Box::new(ScriptedCommands::new(scenario.script.clone())),
            Box::new(TraceRenderer::new(PROGRESS_INTERVAL / 10)),
            scenario.sim.max_ticks,
            scenario.sim.tick_rate_hz,
        );
        Self { verbose_level, ..engine }
    }

    /// 任意の入力ソースと描画側で作成
    pub fn with_collaborators(
        arena: Arena,
        commands: Box<dyn ICommandSource>,
        renderer: Box<dyn IRenderer>,
        max_frames: u64,
        tick_rate_hz: u32,
    ) -> Self {
        Self {
            arena,
            frame: 0,
            max_frames,
            tick_rate_hz: tick_rate_hz.max(1),
            verbose_level: 0,
            commands,
            renderer,
            quit_requested: false,
        }
    }

    /// 可能な限り高速に実行
    pub fn run(&mut self) -> Result<SimulationSummary, Box<dyn std::error::Error>> {
        self.log_start();

        while self.should_continue() {
            self.step();
        }

        Ok(self.finish())
    }

    /// 目標フレームレートに合わせて実行
    pub fn run_realtime(&mut self) -> Result<SimulationSummary, Box<dyn std::error::Error>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        self.log_start();
        let period = Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64);

        runtime.block_on(async {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while self.should_continue() {
                interval.tick().await;
                self.step();
            }
        });

        Ok(self.finish())
    }

    /// 1フレーム分の処理（入力 → tick → 描画）
    pub fn step(&mut self) {
        for command in self.commands.poll(self.frame) {
            if !self.arena.apply_command(command) {
                self.quit_requested = true;
            }
        }

        if !self.quit_requested {
            self.arena.tick();
            self.renderer.render(&self.arena.snapshot());
        }

        self.frame += 1;

        if self.verbose_level > 0 && self.frame % PROGRESS_INTERVAL == 0 {
            info!(
                frame = self.frame,
                step = self.arena.step(),
                living = self.arena.living_count(),
                projectiles = self.arena.projectiles().len(),
                "進行状況: {}/{}フレーム",
                self.frame,
                self.max_frames
            );
        }
    }

    /// ループを続けるかどうか
    ///
    /// 終了要求・最大フレーム到達、またはコマンドが尽きていて
    /// アリーナがもう進まない（`Running` 以外）場合に停止します。
    pub fn should_continue(&self) -> bool {
        if self.quit_requested || self.frame >= self.max_frames {
            return false;
        }
        !(self.commands.is_exhausted() && self.arena.phase() != ArenaPhase::Running)
    }

    fn log_start(&self) {
        info!("=== シミュレーション実行開始 ===");
        info!(
            bots = self.arena.bots().len(),
            max_frames = self.max_frames,
            tick_rate_hz = self.tick_rate_hz,
            "初期化完了"
        );
    }

    fn finish(&self) -> SimulationSummary {
        let summary = SimulationSummary {
            frames: self.frame,
            steps: self.arena.step(),
            phase: self.arena.phase(),
            winner: self.arena.winner().map(|bot| bot.name.clone()),
            survivors: self.arena.living_count(),
            final_snapshot: self.arena.snapshot(),
        };

        info!("=== シミュレーション完了 ===");
        info!("総フレーム数: {}", summary.frames);
        info!("総ステップ数: {}", summary.steps);
        info!(phase = ?summary.phase, winner = ?summary.winner, survivors = summary.survivors, "対戦結果");

        summary
    }
}
