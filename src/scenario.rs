use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::fs;

use crate::arena::{ArenaCommand, FireMode};
use crate::models::{
    BehaviorPolicy, Position2D, Rgb,
    RED, BLUE, GREEN, YELLOW, PURPLE,
    ARENA_WIDTH, ARENA_HEIGHT, SPAWN_MARGIN, TARGET_TICK_RATE_HZ,
};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// 最大フレーム数
    pub max_ticks: u64,
    /// 実時間実行時のフレームレート
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    #[serde(default)]
    pub fire_mode: FireMode,
}

/// アリーナ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_spawn_margin")]
    pub spawn_margin: f64,
}

/// 初期ロスターの1体分
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RosterEntry {
    pub name: String,
    pub color: Rgb,
    pub position: Position2D,
    pub policy: BehaviorPolicy,
}

/// 指定フレームで発行するコマンド
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScriptedCommand {
    pub tick: u64,
    pub command: ArenaCommand,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub arena: ArenaConfig,
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub script: Vec<ScriptedCommand>,
}

fn default_tick_rate() -> u32 {
    TARGET_TICK_RATE_HZ
}

fn default_spawn_margin() -> f64 {
    SPAWN_MARGIN
}

/// 標準の5体ロスター
pub fn default_roster() -> Vec<RosterEntry> {
    let entry = |x: f64, y: f64, color: Rgb, name: &str, policy: BehaviorPolicy| RosterEntry {
        name: name.to_string(),
        color,
        position: Position2D::new(x, y),
        policy,
    };

    vec![
        entry(100.0, 100.0, RED, "Aggressor", BehaviorPolicy::Aggressive),
        entry(700.0, 100.0, BLUE, "Guardian", BehaviorPolicy::Defensive),
        entry(100.0, 500.0, GREEN, "Shadow", BehaviorPolicy::Sneaky),
        entry(700.0, 500.0, YELLOW, "Berserker", BehaviorPolicy::Berserker),
        entry(400.0, 300.0, PURPLE, "Hunter", BehaviorPolicy::Aggressive),
    ]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "classic".to_string(),
                description: "5体の標準ロスターによるバトルロイヤル".to_string(),
            },
            sim: SimulationConfig {
                seed: 42,
                max_ticks: 36_000,
                tick_rate_hz: TARGET_TICK_RATE_HZ,
                fire_mode: FireMode::Single,
            },
            arena: ArenaConfig {
                width: ARENA_WIDTH,
                height: ARENA_HEIGHT,
                spawn_margin: SPAWN_MARGIN,
            },
            roster: default_roster(),
            script: vec![ScriptedCommand {
                tick: 0,
                command: ArenaCommand::ToggleRunning,
            }],
        }
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証
        if self.sim.max_ticks == 0 {
            return Err(ScenarioError::ValidationError("max_ticks must be positive".to_string()));
        }
        if self.sim.tick_rate_hz == 0 {
            return Err(ScenarioError::ValidationError("tick_rate_hz must be positive".to_string()));
        }

        // アリーナ寸法の検証
        let arena = &self.arena;
        if arena.width <= 0.0 || arena.height <= 0.0 {
            return Err(ScenarioError::ValidationError("Invalid arena dimensions".to_string()));
        }
        if arena.spawn_margin < 0.0 || arena.spawn_margin * 2.0 >= arena.width.min(arena.height) {
            return Err(ScenarioError::ValidationError(
                format!("spawn_margin {} does not fit the arena", arena.spawn_margin)
            ));
        }

        // ロスターの検証
        let mut names = HashSet::new();
        for entry in &self.roster {
            if !self.is_position_in_bounds(entry.position.x, entry.position.y) {
                return Err(ScenarioError::ValidationError(
                    format!("Bot {} starts outside the arena", entry.name)
                ));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ScenarioError::ValidationError(
                    format!("Duplicate bot name {}", entry.name)
                ));
            }
        }

        Ok(())
    }

    /// 位置がアリーナ内かどうかをチェック
    fn is_position_in_bounds(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.arena.width &&
        y >= 0.0 && y <= self.arena.height
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("最大フレーム数: {} ({:.1}秒 @ {}Hz)",
                 self.sim.max_ticks,
                 self.sim.max_ticks as f64 / self.sim.tick_rate_hz as f64,
                 self.sim.tick_rate_hz);
        println!("シード値: {}", self.sim.seed);
        println!("射撃判定: {:?}", self.sim.fire_mode);
        println!("アリーナ: {:.0} x {:.0}", self.arena.width, self.arena.height);
        println!();

        println!("=== ロスター ===");
        println!("ボット数: {}体", self.roster.len());
        for entry in &self.roster {
            println!("  {} ({}) 位置: ({:.0}, {:.0})",
                     entry.name, entry.policy, entry.position.x, entry.position.y);
        }

        if !self.script.is_empty() {
            println!();
            println!("=== スクリプト ===");
            for scripted in &self.script {
                println!("  フレーム {}: {:?}", scripted.tick, scripted.command);
            }
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ScenarioConfig {
        serde_yaml::from_str(yaml).expect("YAML解析に失敗")
    }

    #[test]
    fn test_default_is_valid() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roster.len(), 5);
        assert_eq!(config.roster[3].policy, BehaviorPolicy::Berserker);
    }

    #[test]
    fn test_shipped_scenarios_parse() {
        for yaml in [
            include_str!("../scenarios/classic.yaml"),
            include_str!("../scenarios/melee.yaml"),
        ] {
            let config = parse(yaml);
            assert!(config.validate().is_ok(), "{}", config.meta.name);
        }

        let classic = parse(include_str!("../scenarios/classic.yaml"));
        assert_eq!(classic.roster, default_roster());
        assert_eq!(classic.script[0].command, ArenaCommand::ToggleRunning);
    }

    #[test]
    fn test_optional_fields_default() {
        let config = parse(
            r#"
meta: { version: "1", name: t, description: d }
sim: { seed: 7, max_ticks: 100 }
arena: { width: 400, height: 300 }
roster:
  - { name: Solo, color: [1, 2, 3], position: { x: 10, y: 20 }, policy: sneaky }
"#,
        );
        assert_eq!(config.sim.tick_rate_hz, 60);
        assert_eq!(config.sim.fire_mode, FireMode::Single);
        assert_eq!(config.arena.spawn_margin, 50.0);
        assert!(config.script.is_empty());
        assert_eq!(config.roster[0].color, Rgb(1, 2, 3));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ScenarioConfig::default();
        config.roster[1].name = "Aggressor".to_string();
        assert!(matches!(config.validate(), Err(ScenarioError::ValidationError(_))));

        let mut config = ScenarioConfig::default();
        config.roster[0].position = Position2D::new(900.0, 100.0);
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.arena.spawn_margin = 300.0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::default();
        config.sim.max_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let result: Result<ScenarioConfig, _> = serde_yaml::from_str(
            r#"
meta: { version: "1", name: t, description: d }
sim: { seed: 7, max_ticks: 100 }
arena: { width: 400, height: 300 }
roster:
  - { name: Solo, color: [1, 2, 3], position: { x: 10, y: 20 }, policy: coward }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::from_file("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
