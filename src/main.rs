use clap::{Arg, ArgMatches, Command};
use tracing::info;

use botsim::logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use botsim::scenario::ScenarioConfig;
use botsim::simulation::SimulationEngine;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("botsim")
        .version("0.1.0")
        .about("ボット対戦シミュレーション (Bot Arena Simulation)")
        .long_about("2次元アリーナで行動ポリシーの異なるボットを戦わせるシミュレーションです。\n\
                     最後の1体が残るか全滅するまでtickを進めます。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、標準の5体ロスターで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベルを直接指定 (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64))
                .help("シナリオの乱数シードを上書き")
        )
        .arg(
            Arg::new("max-ticks")
                .long("max-ticks")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("最大フレーム数を上書き")
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(clap::ArgAction::SetTrue)
                .help("目標フレームレートに合わせて実時間で実行")
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .action(clap::ArgAction::SetTrue)
                .help("終了時のアリーナ状態をYAMLで出力")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let log_config = LogConfig {
        level: matches
            .get_one::<String>("log-level")
            .map(|level| parse_log_level(level))
            .unwrap_or_else(|| level_for_verbosity(verbose_level)),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };

    // ガードは main の終了までフラッシュを保証する
    let _log_guard = match init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("ボット対戦シミュレーション (Bot Arena Simulation) - botsim v0.1.0");
    println!();

    if let Err(e) = run(&matches, verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオを読み込み、上書き指定を反映して実行
fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            info!(path = %path, "シナリオファイル読み込み完了");
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if let Some(&seed) = matches.get_one::<u64>("seed") {
        scenario.sim.seed = seed;
    }
    if let Some(&max_ticks) = matches.get_one::<u64>("max-ticks") {
        scenario.sim.max_ticks = max_ticks;
    }
    scenario.validate()?;

    // 情報表示のみの場合
    if matches.get_flag("info") {
        scenario.print_summary();
        return Ok(());
    }

    if verbose_level > 0 {
        scenario.print_summary();
        println!();
    }

    let mut engine = SimulationEngine::new(&scenario, verbose_level);
    let summary = if matches.get_flag("realtime") {
        engine.run_realtime()?
    } else {
        engine.run()?
    };

    println!("=== 対戦結果 ===");
    match &summary.winner {
        Some(winner) => println!("勝者: {}", winner),
        None if summary.survivors == 0 => println!("引き分け（全滅）"),
        None => println!("決着つかず（残り{}体）", summary.survivors),
    }
    println!("フレーム数: {} / ステップ数: {}", summary.frames, summary.steps);
    for message in &summary.final_snapshot.messages {
        println!("  {}", message);
    }

    if matches.get_flag("dump") {
        println!();
        print!("{}", serde_yaml::to_string(&summary.final_snapshot)?);
    }

    Ok(())
}
