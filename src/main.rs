use std::env;

mod logging;

/// CLI 参数配置
struct CliArgs {
    /// 预填到身份界面的名字（可选）
    name: Option<String>,
    log_level: logging::LogLevel,
}

fn print_usage(program_name: &str) {
    println!("用法: {} [名字] [选项]", program_name);
    println!();
    println!("参数:");
    println!("  名字               预填到身份界面的显示名称（可选）");
    println!();
    println!("选项:");
    println!("  --log-level <级别>  日志级别 (trace/debug/info/warn/error)");
    println!("  --help, -h         显示帮助信息");
    println!();
    println!("示例:");
    println!("  {}                        # 在身份界面输入名字", program_name);
    println!("  {} \"客厅电视\"              # 预填名字", program_name);
    println!("  {} \"卧室NAS\" --log-level debug", program_name);
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&args[0]);
        std::process::exit(0);
    }

    // 解析日志级别
    let log_level = match args.iter().position(|a| a == "--log-level") {
        Some(pos) => match args.get(pos + 1).and_then(|s| logging::LogLevel::parse(s)) {
            Some(level) => level,
            None => {
                eprintln!("无效的日志级别");
                print_usage(&args[0]);
                std::process::exit(1);
            }
        },
        None => logging::LogLevel::default(),
    };

    // 获取名字（第一个非选项参数，跳过 --log-level 的取值）
    let level_value_pos = args.iter().position(|a| a == "--log-level").map(|p| p + 1);
    let name = args
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, _)| Some(*i) != level_value_pos)
        .find(|(_, a)| !a.starts_with('-'))
        .map(|(_, a)| a.clone());

    CliArgs { name, log_level }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    // 日志只写文件，避免干扰终端界面
    logging::init_logging_with_level(args.log_level)?;

    tracing::info!("peerchat 启动");

    tui_app::run_tui(args.name).await?;

    Ok(())
}
