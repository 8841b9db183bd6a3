use cardiac_signal_engine::config::{load_config, Config};
use cardiac_signal_engine::local::{client, process_file, server};

const USAGE: &str = "Usage: main [--config <path>] <server [data.csv] | client | process <files...>>";

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            match load_config(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
        None => Config::default(),
    };

    let result = match args.first().map(String::as_str) {
        Some("server") => server::run(&config, args.get(1).map(String::as_str)),
        Some("client") => client::run(&config),
        Some("process") => process_file::run(&args[1..], &config),
        _ => {
            println!("{}", USAGE);
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
