use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use cirrhosis_cli::serve::{self, ServeConfig};
use cirrhosis_cli::train::{self, input};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CIRRHOSIS_LOG", "error,cirrhosis=info"))
        .init();

    let matches = Command::new("cirrhosis")
        .version(clap::crate_version!())
        .about("Cirrhosis stage classification: model training and prediction service")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Cross-validate candidate models, refit the best and save the model bundle")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON pipeline configuration. Defaults are used when omitted.")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to the training table (*.csv or *.tsv). Overrides the data \
                             file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("File path that the model bundle (JSON) will be written to.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("File path for the HTML report.")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .conflicts_with("report")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("models")
                        .long("models")
                        .help(
                            "Comma separated candidates to cross-validate, by name or type \
                             (random_forest, gbdt, logistic).",
                        )
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("serve")
                .about("Serve POST /predict from a trained model bundle")
                .arg(
                    Arg::new("model_path")
                        .short('m')
                        .long("model")
                        .help("Path to the trained model bundle (*.json)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .default_value("127.0.0.1")
                        .help("Address to listen on"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .default_value("5000")
                        .value_parser(clap::value_parser!(u16))
                        .help("Port to listen on"),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("serve", sub_m)) => handle_serve(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config = input::from_arguments(matches)?;
    log::info!(
        "[cirrhosis::train] {} candidate(s), target '{}'",
        config.models.len(),
        config.target_column
    );

    match train::run_training(&config) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_serve(matches: &ArgMatches) -> Result<()> {
    let defaults = ServeConfig::default();
    let config = ServeConfig {
        model_path: matches
            .get_one::<PathBuf>("model_path")
            .cloned()
            .unwrap_or(defaults.model_path),
        host: matches
            .get_one::<String>("host")
            .cloned()
            .unwrap_or(defaults.host),
        port: matches.get_one::<u16>("port").copied().unwrap_or(defaults.port),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(serve::run(&config)) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Service failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
