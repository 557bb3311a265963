use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const DEFAULT_LOCATION: &str = "https://www.facebook.com/groups/joins/";

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("groupex")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("groupex")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-v --"verbose" "Log run milestones (RUST_LOG overrides)")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("export")
                .about(
                    "Scroll a saved groups listing to the end and export every group you belong \
                to as JSON.",
                )
                .arg(
                    arg!(--"html" <FILE>)
                        .required(true)
                        .help("Snapshot of the groups listing as first rendered")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"fragment" <FILE>)
                        .required(false)
                        .help("Markup revealed by one lazy load, in load order (repeatable)")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"location" <URL>)
                        .required(false)
                        .help("Address the snapshot was taken from")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(DEFAULT_LOCATION),
                )
                .arg(
                    arg!(-c --"config" <FILE>)
                        .required(false)
                        .help("JSON export configuration; flags below override it")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output-dir" <DIR>)
                        .required(false)
                        .help("Directory the export file is written to (default: .)"),
                )
                .arg(
                    arg!(--"filename" <NAME>)
                        .required(false)
                        .help("Export file name (default: facebook_groups.json)"),
                )
                .arg(
                    arg!(--"cadence" <STYLE>)
                        .required(false)
                        .help("Scroll cadence: fixed jumps to the bottom, humanized varies pace and position")
                        .value_parser(["fixed", "humanized"]),
                )
                .arg(
                    arg!(-t --"timeout" <SECS>)
                        .required(false)
                        .help("Safety timeout for the loading phase in seconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"render-pass")
                        .required(false)
                        .help("Walk down the loaded page once more before extracting")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-membership-filter")
                        .required(false)
                        .help("Keep every group link, not only groups you have visited")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"names" <STRATEGY>)
                        .required(false)
                        .help("Display name resolution: own-text or layered")
                        .value_parser(["own-text", "layered"]),
                ),
        )
        .subcommand(
            command!("normalize")
                .about("Strip activity and recency phrases from group labels")
                .arg(
                    arg!(<LABEL>)
                        .required(true)
                        .num_args(1..)
                        .help("Raw labels as they appear in the listing"),
                ),
        )
}
