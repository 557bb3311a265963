use groupex::commands::command_argument_builder;
use groupex::handlers::{handle_export, handle_normalize};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();

    match chosen_command.subcommand() {
        Some(("export", primary_command)) => handle_export(primary_command).await,
        Some(("normalize", primary_command)) => handle_normalize(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
